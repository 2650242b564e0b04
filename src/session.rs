//! Server-side sessions stored in SQLite.
//!
//! A session holds the payments API token, the logged in member of staff and
//! an arbitrary JSON object of values (e.g. the disbursement wizard's answers).
//! Only the session ID travels to the client, inside a private cookie.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::Error;

/// A prison that a member of staff manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prison {
    pub nomis_id: String,
    pub name: String,
}

/// The member of staff that owns a session, as returned by the payments API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffUser {
    pub pk: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub prisons: Vec<Prison>,
}

impl StaffUser {
    /// The member of staff's full name, falling back to their username.
    pub fn full_name(&self) -> String {
        let name = [self.first_name.as_str(), self.last_name.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }
}

/// A logged in member of staff's session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub access_token: String,
    pub user: StaffUser,
    pub values: Map<String, Value>,
    pub expires_at: OffsetDateTime,
}

/// The part of a session that is stored as JSON.
#[derive(Serialize, Deserialize)]
struct SessionData {
    access_token: String,
    user: StaffUser,
    #[serde(default)]
    values: Map<String, Value>,
}

impl Session {
    /// Create a session with a fresh ID that expires `duration` from now.
    pub fn new(access_token: String, user: StaffUser, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            access_token,
            user,
            values: Map::new(),
            expires_at: OffsetDateTime::now_utc() + duration,
        }
    }

    /// Get the value stored under `key`.
    ///
    /// Returns `None` if there is no value or it does not deserialize as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Store `value` under `key`, replacing any existing value.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), Error> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.to_owned(), value);

        Ok(())
    }

    /// Remove the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Push the expiry out to `duration` from now if that gains at least a minute.
    ///
    /// Returns whether the expiry changed.
    pub fn extend_if_needed(&mut self, duration: Duration) -> bool {
        let new_expiry = OffsetDateTime::now_utc() + duration;

        if new_expiry - self.expires_at < Duration::minutes(1) {
            return false;
        }

        self.expires_at = new_expiry;
        true
    }
}

pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
            id TEXT PRIMARY KEY NOT NULL,
            data TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Insert or update `session`.
pub fn save_session(session: &Session, connection: &Connection) -> Result<(), Error> {
    let data = serde_json::to_string(&SessionData {
        access_token: session.access_token.clone(),
        user: session.user.clone(),
        values: session.values.clone(),
    })?;

    connection.execute(
        "INSERT INTO session (id, data, expires_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET data = excluded.data, expires_at = excluded.expires_at",
        (
            session.id.to_string(),
            data,
            session.expires_at.unix_timestamp(),
        ),
    )?;

    Ok(())
}

/// Get the unexpired session with `id`.
///
/// # Errors
/// Returns [Error::SessionExpired] if there is no such session or it has expired.
pub fn get_session(id: Uuid, connection: &Connection) -> Result<Session, Error> {
    let row: Option<(String, i64)> = connection
        .query_row(
            "SELECT data, expires_at FROM session WHERE id = ?1 AND expires_at > ?2",
            (id.to_string(), OffsetDateTime::now_utc().unix_timestamp()),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (data, expires_at) = row.ok_or(Error::SessionExpired)?;
    let data: SessionData = serde_json::from_str(&data)?;
    let expires_at = OffsetDateTime::from_unix_timestamp(expires_at)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(Session {
        id,
        access_token: data.access_token,
        user: data.user,
        values: data.values,
        expires_at,
    })
}

pub fn delete_session(id: Uuid, connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM session WHERE id = ?1", [id.to_string()])?;

    Ok(())
}

/// Remove every expired session, returning how many were removed.
pub fn delete_expired_sessions(connection: &Connection) -> Result<usize, Error> {
    let deleted = connection.execute(
        "DELETE FROM session WHERE expires_at <= ?1",
        [OffsetDateTime::now_utc().unix_timestamp()],
    )?;

    Ok(deleted)
}

/// Lock the database connection and save `session`.
pub fn store_session(
    db_connection: &Arc<Mutex<Connection>>,
    session: &Session,
) -> Result<(), Error> {
    let connection = db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    save_session(session, &connection)
}

#[cfg(test)]
pub(crate) fn test_session() -> Session {
    Session::new(
        "test-token".to_owned(),
        StaffUser {
            pk: 1,
            username: "test-prison-1".to_owned(),
            first_name: "Test".to_owned(),
            last_name: "Staff".to_owned(),
            prisons: vec![Prison {
                nomis_id: "BXI".to_owned(),
                name: "HMP Brixton".to_owned(),
            }],
        },
        Duration::minutes(30),
    )
}

#[cfg(test)]
mod session_tests {
    use rusqlite::Connection;
    use serde_json::json;
    use time::{Duration, OffsetDateTime};

    use crate::Error;

    use super::{
        StaffUser, create_session_table, delete_expired_sessions, delete_session, get_session,
        save_session, test_session,
    };

    fn get_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_session_table(&connection).unwrap();
        connection
    }

    #[test]
    fn can_save_and_load_session() {
        let connection = get_connection();
        let mut session = test_session();
        session.insert("disbursement", &json!({"amount": {"amount": "12.50"}})).unwrap();

        save_session(&session, &connection).unwrap();
        let got = get_session(session.id, &connection).unwrap();

        assert_eq!(got.access_token, session.access_token);
        assert_eq!(got.user, session.user);
        assert_eq!(got.values, session.values);
        assert_eq!(got.expires_at.unix_timestamp(), session.expires_at.unix_timestamp());
    }

    #[test]
    fn saving_twice_updates_session() {
        let connection = get_connection();
        let mut session = test_session();
        save_session(&session, &connection).unwrap();

        session.insert("flag", &true).unwrap();
        save_session(&session, &connection).unwrap();

        let got = get_session(session.id, &connection).unwrap();
        assert_eq!(got.get::<bool>("flag"), Some(true));
    }

    #[test]
    fn expired_session_is_not_returned() {
        let connection = get_connection();
        let mut session = test_session();
        session.expires_at = OffsetDateTime::now_utc() - Duration::minutes(1);
        save_session(&session, &connection).unwrap();

        assert_eq!(get_session(session.id, &connection), Err(Error::SessionExpired));
        assert_eq!(delete_expired_sessions(&connection), Ok(1));
    }

    #[test]
    fn deleted_session_is_not_returned() {
        let connection = get_connection();
        let session = test_session();
        save_session(&session, &connection).unwrap();

        delete_session(session.id, &connection).unwrap();

        assert_eq!(get_session(session.id, &connection), Err(Error::SessionExpired));
    }

    #[test]
    fn get_returns_none_for_wrong_type() {
        let mut session = test_session();
        session.insert("count", &"not a number").unwrap();

        assert_eq!(session.get::<i64>("count"), None);
        assert_eq!(session.get::<String>("missing"), None);
    }

    #[test]
    fn extends_expiry_only_when_it_gains_time() {
        let mut session = test_session();

        assert!(!session.extend_if_needed(Duration::minutes(30)));
        assert!(session.extend_if_needed(Duration::hours(2)));
    }

    #[test]
    fn full_name_falls_back_to_username() {
        let user = StaffUser {
            pk: 2,
            username: "clerk".to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            prisons: Vec::new(),
        };

        assert_eq!(user.full_name(), "clerk");
        assert_eq!(test_session().user.full_name(), "Test Staff");
    }
}
