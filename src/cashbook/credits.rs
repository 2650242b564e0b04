//! Turning credits from the API into what the cashbook pages display.

use std::cmp::Ordering;

use time::{Date, UtcOffset};

use crate::api::{Credit, DateValue};

/// Parse the `received_at`, `credited_at` and `refunded_at` fields of every credit.
pub fn parse_date_fields(credits: Vec<Credit>, offset: UtcOffset) -> Vec<Credit> {
    credits
        .into_iter()
        .map(|mut credit| {
            for field in [
                &mut credit.received_at,
                &mut credit.credited_at,
                &mut credit.refunded_at,
            ] {
                *field = field.take().map(|value| value.parse(offset));
            }
            credit
        })
        .collect()
}

/// The status a credit is listed under in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CreditStatus {
    Credited,
    Refunded,
    Anonymous,
    Uncredited,
}

impl CreditStatus {
    /// Refunded takes precedence over credited, which takes precedence over anonymous.
    pub fn of(credit: &Credit) -> Self {
        match credit.resolution.as_str() {
            "refunded" => CreditStatus::Refunded,
            "credited" => CreditStatus::Credited,
            _ if credit.anonymous => CreditStatus::Anonymous,
            _ => CreditStatus::Uncredited,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CreditStatus::Credited => "credited",
            CreditStatus::Refunded => "refunded",
            CreditStatus::Anonymous => "anonymous",
            CreditStatus::Uncredited => "uncredited",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            CreditStatus::Credited => "Credited",
            CreditStatus::Refunded => "Refunded",
            CreditStatus::Anonymous => "Anonymous",
            CreditStatus::Uncredited => "Uncredited",
        }
    }
}

/// The credits received on one day, split by status.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    /// `None` holds credits without a parsed receipt date.
    pub date: Option<Date>,
    /// Only statuses with credits are present, in display order.
    pub buckets: Vec<(CreditStatus, Vec<Credit>)>,
}

fn compare_prisoner_numbers(a: &Credit, b: &Credit) -> Ordering {
    a.prisoner_number.cmp(&b.prisoner_number)
}

/// Group consecutive credits by the day they were received, then by status.
///
/// Days keep the order they first appear in. Within a bucket credits are
/// sorted by prisoner number.
pub fn regroup_credits(credits: Vec<Credit>) -> Vec<DayGroup> {
    let mut days: Vec<(Option<Date>, Vec<Credit>)> = Vec::new();

    for credit in credits {
        let date = credit.received_at.as_ref().and_then(DateValue::date);

        match days.last_mut() {
            Some((day, day_credits)) if *day == date => day_credits.push(credit),
            _ => days.push((date, vec![credit])),
        }
    }

    days.into_iter()
        .map(|(date, mut day_credits)| {
            day_credits.sort_by_key(CreditStatus::of);

            let mut buckets: Vec<(CreditStatus, Vec<Credit>)> = Vec::new();
            for credit in day_credits {
                let status = CreditStatus::of(&credit);
                match buckets.last_mut() {
                    Some((bucket_status, bucket)) if *bucket_status == status => {
                        bucket.push(credit)
                    }
                    _ => buckets.push((status, vec![credit])),
                }
            }

            for (_, bucket) in &mut buckets {
                bucket.sort_by(compare_prisoner_numbers);
            }

            DayGroup { date, buckets }
        })
        .collect()
}

/// The total of the credits' amounts in pence, whatever their status.
pub fn sum_credits<'a>(credits: impl IntoIterator<Item = &'a Credit>) -> i64 {
    credits
        .into_iter()
        .map(|credit| credit.amount.unwrap_or(0))
        .sum()
}

/// The style of a status heading in the history, empty for unknown statuses.
pub fn credit_group_class(status: &str) -> &'static str {
    match status {
        "credited" => "border-l-4 border-green-500 text-green-800 dark:text-green-300",
        "uncredited" => "border-l-4 border-yellow-400 text-yellow-800 dark:text-yellow-300",
        "refunded" => "border-l-4 border-gray-400 text-gray-700 dark:text-gray-300",
        "anonymous" => "border-l-4 border-red-500 text-red-800 dark:text-red-300",
        _ => "",
    }
}

/// Set or replace the query parameter `name` in `url`.
///
/// Other parameters are kept, including blank ones, and all parameters are
/// sorted by name.
pub fn url_with_query_param(url: &str, name: &str, value: &str) -> String {
    let (url, fragment) = match url.split_once('#') {
        Some((url, fragment)) => (url, Some(fragment)),
        None => (url, None),
    };
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let mut params: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .unwrap_or_else(|error| {
            tracing::warn!("Could not parse query string {query:?}: {error}");
            Vec::new()
        });
    params.retain(|(key, _)| key != name);
    params.push((name.to_owned(), value.to_owned()));
    params.sort_by(|(a, _), (b, _)| a.cmp(b));

    let query = crate::search::to_query_string(&params);
    match fragment {
        Some(fragment) => format!("{path}?{query}#{fragment}"),
        None => format!("{path}?{query}"),
    }
}

#[cfg(test)]
mod credits_tests {
    use time::{
        UtcOffset,
        macros::{date, datetime, offset},
    };

    use crate::api::{Credit, DateValue};

    use super::{
        CreditStatus, credit_group_class, parse_date_fields, regroup_credits, sum_credits,
        url_with_query_param,
    };

    fn credit(prisoner_number: &str, received_at: &str, resolution: &str) -> Credit {
        Credit {
            prisoner_number: Some(prisoner_number.to_owned()),
            amount: Some(1000),
            resolution: resolution.to_owned(),
            received_at: Some(DateValue::Unparsed(received_at.to_owned())),
            ..Default::default()
        }
    }

    #[test]
    fn parses_supported_formats_and_keeps_the_rest() {
        let mut with_dates = credit("A1234BC", "2018-01-01T10:00:00Z", "pending");
        with_dates.credited_at = Some(DateValue::Unparsed("2018-01-02T09:30:00".to_owned()));
        with_dates.refunded_at = Some(DateValue::Unparsed("2018-01-03".to_owned()));
        let unparseable = credit("A1234BC", "not a date", "pending");

        let parsed = parse_date_fields(vec![with_dates, unparseable], offset!(+1));

        assert_eq!(
            parsed[0].received_at,
            Some(DateValue::DateTime(datetime!(2018-01-01 11:00 +1)))
        );
        assert_eq!(
            parsed[0].credited_at,
            Some(DateValue::DateTime(datetime!(2018-01-02 10:30 +1)))
        );
        assert_eq!(parsed[0].refunded_at, Some(DateValue::Date(date!(2018 - 01 - 03))));
        assert_eq!(
            parsed[1].received_at,
            Some(DateValue::Unparsed("not a date".to_owned()))
        );
    }

    #[test]
    fn converts_to_local_date() {
        let late_evening = credit("A1234BC", "2018-01-01T23:30:00+00:00", "pending");

        let parsed = parse_date_fields(vec![late_evening], offset!(+1));

        assert_eq!(
            parsed[0].received_at.as_ref().and_then(DateValue::date),
            Some(date!(2018 - 01 - 02))
        );
    }

    #[test]
    fn status_precedence() {
        let mut refunded_anonymous = credit("A", "2018-01-01", "refunded");
        refunded_anonymous.anonymous = true;
        let mut anonymous = credit("A", "2018-01-01", "pending");
        anonymous.anonymous = true;

        assert_eq!(CreditStatus::of(&refunded_anonymous), CreditStatus::Refunded);
        assert_eq!(CreditStatus::of(&credit("A", "", "credited")), CreditStatus::Credited);
        assert_eq!(CreditStatus::of(&anonymous), CreditStatus::Anonymous);
        assert_eq!(CreditStatus::of(&credit("A", "", "pending")), CreditStatus::Uncredited);
    }

    #[test]
    fn groups_by_day_then_status() {
        let mut anonymous = credit("A0000AA", "2018-01-02T12:00:00Z", "pending");
        anonymous.anonymous = true;
        let credits = vec![
            credit("B2222BB", "2018-01-02T09:00:00Z", "pending"),
            credit("C3333CC", "2018-01-02T10:00:00Z", "credited"),
            anonymous,
            credit("A1111AA", "2018-01-02T11:00:00Z", "credited"),
            credit("D4444DD", "2018-01-02T13:00:00Z", "refunded"),
            credit("E5555EE", "2018-01-01T09:00:00Z", "pending"),
        ];

        let groups = regroup_credits(parse_date_fields(credits, UtcOffset::UTC));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, Some(date!(2018 - 01 - 02)));
        let statuses: Vec<CreditStatus> = groups[0].buckets.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            statuses,
            vec![
                CreditStatus::Credited,
                CreditStatus::Refunded,
                CreditStatus::Anonymous,
                CreditStatus::Uncredited,
            ]
        );
        let credited: Vec<_> = groups[0].buckets[0]
            .1
            .iter()
            .map(|c| c.prisoner_number.clone().unwrap())
            .collect();
        assert_eq!(credited, vec!["A1111AA", "C3333CC"]);
        assert_eq!(groups[1].date, Some(date!(2018 - 01 - 01)));
        assert_eq!(groups[1].buckets.len(), 1);
    }

    #[test]
    fn groups_can_be_read_twice() {
        let groups = regroup_credits(parse_date_fields(
            vec![credit("A1234BC", "2018-01-01", "credited")],
            UtcOffset::UTC,
        ));

        let first: usize = groups.iter().map(|g| g.buckets.len()).sum();
        let second: usize = groups.iter().map(|g| g.buckets.len()).sum();
        assert_eq!(first, second);
    }

    #[test]
    fn credits_without_a_date_form_their_own_group() {
        let mut undated = credit("A1234BC", "", "pending");
        undated.received_at = None;

        let groups = regroup_credits(vec![undated]);

        assert_eq!(groups[0].date, None);
    }

    #[test]
    fn sums_amounts_treating_missing_as_zero() {
        let mut missing = credit("A", "2018-01-01", "pending");
        missing.amount = None;
        let credits = vec![credit("A", "2018-01-01", "pending"), missing];

        assert_eq!(sum_credits(&credits), 1000);
        assert_eq!(sum_credits(&[]), 0);
    }

    #[test]
    fn unknown_status_has_no_class() {
        assert!(!credit_group_class("credited").is_empty());
        assert_eq!(credit_group_class("locked"), "");
    }

    #[test]
    fn replaces_query_param_and_sorts() {
        assert_eq!(
            url_with_query_param("/cashbook/history?search=&start=2018-01-01&page=2", "page", "3"),
            "/cashbook/history?page=3&search=&start=2018-01-01"
        );
        assert_eq!(
            url_with_query_param("/cashbook/history", "page", "2"),
            "/cashbook/history?page=2"
        );
    }
}
