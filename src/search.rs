//! The parts of a search form that do not depend on what is being searched.
//!
//! A search form is read from the query string on every request. It is turned
//! into query parameters for the payments API, a query string for pagination
//! links and a sentence describing the active filters, e.g. "Showing
//! disbursements **by cheque**, ordered by entry date (newest to oldest)."

use std::collections::HashMap;

use maud::{Markup, PreEscaped, html};
use time::{Date, Duration, Month};

use crate::forms::FormErrors;

/// Query parameters, in order. Keys may repeat.
pub type QueryParams = Vec<(String, String)>;

/// The message shown for a page number that is not a whole number of at least one.
pub const INVALID_PAGE_MESSAGE: &str = "Ensure this value is greater than or equal to 1.";

/// The message shown for a date that could not be parsed.
pub const INVALID_DATE_MESSAGE: &str = "Enter a valid date.";

/// Parse the `page` query parameter, defaulting to the first page.
pub fn parse_page(raw: &str, errors: &mut FormErrors) -> u64 {
    let raw = raw.trim();

    if raw.is_empty() {
        return 1;
    }

    match raw.parse::<u64>() {
        Ok(page) if page >= 1 => page,
        _ => {
            errors.add("page", INVALID_PAGE_MESSAGE);
            1
        }
    }
}

/// Parse a date entered as `YYYY-MM-DD`, `DD/MM/YYYY` or `DD/MM/YY`.
///
/// Two digit years from 69 to 99 are in the 1900s, the rest in the 2000s.
pub fn parse_search_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();

    let (year, month, day) = if let Some((year, rest)) = raw.split_once('-') {
        let (month, day) = rest.split_once('-')?;
        if year.len() != 4 {
            return None;
        }
        (year.parse::<i32>().ok()?, month, day)
    } else {
        let mut parts = raw.splitn(3, '/');
        let day = parts.next()?;
        let month = parts.next()?;
        let year = parts.next()?;
        let year = match year.len() {
            4 => year.parse::<i32>().ok()?,
            2 => {
                let year = year.parse::<i32>().ok()?;
                if year < 69 { 2000 + year } else { 1900 + year }
            }
            _ => return None,
        };
        (year, month, day)
    };

    let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
    let day = day.parse::<u8>().ok()?;

    Date::from_calendar_date(year, month, day).ok()
}

/// Parse an optional date field, recording [INVALID_DATE_MESSAGE] against `field` on failure.
pub fn clean_date(raw: &str, field: &'static str, errors: &mut FormErrors) -> Option<Date> {
    if raw.trim().is_empty() {
        return None;
    }

    let date = parse_search_date(raw);
    if date.is_none() {
        errors.add(field, INVALID_DATE_MESSAGE);
    }

    date
}

/// Record `message` against `upper_field` if both bounds are given and the lower one is later.
pub fn validate_range(
    lower: Option<Date>,
    upper: Option<Date>,
    upper_field: &'static str,
    message: &str,
    errors: &mut FormErrors,
) {
    if let (Some(lower), Some(upper)) = (lower, upper)
        && lower > upper
    {
        errors.add(upper_field, message);
    }
}

/// The API takes exclusive upper bounds, so an inclusive "to" date is moved on a day.
pub fn exclusive_upper_bound(date: Date) -> Date {
    date.saturating_add(Duration::days(1))
}

/// Format a date for an API query parameter, e.g. "2018-01-31".
pub fn api_date(date: Date) -> String {
    date.to_string()
}

/// Build a query string from `params`.
pub fn to_query_string(params: &[(String, String)]) -> String {
    serde_urlencoded::to_string(params).unwrap_or_else(|error| {
        tracing::error!("Could not encode query parameters {params:?}: {error}");
        String::new()
    })
}

/// A link to `page` of a search, keeping the other filters.
pub fn page_url(path: &str, query_data: &[(String, String)], page: u64) -> String {
    let mut params = query_data.to_vec();
    params.push(("page".to_owned(), page.to_string()));

    format!("{path}?{}", to_query_string(&params))
}

/// Fill the `{name}` placeholders in `template` from `values`.
///
/// Text outside placeholders is HTML escaped. Values are inserted as they are.
/// Returns `None` if any placeholder has no value.
fn fill_template(template: &str, values: &HashMap<&str, String>) -> Option<String> {
    let mut filled = String::new();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let end = start + rest[start..].find('}')?;
        filled.push_str(&html! { (&rest[..start]) }.into_string());
        filled.push_str(values.get(&rest[start + 1..end])?);
        rest = &rest[end + 1..];
    }

    filled.push_str(&html! { (rest) }.into_string());

    Some(filled)
}

/// Join phrases with commas and a final "and".
fn join_phrases(phrases: &[String]) -> String {
    match phrases {
        [] => String::new(),
        [only] => only.clone(),
        [all_but_last @ .., last] => format!("{} and {last}", all_but_last.join(", ")),
    }
}

/// The sentences a search form uses to describe itself.
#[derive(Debug, Clone, Copy)]
pub struct DescriptionTemplates {
    /// Used when at least one filter is active, with `{filter_description}`
    /// and `{ordering_description}` placeholders.
    pub filtered: &'static str,
    /// Used when no filter is active, with an `{ordering_description}` placeholder.
    pub unfiltered: &'static str,
    /// Groups of phrases. The first phrase in a group whose placeholders can
    /// all be filled describes that group.
    pub groups: &'static [&'static [&'static str]],
}

/// A rendered description of a search.
#[derive(Debug, Clone)]
pub struct SearchDescription {
    pub has_filters: bool,
    pub description: Markup,
}

/// Describe a search whose active filters have the display values in `filters`.
///
/// Filter values are escaped and shown in bold, the ordering is shown as is.
pub fn describe_search(
    templates: &DescriptionTemplates,
    filters: &[(&'static str, String)],
    ordering_description: &str,
) -> SearchDescription {
    let values: HashMap<&str, String> = filters
        .iter()
        .map(|(name, value)| (*name, html! { strong { (value) } }.into_string()))
        .collect();

    let phrases: Vec<String> = templates
        .groups
        .iter()
        .filter_map(|group| {
            group
                .iter()
                .find_map(|template| fill_template(template, &values))
        })
        .collect();

    let ordering_description = html! { (ordering_description) }.into_string();
    let has_filters = !phrases.is_empty();

    let mut sentence_values = HashMap::new();
    sentence_values.insert("ordering_description", ordering_description);
    let template = if has_filters {
        sentence_values.insert("filter_description", join_phrases(&phrases));
        templates.filtered
    } else {
        templates.unfiltered
    };

    let description = fill_template(template, &sentence_values).unwrap_or_else(|| {
        tracing::error!("Search description template {template:?} has unknown placeholders");
        String::new()
    });

    SearchDescription {
        has_filters,
        description: PreEscaped(description),
    }
}

#[cfg(test)]
mod search_tests {
    use std::collections::HashMap;

    use time::macros::date;

    use crate::forms::FormErrors;

    use super::{
        DescriptionTemplates, clean_date, describe_search, exclusive_upper_bound, fill_template,
        join_phrases, page_url, parse_page, parse_search_date, validate_range,
    };

    const TEMPLATES: DescriptionTemplates = DescriptionTemplates {
        filtered: "Showing things {filter_description}, ordered by {ordering_description}.",
        unfiltered: "Showing all things ordered by {ordering_description}.",
        groups: &[
            &["by {method}"],
            &[
                "between {date__gte} and {date__lt}",
                "since {date__gte}",
                "before {date__lt}",
            ],
            &["to ‘{recipient_name}’"],
        ],
    };

    #[test]
    fn parses_supported_date_formats() {
        assert_eq!(parse_search_date("2018-01-31"), Some(date!(2018 - 01 - 31)));
        assert_eq!(parse_search_date("31/01/2018"), Some(date!(2018 - 01 - 31)));
        assert_eq!(parse_search_date("31/01/18"), Some(date!(2018 - 01 - 31)));
        assert_eq!(parse_search_date("31/01/99"), Some(date!(1999 - 01 - 31)));
    }

    #[test]
    fn rejects_invalid_dates() {
        assert_eq!(parse_search_date("31/02/2018"), None);
        assert_eq!(parse_search_date("yesterday"), None);
        assert_eq!(parse_search_date("18-01-31"), None);

        let mut errors = FormErrors::new();
        assert_eq!(clean_date("", "date__gte", &mut errors), None);
        assert!(errors.is_empty());
        assert_eq!(clean_date("nope", "date__gte", &mut errors), None);
        assert!(errors.has("date__gte"));
    }

    #[test]
    fn page_defaults_to_one() {
        let mut errors = FormErrors::new();

        assert_eq!(parse_page("", &mut errors), 1);
        assert_eq!(parse_page("3", &mut errors), 3);
        assert!(errors.is_empty());

        assert_eq!(parse_page("0", &mut errors), 1);
        assert!(errors.has("page"));
    }

    #[test]
    fn lower_bound_after_upper_bound_is_an_error_on_the_upper_field() {
        let mut errors = FormErrors::new();

        validate_range(
            Some(date!(2018 - 01 - 02)),
            Some(date!(2018 - 01 - 01)),
            "date__lt",
            "Must be after the ‘from’ date",
            &mut errors,
        );

        assert_eq!(errors.get("date__lt"), vec!["Must be after the ‘from’ date"]);
        assert!(!errors.has("date__gte"));
    }

    #[test]
    fn equal_or_missing_bounds_are_valid() {
        let mut errors = FormErrors::new();

        validate_range(
            Some(date!(2018 - 01 - 01)),
            Some(date!(2018 - 01 - 01)),
            "date__lt",
            "Must be after",
            &mut errors,
        );
        validate_range(None, Some(date!(2018 - 01 - 01)), "date__lt", "Must be after", &mut errors);

        assert!(errors.is_empty());
    }

    #[test]
    fn upper_bound_moves_on_a_day() {
        assert_eq!(
            exclusive_upper_bound(date!(2018 - 12 - 31)),
            date!(2019 - 01 - 01)
        );
    }

    #[test]
    fn template_needs_every_placeholder() {
        let mut values = HashMap::new();
        values.insert("date__gte", "1 Jan 2018".to_owned());

        assert_eq!(fill_template("between {date__gte} and {date__lt}", &values), None);
        assert_eq!(
            fill_template("since {date__gte}", &values),
            Some("since 1 Jan 2018".to_owned())
        );
    }

    #[test]
    fn joins_with_commas_and_and() {
        let phrases = ["a", "b", "c"].map(str::to_owned);

        assert_eq!(join_phrases(&phrases[..1]), "a");
        assert_eq!(join_phrases(&phrases[..2]), "a and b");
        assert_eq!(join_phrases(&phrases), "a, b and c");
    }

    #[test]
    fn describes_unfiltered_search() {
        let got = describe_search(&TEMPLATES, &[], "entry date (newest to oldest)");

        assert!(!got.has_filters);
        assert_eq!(
            got.description.into_string(),
            "Showing all things ordered by entry date (newest to oldest)."
        );
    }

    #[test]
    fn describes_filters_in_group_order_with_escaped_values() {
        let filters = [
            ("recipient_name", "Tom & Jerry".to_owned()),
            ("date__gte", "1 Jan 2018".to_owned()),
            ("method", "cheque".to_owned()),
        ];

        let got = describe_search(&TEMPLATES, &filters, "amount (ascending)");

        assert!(got.has_filters);
        assert_eq!(
            got.description.into_string(),
            "Showing things by <strong>cheque</strong>, since <strong>1 Jan 2018</strong> \
            and to ‘<strong>Tom &amp; Jerry</strong>’, ordered by amount (ascending)."
        );
    }

    #[test]
    fn page_url_keeps_filters() {
        let query_data = vec![("method".to_owned(), "cheque".to_owned())];

        assert_eq!(
            page_url("/disbursements/search", &query_data, 2),
            "/disbursements/search?method=cheque&page=2"
        );
    }
}
