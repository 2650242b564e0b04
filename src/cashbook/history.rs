//! Searching credits received over a date range.

use axum::{
    Extension,
    extract::{Query, State},
    http::Uri,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::{Date, Duration};

use crate::{
    ApiError, Error,
    api::{Credit, Page},
    cashbook::{
        CREDITS_PATH, CashbookState,
        credits::{
            DayGroup, credit_group_class, parse_date_fields, regroup_credits, sum_credits,
            url_with_query_param,
        },
    },
    endpoints,
    forms::{FormErrors, TextField, non_field_errors},
    html::{
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_ROW_STYLE, base, format_currency,
        format_date, format_date_value,
    },
    navigation::NavBar,
    pagination::{page_count, page_offset, pagination_nav},
    search::{
        DescriptionTemplates, QueryParams, SearchDescription, api_date, clean_date,
        describe_search, exclusive_upper_bound, parse_page, validate_range,
    },
    session::Session,
    timezone::{get_local_offset, local_today},
};

/// Credits shown per page.
const PAGE_SIZE: u64 = 20;

const SERVICE_UNAVAILABLE_MESSAGE: &str = "This service is currently unavailable";

const RANGE_ERROR_MESSAGE: &str = "Must be after the start date";

const DESCRIPTION_TEMPLATES: DescriptionTemplates = DescriptionTemplates {
    filtered: "Showing credits {filter_description}.",
    unfiltered: "Showing all credits.",
    groups: &[
        &[
            "received between {start} and {end}",
            "received since {start}",
            "received before {end}",
        ],
        &["matching ‘{search}’"],
    ],
};

/// The raw query parameters of the history search.
///
/// The `search` field doubles as the flag for the form having been submitted.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

/// A validated history search.
#[derive(Debug, PartialEq)]
struct HistorySearch {
    start: Option<Date>,
    end: Option<Date>,
    search: String,
    page: u64,
}

impl HistorySearch {
    /// Read the search from `query`, defaulting to the seven days up to `today`
    /// when the form has not been submitted.
    fn clean(query: &HistoryQuery, today: Date) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();

        let (start, end) = if query.search.is_some() {
            (
                clean_date(query.start.as_deref().unwrap_or_default(), "start", &mut errors),
                clean_date(query.end.as_deref().unwrap_or_default(), "end", &mut errors),
            )
        } else {
            (Some(today - Duration::days(7)), Some(today))
        };
        validate_range(start, end, "end", RANGE_ERROR_MESSAGE, &mut errors);

        let page = parse_page(query.page.as_deref().unwrap_or_default(), &mut errors);
        let search = query.search.as_deref().unwrap_or_default().trim().to_owned();

        errors.into_result(Self {
            start,
            end,
            search,
            page,
        })
    }

    fn api_request_params(&self) -> QueryParams {
        let mut params = vec![("ordering".to_owned(), "-received_at".to_owned())];

        if let Some(start) = self.start {
            params.push(("received_at__gte".to_owned(), api_date(start)));
        }
        if let Some(end) = self.end {
            params.push((
                "received_at__lt".to_owned(),
                api_date(exclusive_upper_bound(end)),
            ));
        }
        if !self.search.is_empty() {
            params.push(("search".to_owned(), self.search.clone()));
        }

        params
    }

    fn description(&self) -> SearchDescription {
        let mut filters = Vec::new();

        if let Some(start) = self.start {
            filters.push(("start", format_date(start)));
        }
        if let Some(end) = self.end {
            filters.push(("end", format_date(end)));
        }
        if !self.search.is_empty() {
            filters.push(("search", self.search.clone()));
        }

        describe_search(&DESCRIPTION_TEMPLATES, &filters, "date received")
    }
}

/// The values to show in the search form's inputs.
struct FormValues {
    start: String,
    end: String,
    search: String,
}

impl FormValues {
    fn new(query: &HistoryQuery, today: Date) -> Self {
        if query.search.is_some() {
            Self {
                start: query.start.clone().unwrap_or_default(),
                end: query.end.clone().unwrap_or_default(),
                search: query.search.clone().unwrap_or_default(),
            }
        } else {
            Self {
                start: api_date(today - Duration::days(7)),
                end: api_date(today),
                search: String::new(),
            }
        }
    }
}

fn search_form(values: &FormValues, errors: &FormErrors) -> Markup {
    html! {
        form method="get" action=(endpoints::CREDIT_HISTORY_VIEW) class="grid gap-4 md:grid-cols-4 items-end"
        {
            (non_field_errors(errors))
            (TextField::new("start", "Received since", &values.start).help("For example, 01/08/2018").render(errors))
            (TextField::new("end", "Received before", &values.end).render(errors))
            (TextField::new("search", "Search", &values.search).render(errors))

            button type="submit" class="px-4 py-2 bg-blue-500 text-white rounded" { "Search" }
        }
    }
}

fn day_group_view(group: &DayGroup) -> Markup {
    let day_total = sum_credits(group.buckets.iter().flat_map(|(_, credits)| credits));

    html! {
        section class="day-group space-y-2"
        {
            header class="flex justify-between font-semibold"
            {
                h2 class="day-heading"
                {
                    @match group.date {
                        Some(date) => { (format_date(date)) }
                        None => { "Date unknown" }
                    }
                }
                span class="day-total tabular-nums" { (format_currency(day_total)) }
            }

            @for (status, credits) in &group.buckets {
                h3 class={ "pl-2 text-sm uppercase status-heading " (credit_group_class(status.as_str())) }
                {
                    (status.heading())
                }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    tbody
                    {
                        @for credit in credits {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (credit.prisoner_name.as_deref().unwrap_or_default())
                                    br;
                                    (credit.prisoner_number.as_deref().unwrap_or_default())
                                }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (credit.sender_name.as_deref().unwrap_or("Unknown sender"))
                                }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    @if let Some(credited_at) = &credit.credited_at {
                                        "Credited " (format_date_value(credited_at))
                                        @if let Some(owner_name) = &credit.owner_name {
                                            " by " (owner_name)
                                        }
                                    } @else if let Some(refunded_at) = &credit.refunded_at {
                                        "Refunded " (format_date_value(refunded_at))
                                    }
                                }
                                td class="px-6 py-4 text-right tabular-nums"
                                {
                                    (format_currency(credit.amount.unwrap_or(0)))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

struct HistoryResults {
    groups: Vec<DayGroup>,
    count: u64,
    page: u64,
    description: SearchDescription,
}

fn history_view(
    values: &FormValues,
    errors: &FormErrors,
    results: Option<&HistoryResults>,
    current_url: &str,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::CREDIT_HISTORY_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                h1 class="text-2xl font-bold" { "Credit history" }

                (search_form(values, errors))

                @if let Some(results) = results {
                    p id="search-description" { (results.description.description) }

                    @if results.groups.is_empty() {
                        p id="no-credits" { "No credits found." }
                    }

                    @for group in &results.groups {
                        (day_group_view(group))
                    }

                    (pagination_nav(results.page, page_count(results.count, PAGE_SIZE), |page| {
                        url_with_query_param(current_url, "page", &page.to_string())
                    }))
                }
            }
        }
    );

    base("Credit history", &content)
}

/// Display credits matching the search, grouped by day and status.
pub async fn get_credit_history_page(
    State(state): State<CashbookState>,
    Extension(session): Extension<Session>,
    uri: Uri,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, Error> {
    let (Some(today), Some(offset)) = (
        local_today(&state.local_timezone),
        get_local_offset(&state.local_timezone),
    ) else {
        return Err(Error::InvalidTimezoneError(state.local_timezone));
    };

    let values = FormValues::new(&query, today);
    let current_url = uri.to_string();

    let search = match HistorySearch::clean(&query, today) {
        Ok(search) => search,
        Err(errors) => {
            return Ok(history_view(&values, &errors, None, &current_url).into_response());
        }
    };

    let credits: Page<Credit> = match state
        .api_session(&session)
        .get_page(
            CREDITS_PATH,
            &search.api_request_params(),
            page_offset(search.page, PAGE_SIZE),
            PAGE_SIZE,
        )
        .await
    {
        Ok(credits) => credits,
        Err(ApiError::Unauthorized) => return Err(Error::Api(ApiError::Unauthorized)),
        Err(error) => {
            tracing::error!("Could not search credit history: {error}");
            let mut errors = FormErrors::new();
            errors.add_non_field(SERVICE_UNAVAILABLE_MESSAGE);
            return Ok(history_view(&values, &errors, None, &current_url).into_response());
        }
    };

    let results = HistoryResults {
        groups: regroup_credits(parse_date_fields(credits.results, offset)),
        count: credits.count,
        page: search.page,
        description: search.description(),
    };

    Ok(history_view(&values, &FormErrors::new(), Some(&results), &current_url).into_response())
}

#[cfg(test)]
mod history_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json, Router,
        extract::{FromRef, Query, State},
        http::{StatusCode, Uri},
        routing::get,
    };
    use serde_json::json;
    use time::macros::date;

    use crate::{
        cashbook::{CashbookState, cashbook_test_utils::credit_json},
        session::test_session,
        test_utils::{
            assert_field_error, assert_page_contains, assert_valid_html, parse_html_document,
            select_text, spawn_fake_api, test_app_state,
        },
    };

    use super::{HistoryQuery, HistorySearch, get_credit_history_page};

    fn submitted(start: &str, end: &str, search: &str) -> HistoryQuery {
        HistoryQuery {
            start: Some(start.to_owned()),
            end: Some(end.to_owned()),
            search: Some(search.to_owned()),
            page: None,
        }
    }

    #[test]
    fn defaults_to_last_seven_days() {
        let search = HistorySearch::clean(&HistoryQuery::default(), date!(2018 - 01 - 10)).unwrap();

        assert_eq!(search.start, Some(date!(2018 - 01 - 03)));
        assert_eq!(search.end, Some(date!(2018 - 01 - 10)));
        assert_eq!(search.page, 1);
    }

    #[test]
    fn builds_api_params_with_exclusive_end() {
        let search = HistorySearch::clean(
            &submitted("01/01/2018", "2018-01-31", " halls "),
            date!(2018 - 02 - 01),
        )
        .unwrap();

        let params = search.api_request_params();

        assert!(params.contains(&("received_at__gte".to_owned(), "2018-01-01".to_owned())));
        assert!(params.contains(&("received_at__lt".to_owned(), "2018-02-01".to_owned())));
        assert!(params.contains(&("search".to_owned(), "halls".to_owned())));
    }

    #[test]
    fn describes_filters() {
        let search = HistorySearch::clean(
            &submitted("01/01/2018", "", "halls"),
            date!(2018 - 02 - 01),
        )
        .unwrap();

        assert_eq!(
            search.description().description.into_string(),
            "Showing credits received since <strong>1 Jan 2018</strong> and matching \
            ‘<strong>halls</strong>’."
        );
    }

    #[test]
    fn end_before_start_is_an_error() {
        let errors = HistorySearch::clean(
            &submitted("2018-01-10", "2018-01-01", ""),
            date!(2018 - 02 - 01),
        )
        .unwrap_err();

        assert_eq!(errors.get("end"), vec!["Must be after the start date"]);
    }

    #[tokio::test]
    async fn shows_credits_grouped_by_day() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let recorded = queries.clone();
        let router = Router::new().route(
            "/credits/",
            get(move |Query(query): Query<Vec<(String, String)>>| async move {
                recorded.lock().unwrap().push(query);
                let mut credited = credit_json(2, "B1234CD", 2000);
                credited["resolution"] = json!("credited");
                credited["credited_at"] = json!("2018-01-01T12:00:00Z");
                Json(json!({
                    "count": 45,
                    "results": [credit_json(1, "A1234BC", 1000), credited]
                }))
            }),
        );
        let api_url = spawn_fake_api(router).await;
        let state = CashbookState::from_ref(&test_app_state(&api_url, "http://127.0.0.1:1"));

        let response = get_credit_history_page(
            State(state),
            Extension(test_session()),
            Uri::from_static("/cashbook/history?start=2018-01-01&end=2018-01-02&search=&page=2"),
            Query(HistoryQuery {
                page: Some("2".to_owned()),
                ..submitted("2018-01-01", "2018-01-02", "")
            }),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(select_text(&html, ".day-heading"), vec!["1 Jan 2018"]);
        assert_eq!(select_text(&html, ".day-total"), vec!["£30.00"]);
        assert_eq!(
            select_text(&html, ".status-heading"),
            vec!["Credited", "Uncredited"]
        );
        assert_page_contains(&html, "Credited 1 Jan 2018 12:00 by Test Staff");

        let query = queries.lock().unwrap()[0].clone();
        assert!(query.contains(&("offset".to_owned(), "20".to_owned())));
        assert!(query.contains(&("limit".to_owned(), "20".to_owned())));

        let next = html
            .select(&scraper::Selector::parse("nav.pagination a").unwrap())
            .filter(|link| link.text().any(|text| text.contains("Next")))
            .map(|link| link.value().attr("href").unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            next,
            vec!["/cashbook/history?end=2018-01-02&page=3&search=&start=2018-01-01"]
        );
    }

    #[tokio::test]
    async fn invalid_search_shows_errors_without_results() {
        let state = CashbookState::from_ref(&test_app_state(
            "http://127.0.0.1:1",
            "http://127.0.0.1:1",
        ));

        let response = get_credit_history_page(
            State(state),
            Extension(test_session()),
            Uri::from_static("/cashbook/history?start=nope&search="),
            Query(submitted("nope", "", "")),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;
        assert_field_error(&html, "start", "Enter a valid date.");
        assert!(select_text(&html, "#search-description").is_empty());
    }

    #[tokio::test]
    async fn unavailable_api_shows_an_error_instead_of_results() {
        let router = Router::new().route(
            "/credits/",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))) }),
        );
        let api_url = spawn_fake_api(router).await;
        let state = CashbookState::from_ref(&test_app_state(&api_url, "http://127.0.0.1:1"));

        let response = get_credit_history_page(
            State(state),
            Extension(test_session()),
            Uri::from_static("/cashbook/history"),
            Query(HistoryQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            select_text(&html, "#form-error"),
            vec!["This service is currently unavailable"]
        );
        assert!(select_text(&html, "#search-description").is_empty());
        assert!(select_text(&html, ".day-heading").is_empty());
    }
}
