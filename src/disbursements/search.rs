//! Searching disbursements that have been confirmed or sent.

use axum::{
    Extension,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    ApiError, Error,
    api::{Disbursement, Page},
    disbursements::{
        DISBURSEMENTS_PATH, DisbursementState,
        forms::{
            PRISONER_NUMBER_FORMAT_MESSAGE, SENDING_METHOD_CHOICES, SERVICE_UNAVAILABLE_MESSAGE,
            is_prisoner_number,
        },
        confirmed_at, pending::disbursement_details, prepare_for_display, sending_method_label,
    },
    endpoints,
    forms::{FormErrors, INVALID_CHOICE_MESSAGE, TextField, choice_label, non_field_errors, select_field},
    html::{
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency, format_date, format_date_value,
    },
    navigation::NavBar,
    pagination::{page_count, page_offset, pagination_nav},
    search::{
        DescriptionTemplates, QueryParams, SearchDescription, api_date, clean_date,
        describe_search, exclusive_upper_bound, page_url, parse_page, validate_range,
    },
    session::Session,
    timezone::get_local_offset,
};

/// Disbursements shown per page.
const PAGE_SIZE: u64 = 10;

const RANGE_ERROR_MESSAGE: &str = "Must be after the ‘from’ date";

const DEFAULT_ORDERING: &str = "-created";
const DEFAULT_DATE_FILTER: &str = "confirmed";

const ORDERING_CHOICES: [(&str, &str); 14] = [
    ("created", "Entry date (oldest to newest)"),
    ("-created", "Entry date (newest to oldest)"),
    ("amount", "Amount (ascending)"),
    ("-amount", "Amount (descending)"),
    ("recipient_name", "Recipient name (A to Z)"),
    ("-recipient_name", "Recipient name (Z to A)"),
    ("prisoner_name", "Prisoner name (A to Z)"),
    ("-prisoner_name", "Prisoner name (Z to A)"),
    ("prisoner_number", "Prisoner number (A to Z)"),
    ("-prisoner_number", "Prisoner number (Z to A)"),
    ("resolution", "Status (A to Z)"),
    ("-resolution", "Status (Z to A)"),
    ("method", "Sending method (A to Z)"),
    ("-method", "Sending method (Z to A)"),
];

const DATE_FILTER_CHOICES: [(&str, &str); 2] =
    [("created", "Date entered"), ("confirmed", "Date confirmed")];

/// Only some resolutions can be searched for.
const RESOLUTION_CHOICES: [(&str, &str); 2] = [("confirmed", "Confirmed"), ("sent", "Sent")];

const DESCRIPTION_TEMPLATES: DescriptionTemplates = DescriptionTemplates {
    filtered: "Showing disbursements {filter_description}, ordered by {ordering_description}.",
    unfiltered: "Showing all disbursements ordered by {ordering_description}.",
    groups: &[
        &["that are {resolution}"],
        &["by {method}"],
        &[
            "with {date_filter} between {date__gte} and {date__lt}",
            "with {date_filter} since {date__gte}",
            "with {date_filter} before {date__lt}",
        ],
        &[
            "from prisoner {prisoner_name} ({prisoner_number})",
            "from prisoners named ‘{prisoner_name}’",
            "from prisoner {prisoner_number}",
        ],
        &["to ‘{recipient_name}’"],
        &["with NOMIS reference {nomis_transaction_id}"],
        &["with invoice number {invoice_number}"],
    ],
};

/// The raw query parameters of the disbursement search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisbursementSearchQuery {
    pub ordering: String,
    pub date_filter: String,
    #[serde(rename = "date__gte")]
    pub date_gte: String,
    #[serde(rename = "date__lt")]
    pub date_lt: String,
    pub prisoner_name: String,
    pub prisoner_number: String,
    pub recipient_name: String,
    pub nomis_transaction_id: String,
    pub invoice_number: String,
    pub resolution: String,
    pub method: String,
    pub page: String,
}

/// A validated disbursement search. Choices left blank keep their defaults.
#[derive(Debug, Clone, Default, PartialEq)]
struct DisbursementSearch {
    ordering: String,
    date_filter: String,
    date_gte: Option<Date>,
    date_lt: Option<Date>,
    prisoner_name: String,
    prisoner_number: String,
    recipient_name: String,
    nomis_transaction_id: String,
    invoice_number: String,
    resolution: String,
    method: String,
    page: u64,
}

fn clean_choice(
    raw: &str,
    field: &'static str,
    choices: &[(&str, &str)],
    errors: &mut FormErrors,
) -> String {
    let value = raw.trim();

    if !value.is_empty() && !choices.iter().any(|(choice, _)| *choice == value) {
        errors.add(field, INVALID_CHOICE_MESSAGE);
    }

    value.to_owned()
}

/// A choice's label for a search description, in lower case.
fn describe_choice(choices: &[(&'static str, &'static str)], value: &str) -> Option<String> {
    choice_label(choices, value).map(str::to_lowercase)
}

impl DisbursementSearch {
    fn clean(query: &DisbursementSearchQuery) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();

        let ordering = clean_choice(&query.ordering, "ordering", &ORDERING_CHOICES, &mut errors);
        let date_filter = clean_choice(
            &query.date_filter,
            "date_filter",
            &DATE_FILTER_CHOICES,
            &mut errors,
        );
        let date_gte = clean_date(&query.date_gte, "date__gte", &mut errors);
        let date_lt = clean_date(&query.date_lt, "date__lt", &mut errors);
        validate_range(date_gte, date_lt, "date__lt", RANGE_ERROR_MESSAGE, &mut errors);

        let prisoner_number = query.prisoner_number.trim().to_uppercase();
        if !prisoner_number.is_empty() && !is_prisoner_number(&prisoner_number) {
            errors.add("prisoner_number", PRISONER_NUMBER_FORMAT_MESSAGE);
        }

        let resolution = clean_choice(
            &query.resolution,
            "resolution",
            &RESOLUTION_CHOICES,
            &mut errors,
        );
        let method = clean_choice(&query.method, "method", &SENDING_METHOD_CHOICES, &mut errors);
        let page = parse_page(&query.page, &mut errors);

        errors.into_result(Self {
            ordering,
            date_filter,
            date_gte,
            date_lt,
            prisoner_name: query.prisoner_name.trim().to_owned(),
            prisoner_number,
            recipient_name: query.recipient_name.trim().to_owned(),
            nomis_transaction_id: query.nomis_transaction_id.trim().to_owned(),
            invoice_number: query.invoice_number.trim().to_owned(),
            resolution,
            method,
            page,
        })
    }

    fn ordering(&self) -> &str {
        if self.ordering.is_empty() {
            DEFAULT_ORDERING
        } else {
            &self.ordering
        }
    }

    fn date_filter(&self) -> &str {
        if self.date_filter.is_empty() {
            DEFAULT_DATE_FILTER
        } else {
            &self.date_filter
        }
    }

    /// The text fields with values, in form order.
    fn text_filters(&self) -> Vec<(&'static str, &str)> {
        [
            ("prisoner_name", self.prisoner_name.as_str()),
            ("prisoner_number", self.prisoner_number.as_str()),
            ("recipient_name", self.recipient_name.as_str()),
            ("nomis_transaction_id", self.nomis_transaction_id.as_str()),
            ("invoice_number", self.invoice_number.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }

    /// The search as it was entered, without the page or empty fields.
    ///
    /// Used to build pagination links.
    fn query_data(&self) -> QueryParams {
        let mut data = QueryParams::new();
        let mut push = |name: &str, value: &str| {
            if !value.is_empty() {
                data.push((name.to_owned(), value.to_owned()));
            }
        };

        push("ordering", &self.ordering);
        push("date_filter", &self.date_filter);
        push("date__gte", &self.date_gte.map(api_date).unwrap_or_default());
        push("date__lt", &self.date_lt.map(api_date).unwrap_or_default());
        for (name, value) in self.text_filters() {
            push(name, value);
        }
        push("resolution", &self.resolution);
        push("method", &self.method);

        data
    }

    /// The query parameters for `GET /disbursements/`.
    ///
    /// Date bounds filter on when the chosen log action happened.
    fn api_request_params(&self) -> QueryParams {
        let mut params = vec![("ordering".to_owned(), self.ordering().to_owned())];

        if self.date_gte.is_some() || self.date_lt.is_some() {
            params.push(("log__action".to_owned(), self.date_filter().to_owned()));
            if let Some(date_gte) = self.date_gte {
                params.push(("logged_at__gte".to_owned(), api_date(date_gte)));
            }
            if let Some(date_lt) = self.date_lt {
                params.push((
                    "logged_at__lt".to_owned(),
                    api_date(exclusive_upper_bound(date_lt)),
                ));
            }
        }

        for (name, value) in self.text_filters() {
            params.push((name.to_owned(), value.to_owned()));
        }

        if !self.method.is_empty() {
            params.push(("method".to_owned(), self.method.clone()));
        }

        if self.resolution.is_empty() {
            for (resolution, _) in RESOLUTION_CHOICES {
                params.push(("resolution".to_owned(), resolution.to_owned()));
            }
        } else {
            params.push(("resolution".to_owned(), self.resolution.clone()));
        }

        params
    }

    fn description(&self) -> SearchDescription {
        let mut filters: Vec<(&'static str, String)> = Vec::new();

        if let Some(resolution) = describe_choice(&RESOLUTION_CHOICES, &self.resolution) {
            filters.push(("resolution", resolution));
        }
        if let Some(method) = describe_choice(&SENDING_METHOD_CHOICES, &self.method) {
            filters.push(("method", method));
        }
        if let Some(date_filter) = describe_choice(&DATE_FILTER_CHOICES, self.date_filter()) {
            filters.push(("date_filter", date_filter));
        }
        if let Some(date_gte) = self.date_gte {
            filters.push(("date__gte", format_date(date_gte)));
        }
        if let Some(date_lt) = self.date_lt {
            filters.push(("date__lt", format_date(date_lt)));
        }
        for (name, value) in self.text_filters() {
            filters.push((name, value.to_owned()));
        }

        let ordering_description =
            describe_choice(&ORDERING_CHOICES, self.ordering()).unwrap_or_default();

        describe_search(&DESCRIPTION_TEMPLATES, &filters, &ordering_description)
    }
}

fn with_blank<'a>(blank: &'a str, choices: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    std::iter::once(("", blank))
        .chain(choices.iter().copied())
        .collect()
}

fn search_form(query: &DisbursementSearchQuery, errors: &FormErrors) -> Markup {
    let ordering = if query.ordering.is_empty() {
        DEFAULT_ORDERING
    } else {
        &query.ordering
    };
    let date_filter = if query.date_filter.is_empty() {
        DEFAULT_DATE_FILTER
    } else {
        &query.date_filter
    };

    html! {
        form
            method="get"
            action=(endpoints::DISBURSEMENT_SEARCH_VIEW)
            id="search-form"
            class="grid gap-4 md:grid-cols-3 items-end"
        {
            (non_field_errors(errors))
            (select_field("ordering", "Order by", &ORDERING_CHOICES, ordering, errors))
            (select_field("date_filter", "Date filter", &DATE_FILTER_CHOICES, date_filter, errors))
            (TextField::new("date__gte", "From", &query.date_gte).help("For example, 17/01/2018").render(errors))
            (TextField::new("date__lt", "To", &query.date_lt).help("For example, 18/01/2018").render(errors))
            (TextField::new("prisoner_name", "Prisoner name", &query.prisoner_name).render(errors))
            (TextField::new("prisoner_number", "Prisoner number", &query.prisoner_number).render(errors))
            (TextField::new("recipient_name", "Recipient name", &query.recipient_name).render(errors))
            (TextField::new("nomis_transaction_id", "NOMIS reference", &query.nomis_transaction_id).render(errors))
            (TextField::new("invoice_number", "Invoice number", &query.invoice_number).render(errors))
            (select_field("resolution", "Status", &with_blank("Any status", &RESOLUTION_CHOICES), &query.resolution, errors))
            (select_field("method", "Sending method", &with_blank("Any method", &SENDING_METHOD_CHOICES), &query.method, errors))

            button type="submit" class="px-4 py-2 bg-blue-500 text-white rounded" { "Search" }
        }
    }
}

fn results_table(disbursements: &[Disbursement]) -> Markup {
    html! {
        table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Entered" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Prisoner" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Recipient" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                    th scope="col" class="px-6 py-4 text-right" { "Amount" }
                }
            }

            tbody
            {
                @for disbursement in disbursements {
                    tr class=(TABLE_ROW_STYLE) data-disbursement-id=(disbursement.id)
                    {
                        td class=(TABLE_CELL_STYLE)
                        {
                            @if let Some(created) = &disbursement.created {
                                (format_date_value(created))
                            }
                        }
                        td class=(TABLE_CELL_STYLE)
                        {
                            (disbursement.prisoner_name) br;
                            (disbursement.prisoner_number)
                        }
                        td class=(TABLE_CELL_STYLE)
                        {
                            (disbursement.recipient_name()) br;
                            (sending_method_label(&disbursement.method))
                        }
                        td class=(TABLE_CELL_STYLE)
                        {
                            span class="resolution" { (disbursement.resolution) }
                            @if let Some(confirmed) = confirmed_at(disbursement) {
                                br; "Confirmed " (format_date_value(confirmed))
                            }
                        }
                        td class="px-6 py-4 text-right tabular-nums"
                        {
                            (format_currency(disbursement.amount))
                        }
                    }
                    tr
                    {
                        td colspan="5" class="px-6 pb-4"
                        {
                            details
                            {
                                summary class="cursor-pointer" { "Details" }
                                (disbursement_details(disbursement))
                            }
                        }
                    }
                }
            }
        }
    }
}

struct SearchResults {
    disbursements: Vec<Disbursement>,
    count: u64,
    page: u64,
    query_data: QueryParams,
    description: SearchDescription,
}

fn search_view(
    query: &DisbursementSearchQuery,
    errors: &FormErrors,
    results: Option<&SearchResults>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::DISBURSEMENT_SEARCH_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                h1 class="text-2xl font-bold" { "Payments made" }

                (search_form(query, errors))

                @if let Some(results) = results {
                    p id="search-description" { (results.description.description) }

                    @if results.disbursements.is_empty() {
                        p id="no-disbursements" { "No payments found." }
                    } @else {
                        p id="result-count" class="text-sm"
                        {
                            (results.count) @if results.count == 1 { " payment" } @else { " payments" }
                        }
                        (results_table(&results.disbursements))
                    }

                    (pagination_nav(results.page, page_count(results.count, PAGE_SIZE), |page| {
                        page_url(endpoints::DISBURSEMENT_SEARCH_VIEW, &results.query_data, page)
                    }))
                }
            }
        }
    );

    base("Payments made", &content)
}

/// Display the disbursements matching the search.
pub async fn get_disbursement_search_page(
    State(state): State<DisbursementState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DisbursementSearchQuery>,
) -> Result<Response, Error> {
    let Some(offset) = get_local_offset(&state.local_timezone) else {
        return Err(Error::InvalidTimezoneError(state.local_timezone));
    };

    let search = match DisbursementSearch::clean(&query) {
        Ok(search) => search,
        Err(errors) => return Ok(search_view(&query, &errors, None).into_response()),
    };

    let page: Page<Disbursement> = match state
        .api
        .session(&session.access_token)
        .get_page(
            DISBURSEMENTS_PATH,
            &search.api_request_params(),
            page_offset(search.page, PAGE_SIZE),
            PAGE_SIZE,
        )
        .await
    {
        Ok(page) => page,
        Err(ApiError::Unauthorized) => return Err(Error::Api(ApiError::Unauthorized)),
        Err(error) => {
            tracing::error!("Could not search disbursements: {error}");
            let mut errors = FormErrors::new();
            errors.add_non_field(SERVICE_UNAVAILABLE_MESSAGE);
            return Ok(search_view(&query, &errors, None).into_response());
        }
    };

    let results = SearchResults {
        disbursements: page
            .results
            .into_iter()
            .map(|disbursement| prepare_for_display(disbursement, offset))
            .collect(),
        count: page.count,
        page: search.page,
        query_data: search.query_data(),
        description: search.description(),
    };

    Ok(search_view(&query, &FormErrors::new(), Some(&results)).into_response())
}
