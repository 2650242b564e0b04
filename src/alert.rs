//! Alert messages for HTMX endpoints.
//!
//! Alerts are swapped into the `#alert-container` element of the base layout.
//! Forms opt in with `hx-target-error="#alert-container"`.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// An alert to display to the member of staff.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with some details.
    Success { message: String, details: String },
    /// A success message on its own.
    SuccessSimple { message: String },
    /// An error message with details on how to fix the problem.
    Error { message: String, details: String },
}

impl Alert {
    pub fn into_html(self) -> Html<String> {
        Html(self.into_markup().into_string())
    }

    fn into_markup(self) -> Markup {
        let (container_style, message, details) = match self {
            Alert::Success { message, details } => (SUCCESS_STYLE, message, details),
            Alert::SuccessSimple { message } => (SUCCESS_STYLE, message, String::new()),
            Alert::Error { message, details } => (ERROR_STYLE, message, details),
        };

        html! {
            div
                role="alert"
                class=(container_style)
                hx-on:click="this.remove()"
            {
                p class="font-semibold" { (message) }

                @if !details.is_empty() {
                    p class="text-sm" { (details) }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

const SUCCESS_STYLE: &str = "p-4 mb-4 rounded border cursor-pointer text-green-800 \
    bg-green-50 border-green-300 dark:bg-gray-800 dark:text-green-400 \
    dark:border-green-800";

const ERROR_STYLE: &str = "p-4 mb-4 rounded border cursor-pointer text-red-800 \
    bg-red-50 border-red-300 dark:bg-gray-800 dark:text-red-400 dark:border-red-800";
