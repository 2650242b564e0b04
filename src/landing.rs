//! The landing page that links to the cashbook and disbursements.

use axum::{
    Extension,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    session::Session,
};

struct Card {
    heading: &'static str,
    link: &'static str,
    description: &'static str,
}

const CARDS: [Card; 2] = [
    Card {
        heading: "Digital cashbook",
        link: endpoints::CASHBOOK_VIEW,
        description: "Credit money into a prisoner’s account",
    },
    Card {
        heading: "Digital disbursements",
        link: endpoints::DISBURSEMENT_START,
        description: "Send money out of a prisoner’s account by bank transfer or cheque",
    },
];

fn landing_view(staff_name: &str, prisons: &[String]) -> Markup {
    let nav_bar = NavBar::new(endpoints::ROOT).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-6"
            {
                header
                {
                    h1 class="text-2xl font-bold" { "Money sent to prisoners" }

                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Signed in as " (staff_name)
                        @if !prisons.is_empty() {
                            " at " (prisons.join(", "))
                        }
                    }
                }

                ul class="grid gap-4 md:grid-cols-2"
                {
                    @for card in &CARDS {
                        li
                        {
                            a
                                href=(card.link)
                                class="block h-full p-6 bg-white border border-gray-200 rounded-lg shadow
                                    hover:bg-gray-100 dark:bg-gray-800 dark:border-gray-700 dark:hover:bg-gray-700"
                            {
                                h2 class="mb-2 text-xl font-bold tracking-tight text-blue-600 dark:text-blue-400"
                                {
                                    (card.heading)
                                }

                                p class="font-normal text-gray-700 dark:text-gray-400"
                                {
                                    (card.description)
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Home", &content)
}

/// Display the landing page.
pub async fn get_landing_page(Extension(session): Extension<Session>) -> Response {
    let prisons: Vec<String> = session
        .user
        .prisons
        .iter()
        .map(|prison| prison.name.clone())
        .collect();

    landing_view(&session.user.full_name(), &prisons).into_response()
}

#[cfg(test)]
mod landing_tests {
    use axum::Extension;

    use crate::{
        endpoints,
        session::test_session,
        test_utils::{assert_page_contains, assert_status_ok, assert_valid_html, parse_html_document},
    };

    use super::get_landing_page;

    #[tokio::test]
    async fn shows_cards_and_staff_name() {
        let response = get_landing_page(Extension(test_session())).await;

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_page_contains(&html, "Signed in as Test Staff at HMP Brixton");
        assert_page_contains(&html, "Digital cashbook");
        assert_page_contains(&html, "Digital disbursements");

        for link in [endpoints::CASHBOOK_VIEW, endpoints::DISBURSEMENT_START] {
            let selector = scraper::Selector::parse(&format!("main a[href=\"{link}\"]")).unwrap();
            assert_eq!(html.select(&selector).count(), 1, "want one card linking to {link}");
        }
    }
}
