//! The navigation bar, split into the cashbook and disbursement sections.

use maud::{Markup, html};

use crate::endpoints;

/// One half of the app, shown as its own group of links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Cashbook,
    Disbursements,
}

impl Section {
    fn title(self) -> &'static str {
        match self {
            Section::Cashbook => "Digital cashbook",
            Section::Disbursements => "Digital disbursements",
        }
    }

    fn id(self) -> &'static str {
        match self {
            Section::Cashbook => "nav-cashbook",
            Section::Disbursements => "nav-disbursements",
        }
    }
}

struct NavLink {
    url: &'static str,
    title: &'static str,
    section: Section,
}

const LINKS: [NavLink; 7] = [
    NavLink {
        url: endpoints::CASHBOOK_VIEW,
        title: "Overview",
        section: Section::Cashbook,
    },
    NavLink {
        url: endpoints::NEW_CREDITS_VIEW,
        title: "New credits",
        section: Section::Cashbook,
    },
    NavLink {
        url: endpoints::LOCKED_CREDITS_VIEW,
        title: "In progress",
        section: Section::Cashbook,
    },
    NavLink {
        url: endpoints::CREDIT_HISTORY_VIEW,
        title: "History",
        section: Section::Cashbook,
    },
    NavLink {
        url: endpoints::DISBURSEMENT_START,
        title: "New payment",
        section: Section::Disbursements,
    },
    NavLink {
        url: endpoints::PENDING_DISBURSEMENTS_VIEW,
        title: "Confirm payments",
        section: Section::Disbursements,
    },
    NavLink {
        url: endpoints::DISBURSEMENT_SEARCH_VIEW,
        title: "Payments made",
        section: Section::Disbursements,
    },
];

/// Path prefixes and the link they belong to, most specific first.
///
/// Every wizard step lives under `/disbursements/`, so that prefix comes
/// after the pending and search pages.
const ROUTE_PREFIXES: [(&str, &str); 6] = [
    (endpoints::NEW_CREDITS_VIEW, endpoints::NEW_CREDITS_VIEW),
    (endpoints::LOCKED_CREDITS_VIEW, endpoints::LOCKED_CREDITS_VIEW),
    (endpoints::CREDIT_HISTORY_VIEW, endpoints::CREDIT_HISTORY_VIEW),
    (endpoints::PENDING_DISBURSEMENTS_VIEW, endpoints::PENDING_DISBURSEMENTS_VIEW),
    (endpoints::DISBURSEMENT_SEARCH_VIEW, endpoints::DISBURSEMENT_SEARCH_VIEW),
    ("/disbursements/", endpoints::DISBURSEMENT_START),
];

/// The link that should be highlighted on the page at `path`, if any.
fn active_link(path: &str) -> Option<&'static str> {
    if path.trim_end_matches('/') == endpoints::CASHBOOK_VIEW {
        return Some(endpoints::CASHBOOK_VIEW);
    }

    ROUTE_PREFIXES
        .iter()
        .find(|(prefix, _)| is_under(path, prefix))
        .map(|(_, link)| *link)
}

fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

fn link_class(is_current: bool) -> &'static str {
    if is_current {
        "block py-1 px-2 rounded-sm text-blue-700 font-semibold bg-blue-50
        dark:text-blue-300 dark:bg-blue-900/30"
    } else {
        "block py-1 px-2 rounded-sm text-gray-700 hover:text-blue-700
        hover:bg-gray-100 dark:text-gray-200 dark:hover:bg-gray-800"
    }
}

pub struct NavBar {
    active: Option<&'static str>,
}

impl NavBar {
    /// Get the navigation bar for the page served at `current_path`.
    ///
    /// Wizard steps highlight "New payment" and a single pending payment
    /// highlights "Confirm payments".
    pub fn new(current_path: &str) -> NavBar {
        NavBar {
            active: active_link(current_path),
        }
    }

    fn section_html(&self, section: Section) -> Markup {
        let is_active_section = LINKS
            .iter()
            .any(|link| link.section == section && self.active == Some(link.url));

        html!(
            div id=(section.id()) class="nav-section"
            {
                p
                    class="text-xs font-semibold uppercase tracking-wide text-gray-500 dark:text-gray-400"
                    data-active=[is_active_section.then_some("true")]
                {
                    (section.title())
                }

                ul class="flex flex-wrap gap-2 mt-1 text-sm font-medium"
                {
                    @for link in LINKS.iter().filter(|link| link.section == section) {
                        @let is_current = self.active == Some(link.url);
                        li {
                            a
                                href=(link.url)
                                class=(link_class(is_current))
                                aria-current=[is_current.then_some("page")]
                            {
                                (link.title)
                            }
                        }
                    }
                }
            }
        )
    }

    pub fn into_html(self) -> Markup {
        html!(
            nav class="bg-white border-b border-gray-200 dark:bg-gray-900 dark:border-gray-700"
            {
                div class="max-w-screen-xl mx-auto p-4 space-y-3"
                {
                    div class="flex items-center justify-between"
                    {
                        a href=(endpoints::ROOT) class="flex items-center space-x-3"
                        {
                            img src="/static/favicon-128x128.png" alt="Prisoner money logo" class="h-8";
                            span class="text-2xl font-semibold whitespace-nowrap dark:text-white"
                            {
                                "Prisoner money"
                            }
                        }

                        a href=(endpoints::LOG_OUT) id="log-out" class=(link_class(false)) { "Log out" }
                    }

                    div class="flex flex-col gap-3 lg:flex-row lg:gap-12"
                    {
                        (self.section_html(Section::Cashbook))
                        (self.section_html(Section::Disbursements))
                    }
                }
            }
        )
    }
}
