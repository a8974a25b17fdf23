//! Change detectors for each kind of monitored source.
//!
//! Every check is a function of the previous target state, freshly fetched
//! content, and the current time. The first successful observation of a
//! target only records a baseline.

pub mod betterstack;
pub mod changelog;
pub mod github_docs;
pub mod sitemap;
pub mod status;
pub mod tweets;

pub use betterstack::fetch_monitor_statuses;
pub use changelog::check_changelog;
pub use github_docs::check_github_docs;
pub use sitemap::{check_sitemap, SitemapFilter};
pub use status::check_status_page;
pub use tweets::check_account_tweets;

pub const X_STATUS: &str = "x_status";
pub const TWITTERAPI_STATUS: &str = "twitterapi_status";
pub const API_TWEETS: &str = "api_tweets";
pub const XDEVELOPERS_TWEETS: &str = "xdevelopers_tweets";
pub const X_DOCS_GITHUB: &str = "x_docs_github";
pub const X_CHANGELOG: &str = "x_changelog";
pub const TWITTERAPI_CHANGELOG: &str = "twitterapi_changelog";
pub const TWITTERAPI_SITEMAP: &str = "twitterapi_sitemap";
/// Pseudo-target used to record failed Better Stack lookups.
pub const BETTERSTACK_PRIMARY: &str = "betterstack_primary";

/// Every target key checked by a monitoring pass.
pub const MONITORED_TARGETS: [&str; 8] = [
    X_STATUS,
    TWITTERAPI_STATUS,
    API_TWEETS,
    XDEVELOPERS_TWEETS,
    X_DOCS_GITHUB,
    X_CHANGELOG,
    TWITTERAPI_CHANGELOG,
    TWITTERAPI_SITEMAP,
];
