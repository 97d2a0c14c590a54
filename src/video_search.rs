//! Best-effort external video search.
//!
//! Performs a site-scoped web search against the DuckDuckGo HTML endpoint
//! and scrapes result links. The provider is a capability-checked
//! collaborator: any failure — network error, non-success status, or the
//! feature being disabled — degrades to [`VideoSearchOutcome::Unavailable`]
//! instead of propagating an error, so callers branch on a tri-state
//! outcome rather than handling exceptions.

use scraper::{Html, Selector};
use std::time::Duration;

use crate::config::VideoSearchConfig;
use crate::models::VideoLink;

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Tri-state result of a video search.
#[derive(Debug, Clone)]
pub enum VideoSearchOutcome {
    Found(Vec<VideoLink>),
    Empty,
    Unavailable,
}

pub struct VideoSearch {
    client: Option<reqwest::Client>,
    site: String,
    max_results: usize,
}

impl VideoSearch {
    pub fn new(config: &VideoSearchConfig) -> Self {
        let client = if config.enabled {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .ok()
        } else {
            None
        };

        Self {
            client,
            site: config.site.clone(),
            max_results: config.max_results,
        }
    }

    /// Search for videos on `topic`, scoped to the configured site.
    pub async fn search(&self, topic: &str) -> VideoSearchOutcome {
        let client = match &self.client {
            Some(c) => c,
            None => return VideoSearchOutcome::Unavailable,
        };

        let query = format!("site:{} {}", self.site, topic);
        let response = match client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return VideoSearchOutcome::Unavailable,
        };

        if !response.status().is_success() {
            return VideoSearchOutcome::Unavailable;
        }

        let html = match response.text().await {
            Ok(t) => t,
            Err(_) => return VideoSearchOutcome::Unavailable,
        };

        let links = parse_results(&html, &self.site, self.max_results);
        if links.is_empty() {
            VideoSearchOutcome::Empty
        } else {
            VideoSearchOutcome::Found(links)
        }
    }
}

/// Extract up to `max_results` result links pointing at `site` from a
/// DuckDuckGo HTML results page.
fn parse_results(html: &str, site: &str, max_results: usize) -> Vec<VideoLink> {
    let document = Html::parse_document(html);
    let anchor = match Selector::parse("a.result__a") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut links = Vec::new();
    for element in document.select(&anchor) {
        let href = match element.value().attr("href") {
            Some(h) => unwrap_redirect(h),
            None => continue,
        };
        if !href.contains(site) {
            continue;
        }

        let title = element.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        links.push(VideoLink { title, href });
        if links.len() == max_results {
            break;
        }
    }

    links
}

/// DuckDuckGo wraps result URLs in a redirect
/// (`//duckduckgo.com/l/?uddg=<encoded>`); unwrap to the target URL.
fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    if let Ok(parsed) = url::Url::parse(&absolute) {
        if parsed.path().starts_with("/l/") {
            for (key, value) in parsed.query_pairs() {
                if key == "uddg" {
                    return value.into_owned();
                }
            }
        }
    }

    absolute
}
