//! Ordered CSS-selector strategies for pulling organic results out of a
//! rendered results page.
//!
//! Each strategy targets one generation of the engine's markup and is a
//! pure function of the parsed document. Strategies are tried in order and
//! the first one that yields a usable (post-filter) set wins; results from
//! different strategies are never merged.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::result::{extract_domain, is_engine_domain, renumber};
use crate::{Result, SearchError, SearchResult};

/// An unfiltered hit as found in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResult {
    pub href: String,
    pub title: String,
    pub snippet: String,
}

/// A single extraction strategy.
pub type ExtractionStrategy = fn(&Html) -> Result<Vec<RawResult>>;

/// Strategies in priority order.
pub const STRATEGIES: &[(&str, ExtractionStrategy)] = &[
    ("classic", classic_containers),
    ("modern", modern_blocks),
    ("heading_links", heading_links),
    ("anchor_scan", anchor_scan),
];

const SNIPPET_SELECTOR: &str =
    "div.VwiC3b, div[data-sncf], span.aCOpRe, div[style*='-webkit-line-clamp']";

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `title/link/snippet` selectors inside each container.
fn from_containers(
    document: &Html,
    containers: &str,
    title: &str,
    link: &str,
) -> Result<Vec<RawResult>> {
    let container_selector = selector(containers)?;
    let title_selector = selector(title)?;
    let link_selector = selector(link)?;
    let snippet_selector = selector(SNIPPET_SELECTOR)?;

    let mut results = Vec::new();
    for element in document.select(&container_selector) {
        let Some(title) = element.select(&title_selector).next().map(text_of) else {
            continue;
        };
        let Some(href) = element
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let snippet = element
            .select(&snippet_selector)
            .next()
            .map(text_of)
            .unwrap_or_default();

        results.push(RawResult {
            href: href.to_string(),
            title,
            snippet,
        });
    }
    Ok(results)
}

/// `div.g` result blocks with an `h3` title.
pub fn classic_containers(document: &Html) -> Result<Vec<RawResult>> {
    from_containers(document, "div.g", "h3", "a[href]")
}

/// Newer wrappers (`div.MjjYud`, `div.tF2Cxc`, `div.N54PNb`).
pub fn modern_blocks(document: &Html) -> Result<Vec<RawResult>> {
    from_containers(
        document,
        "div.tF2Cxc, div.N54PNb, div.MjjYud",
        "h3",
        "div.yuRUbf a[href], a[jsname][href], a[href]",
    )
}

/// Any link wrapping an `h3` inside the results area.
pub fn heading_links(document: &Html) -> Result<Vec<RawResult>> {
    let scope_selector = selector("#search, #rso")?;
    let link_selector = selector("a[href]")?;
    let title_selector = selector("h3")?;
    let snippet_selector = selector(SNIPPET_SELECTOR)?;

    let scopes: Vec<ElementRef<'_>> = document.select(&scope_selector).collect();
    let links: Vec<ElementRef<'_>> = if scopes.is_empty() {
        document.select(&link_selector).collect()
    } else {
        scopes
            .iter()
            .flat_map(|scope| scope.select(&link_selector))
            .collect()
    };

    let mut results = Vec::new();
    for link in links {
        let Some(title) = link.select(&title_selector).next().map(text_of) else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or_default().to_string();

        // The snippet usually sits a few levels up, next to the link block.
        let snippet = link
            .ancestors()
            .take(4)
            .filter_map(ElementRef::wrap)
            .find_map(|ancestor| ancestor.select(&snippet_selector).next())
            .map(text_of)
            .unwrap_or_default();

        results.push(RawResult {
            href,
            title,
            snippet,
        });
    }
    Ok(results)
}

/// Last resort: every external anchor with visible text in the main column.
pub fn anchor_scan(document: &Html) -> Result<Vec<RawResult>> {
    let link_selector = selector(
        "#search a[href^='http'], #rso a[href^='http'], #main a[href^='http'], #main a[href^='/url?']",
    )?;

    Ok(document
        .select(&link_selector)
        .filter_map(|a| {
            let title = text_of(a);
            let href = a.value().attr("href")?;
            Some(RawResult {
                href: href.to_string(),
                title,
                snippet: String::new(),
            })
        })
        .collect())
}

/// Resolves an extracted `href` to an absolute external URL.
///
/// Unwraps `/url?q=` redirects, rejects fragments, the engine's own
/// `/search` and `/url` paths and non-http(s) schemes.
pub fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    let on_engine = url.host_str() == base.host_str();

    if on_engine && url.path() == "/url" {
        let target = url
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        url = Url::parse(&target).ok()?;
    } else if on_engine && url.path().starts_with("/search") {
        return None;
    }

    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Filters raw hits into ranked results.
///
/// Keeps items with a resolvable URL and a non-empty title, drops the
/// engine's own domain and duplicate URLs, and numbers positions in
/// extraction order.
pub fn finalize(raw: Vec<RawResult>, base: &Url, engine_domain: &str) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut results: Vec<SearchResult> = raw
        .into_iter()
        .filter_map(|item| {
            if item.title.trim().is_empty() {
                return None;
            }
            let url = resolve_href(&item.href, base)?;
            let domain = extract_domain(url.as_str())?;
            if is_engine_domain(&domain, engine_domain) {
                return None;
            }
            if !seen.insert(url.as_str().to_string()) {
                return None;
            }
            SearchResult::organic(url.as_str(), item.title.trim(), item.snippet.trim())
        })
        .collect();
    renumber(&mut results);
    results
}

/// Runs the strategies in order; the first non-empty filtered set wins.
///
/// Returns the winning strategy's name with its results, or `None`.
pub fn extract_results(
    html: &str,
    base: &Url,
    engine_domain: &str,
) -> Result<Option<(&'static str, Vec<SearchResult>)>> {
    let document = Html::parse_document(html);
    for (name, strategy) in STRATEGIES {
        let results = finalize(strategy(&document)?, base, engine_domain);
        if !results.is_empty() {
            return Ok(Some((*name, results)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.google.com/").unwrap()
    }

    const CLASSIC: &str = r#"
        <html><body><div id="search">
            <div class="g">
                <a href="https://www.rust-lang.org/"><h3>Rust Programming Language</h3></a>
                <div class="VwiC3b">A language empowering everyone.</div>
            </div>
            <div class="g">
                <a href="/url?q=https://doc.rust-lang.org/book/&sa=U"><h3>The Book</h3></a>
                <div data-sncf="1">The official Rust book.</div>
            </div>
            <div class="g">
                <a href="/search?q=related"><h3>Related searches</h3></a>
            </div>
        </div></body></html>
    "#;

    const MODERN: &str = r#"
        <html><body><div id="rso">
            <div class="MjjYud">
                <div class="yuRUbf"><a jsname="UWckNb" href="https://www.nike.com/running"><h3>Nike Running</h3></a></div>
                <div style="-webkit-line-clamp:2">Shop running shoes.</div>
            </div>
            <div class="MjjYud">
                <div class="yuRUbf"><a href="https://maps.google.com/x"><h3>Map result</h3></a></div>
            </div>
        </div></body></html>
    "#;

    #[test]
    fn test_classic_containers() {
        let document = Html::parse_document(CLASSIC);
        let raw = classic_containers(&document).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0].title, "Rust Programming Language");
        assert_eq!(raw[0].snippet, "A language empowering everyone.");
    }

    #[test]
    fn test_modern_blocks() {
        let document = Html::parse_document(MODERN);
        assert!(classic_containers(&document).unwrap().is_empty());
        let raw = modern_blocks(&document).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].href, "https://www.nike.com/running");
        assert_eq!(raw[0].snippet, "Shop running shoes.");
    }

    #[test]
    fn test_heading_links_without_containers() {
        let html = r#"<html><body><div id="search">
            <div><div><a href="https://runnersworld.com/gear"><h3>Best Shoes</h3></a></div>
            <div class="VwiC3b">Tested by runners.</div></div>
            <a href="https://example.com/no-heading">No heading</a>
        </div></body></html>"#;
        let document = Html::parse_document(html);
        let raw = heading_links(&document).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].title, "Best Shoes");
        assert_eq!(raw[0].snippet, "Tested by runners.");
    }

    #[test]
    fn test_anchor_scan() {
        let html = r#"<html><body><div id="main">
            <a href="https://example.com/a">Example A</a>
            <a href="/preferences">Settings</a>
        </div></body></html>"#;
        let document = Html::parse_document(html);
        let raw = anchor_scan(&document).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].title, "Example A");
    }

    #[test]
    fn test_resolve_href() {
        let base = base();
        assert_eq!(
            resolve_href("/url?q=https://example.com/page&sa=U", &base).unwrap().as_str(),
            "https://example.com/page"
        );
        assert!(resolve_href("#top", &base).is_none());
        assert!(resolve_href("/search?q=x", &base).is_none());
        assert!(resolve_href("javascript:void(0)", &base).is_none());
        assert!(resolve_href("", &base).is_none());
        assert_eq!(
            resolve_href("https://example.com/", &base).unwrap().as_str(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_finalize_filters_and_numbers() {
        let raw = vec![
            RawResult {
                href: "https://a.com/".into(),
                title: "A".into(),
                snippet: String::new(),
            },
            RawResult {
                href: "https://www.google.com/preferences".into(),
                title: "Prefs".into(),
                snippet: String::new(),
            },
            RawResult {
                href: "https://b.com/".into(),
                title: "   ".into(),
                snippet: String::new(),
            },
            RawResult {
                href: "https://a.com/".into(),
                title: "A again".into(),
                snippet: String::new(),
            },
            RawResult {
                href: "https://www.C.com/x".into(),
                title: "C".into(),
                snippet: " s ".into(),
            },
        ];
        let results = finalize(raw, &base(), "google.com");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].domain, "a.com");
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].domain, "c.com");
        assert_eq!(results[1].position, 2);
        assert_eq!(results[1].description, "s");
    }

    #[test]
    fn test_extract_results_first_strategy_wins() {
        let (name, results) = extract_results(CLASSIC, &base(), "google.com")
            .unwrap()
            .unwrap();
        assert_eq!(name, "classic");
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].url, "https://doc.rust-lang.org/book/");
    }

    #[test]
    fn test_extract_results_falls_through_to_modern() {
        let (name, results) = extract_results(MODERN, &base(), "google.com")
            .unwrap()
            .unwrap();
        assert_eq!(name, "modern");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].domain, "nike.com");
    }

    #[test]
    fn test_extract_results_none() {
        let result = extract_results("<html><body><p>nothing</p></body></html>", &base(), "google.com")
            .unwrap();
        assert!(result.is_none());
    }
}
