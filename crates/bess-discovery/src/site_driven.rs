//! The shared link-discovery primitive every adapter starts from: crawl a
//! municipality's homepage plus a handful of well-known seed paths, follow
//! same-host links up to a small page/depth budget, and classify what's found
//! as RIS-shaped, Amtsblatt-shaped, or neither.

use std::collections::{HashSet, VecDeque};

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use bess_http::HttpClient;

use crate::diagnostics::{Diagnostics, DiscoveryMethod};

pub const MAX_PAGES: usize = 20;
pub const MAX_DEPTH: u32 = 2;

static HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("static regex compiles"));
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?is)<title[^>]*>(.*?)</title>"#).expect("static regex compiles"));

/// Domain/path fragments that mark a link as leading into a Ratsinformationssystem.
const RIS_MARKERS: &[&str] = &[
    "allris", "sessionnet", "ratsinfo", "/ris", "/sessionnet", "/si0100", "/to0100", "/gremien", "/sitzung",
];

/// Path fragments that mark a link as an official gazette / statutory notice.
const AMTSBLATT_MARKERS: &[&str] = &["/amtsblatt", "/bekanntmachung", "/veroeffentlichung", "/auslegung", "/bauleitplanung"];

const WELL_KNOWN_SEEDS: &[&str] = &["/", "/sitemap.xml", "/impressum", "/rathaus", "/verwaltung", "/bauen", "/bekanntmachungen"];

#[derive(Debug, Clone)]
pub struct DiscoveredLink {
    pub url: String,
    pub link_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Ris,
    Amtsblatt,
    Other,
}

pub fn classify_link(url: &str) -> LinkKind {
    let lower = url.to_lowercase();
    if RIS_MARKERS.iter().any(|m| lower.contains(m)) {
        LinkKind::Ris
    } else if AMTSBLATT_MARKERS.iter().any(|m| lower.contains(m)) {
        LinkKind::Amtsblatt
    } else {
        LinkKind::Other
    }
}

#[derive(Debug, Default)]
pub struct SiteCrawlResult {
    pub ris_links: Vec<DiscoveredLink>,
    pub amtsblatt_links: Vec<DiscoveredLink>,
    pub other_links: Vec<DiscoveredLink>,
}

/// Crawls `homepage` plus well-known seed paths, following same-host links up to
/// [`MAX_PAGES`] fetches and [`MAX_DEPTH`] hops, classifying every link found.
/// Never propagates a fetch error — every failure is recorded on `diagnostics`
/// and the crawl continues with whatever pages did succeed.
pub async fn crawl_site(client: &HttpClient, homepage: &str, diagnostics: &mut Diagnostics) -> SiteCrawlResult {
    diagnostics.method = DiscoveryMethod::SiteDriven;

    let base = match Url::parse(homepage) {
        Ok(u) => u,
        Err(_) => return SiteCrawlResult::default(),
    };

    let mut seeds: Vec<String> = WELL_KNOWN_SEEDS
        .iter()
        .filter_map(|path| base.join(path).ok())
        .map(|u| u.to_string())
        .collect();
    seeds.dedup();

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, u32)> = seeds.into_iter().map(|s| (s, 0)).collect();
    let mut result = SiteCrawlResult::default();
    let mut pages_fetched = 0usize;

    while let Some((url, depth)) = queue.pop_front() {
        if pages_fetched >= MAX_PAGES || visited.contains(&url) {
            continue;
        }
        visited.insert(url.clone());
        diagnostics.attempt(url.clone());

        let body = match client.get(&url).await {
            Ok(resp) => resp.body,
            Err(err) => {
                diagnostics.fail(url.clone(), err.to_string());
                continue;
            }
        };
        pages_fetched += 1;

        let html = String::from_utf8_lossy(&body).into_owned();
        if url.ends_with("sitemap.xml") {
            for loc in extract_sitemap_locs(&html) {
                record_link(&loc, &loc, &mut result);
                if depth < MAX_DEPTH {
                    queue.push_back((loc, depth + 1));
                }
            }
            continue;
        }

        for link in extract_links(&base, &html) {
            record_link(&link.url, &link.link_text, &mut result);
            if depth < MAX_DEPTH && same_host(&base, &link.url) && !visited.contains(&link.url) {
                queue.push_back((link.url, depth + 1));
            }
        }
    }

    result
}

fn record_link(url: &str, link_text: &str, result: &mut SiteCrawlResult) {
    let link = DiscoveredLink {
        url: url.to_string(),
        link_text: link_text.to_string(),
    };
    match classify_link(url) {
        LinkKind::Ris => result.ris_links.push(link),
        LinkKind::Amtsblatt => result.amtsblatt_links.push(link),
        LinkKind::Other => result.other_links.push(link),
    }
}

fn same_host(base: &Url, candidate: &str) -> bool {
    Url::parse(candidate)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .map(|host| Some(host) == base.host_str().map(|h| h.to_string()))
        .unwrap_or(false)
}

pub(crate) fn extract_links(base: &Url, html: &str) -> Vec<DiscoveredLink> {
    let mut links = Vec::new();
    for cap in HREF_RE.captures_iter(html) {
        let Some(href) = cap.get(1) else { continue };
        let href = href.as_str();
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") || href.starts_with("tel:") {
            continue;
        }
        if let Ok(resolved) = base.join(href) {
            links.push(DiscoveredLink {
                url: resolved.to_string(),
                link_text: href.to_string(),
            });
        }
    }
    links
}

fn extract_sitemap_locs(xml: &str) -> Vec<String> {
    static LOC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?is)<loc>(.*?)</loc>"#).expect("static regex compiles"));
    LOC_RE.captures_iter(xml).filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string())).collect()
}

pub fn extract_title(html: &str) -> Option<String> {
    TITLE_RE.captures(html).and_then(|c| c.get(1)).map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ris_style_links() {
        assert_eq!(classify_link("https://sessionnet.example.de/public/to010"), LinkKind::Ris);
        assert_eq!(classify_link("https://ratsinfo.musterstadt.de"), LinkKind::Ris);
    }

    #[test]
    fn classifies_amtsblatt_style_links() {
        assert_eq!(classify_link("https://musterstadt.de/amtsblatt-2024-12.pdf"), LinkKind::Amtsblatt);
    }

    #[test]
    fn classifies_other_links() {
        assert_eq!(classify_link("https://musterstadt.de/kontakt"), LinkKind::Other);
    }

    #[test]
    fn extract_links_resolves_relative_urls_and_skips_anchors() {
        let base = Url::parse("https://musterstadt.de/rathaus").unwrap();
        let html = r#"<a href="#top">top</a><a href="/amtsblatt">Amtsblatt</a><a href="mailto:x@y.de">mail</a>"#;
        let links = extract_links(&base, html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://musterstadt.de/amtsblatt");
    }

    #[test]
    fn extract_title_reads_html_title_tag() {
        let html = "<html><head><title> Amtsblatt Nr. 5 </title></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Amtsblatt Nr. 5"));
    }

    #[test]
    fn extract_sitemap_locs_reads_loc_entries() {
        let xml = "<urlset><url><loc>https://musterstadt.de/a</loc></url><url><loc>https://musterstadt.de/b</loc></url></urlset>";
        let locs = extract_sitemap_locs(xml);
        assert_eq!(locs, vec!["https://musterstadt.de/a".to_string(), "https://musterstadt.de/b".to_string()]);
    }
}
