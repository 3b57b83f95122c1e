//! Municipal website spider: follows same-host links whose anchor text or page
//! title looks planning-related, falling back to a predefined path list when
//! the spider itself yields nothing.

use url::Url;

use bess_core::model::{Candidate, CandidateId, CandidateStatus, DiscoverySource, Mode, MunicipalitySeed};
use bess_core::prefilter::should_extract;
use bess_http::HttpClient;

use crate::diagnostics::{Diagnostics, DiscoveryMethod};
use crate::site_driven::{extract_links, extract_title, MAX_DEPTH, MAX_PAGES};

const ANCHOR_KEYWORDS: &[&str] = &[
    "bauen",
    "planung",
    "bebauungsplan",
    "bauleitplanung",
    "b-plan",
    "stadtplanung",
    "bekanntmachung",
    "satzung",
    "verordnung",
    "amtliche",
    "oeffentlich",
    "verfahren",
    "beteiligung",
    "auslegung",
    "aufstellung",
    "bauvorbescheid",
    "baugenehmigung",
    "bauantrag",
    "bauausschuss",
    "planungsausschuss",
    "gemeindevertretung",
];

const PREDEFINED_FALLBACK_PATHS: &[&str] = &[
    "/bauen-wohnen",
    "/bauamt",
    "/stadtplanung",
    "/bebauungsplaene",
    "/bekanntmachungen",
    "/aktuelles/bekanntmachungen",
];

fn anchor_is_planning_related(text: &str) -> bool {
    let lower = text.to_lowercase();
    ANCHOR_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub async fn discover(client: &HttpClient, seed: &MunicipalitySeed, run_id: &str, mode: Mode) -> (Vec<Candidate>, Diagnostics) {
    let mut diagnostics = Diagnostics::new(DiscoveryMethod::SiteDriven);
    let mut candidates = Vec::new();

    let Some(homepage) = &seed.official_website_url else {
        diagnostics.conclude(0);
        return (candidates, diagnostics);
    };

    let Ok(base) = Url::parse(homepage) else {
        diagnostics.conclude(0);
        return (candidates, diagnostics);
    };

    let spidered = spider_planning_links(client, &base, &mut diagnostics).await;

    let pages = if spidered.is_empty() {
        fallback_pages(&base)
    } else {
        spidered
    };

    for page_url in pages {
        diagnostics.attempt(page_url.clone());
        let html = match client.get(&page_url).await {
            Ok(resp) => String::from_utf8_lossy(&resp.body).into_owned(),
            Err(err) => {
                diagnostics.fail(page_url.clone(), err.to_string());
                continue;
            }
        };
        let title = extract_title(&html).unwrap_or_else(|| page_url.clone());
        let score = should_extract(&title, &page_url, DiscoverySource::MunicipalWebsite, mode);
        candidates.push(Candidate {
            id: CandidateId::new(),
            run_id: run_id.to_string(),
            municipality_key: seed.key.clone(),
            discovery_source: DiscoverySource::MunicipalWebsite,
            title,
            url: page_url,
            date: None,
            doc_urls: vec![],
            prefilter_score: score.score,
            status: CandidateStatus::Pending,
        });
    }

    diagnostics.conclude(candidates.len());
    (candidates, diagnostics)
}

async fn spider_planning_links(client: &HttpClient, base: &Url, diagnostics: &mut Diagnostics) -> Vec<String> {
    use std::collections::{HashSet, VecDeque};

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, u32)> = VecDeque::new();
    queue.push_back((base.to_string(), 0));

    let mut found = Vec::new();
    let mut pages_fetched = 0usize;

    while let Some((url, depth)) = queue.pop_front() {
        if pages_fetched >= MAX_PAGES || visited.contains(&url) {
            continue;
        }
        visited.insert(url.clone());
        diagnostics.attempt(url.clone());

        let html = match client.get(&url).await {
            Ok(resp) => String::from_utf8_lossy(&resp.body).into_owned(),
            Err(err) => {
                diagnostics.fail(url.clone(), err.to_string());
                continue;
            }
        };
        pages_fetched += 1;

        let Ok(page_base) = Url::parse(&url) else { continue };
        for link in extract_links(&page_base, &html) {
            if !same_host(base, &link.url) {
                continue;
            }
            if anchor_is_planning_related(&link.link_text) {
                found.push(link.url.clone());
            }
            if depth < MAX_DEPTH && !visited.contains(&link.url) {
                queue.push_back((link.url, depth + 1));
            }
        }
    }

    found.sort();
    found.dedup();
    found
}

fn same_host(base: &Url, candidate: &str) -> bool {
    Url::parse(candidate).ok().and_then(|u| u.host_str().map(str::to_string)) == base.host_str().map(str::to_string)
}

fn fallback_pages(base: &Url) -> Vec<String> {
    PREDEFINED_FALLBACK_PATHS.iter().filter_map(|path| base.join(path).ok()).map(|u| u.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_matches_planning_keywords() {
        assert!(anchor_is_planning_related("Bebauungsplaene der Stadt"));
        assert!(anchor_is_planning_related("Aktuelle Bekanntmachungen"));
        assert!(!anchor_is_planning_related("Kontakt & Anfahrt"));
    }

    #[test]
    fn fallback_pages_are_joined_against_homepage() {
        let base = Url::parse("https://musterstadt.de").unwrap();
        let pages = fallback_pages(&base);
        assert!(pages.iter().any(|p| p == "https://musterstadt.de/bauamt"));
    }
}
