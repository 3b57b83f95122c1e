//! Amtsblatt (official gazette) discovery adapter: one candidate per issue, or
//! per table-of-contents entry when the TOC is cheap to read.

use url::Url;

use bess_core::model::{Candidate, CandidateId, CandidateStatus, DiscoverySource, Mode, MunicipalitySeed};
use bess_core::prefilter::should_extract;
use bess_http::HttpClient;

use crate::diagnostics::{Diagnostics, DiscoveryMethod};
use crate::site_driven::{crawl_site, extract_links, extract_title};

/// A TOC is considered cheap to read when the issue page itself links to ≤ this
/// many distinct items; past that, reading every item costs more than the
/// marginal candidate it would produce, so we fall back to one candidate for
/// the whole issue.
const MAX_TOC_ENTRIES_TO_EXPAND: usize = 30;

pub async fn discover(client: &HttpClient, seed: &MunicipalitySeed, run_id: &str, mode: Mode) -> (Vec<Candidate>, Diagnostics) {
    let mut diagnostics = Diagnostics::new(DiscoveryMethod::SiteDriven);
    let mut candidates = Vec::new();

    let Some(homepage) = &seed.official_website_url else {
        diagnostics.conclude(0);
        return (candidates, diagnostics);
    };

    let crawl = crawl_site(client, homepage, &mut diagnostics).await;

    for issue_link in &crawl.amtsblatt_links {
        diagnostics.attempt(issue_link.url.clone());
        let html = match client.get(&issue_link.url).await {
            Ok(resp) => String::from_utf8_lossy(&resp.body).into_owned(),
            Err(err) => {
                diagnostics.fail(issue_link.url.clone(), err.to_string());
                continue;
            }
        };

        let title = extract_title(&html).unwrap_or_else(|| issue_link.link_text.clone());
        let Ok(issue_base) = Url::parse(&issue_link.url) else { continue };
        let toc_entries: Vec<_> = extract_links(&issue_base, &html)
            .into_iter()
            .filter(|l| looks_like_document(&l.url))
            .collect();

        if !toc_entries.is_empty() && toc_entries.len() <= MAX_TOC_ENTRIES_TO_EXPAND {
            for entry in toc_entries {
                let score = should_extract(&entry.link_text, &entry.url, DiscoverySource::Amtsblatt, mode);
                candidates.push(Candidate {
                    id: CandidateId::new(),
                    run_id: run_id.to_string(),
                    municipality_key: seed.key.clone(),
                    discovery_source: DiscoverySource::Amtsblatt,
                    title: entry.link_text,
                    url: entry.url,
                    date: None,
                    doc_urls: vec![],
                    prefilter_score: score.score,
                    status: CandidateStatus::Pending,
                });
            }
        } else {
            let score = should_extract(&title, &issue_link.url, DiscoverySource::Amtsblatt, mode);
            candidates.push(Candidate {
                id: CandidateId::new(),
                run_id: run_id.to_string(),
                municipality_key: seed.key.clone(),
                discovery_source: DiscoverySource::Amtsblatt,
                title,
                url: issue_link.url.clone(),
                date: None,
                doc_urls: vec![],
                prefilter_score: score.score,
                status: CandidateStatus::Pending,
            });
        }
    }

    diagnostics.conclude(candidates.len());
    (candidates, diagnostics)
}

fn looks_like_document(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.ends_with(".pdf") || lower.contains("bekanntmachung")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_like_document_accepts_pdf_and_bekanntmachung_paths() {
        assert!(looks_like_document("https://musterstadt.de/amtsblatt/2024-07.pdf"));
        assert!(looks_like_document("https://musterstadt.de/bekanntmachung/123"));
        assert!(!looks_like_document("https://musterstadt.de/kontakt"));
    }
}
