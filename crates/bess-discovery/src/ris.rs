//! RIS (Ratsinformationssystem) discovery adapter: council sessions, agenda
//! items, and their attachments.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use bess_core::lattice::PROCEDURE_SIGNAL;
use bess_core::model::{Candidate, CandidateId, CandidateStatus, DiscoverySource, Mode, MunicipalitySeed};
use bess_core::normalize::normalize;
use bess_core::prefilter::should_extract;
use bess_http::HttpClient;

use crate::diagnostics::Diagnostics;
use crate::site_driven::{crawl_site, extract_links, LinkKind};

/// Committees a session may belong to. Sessions outside this allowlist are
/// still paginated through (they may sit in a shared listing) but their items
/// are not turned into candidates.
const COMMITTEE_ALLOWLIST: &[&str] = &[
    "bauausschuss",
    "hauptausschuss",
    "gemeindevertretung",
    "stadtverordnetenversammlung",
    "wirtschaftsausschuss",
    "umweltausschuss",
];

const CONSECUTIVE_OLD_SESSION_STOP: u32 = 3;
static SESSION_FLOOR: Lazy<NaiveDate> = Lazy::new(|| match NaiveDate::from_ymd_opt(2023, 1, 1) {
    Some(d) => d,
    None => unreachable!("2023-01-01 is a valid date"),
});

static GERMAN_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("static regex compiles"));

fn find_date(text: &str) -> Option<NaiveDate> {
    let caps = GERMAN_DATE_RE.captures(text)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Sanitizes a municipality name into the slug form used by the pattern-based
/// fallback entry-URL guess (strip parentheses, fold umlauts, collapse
/// anything outside `[a-z0-9-]` to `-`).
pub fn sanitize_municipality_slug(name: &str) -> String {
    let without_parens: String = {
        let mut out = String::new();
        let mut depth = 0i32;
        for ch in name.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ if depth <= 0 => out.push(ch),
                _ => {}
            }
        }
        out
    };
    let folded = normalize(&without_parens).text;
    let mut slug = String::new();
    let mut last_was_dash = false;
    for ch in folded.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

fn pattern_based_entry_urls(seed: &MunicipalitySeed) -> Vec<String> {
    let slug = sanitize_municipality_slug(&seed.name);
    vec![
        format!("https://ratsinfo.{slug}.de"),
        format!("https://sessionnet.{slug}.de/bi"),
        format!("https://{slug}.ratsinfomanagement.net"),
    ]
}

struct SessionAgendaItem {
    title: String,
    item_url: String,
    doc_urls: Vec<String>,
}

/// Runs RIS discovery for one municipality: finds the entry point (site-driven
/// first, pattern-guessed fallback otherwise), walks allowlisted committees,
/// paginates sessions reverse-chronologically until three consecutive
/// pre-2023 sessions are seen, and turns agenda items into scored candidates.
pub async fn discover(client: &HttpClient, seed: &MunicipalitySeed, run_id: &str, mode: Mode) -> (Vec<Candidate>, Diagnostics) {
    let mut diagnostics = Diagnostics::new(crate::diagnostics::DiscoveryMethod::SiteDriven);
    let mut candidates = Vec::new();

    let entry_points = resolve_entry_points(client, seed, &mut diagnostics).await;

    let mut committee_links = Vec::new();
    for entry in &entry_points {
        diagnostics.attempt(entry.clone());
        match client.get(entry).await {
            Ok(resp) => {
                let html = String::from_utf8_lossy(&resp.body).into_owned();
                if let Ok(base) = Url::parse(entry) {
                    for link in extract_links(&base, &html) {
                        if COMMITTEE_ALLOWLIST.iter().any(|c| link.link_text.to_lowercase().contains(c)) {
                            committee_links.push(link.url);
                        }
                    }
                }
                if committee_links.is_empty() {
                    // No committee structure found on this entry page; treat the
                    // entry itself as the single session listing to paginate.
                    committee_links.push(entry.clone());
                }
            }
            Err(err) => diagnostics.fail(entry.clone(), err.to_string()),
        }
    }
    committee_links.sort();
    committee_links.dedup();

    for committee_url in committee_links {
        let items = paginate_sessions(client, &committee_url, &mut diagnostics).await;
        for item in items {
            let score = should_extract(&item.title, &item.item_url, DiscoverySource::Ris, mode);
            candidates.push(Candidate {
                id: CandidateId::new(),
                run_id: run_id.to_string(),
                municipality_key: seed.key.clone(),
                discovery_source: DiscoverySource::Ris,
                title: item.title,
                url: item.item_url,
                date: None,
                doc_urls: item.doc_urls,
                prefilter_score: score.score,
                status: CandidateStatus::Pending,
            });
        }
    }

    diagnostics.conclude(candidates.len());
    (candidates, diagnostics)
}

async fn resolve_entry_points(client: &HttpClient, seed: &MunicipalitySeed, diagnostics: &mut Diagnostics) -> Vec<String> {
    if let Some(homepage) = &seed.official_website_url {
        let mut site_diag = Diagnostics::new(crate::diagnostics::DiscoveryMethod::SiteDriven);
        let crawl = crawl_site(client, homepage, &mut site_diag).await;
        diagnostics.attempted_urls.extend(site_diag.attempted_urls);
        diagnostics.failed_urls.extend(site_diag.failed_urls);
        if !crawl.ris_links.is_empty() {
            let mut ranked = crawl.ris_links;
            ranked.sort_by_key(|l| std::cmp::Reverse(ris_signal_strength(&l.url)));
            return ranked.into_iter().map(|l| l.url).take(1).collect();
        }
    }
    diagnostics.method = crate::diagnostics::DiscoveryMethod::PatternGuessing;
    pattern_based_entry_urls(seed)
}

fn ris_signal_strength(url: &str) -> u32 {
    let lower = url.to_lowercase();
    ["allris", "sessionnet", "ratsinfo"].iter().filter(|m| lower.contains(*m)).count() as u32
}

/// Paginates a committee's session listing reverse-chronologically. Stops once
/// three consecutive sessions are older than 2023-01-01, which tolerates
/// listings that aren't perfectly monotonic without paginating forever.
async fn paginate_sessions(client: &HttpClient, committee_url: &str, diagnostics: &mut Diagnostics) -> Vec<SessionAgendaItem> {
    let mut items = Vec::new();
    let mut consecutive_old = 0u32;

    diagnostics.attempt(committee_url.to_string());
    let html = match client.get(committee_url).await {
        Ok(resp) => String::from_utf8_lossy(&resp.body).into_owned(),
        Err(err) => {
            diagnostics.fail(committee_url.to_string(), err.to_string());
            return items;
        }
    };

    let Ok(base) = Url::parse(committee_url) else { return items };
    let session_links = extract_links(&base, &html);

    for link in session_links {
        if consecutive_old >= CONSECUTIVE_OLD_SESSION_STOP {
            break;
        }
        let session_date = find_date(&link.link_text);
        match session_date {
            Some(d) if d < *SESSION_FLOOR => {
                consecutive_old += 1;
                continue;
            }
            _ => consecutive_old = 0,
        }

        diagnostics.attempt(link.url.clone());
        let session_html = match client.get(&link.url).await {
            Ok(resp) => String::from_utf8_lossy(&resp.body).into_owned(),
            Err(err) => {
                diagnostics.fail(link.url.clone(), err.to_string());
                continue;
            }
        };
        let Ok(session_base) = Url::parse(&link.url) else { continue };
        for agenda_link in extract_links(&session_base, &session_html) {
            if matches!(crate::site_driven::classify_link(&agenda_link.url), LinkKind::Other)
                && looks_like_document(&agenda_link.url)
            {
                continue;
            }
            let mut item = SessionAgendaItem {
                title: agenda_link.link_text.clone(),
                item_url: agenda_link.url.clone(),
                doc_urls: Vec::new(),
            };

            if item.doc_urls.is_empty() && matches_privileged_term(&item.title) {
                diagnostics.attempt(item.item_url.clone());
                if let Ok(resp) = client.get(&item.item_url).await {
                    let item_html = String::from_utf8_lossy(&resp.body).into_owned();
                    if let Ok(item_base) = Url::parse(&item.item_url) {
                        item.doc_urls = extract_links(&item_base, &item_html)
                            .into_iter()
                            .filter(|l| looks_like_document(&l.url))
                            .map(|l| l.url)
                            .collect();
                    }
                }
            }
            items.push(item);
        }
    }

    items
}

fn looks_like_document(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.ends_with(".pdf") || lower.ends_with(".doc") || lower.ends_with(".docx")
}

fn matches_privileged_term(title: &str) -> bool {
    let normalized = normalize(title);
    PROCEDURE_SIGNAL.any_match(&normalized.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_slug_strips_parens_and_folds_umlauts() {
        let slug = sanitize_municipality_slug("Musterstadt (Brandenburg) Südost");
        assert_eq!(slug, "musterstadt-suedost");
    }

    #[test]
    fn find_date_parses_german_format() {
        assert_eq!(find_date("Sitzung am 05.03.2024"), NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn find_date_none_when_absent() {
        assert_eq!(find_date("Sitzung ohne Datum"), None);
    }

    #[test]
    fn privileged_term_matches_einvernehmen() {
        assert!(matches_privileged_term("Einvernehmen gemaess Par. 36 BauGB"));
    }

    #[test]
    fn privileged_term_rejects_unrelated_title() {
        assert!(!matches_privileged_term("Haushaltsplan 2025"));
    }

    #[test]
    fn pattern_based_entry_urls_use_sanitized_slug() {
        let seed = MunicipalitySeed {
            key: "musterstadt".into(),
            name: "Musterstadt".into(),
            county: "Musterkreis".into(),
            state: "Brandenburg".into(),
            official_website_url: None,
        };
        let urls = pattern_based_entry_urls(&seed);
        assert!(urls.iter().any(|u| u.contains("musterstadt")));
    }
}
