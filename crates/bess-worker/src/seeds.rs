//! Municipality seed loading: a JSON file of [`MunicipalitySeed`] rows, or a
//! small built-in default list when none is given.

use bess_core::model::MunicipalitySeed;

pub fn default_seeds() -> Vec<MunicipalitySeed> {
    vec![MunicipalitySeed {
        key: "musterstadt".to_string(),
        name: "Musterstadt".to_string(),
        county: "Musterkreis".to_string(),
        state: "Brandenburg".to_string(),
        official_website_url: Some("https://www.musterstadt.de".to_string()),
    }]
}

pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Vec<MunicipalitySeed>> {
    let raw = std::fs::read_to_string(path)?;
    let seeds: Vec<MunicipalitySeed> = serde_json::from_str(&raw)?;
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seeds_is_non_empty() {
        assert!(!default_seeds().is_empty());
    }

    #[test]
    fn load_from_file_parses_seed_list() {
        let dir = std::env::temp_dir();
        let path = dir.join("bess_worker_seeds_test.json");
        std::fs::write(
            &path,
            r#"[{"key":"x","name":"X","county":"Y","state":"Z","official_website_url":null}]"#,
        )
        .unwrap();
        let seeds = load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].key, "x");
    }
}
