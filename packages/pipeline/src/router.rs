//! Topic-to-site routing by keyword overlap.
//!
//! Each configured site carries keyword lists at three weights: topic
//! keywords count 10, categories 5, tags 3. Matching is case-insensitive
//! substring containment in either direction, so the topic
//! "artificial intelligence" matches the keyword "AI research" and vice
//! versa. On score ties the first site in iteration order wins.

use serde::{Deserialize, Serialize};

/// A publish target with the keyword lists the router scores against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,

    /// Topic keywords (weight 10)
    #[serde(default)]
    pub topics: Vec<String>,

    /// Category keywords (weight 5)
    #[serde(default)]
    pub categories: Vec<String>,

    /// Tag keywords (weight 3)
    #[serde(default)]
    pub tags: Vec<String>,

    /// WordPress category term IDs attached to posts routed here
    #[serde(default)]
    pub category_ids: Vec<u32>,
}

const TOPIC_WEIGHT: u32 = 10;
const CATEGORY_WEIGHT: u32 = 5;
const TAG_WEIGHT: u32 = 3;

/// Pick the best-matching site for a topic, or `None` when no site scores
/// above zero.
pub fn route<'a>(topic: &str, sites: &'a [SiteConfig]) -> Option<&'a SiteConfig> {
    let topic = topic.trim().to_lowercase();
    if topic.is_empty() {
        return None;
    }

    let mut best: Option<(&SiteConfig, u32)> = None;
    for site in sites {
        let score = score_site(&topic, site);
        if score == 0 {
            continue;
        }
        match best {
            // Strict comparison keeps the first site on ties
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((site, score)),
        }
    }

    best.map(|(site, _)| site)
}

/// Score one site against a lowercased topic.
pub fn score_site(topic_lower: &str, site: &SiteConfig) -> u32 {
    let count = |keywords: &[String]| -> u32 {
        keywords
            .iter()
            .filter(|k| keyword_matches(topic_lower, k))
            .count() as u32
    };

    count(&site.topics) * TOPIC_WEIGHT
        + count(&site.categories) * CATEGORY_WEIGHT
        + count(&site.tags) * TAG_WEIGHT
}

fn keyword_matches(topic_lower: &str, keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    topic_lower.contains(&keyword) || keyword.contains(topic_lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, topics: &[&str], categories: &[&str], tags: &[&str]) -> SiteConfig {
        SiteConfig {
            name: name.to_string(),
            topics: topics.iter().map(|s| s.to_string()).collect(),
            categories: categories.iter().map(|s| s.to_string()).collect(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            category_ids: Vec::new(),
        }
    }

    #[test]
    fn topic_keyword_match_beats_tag_only_match() {
        let sites = vec![
            site("tags-only", &[], &[], &["artificial intelligence", "ai", "ml"]),
            site("topical", &["artificial intelligence"], &[], &[]),
        ];

        let routed = route("artificial intelligence", &sites).unwrap();
        assert_eq!(routed.name, "topical");

        // The topical site scores at least the full topic weight
        assert!(score_site("artificial intelligence", &sites[1]) >= 10);
    }

    #[test]
    fn no_overlap_yields_no_match() {
        let sites = vec![site("cooking", &["recipes", "baking"], &["food"], &["dinner"])];
        assert!(route("quantum computing", &sites).is_none());
    }

    #[test]
    fn matching_is_case_insensitive_and_bidirectional() {
        let sites = vec![site("tech", &["AI"], &[], &[])];

        // keyword contained in topic
        assert!(route("the future of ai in medicine", &sites).is_some());
        // topic contained in keyword
        let sites = vec![site("tech", &["machine learning systems"], &[], &[])];
        assert!(route("Machine Learning", &sites).is_some());
    }

    #[test]
    fn first_site_wins_on_score_tie() {
        let sites = vec![
            site("alpha", &["rust"], &[], &[]),
            site("beta", &["rust"], &[], &[]),
        ];

        assert_eq!(route("rust performance", &sites).unwrap().name, "alpha");
    }

    #[test]
    fn weights_accumulate_across_lists() {
        let s = site("mixed", &["rust"], &["programming"], &["systems"]);
        assert_eq!(score_site("rust systems programming", &s), 10 + 5 + 3);
    }

    #[test]
    fn blank_topic_routes_nowhere() {
        let sites = vec![site("anything", &["a"], &[], &[])];
        assert!(route("   ", &sites).is_none());
    }
}
