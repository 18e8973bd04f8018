// URL canonicalization, deduplication and ranking

use crate::result::UrlRecord;
use std::collections::HashMap;
use url::Url;

/// Canonical form of `url`: fragment removed, query parameters sorted by key.
/// Unparseable input is returned unchanged.
pub fn normalize(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    parsed.set_fragment(None);

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        // Stable sort keeps repeated keys in their original relative order
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }

    parsed.to_string()
}

/// Collapses records with the same canonical URL. The survivor carries the
/// canonical URL; a later duplicate replaces it only with strictly higher
/// bounty potential. First-seen order is kept.
pub fn deduplicate(records: Vec<UrlRecord>) -> Vec<UrlRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<UrlRecord> = Vec::with_capacity(records.len());

    for mut record in records {
        let canonical = normalize(&record.url);
        record.url = canonical.clone();

        match index.get(&canonical) {
            Some(&pos) => {
                if record.bounty_potential > unique[pos].bounty_potential {
                    unique[pos] = record;
                }
            }
            None => {
                index.insert(canonical, unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

/// Orders by bounty potential, then pages with forms, then form count, then URL.
pub fn sort_by_bounty_potential(mut records: Vec<UrlRecord>) -> Vec<UrlRecord> {
    records.sort_by(|a, b| {
        b.bounty_potential
            .cmp(&a.bounty_potential)
            .then_with(|| b.has_forms.cmp(&a.has_forms))
            .then_with(|| b.form_count.cmp(&a.form_count))
            .then_with(|| a.url.cmp(&b.url))
    });
    records
}

pub fn process(records: Vec<UrlRecord>) -> Vec<UrlRecord> {
    sort_by_bounty_potential(deduplicate(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{BountyPotential, UrlSource};

    fn record(url: &str, potential: BountyPotential) -> UrlRecord {
        UrlRecord {
            bounty_potential: potential,
            ..UrlRecord::new(url.to_string(), UrlSource::Crawl, 1)
        }
    }

    #[test]
    fn test_normalize_strips_fragment() {
        assert_eq!(
            normalize("https://example.com/page#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_normalize_sorts_query() {
        assert_eq!(
            normalize("https://example.com/search?z=1&a=2&m=3"),
            "https://example.com/search?a=2&m=3&z=1"
        );
    }

    #[test]
    fn test_normalize_keeps_repeated_key_order() {
        assert_eq!(
            normalize("https://example.com/?b=2&a=x&b=1"),
            "https://example.com/?a=x&b=2&b=1"
        );
    }

    #[test]
    fn test_normalize_drops_empty_query() {
        assert_eq!(normalize("https://example.com/path?"), "https://example.com/path");
    }

    #[test]
    fn test_normalize_invalid_unchanged() {
        assert_eq!(normalize("not a url"), "not a url");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            "https://example.com/a?q=hello world&b=%2F#frag",
            "http://example.com:8080/x/y/?z=&y=1",
            "https://example.com",
            "garbage::",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_deduplicate_keeps_higher_potential() {
        let records = vec![
            record("https://example.com/a?y=1&x=2", BountyPotential::Low),
            record("https://example.com/a?x=2&y=1#top", BountyPotential::High),
        ];
        let unique = deduplicate(records);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].url, "https://example.com/a?x=2&y=1");
        assert_eq!(unique[0].bounty_potential, BountyPotential::High);
    }

    #[test]
    fn test_deduplicate_tie_keeps_first() {
        let mut first = record("https://example.com/b", BountyPotential::Medium);
        first.source = UrlSource::Sitemap;
        let second = record("https://example.com/b#x", BountyPotential::Medium);

        let unique = deduplicate(vec![first, second]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].source, UrlSource::Sitemap);
    }

    #[test]
    fn test_deduplicate_never_downgrades() {
        let records = vec![
            record("https://example.com/c", BountyPotential::High),
            record("https://example.com/c", BountyPotential::Low),
        ];
        let unique = deduplicate(records);
        assert_eq!(unique[0].bounty_potential, BountyPotential::High);
    }

    #[test]
    fn test_sort_high_first() {
        let sorted = sort_by_bounty_potential(vec![
            record("b", BountyPotential::Low),
            record("a", BountyPotential::High),
        ]);
        let urls: Vec<&str> = sorted.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b"]);
    }

    #[test]
    fn test_sort_tiebreaks() {
        let mut with_two_forms = record("https://example.com/z", BountyPotential::Medium);
        with_two_forms.has_forms = true;
        with_two_forms.form_count = 2;
        let mut with_one_form = record("https://example.com/y", BountyPotential::Medium);
        with_one_form.has_forms = true;
        with_one_form.form_count = 1;
        let plain_b = record("https://example.com/b", BountyPotential::Medium);
        let plain_a = record("https://example.com/a", BountyPotential::Medium);

        let sorted = sort_by_bounty_potential(vec![plain_b, with_one_form, plain_a, with_two_forms]);
        let urls: Vec<&str> = sorted.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/z",
                "https://example.com/y",
                "https://example.com/a",
                "https://example.com/b",
            ]
        );
    }

    #[test]
    fn test_process() {
        let processed = process(vec![
            record("https://example.com/low", BountyPotential::Low),
            record("https://example.com/high#1", BountyPotential::High),
            record("https://example.com/high#2", BountyPotential::Medium),
        ]);
        assert_eq!(processed.len(), 2);
        assert_eq!(processed[0].url, "https://example.com/high");
        assert_eq!(processed[1].url, "https://example.com/low");
    }
}
