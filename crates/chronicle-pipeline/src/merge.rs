// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merging of partial analysis results.
//!
//! Topics are keyed by exact name and keep insertion order: existing topics
//! first, new names appended. A same-named incoming topic extends the detail
//! of the existing one, so merging is order-sensitive for topic details.
//! Quotes are deduplicated by sender identity and text, first occurrence wins.

use std::collections::{HashMap, HashSet};

use chronicle_core::{Participant, Quote, Topic};

/// Marker placed between an existing topic detail and its continuation.
pub const CONTINUATION_MARKER: &str = "(continued)";

/// Merge `incoming` topics into `existing`.
pub fn merge_topics(existing: Vec<Topic>, incoming: Vec<Topic>) -> Vec<Topic> {
    let mut merged: Vec<Topic> = Vec::with_capacity(existing.len() + incoming.len());
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for topic in existing.into_iter().chain(incoming) {
        match by_name.get(&topic.name) {
            Some(&slot) => extend_topic(&mut merged[slot], topic),
            None => {
                by_name.insert(topic.name.clone(), merged.len());
                let mut topic = topic;
                topic.contributors = dedup_participants(topic.contributors);
                merged.push(topic);
            }
        }
    }
    merged
}

fn extend_topic(target: &mut Topic, addition: Topic) {
    if !addition.detail.is_empty() {
        if target.detail.is_empty() {
            target.detail = addition.detail;
        } else {
            target.detail = format!(
                "{}\n\n{CONTINUATION_MARKER} {}",
                target.detail, addition.detail
            );
        }
    }
    for contributor in addition.contributors {
        if !target
            .contributors
            .iter()
            .any(|c| c.identity_key() == contributor.identity_key())
        {
            target.contributors.push(contributor);
        }
    }
}

fn dedup_participants(participants: Vec<Participant>) -> Vec<Participant> {
    let mut seen = HashSet::new();
    participants
        .into_iter()
        .filter(|p| seen.insert(p.identity_key().to_string()))
        .collect()
}

/// Concatenate `existing` and `incoming`, dropping repeated `(sender, text)` pairs.
pub fn merge_quotes(existing: Vec<Quote>, incoming: Vec<Quote>) -> Vec<Quote> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    existing
        .into_iter()
        .chain(incoming)
        .filter(|quote| {
            seen.insert((
                quote.sender.identity_key().to_string(),
                quote.text.clone(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn person(id: &str) -> Participant {
        Participant::new(id, format!("Name {id}"))
    }

    fn topic(name: &str, detail: &str, contributors: &[&str]) -> Topic {
        Topic {
            name: name.to_string(),
            contributors: contributors.iter().map(|id| person(id)).collect(),
            detail: detail.to_string(),
        }
    }

    fn quote(sender: &str, text: &str) -> Quote {
        Quote {
            text: text.to_string(),
            sender: person(sender),
            reason: String::new(),
        }
    }

    #[test]
    fn same_name_extends_detail_and_unions_contributors() {
        let merged = merge_topics(
            vec![topic("rust", "ownership", &["a", "b"])],
            vec![topic("rust", "lifetimes", &["b", "c"])],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].detail, "ownership\n\n(continued) lifetimes");
        let ids: Vec<_> = merged[0].contributors.iter().map(|c| c.identity_key()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn new_names_are_appended_in_order() {
        let merged = merge_topics(
            vec![topic("b", "x", &[]), topic("a", "y", &[])],
            vec![topic("c", "z", &[]), topic("a", "w", &[])],
        );
        let names: Vec<_> = merged.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn contributors_without_ids_match_by_display_name() {
        let anonymous = Participant {
            user_id: None,
            display_name: "Ghost".into(),
        };
        let mut first = topic("t", "d1", &[]);
        first.contributors.push(anonymous.clone());
        let mut second = topic("t", "d2", &[]);
        second.contributors.push(anonymous);
        let merged = merge_topics(vec![first], vec![second]);
        assert_eq!(merged[0].contributors.len(), 1);
    }

    #[test]
    fn duplicate_quotes_collapse_to_first() {
        let mut later = quote("a", "hello");
        later.reason = "second".into();
        let merged = merge_quotes(
            vec![quote("a", "hello"), quote("b", "hello")],
            vec![later, quote("a", "bye")],
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].reason, "");
        assert_eq!(merged[2].text, "bye");
    }

    fn arb_topic() -> impl Strategy<Value = Topic> {
        (
            "[a-d]",
            "[a-z]{0,6}",
            proptest::collection::vec("[a-e]", 0..4),
        )
            .prop_map(|(name, detail, ids)| Topic {
                name,
                contributors: ids.iter().map(|id| person(id)).collect(),
                detail,
            })
    }

    fn arb_quote() -> impl Strategy<Value = Quote> {
        ("[a-c]", "[x-z]{1,2}").prop_map(|(sender, text)| quote(&sender, &text))
    }

    proptest! {
        #[test]
        fn merging_nothing_keeps_quotes(quotes in proptest::collection::vec(arb_quote(), 0..12)) {
            let unique = merge_quotes(quotes, Vec::new());
            prop_assert_eq!(merge_quotes(unique.clone(), Vec::new()), unique);
        }

        #[test]
        fn merging_nothing_keeps_topics(topics in proptest::collection::vec(arb_topic(), 0..8)) {
            let merged = merge_topics(topics, Vec::new());
            prop_assert_eq!(merge_topics(merged.clone(), Vec::new()), merged);
        }

        #[test]
        fn quote_union_has_no_duplicates(
            left in proptest::collection::vec(arb_quote(), 0..10),
            right in proptest::collection::vec(arb_quote(), 0..10),
        ) {
            let merged = merge_quotes(left.clone(), right.clone());
            let mut keys = HashSet::new();
            for q in &merged {
                prop_assert!(keys.insert((q.sender.identity_key().to_string(), q.text.clone())));
            }
            for q in left.iter().chain(&right) {
                prop_assert!(keys.contains(&(q.sender.identity_key().to_string(), q.text.clone())));
            }
        }

        #[test]
        fn topic_merge_preserves_prefix_and_identities(
            base in arb_topic(),
            addition in arb_topic(),
        ) {
            let addition = Topic { name: base.name.clone(), ..addition };
            let merged = merge_topics(vec![base.clone()], vec![addition]);
            prop_assert_eq!(merged.len(), 1);
            prop_assert!(merged[0].detail.starts_with(&base.detail));
            let mut ids = HashSet::new();
            for c in &merged[0].contributors {
                prop_assert!(ids.insert(c.identity_key().to_string()));
            }
        }
    }
}
