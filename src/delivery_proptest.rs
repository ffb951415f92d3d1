//! Property-based tests for delivery expansion.
//!
//! These tests use proptest to generate random, well-formed delivery sections
//! and verify that the expansion invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::delivery::{expand_section, normalize_owners};
    use crate::tree::ConfigNode;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn dedup_keys(entries: Vec<(String, ConfigNode)>) -> Vec<(String, ConfigNode)> {
        let mut seen = BTreeSet::new();
        entries
            .into_iter()
            .filter(|(key, _)| seen.insert(key.clone()))
            .collect()
    }

    fn branches() -> impl Strategy<Value = ConfigNode> {
        prop_oneof![
            Just(ConfigNode::Null),
            "[a-z]{1,6}".prop_map(ConfigNode::String),
            prop::collection::vec("[a-z]{1,6}".prop_map(ConfigNode::String), 1..4)
                .prop_map(ConfigNode::Sequence),
            prop::collection::vec(("[a-z]{1,6}", Just(ConfigNode::Null)), 1..4)
                .prop_map(|entries| ConfigNode::Mapping(dedup_keys(entries))),
        ]
    }

    fn repositories() -> impl Strategy<Value = ConfigNode> {
        prop_oneof![
            "[a-z]{1,6}".prop_map(ConfigNode::String),
            prop::collection::vec(("[a-z]{1,6}", branches()), 1..4)
                .prop_map(|entries| ConfigNode::Mapping(dedup_keys(entries))),
        ]
    }

    fn owners() -> impl Strategy<Value = Vec<(String, ConfigNode)>> {
        prop::collection::vec(("[A-Z][a-z]{0,4}", repositories()), 1..4).prop_map(dedup_keys)
    }

    fn section() -> impl Strategy<Value = ConfigNode> {
        prop::collection::vec(("[a-z_]{1,8}", owners()), 1..6).prop_map(|deliveries| {
            ConfigNode::Mapping(
                dedup_keys(
                    deliveries
                        .into_iter()
                        .map(|(name, owners)| (name, ConfigNode::Mapping(owners)))
                        .collect(),
                ),
            )
        })
    }

    proptest! {
        /// Property: expanding the same tree twice yields identical records
        #[test]
        fn expansion_is_deterministic(section in section()) {
            let first = expand_section(&section).unwrap();
            let second = expand_section(&section).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Property: records share a name exactly when they share an index,
        /// and indices cover every delivery without gaps
        #[test]
        fn index_identifies_delivery_name(section in section()) {
            let records = expand_section(&section).unwrap();
            let deliveries = match &section {
                ConfigNode::Mapping(entries) => entries.len(),
                _ => unreachable!(),
            };

            let mut by_index: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
            let mut by_name: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
            for record in &records {
                by_index.entry(record.index()).or_default().insert(record.name().to_string());
                by_name.entry(record.name().to_string()).or_default().insert(record.index());
            }

            prop_assert!(by_index.values().all(|names| names.len() == 1));
            prop_assert!(by_name.values().all(|indices| indices.len() == 1));
            let indices: Vec<usize> = by_index.keys().copied().collect();
            prop_assert_eq!(indices, (0..deliveries).collect::<Vec<_>>());
        }

        /// Property: indices never decrease along the emitted sequence
        #[test]
        fn records_are_grouped_by_delivery(section in section()) {
            let records = expand_section(&section).unwrap();
            prop_assert!(records.windows(2).all(|w| w[0].index() <= w[1].index()));
        }

        /// Property: every record carries non-empty names
        #[test]
        fn record_fields_are_non_empty(section in section()) {
            for record in expand_section(&section).unwrap() {
                prop_assert!(!record.name().is_empty());
                prop_assert!(!record.owner().is_empty());
                prop_assert!(!record.repository().is_empty());
                prop_assert!(!record.branch().is_empty());
            }
        }

        /// Property: an owners mapping split into a list of single-owner
        /// fragments normalizes to the same owners
        #[test]
        fn owner_fragments_normalize_like_mapping(owners in owners()) {
            let mapping = ConfigNode::Mapping(owners.clone());
            let fragments = ConfigNode::Sequence(
                owners
                    .into_iter()
                    .map(|entry| ConfigNode::Sequence(vec![ConfigNode::Mapping(vec![entry])]))
                    .collect(),
            );
            prop_assert_eq!(
                normalize_owners(&mapping).unwrap(),
                normalize_owners(&fragments).unwrap()
            );
        }
    }
}
