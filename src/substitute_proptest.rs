//! Property-based tests for flattening, substitution and composition.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::flatmap::FlatMap;
    use crate::overlay::{compose, OverlayComponent};
    use crate::substitute::substitute;
    use crate::tree::{ConfigNode, ConfigTree, Dotted, Scalar};
    use base64::Engine;
    use proptest::prelude::*;

    fn sample_values() -> FlatMap {
        let mut values = FlatMap::new();
        values.insert("applicationDefaultNamespace", "example");
        values.insert("applicationInsecure", true);
        values.insert("applicationApiGrpcPort", 8887_i64);
        values
    }

    // ============================================================================
    // substitution property tests
    // ============================================================================

    proptest! {
        /// Property: content without placeholder syntax is returned unchanged
        #[test]
        fn substitution_identity_without_placeholders(content in "[^$]*") {
            let out = substitute(&content, &sample_values()).unwrap();
            prop_assert_eq!(out, content);
        }

        /// Property: placeholders for unknown keys survive byte for byte
        #[test]
        fn unknown_placeholders_are_preserved(key in "zz[A-Za-z0-9]{0,10}") {
            let content = format!("a: $({key})\nb: $raw({key})\nc: $base64({key})\n");
            let out = substitute(&content, &sample_values()).unwrap();
            prop_assert_eq!(out, content);
        }

        /// Property: a string value is inserted verbatim by `$(key)` and `$raw(key)`
        #[test]
        fn string_values_are_verbatim(key in "[a-z][A-Za-z0-9]{0,12}", value in ".*") {
            let mut values = FlatMap::new();
            values.insert(key.clone(), value.clone());
            let out = substitute(&format!("$({key})|$raw({key})"), &values).unwrap();
            prop_assert_eq!(out, format!("{value}|{value}"));
        }

        /// Property: integers are quoted by `$(key)` and bare with `$raw(key)`
        #[test]
        fn integer_forms(key in "[a-z][A-Za-z0-9]{0,12}", value in any::<i64>()) {
            let mut values = FlatMap::new();
            values.insert(key.clone(), value);
            let out = substitute(&format!("$({key}) $raw({key})"), &values).unwrap();
            prop_assert_eq!(out, format!("\"{value}\" {value}"));
        }

        /// Property: booleans render as their literal text in both forms
        #[test]
        fn boolean_forms(key in "[a-z][A-Za-z0-9]{0,12}", value in any::<bool>()) {
            let mut values = FlatMap::new();
            values.insert(key.clone(), value);
            let out = substitute(&format!("$({key}) $raw({key})"), &values).unwrap();
            prop_assert_eq!(out, format!("{value} {value}"));
        }

        /// Property: `$base64(key)` decodes back to the raw value
        #[test]
        fn base64_decodes_to_raw(key in "[a-z][A-Za-z0-9]{0,12}", value in ".*") {
            let mut values = FlatMap::new();
            values.insert(key.clone(), value.clone());
            let out = substitute(&format!("$base64({key})"), &values).unwrap();
            let decoded = base64::engine::general_purpose::STANDARD.decode(out).unwrap();
            prop_assert_eq!(String::from_utf8(decoded).unwrap(), value);
        }
    }

    // ============================================================================
    // flatten property tests
    // ============================================================================

    proptest! {
        /// Property: one entry per scalar leaf under mappings, none for sequence items
        #[test]
        fn flatten_emits_mapping_leaves_only(
            leaves in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8),
            items in prop::collection::vec("[a-z]{1,6}", 0..5),
        ) {
            let root = ConfigNode::Mapping(vec![
                (
                    "top".to_string(),
                    ConfigNode::Mapping(
                        leaves
                            .iter()
                            .map(|(k, v)| (k.clone(), ConfigNode::Scalar(Scalar::Int(*v))))
                            .collect(),
                    ),
                ),
                (
                    "list".to_string(),
                    ConfigNode::Sequence(items.iter().map(|s| ConfigNode::from(s.as_str())).collect()),
                ),
            ]);
            let flat = ConfigTree::new(root).flatten(&Dotted);

            prop_assert_eq!(flat.len(), leaves.len());
            for key in leaves.keys() {
                let dotted = format!("top.{}", key);
                prop_assert!(flat.contains_key(&dotted));
            }
            prop_assert!(flat.keys().all(|k| !k.starts_with("list")));
        }

        /// Property: the last write of a path wins
        #[test]
        fn put_is_last_write_wins(first in any::<i64>(), second in any::<i64>()) {
            let mut tree = ConfigTree::default();
            tree.put("a.b", first);
            tree.put("a.b", second);
            prop_assert_eq!(tree.scalar("a.b"), Some(&Scalar::Int(second)));
            prop_assert_eq!(tree.flatten(&Dotted).len(), 1);
        }
    }

    // ============================================================================
    // overlay composition property tests
    // ============================================================================

    proptest! {
        /// Property: every component contributes its overlays, or its base alone
        #[test]
        fn compose_resource_count(
            components in prop::collection::vec(
                ("[a-z]{1,8}", prop::collection::vec("[a-z]{1,8}", 0..4)),
                0..8,
            )
        ) {
            let components: Vec<OverlayComponent> = components
                .into_iter()
                .map(|(path, overlays)| OverlayComponent { path, overlays })
                .collect();
            let expected: usize = components.iter().map(|c| c.overlays.len().max(1)).sum();
            let k = compose(&components);
            prop_assert_eq!(k.resources.len(), expected);

            let flattened: Vec<String> = components
                .iter()
                .flat_map(|c| c.resources().into_iter().map(str::to_string).collect::<Vec<_>>())
                .collect();
            prop_assert_eq!(k.resources, flattened);
        }
    }
}
