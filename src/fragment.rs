//! YAML fragment generation for sequence-shaped configuration sections.
//!
//! Some params sections are lists the flattener deliberately skips: the
//! node-pool option sets and the load-balancer address pool. They are turned
//! into pre-formatted YAML text here and stored under a synthetic flat-map
//! key, so the substitution pass can inline them like any other value.
//!
//! Conversion is two steps. The tree node is first read into a typed shape
//! ([`OptionSet`], `Vec<String>`), then a pure formatter produces the text.

use crate::error::{Error, Result};
use crate::tree::{ConfigNode, Scalar};

/// Flat-map key holding the formatted node-pool options.
pub const NODE_POOL_OPTIONS_KEY: &str = "applicationNodePoolOptions";

/// Flat-map key holding the formatted address pool.
pub const METALLB_ADDRESSES_KEY: &str = "metalLbAddresses";

/// Indentation of address entries after the first one, matching the
/// position of the address list inside the load-balancer config map.
pub const ADDRESS_INDENT: usize = 6;

/// One named option of a node pool.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSet {
    /// Key of the name field, e.g. `name` or `displayName`.
    pub name_key: String,
    pub name: Scalar,
    /// Remaining fields in document order.
    pub fields: Vec<(String, Scalar)>,
}

impl OptionSet {
    /// Read one option set from a mapping node.
    ///
    /// The first key containing `name` becomes the set's name.
    pub fn from_node(node: &ConfigNode, index: usize) -> Result<Self> {
        let entries = node.as_mapping().ok_or_else(|| Error::InvalidValue {
            key: format!("nodePool.options[{}]", index),
            message: "expected a mapping of option fields".to_string(),
        })?;

        let mut name = None;
        let mut fields = Vec::new();
        for (key, value) in entries {
            let scalar = value.as_scalar().ok_or_else(|| Error::InvalidValue {
                key: format!("nodePool.options[{}].{}", index, key),
                message: "option fields must be scalars".to_string(),
            })?;
            if name.is_none() && key.contains("name") {
                name = Some((key.clone(), scalar.clone()));
            } else {
                fields.push((key.clone(), scalar.clone()));
            }
        }

        let (name_key, name) = name.ok_or_else(|| Error::InvalidValue {
            key: format!("nodePool.options[{}]", index),
            message: "option has no name field".to_string(),
        })?;

        Ok(Self {
            name_key,
            name,
            fields,
        })
    }
}

/// Read the option sets of a node-pool mapping.
///
/// The options are the first sequence child of the mapping. Returns `None`
/// when there is no such sequence, so callers can skip the synthetic key.
pub fn option_sets(node_pool: &ConfigNode) -> Result<Option<Vec<OptionSet>>> {
    let Some(entries) = node_pool.as_mapping() else {
        return Ok(None);
    };
    let Some(options) = entries.iter().find_map(|(_, v)| v.as_sequence()) else {
        return Ok(None);
    };

    options
        .iter()
        .enumerate()
        .map(|(index, node)| OptionSet::from_node(node, index))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Render option sets as a literal block scalar.
pub fn format_option_sets(sets: &[OptionSet]) -> String {
    let mut out = String::from("|\n");
    for (index, set) in sets.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "    - {}: {}\n",
            set.name_key,
            yaml_scalar(&set.name)
        ));
        for (key, value) in &set.fields {
            out.push_str(&format!("      {}: {}\n", key, yaml_scalar(value)));
        }
    }
    out
}

/// Strings are single-quoted, everything else is emitted bare.
fn yaml_scalar(value: &Scalar) -> String {
    match value {
        Scalar::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.text(),
    }
}

/// Collect the string entries of a sequence node.
///
/// Non-string entries are skipped. Returns `None` if the node is not a
/// sequence.
pub fn string_list(node: &ConfigNode) -> Option<Vec<String>> {
    let items = node.as_sequence()?;
    Some(
        items
            .iter()
            .filter_map(ConfigNode::as_scalar)
            .filter_map(|s| match s {
                Scalar::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
    )
}

/// Render a YAML list whose first entry sits at the embedding position and
/// whose later entries are indented by `indent` spaces.
pub fn format_scalar_list(items: &[String], indent: usize) -> String {
    let pad = " ".repeat(indent);
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if index == 0 {
                format!("- {}\n", item)
            } else {
                format!("{}- {}\n", pad, item)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ConfigTree;

    const NODE_POOL: &str = r#"
application:
  nodePool:
    label: node.kubernetes.io/instance-type
    options:
      - name: 'CPU: 2, RAM: 8GB'
        value: Standard_D2s_v3
        default: true
      - name: "GPU: K80"
        value: Standard_NC6
        gpus: 1
"#;

    #[test]
    fn test_option_sets_from_tree() {
        let tree = ConfigTree::parse(NODE_POOL).unwrap();
        let sets = option_sets(tree.get("application.nodePool").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].name_key, "name");
        assert_eq!(sets[0].name, Scalar::String("CPU: 2, RAM: 8GB".to_string()));
        assert_eq!(sets[1].fields[1], ("gpus".to_string(), Scalar::Int(1)));
    }

    #[test]
    fn test_format_option_sets() {
        let tree = ConfigTree::parse(NODE_POOL).unwrap();
        let sets = option_sets(tree.get("application.nodePool").unwrap())
            .unwrap()
            .unwrap();
        let text = format_option_sets(&sets);
        assert_eq!(
            text,
            "|\n\
             \x20   - name: 'CPU: 2, RAM: 8GB'\n\
             \x20     value: 'Standard_D2s_v3'\n\
             \x20     default: true\n\
             \n\
             \x20   - name: 'GPU: K80'\n\
             \x20     value: 'Standard_NC6'\n\
             \x20     gpus: 1\n"
        );
    }

    #[test]
    fn test_format_option_sets_escapes_quotes() {
        let set = OptionSet {
            name_key: "displayName".to_string(),
            name: Scalar::String("Bob's pool".to_string()),
            fields: vec![],
        };
        assert_eq!(
            format_option_sets(&[set]),
            "|\n    - displayName: 'Bob''s pool'\n"
        );
    }

    #[test]
    fn test_name_field_not_first_is_emitted_first() {
        let tree = ConfigTree::parse("pool:\n  options:\n    - value: a\n      name: b\n").unwrap();
        let sets = option_sets(tree.get("pool").unwrap()).unwrap().unwrap();
        insta::assert_snapshot!(format_option_sets(&sets), @r"
        |
            - name: 'b'
              value: 'a'
        ");
    }

    #[test]
    fn test_option_without_name_is_rejected() {
        let tree = ConfigTree::parse("pool:\n  options:\n    - value: a\n").unwrap();
        let err = option_sets(tree.get("pool").unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
        assert!(err.to_string().contains("no name field"));
    }

    #[test]
    fn test_missing_options_sequence_is_none() {
        let tree = ConfigTree::parse("pool:\n  label: x\n").unwrap();
        assert!(option_sets(tree.get("pool").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_scalar_list() {
        let items = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        let text = format_scalar_list(&items, ADDRESS_INDENT);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "- 10.0.0.1");
        assert_eq!(lines[1], "      - 10.0.0.2");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_scalar_list_empty() {
        assert_eq!(format_scalar_list(&[], ADDRESS_INDENT), "");
    }

    #[test]
    fn test_string_list_skips_non_strings() {
        let tree = ConfigTree::parse("addresses:\n  - 192.168.99.100-192.168.99.110\n  - 42\n").unwrap();
        let items = string_list(tree.get("addresses").unwrap()).unwrap();
        assert_eq!(items, vec!["192.168.99.100-192.168.99.110".to_string()]);
        assert!(string_list(&ConfigNode::from("scalar")).is_none());
    }
}
