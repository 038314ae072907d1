//! Turn a verified value tree into plain `toml` values.

use toml::Value;

use crate::env::{self, Environment};
use crate::error::ConfigError;
use crate::multi;
use crate::node::{Node, Table};
use crate::path::ConfPath;
use crate::schema::{ConfigRef, OptionKind, Schema};

/// Finalize `node`, the value of `option` at `path`.
///
/// Records collapse to their concrete value, multi-indexed templates are spread
/// into their entries, and cleared or absent values disappear (`None`).
/// Values that are already plain pass through unchanged, so finalizing twice
/// gives the same result as finalizing once.
pub fn finalize(
    schema: &Schema<'_>,
    env: &Environment,
    option: &ConfigRef<'_>,
    node: &Node,
    path: &ConfPath,
) -> Result<Option<Value>, ConfigError> {
    let option = schema.resolve(option)?;
    match (option.kind(), node) {
        (_, Node::Absent | Node::Cleared) => Ok(None),
        (OptionKind::Override { .. }, _) => Ok(None),
        (OptionKind::Section | OptionKind::Unchecked, Node::Table(table)) => Ok(Some(
            Value::Table(finalize_children(schema, env, &option, table, path)?),
        )),
        (OptionKind::MultiIndexed, Node::Table(table)) => {
            let mut entries = table.clone();
            multi::spread_template(schema, &option, &mut entries, path)?;
            let mut out = toml::Table::new();
            for (index, entry) in &entries {
                let value = match entry {
                    Node::Table(fields) => Some(Value::Table(finalize_children(
                        schema,
                        env,
                        &option,
                        fields,
                        &path.child(index),
                    )?)),
                    other => other.clone().into_plain(),
                };
                if let Some(value) = value {
                    out.insert(index.clone(), value);
                }
            }
            Ok(Some(Value::Table(out)))
        }
        (OptionKind::Dict { expand_environment: true }, Node::Dict(entries)) => {
            Ok(Some(Value::Table(env::expand_options(env, entries))))
        }
        (_, other) => Ok(other.clone().into_plain()),
    }
}

/// Finalize each child of a table. Children the schema does not know (inside
/// unchecked options) are converted as they are.
fn finalize_children(
    schema: &Schema<'_>,
    env: &Environment,
    option: &ConfigRef<'_>,
    table: &Table,
    path: &ConfPath,
) -> Result<toml::Table, ConfigError> {
    let mut out = toml::Table::new();
    for (name, node) in table {
        let value = match option.child(name) {
            Some(child) => finalize(schema, env, &child, node, &path.child(name))?,
            None => node.clone().into_plain(),
        };
        if let Some(value) = value {
            out.insert(name.clone(), value);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{doc, simple_schema};
    use crate::node::ValueRef;
    use crate::schema::ConfigOption;
    use crate::string::StringValue;
    use crate::types::OverrideAction;
    use crate::verify::verify;
    use proptest::prelude::*;

    fn finalize_root(root: &ConfigOption, node: &Node, env: &Environment) -> Value {
        let schema = Schema::new(root);
        finalize(&schema, env, &schema.root(), node, &ConfPath::root())
            .unwrap()
            .unwrap()
    }

    fn verified(root: &ConfigOption, node: &Node) -> Node {
        let schema = Schema::new(root);
        verify(&schema, &schema.root(), &ValueRef::new(ConfPath::root(), node)).unwrap()
    }

    #[test]
    fn records_collapse_to_plain_values() {
        let root = simple_schema();
        let node = verified(
            &root,
            &doc(r#"
[s]
leaf = "x"
[build]
build_args = ["-j"]
jobs = 4
mode = "release"
"#),
        );
        let v = finalize_root(&root, &node, &Environment::new());
        assert_eq!(v["s"]["leaf"].as_str(), Some("x"));
        assert_eq!(v["build"]["build_args"], Value::Array(vec!["-j".into()]));
        assert_eq!(v["build"]["jobs"].as_integer(), Some(4));
        assert_eq!(v["build"]["mode"].as_str(), Some("release"));
    }

    #[test]
    fn template_spreads_at_finalization() {
        let root = simple_schema();
        let node = verified(
            &root,
            &doc(r#"
[multi."*"]
leaf = "A"
[multi.0]
other = "B"
[multi.1]
leaf = "C"
"#),
        );
        let v = finalize_root(&root, &node, &Environment::new());
        let expected: toml::Table = r#"
[0]
leaf = "A"
other = "B"
[1]
leaf = "C"
"#
        .parse()
        .unwrap();
        assert_eq!(v["multi"], Value::Table(expected));
    }

    #[test]
    fn cleared_values_disappear() {
        let root = simple_schema();
        let mut node = Node::table();
        node.materialize(&ConfPath::parse("s"));
        node.set(&ConfPath::parse("s/leaf"), Node::Text(StringValue::cleared()));
        node.set(&ConfPath::parse("build"), Node::Cleared);
        let v = finalize_root(&root, &node, &Environment::new());
        assert_eq!(v["s"].as_table().map(toml::Table::len), Some(0));
        assert!(v.get("build").is_none());
    }

    #[test]
    fn unknown_children_of_unchecked_pass_through() {
        let root = simple_schema();
        let node = verified(&root, &doc("[extra.deep]\nanything = [1, 2]"));
        let v = finalize_root(&root, &node, &Environment::new());
        assert_eq!(
            v["extra"]["deep"]["anything"],
            Value::Array(vec![Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn environment_dictionaries_expand() {
        let root = ConfigOption::section("").child(ConfigOption::new(
            "env",
            OptionKind::Dict {
                expand_environment: true,
            },
        ));
        let mut node = Node::table();
        node.materialize(&ConfPath::parse("env"));
        node.set(
            &ConfPath::parse("env/PATH"),
            Node::tagged(OverrideAction::PrependPath, "/opt/bin".into()),
        );
        node.set(&ConfPath::parse("env/GREETING"), "hi ${USER}".into());
        let node = verified(&root, &node);
        let env = Environment::from_vars([("PATH", "/usr/bin"), ("USER", "me")]);
        let v = finalize_root(&root, &node, &env);
        let sep = crate::string::PATH_LIST_SEPARATOR;
        assert_eq!(
            v["env"]["PATH"].as_str(),
            Some(format!("/opt/bin{sep}/usr/bin").as_str())
        );
        assert_eq!(v["env"]["GREETING"].as_str(), Some("hi me"));
    }

    #[test]
    fn finalizing_plain_values_is_the_identity() {
        let root = simple_schema();
        let node = verified(
            &root,
            &doc(r#"
[s]
leaf = "x"
[multi."*"]
leaf = "t"
[multi.3]
other = "o"
[extra]
k = { nested = true }
"#),
        );
        let env = Environment::new();
        let once = finalize_root(&root, &node, &env);
        let twice = finalize_root(&root, &Node::from(once.clone()), &env);
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn finalize_is_idempotent(
            leaf in "[a-z0-9 ]{0,8}",
            args in proptest::collection::vec("[a-z-]{1,6}", 0..4),
            jobs in any::<i64>(),
        ) {
            let root = simple_schema();
            let mut raw = Node::table();
            raw.materialize(&ConfPath::parse("s"));
            raw.materialize(&ConfPath::parse("build"));
            raw.set(&ConfPath::parse("s/leaf"), leaf.into());
            raw.set(
                &ConfPath::parse("build/args"),
                Node::List(args.into_iter().map(Node::from).collect()),
            );
            raw.set(&ConfPath::parse("build/jobs"), jobs.into());
            let env = Environment::new();
            let once = finalize_root(&root, &verified(&root, &raw), &env);
            let twice = finalize_root(&root, &Node::from(once.clone()), &env);
            prop_assert_eq!(once, twice);
        }
    }
}
