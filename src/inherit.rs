//! Inheritance between options.
//!
//! An option that inherits from another starts from a copy of the source's
//! fully inherited value, overridden by whatever the option sets itself. When
//! the source has no value there is nothing to inherit. An option nobody set
//! only picks up the source's value when all of its unset ancestors opt in with
//! `create_if_inheritance_target_exists`.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::merge::override_value;
use crate::multi;
use crate::node::{Node, ValueRef};
use crate::path::ConfPath;
use crate::schema::{ConfigRef, OptionKind, Schema};

/// Apply every inheritance edge of `schema` to `values`, the tree of all
/// documents keyed by name.
pub fn inherit(schema: &Schema<'_>, values: &mut Node) -> Result<(), ConfigError> {
    let mut inheritor = Inheritor {
        schema,
        done: HashSet::new(),
    };
    inheritor.walk(values, &schema.root(), &ConfPath::root())
}

struct Inheritor<'a, 's> {
    schema: &'a Schema<'s>,
    /// Value paths whose inheritance has been applied.
    done: HashSet<ConfPath>,
}

impl<'s> Inheritor<'_, 's> {
    fn walk(
        &mut self,
        values: &mut Node,
        option: &ConfigRef<'s>,
        path: &ConfPath,
    ) -> Result<(), ConfigError> {
        if matches!(option.kind(), OptionKind::Override { .. }) {
            return Ok(());
        }
        self.inherit_self(values, option, path)?;

        if let OptionKind::MultiIndexed = option.kind() {
            let indices: Vec<String> = values
                .get(path)
                .and_then(Node::as_table)
                .map(|table| table.keys().cloned().collect())
                .unwrap_or_default();
            for index in indices {
                let entry = path.child(&index);
                for child in option.children() {
                    let name = child.option.name();
                    self.walk(values, &child, &entry.child(name))?;
                }
            }
            return Ok(());
        }

        for child in option.children() {
            let name = child.option.name();
            self.walk(values, &child, &path.child(name))?;
        }
        Ok(())
    }

    fn inherit_self(
        &mut self,
        values: &mut Node,
        option: &ConfigRef<'s>,
        path: &ConfPath,
    ) -> Result<(), ConfigError> {
        let Some(source) = self.schema.inherits(option) else {
            return Ok(());
        };
        if !self.done.insert(path.clone()) {
            return Ok(());
        }
        let source_option =
            self.schema
                .lookup(&source)
                .ok_or_else(|| ConfigError::InvalidReference {
                    path: option.path.clone(),
                    target: source.clone(),
                    reason: "inherits from a nonexistent option".into(),
                })?;

        // The source may inherit in turn; settle that first.
        self.inherit_self(values, &source_option, &source)?;

        let Some(inherited) = values.get(&source).filter(|node| node.is_present()).cloned()
        else {
            return Ok(());
        };
        if !self.create_parent_values(values, path)? {
            return Ok(());
        }

        let structure = self.schema.resolve(&source_option)?;
        let merged = match values.get(path).filter(|node| node.is_present()) {
            None => inherited,
            Some(own) => override_value(
                self.schema,
                &structure,
                Some(&ValueRef::new(source.clone(), &inherited)),
                &ValueRef::new(path.clone(), own),
            )?,
        };
        tracing::trace!(%path, %source, "applied inheritance");
        values.set(path, merged);
        Ok(())
    }

    /// Check that every unset ancestor of `path` (and `path` itself) may be
    /// created on behalf of inheritance, then create the ancestors. Returns
    /// `false` when some unset option along the way does not opt in.
    fn create_parent_values(
        &self,
        values: &mut Node,
        path: &ConfPath,
    ) -> Result<bool, ConfigError> {
        let mut option = self.schema.root();
        let mut node = Some(&*values);
        for segment in path.iter() {
            let at_entry = matches!(option.kind(), OptionKind::MultiIndexed)
                && (multi::is_index(segment) || segment == multi::TEMPLATE);
            if !at_entry {
                let next = match option.child(segment) {
                    Some(child) => Some(child),
                    None => self.schema.resolve(&option)?.child(segment),
                };
                let Some(next) = next else {
                    return Ok(false);
                };
                option = next;
            }
            node = node
                .and_then(Node::as_table)
                .and_then(|table| table.get(segment))
                .filter(|child| child.is_present());
            if node.is_none() && !option.option.creates_if_inheritance_target_exists() {
                return Ok(false);
            }
        }
        Ok(path.parent().is_none_or(|parent| values.materialize(&parent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::doc;
    use crate::schema::ConfigOption;
    use crate::verify::verify;

    fn section(name: &str, children: &[&str]) -> ConfigOption {
        ConfigOption::section(name).children_from(children.iter().map(|c| ConfigOption::string(*c)))
    }

    fn run(root: &ConfigOption, document: &str) -> toml::Value {
        let schema = Schema::new(root);
        let raw = doc(document);
        let mut values =
            verify(&schema, &schema.root(), &ValueRef::new(ConfPath::root(), &raw)).unwrap();
        inherit(&schema, &mut values).unwrap();
        values.into_plain().unwrap()
    }

    #[test]
    fn own_values_override_inherited_ones() {
        let root = ConfigOption::section("")
            .child(section("t", &["a", "b"]))
            .child(ConfigOption::section("n").inherits("t"));
        let v = run(&root, "[t]\na = \"1\"\nb = \"2\"\n[n]\nb = \"3\"");
        assert_eq!(v["n"]["a"].as_str(), Some("1"));
        assert_eq!(v["n"]["b"].as_str(), Some("3"));
        assert_eq!(v["t"]["b"].as_str(), Some("2"));
    }

    #[test]
    fn chains_inherit_transitively() {
        let root = ConfigOption::section("")
            .child(section("a", &["x", "y"]))
            .child(ConfigOption::section("b").inherits("a"))
            .child(ConfigOption::section("c").inherits("b"));
        let v = run(&root, "[a]\nx = \"1\"\ny = \"2\"\n[b]\ny = \"b\"\n[c]\nx = \"c\"");
        assert_eq!(v["c"]["x"].as_str(), Some("c"));
        assert_eq!(v["c"]["y"].as_str(), Some("b"));
    }

    #[test]
    fn unset_source_is_a_no_op() {
        let root = ConfigOption::section("")
            .child(section("t", &["a"]))
            .child(ConfigOption::section("n").inherits("t"));
        let v = run(&root, "[n]\na = \"own\"");
        assert_eq!(v["n"]["a"].as_str(), Some("own"));
        assert!(v.get("t").is_none());
    }

    #[test]
    fn unset_options_need_opt_in() {
        let root = ConfigOption::section("")
            .child(section("t", &["a"]))
            .child(ConfigOption::section("n").inherits("t"))
            .child(
                ConfigOption::section("m")
                    .inherits("t")
                    .create_if_inheritance_target_exists(),
            );
        let v = run(&root, "[t]\na = \"1\"");
        assert!(v.get("n").is_none());
        assert_eq!(v["m"]["a"].as_str(), Some("1"));
    }

    #[test]
    fn ancestors_are_created_when_they_opt_in() {
        let root = ConfigOption::section("")
            .child(section("t", &["a"]))
            .child(
                ConfigOption::section("outer")
                    .create_if_inheritance_target_exists()
                    .child(
                        ConfigOption::section("inner")
                            .inherits("t")
                            .create_if_inheritance_target_exists(),
                    ),
            );
        let v = run(&root, "[t]\na = \"1\"");
        assert_eq!(v["outer"]["inner"]["a"].as_str(), Some("1"));
    }

    #[test]
    fn inherited_values_are_copies() {
        let root = ConfigOption::section("")
            .child(ConfigOption::section("t").child(ConfigOption::list("l")))
            .child(ConfigOption::section("n").inherits("t"));
        let schema = Schema::new(&root);
        let raw = doc("[t]\nl = [\"x\"]\n[n]\nl = [\"y\"]");
        let mut values =
            verify(&schema, &schema.root(), &ValueRef::new(ConfPath::root(), &raw)).unwrap();
        let before = values.get(&ConfPath::parse("t")).cloned();
        inherit(&schema, &mut values).unwrap();
        assert_eq!(values.get(&ConfPath::parse("t")).cloned(), before);
    }

    #[test]
    fn rewired_edges_take_precedence() {
        let root = ConfigOption::section("")
            .child(section("linux", &["a"]))
            .child(section("windows", &["a"]))
            .child(
                ConfigOption::section("cross")
                    .inherits("linux")
                    .create_if_inheritance_target_exists(),
            );
        let mut schema = Schema::new(&root);
        schema.rewire(ConfPath::parse("cross"), ConfPath::parse("windows"));
        let raw = doc("[linux]\na = \"l\"\n[windows]\na = \"w\"");
        let mut values =
            verify(&schema, &schema.root(), &ValueRef::new(ConfPath::root(), &raw)).unwrap();
        inherit(&schema, &mut values).unwrap();
        let v = values.into_plain().unwrap();
        assert_eq!(v["cross"]["a"].as_str(), Some("w"));
    }
}
