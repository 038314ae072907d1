//! Schema-aware merging of one verified value tree onto another.

use crate::cmake;
use crate::error::ConfigError;
use crate::list::ListValue;
use crate::node::{Node, Table, ValueRef};
use crate::schema::{ConfigRef, OptionKind, Schema};
use crate::string::StringValue;

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a Table for the same key, recurse.
/// Otherwise, `overlay`'s value wins.
pub fn deep_merge(mut base: Table, overlay: Table) -> Table {
    for (key, overlay_val) in overlay {
        let merged = match (base.get_mut(&key), overlay_val) {
            (Some(Node::Table(base_tbl)), Node::Table(overlay_tbl)) => {
                Node::Table(deep_merge(std::mem::take(base_tbl), overlay_tbl))
            }
            (_, overlay_val) => overlay_val,
        };
        base.insert(key, merged);
    }
    base
}

/// Merge `new` on top of `old` for the given option. Neither input is
/// modified; the result shares no structure with them.
///
/// An absent `new` keeps `old`. Scalars are replaced, mergeable records follow
/// their own algebra, and tables are merged child by child.
pub fn override_value(
    schema: &Schema<'_>,
    option: &ConfigRef<'_>,
    old: Option<&ValueRef<'_>>,
    new: &ValueRef<'_>,
) -> Result<Node, ConfigError> {
    let option = schema.resolve(option)?;
    let old = old.filter(|old| old.node.is_present());
    if !new.node.is_present() {
        return Ok(old.map(|old| old.node.clone()).unwrap_or(Node::Absent));
    }
    let old_node = old.map(|old| old.node);

    match option.kind() {
        OptionKind::Override { target } => {
            let target_option = schema
                .lookup(target)
                .ok_or_else(|| ConfigError::InvalidReference {
                    path: option.path.clone(),
                    target: target.clone(),
                    reason: "overrides a nonexistent option".into(),
                })?;
            override_value(schema, &target_option, old, new)
        }
        OptionKind::Section => override_entry(schema, &option, old, new),
        OptionKind::Unchecked => {
            let (Some(Node::Table(base)), Node::Table(overlay)) = (old_node, new.node) else {
                return Ok(new.node.clone());
            };
            let mut merged = base.clone();
            for (name, value) in overlay {
                let value = match (option.child(name), merged.get(name)) {
                    (Some(child), existing) => {
                        let old_child = existing
                            .map(|node| ValueRef::new(new_child_path(old, new, name), node));
                        override_value(
                            schema,
                            &child,
                            old_child.as_ref(),
                            &ValueRef::new(new.path.child(name), value),
                        )?
                    }
                    (None, Some(Node::Table(existing))) => match value {
                        Node::Table(overlay_tbl) => {
                            Node::Table(deep_merge(existing.clone(), overlay_tbl.clone()))
                        }
                        other => other.clone(),
                    },
                    (None, _) => value.clone(),
                };
                merged.insert(name.clone(), value);
            }
            Ok(Node::Table(merged))
        }
        OptionKind::MultiIndexed => {
            let Node::Table(entries) = new.node else {
                return Ok(new.node.clone());
            };
            let mut merged = match old_node {
                Some(Node::Table(existing)) => existing.clone(),
                _ => Table::new(),
            };
            for (index, entry) in entries {
                let value = match entry {
                    Node::Cleared => Node::Cleared,
                    _ => {
                        let old_entry = merged
                            .get(index)
                            .filter(|node| matches!(node, Node::Table(_)))
                            .map(|node| ValueRef::new(new_child_path(old, new, index), node));
                        override_entry(
                            schema,
                            &option,
                            old_entry.as_ref(),
                            &ValueRef::new(new.path.child(index), entry),
                        )?
                    }
                };
                merged.insert(index.clone(), value);
            }
            Ok(Node::Table(merged))
        }
        OptionKind::String => Ok(match new.node {
            Node::Text(record) => Node::Text(as_string(old_node).override_with(record)),
            other => other.clone(),
        }),
        OptionKind::List(_) | OptionKind::DirPatterns(_) => Ok(match new.node {
            Node::Strings(record) => Node::Strings(as_list(old_node).override_with(record)),
            other => other.clone(),
        }),
        OptionKind::Dict { .. } => Ok(match (old_node, new.node) {
            (Some(Node::Dict(base)), Node::Dict(overlay)) => {
                let mut merged = base.clone();
                for (key, record) in overlay {
                    let value = match merged.get(key) {
                        Some(existing) => existing.override_with(record),
                        None => record.clone(),
                    };
                    merged.insert(key.clone(), value);
                }
                Node::Dict(merged)
            }
            (_, other) => other.clone(),
        }),
        OptionKind::CMakeOptions => match (old, new.node) {
            (Some(old), Node::CMake(overlay)) => match old.node {
                Node::CMake(base) => Ok(Node::CMake(cmake::override_options(
                    base, overlay, &old.path, &new.path,
                )?)),
                _ => Ok(new.node.clone()),
            },
            _ => Ok(new.node.clone()),
        },
        OptionKind::Bool | OptionKind::Int | OptionKind::Enum(_) | OptionKind::Path(_) => {
            Ok(new.node.clone())
        }
    }
}

/// Merge a table whose children are described by the children of `option`:
/// a section, or one entry of a multi-indexed option.
pub fn override_entry(
    schema: &Schema<'_>,
    option: &ConfigRef<'_>,
    old: Option<&ValueRef<'_>>,
    new: &ValueRef<'_>,
) -> Result<Node, ConfigError> {
    let Node::Table(overlay) = new.node else {
        return Ok(new.node.clone());
    };
    let mut merged = match old.map(|old| old.node) {
        Some(Node::Table(base)) => base.clone(),
        _ => Table::new(),
    };
    for (name, value) in overlay {
        let Some(child) = option.child(name) else {
            merged.insert(name.clone(), value.clone());
            continue;
        };
        let result = {
            let old_child = merged
                .get(name)
                .map(|node| ValueRef::new(new_child_path(old, new, name), node));
            override_value(
                schema,
                &child,
                old_child.as_ref(),
                &ValueRef::new(new.path.child(name), value),
            )?
        };
        merged.insert(name.clone(), result);
    }
    Ok(Node::Table(merged))
}

/// Path of the child `name` on the old side, falling back to the new side
/// when there is no old value.
fn new_child_path(
    old: Option<&ValueRef<'_>>,
    new: &ValueRef<'_>,
    name: &str,
) -> crate::path::ConfPath {
    old.map_or(&new.path, |old| &old.path).child(name)
}

fn as_string(node: Option<&Node>) -> StringValue {
    match node {
        Some(Node::Text(record)) => record.clone(),
        Some(Node::Str(s)) => StringValue::new(s.clone()),
        Some(Node::Cleared) => StringValue::cleared(),
        _ => StringValue::default(),
    }
}

fn as_list(node: Option<&Node>) -> ListValue {
    match node {
        Some(Node::Strings(record)) => record.clone(),
        Some(Node::List(items)) => {
            debug_assert!(
                items.iter().all(|item| matches!(item, Node::Str(_))),
                "verified lists hold only strings"
            );
            ListValue::new(items.iter().filter_map(|item| item.as_str().map(str::to_string)))
        }
        Some(Node::Cleared) => ListValue::cleared(),
        _ => ListValue::default(),
    }
}
