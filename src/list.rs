//! List-of-string options and directory patterns.

use crate::error::ConfigError;
use crate::node::{Node, Table, ValueRef};
use crate::path::ConfPath;
use crate::types::OverrideAction;

/// How a list option reads plain document values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListStyle {
    /// A plain list appends to inherited values instead of replacing them.
    pub append_by_default: bool,
    /// A lone string is read as a one-element list.
    pub singleton: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListValue {
    pub clear: bool,
    pub value: Option<Vec<String>>,
    pub append: Option<Vec<String>>,
    pub prepend: Option<Vec<String>>,
    pub remove: Option<Vec<String>>,
}

const OPERATOR_KEYS: [&str; 7] = ["=", "value", "+", "append", "-", "remove", "prepend"];
const VALUE_KEYS: [&str; 2] = ["=", "value"];
const APPEND_KEYS: [&str; 2] = ["+", "append"];
const REMOVE_KEYS: [&str; 2] = ["-", "remove"];
const PREPEND_KEYS: [&str; 1] = ["prepend"];

impl ListValue {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value: Some(items.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn cleared() -> Self {
        Self {
            clear: true,
            ..Self::default()
        }
    }

    pub fn from_value(v: &ValueRef<'_>, style: ListStyle) -> Result<Self, ConfigError> {
        if let Node::Table(table) = v.node
            && v.action.is_assignment()
        {
            return Self::from_operators(&v.path, table, style);
        }
        let mut record = Self::default();
        match v.action {
            OverrideAction::Clear => {
                if v.node.is_present() {
                    return Err(ConfigError::invalid(
                        &v.path,
                        "operation =! cannot have a value",
                    ));
                }
                record.clear = true;
            }
            OverrideAction::AppendPath | OverrideAction::PrependPath => {
                return Err(ConfigError::unsupported(&v.path, v.action));
            }
            OverrideAction::Remove => record.remove = Some(strings(&v.path, v.node, true)?),
            OverrideAction::Append => {
                record.append = Some(strings(&v.path, v.node, style.singleton)?)
            }
            OverrideAction::Prepend => {
                record.prepend = Some(strings(&v.path, v.node, style.singleton)?)
            }
            OverrideAction::Assign => {
                record.value = Some(strings(&v.path, v.node, style.singleton)?)
            }
            OverrideAction::Default => {
                let items = strings(&v.path, v.node, style.singleton)?;
                if style.append_by_default {
                    record.append = Some(items);
                } else {
                    record.value = Some(items);
                }
            }
        }
        Ok(record)
    }

    /// The table form: `{ "=" = [...] }`, `{ "+" = [...], "-" = [...] }`, ...
    fn from_operators(
        path: &ConfPath,
        table: &Table,
        style: ListStyle,
    ) -> Result<Self, ConfigError> {
        let invalid: Vec<&str> = table
            .keys()
            .map(String::as_str)
            .filter(|k| !OPERATOR_KEYS.contains(k))
            .collect();
        if !invalid.is_empty() {
            return Err(ConfigError::invalid(
                path,
                format!("invalid keys {invalid:?}"),
            ));
        }
        let record = Self {
            clear: false,
            value: operator(path, table, &VALUE_KEYS, style)?,
            append: operator(path, table, &APPEND_KEYS, style)?,
            remove: operator(path, table, &REMOVE_KEYS, style)?,
            prepend: operator(path, table, &PREPEND_KEYS, style)?,
        };
        if record.value.is_some()
            && (record.append.is_some() || record.remove.is_some() || record.prepend.is_some())
        {
            return Err(ConfigError::invalid(
                path,
                "cannot combine \"value\" or \"=\" with other operations",
            ));
        }
        Ok(record)
    }

    /// Apply `new` on top of `self`. Assignments and clears replace; removals
    /// filter what `self` holds, including queued appends and prepends.
    pub fn override_with(&self, new: &ListValue) -> ListValue {
        if new.clear || new.value.is_some() {
            return ListValue {
                remove: None,
                ..new.clone()
            };
        }
        let mut out = self.clone();
        if let Some(removed) = &new.remove {
            for items in [&mut out.value, &mut out.append, &mut out.prepend]
                .into_iter()
                .flatten()
            {
                items.retain(|item| !removed.contains(item));
            }
            out.remove
                .get_or_insert_with(Vec::new)
                .extend(removed.iter().cloned());
        }
        if let Some(append) = &new.append {
            out.append
                .get_or_insert_with(Vec::new)
                .extend(append.iter().cloned());
        }
        if let Some(prepend) = &new.prepend {
            let mut items = prepend.clone();
            items.extend(out.prepend.take().unwrap_or_default());
            out.prepend = Some(items);
        }
        out
    }

    pub fn finalize(&self) -> Option<Vec<String>> {
        if self.clear && self.value.is_none() && self.append.is_none() && self.prepend.is_none() {
            return None;
        }
        let mut result = self.prepend.clone().unwrap_or_default();
        result.extend(self.value.iter().flatten().cloned());
        result.extend(self.append.iter().flatten().cloned());
        Some(result)
    }

    /// Every list the record currently holds.
    pub fn lists_mut(&mut self) -> impl Iterator<Item = &mut Vec<String>> {
        [
            &mut self.value,
            &mut self.append,
            &mut self.prepend,
            &mut self.remove,
        ]
        .into_iter()
        .flatten()
    }
}

fn operator(
    path: &ConfPath,
    table: &Table,
    keys: &[&str],
    style: ListStyle,
) -> Result<Option<Vec<String>>, ConfigError> {
    let present: Vec<&str> = keys.iter().copied().filter(|k| table.contains_key(*k)).collect();
    match present.as_slice() {
        [] => Ok(None),
        [key] => {
            let child = path.child(key);
            Ok(Some(strings(&child, &table[*key], style.singleton)?))
        }
        _ => Err(ConfigError::invalid(
            path,
            format!("cannot combine {}", present.join(" and ")),
        )),
    }
}

fn strings(path: &ConfPath, node: &Node, singleton: bool) -> Result<Vec<String>, ConfigError> {
    match node {
        Node::Str(s) if singleton => Ok(vec![s.clone()]),
        Node::List(items) => items
            .iter()
            .map(|item| match item {
                Node::Str(s) => Ok(s.clone()),
                other => Err(ConfigError::mismatch(
                    path,
                    "list of strings",
                    &format!("list containing {}", other.type_name()),
                )),
            })
            .collect(),
        other => Err(ConfigError::mismatch(path, "list", other.type_name())),
    }
}

/// Normalize every pattern of a directory-pattern list, rejecting unsafe ones.
pub fn check_patterns(path: &ConfPath, mut record: ListValue) -> Result<ListValue, ConfigError> {
    for list in record.lists_mut() {
        for pattern in list.iter_mut() {
            *pattern = normalize_pattern(path, pattern)?;
        }
    }
    Ok(record)
}

fn normalize_pattern(path: &ConfPath, pattern: &str) -> Result<String, ConfigError> {
    let fail = |reason: &str| ConfigError::Path {
        path: path.clone(),
        reason: format!("pattern '{pattern}' {reason}"),
    };
    if pattern
        .chars()
        .any(|c| c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '\\'))
    {
        return Err(fail(
            "contains invalid characters (control characters or <>:\"\\)",
        ));
    }
    if pattern.starts_with('/') {
        return Err(fail("should be a relative path"));
    }
    let mut parts: Vec<&str> = Vec::new();
    for part in pattern.split('/') {
        match part {
            "" | "." => {}
            ".." if parts.last().is_some_and(|last| *last != "..") => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.first() == Some(&"..") {
        return Err(fail("cannot refer to the parent directory (..)"));
    }
    if parts.is_empty() {
        return Ok(".".to_string());
    }
    Ok(parts.join("/"))
}
