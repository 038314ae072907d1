//! CMake cache options.
//!
//! Each entry of a CMake option map is a [`CMakeValue`]: a list of string or
//! boolean items plus an optional cache type. Entries finalize to
//! `"NAME:TYPE" = "a;b;c"` pairs, with booleans rendered as `On`/`Off`.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::node::{Node, Table, ValueRef};
use crate::path::ConfPath;
use crate::types::OverrideAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CMakeItem {
    Str(String),
    Bool(bool),
}

impl CMakeItem {
    fn render(&self) -> String {
        match self {
            CMakeItem::Str(s) => s.replace(';', "\\;"),
            CMakeItem::Bool(true) => "On".to_string(),
            CMakeItem::Bool(false) => "Off".to_string(),
        }
    }
}

impl From<&str> for CMakeItem {
    fn from(s: &str) -> Self {
        CMakeItem::Str(s.to_string())
    }
}

impl From<bool> for CMakeItem {
    fn from(b: bool) -> Self {
        CMakeItem::Bool(b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CMakeType {
    String,
    Bool,
    Path,
    Filepath,
}

impl CMakeType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STRING" => Some(CMakeType::String),
            "BOOL" => Some(CMakeType::Bool),
            "PATH" => Some(CMakeType::Path),
            "FILEPATH" => Some(CMakeType::Filepath),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CMakeType::String => "STRING",
            CMakeType::Bool => "BOOL",
            CMakeType::Path => "PATH",
            CMakeType::Filepath => "FILEPATH",
        }
    }
}

impl fmt::Display for CMakeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when two documents declare conflicting types for one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// The conflict is an error.
    #[default]
    Strict,
    /// The conflict is logged and the newer type wins.
    Lenient,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CMakeValue {
    pub clear: bool,
    pub value: Option<Vec<CMakeItem>>,
    pub append: Option<Vec<CMakeItem>>,
    pub prepend: Option<Vec<CMakeItem>>,
    pub remove: Option<Vec<CMakeItem>>,
    pub datatype: Option<CMakeType>,
    pub strictness: Strictness,
}

const VALID_KEYS: [&str; 9] = [
    "+", "-", "=", "append", "remove", "value", "prepend", "type", "strict",
];

impl CMakeValue {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CMakeItem>,
    {
        let items: Vec<CMakeItem> = items.into_iter().map(Into::into).collect();
        Self {
            datatype: infer_type(&items),
            value: Some(items),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, datatype: CMakeType) -> Self {
        self.datatype = Some(datatype);
        self
    }

    /// Read one entry of an option map.
    pub fn from_value(v: &ValueRef<'_>) -> Result<Self, ConfigError> {
        match v.action {
            OverrideAction::Clear => {
                if v.node.is_present() {
                    return Err(ConfigError::invalid(
                        &v.path,
                        "operation =! cannot have a value",
                    ));
                }
                Ok(Self {
                    clear: true,
                    ..Self::default()
                })
            }
            OverrideAction::Default | OverrideAction::Assign => match v.node {
                Node::Table(table) => Self::from_table(&v.path, table),
                Node::Bool(b) => Ok(Self {
                    value: Some(vec![CMakeItem::Bool(*b)]),
                    datatype: Some(CMakeType::Bool),
                    ..Self::default()
                }),
                other => {
                    let items = items(&v.path, other)?;
                    Ok(Self {
                        datatype: infer_type(&items),
                        value: Some(items),
                        ..Self::default()
                    })
                }
            },
            OverrideAction::Append | OverrideAction::Prepend | OverrideAction::Remove => {
                let items = items(&v.path, v.node)?;
                let mut record = Self {
                    datatype: infer_type(&items),
                    ..Self::default()
                };
                match v.action {
                    OverrideAction::Append => record.append = Some(items),
                    OverrideAction::Prepend => record.prepend = Some(items),
                    _ => record.remove = Some(items),
                }
                Ok(record)
            }
            OverrideAction::AppendPath | OverrideAction::PrependPath => {
                Err(ConfigError::unsupported(&v.path, v.action))
            }
        }
    }

    fn from_table(path: &ConfPath, table: &Table) -> Result<Self, ConfigError> {
        let invalid: Vec<&str> = table
            .keys()
            .map(String::as_str)
            .filter(|k| !VALID_KEYS.contains(k))
            .collect();
        if !invalid.is_empty() {
            return Err(ConfigError::invalid(
                path,
                format!("invalid keys {invalid:?}"),
            ));
        }
        for (a, b) in [("value", "="), ("append", "+"), ("remove", "-")] {
            if table.contains_key(a) && table.contains_key(b) {
                return Err(ConfigError::invalid(
                    path,
                    format!("cannot combine \"{a}\" and \"{b}\""),
                ));
            }
        }
        let has_value = table.contains_key("value") || table.contains_key("=");
        if has_value {
            let conflicting: Vec<&str> = ["+", "append", "-", "remove", "prepend"]
                .into_iter()
                .filter(|k| table.contains_key(*k))
                .collect();
            if !conflicting.is_empty() {
                return Err(ConfigError::invalid(
                    path,
                    format!("cannot combine \"value\" or \"=\" with {conflicting:?}"),
                ));
            }
        }

        let value = operator_items(path, table, &["value", "="])?;
        let append = operator_items(path, table, &["append", "+"])?;
        let remove = operator_items(path, table, &["remove", "-"])?;
        let prepend = operator_items(path, table, &["prepend"])?;

        let datatype = match table.get("type") {
            None => {
                let all: Vec<CMakeItem> = [&value, &append, &remove, &prepend]
                    .into_iter()
                    .flatten()
                    .flatten()
                    .cloned()
                    .collect();
                infer_type(&all)
            }
            Some(Node::Str(s)) => Some(CMakeType::parse(s).ok_or_else(|| {
                ConfigError::invalid(
                    &path.child("type"),
                    format!("unknown type '{s}', expected STRING, BOOL, PATH or FILEPATH"),
                )
            })?),
            Some(other) => {
                return Err(ConfigError::mismatch(
                    &path.child("type"),
                    "string",
                    other.type_name(),
                ));
            }
        };
        let strictness = match table.get("strict") {
            None | Some(Node::Bool(true)) => Strictness::Strict,
            Some(Node::Bool(false)) => Strictness::Lenient,
            Some(other) => {
                return Err(ConfigError::mismatch(
                    &path.child("strict"),
                    "bool",
                    other.type_name(),
                ));
            }
        };
        Ok(Self {
            clear: false,
            value,
            append,
            prepend,
            remove,
            datatype,
            strictness,
        })
    }

    /// Apply `new` on top of `self`.
    ///
    /// A new value (or clear) replaces the entry. Otherwise the types must be
    /// compatible and the items are merged.
    pub fn override_with(
        &self,
        new: &CMakeValue,
        old_path: &ConfPath,
        new_path: &ConfPath,
    ) -> Result<CMakeValue, ConfigError> {
        if new.clear || new.value.is_some() {
            return Ok(new.clone());
        }
        let mut out = self.clone();
        out.datatype = combine_types(
            self.datatype,
            new.datatype,
            new.strictness,
            old_path,
            new_path,
        )?;
        out.combine_items(new);
        Ok(out)
    }

    fn combine_items(&mut self, new: &CMakeValue) {
        match &mut self.value {
            Some(value) => {
                if let Some(removed) = &new.remove {
                    value.retain(|item| !removed.contains(item));
                }
                if let Some(replacement) = &new.value {
                    *value = replacement.clone();
                }
                if let Some(append) = &new.append {
                    value.extend(append.iter().cloned());
                }
                if let Some(prepend) = &new.prepend {
                    let mut items = prepend.clone();
                    items.append(value);
                    *value = items;
                }
            }
            None => {
                if let Some(removed) = &new.remove {
                    for items in [&mut self.append, &mut self.prepend].into_iter().flatten() {
                        items.retain(|item| !removed.contains(item));
                    }
                    self.remove
                        .get_or_insert_with(Vec::new)
                        .extend(removed.iter().cloned());
                }
                if let Some(prepend) = &new.prepend {
                    let mut items = prepend.clone();
                    items.extend(self.prepend.take().unwrap_or_default());
                    self.prepend = Some(items);
                }
                if let Some(append) = &new.append {
                    self.append
                        .get_or_insert_with(Vec::new)
                        .extend(append.iter().cloned());
                }
            }
        }
    }

    /// Render the entry as `"a;b;c"`. `None` for a cleared entry that was not
    /// refilled.
    pub fn finalize(&self) -> Option<String> {
        if self.clear && self.value.is_none() && self.append.is_none() && self.prepend.is_none() {
            return None;
        }
        let mut flat = CMakeValue {
            value: Some(Vec::new()),
            ..CMakeValue::default()
        };
        flat.combine_items(&CMakeValue {
            remove: None,
            ..self.clone()
        });
        let rendered: Vec<String> = flat
            .value
            .unwrap_or_default()
            .iter()
            .map(CMakeItem::render)
            .collect();
        Some(rendered.join(";"))
    }

    /// `NAME` or `NAME:TYPE`.
    pub fn cache_key(&self, name: &str) -> String {
        match self.datatype {
            Some(datatype) => format!("{name}:{datatype}"),
            None => name.to_string(),
        }
    }
}

/// Items under the first of `keys` present in `table`.
fn operator_items(
    path: &ConfPath,
    table: &Table,
    keys: &[&str],
) -> Result<Option<Vec<CMakeItem>>, ConfigError> {
    keys.iter()
        .find_map(|k| table.get(*k).map(|node| (*k, node)))
        .map(|(k, node)| items(&path.child(k), node))
        .transpose()
}

fn infer_type(items: &[CMakeItem]) -> Option<CMakeType> {
    let all_bool = items.iter().all(|item| matches!(item, CMakeItem::Bool(_)));
    (!items.is_empty() && all_bool).then_some(CMakeType::Bool)
}

fn items(path: &ConfPath, node: &Node) -> Result<Vec<CMakeItem>, ConfigError> {
    match node {
        Node::Str(s) => Ok(vec![CMakeItem::Str(s.clone())]),
        Node::Bool(b) => Ok(vec![CMakeItem::Bool(*b)]),
        Node::List(list) => list
            .iter()
            .map(|item| match item {
                Node::Str(s) => Ok(CMakeItem::Str(s.clone())),
                Node::Bool(b) => Ok(CMakeItem::Bool(*b)),
                other => Err(ConfigError::mismatch(
                    path,
                    "str or bool items",
                    &format!("list containing {}", other.type_name()),
                )),
            })
            .collect(),
        other => Err(ConfigError::mismatch(
            path,
            "str or bool or a list thereof",
            other.type_name(),
        )),
    }
}

fn combine_types(
    old: Option<CMakeType>,
    new: Option<CMakeType>,
    strictness: Strictness,
    old_path: &ConfPath,
    new_path: &ConfPath,
) -> Result<Option<CMakeType>, ConfigError> {
    let (Some(a), Some(b)) = (old, new) else {
        return Ok(new.or(old));
    };
    if a == b || (a == CMakeType::Path && b == CMakeType::Filepath) {
        return Ok(Some(b));
    }
    let message = format!(
        "incompatible types when overriding or inheriting CMake settings: \
         {a} ({old_path}) and {b} ({new_path})"
    );
    match strictness {
        Strictness::Strict => Err(ConfigError::invalid(
            new_path,
            format!("{message} (use \"strict\" = false to ignore)"),
        )),
        Strictness::Lenient => {
            tracing::warn!(path = %new_path, "{message}");
            Ok(Some(b))
        }
    }
}

/// Read a whole option map.
pub fn verify_options(v: &ValueRef<'_>) -> Result<IndexMap<String, CMakeValue>, ConfigError> {
    if !v.action.is_assignment() {
        return Err(ConfigError::unsupported(&v.path, v.action));
    }
    let Node::Table(table) = v.node else {
        return Err(ConfigError::mismatch(&v.path, "table", v.node.type_name()));
    };
    table
        .iter()
        .map(|(name, node)| {
            let entry = ValueRef::new(v.path.child(name), node);
            Ok((name.clone(), CMakeValue::from_value(&entry)?))
        })
        .collect()
}

/// Merge two option maps entry by entry.
pub fn override_options(
    old: &IndexMap<String, CMakeValue>,
    new: &IndexMap<String, CMakeValue>,
    old_path: &ConfPath,
    new_path: &ConfPath,
) -> Result<IndexMap<String, CMakeValue>, ConfigError> {
    let mut out = old.clone();
    for (name, value) in new {
        let merged = match out.get(name) {
            Some(existing) => {
                existing.override_with(value, &old_path.child(name), &new_path.child(name))?
            }
            None => value.clone(),
        };
        out.insert(name.clone(), merged);
    }
    Ok(out)
}

/// Render an option map as `"NAME:TYPE" = "value"` pairs.
pub fn finalize_options(options: &IndexMap<String, CMakeValue>) -> toml::Table {
    options
        .iter()
        .filter_map(|(name, value)| {
            value
                .finalize()
                .map(|rendered| (value.cache_key(name), toml::Value::String(rendered)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(action: OverrideAction, node: Node) -> Result<CMakeValue, ConfigError> {
        let tagged = Node::tagged(action, node);
        CMakeValue::from_value(&ValueRef::new(ConfPath::parse("opts/FOO"), &tagged))
    }

    fn table(toml_str: &str) -> Node {
        Node::from(toml_str.parse::<toml::Table>().unwrap())
    }

    fn p(s: &str) -> ConfPath {
        ConfPath::parse(s)
    }

    #[test]
    fn scalar_forms() {
        let s = entry(OverrideAction::Default, "abc".into()).unwrap();
        assert_eq!(s, CMakeValue::new(["abc"]));
        assert_eq!(s.datatype, None);

        let b = entry(OverrideAction::Default, Node::Bool(true)).unwrap();
        assert_eq!(b.datatype, Some(CMakeType::Bool));
        assert_eq!(b.finalize().as_deref(), Some("On"));
    }

    #[test]
    fn all_bool_list_infers_bool() {
        let list = Node::List(vec![Node::Bool(true), Node::Bool(false)]);
        let value = entry(OverrideAction::Default, list).unwrap();
        assert_eq!(value.datatype, Some(CMakeType::Bool));
        assert_eq!(value.finalize().as_deref(), Some("On;Off"));

        let mixed = Node::List(vec![Node::Bool(true), Node::from("x")]);
        assert_eq!(entry(OverrideAction::Default, mixed).unwrap().datatype, None);

        let empty = Node::List(vec![]);
        assert_eq!(entry(OverrideAction::Default, empty).unwrap().datatype, None);
    }

    #[test]
    fn inference_spans_every_operation_group() {
        let mixed = table("append = [true]\nprepend = [\"x\"]");
        let mixed = entry(OverrideAction::Default, mixed).unwrap();
        assert_eq!(mixed.datatype, None);

        let bools = table("append = [true]\nremove = [false]");
        let bools = entry(OverrideAction::Default, bools).unwrap();
        assert_eq!(bools.datatype, Some(CMakeType::Bool));

        let remove_only = entry(OverrideAction::Default, table("\"-\" = [true]")).unwrap();
        assert_eq!(remove_only.datatype, Some(CMakeType::Bool));
    }

    #[test]
    fn cli_remove_of_booleans_infers_bool() {
        let assignment = crate::syntax::parse_assignment("FOO-=[true]").unwrap();
        let value = entry(assignment.action, assignment.value).unwrap();
        assert_eq!(value.remove, Some(vec![CMakeItem::Bool(true)]));
        assert_eq!(value.datatype, Some(CMakeType::Bool));
    }

    #[test]
    fn mixed_groups_extend_a_string_entry() {
        let old = CMakeValue::new(["a"]).with_type(CMakeType::String);
        let new = table("append = [true]\nprepend = [\"x\"]");
        let new = entry(OverrideAction::Default, new).unwrap();
        let merged = old.override_with(&new, &p("a/FOO"), &p("b/FOO")).unwrap();
        assert_eq!(merged.datatype, Some(CMakeType::String));
        assert_eq!(merged.finalize().as_deref(), Some("x;a;On"));
    }

    #[test]
    fn table_form_with_type() {
        let node = table(r#"value = "/usr/lib"
type = "PATH""#);
        let value = entry(OverrideAction::Default, node).unwrap();
        assert_eq!(value.datatype, Some(CMakeType::Path));
        assert_eq!(value.cache_key("FOO"), "FOO:PATH");
    }

    #[test]
    fn table_form_rejects_unknown_keys() {
        let err = entry(OverrideAction::Default, table(r#"valuezzz = "a""#)).unwrap_err();
        assert!(err.to_string().contains("valuezzz"));
    }

    #[test]
    fn table_form_rejects_conflicting_aliases() {
        let err = entry(OverrideAction::Default, table(r#""=" = "a"
value = "b""#))
        .unwrap_err();
        assert!(err.to_string().contains("cannot combine \"value\" and \"=\""));
    }

    #[test]
    fn table_form_rejects_value_with_append() {
        let err = entry(OverrideAction::Default, table(r#"value = "a"
"+" = "b""#))
        .unwrap_err();
        assert!(err.to_string().contains("cannot combine \"value\" or \"=\""));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = entry(OverrideAction::Default, table(r#"value = "a"
type = "INT""#))
        .unwrap_err();
        assert!(err.to_string().contains("unknown type 'INT'"));
    }

    #[test]
    fn wrong_item_types_rejected() {
        let err = entry(OverrideAction::Default, Node::Int(3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type of opts/FOO should be str or bool or a list thereof, not int"
        );
        let err = entry(OverrideAction::Default, Node::List(vec![Node::Int(3)])).unwrap_err();
        assert!(err.to_string().contains("list containing int"));
    }

    #[test]
    fn path_actions_unsupported() {
        let err = entry(OverrideAction::AppendPath, "x".into()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedAction { .. }));
    }

    #[test]
    fn append_remove_prepend_merge() {
        let base = CMakeValue::new(["a", "b", "c"]);
        let merged = base
            .override_with(&entry(OverrideAction::Append, "d".into()).unwrap(), &p("x"), &p("y"))
            .unwrap()
            .override_with(&entry(OverrideAction::Remove, "b".into()).unwrap(), &p("x"), &p("y"))
            .unwrap()
            .override_with(&entry(OverrideAction::Prepend, "z".into()).unwrap(), &p("x"), &p("y"))
            .unwrap();
        assert_eq!(merged.finalize().as_deref(), Some("z;a;c;d"));
    }

    #[test]
    fn new_value_replaces_entry() {
        let base = CMakeValue::new(["a"]).with_type(CMakeType::String);
        let merged = base
            .override_with(&CMakeValue::new([true]), &p("x"), &p("y"))
            .unwrap();
        assert_eq!(merged.datatype, Some(CMakeType::Bool));
        assert_eq!(merged.finalize().as_deref(), Some("On"));
    }

    #[test]
    fn strict_type_conflict_is_an_error() {
        let base = CMakeValue::new(["a"]).with_type(CMakeType::String);
        let delta = CMakeValue {
            append: Some(vec![CMakeItem::Bool(true)]),
            datatype: Some(CMakeType::Bool),
            ..CMakeValue::default()
        };
        let err = base.override_with(&delta, &p("old/FOO"), &p("new/FOO")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("STRING (old/FOO) and BOOL (new/FOO)"));
        assert!(msg.contains("\"strict\" = false"));
    }

    #[test]
    fn lenient_type_conflict_takes_new_type() {
        let base = CMakeValue::new(["a"]).with_type(CMakeType::String);
        let delta = CMakeValue {
            append: Some(vec![CMakeItem::Bool(true)]),
            datatype: Some(CMakeType::Bool),
            strictness: Strictness::Lenient,
            ..CMakeValue::default()
        };
        let merged = base.override_with(&delta, &p("a"), &p("b")).unwrap();
        assert_eq!(merged.datatype, Some(CMakeType::Bool));
        assert_eq!(merged.finalize().as_deref(), Some("a;On"));
    }

    #[test]
    fn path_refines_to_filepath_only() {
        let combine = |old: CMakeType, new: CMakeType| {
            combine_types(Some(old), Some(new), Strictness::Strict, &p("a"), &p("b"))
        };
        let refine = combine(CMakeType::Path, CMakeType::Filepath);
        assert_eq!(refine.unwrap(), Some(CMakeType::Filepath));
        let widen = combine(CMakeType::Filepath, CMakeType::Path);
        assert!(widen.is_err());
    }

    #[test]
    fn delta_onto_delta_accumulates() {
        let first = entry(OverrideAction::Append, Node::List(vec!["a".into(), "b".into()]));
        let first = first.unwrap();
        let second = entry(OverrideAction::Remove, "a".into()).unwrap();
        let delta = first.override_with(&second, &p("x"), &p("y")).unwrap();
        assert_eq!(delta.append, Some(vec![CMakeItem::from("b")]));
        let merged = CMakeValue::new(["a", "c"])
            .override_with(&delta, &p("x"), &p("y"))
            .unwrap();
        assert_eq!(merged.finalize().as_deref(), Some("c;b"));
    }

    #[test]
    fn semicolons_are_escaped() {
        assert_eq!(CMakeValue::new(["a;b", "c"]).finalize().as_deref(), Some("a\\;b;c"));
    }

    #[test]
    fn cleared_entry_is_dropped() {
        let cleared = entry(OverrideAction::Clear, Node::Absent).unwrap();
        let mut options = IndexMap::new();
        options.insert("KEEP".to_string(), CMakeValue::new(["1"]));
        options.insert("GONE".to_string(), cleared);
        let rendered = finalize_options(&options);
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered["KEEP"].as_str(), Some("1"));
    }

    #[test]
    fn map_override_unions_entries() {
        let node = table(r#"A = "1"
B = true"#);
        let old = verify_options(&ValueRef::new(p("o"), &node)).unwrap();
        let node = table(r#"B = false
C = "x""#);
        let new = verify_options(&ValueRef::new(p("n"), &node)).unwrap();
        let merged = override_options(&old, &new, &p("o"), &p("n")).unwrap();
        let rendered = finalize_options(&merged);
        let keys: Vec<_> = rendered.keys().cloned().collect();
        assert_eq!(keys, ["A", "B:BOOL", "C"]);
        assert_eq!(rendered["B:BOOL"].as_str(), Some("Off"));
    }
}
