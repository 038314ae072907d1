//! Type-check raw documents against the schema.
//!
//! Verification walks a document alongside its schema and returns a new tree in
//! which every leaf has its typed form: mergeable records for strings, lists,
//! dictionaries and CMake options, checked scalars for the rest. Override tags
//! are consumed here; the result carries none.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;

use crate::cmake;
use crate::error::ConfigError;
use crate::list::{self, ListValue};
use crate::multi;
use crate::node::{Node, Table, ValueRef};
use crate::path::ConfPath;
use crate::schema::{BasePath, ConfigRef, OptionKind, PathOptions, Schema};
use crate::string::StringValue;
use crate::types::OverrideAction;

/// Minimum similarity for an option name to be suggested for an unknown key.
const SUGGESTION_CUTOFF: f64 = 0.6;
const MAX_SUGGESTIONS: usize = 3;

/// Verify `values` against `option` and return the typed tree.
pub fn verify(
    schema: &Schema<'_>,
    option: &ConfigRef<'_>,
    values: &ValueRef<'_>,
) -> Result<Node, ConfigError> {
    let option = schema.resolve(option)?;
    if values.action == OverrideAction::Clear {
        if values.node.is_present() {
            return Err(ConfigError::invalid(
                &values.path,
                "operation =! cannot have a value",
            ));
        }
        return Ok(cleared(option.kind()));
    }
    match option.kind() {
        OptionKind::Section => {
            let table = expect_table(values)?;
            Ok(Node::Table(verify_children(schema, &option, table, &values.path)?))
        }
        OptionKind::Unchecked => verify_unchecked(schema, &option, values),
        OptionKind::MultiIndexed => verify_multi(schema, &option, values),
        OptionKind::Override { target } => {
            let target_option = schema
                .lookup(target)
                .ok_or_else(|| ConfigError::InvalidReference {
                    path: option.path.clone(),
                    target: target.clone(),
                    reason: "overrides a nonexistent option".into(),
                })?;
            verify(schema, &target_option, values)
        }
        OptionKind::Bool => match assigned(values)? {
            Node::Bool(b) => Ok(Node::Bool(*b)),
            other => Err(ConfigError::mismatch(&values.path, "bool", other.type_name())),
        },
        OptionKind::Int => match assigned(values)? {
            Node::Int(i) => Ok(Node::Int(*i)),
            other => Err(ConfigError::mismatch(&values.path, "int", other.type_name())),
        },
        OptionKind::Enum(options) => match assigned(values)? {
            Node::Str(s) if options.contains(s) => Ok(Node::Str(s.clone())),
            Node::Str(_) => {
                let quoted: Vec<String> = options.iter().map(|o| format!("'{o}'")).collect();
                Err(ConfigError::invalid(
                    &values.path,
                    format!("should be one of {}", quoted.join(", ")),
                ))
            }
            other => Err(ConfigError::mismatch(&values.path, "string", other.type_name())),
        },
        OptionKind::String => Ok(Node::Text(StringValue::from_value(values)?)),
        OptionKind::List(style) => Ok(Node::Strings(ListValue::from_value(values, *style)?)),
        OptionKind::DirPatterns(style) => {
            let record = ListValue::from_value(values, *style)?;
            Ok(Node::Strings(list::check_patterns(&values.path, record)?))
        }
        OptionKind::Dict { .. } => verify_dict(values),
        OptionKind::CMakeOptions => Ok(Node::CMake(cmake::verify_options(values)?)),
        OptionKind::Path(opts) => verify_path(opts, values),
    }
}

/// What an explicit clear turns into for each kind of option.
fn cleared(kind: &OptionKind) -> Node {
    match kind {
        OptionKind::String => Node::Text(StringValue::cleared()),
        OptionKind::List(_) | OptionKind::DirPatterns(_) => Node::Strings(ListValue::cleared()),
        _ => Node::Cleared,
    }
}

/// The value of an option that only supports plain assignment.
fn assigned<'a>(values: &ValueRef<'a>) -> Result<&'a Node, ConfigError> {
    if !values.action.is_assignment() {
        return Err(ConfigError::unsupported(&values.path, values.action));
    }
    Ok(values.node)
}

fn expect_table<'a>(values: &ValueRef<'a>) -> Result<&'a Table, ConfigError> {
    match assigned(values)? {
        Node::Table(table) => Ok(table),
        other => Err(ConfigError::mismatch(&values.path, "table", other.type_name())),
    }
}

/// Verify each entry of `table` against the same-named child of `option`,
/// rejecting entries the option does not declare.
pub(crate) fn verify_children(
    schema: &Schema<'_>,
    option: &ConfigRef<'_>,
    table: &Table,
    path: &ConfPath,
) -> Result<Table, ConfigError> {
    let mut unknown: Vec<&String> = table
        .keys()
        .filter(|key| option.option.get(key).is_none())
        .collect();
    unknown.sort();
    if let Some(key) = unknown.first() {
        let known = option.option.children().keys().map(String::as_str);
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            path: path.clone(),
            suggestions: suggest(key, known),
        });
    }
    let mut verified = Table::new();
    for (name, node) in table {
        if let Some(child) = option.child(name) {
            let value = verify(schema, &child, &ValueRef::new(path.child(name), node))?;
            verified.insert(name.clone(), value);
        }
    }
    Ok(verified)
}

/// Candidate names similar to `key`, most similar first.
pub fn suggest<'a>(key: &str, candidates: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = candidates
        .map(|candidate| (strsim::normalized_damerau_levenshtein(key, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.to_string())
        .collect()
}

fn verify_unchecked(
    schema: &Schema<'_>,
    option: &ConfigRef<'_>,
    values: &ValueRef<'_>,
) -> Result<Node, ConfigError> {
    let node = assigned(values)?;
    let Node::Table(table) = node else {
        return Ok(node.clone().strip_tags());
    };
    let mut verified = Table::new();
    for (name, child_node) in table {
        let value = match option.child(name) {
            Some(child) => {
                let child_ref = ValueRef::new(values.path.child(name), child_node);
                verify(schema, &child, &child_ref)?
            }
            None => child_node.clone().strip_tags(),
        };
        verified.insert(name.clone(), value);
    }
    Ok(Node::Table(verified))
}

fn verify_multi(
    schema: &Schema<'_>,
    option: &ConfigRef<'_>,
    values: &ValueRef<'_>,
) -> Result<Node, ConfigError> {
    let table = expect_table(values)?;
    let (template, entries) = multi::partition(table);
    let mut verified = Table::new();
    if let Some(template) = template {
        let path = values.path.child(multi::TEMPLATE);
        verified.insert(
            multi::TEMPLATE.to_string(),
            Node::Table(verify_children(schema, option, &template, &path)?),
        );
    }
    for (index, entry) in entries {
        let entry_ref = ValueRef::new(values.path.child(index), entry);
        let value = match entry_ref.action {
            OverrideAction::Clear => Node::Cleared,
            _ => {
                let entry_table = expect_table(&entry_ref)?;
                Node::Table(verify_children(schema, option, entry_table, &entry_ref.path)?)
            }
        };
        verified.insert(index.clone(), value);
    }
    Ok(Node::Table(verified))
}

fn verify_dict(values: &ValueRef<'_>) -> Result<Node, ConfigError> {
    if !matches!(values.action, OverrideAction::Default | OverrideAction::Append) {
        return Err(ConfigError::unsupported(&values.path, values.action));
    }
    let Node::Table(table) = values.node else {
        return Err(ConfigError::mismatch(&values.path, "dict", values.node.type_name()));
    };
    let entries = table
        .iter()
        .map(|(key, node)| {
            let entry = ValueRef::new(values.path.child(key), node);
            Ok((key.clone(), StringValue::from_value(&entry)?))
        })
        .collect::<Result<IndexMap<_, _>, ConfigError>>()?;
    Ok(Node::Dict(entries))
}

fn verify_path(opts: &PathOptions, values: &ValueRef<'_>) -> Result<Node, ConfigError> {
    let raw = match assigned(values)? {
        Node::Str(s) => s,
        other => return Err(ConfigError::mismatch(&values.path, "path", other.type_name())),
    };
    if raw.is_empty() {
        return Ok(Node::Str(String::new()));
    }
    let fail = |reason: String| ConfigError::Path {
        path: values.path.clone(),
        reason,
    };
    let given = Path::new(raw);
    let full = if given.is_absolute() {
        if !opts.allow_absolute {
            return Err(fail(format!("'{raw}' must be a relative path")));
        }
        given.to_path_buf()
    } else {
        base_directory(&opts.base, &values.path).join(given)
    };
    let full = normalize(&full);

    if opts.must_exist || !opts.expected_contents.is_empty() {
        let shown = full.display();
        if !full.exists() {
            return Err(fail(format!("'{shown}' does not exist")));
        }
        if opts.is_folder && !full.is_dir() {
            return Err(fail(format!("'{shown}' should be a directory")));
        }
        if !opts.is_folder && !full.is_file() {
            return Err(fail(format!("'{shown}' should be a file")));
        }
        let missing: Vec<&str> = opts
            .expected_contents
            .iter()
            .map(String::as_str)
            .filter(|name| !full.join(name).exists())
            .collect();
        if !missing.is_empty() {
            return Err(fail(format!(
                "'{shown}' does not contain the following required files or folders: {}",
                missing.join(", ")
            )));
        }
    }
    Ok(Node::Str(full.to_string_lossy().into_owned()))
}

fn base_directory(base: &BasePath, value_path: &ConfPath) -> PathBuf {
    match base {
        BasePath::Project(dir) => dir.clone(),
        BasePath::CurrentDocument(project) => {
            let document_dir = value_path
                .first()
                .and_then(|document| Path::new(document).parent())
                .unwrap_or(Path::new(""));
            project.join(document_dir)
        }
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
