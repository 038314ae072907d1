//! Core resolution pipeline: verify, override, inherit, default, finalize.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Steps:
//!
//! 1. Verify each main document against the schema child of the same name
//! 2. Merge values found at override options into their targets
//! 3. Verify each override document against its target and merge it on top
//!    (later documents override earlier ones)
//! 4. Rewire cross-compilation inheritance from the selected platform
//! 5. Apply inheritance
//! 6. Fill in defaults
//! 7. Finalize every main document into a plain `toml::Table`

use indexmap::IndexMap;
use toml::{Table, Value};

use crate::default::update_defaults;
use crate::env::Environment;
use crate::error::ConfigError;
use crate::finalize::finalize;
use crate::inherit::inherit;
use crate::merge::override_value;
use crate::node::{Node, ValueRef};
use crate::path::ConfPath;
use crate::schema::{ConfigOption, ConfigRef, OptionKind, Schema};
use crate::types::CrossInheritance;
use crate::verify::{suggest, verify};

/// All pre-loaded data needed to resolve a configuration. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct ResolveInput {
    /// Main documents by name. Every name must be a child of the schema root.
    pub documents: Vec<(String, Node)>,
    /// Override documents in precedence order: first = lowest priority, last = highest.
    pub overrides: Vec<OverrideSource>,
    /// Environment snapshot for environment defaults and `${VAR}` expansion.
    pub env: Environment,
    pub cross: Vec<CrossInheritance>,
}

/// A document merged into `target` instead of being resolved on its own.
#[derive(Debug, Clone)]
pub struct OverrideSource {
    /// Label used in error messages, e.g. `"pyproject.local.toml"` or `"<cli:0>"`.
    pub name: String,
    pub document: Node,
    /// Absolute schema path the document applies to.
    pub target: ConfPath,
}

/// The finalized main documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved {
    documents: IndexMap<String, Table>,
}

impl Resolved {
    pub fn document(&self, name: &str) -> Option<&Table> {
        self.documents.get(name)
    }

    pub fn into_document(mut self, name: &str) -> Option<Table> {
        self.documents.shift_remove(name)
    }

    pub fn documents(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.documents.iter().map(|(name, table)| (name.as_str(), table))
    }

    /// Look up a value by absolute path; the first segment names the document.
    pub fn get(&self, path: &ConfPath) -> Option<&Value> {
        let (name, rest) = path.split_first()?;
        let mut segments = rest.iter();
        let first = segments.next()?;
        let mut value = self.documents.get(name)?.get(first)?;
        for segment in segments {
            value = value.as_table()?.get(segment)?;
        }
        Some(value)
    }

    pub fn to_json(&self, name: &str) -> Option<serde_json::Value> {
        self.document(name)
            .and_then(|table| serde_json::to_value(table).ok())
    }
}

/// Resolve configuration from pre-loaded inputs.
pub fn resolve(root: &ConfigOption, input: ResolveInput) -> Result<Resolved, ConfigError> {
    let mut schema = Schema::new(root);
    let mut values = Node::table();
    let mut main = Vec::new();

    // 1: Verify the main documents
    for (name, document) in &input.documents {
        let option = document_option(&schema, name)?;
        let path = option.path.clone();
        tracing::debug!(document = %name, "verifying document");
        let verified = verify(&schema, &option, &ValueRef::new(path.clone(), document))?;
        values.set(&path, verified);
        main.push(option);
    }

    // 2: Values at override options move into their targets
    for (source, target) in override_options(&schema.root()) {
        let Some(node) = values.remove(&source) else {
            continue;
        };
        if !node.is_present() {
            continue;
        }
        tracing::debug!(%source, %target, "applying override option");
        apply(&schema, &mut values, &source, &node, &target)?;
    }

    // 3: Override documents on top, in order
    for source in &input.overrides {
        if is_empty(&source.document) {
            tracing::debug!(name = %source.name, "skipping empty override document");
            continue;
        }
        let target = schema.lookup(&source.target).ok_or_else(|| {
            ConfigError::InvalidReference {
                path: ConfPath::new([source.name.as_str()]),
                target: source.target.clone(),
                reason: "override target does not exist".into(),
            }
        })?;
        tracing::debug!(name = %source.name, target = %source.target, "applying override document");
        let source_path = ConfPath::new([source.name.as_str()]);
        let verified = verify(
            &schema,
            &target,
            &ValueRef::new(source_path.clone(), &source.document),
        )?;
        apply(&schema, &mut values, &source_path, &verified, &source.target)?;
    }

    // 4: Cross-compilation rewiring
    for cross in &input.cross {
        let Some(platform) = values.get(&cross.selector).and_then(selected_platform) else {
            continue;
        };
        tracing::debug!(
            %platform,
            selector = %cross.selector,
            "rewiring cross-compilation inheritance"
        );
        for (option, source) in cross.edges(&platform) {
            schema.rewire(option, source);
        }
    }

    // 5: Inheritance
    tracing::debug!("applying inheritance");
    inherit(&schema, &mut values)?;

    // 6: Defaults
    for option in &main {
        tracing::debug!(document = %option.path, "filling in defaults");
        update_defaults(&schema, &input.env, &mut values, option, &option.path)?;
    }

    // 7: Finalize
    let mut documents = IndexMap::new();
    for option in &main {
        let node = values.get(&option.path).unwrap_or(&Node::Absent);
        let table = match finalize(&schema, &input.env, option, node, &option.path)? {
            Some(Value::Table(table)) => table,
            Some(other) => {
                return Err(ConfigError::mismatch(&option.path, "table", other.type_str()));
            }
            None => Table::new(),
        };
        documents.insert(option.option.name().to_string(), table);
    }
    Ok(Resolved { documents })
}

fn document_option<'s>(schema: &Schema<'s>, name: &str) -> Result<ConfigRef<'s>, ConfigError> {
    let root = schema.root();
    root.child(name).ok_or_else(|| ConfigError::UnknownKey {
        key: name.to_string(),
        path: ConfPath::root(),
        suggestions: suggest(name, root.option.children().keys().map(String::as_str)),
    })
}

/// Merge the verified `node`, read at `source`, into the value at `target`.
fn apply(
    schema: &Schema<'_>,
    values: &mut Node,
    source: &ConfPath,
    node: &Node,
    target: &ConfPath,
) -> Result<(), ConfigError> {
    let target_option = schema
        .lookup(target)
        .ok_or_else(|| ConfigError::InvalidReference {
            path: source.clone(),
            target: target.clone(),
            reason: "override target does not exist".into(),
        })?;
    if let Some(parent) = target.parent()
        && !values.materialize(&parent)
    {
        return Err(ConfigError::invalid(
            target,
            "cannot apply an override below a value that is not a table",
        ));
    }
    let merged = {
        let old = values
            .get(target)
            .filter(|node| node.is_present())
            .map(|node| ValueRef::new(target.clone(), node));
        override_value(
            schema,
            &target_option,
            old.as_ref(),
            &ValueRef::new(source.clone(), node),
        )?
    };
    values.set(target, merged);
    Ok(())
}

/// `(option path, target path)` of every override option outside multi-indexed
/// options.
fn override_options(option: &ConfigRef<'_>) -> Vec<(ConfPath, ConfPath)> {
    let mut found = Vec::new();
    for child in option.children() {
        match child.kind() {
            OptionKind::Override { target } => found.push((child.path.clone(), target.clone())),
            OptionKind::MultiIndexed => {}
            _ => found.extend(override_options(&child)),
        }
    }
    found
}

fn is_empty(document: &Node) -> bool {
    match document {
        Node::Absent => true,
        Node::Table(table) => table.is_empty(),
        _ => false,
    }
}

fn selected_platform(node: &Node) -> Option<String> {
    match node {
        Node::Str(platform) => Some(platform.clone()),
        Node::Text(record) => record.finalize(),
        _ => None,
    }
    .filter(|platform| !platform.is_empty())
}
