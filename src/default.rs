//! Default values for options the documents leave unset.
//!
//! Defaults are only computed for options whose parent value exists, so no
//! section appears just because one of its children has a default. A computed
//! default is verified and finalized with the option's own schema before it is
//! written, and the walk then continues into it.

use std::fmt;

use crate::env::Environment;
use crate::error::ConfigError;
use crate::finalize::finalize;
use crate::multi;
use crate::node::{Node, ValueRef};
use crate::path::{ConfPath, UP};
use crate::schema::{ConfigRef, OptionKind, Schema};
use crate::verify::verify;

/// Longest chain of reference defaults followed before giving up.
const MAX_REFERENCE_DEPTH: usize = 32;

/// How an option obtains a value when none was given.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DefaultValue {
    #[default]
    None,
    /// A constant, verified like a user-supplied value.
    Value(toml::Value),
    /// Leaving the option unset is an error.
    Required,
    /// The value of an environment variable, if set and not disabled.
    Env { key: String, disabled: bool },
    /// The value (or default) of another option. A relative path is resolved
    /// against the parent of the option carrying the default.
    Reference { path: ConfPath, relative: bool },
}

impl DefaultValue {
    pub fn value(value: impl Into<toml::Value>) -> Self {
        DefaultValue::Value(value.into())
    }

    pub fn env(key: impl Into<String>) -> Self {
        DefaultValue::Env {
            key: key.into(),
            disabled: false,
        }
    }

    /// Refer to an option by its absolute schema path.
    pub fn reference(path: impl Into<ConfPath>) -> Self {
        DefaultValue::Reference {
            path: path.into(),
            relative: false,
        }
    }

    /// Refer to a sibling (or, through `..`, a relative) of the option.
    pub fn relative(path: impl Into<ConfPath>) -> Self {
        DefaultValue::Reference {
            path: path.into(),
            relative: true,
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::None => f.write_str("none"),
            DefaultValue::Value(toml::Value::String(s)) => write!(f, "{s:?}"),
            DefaultValue::Value(value) => write!(f, "{value}"),
            DefaultValue::Required => f.write_str("required"),
            DefaultValue::Env { key, .. } => write!(f, "ENV{{{key}}}"),
            DefaultValue::Reference { path, relative: true } => write!(f, "{path}"),
            DefaultValue::Reference { path, relative: false } => write!(f, "/{path}"),
        }
    }
}

/// Fill in defaults below `path` in `values`, which holds every document keyed
/// by name. `option` is the schema option for `path`.
pub fn update_defaults(
    schema: &Schema<'_>,
    env: &Environment,
    values: &mut Node,
    option: &ConfigRef<'_>,
    path: &ConfPath,
) -> Result<(), ConfigError> {
    Defaulter { schema, env }.update(values, option, path)
}

struct Defaulter<'a, 's> {
    schema: &'a Schema<'s>,
    env: &'a Environment,
}

impl<'s> Defaulter<'_, 's> {
    fn update(
        &self,
        values: &mut Node,
        option: &ConfigRef<'s>,
        path: &ConfPath,
    ) -> Result<(), ConfigError> {
        let option = self.schema.resolve(option)?;
        if matches!(option.kind(), OptionKind::Override { .. }) {
            return Ok(());
        }
        if !values.get(path).is_some_and(Node::is_present) {
            let Some(default) = self.default_for(values, &option, path, 0)? else {
                return Ok(());
            };
            tracing::trace!(%path, "materialized default");
            if !values.set(path, default) {
                return Ok(());
            }
        }

        if let OptionKind::MultiIndexed = option.kind() {
            let Some(table) = values.get_mut(path).and_then(Node::as_table_mut) else {
                return Ok(());
            };
            multi::spread_template(self.schema, &option, table, path)?;
            let indices: Vec<String> = table.keys().cloned().collect();
            for index in indices {
                let entry = path.child(&index);
                if values.get(&entry).and_then(Node::as_table).is_none() {
                    continue;
                }
                for child in option.children() {
                    let name = child.option.name();
                    self.update(values, &child, &entry.child(name))?;
                }
            }
            return Ok(());
        }

        if values.get(path).and_then(Node::as_table).is_some() {
            for child in option.children() {
                let name = child.option.name();
                self.update(values, &child, &path.child(name))?;
            }
        }
        Ok(())
    }

    /// The default of `option` at `path`, ready to be stored: verified and
    /// finalized, or `None` when the option has no default.
    fn default_for(
        &self,
        values: &Node,
        option: &ConfigRef<'s>,
        path: &ConfPath,
        depth: usize,
    ) -> Result<Option<Node>, ConfigError> {
        match option.option.default_value() {
            DefaultValue::None => Ok(None),
            DefaultValue::Value(value) => self.settle(option, path, Node::from(value.clone())),
            DefaultValue::Required => Err(ConfigError::MissingValue { path: path.clone() }),
            DefaultValue::Env { disabled: true, .. } => Ok(None),
            DefaultValue::Env { key, .. } => match self.env.get(key) {
                Some(value) => self.settle(option, path, Node::from(value)),
                None => Ok(None),
            },
            DefaultValue::Reference { path: target, relative } => {
                let (target_path, value_path) = if *relative {
                    let up = ConfPath::new(std::iter::once(UP).chain(target.iter()));
                    (option.path.join(&up), path.join(&up))
                } else {
                    (target.clone(), target.clone())
                };
                if depth >= MAX_REFERENCE_DEPTH {
                    return Err(ConfigError::InvalidReference {
                        path: option.path.clone(),
                        target: target_path,
                        reason: "reference defaults form a cycle".into(),
                    });
                }
                let target_option = self.schema.lookup(&target_path).ok_or_else(|| {
                    ConfigError::InvalidReference {
                        path: option.path.clone(),
                        target: target_path.clone(),
                        reason: "reference to nonexistent option".into(),
                    }
                })?;
                let target_option = self.schema.resolve(&target_option)?;
                let referenced = match values.get(&value_path) {
                    Some(Node::Cleared) => None,
                    Some(node) if node.is_present() => finalize(
                        self.schema,
                        self.env,
                        &target_option,
                        node,
                        &value_path,
                    )?
                    .map(Node::from),
                    _ => self.default_for(values, &target_option, &value_path, depth + 1)?,
                };
                match referenced {
                    Some(node) => self.settle(option, path, node),
                    None => Ok(None),
                }
            }
        }
    }

    /// Verify and finalize a raw default for `option`.
    fn settle(
        &self,
        option: &ConfigRef<'s>,
        path: &ConfPath,
        raw: Node,
    ) -> Result<Option<Node>, ConfigError> {
        let verified = verify(self.schema, option, &ValueRef::new(path.clone(), &raw))?;
        Ok(finalize(self.schema, self.env, option, &verified, path)?.map(Node::from))
    }
}
