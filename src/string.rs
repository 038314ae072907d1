//! String options.
//!
//! A [`StringValue`] records every way a string has been touched across
//! documents: an assigned value, plain and path-list appends and prepends,
//! and removed substrings. The record is only flattened to a `String` at
//! finalization.

use crate::error::ConfigError;
use crate::node::{Node, ValueRef};
use crate::types::OverrideAction;

/// Separator used by `+=(path)` and `=+(path)`.
pub const PATH_LIST_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringValue {
    pub clear: bool,
    pub value: Option<String>,
    pub append: Option<String>,
    pub append_path: Option<String>,
    pub prepend: Option<String>,
    pub prepend_path: Option<String>,
    pub remove: Option<Vec<String>>,
}

impl StringValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn cleared() -> Self {
        Self {
            clear: true,
            ..Self::default()
        }
    }

    /// Build a record from a (possibly tagged) document value.
    pub fn from_value(v: &ValueRef<'_>) -> Result<Self, ConfigError> {
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
            OverrideAction::Remove => {
                record.remove = Some(match v.node {
                    Node::Str(s) => vec![s.clone()],
                    Node::List(items) => items
                        .iter()
                        .map(|item| match item {
                            Node::Str(s) => Ok(s.clone()),
                            other => Err(ConfigError::mismatch(
                                &v.path,
                                "string or list of strings",
                                other.type_name(),
                            )),
                        })
                        .collect::<Result<_, _>>()?,
                    other => {
                        return Err(ConfigError::mismatch(
                            &v.path,
                            "string or list of strings",
                            other.type_name(),
                        ));
                    }
                });
            }
            action => {
                let Node::Str(s) = v.node else {
                    return Err(ConfigError::mismatch(&v.path, "string", v.node.type_name()));
                };
                let s = Some(s.clone());
                match action {
                    OverrideAction::Append => record.append = s,
                    OverrideAction::AppendPath => record.append_path = s,
                    OverrideAction::Prepend => record.prepend = s,
                    OverrideAction::PrependPath => record.prepend_path = s,
                    _ => record.value = s,
                }
            }
        }
        Ok(record)
    }

    /// Apply `new` on top of `self`.
    ///
    /// A clear or an assigned value in `new` replaces everything accumulated so
    /// far. Otherwise removals are applied to what `self` holds, and appends and
    /// prepends accumulate around it.
    pub fn override_with(&self, new: &StringValue) -> StringValue {
        if new.clear {
            return new.clone();
        }
        if new.value.is_some() {
            return StringValue {
                remove: None,
                ..new.clone()
            };
        }
        let mut out = self.clone();
        if let Some(removed) = &new.remove {
            for pattern in removed {
                for piece in out.pieces_mut() {
                    *piece = piece.replace(pattern.as_str(), "");
                }
            }
            out.remove
                .get_or_insert_with(Vec::new)
                .extend(removed.iter().cloned());
        }
        if let Some(append) = &new.append {
            out.append = Some(out.append.unwrap_or_default() + append);
        }
        if let Some(append_path) = &new.append_path {
            out.append_path = Some(join_path(
                out.append_path.as_deref().unwrap_or(""),
                append_path,
            ));
        }
        if let Some(prepend) = &new.prepend {
            out.prepend = Some(prepend.clone() + out.prepend.as_deref().unwrap_or(""));
        }
        if let Some(prepend_path) = &new.prepend_path {
            out.prepend_path = Some(join_path(
                prepend_path,
                out.prepend_path.as_deref().unwrap_or(""),
            ));
        }
        out
    }

    /// Flatten to a string. `None` when the record was cleared and nothing was
    /// added afterwards.
    pub fn finalize(&self) -> Option<String> {
        let untouched = self.value.is_none()
            && self.append.is_none()
            && self.append_path.is_none()
            && self.prepend.is_none()
            && self.prepend_path.is_none();
        if untouched && self.clear {
            return None;
        }
        let mut result = self.value.clone().unwrap_or_default();
        if let Some(append) = &self.append {
            result.push_str(append);
        }
        if let Some(append_path) = &self.append_path {
            result = join_path(&result, append_path);
        }
        if let Some(prepend) = &self.prepend {
            result = prepend.clone() + &result;
        }
        if let Some(prepend_path) = &self.prepend_path {
            result = join_path(prepend_path, &result);
        }
        Some(result)
    }

    /// Every string piece the record currently holds.
    pub fn pieces_mut(&mut self) -> impl Iterator<Item = &mut String> {
        [
            &mut self.value,
            &mut self.append,
            &mut self.append_path,
            &mut self.prepend,
            &mut self.prepend_path,
        ]
        .into_iter()
        .filter_map(Option::as_mut)
    }
}

fn join_path(a: &str, b: &str) -> String {
    if a.is_empty() || b.is_empty() {
        format!("{a}{b}")
    } else {
        format!("{a}{PATH_LIST_SEPARATOR}{b}")
    }
}
