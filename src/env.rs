//! Environment snapshots and `${VAR}` substitution.

use indexmap::IndexMap;

use crate::string::StringValue;

/// An immutable-by-convention snapshot of environment variables.
///
/// Resolution never reads the process environment; callers hand one of these
/// in, either built from pairs or captured with [`Environment::capture`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: IndexMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        vars.into_iter().collect()
    }

    /// Snapshot the current process environment.
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Expand `${NAME}` and `$NAME` in `template`.
///
/// `$$` is a literal `$`. Undefined variables expand to the empty string. A `$`
/// that starts neither form is kept as is.
pub fn substitute(template: &str, env: &Environment) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{')
            && let Some(end) = braced.find('}')
            && is_identifier(&braced[..end])
        {
            out.push_str(env.get(&braced[..end]).unwrap_or_default());
            rest = &braced[end + 1..];
        } else {
            let len = identifier_len(after);
            if len == 0 {
                out.push('$');
            } else {
                out.push_str(env.get(&after[..len]).unwrap_or_default());
            }
            rest = &after[len..];
        }
    }
    out.push_str(rest);
    out
}

fn identifier_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(*c == '_' || c.is_ascii_alphanumeric()))
        .map_or(s.len(), |(i, _)| i)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_len(s) == s.len()
}

/// Apply environment-style string options to `env`, in order.
///
/// Every piece of each record is expanded first, so later entries see the
/// variables set by earlier ones. A record that only appends or prepends
/// starts from the variable's current value, even when the appended text
/// expands to nothing. A record that finalizes to nothing removes the
/// variable.
pub fn apply_environment_options(env: &mut Environment, options: &IndexMap<String, StringValue>) {
    for (name, record) in options {
        let mut record = record.clone();
        for piece in record.pieces_mut() {
            *piece = substitute(piece, env);
        }
        if let Some(remove) = &mut record.remove {
            for piece in remove.iter_mut() {
                *piece = substitute(piece, env);
            }
        }
        let extends = record.append.is_some()
            || record.prepend.is_some()
            || record.append_path.is_some()
            || record.prepend_path.is_some();
        if extends
            && record.value.as_deref().is_none_or(str::is_empty)
            && let Some(current) = env.get(name)
        {
            record.value = Some(current.to_string());
        }
        match record.finalize() {
            Some(value) => {
                tracing::trace!(%name, %value, "set environment variable");
                env.set(name.clone(), value);
            }
            None => {
                env.remove(name);
            }
        }
    }
}

/// Expand environment-style options against a scratch copy of `env` and
/// return the final value of every variable they mention.
pub fn expand_options(env: &Environment, options: &IndexMap<String, StringValue>) -> toml::Table {
    let mut scratch = env.clone();
    apply_environment_options(&mut scratch, options);
    options
        .keys()
        .filter_map(|name| {
            scratch
                .get(name)
                .map(|value| (name.clone(), toml::Value::String(value.to_string())))
        })
        .collect()
}
