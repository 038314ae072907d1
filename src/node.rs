//! Value trees.
//!
//! A document enters the pipeline as a tree of raw [`Node`]s (scalars, lists and
//! tables), possibly wrapped in [`Node::Tagged`] when it came from an override
//! source. Verification replaces raw leaves with typed records (`Text`,
//! `Strings`, `Dict`, `CMake`, `Cleared`) and drops the tags; finalization turns
//! everything back into plain `toml` values.
//!
//! All traversal is soft: looking up or writing below an absent ancestor
//! returns `None`/`false` instead of failing.

use indexmap::IndexMap;

use crate::cmake::{self, CMakeValue};
use crate::list::ListValue;
use crate::path::ConfPath;
use crate::string::StringValue;
use crate::types::OverrideAction;

pub type Table = IndexMap<String, Node>;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Node>),
    Table(Table),
    /// A value read from an override source, with its merge intent.
    Tagged(OverrideAction, Box<Node>),
    Text(StringValue),
    Strings(ListValue),
    Dict(IndexMap<String, StringValue>),
    CMake(IndexMap<String, CMakeValue>),
    /// Explicitly cleared; counts as set until finalization removes it.
    Cleared,
}

impl Node {
    pub fn table() -> Self {
        Node::Table(Table::new())
    }

    pub fn tagged(action: OverrideAction, node: Node) -> Self {
        Node::Tagged(action, Box::new(node))
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Node::Absent)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Absent => "nothing",
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::Float(_) => "float",
            Node::Str(_) | Node::Text(_) => "string",
            Node::List(_) | Node::Strings(_) => "list",
            Node::Table(_) => "table",
            Node::Tagged(_, inner) => inner.type_name(),
            Node::Dict(_) => "dict",
            Node::CMake(_) => "CMake options",
            Node::Cleared => "cleared value",
        }
    }

    /// The node's action and the node without its tag.
    pub fn untagged(&self) -> (OverrideAction, &Node) {
        match self {
            Node::Tagged(action, inner) => (*action, inner.as_ref()),
            other => (OverrideAction::Default, other),
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self.untagged().1 {
            Node::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Node::Table(table) => Some(table),
            Node::Tagged(_, inner) => inner.as_table_mut(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.untagged().1 {
            Node::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get(&self, path: &ConfPath) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, segment| node.as_table()?.get(segment))
    }

    pub fn get_mut(&mut self, path: &ConfPath) -> Option<&mut Node> {
        let mut node = self;
        for segment in path.iter() {
            node = node.as_table_mut()?.get_mut(segment)?;
        }
        Some(node)
    }

    /// Whether a non-absent value exists at `path`.
    pub fn contains(&self, path: &ConfPath) -> bool {
        self.get(path).is_some_and(Node::is_present)
    }

    /// Write `value` at `path`. Returns `false`, leaving the tree untouched,
    /// when the parent of `path` is not a table.
    pub fn set(&mut self, path: &ConfPath, value: Node) -> bool {
        let Some((parent, name)) = path.split_last() else {
            *self = value;
            return true;
        };
        match self.get_mut(&parent).and_then(Node::as_table_mut) {
            Some(table) => {
                table.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Like [`set`](Self::set), but keeps an existing value.
    pub fn set_default(&mut self, path: &ConfPath, value: Node) -> bool {
        if self.contains(path) {
            return true;
        }
        self.set(path, value)
    }

    /// Remove and return the value at `path`, keeping the order of its siblings.
    pub fn remove(&mut self, path: &ConfPath) -> Option<Node> {
        let (parent, name) = path.split_last()?;
        self.get_mut(&parent)?.as_table_mut()?.shift_remove(name)
    }

    /// Create empty tables along `path` where nothing is set yet. Returns
    /// `false` when an existing value on the way is not a table.
    pub fn materialize(&mut self, path: &ConfPath) -> bool {
        let mut node = self;
        for segment in path.iter() {
            let Some(table) = node.as_table_mut() else {
                return false;
            };
            let child = table.entry(segment.to_string()).or_insert(Node::Absent);
            if !child.is_present() {
                *child = Node::table();
            }
            node = child;
        }
        node.as_table().is_some()
    }

    /// Drop override tags recursively. `Clear` tags become [`Node::Cleared`].
    pub fn strip_tags(self) -> Node {
        match self {
            Node::Tagged(OverrideAction::Clear, _) => Node::Cleared,
            Node::Tagged(_, inner) => inner.strip_tags(),
            Node::List(items) => Node::List(items.into_iter().map(Node::strip_tags).collect()),
            Node::Table(table) => Node::Table(
                table
                    .into_iter()
                    .map(|(k, v)| (k, v.strip_tags()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Convert to a plain value without consulting a schema. Absent and cleared
    /// nodes (and records that finalize to nothing) disappear.
    pub fn into_plain(self) -> Option<toml::Value> {
        use toml::Value;
        match self {
            Node::Absent | Node::Cleared => None,
            Node::Bool(b) => Some(Value::Boolean(b)),
            Node::Int(i) => Some(Value::Integer(i)),
            Node::Float(f) => Some(Value::Float(f)),
            Node::Str(s) => Some(Value::String(s)),
            Node::List(items) => Some(Value::Array(
                items.into_iter().filter_map(Node::into_plain).collect(),
            )),
            Node::Table(table) => Some(Value::Table(
                table
                    .into_iter()
                    .filter_map(|(k, v)| v.into_plain().map(|v| (k, v)))
                    .collect(),
            )),
            Node::Tagged(_, inner) => inner.into_plain(),
            Node::Text(record) => record.finalize().map(Value::String),
            Node::Strings(record) => record
                .finalize()
                .map(|items| Value::Array(items.into_iter().map(Value::String).collect())),
            Node::Dict(entries) => Some(Value::Table(
                entries
                    .into_iter()
                    .filter_map(|(k, v)| v.finalize().map(|s| (k, Value::String(s))))
                    .collect(),
            )),
            Node::CMake(options) => Some(Value::Table(cmake::finalize_options(&options))),
        }
    }
}

impl From<toml::Value> for Node {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Node::Str(s),
            toml::Value::Integer(i) => Node::Int(i),
            toml::Value::Float(f) => Node::Float(f),
            toml::Value::Boolean(b) => Node::Bool(b),
            toml::Value::Datetime(dt) => Node::Str(dt.to_string()),
            toml::Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            toml::Value::Table(table) => Node::from(table),
        }
    }
}

impl From<toml::Table> for Node {
    fn from(table: toml::Table) -> Self {
        Node::Table(table.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Node::Absent,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Int(i),
                None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Node::Str(s),
            Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Table(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Str(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Str(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Int(i)
    }
}

/// A read-only view of one value-tree node: where it is, what it holds, and the
/// override action it was tagged with.
#[derive(Debug, Clone)]
pub struct ValueRef<'a> {
    pub path: ConfPath,
    pub node: &'a Node,
    pub action: OverrideAction,
}

impl<'a> ValueRef<'a> {
    pub fn new(path: ConfPath, node: &'a Node) -> Self {
        let (action, node) = node.untagged();
        Self { path, node, action }
    }

    pub fn child(&self, name: &str) -> Option<ValueRef<'a>> {
        let node = self.node.as_table()?.get(name)?;
        Some(ValueRef::new(self.path.child(name), node))
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.child(name).is_some_and(|child| child.node.is_present())
    }
}
