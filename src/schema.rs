//! The option schema.
//!
//! A schema is a tree of [`ConfigOption`]s built once, up front, and never
//! mutated afterwards. Each option has a [`kind`](OptionKind) deciding how
//! its values are verified, merged and finalized, an optional default
//! strategy, and an optional inheritance source.
//!
//! [`Schema`] is the per-resolution view of that tree: it resolves paths and
//! inheritance chains, and carries inheritance edges rewired for the current
//! resolution (see [`CrossInheritance`](crate::CrossInheritance)).

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::default::DefaultValue;
use crate::error::ConfigError;
use crate::list::ListStyle;
use crate::path::ConfPath;

#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    /// A table with a fixed set of named children.
    Section,
    /// Anything goes; known children are still checked.
    Unchecked,
    Bool,
    Int,
    String,
    Enum(Vec<String>),
    List(ListStyle),
    /// String-to-string table. With `expand_environment`, entries are
    /// `${VAR}`-expanded against the environment at finalization.
    Dict { expand_environment: bool },
    Path(PathOptions),
    /// Relative glob patterns that must stay inside the project.
    DirPatterns(ListStyle),
    CMakeOptions,
    /// Numbered entries sharing the children of this option, plus a template.
    MultiIndexed,
    /// Merged into `target` during the override phase, then removed.
    Override { target: ConfPath },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathOptions {
    pub must_exist: bool,
    pub is_folder: bool,
    pub base: BasePath,
    pub allow_absolute: bool,
    /// Names that must exist inside the path. Implies `must_exist`.
    pub expected_contents: Vec<String>,
}

impl PathOptions {
    pub fn new(base: BasePath) -> Self {
        Self {
            must_exist: false,
            is_folder: false,
            base,
            allow_absolute: false,
            expected_contents: Vec::new(),
        }
    }
}

/// What relative paths are resolved against.
#[derive(Debug, Clone, PartialEq)]
pub enum BasePath {
    /// The project directory.
    Project(PathBuf),
    /// The directory of the document holding the value. Document names that
    /// are relative paths are taken relative to the given project directory.
    CurrentDocument(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOption {
    name: String,
    description: String,
    example: String,
    kind: OptionKind,
    default: DefaultValue,
    inherits: Option<ConfPath>,
    create_if_inheritance_target_exists: bool,
    children: IndexMap<String, ConfigOption>,
}

impl ConfigOption {
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            example: String::new(),
            kind,
            default: DefaultValue::None,
            inherits: None,
            create_if_inheritance_target_exists: false,
            children: IndexMap::new(),
        }
    }

    pub fn section(name: impl Into<String>) -> Self {
        Self::new(name, OptionKind::Section)
    }

    pub fn unchecked(name: impl Into<String>) -> Self {
        Self::new(name, OptionKind::Unchecked)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, OptionKind::String)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, OptionKind::List(ListStyle::default()))
    }

    pub fn multi(name: impl Into<String>) -> Self {
        Self::new(name, OptionKind::MultiIndexed)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    pub fn default(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }

    pub fn inherits(mut self, path: impl Into<ConfPath>) -> Self {
        self.inherits = Some(path.into());
        self
    }

    /// Let this option come into existence (with its ancestors) just because
    /// the option it inherits from has a value.
    pub fn create_if_inheritance_target_exists(mut self) -> Self {
        self.create_if_inheritance_target_exists = true;
        self
    }

    /// Add a child.
    ///
    /// # Panics
    ///
    /// If a child with the same name exists.
    pub fn child(mut self, option: ConfigOption) -> Self {
        self.insert(option);
        self
    }

    pub fn children_from(mut self, options: impl IntoIterator<Item = ConfigOption>) -> Self {
        for option in options {
            self.insert(option);
        }
        self
    }

    /// Add a child and return it for further nesting.
    ///
    /// # Panics
    ///
    /// If a child with the same name exists.
    pub fn insert(&mut self, option: ConfigOption) -> &mut ConfigOption {
        assert!(
            !self.children.contains_key(&option.name),
            "duplicate option '{}' in '{}'",
            option.name,
            self.name
        );
        let name = option.name.clone();
        self.children.entry(name).or_insert(option)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn example_text(&self) -> &str {
        &self.example
    }

    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    pub fn inherits_from(&self) -> Option<&ConfPath> {
        self.inherits.as_ref()
    }

    pub fn creates_if_inheritance_target_exists(&self) -> bool {
        self.create_if_inheritance_target_exists
    }

    pub fn children(&self) -> &IndexMap<String, ConfigOption> {
        &self.children
    }

    pub fn get(&self, name: &str) -> Option<&ConfigOption> {
        self.children.get(name)
    }

    /// Human-readable type, as shown in help output.
    pub fn type_name(&self) -> String {
        match &self.kind {
            OptionKind::Section | OptionKind::Unchecked => "table".into(),
            OptionKind::Bool => "bool".into(),
            OptionKind::Int => "int".into(),
            OptionKind::String => "string".into(),
            OptionKind::Enum(options) => options
                .iter()
                .map(|o| format!("'{o}'"))
                .collect::<Vec<_>>()
                .join(" | "),
            OptionKind::List(style) if style.append_by_default => "list+".into(),
            OptionKind::List(_) => "list".into(),
            OptionKind::Dict { .. } => "dict".into(),
            OptionKind::Path(opts) if opts.is_folder => "path (directory)".into(),
            OptionKind::Path(_) => "path".into(),
            OptionKind::DirPatterns(_) => "list of patterns".into(),
            OptionKind::CMakeOptions => "dict (CMake)".into(),
            OptionKind::MultiIndexed => "list of tables".into(),
            OptionKind::Override { target } => format!("override of {target}"),
        }
    }
}

/// A schema option together with the schema path it was reached by.
#[derive(Debug, Clone)]
pub struct ConfigRef<'s> {
    pub path: ConfPath,
    pub option: &'s ConfigOption,
}

impl<'s> ConfigRef<'s> {
    pub fn new(path: ConfPath, option: &'s ConfigOption) -> Self {
        Self { path, option }
    }

    pub fn child(&self, name: &str) -> Option<ConfigRef<'s>> {
        let option = self.option.get(name)?;
        Some(ConfigRef::new(self.path.child(name), option))
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = ConfigRef<'s>> + '_ {
        self.option
            .children()
            .iter()
            .map(|(name, option)| ConfigRef::new(self.path.child(name), option))
    }

    pub fn kind(&self) -> &'s OptionKind {
        self.option.kind()
    }
}

/// Longest inheritance chain followed before giving up.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A schema tree as seen by one resolution.
#[derive(Debug, Clone)]
pub struct Schema<'s> {
    root: &'s ConfigOption,
    rewired: IndexMap<ConfPath, ConfPath>,
}

impl<'s> Schema<'s> {
    pub fn new(root: &'s ConfigOption) -> Self {
        Self {
            root,
            rewired: IndexMap::new(),
        }
    }

    /// Make the option at `option` inherit from `source` for this resolution,
    /// whatever it declares.
    pub fn rewire(&mut self, option: ConfPath, source: ConfPath) {
        tracing::debug!(%option, %source, "rewired inheritance");
        self.rewired.insert(option, source);
    }

    pub fn root(&self) -> ConfigRef<'s> {
        ConfigRef::new(ConfPath::root(), self.root)
    }

    /// The option at an absolute schema path. Stub options that only inherit
    /// are looked through, so children of the inheritance source are found.
    pub fn lookup(&self, path: &ConfPath) -> Option<ConfigRef<'s>> {
        let mut current = self.root();
        for segment in path.iter() {
            current = match current.child(segment) {
                Some(child) => child,
                None => {
                    let resolved = self.resolve(&current).ok()?;
                    let option = resolved.option.get(segment)?;
                    ConfigRef::new(current.path.child(segment), option)
                }
            };
        }
        Some(current)
    }

    /// Where `option` inherits from in this resolution.
    pub fn inherits(&self, option: &ConfigRef<'s>) -> Option<ConfPath> {
        self.rewired
            .get(&option.path)
            .or(option.option.inherits_from())
            .cloned()
    }

    /// Follow the inheritance chain of `option` to the option that actually
    /// defines its structure.
    pub fn resolve(&self, option: &ConfigRef<'s>) -> Result<ConfigRef<'s>, ConfigError> {
        let mut current = option.clone();
        let mut seen = vec![current.path.clone()];
        while let Some(source) = self.inherits(&current) {
            let next = self
                .lookup(&source)
                .ok_or_else(|| ConfigError::InvalidReference {
                    path: current.path.clone(),
                    target: source.clone(),
                    reason: "inherits from a nonexistent option".into(),
                })?;
            if seen.contains(&next.path) || seen.len() > MAX_INHERITANCE_DEPTH {
                return Err(ConfigError::InvalidReference {
                    path: option.path.clone(),
                    target: source,
                    reason: "inheritance forms a cycle".into(),
                });
            }
            seen.push(next.path.clone());
            current = next;
        }
        Ok(current)
    }
}
