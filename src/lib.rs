//! Schema-typed resolution of layered, overridable configuration trees.
//!
//! Layerfig takes a handful of nested documents (a project file, optional
//! local and cross-compilation override files, command-line overrides),
//! checks them against a declarative option schema and resolves them into
//! one plain value tree per document.
//!
//! ```ignore
//! let resolved = Resolver::builder(&schema)
//!     .document("pyproject.toml", project)
//!     .override_file("pyproject.local.toml", local_text, "pyproject.toml/tool/pbc")
//!     .cli_target("pyproject.toml/tool/pbc")
//!     .cli_overrides(["cmake.build_type=Debug", "cmake.args+=[\"-G\", \"Ninja\"]"])
//!     .process_env()
//!     .resolve()?;
//! let build_type = resolved.get(&"pyproject.toml/tool/pbc/cmake/build_type".into());
//! ```
//!
//! # The schema
//!
//! A schema is a tree of [`ConfigOption`]s. Each option has a name, an
//! [`OptionKind`] deciding how its values are checked and merged, an optional
//! [`DefaultValue`], and optionally the path of another option it inherits
//! from. Schemas are plain data built once; every resolution wraps the tree
//! in a [`Schema`] view that carries per-run state such as rewired
//! inheritance edges.
//!
//! Paths are [`ConfPath`]s: slash-joined segments, with the document name as
//! the first segment of an absolute path (`pyproject.toml/tool/pbc/cmake`).
//!
//! # The pipeline
//!
//! ```text
//! verify     raw documents become typed value trees
//!    ↓
//! override   override options, override documents, CLI assignments
//!    ↓
//! inherit    options pick up the values of the options they inherit from
//!    ↓
//! default    unset options get literal, environment or reference defaults
//!    ↓
//! finalize   records collapse into plain toml values
//! ```
//!
//! Every phase is exposed on its own ([`verify()`], [`override_value()`],
//! [`inherit()`], [`update_defaults()`], [`finalize()`]) and driven end to end
//! by [`resolve()`] or the [`ResolverBuilder`].
//!
//! # Override algebra
//!
//! Every value in an override document carries an [`OverrideAction`]. Plain
//! values use `Default`, which means "assign" for most kinds and "append" for
//! lists declared with `append_by_default`. Strings keep a record of the
//! assigned value and of every append, prepend and removal, so later layers
//! compose with earlier ones instead of replacing them:
//!
//! | Syntax | Action |
//! |--------|--------|
//! | `k=v` | assign |
//! | `k+=v` / `k=+v` | append / prepend |
//! | `k+=(path)v` / `k=+(path)v` | append / prepend with the path separator |
//! | `k-=v` | remove |
//! | `k=!` | clear |
//!
//! A cleared option counts as set: it blocks defaults and inheritance, and it
//! disappears from the final tree.
//!
//! # Environment
//!
//! Resolution never reads the process environment on its own. Environment
//! defaults and `${VAR}` expansion use an [`Environment`] snapshot passed in
//! by the caller, either built from pairs or captured explicitly.
//!
//! # Clap adapter
//!
//! With the `clap` feature (on by default), [`OverrideArgs`] gives any clap
//! derive struct a repeatable `-o/--override KEY=VALUE` flag.
//!
//! # Error handling
//!
//! All fallible operations return [`ConfigError`]. Errors name the path they
//! concern; unknown keys come with near-miss suggestions. Use
//! [`ConfigError::kind()`] to tell schema errors, missing values, invalid
//! references, path checks and syntax errors apart.

pub mod error;
pub mod path;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod cmake;
mod default;
mod env;
mod finalize;
mod inherit;
mod list;
mod merge;
mod multi;
mod node;
mod overrides;
mod resolve;
mod schema;
mod string;
mod syntax;
mod verify;

#[cfg(test)]
mod fixtures;

pub use builder::{Resolver, ResolverBuilder};
#[cfg(feature = "clap")]
pub use cli::OverrideArgs;
pub use cmake::{CMakeItem, CMakeType, CMakeValue, Strictness};
pub use default::{DefaultValue, update_defaults};
pub use env::{Environment, apply_environment_options, expand_options, substitute};
pub use error::{ConfigError, ErrorKind};
pub use finalize::finalize;
pub use inherit::inherit;
pub use list::{ListStyle, ListValue};
pub use merge::{deep_merge, override_value};
pub use node::{Node, Table, ValueRef};
pub use overrides::{assignment_to_document, assignments_to_documents};
pub use path::ConfPath;
pub use resolve::{OverrideSource, ResolveInput, Resolved, resolve};
pub use schema::{BasePath, ConfigOption, ConfigRef, OptionKind, PathOptions, Schema};
pub use string::{PATH_LIST_SEPARATOR, StringValue};
pub use syntax::{Assignment, parse_assignment, parse_assignments};
pub use types::{CrossInheritance, OverrideAction};
pub use verify::verify;
