//! Clap adapter for override assignments.
//!
//! Compiled only when the `clap` Cargo feature is enabled (on by default).
//! [`OverrideArgs`] adds a repeatable `-o/--override KEY=VALUE` flag to any
//! clap derive struct. [`OverrideArgs::into_assignments()`] parses the flags
//! into [`Assignment`]s, ready for
//! [`ResolverBuilder::assignment()`](crate::ResolverBuilder::assignment).
//!
//! Without clap, pass the raw strings to
//! [`ResolverBuilder::cli_overrides()`](crate::ResolverBuilder::cli_overrides)
//! instead.

use clap::Args;

use crate::error::ConfigError;
use crate::syntax::{Assignment, parse_assignment};

/// Clap-derived override flags.
///
/// Flatten this into your app's clap derive:
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     overrides: OverrideArgs,
/// }
/// ```
#[derive(Debug, Clone, Default, Args)]
pub struct OverrideArgs {
    /// Override a configuration option, e.g. `-o cmake.build_type=Debug`
    /// or `-o 'cmake.args+=["-G", "Ninja"]'`. May be repeated.
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

impl OverrideArgs {
    /// Parse every flag, in the order given on the command line.
    pub fn into_assignments(self) -> Result<Vec<Assignment>, ConfigError> {
        self.overrides
            .iter()
            .map(|text| parse_assignment(text))
            .collect()
    }
}
