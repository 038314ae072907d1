//! # layerfig demo application
//!
//! Resolves the `[tool.demo]` section of a `pyproject.toml` and prints the
//! result as JSON. It exists to exercise layerfig by hand.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example layerfig_demo -- path/to/project
//! cargo run --example layerfig_demo -- . -o cmake.build_type=Debug -o 'cmake.args+=["-Wdev"]'
//! cargo run --example layerfig_demo -- . --local pyproject.local.toml
//! ```
//!
//! ## Layers
//!
//! | Layer                       | Source                                            |
//! |-----------------------------|---------------------------------------------------|
//! | Project file                | `<dir>/pyproject.toml`                            |
//! | Local override document     | `--local FILE`, merged into `tool.demo`           |
//! | Cross override document     | `--cross FILE`, merged into `tool.demo.cross`     |
//! | Override file               | `--overrides FILE`, one assignment per line       |
//! | CLI overrides               | `-o KEY=VALUE`, highest priority                  |
//! | Environment                 | the process environment, captured once            |

mod schema;

use std::path::{Path, PathBuf};

use clap::Parser;

use layerfig::{ConfPath, OverrideArgs, Resolver};

/// layerfig demo: resolve a project's configuration.
#[derive(Parser, Debug)]
#[command(name = "layerfig-demo")]
struct Cli {
    /// Project directory containing pyproject.toml.
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Local override document, merged into tool.demo.
    #[arg(long)]
    local: Option<PathBuf>,

    /// Cross-compilation document, merged into tool.demo.cross.
    #[arg(long)]
    cross: Option<PathBuf>,

    /// File of override assignments.
    #[arg(long)]
    overrides: Option<PathBuf>,

    #[command(flatten)]
    cli: OverrideArgs,
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()).into())
}

fn read_toml(path: &Path) -> Result<toml::Table, Box<dyn std::error::Error>> {
    Ok(read(path)?.parse::<toml::Table>()?)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema::schema();
    let project = read_toml(&cli.project.join("pyproject.toml"))?;

    let mut builder = Resolver::builder(&schema)
        .document(schema::DOCUMENT, project)
        .cross_inheritance(schema::cross())
        .cli_target(schema::TOOL)
        .process_env();
    if let Some(local) = &cli.local {
        let name = local.display().to_string();
        builder = builder.override_document(name, read_toml(local)?, schema::TOOL);
    }
    if let Some(cross) = &cli.cross {
        let target = ConfPath::parse(schema::TOOL).child("cross");
        builder = builder.override_document(cross.display().to_string(), read_toml(cross)?, target);
    }
    if let Some(overrides) = &cli.overrides {
        let name = overrides.display().to_string();
        builder = builder.override_file(name, read(overrides)?, schema::TOOL);
    }
    for assignment in cli.cli.into_assignments()? {
        builder = builder.assignment(assignment);
    }

    let resolved = builder.resolve()?;
    let json = resolved.to_json(schema::DOCUMENT).unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&json["tool"]["demo"])?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    run(cli).unwrap_or_else(|e| {
        eprintln!("Failed to resolve configuration:\n{e}");
        std::process::exit(1);
    });
}
