//! Metamodel CLI
//!
//! Command-line interface for:
//! - Validating `.dom` modules (introspection + metamodel validation)
//! - Describing the specifications built for their classes
//! - Issuing bookmarks for domain objects

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use metamodel_core::{Bookmark, IntrospectionConfig, MetaModelError, SpecificationLoader};

mod describe;

#[derive(Parser)]
#[command(name = "metamodel")]
#[command(author, version, about = "Metamodel: facet-based introspection of domain classes")]
struct Cli {
    /// Log introspection progress (`-v` debug, `-vv` trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Introspect every class of a `.dom` module and report validation failures.
    Validate {
        /// Input `.dom` module
        input: PathBuf,
        /// Introspection settings (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Describe the specifications of a `.dom` module.
    Describe {
        /// Input `.dom` module
        input: PathBuf,
        /// Only describe this class
        #[arg(long = "type")]
        type_name: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
        /// Introspection settings (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the bookmark of an instance of a class and resolve it back.
    Bookmark {
        /// Input `.dom` module
        input: PathBuf,
        /// Class of the instance
        #[arg(long = "type")]
        type_name: String,
        /// Identifier of the instance
        #[arg(long)]
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { input, config } => cmd_validate(&input, config.as_deref()),
        Commands::Describe {
            input,
            type_name,
            json,
            config,
        } => cmd_describe(&input, type_name.as_deref(), json, config.as_deref()),
        Commands::Bookmark {
            input,
            type_name,
            id,
        } => cmd_bookmark(&input, &type_name, &id),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(input: &Path, config: Option<&Path>) -> Result<SpecificationLoader> {
    let config = match config {
        Some(path) => IntrospectionConfig::load(path)?,
        None => IntrospectionConfig::default(),
    };
    let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    SpecificationLoader::from_dom(&text, config)
        .with_context(|| format!("loading {}", input.display()))
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_validate(input: &Path, config: Option<&Path>) -> Result<()> {
    println!("{} {}", "Validating".green().bold(), input.display());
    let loader = load(input, config)?;

    match loader.create_meta_model() {
        Ok(()) => {
            println!(
                "{} {} specifications",
                "Valid.".green(),
                loader.snapshot_specifications().len()
            );
            Ok(())
        }
        Err(MetaModelError::Validation(failures)) => {
            for failure in failures.iter() {
                println!(
                    "  {} {} {}",
                    format!("[{}]", failure.kind.name()).red(),
                    failure.origin.bold(),
                    failure.message
                );
            }
            Err(anyhow!("{} validation failure(s)", failures.len()))
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_describe(
    input: &Path,
    type_name: Option<&str>,
    json: bool,
    config: Option<&Path>,
) -> Result<()> {
    let loader = load(input, config)?;
    let specs = match type_name {
        Some(name) => vec![loader.spec_for_type_or_err(name)?],
        None => {
            loader.create_meta_model()?;
            loader.snapshot_specifications()
        }
    };

    if json {
        let described: Vec<_> = specs.iter().map(|s| describe::to_json(s)).collect();
        println!("{}", serde_json::to_string_pretty(&described)?);
    } else {
        for spec in &specs {
            describe::print_text(spec);
        }
    }
    Ok(())
}

fn cmd_bookmark(input: &Path, type_name: &str, id: &str) -> Result<()> {
    let loader = load(input, None)?;
    let spec = loader.spec_for_type_or_err(type_name)?;
    if spec.is_abstract() {
        return Err(anyhow!("`{type_name}` is abstract; its instances have no bookmark"));
    }

    let bookmark = Bookmark::new(spec.logical_type_name(), id);
    let parsed: Bookmark = bookmark.to_string().parse()?;
    let resolved = loader
        .spec_for_logical_type_name(parsed.logical_type_name())?
        .ok_or_else(|| anyhow!("no specification for {}", parsed.logical_type_name()))?;

    println!("{bookmark}");
    tracing::debug!(bookmark = %bookmark, resolved = %resolved.type_name(), "bookmark resolved");
    Ok(())
}
