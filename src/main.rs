use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use renal_formula_calculator::{
    config::CalculatorConfig,
    io::{self, JsonFormat, SessionReader, SessionWriter},
    models::{FormulaCategory, FormulaEntry, ReferenceTable, Session},
    visualization::{
        format_written_summary, print_entry_list, print_subtype_table, print_summary_table,
    },
    Calculator,
};

#[derive(Parser)]
#[command(
    name = "formula-calc",
    about = "Renal Formula Calculator - nutrient totals for custom enteral formulas",
    version,
    author
)]
struct Cli {
    /// Config file (defaults to formula-calc.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Nutrient reference table (.csv or .json)
    #[arg(short, long, global = true)]
    reference: Option<PathBuf>,

    /// Working session file
    #[arg(short, long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session with one empty formula
    Init {
        /// Free water in mL
        #[arg(short, long, default_value = "0")]
        water: f64,

        /// Overwrite an existing session file
        #[arg(long)]
        force: bool,
    },

    /// Append an empty formula slot
    Add,

    /// Remove the most recently added formula
    Remove,

    /// Save a formula into a slot
    Set {
        /// Formula number, starting at 1
        #[arg(short, long)]
        formula: usize,

        /// Category: milk, liquid-pediatric, powder, additive (or f1..f4)
        #[arg(short, long)]
        category: FormulaCategory,

        /// Product key from the reference table
        #[arg(short = 't', long)]
        subtype: String,

        /// Volume in mL (milk and liquid pediatric)
        #[arg(long)]
        ml: Option<f64>,

        /// Mass in g (powder and additives)
        #[arg(long)]
        g: Option<f64>,
    },

    /// Set the free water volume
    Water {
        /// Free water in mL
        #[arg(long)]
        ml: f64,
    },

    /// Show the nutrient summary
    Summary {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Also print the raw entry list
        #[arg(long)]
        written: bool,
    },

    /// List the products available for each category
    Subtypes {
        /// Only list products of this category
        #[arg(short, long)]
        category: Option<FormulaCategory>,
    },

    /// Export the session in the exchange format
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a base64 data URI instead of JSON
        #[arg(long, conflicts_with = "output")]
        data_uri: bool,
    },

    /// Import a session file, replacing unreadable entries with empty ones
    Import {
        /// Session file to import
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Convert a reference table to JSON
    ConvertReference {
        /// Input reference table (.csv or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn init_logging(config: &CalculatorConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_reference(path: Option<&Path>) -> Result<ReferenceTable> {
    let Some(path) = path else {
        bail!("No reference table given. Pass --reference or set reference_table in the config file");
    };
    let table = io::read_reference(path)
        .with_context(|| format!("Failed to load reference table {}", path.display()))?;
    info!(path = %path.display(), products = table.len(), "loaded reference table");
    Ok(table)
}

fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        bail!(
            "No session at {}. Run `formula-calc init` first",
            path.display()
        );
    }
    JsonFormat::default()
        .read_session(path)
        .with_context(|| format!("Failed to read session {}", path.display()))
}

fn save_session(session: &Session, path: &Path, pretty: bool) -> Result<()> {
    JsonFormat { pretty }
        .write_session(session, path)
        .with_context(|| format!("Failed to write session {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CalculatorConfig::discover(cli.config.as_deref())?;
    init_logging(&config);

    let reference_path = cli.reference.or_else(|| config.reference_table.clone());
    let session_path = cli.session.unwrap_or_else(|| config.session.clone());
    let pretty = config.pretty_json;

    match cli.command {
        Commands::Init { water, force } => {
            if session_path.exists() && !force {
                bail!(
                    "{} already exists. Pass --force to start over",
                    session_path.display()
                );
            }
            let session = Session::new().with_water(water)?;
            save_session(&session, &session_path, pretty)?;
            println!(
                "{} New session at {}",
                "Success:".green().bold(),
                session_path.display()
            );
        }

        Commands::Add => {
            let session = load_session(&session_path)?.with_entry_added()?;
            save_session(&session, &session_path, pretty)?;
            print_entry_list(&session);
        }

        Commands::Remove => {
            let session = load_session(&session_path)?;
            if session.plausible_entries() == 1 {
                eprintln!(
                    "{}: the first formula cannot be removed",
                    "Warning".yellow()
                );
            }
            let session = session.with_last_entry_removed();
            save_session(&session, &session_path, pretty)?;
            print_entry_list(&session);
        }

        Commands::Set {
            formula,
            category,
            subtype,
            ml,
            g,
        } => {
            if formula == 0 {
                bail!("Formula numbers start at 1");
            }
            let table = load_reference(reference_path.as_deref())?;
            let session = load_session(&session_path)?;
            let entry = FormulaEntry {
                category: Some(category),
                subtype,
                volume_ml: ml.unwrap_or_default(),
                mass_g: g.unwrap_or_default(),
            };
            let session = Calculator::new(&table).save_entry(&session, formula - 1, entry)?;
            save_session(&session, &session_path, pretty)?;
            print_entry_list(&session);
        }

        Commands::Water { ml } => {
            let session = load_session(&session_path)?.with_water(ml)?;
            save_session(&session, &session_path, pretty)?;
            println!(
                "{} Free water set to {ml} mL",
                "Success:".green().bold()
            );
        }

        Commands::Summary { json, written } => {
            let table = load_reference(reference_path.as_deref())?;
            let session = load_session(&session_path)?;
            let summary = Calculator::new(&table).summarize(&session)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_entry_list(&session);
                print_summary_table(&summary);
            }
            if written {
                print!("{}", format_written_summary(&session)?);
            }
        }

        Commands::Subtypes { category } => {
            let table = load_reference(reference_path.as_deref())?;
            print_subtype_table(&table, category);
        }

        Commands::Export { output, data_uri } => {
            let session = load_session(&session_path)?;
            if data_uri {
                println!("{}", io::session_to_data_uri(&session)?);
            } else if let Some(output) = output {
                save_session(&session, &output, pretty)?;
                println!(
                    "{} Exported {} -> {}",
                    "Success:".green().bold(),
                    session_path.display(),
                    output.display()
                );
            } else {
                println!("{}", io::session_to_json(&session, pretty)?);
            }
        }

        Commands::Import { input } => {
            let table = load_reference(reference_path.as_deref())?;
            let data = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let restored = io::restore_session_from_bytes(&data, &table)?;
            for issue in &restored.issues {
                eprintln!("{}: {issue}", "Warning".yellow());
            }
            save_session(&restored.session, &session_path, pretty)?;
            println!(
                "{} Imported {} formulas from {}",
                "Success:".green().bold(),
                restored.session.plausible_entries(),
                input.display()
            );
            print_entry_list(&restored.session);
        }

        Commands::ConvertReference {
            input,
            output,
            pretty,
        } => {
            let table = load_reference(Some(input.as_path()))?;
            io::write_reference_json(&table, &output, pretty)?;
            println!(
                "{} Converted {} -> {}",
                "Success:".green().bold(),
                input.display(),
                output.display()
            );
        }
    }

    Ok(())
}
