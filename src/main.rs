use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use intervention_plan::config::Config;
use intervention_plan::form::RecordField;
use intervention_plan::grid::{self, Grid};
use intervention_plan::loader::{self, LoadOutcome, ObjectiveSource};
use intervention_plan::models::{normalize, CellValue, StudentRecord, Tier, Trimester};
use intervention_plan::session::{Session, DEFAULT_SESSION_FILE};
use intervention_plan::{export, logo, preview};

#[derive(Parser)]
#[command(name = "intervention-plan")]
#[command(
    about = "Personalized intervention plans for the speech and language classroom",
    long_about = None
)]
struct Cli {
    /// Session file holding the student data and the tracking grid
    #[arg(long, global = true, env = "PLAN_SESSION", default_value = DEFAULT_SESSION_FILE)]
    session: PathBuf,

    /// Layout and paths config (default: plan.toml when present)
    #[arg(long, global = true, env = "PLAN_CONFIG")]
    config: Option<PathBuf>,

    /// Log progress at info level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session from an objectives CSV (first column is used)
    Init {
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Defaults to the current and next year, e.g. 2024-2025
        #[arg(long)]
        academic_year: Option<String>,
        /// Replace an existing session
        #[arg(long)]
        force: bool,
    },
    /// Set a student data field
    Set {
        #[arg(value_enum)]
        field: RecordField,
        value: String,
    },
    /// Mark or annotate one tracking cell (an empty value clears it)
    Mark {
        /// Objective number as listed by `show`, starting at 1
        row: usize,
        #[arg(value_enum)]
        tier: Tier,
        #[arg(value_enum)]
        trimester: Trimester,
        #[arg(default_value = "X")]
        value: String,
    },
    /// Append an objective
    AddRow { objective: String },
    /// Remove an objective and its marks
    RemoveRow { row: usize },
    /// Rename an objective
    Rename { row: usize, objective: String },
    /// Print the student data and the tracking grid
    Show,
    /// Write the colored HTML preview of the tracking table
    Preview {
        #[arg(long, default_value = "preview.html")]
        out: PathBuf,
    },
    /// Generate the Word document
    Generate {
        /// PNG or JPEG logo (default: the bundled logo)
        #[arg(long)]
        logo: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn row_index(row: usize) -> anyhow::Result<usize> {
    row.checked_sub(1)
        .context("objectives are numbered from 1")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init {
            csv,
            academic_year,
            force,
        } => {
            if cli.session.exists() && !force {
                bail!(
                    "session {} already exists (use --force to replace it)",
                    cli.session.display()
                );
            }
            let outcome = loader::load_objectives(
                csv.as_deref(),
                &config.paths.example_csv,
                config.loader.objective_column.as_deref(),
            )?;

            match outcome {
                LoadOutcome::Objectives { source, objectives } => {
                    if source == ObjectiveSource::Missing {
                        eprintln!("No objectives CSV found. Upload one with --csv or add rows.");
                    }
                    let mut record = StudentRecord::today();
                    if let Some(year) = academic_year {
                        record.academic_year = year;
                    }
                    let session = Session::new(record, Grid::build(&objectives));
                    session.save(&cli.session)?;
                    println!(
                        "Session {} created with {} objectives from {}.",
                        cli.session.display(),
                        objectives.len(),
                        source
                    );
                }
                LoadOutcome::Unrecognized { headers, preview } => {
                    let column = config.loader.objective_column.unwrap_or_default();
                    eprintln!("Column '{column}' not found; no session was created.");
                    println!("{}", headers.join(" | "));
                    for row in preview {
                        println!("{}", row.join(" | "));
                    }
                }
            }
        }
        Commands::Set { field, value } => {
            let mut session = Session::load(&cli.session)?;
            field.apply(&mut session.record, &value)?;
            session.save(&cli.session)?;
            println!("Updated {}.", field_name(field));
        }
        Commands::Mark {
            row,
            tier,
            trimester,
            value,
        } => {
            let mut session = Session::load(&cli.session)?;
            session
                .grid
                .set_cell(row_index(row)?, tier, trimester, &value)?;
            session.save(&cli.session)?;
            let shown = normalize(&value);
            if shown.is_empty() {
                println!("Cleared {} {} for objective {row}.", tier.label(), trimester.label());
            } else {
                println!(
                    "Set {} {} for objective {row} to {shown}.",
                    tier.label(),
                    trimester.label()
                );
            }
        }
        Commands::AddRow { objective } => {
            let mut session = Session::load(&cli.session)?;
            session.grid.push_row(&objective);
            session.save(&cli.session)?;
            println!("Added objective {}.", session.grid.len());
        }
        Commands::RemoveRow { row } => {
            let mut session = Session::load(&cli.session)?;
            let removed = session.grid.remove_row(row_index(row)?)?;
            session.save(&cli.session)?;
            println!("Removed objective {row}: {}.", removed.objective);
        }
        Commands::Rename { row, objective } => {
            let mut session = Session::load(&cli.session)?;
            session.grid.rename_objective(row_index(row)?, &objective)?;
            session.save(&cli.session)?;
            println!("Renamed objective {row}.");
        }
        Commands::Show => {
            let session = Session::load(&cli.session)?;
            print_session(&session, &config);
        }
        Commands::Preview { out } => {
            let session = Session::load(&cli.session)?;
            let title = export::title(&session.record.academic_year);
            let html = preview::render_page(&title, &session.grid, &config.layout.tier_colors);
            std::fs::write(&out, html)
                .with_context(|| format!("failed to write preview {}", out.display()))?;
            println!("Preview written to {}.", out.display());
        }
        Commands::Generate {
            logo: logo_path,
            out_dir,
        } => {
            let session = Session::load(&cli.session)?;
            let logo = logo::load_logo(logo_path.as_deref(), &config.paths.default_logo);
            let out_dir = out_dir.unwrap_or_else(|| config.paths.output_dir.clone());
            let path = export::export(
                &session.record,
                &session.grid,
                &config.layout,
                logo,
                &out_dir,
            )?;
            println!("Document written to {}.", path.display());
        }
    }

    Ok(())
}

fn field_name(field: RecordField) -> String {
    field
        .to_possible_value()
        .map(|value| value.get_name().to_string())
        .unwrap_or_default()
}

fn print_session(session: &Session, config: &Config) {
    let record = &session.record;
    println!("Curso académico: {}", record.academic_year);
    for field in &config.layout.metadata_fields {
        println!("{}: {}", field.label(), field.value(record));
    }
    println!();

    if session.grid.is_empty() {
        println!("No objectives yet.");
        return;
    }
    for (i, row) in session.grid.rows().iter().enumerate() {
        println!("{}. {}", i + 1, row.objective);
        for (tier, trimester) in grid::column_keys() {
            let value = row.value(tier, trimester);
            if value != CellValue::Empty {
                println!("   {} {}: {}", tier.label(), trimester.label(), value.display());
            }
        }
    }
}
