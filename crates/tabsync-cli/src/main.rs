use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tabsync_core::{ConfigError, Diagnostic, Outcome, SchemaModel, Severity, SyncReport};
use tabsync_engine::{schema_statements, ReconciliationPlan, Synchronizer};
use tabsync_store::SqliteExecutor;

mod csv_io;

/// tabsync - Configuration-driven reconciliation of two tabular snapshots
#[derive(Parser)]
#[command(name = "tabsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration document (.json or .toml)
    #[arg(short, long, global = true, default_value = "tabsync.json")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile provided data against current data
    Run {
        /// CSV file with the provided snapshot
        #[arg(long)]
        provided: PathBuf,

        /// CSV file with the current snapshot
        #[arg(long)]
        current: PathBuf,

        /// CSV file receiving the classified rows
        #[arg(short, long, default_value = "sync_result.csv")]
        output: PathBuf,

        /// SQLite database file (in-memory when omitted)
        #[arg(long)]
        database: Option<PathBuf>,

        /// Output file for the run report
        #[arg(short, long, default_value = "sync-report.json")]
        report: PathBuf,
    },

    /// Validate the configuration document
    Validate,

    /// Print the statements a run would issue
    Sql,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            provided,
            current,
            output,
            database,
            report,
        } => run_command(
            &cli.config,
            &provided,
            &current,
            &output,
            database.as_deref(),
            &report,
        ),
        Commands::Validate => validate_command(&cli.config, cli.verbose),
        Commands::Sql => sql_command(&cli.config),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load the model, or print the validation failure and exit 1
fn load_model(config: &Path) -> Result<SchemaModel> {
    match SchemaModel::from_file(config) {
        Ok(model) => Ok(model),
        Err(ConfigError::Invalid(err)) => {
            print_diagnostic(&Diagnostic::from(&err));
            std::process::exit(1);
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", config.display())),
    }
}

/// Run command - filter, load, reconcile and export
fn run_command(
    config: &Path,
    provided: &Path,
    current: &Path,
    output: &Path,
    database: Option<&Path>,
    report_path: &Path,
) -> Result<()> {
    let model = load_model(config)?;

    let provided_rows = csv_io::read_records(provided, &model.csv.provided, model.provided())?;
    let current_rows = csv_io::read_records(current, &model.csv.current, model.current())?;

    let store = match database {
        Some(path) => SqliteExecutor::open(path)?,
        None => SqliteExecutor::open_in_memory()?,
    };

    let report = match Synchronizer::new(&model, &store).run(provided_rows, current_rows) {
        Ok(run) => {
            let columns = model.result().export_columns();
            csv_io::write_records(output, &model.csv.output, &columns, &run.results)?;
            eprintln!("{} {}", "Results written to:".green(), output.display());
            run.report
        }
        Err(e) => {
            let mut report = SyncReport::new(&model.digest);
            report.add_diagnostic(e.to_diagnostic());
            report
        }
    };

    report.save_to_file(report_path)?;
    eprintln!("{} {}", "Report saved to:".green(), report_path.display());

    print_report_summary(&report);

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Validate command - check the configuration document
fn validate_command(config: &Path, verbose: bool) -> Result<()> {
    let model = load_model(config)?;

    if verbose {
        for table in model.tables() {
            println!(
                "  {} {} ({} columns, keys: {})",
                "table".cyan(),
                table.name.bold(),
                table.columns.len(),
                model.key_columns(&table.name).join(", ")
            );
        }
        println!(
            "  {} {} output fields, {} comparison columns",
            "mapping".cyan(),
            model.output_fields.len(),
            model.comparison_columns.len()
        );
    }

    println!("{} {}", "✓ Configuration is valid:".green().bold(), config.display());
    println!("  digest: {}", model.digest);
    Ok(())
}

/// Sql command - print DDL and the reconciliation plan
fn sql_command(config: &Path) -> Result<()> {
    let model = load_model(config)?;

    println!("-- schema");
    for statement in schema_statements(&model) {
        println!("{}\n", statement);
    }

    let plan = ReconciliationPlan::build(&model);
    println!("BEGIN;\n");
    for phase in &plan.phases {
        println!("-- {}", phase.outcome);
        println!("{}\n", phase.sql);
    }
    println!("COMMIT;\n");

    println!("-- duplicate result keys");
    println!("{}", plan.duplicate_check);
    Ok(())
}

fn print_diagnostic(diag: &Diagnostic) {
    let severity_str = match diag.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    };

    eprintln!("  [{}] {}: {}", severity_str, diag.code, diag.message);
    if let Some(section) = &diag.section {
        eprintln!("    at {}", section);
    }
    for sample in &diag.samples {
        eprintln!("    - {}", sample);
    }
}

fn print_report_summary(report: &SyncReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Sync Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    let summary = &report.summary;
    println!("{}", "Outcomes:".bold());
    for outcome in Outcome::ALL {
        let count = summary.count(outcome).to_string();
        let count = match outcome {
            Outcome::Add => count.green(),
            Outcome::Update => count.yellow(),
            Outcome::Delete => count.red(),
            Outcome::Keep => count.normal(),
        };
        let label = format!("{}:", outcome);
        if outcome == Outcome::Keep && summary.forced_kept > 0 {
            println!("  {:<7} {} ({} from filtered rows)", label, count, summary.forced_kept);
        } else {
            println!("  {:<7} {}", label, count);
        }
    }
    println!();

    for stats in &report.filters {
        if stats.excluded > 0 {
            println!(
                "  {} {}: {} of {} rows excluded ({}%)",
                "filter".cyan(),
                stats.table,
                stats.excluded,
                stats.total,
                stats.exclusion_rate_percent
            );
        }
    }

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            print_diagnostic(diag);
        }
    }
}
