use clap::{Parser, Subcommand};
use dbassert::config::{self, Config};
use dbassert::keywords::{KeywordLibrary, KeywordOutput};
use dbassert::repl;
use dbassert::script::{self, ScriptReport, StepOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dbassert")]
#[command(about = "Keyword-style database assertions for table-driven tests", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to <config_dir>/dbassert/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset, e.g. "info" or "dbassert=debug"
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a keyword script, stopping at the first failing step
    Run {
        script: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive keyword shell
    Shell,
    /// List the available keywords
    Keywords,
}

fn init_logging(cli: &Cli, config: &Config) {
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.logging.as_ref().and_then(|l| l.level.clone()))
        .unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so reports on stdout stay machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    init_logging(&cli, &config);
    info!("Starting dbassert...");

    let mut library = KeywordLibrary::with_config(&config);
    match &cli.command {
        Commands::Run { script, json } => run(&mut library, script, *json),
        Commands::Shell => match repl::run_repl(&mut library) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "shell terminated");
                eprintln!("{}", e);
                ExitCode::from(2)
            }
        },
        Commands::Keywords => {
            for name in KeywordLibrary::keyword_names() {
                println!("{}", name);
            }
            ExitCode::SUCCESS
        }
    }
}

fn run(library: &mut KeywordLibrary, path: &Path, json: bool) -> ExitCode {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("cannot read {}: {}", path.display(), e);
            return ExitCode::from(2);
        }
    };

    let steps = script::parse_script(&text);
    info!(script = %path.display(), steps = steps.len(), "running script");
    let report = script::run_script(library, &steps);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::from(2);
            }
        }
    } else {
        print_report(&report, steps.len());
    }

    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &ScriptReport, total: usize) {
    for entry in &report.steps {
        match &entry.outcome {
            StepOutcome::Passed {
                output: KeywordOutput::None,
            } => println!("PASS  line {}: {}", entry.step.line, entry.step.keyword),
            StepOutcome::Passed { output } => println!(
                "PASS  line {}: {} => {}",
                entry.step.line, entry.step.keyword, output
            ),
            StepOutcome::Failed { error } => println!(
                "FAIL  line {}: {}: {}",
                entry.step.line, entry.step.keyword, error
            ),
        }
    }

    let passed = report
        .steps
        .iter()
        .filter(|entry| matches!(entry.outcome, StepOutcome::Passed { .. }))
        .count();
    println!(
        "\n{} of {} step(s) passed{}",
        passed,
        total,
        if report.passed() { "" } else { ", stopped at first failure" }
    );
}
