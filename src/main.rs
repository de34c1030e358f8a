//! factcheck: fact-check claims with two LLM vendors and review files with an LLM

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use factcheck::config::{default_config_json, load_config, CliOverrides, CONFIG_FILENAME};
use factcheck::factcheck::FactChecker;
use factcheck::llm::{init_client, Vendor};
use factcheck::reporter::{ConsoleReporter, JsonReporter};
use factcheck::review::{ReviewOptions, ReviewPipeline, RunOutcome};
use factcheck::{server, Constraint, FactCheckRequest};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Fact-check claims against Gemini and Perplexity, or let an LLM review a directory
#[derive(Parser, Debug)]
#[command(name = "factcheck")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: search .factcheckrc.json in current dir and parents)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask each vendor whether a claim is true
    Check {
        /// The statement to fact-check
        claim: String,

        /// Answer format: only_true, only_false, verdict_and_short_reason
        #[arg(long, short, default_value = "verdict_and_short_reason")]
        constraint: Constraint,

        /// Ask a single vendor (gemini, perplexity) instead of both
        #[arg(long)]
        vendor: Option<Vendor>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send every eligible file under a directory to the LLM and write back its edit
    Review {
        /// Directory to review (default: config root, then current directory)
        path: Option<PathBuf>,

        /// Vendor to use (default: config reviewVendor, then gemini)
        #[arg(long)]
        vendor: Option<Vendor>,

        /// Write replies that are not a single fenced code block verbatim
        #[arg(long)]
        allow_fallback: bool,

        /// Ask the LLM but do not back up or write any file
        #[arg(long)]
        dry_run: bool,

        /// Output the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve the JSON fact-check endpoint (POST /api/check)
    Serve {
        /// Address to bind (default: config server.host, then 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (default: config server.port, then 5000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create .factcheckrc.json with sensible defaults
    Init {
        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    // Credentials may live in a .env file next to the project
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    match args.command {
        Commands::Check {
            claim,
            constraint,
            vendor,
            json,
        } => {
            let config = load_config(&cwd, args.config.as_deref())?;
            let vendors = match vendor {
                Some(vendor) => vec![vendor],
                None => Vendor::ALL.to_vec(),
            };
            let checker = FactChecker::from_config(&config, &vendors)?;
            let comparison = checker.check(&FactCheckRequest::new(claim, constraint))?;

            if json {
                println!("{}", JsonReporter::new().pretty().report_comparison(&comparison));
            } else {
                let mut reporter = ConsoleReporter::new();
                if args.verbose {
                    reporter = reporter.verbose();
                }
                reporter.report_comparison(&comparison);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Review {
            path,
            vendor,
            allow_fallback,
            dry_run,
            json,
        } => {
            let config = load_config(&cwd, args.config.as_deref())?.merge_with_cli(CliOverrides {
                root: path,
                review_vendor: vendor,
                fallback_writes: allow_fallback.then_some(true),
                ..CliOverrides::default()
            });

            let root = config.root.clone().unwrap_or_else(|| PathBuf::from("."));
            let vendor = config.review_vendor();
            let options = ReviewOptions::from_config(&config)?.dry_run(dry_run);

            let client = init_client(vendor, config.vendors.get(vendor))?;
            let pipeline = ReviewPipeline::new(client.as_ref(), options);
            let outcome = pipeline.run(&root)?;

            if json {
                println!("{}", JsonReporter::new().pretty().report_review(&outcome));
            } else if !args.quiet {
                let mut reporter = ConsoleReporter::new();
                if args.verbose {
                    reporter = reporter.verbose();
                }
                reporter.report_review(&outcome);
            }

            match outcome {
                RunOutcome::Completed(summary) if summary.failed() > 0 => Ok(ExitCode::from(1)),
                _ => Ok(ExitCode::SUCCESS),
            }
        }
        Commands::Serve { host, port } => {
            let config = load_config(&cwd, args.config.as_deref())?.merge_with_cli(CliOverrides {
                host,
                port,
                ..CliOverrides::default()
            });
            let checker = FactChecker::from_config(&config, &Vendor::ALL)?;
            server::serve(&config.server.bind_addr(), checker)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { dir } => run_init(dir.as_deref().unwrap_or(&cwd)),
    }
}

fn run_init(dir: &Path) -> Result<ExitCode> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    std::fs::write(&config_path, default_config_json()).with_context(|| {
        format!("Failed to write config to {}", config_path.display())
    })?;

    println!("{}: Created {}", "Info".blue(), config_path.display());
    println!("  Set GEMINI_API_KEY and SONET_API_KEY in the environment or a .env file.");
    Ok(ExitCode::SUCCESS)
}
