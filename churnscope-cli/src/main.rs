//! churnscope CLI - churn risk scoring for SaaS billing exports

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use chrono::Utc;
use churnscope_core::config::{self, ResolvedConfig};
use churnscope_core::monitor;
use churnscope_core::report::{export_csv, render_csv};
use churnscope_core::{analyze_source, render_json, render_text, FetchOptions, JsonExportSource};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "churnscope")]
#[command(about = "Score customers for churn risk and recommend retention actions")]
#[command(version = env!("CHURNSCOPE_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every customer in a billing export
    Analyze {
        /// Path to a JSON or JSON Lines export ("-" reads stdin)
        path: PathBuf,

        /// Analyze a single customer
        #[arg(long)]
        customer_id: Option<String>,

        /// Maximum number of customers to analyze (overrides config file)
        #[arg(long)]
        limit: Option<usize>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Also write the results table to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Show each customer's per-rule score contributions (text format)
        #[arg(long)]
        explain: bool,
    },
    /// Re-run the analysis on a schedule and alert on critical customers
    Monitor {
        /// Path to a JSON or JSON Lines export, re-read on every check (stdin is not accepted)
        path: PathBuf,

        /// Hours between checks
        #[arg(long, default_value = "24", value_parser = clap::value_parser!(u32).range(1..))]
        interval: u32,

        /// Run a single check and exit
        #[arg(long)]
        once: bool,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            customer_id,
            limit,
            format,
            export,
            config: config_path,
            explain,
        } => {
            let resolved_config = load_config(config_path.as_deref())?;

            // CLI flags override config file values
            let limit = limit.unwrap_or(resolved_config.limit);
            if limit == 0 {
                anyhow::bail!("--limit must be at least 1");
            }
            let options = FetchOptions { customer_id, limit };

            let source = JsonExportSource::new(path);
            let analysis = match analyze_source(&source, &options, &resolved_config) {
                Ok(analysis) => analysis,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    println!("No customers found");
                    std::process::exit(1);
                }
            };

            match format {
                OutputFormat::Text => print!("{}", render_text(&analysis, explain)),
                OutputFormat::Json => println!("{}", render_json(&analysis)),
                OutputFormat::Csv => print!("{}", render_csv(analysis.report.results())),
            }

            if let Some(export_path) = export {
                if analysis.report.is_no_data() {
                    eprintln!("Nothing to export");
                } else {
                    export_csv(&export_path, analysis.report.results())?;
                    eprintln!("Results exported to {}", export_path.display());
                }
            }
        }
        Commands::Monitor {
            path,
            interval,
            once,
            config: config_path,
        } => {
            if path.as_os_str() == "-" {
                anyhow::bail!(
                    "monitor re-reads the export on every check and cannot read from stdin; pass a file path"
                );
            }
            let resolved_config = load_config(config_path.as_deref())?;
            let options = FetchOptions {
                customer_id: None,
                limit: resolved_config.limit,
            };
            let source = JsonExportSource::new(path);

            if !once {
                println!(
                    "Starting churn monitor (checking every {} hours)",
                    interval
                );
            }

            loop {
                let started = Utc::now();
                // A failed check is reported and the loop keeps going
                match monitor::run_check(&source, &options, &resolved_config, started) {
                    Ok(outcome) => print!("{}", monitor::render_outcome(&outcome)),
                    Err(e) => eprintln!(
                        "[{}] Error: {}",
                        started.format("%Y-%m-%d %H:%M:%S"),
                        e
                    ),
                }

                if once {
                    break;
                }

                let next = monitor::next_check(started, interval);
                log::info!("next churn check at {}", next.to_rfc3339());
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                std::thread::sleep(wait);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let cwd = std::env::current_dir()?;
                match config::load_and_resolve(&cwd, path.as_deref()) {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let cwd = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&cwd, path.as_deref())
                    .context("failed to load configuration")?;
                print!("{}", render_config(&resolved));
            }
        },
    }

    Ok(())
}

/// Load configuration from `--config` or the working directory
fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let cwd = std::env::current_dir()?;
    let resolved =
        config::load_and_resolve(&cwd, config_path).context("failed to load configuration")?;

    if let Some(path) = &resolved.config_path {
        eprintln!("Using config: {}", path.display());
    }
    Ok(resolved)
}

fn render_config(resolved: &ResolvedConfig) -> String {
    let w = &resolved.weights;
    let t = &resolved.thresholds;
    let mut output = String::from("Configuration:\n");

    match &resolved.config_path {
        Some(p) => output.push_str(&format!("  Source: {}\n", p.display())),
        None => output.push_str("  Source: defaults (no config file found)\n"),
    }

    output.push_str("\nWeights:\n");
    for (name, value) in [
        ("canceled", w.canceled),
        ("unpaid", w.unpaid),
        ("past_due", w.past_due),
        ("no_subscription", w.no_subscription),
        ("trialing", w.trialing),
        ("cancel_at_period_end", w.cancel_at_period_end),
        ("failure_rate", w.failure_rate),
        ("renewal_soon", w.renewal_soon),
        ("renewal_overdue", w.renewal_overdue),
        ("no_payment_method", w.no_payment_method),
        ("new_customer", w.new_customer),
    ] {
        output.push_str(&format!("  {}: {}\n", name, value));
    }

    output.push_str("\nThresholds:\n");
    output.push_str(&format!("  medium: {}\n", t.medium));
    output.push_str(&format!("  high: {}\n", t.high));
    output.push_str(&format!("  critical: {}\n", t.critical));

    output.push_str(&format!("\nLimit: {}\n", resolved.limit));
    output
}
