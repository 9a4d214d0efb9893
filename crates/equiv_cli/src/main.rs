use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use equiv_ast::Context;
use equiv_engine::{EngineSettings, EquivalenceConfig, EquivalenceEngine, Region, Verdict};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Decide whether two math expressions are equivalent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check two expressions for equivalence
    Check {
        /// First expression (LaTeX-style markup)
        expr1: String,
        /// Second expression (LaTeX-style markup)
        expr2: String,

        #[command(flatten)]
        options: CheckOptions,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the canonical form of one expression
    Canon {
        expr: String,

        /// Notation profile: standard or continental
        #[arg(long)]
        region: Option<Region>,

        /// Canonicalization pass cap
        #[arg(long, value_name = "N")]
        max_iterations: Option<usize>,

        /// Print the full result, including rule hits, as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the rewrite rules in firing order
    Rules {
        /// Only rules eligible in this region
        #[arg(long)]
        region: Option<Region>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct CheckOptions {
    /// Notation profile: standard or continental
    #[arg(long)]
    region: Option<Region>,

    /// Skip canonicalization and use the symbolic fallback only
    #[arg(long)]
    symbolic_only: bool,

    /// Largest numeric residue still treated as zero
    #[arg(long, value_name = "FLOAT")]
    tolerance: Option<f64>,

    /// Symbolic fallback budget in milliseconds
    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    timeout_ms: Option<i64>,

    /// Canonicalization pass cap
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,

    /// Do not read or write the result cache
    #[arg(long)]
    no_cache: bool,

    /// TOML settings file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl CheckOptions {
    fn settings(&self) -> Result<EngineSettings> {
        let mut settings = match &self.config {
            Some(path) => EngineSettings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => EngineSettings::default(),
        };
        let check = &mut settings.check;
        if let Some(region) = self.region {
            check.region = region;
        }
        if self.symbolic_only {
            check.force_symbolic_only = true;
        }
        if let Some(tolerance) = self.tolerance {
            check.float_tolerance = tolerance;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            check.symbolic_timeout_ms = timeout_ms;
        }
        if let Some(max_iterations) = self.max_iterations {
            check.max_canonicalization_iterations = max_iterations;
        }
        if self.no_cache {
            check.cache_enabled = false;
        }
        Ok(settings)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_verdict(verdict: &Verdict) {
    println!("equivalent: {}", verdict.equivalent);
    println!("method: {}", verdict.method);
    if let Some(form) = &verdict.canonical_form_1 {
        println!("form 1: {}", form);
    }
    if let Some(form) = &verdict.canonical_form_2 {
        println!("form 2: {}", form);
    }
    if let Some(error) = &verdict.error {
        println!("error: {}", error);
    }
    println!("elapsed: {:.2} ms", verdict.elapsed_ms);
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check {
            expr1,
            expr2,
            options,
            json,
        } => {
            let settings = options.settings()?;
            let engine = EquivalenceEngine::builder()
                .cache_ttl(Duration::from_secs(settings.cache.ttl_secs))
                .build()?;
            let verdict = engine.check_equivalence_blocking(&expr1, &expr2, &settings.check)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                print_verdict(&verdict);
            }
        }

        Commands::Canon {
            expr,
            region,
            max_iterations,
            json,
        } => {
            let mut config = EquivalenceConfig::default().with_region(region.unwrap_or_default());
            if let Some(max_iterations) = max_iterations {
                config.max_canonicalization_iterations = max_iterations;
            }
            let engine = EquivalenceEngine::new();
            let mut ctx = Context::new();
            let result = engine.canonicalize_markup(&mut ctx, &expr, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.canonical);
                if !result.converged {
                    eprintln!(
                        "warning: no fixpoint after {} iterations; form is best effort",
                        result.iterations
                    );
                }
            }
        }

        Commands::Rules { region, json } => {
            let rules = EquivalenceEngine::new().describe_rules(region);
            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else {
                for rule in rules {
                    println!(
                        "{:>4}  {:<32} {:<20} {}",
                        rule.priority, rule.name, rule.regions, rule.description
                    );
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    run(Cli::parse())
}
