//! # CLI
//!
//! Command-line interface for running collections in CI pipelines:
//! `quiver run collection.yaml --env-file envs.yaml --environment prod`.
//! Renders a text or JSON report and exits 0 only when every request
//! passed, so runs slot directly into CI gates.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::collection::Collection;
use crate::environment::load_environment;
use crate::http::ReqwestClient;
use crate::runner::{run_collection_with, RequestResult, RunOptions};

#[derive(Parser)]
#[command(
    name = "quiver",
    version,
    about = "HTTP collection runner with response chaining and assertions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a collection and report per-request results.
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the collection file (YAML or JSON).
    pub collection: PathBuf,
    /// Path to an environment file (flat map or named environments).
    #[arg(long)]
    pub env_file: Option<PathBuf>,
    /// Named environment to select from the environment file.
    #[arg(long)]
    pub environment: Option<String>,
    /// Base URL override (defaults to the collection's baseUrl).
    #[arg(long)]
    pub base_url: Option<String>,
    /// Extra variable overrides, repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,
    /// Per-request timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Emit the JSON report on stdout instead of text.
    #[arg(long)]
    pub json: bool,
    /// Also write the JSON report to a file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Execute the parsed command and return the process exit code:
/// 0 all requests passed, 1 at least one failed.
pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run(args) => run_command(args).await,
    }
}

async fn run_command(args: RunArgs) -> Result<i32> {
    let collection = Collection::from_path(&args.collection)
        .with_context(|| format!("loading collection `{}`", args.collection.display()))?;

    let mut env = match &args.env_file {
        Some(path) => load_environment(path, args.environment.as_deref())
            .with_context(|| format!("loading environment `{}`", path.display()))?,
        None => HashMap::new(),
    };
    for var in &args.vars {
        let Some((key, value)) = var.split_once('=') else {
            bail!("Invalid --var `{var}`: expected KEY=VALUE");
        };
        env.insert(key.to_string(), value.to_string());
    }

    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| collection.base_url.clone());
    let options = RunOptions { env, base_url };

    let client = match args.timeout_ms {
        Some(ms) => ReqwestClient::with_timeout(Duration::from_millis(ms))?,
        None => ReqwestClient::new(),
    };

    let results = run_collection_with(&collection, &options, &client).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_text_report(&collection.name, &results);
    }
    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&results)?)
            .with_context(|| format!("writing report `{}`", path.display()))?;
    }

    let all_passed = results.iter().all(|result| result.passed);
    Ok(if all_passed { 0 } else { 1 })
}

fn print_text_report(name: &str, results: &[RequestResult]) {
    println!("{name}");

    let mut passed_count = 0;
    for result in results {
        let marker = if result.passed {
            "PASS".green()
        } else {
            "FAIL".red()
        };
        let detail = match (&result.error, &result.response) {
            (Some(error), _) => format!("error: {error}"),
            (None, Some(response)) => format!(
                "{} {} ({} ms, {} bytes)",
                response.status, response.status_text, response.response_time, response.size
            ),
            (None, None) => String::new(),
        };
        println!("  {marker} {}  {}", result.name, detail.as_str().dimmed());

        for assertion in &result.assertions {
            if assertion.passed {
                println!("      {} {}", "✓".green(), assertion.description);
            } else {
                println!(
                    "      {} {} (expected {}, got {})",
                    "✗".red(),
                    assertion.description,
                    assertion.expected,
                    assertion
                        .actual
                        .as_ref()
                        .map(|value| value.to_string())
                        .unwrap_or_else(|| "undefined".to_string())
                );
            }
        }
        if result.passed {
            passed_count += 1;
        }
    }

    let failed = results.len() - passed_count;
    println!();
    if failed == 0 {
        println!("{}", format!("{passed_count} passed").green());
    } else {
        println!("{}", format!("{passed_count} passed, {failed} failed").red());
    }
}
