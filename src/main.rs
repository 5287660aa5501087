//! topolay CLI entry point

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use topolay::cli::{Cli, Commands};
use topolay::config::LayoutConfig;
use topolay::error::TopolayError;
use topolay::ingest;
use topolay::layout::GraphvizEngine;
use topolay::pipeline::Pipeline;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(cli.json, &err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Layout {
            model,
            out,
            dpi,
            flatten,
            width,
            height,
            timeout,
        } => {
            let graph = ingest::load_model(model)?;
            let config = LayoutConfig {
                dpi: *dpi,
                flatten: *flatten,
                width_px: *width,
                height_px: *height,
            };
            let engine = GraphvizEngine::with_timeout(Duration::from_secs(*timeout));
            let outcome = Pipeline::new(&engine).run(&graph, &config, out)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!(
                    "Wrote {} documents for process {}",
                    outcome.files.len(),
                    outcome.process_id
                );
                for file in &outcome.files {
                    println!("  {}", file.display());
                }
            }
        }
        Commands::Validate { model } => {
            let graph = ingest::load_model(model)?;
            graph.validate()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "ok",
                        "components": graph.components.len(),
                        "relations": graph.relations.len(),
                    })
                );
            } else {
                println!(
                    "Model is valid: {} components, {} relations",
                    graph.components.len(),
                    graph.relations.len()
                );
            }
        }
    }
    Ok(())
}

/// Report a single summarized failure (kind + message) at the task boundary.
fn report_failure(json: bool, err: &anyhow::Error) {
    let kind = err
        .downcast_ref::<TopolayError>()
        .map(TopolayError::kind)
        .unwrap_or("internal");
    if json {
        eprintln!(
            "{}",
            serde_json::json!({
                "status": "failed",
                "kind": kind,
                "message": err.to_string(),
            })
        );
    } else {
        eprintln!("error[{kind}]: {err}");
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("topolay={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
