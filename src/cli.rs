//! topolay CLI definition
//!
//! Usage: topolay <COMMAND>
//!
//! Commands:
//!   layout    Compute a layout and materialize the TOSCA documents
//!   validate  Check a deployment model without producing output

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::FlattenMode;

/// topolay - deployment-topology layout pipeline
#[derive(Parser, Debug)]
#[command(name = "topolay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Machine-readable JSON result summary
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a layout and materialize the TOSCA documents
    Layout {
        /// Path to the deployment model YAML
        #[arg(short, long)]
        model: PathBuf,

        /// Output repository root
        #[arg(short, long, default_value = "out")]
        out: PathBuf,

        /// Layout engine resolution in dots per inch
        #[arg(long, default_value_t = 72.0)]
        dpi: f64,

        /// Rank flattening mode
        #[arg(long, value_enum, default_value_t = FlattenMode::None)]
        flatten: FlattenMode,

        /// Target canvas width in pixels
        #[arg(long, default_value_t = 1920)]
        width: u32,

        /// Target canvas height in pixels
        #[arg(long, default_value_t = 1080)]
        height: u32,

        /// Layout engine timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Check a deployment model without producing output
    Validate {
        /// Path to the deployment model YAML
        #[arg(short, long)]
        model: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_layout_defaults() {
        let cli = Cli::try_parse_from(["topolay", "layout", "--model", "m.yaml"]).unwrap();
        match cli.command {
            Commands::Layout {
                model,
                out,
                dpi,
                flatten,
                width,
                height,
                timeout,
            } => {
                assert_eq!(model, PathBuf::from("m.yaml"));
                assert_eq!(out, PathBuf::from("out"));
                assert_eq!(dpi, 72.0);
                assert_eq!(flatten, FlattenMode::None);
                assert_eq!(width, 1920);
                assert_eq!(height, 1080);
                assert_eq!(timeout, 30);
            }
            _ => panic!("expected layout command"),
        }
    }

    #[test]
    fn test_cli_parses_flatten_mode() {
        let cli = Cli::try_parse_from([
            "topolay", "layout", "--model", "m.yaml", "--flatten", "partial",
        ])
        .unwrap();
        match cli.command {
            Commands::Layout { flatten, .. } => assert_eq!(flatten, FlattenMode::Partial),
            _ => panic!("expected layout command"),
        }
    }

    #[test]
    fn test_cli_parses_validate() {
        let cli = Cli::try_parse_from(["topolay", "--json", "validate", "--model", "m.yaml"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Validate { .. }));
    }

    #[test]
    fn test_cli_requires_model() {
        assert!(Cli::try_parse_from(["topolay", "layout"]).is_err());
    }
}
