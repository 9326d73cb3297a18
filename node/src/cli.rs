//! # CLI Interface
//!
//! Defines the command-line argument structure for `zkbalance-node` using
//! `clap` derive. Supports three subcommands: `run`, `keygen`, and `version`.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use zkbalance_protocol::config::{DEFAULT_HTTP_PORT, DEFAULT_METRICS_PORT};

/// Zero-knowledge balance threshold node.
///
/// Stores private balances, issues Groth16 proofs that a balance meets a
/// public threshold, and verifies such proofs over HTTP. Exposes Prometheus
/// metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "zkbalance-node",
    about = "Zero-knowledge balance threshold node",
    version,
    propagate_version = true
)]
pub struct ZkBalanceCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP service.
    Run(RunArgs),
    /// Run the trusted setup ahead of time and persist the key pair.
    Keygen(KeygenArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Address the HTTP API listens on.
    #[arg(
        long,
        short = 'l',
        env = "ZKBALANCE_LISTEN",
        default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT))
    )]
    pub listen: SocketAddr,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "ZKBALANCE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Directory holding the persisted key pair.
    ///
    /// When omitted, keys live in memory only and every proof issued by
    /// this process stops verifying once it exits.
    #[arg(long, short = 'd', env = "ZKBALANCE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "ZKBALANCE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "ZKBALANCE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Directory to persist the key pair in. Created if missing.
    #[arg(long, short = 'd', env = "ZKBALANCE_DATA_DIR", default_value = "./zkbalance-data")]
    pub data_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        ZkBalanceCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = ZkBalanceCli::try_parse_from(["zkbalance-node", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.listen.port(), DEFAULT_HTTP_PORT);
                assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
                assert_eq!(args.log_format, "pretty");
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn keygen_takes_data_dir() {
        let cli =
            ZkBalanceCli::try_parse_from(["zkbalance-node", "keygen", "--data-dir", "/tmp/keys"])
                .unwrap();
        match cli.command {
            Commands::Keygen(args) => assert_eq!(args.data_dir, PathBuf::from("/tmp/keys")),
            other => panic!("expected keygen, got {:?}", other),
        }
    }
}
