//! SlotKV - An In-Memory Keyspace Core
//!
//! This is the interactive entry point. It reads one command per line from
//! stdin, executes it against a single owned keyspace and prints the reply.
//! Active expiry cycles run between commands.

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use slotkv::config::{DEFAULT_MAX_STRING_LEN, DEFAULT_NUM_SLOTS};
use slotkv::{ActiveExpiry, CommandHandler, ExpiryConfig, KeyspaceConfig};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
/// In-memory keyspace with slots, TTLs and compact integer values
struct Args {
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_NUM_SLOTS)]
    /// number of slots keys are partitioned into
    slots: usize,

    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_STRING_LEN)]
    /// longest string APPEND/PREPEND may produce
    max_string_len: usize,

    #[arg(long, value_name = "MS", default_value_t = 100)]
    /// initial delay between active expiry cycles
    sweep_interval_ms: u64,

    #[arg(long, value_name = "COUNT", default_value_t = 1000)]
    /// maximum number of keys removed per expiry cycle
    sweep_keys: usize,

    #[arg(short, long, action = clap::ArgAction::Count)]
    /// sets the level of verbosity (-v debug, -vv trace)
    verbose: u8,
}

impl Args {
    fn keyspace_config(&self) -> KeyspaceConfig {
        KeyspaceConfig {
            num_slots: self.slots,
            max_string_len: self.max_string_len,
        }
    }

    fn expiry_config(&self) -> ExpiryConfig {
        let defaults = ExpiryConfig::default();
        let base_interval = Duration::from_millis(self.sweep_interval_ms.max(1));
        ExpiryConfig {
            base_interval,
            min_interval: defaults.min_interval.min(base_interval),
            max_interval: defaults.max_interval.max(base_interval),
            keys_per_cycle: self.sweep_keys,
            ..defaults
        }
    }

    fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Splits a command line on whitespace into owned arguments.
fn split_args(line: &str) -> Vec<Bytes> {
    line.split_whitespace()
        .map(|arg| Bytes::copy_from_slice(arg.as_bytes()))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so replies on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = args.keyspace_config();
    config.validate().context("invalid keyspace configuration")?;

    let mut handler = CommandHandler::new(config);
    let mut expiry = ActiveExpiry::new(args.expiry_config());
    info!(
        version = slotkv::VERSION,
        slots = args.slots,
        max_string_len = args.max_string_len,
        "Keyspace initialized"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let next_cycle = sleep(expiry.interval());
    tokio::pin!(next_cycle);

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    info!("End of input, shutting down");
                    break;
                };

                let command = split_args(&line);
                if command.is_empty() {
                    continue;
                }
                if command[0].eq_ignore_ascii_case(b"QUIT") {
                    break;
                }

                let reply = handler.execute(&command);
                stdout.write_all(format!("{}\n", reply).as_bytes()).await?;
                stdout.flush().await?;
            }
            _ = &mut next_cycle => {
                let delay = expiry.run_cycle(handler.keyspace_mut());
                next_cycle.as_mut().reset(Instant::now() + delay);
            }
            result = &mut shutdown => {
                result.context("failed to listen for Ctrl+C")?;
                info!("Shutdown signal received");
                break;
            }
        }
    }

    debug!(stats = ?handler.keyspace().stats(), "Final counters");
    info!(keys = handler.dbsize(), "Shutdown complete");
    Ok(())
}
