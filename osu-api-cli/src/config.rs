//! Command-line arguments and environment configuration
//!
//! Every client setting can come from a flag or an `OSU_API_` environment
//! variable. Precedence:
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Defaults
//!
//! ```bash
//! export OSU_API_KEY=0123456789abcdef
//! export OSU_API_AUDIT_LOG=calls.log
//! osu-api user peppy --mode 1
//! osu-api --rate 30 best 2 --id --limit 5
//! ```

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use osu_api::{ClientConfig, GameMode, Verbosity};
use std::path::PathBuf;
use std::time::Duration;

/// Settings resolved from arguments and environment
#[derive(Debug, Clone)]
pub struct Config {
    pub key: String,
    pub client: ClientConfig,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
    pub command: Command,
}

#[derive(Parser, Debug)]
#[command(
    name = "osu-api",
    about = "Rate-limited osu! API v1 client",
    long_about = "Query the osu! API v1 without exceeding its rate limit.\n\nEnvironment variables with the OSU_API_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    #[arg(long, value_name = "KEY", help = "API key", env = "OSU_API_KEY")]
    pub key: Option<String>,
    #[arg(
        long,
        value_name = "PATH",
        help = "Read the API key from a file",
        env = "OSU_API_KEY_FILE"
    )]
    pub key_file: Option<PathBuf>,

    // Client
    #[arg(
        long,
        value_name = "N",
        help = "Calls allowed in any rolling minute",
        default_value_t = 60,
        allow_negative_numbers = true,
        env = "OSU_API_RATE"
    )]
    pub rate: i64,
    #[arg(
        long,
        value_name = "SECS",
        help = "How often a waiting call re-checks a full gate (seconds)",
        default_value_t = 1.0,
        env = "OSU_API_POLL_INTERVAL"
    )]
    pub poll_interval: f64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Per-request timeout (seconds)",
        default_value_t = 30.0,
        env = "OSU_API_TIMEOUT"
    )]
    pub timeout: f64,
    #[arg(
        long,
        value_name = "PATH",
        help = "Append an audit row per call to this file",
        env = "OSU_API_AUDIT_LOG"
    )]
    pub audit_log: Option<PathBuf>,
    #[arg(
        long,
        value_name = "URL",
        help = "API root",
        default_value = osu_api::config::DEFAULT_BASE_URL,
        env = "OSU_API_BASE_URL"
    )]
    pub base_url: String,

    // Logging
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Which client diagnostics to emit: quiet, normal, verbose",
        default_value = "normal",
        env = "OSU_API_VERBOSITY"
    )]
    pub verbosity: Verbosity,
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "OSU_API_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show a user profile
    User {
        user: String,
        #[arg(long, short, default_value = "0", help = "Game mode 0-3")]
        mode: GameMode,
        #[arg(long, help = "Treat USER as a numeric id")]
        id: bool,
        #[arg(long, value_name = "DAYS", help = "Days of events to include (1-31)")]
        event_days: Option<u32>,
    },
    /// Look up beatmaps
    Beatmaps {
        #[arg(long, value_name = "YYYY-MM-DD")]
        since: Option<NaiveDate>,
        #[arg(long, value_name = "ID", help = "Beatmap set id")]
        set: Option<u64>,
        #[arg(long, value_name = "ID")]
        beatmap: Option<u64>,
        #[arg(long, help = "Mapper name")]
        user: Option<String>,
        #[arg(long, short)]
        mode: Option<GameMode>,
        #[arg(long, help = "Include converted beatmaps")]
        converted: bool,
        #[arg(long, value_name = "MD5")]
        hash: Option<String>,
        #[arg(long, default_value_t = 500)]
        limit: u32,
    },
    /// Top scores on a beatmap
    Scores {
        beatmap: u64,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, short, default_value = "0")]
        mode: GameMode,
        #[arg(long, help = "Mods bitmask")]
        mods: Option<u32>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Best performance scores of a user
    Best {
        user: String,
        #[arg(long, short, default_value = "0")]
        mode: GameMode,
        #[arg(long)]
        id: bool,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Plays of a user in the last 24 hours
    Recent {
        user: String,
        #[arg(long, short, default_value = "0")]
        mode: GameMode,
        #[arg(long)]
        id: bool,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Fetch a replay
    Replay {
        beatmap: u64,
        user: String,
        #[arg(long, short, default_value = "0")]
        mode: GameMode,
        #[arg(long)]
        id: bool,
        #[arg(long)]
        mods: Option<u32>,
    },
    /// Call any endpoint and print the JSON body
    Raw {
        endpoint: String,
        /// Query parameters as NAME=VALUE
        params: Vec<String>,
    },
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is given, the key file cannot be read,
    /// no command is given or a duration is negative.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    fn from_args(args: Args) -> Result<Self> {
        let key = match (args.key, &args.key_file) {
            (Some(key), _) => key,
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("cannot read key file {}", path.display()))?
                .trim()
                .to_string(),
            (None, None) => {
                return Err(anyhow!(
                    "No API key given.\n\n\
                    Pass --key <KEY>, --key-file <PATH>, or set OSU_API_KEY.\n\n\
                    For more information, try '--help'"
                ));
            }
        };

        let command = args
            .command
            .ok_or_else(|| anyhow!("No command given. For more information, try '--help'"))?;

        let client = ClientConfig {
            rate_per_minute: args.rate,
            poll_interval: seconds("poll-interval", args.poll_interval)?,
            audit_log: args.audit_log,
            verbosity: args.verbosity,
            base_url: args.base_url,
            request_timeout: seconds("timeout", args.timeout)?,
        };

        Ok(Config {
            key,
            client,
            log_level: args.log_level,
            command,
        })
    }

    fn print_env_vars() {
        println!("osu-api Environment Variables");
        println!("=============================");
        println!();
        println!("All environment variables use the OSU_API_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("Credentials:");
        println!("  OSU_API_KEY=<key>                 API key");
        println!("  OSU_API_KEY_FILE=<path>           File holding the API key");
        println!();

        println!("Client Configuration:");
        println!("  OSU_API_RATE=<n>                  Calls per rolling minute [default: 60]");
        println!(
            "  OSU_API_POLL_INTERVAL=<secs>      Gate re-check interval in seconds [default: 1]"
        );
        println!("  OSU_API_TIMEOUT=<secs>            Per-request timeout [default: 30]");
        println!("  OSU_API_AUDIT_LOG=<path>          Audit log file [default: disabled]");
        println!(
            "  OSU_API_BASE_URL=<url>            API root [default: {}]",
            osu_api::config::DEFAULT_BASE_URL
        );
        println!();

        println!("Logging:");
        println!(
            "  OSU_API_VERBOSITY=<level>         Client diagnostics: quiet, normal, verbose [default: normal]"
        );
        println!(
            "  OSU_API_LOG_LEVEL=<level>         Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  export OSU_API_KEY_FILE=testingKey.txt");
        println!("  export OSU_API_AUDIT_LOG=calls.log");
        println!("  osu-api user peppy");
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid --{name}: {secs}"))
}
