use std::time::Duration;

use automation_core::config::{
    DEFAULT_BASE_URL, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT,
};
use automation_core::runner::DEFAULT_DAYS;
use automation_core::{CacheConfig, ClientConfig};
use clap::{Parser, Subcommand};

pub const DEMO_USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

#[derive(Parser, Debug)]
#[command(author, version, about = "Query a practice's automation API", long_about = None)]
pub struct Args {
    /// Base URL of the service; `/automation-api` is appended.
    #[arg(long, env = "AUTOMATION_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// User whose records are read.
    #[arg(long, env = "AUTOMATION_USER_ID", default_value = DEMO_USER_ID)]
    pub user_id: String,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Cache GET responses in memory for the lifetime of the command.
    #[arg(long)]
    pub cache: bool,

    #[arg(long, default_value_t = DEFAULT_CACHE_TTL.as_secs())]
    pub cache_ttl_secs: u64,

    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_ENTRIES)]
    pub cache_max_entries: usize,

    /// Increase log verbosity (-v, -vv, -vvv). Ignored when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the full automation sequence and print a report (default).
    Run {
        /// Look-back window for sessions and financial data.
        #[arg(long, default_value_t = DEFAULT_DAYS)]
        days: u64,
        /// Also create a sample patient and session.
        #[arg(long)]
        with_samples: bool,
    },
    /// User statistics.
    Stats,
    /// All patients.
    Patients,
    /// One patient.
    Patient { id: String },
    /// Sessions of one patient.
    PatientSessions { id: String },
    /// Sessions, optionally filtered.
    Sessions {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        patient: Option<String>,
    },
    /// Financial summary, optionally for a date range.
    Financial {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Create a patient from a JSON object.
    CreatePatient { json: String },
    /// Schedule a session from a JSON object.
    CreateSession { json: String },
    /// Check that the service answers.
    Ping,
}

impl Default for Command {
    fn default() -> Self {
        Command::Run {
            days: DEFAULT_DAYS,
            with_samples: false,
        }
    }
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url, &self.user_id)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_cache(CacheConfig {
                enabled: self.cache,
                ttl: Duration::from_secs(self.cache_ttl_secs),
                max_entries: self.cache_max_entries,
            })
    }

    /// Log filter for the `-v` count.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug,ureq=info",
            _ => "trace",
        }
    }
}
