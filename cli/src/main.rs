mod args;

use anyhow::Context;
use automation_core::{run_automation, AutomationClient, RunOptions};
use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use args::{Args, Command};

fn main() {
    let args = Args::parse();
    init_logging(&args);

    match execute(&args) {
        Ok(output) => {
            println!("{output}");
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn execute(args: &Args) -> anyhow::Result<String> {
    let client = AutomationClient::new(args.client_config()).context("invalid configuration")?;
    let command = args.command.clone().unwrap_or_default();
    debug!(
        base_url = client.config().base_url(),
        cache = client.config().cache.enabled,
        "client ready"
    );
    info!(?command, "dispatching command");

    let value = match command {
        Command::Run { days, with_samples } => {
            let options = RunOptions {
                days,
                include_samples: with_samples,
            };
            let today = chrono::Local::now().date_naive();
            let report = run_automation(&client, today, &options);
            info!(
                steps = report.steps.len(),
                success = report.is_success(),
                "automation finished"
            );
            if report.aborted.is_some() {
                anyhow::bail!("{report}");
            }
            return Ok(report.to_string());
        }
        Command::Stats => client.try_get_user_stats(),
        Command::Patients => client.try_get_patients(),
        Command::Patient { id } => client.try_get_patient_by_id(&id),
        Command::PatientSessions { id } => client.try_get_sessions_by_patient(&id),
        Command::Sessions {
            start,
            end,
            patient,
        } => client.try_get_sessions(start.as_deref(), end.as_deref(), patient.as_deref()),
        Command::Financial { start, end } => {
            client.try_get_financial_info(start.as_deref(), end.as_deref())
        }
        Command::CreatePatient { json } => client.try_create_patient(&parse_object(&json)?),
        Command::CreateSession { json } => client.try_create_session(&parse_object(&json)?),
        Command::Ping => client.try_ping(),
    }
    .context("automation API request failed")?;

    Ok(serde_json::to_string_pretty(&value)?)
}

fn parse_object(raw: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(raw).context("payload is not valid JSON")?;
    anyhow::ensure!(value.is_object(), "payload must be a JSON object");
    Ok(value)
}
