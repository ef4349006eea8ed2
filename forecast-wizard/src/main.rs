//! forecast-wizard - command-line driver for the forecast job wizard
//!
//! Lists datasets and jobs, runs the wizard non-interactively, or follows an
//! existing job until it finishes. Ctrl+C stops polling cleanly.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use forecast_common::api::{job_duration, JobStatus};
use forecast_common::config::{self, ClientSettings, SettingsResolver};
use forecast_common::events::{EventBus, ForecastEvent};
use forecast_common::time::format_elapsed;
use forecast_wizard::models::{JobHandle, ModelType};
use forecast_wizard::services::{
    ForecastApi, ForecastResults, HttpForecastClient, JobPoller, ResultsFetcher,
};
use forecast_wizard::{ForecastSession, WizardError};
use serde_json::Value;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for forecast-wizard
#[derive(Parser, Debug)]
#[command(name = "forecast-wizard")]
#[command(about = "Submit and follow time-series forecast jobs")]
#[command(version)]
struct Args {
    /// TOML config file (default: ~/.config/forecast-wizard/config.toml)
    #[arg(long, env = "FORECAST_WIZARD_CONFIG")]
    config: Option<PathBuf>,

    /// Forecast backend base URL
    #[arg(long)]
    api_base_url: Option<String>,

    /// Job status poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the backend's datasets
    Datasets,

    /// List pending and finished jobs
    Jobs,

    /// Run the wizard: pick a dataset and model, submit, follow the job
    Run {
        /// Dataset id
        #[arg(long)]
        dataset: String,

        /// Training method id
        #[arg(long, default_value = "bqml_arimaplus")]
        model: ModelType,

        /// Model parameter override, KEY=VALUE (VALUE is JSON or plain text)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        model_values: Vec<(String, Value)>,

        /// Prediction parameter override, KEY=VALUE
        #[arg(long = "predict", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        prediction_values: Vec<(String, Value)>,
    },

    /// Follow an existing job until it finishes
    Watch {
        /// Job id returned at submission
        job_id: String,
    },
}

/// `key=value`, where value is parsed as JSON when possible
fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {:?}", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; the config file may raise or lower the level below
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let toml_config = config::load_or_default(args.config.as_deref());
    let settings = SettingsResolver::new(toml_config)
        .with_cli_api_base_url(args.api_base_url.clone())
        .with_cli_poll_interval_ms(args.poll_interval_ms)
        .resolve()
        .context("Invalid configuration")?;

    if std::env::var("RUST_LOG").is_err() {
        let level = EnvFilter::try_new(&settings.log_level)
            .with_context(|| format!("Invalid log level {:?}", settings.log_level))?;
        filter_handle.reload(level)?;
    }

    info!(
        api_base_url = %settings.api_base_url,
        poll_interval_ms = settings.poll_interval.as_millis() as u64,
        "forecast-wizard {}",
        env!("CARGO_PKG_VERSION")
    );

    let api: Arc<dyn ForecastApi> =
        Arc::new(HttpForecastClient::new(&settings).context("Failed to create HTTP client")?);

    match args.command {
        Command::Datasets => list_datasets(api.as_ref()).await,
        Command::Jobs => list_jobs(api.as_ref()).await,
        Command::Run {
            dataset,
            model,
            model_values,
            prediction_values,
        } => run_wizard(api, &settings, &dataset, model, model_values, prediction_values).await,
        Command::Watch { job_id } => watch_job(api, &settings, job_id).await,
    }
}

async fn list_datasets(api: &dyn ForecastApi) -> Result<()> {
    let datasets = api.list_datasets().await.context("Failed to list datasets")?;
    if datasets.is_empty() {
        println!("No datasets available");
    }
    for dataset in datasets {
        println!(
            "{:<12} {:<28} {} - {}  [{}]",
            dataset.id,
            dataset.display_name,
            dataset.start_date,
            dataset.end_date,
            dataset.columns.join(", ")
        );
    }
    Ok(())
}

async fn list_jobs(api: &dyn ForecastApi) -> Result<()> {
    let jobs = api.list_jobs().await.context("Failed to list jobs")?;
    if jobs.is_empty() {
        println!("No jobs");
    }
    for job in jobs {
        let status = match JobStatus::from_record(&job) {
            Ok(status) => status.to_string(),
            Err(e) => format!("unreadable ({})", e),
        };
        let method = job
            .request
            .training_method_name
            .as_deref()
            .unwrap_or(&job.request.training_method_id);
        let duration = job_duration(&job)
            .map(format_elapsed)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<30} {:<20} {:>8}  {}",
            job.id(),
            method,
            job.request.dataset.display_name,
            duration,
            status
        );
    }
    Ok(())
}

async fn run_wizard(
    api: Arc<dyn ForecastApi>,
    settings: &ClientSettings,
    dataset_id: &str,
    model: ModelType,
    model_values: Vec<(String, Value)>,
    prediction_values: Vec<(String, Value)>,
) -> Result<()> {
    let event_bus = EventBus::default();
    let reporter = tokio::spawn(report_events(event_bus.subscribe()));
    let mut session = ForecastSession::new(api, settings.poll_interval, event_bus);

    // Dataset step
    session
        .select_dataset_by_id(dataset_id)
        .await
        .with_context(|| format!("Failed to select dataset {}", dataset_id))?;
    advance(&mut session)?;

    // Model step
    let sequencer = session.sequencer_mut();
    sequencer.select_model_type(model)?;
    for (key, value) in model_values {
        sequencer.form_mut().set_model_value(key, value);
    }
    for (key, value) in prediction_values {
        sequencer.form_mut().set_prediction_value(key, value);
    }
    advance(&mut session)?;

    // Results step
    let handle = session.complete().await?;
    println!("Submitted job {}", handle);

    let waited = tokio::select! {
        result = session.wait_for_job() => Some(result),
        _ = signal::ctrl_c() => None,
    };

    let outcome = match waited {
        Some(result) => {
            let (status, _) = result?;
            finish(status, session.fetch_results().await).await
        }
        None => {
            session.teardown().await;
            println!("Stopped following job {}", handle);
            Ok(())
        }
    };

    drop(session);
    reporter.abort();
    outcome
}

async fn watch_job(api: Arc<dyn ForecastApi>, settings: &ClientSettings, job_id: String) -> Result<()> {
    let event_bus = EventBus::default();
    let reporter = tokio::spawn(report_events(event_bus.subscribe()));
    let handle = JobHandle::new(job_id);
    let poller = JobPoller::new(Arc::clone(&api), settings.poll_interval, event_bus);
    let mut active = poller.start(&handle);

    let finished = tokio::select! {
        _ = active.wait() => true,
        _ = signal::ctrl_c() => false,
    };

    let outcome = if finished {
        let status = active.snapshot().status;
        let results = ResultsFetcher::new(api).fetch(&handle, &status).await;
        finish(status, results).await
    } else {
        active.stop().await;
        println!("Stopped following job {}", handle);
        Ok(())
    };

    reporter.abort();
    outcome
}

fn advance(session: &mut ForecastSession) -> Result<()> {
    match session.sequencer_mut().advance() {
        Ok(transition) => {
            debug!(new_index = transition.new_index, "Advanced");
            Ok(())
        }
        Err(WizardError::Validation(errors)) => bail!("{}", errors.status_message()),
        Err(e) => Err(e.into()),
    }
}

/// Print the outcome of a finished job
async fn finish(
    status: JobStatus,
    results: Result<ForecastResults, WizardError>,
) -> Result<()> {
    match status {
        JobStatus::Completed { end_time } => {
            println!("Job completed at {}", end_time.to_rfc3339());
            let results = results.context("Failed to load results")?;
            print_results(&results);
            Ok(())
        }
        JobStatus::Failed { error_message } => Err(anyhow!("Job failed: {}", error_message)),
        JobStatus::Pending => Err(anyhow!("Polling ended before the job finished")),
    }
}

fn print_results(results: &ForecastResults) {
    println!();
    println!("Evaluation");
    println!("  {}", results.evaluation.columns.join(" | "));
    for row in &results.evaluation.rows {
        let cells: Vec<String> = results
            .evaluation
            .columns
            .iter()
            .map(|c| match row.get(c) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect();
        println!("  {}", cells.join(" | "));
    }

    println!();
    println!("Prediction ({} points)", results.point_count());
    for line in &results.prediction.lines {
        let range = match (line.x.first(), line.x.last()) {
            (Some(first), Some(last)) => format!("{} .. {}", first, last),
            _ => "empty".to_string(),
        };
        println!("  {:<30} {:>6} points  {}", line.name, line.y.len(), range);
    }
}

/// Print wizard and polling events as they happen
async fn report_events(mut rx: broadcast::Receiver<ForecastEvent>) {
    loop {
        match rx.recv().await {
            Ok(ForecastEvent::ValidationFailed { status_message, .. }) => {
                eprintln!("{}", status_message)
            }
            Ok(ForecastEvent::JobStatusChanged { job_id, status, .. }) => {
                println!("Job {}: {}", job_id, status)
            }
            Ok(ForecastEvent::PollFailed { job_id, message, .. }) => {
                eprintln!("Job {}: poll failed ({}), retrying", job_id, message)
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Event reporter lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
