use std::fs;
use std::io;

use apptrack::config::AppConfig;
use apptrack::connectors::{GmailMailbox, GmailSession, OpenAiOracle};
use apptrack::error::AppError;
use apptrack::orchestrator::TrackerRun;
use apptrack::telemetry;
use apptrack::tracking::{AnswerParser, ReconciliationEngine, RecordStore, StatusHistory};
use chrono::Local;
use tokio::runtime::Runtime;
use tracing::info;

use crate::cli::{ClassifyArgs, RecordsArgs, SyncArgs};
use crate::exporter::MetricsExporter;
use crate::render::{records_table, summary_text, ClassificationView};

pub(crate) fn run_sync(mut args: SyncArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(store) = args.store.take() {
        config.store.path = store;
    }
    if let Some(history) = args.history.take() {
        config.store.history_path = Some(history);
    }
    if let Some(metrics) = args.metrics.take() {
        config.store.metrics_path = Some(metrics);
    }
    if let Some(days) = args.days {
        config.mailbox.window_days = days;
    }

    telemetry::init(&config.telemetry)?;
    let exporter = config
        .store
        .metrics_path
        .clone()
        .map(MetricsExporter::install)
        .transpose()?;

    let engine = ReconciliationEngine::new(OpenAiOracle::new(&config.oracle)?);
    let runtime = Runtime::new()?;
    let session = GmailSession::authenticate(&runtime, &config.mailbox)?;
    let mailbox = GmailMailbox::new(session, runtime);
    let history = config.store.history_path.clone().map(StatusHistory::new);

    info!(
        environment = ?config.environment,
        store = %config.store.path.display(),
        window_days = config.mailbox.window_days,
        "starting application sync"
    );

    let mut run = TrackerRun::new(&mailbox, &engine);
    if let Some(history) = history.as_ref() {
        run = run.with_history(history);
    }
    let result = run.execute(&config.store.path, &config.mailbox.query());

    if let Some(exporter) = exporter.as_ref() {
        exporter.write()?;
    }

    let summary = result?;
    print!("{}", summary_text(&config.store.path, &summary));
    Ok(())
}

pub(crate) fn run_records(args: RecordsArgs) -> Result<(), AppError> {
    let path = match args.store {
        Some(path) => path,
        None => AppConfig::load()?.store.path,
    };

    let store = RecordStore::load(path)?;
    let records = store
        .records()
        .iter()
        .filter(|record| args.status.map_or(true, |status| record.status == status));
    print!("{}", records_table(records));
    Ok(())
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let (event, parse_error) = match (args.answer, args.body_file) {
        (Some(answer), _) => AnswerParser::parse_or_fallback(&answer, Local::now().naive_local()),
        (None, body_file) => {
            let path = body_file.ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "classify needs --answer or --body-file")
            })?;
            let config = AppConfig::load()?;
            telemetry::init(&config.telemetry)?;
            let body = fs::read_to_string(path)?;
            let engine = ReconciliationEngine::new(OpenAiOracle::new(&config.oracle)?);
            engine.classify(&body)?
        }
    };

    let view = ClassificationView::new(&event, parse_error.as_ref());
    let rendered = serde_json::to_string_pretty(&view).map_err(io::Error::from)?;
    println!("{rendered}");
    Ok(())
}
