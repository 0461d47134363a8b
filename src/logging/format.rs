//! JSON log lines: one JSON object per line (ndjson) for ingestion and audit.

use crate::error::RecordError;
use crate::features::{BatchReport, PipelineStage, Rejection};
use serde::Serialize;
use std::io::{self, Write};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Audit line for a record dropped from a run.
#[derive(Serialize)]
pub struct RejectionEvent<'a> {
    pub ts: String,
    pub level: &'a str,
    pub message: &'a str,
    pub run_id: String,
    pub row: usize,
    pub stage: PipelineStage,
    pub kind: &'a str,
    pub error: &'a RecordError,
}

impl<'a> RejectionEvent<'a> {
    pub fn new(report: &BatchReport, rejection: &'a Rejection) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            level: "WARN",
            message: "record rejected",
            run_id: report.run_id.to_string(),
            row: rejection.row,
            stage: rejection.stage,
            kind: rejection.error.kind(),
            error: &rejection.error,
        }
    }
}

/// Initialize tracing with JSON format (one JSON object per line)
pub struct StructuredLogger;

impl StructuredLogger {
    /// Install global subscriber: JSON lines to stderr, level from RUST_LOG or default.
    pub fn init(json: bool, default_level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        if json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    /// Emit a single structured log line without going through tracing
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> io::Result<()> {
        let line = serde_json::to_string(event).map_err(io::Error::from)?;
        writeln!(w, "{}", line)
    }

    /// One ndjson line per rejected record of the run. Stops at the first
    /// failed write.
    pub fn emit_rejections(report: &BatchReport, w: &mut impl Write) -> io::Result<()> {
        for rejection in &report.rejected {
            Self::emit_json(&RejectionEvent::new(report, rejection), w)?;
        }
        w.flush()
    }
}
