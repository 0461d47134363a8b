//! fraud-enrich entrypoint: one batch run from CSV inputs to enriched CSV output.
//! The range table is loaded and indexed first; an invalid table stops the run
//! before any record is read.

use fraud_enrich::{
    config::EnrichConfig,
    features::{EnrichmentPipeline, IntervalIndex},
    ingest,
    logging::StructuredLogger,
    transform,
};
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("FRAUD_ENRICH_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = EnrichConfig::try_load(&config_path)?;

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(ranges = ?config.input.ranges_path, "loading range table");
    let ranges = ingest::read_ranges(&config.input.ranges_path)?;
    let index = Arc::new(IntervalIndex::build(ranges)?);
    info!(ranges = index.len(), "interval index ready");

    let raw = ingest::read_records(&config.input.transactions_path)?;
    info!(count = raw.len(), "loaded transactions");

    let pipeline = EnrichmentPipeline::new(
        config.pipeline.clone(),
        config.columns.clone(),
        Arc::clone(&index),
    )
    .with_required_fields(config.encoding.source_columns());
    let output = pipeline.run(raw)?;

    let stderr = std::io::stderr();
    StructuredLogger::emit_rejections(&output.report, &mut stderr.lock())?;

    if let Some(parent) = config.output.records_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    ingest::write_records(&config.output.records_path, &output.records)?;
    info!(
        path = ?config.output.records_path,
        rows = output.records.len(),
        "enriched records written"
    );

    if let Some(matrix_path) = &config.output.matrix_path {
        let matrix = transform::encode_and_scale(&output.records, &config.encoding);
        matrix.write_csv(matrix_path)?;
        info!(path = ?matrix_path, columns = matrix.columns.len(), "feature matrix written");
    }

    info!(run_id = %output.report.run_id, "fraud-enrich run complete");
    Ok(())
}
