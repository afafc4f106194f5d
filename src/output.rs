//! Output formatting and persistence for analysis results.
//!
//! Supports pretty-printing, JSON serialization, and delimited tables.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::describe::ShareRow;
use crate::expand::Grouping;
use crate::models::DisplaySettings;
use crate::records::OrderRecord;
use crate::report::AnalysisReport;

/// Logs the report using Rust's debug pretty-print format.
pub fn print_pretty(report: &AnalysisReport) {
    debug!("{:#?}", report);
}

/// Logs each share row as one structured event.
pub fn print_shares(rows: &[ShareRow]) {
    for row in rows {
        info!(
            hotel = %row.hotel,
            intervention = %row.intervention,
            orders = row.orders,
            vegetarian = row.vegetarian,
            share = %format!("{:.3}", row.share),
            ci = %format!("[{:.3}, {:.3}]", row.ci_lower, row.ci_upper),
            "Vegetarian share"
        );
    }
}

/// Serializes `rows` to a delimited file with a header row, replacing any existing file.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T], delimiter: u8) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_rows(file, rows, delimiter)?;
    debug!(path = %path.display(), rows = rows.len(), "Table written");
    Ok(())
}

fn write_rows<W: Write, T: Serialize>(sink: W, rows: &[T], delimiter: u8) -> Result<W> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_writer(sink);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing table: {}", e.error()))
}

/// Writes the expanded order records, gzip-compressed when `gzip` is set.
pub fn write_orders(path: &Path, orders: &[OrderRecord], delimiter: u8, gzip: bool) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    if gzip {
        let encoder = write_rows(
            GzEncoder::new(file, Compression::default()),
            orders,
            delimiter,
        )?;
        encoder.finish()?;
    } else {
        write_rows(file, orders, delimiter)?;
    }
    info!(path = %path.display(), orders = orders.len(), gzip, "Orders written");
    Ok(())
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Writes the coefficient tables, the share table and `report.json` into `dir`.
///
/// Returns the paths written.
pub fn write_report(
    dir: &Path,
    report: &AnalysisReport,
    display: &DisplaySettings,
    delimiter: u8,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for (grouping, file_name) in [
        (Grouping::Grouped, "model1_coefficients.csv"),
        (Grouping::Ungrouped, "model2_coefficients.csv"),
    ] {
        let Some(model) = report.model(grouping) else {
            continue;
        };
        let rows: Vec<_> = model.rows.iter().map(|r| r.to_display(display)).collect();
        let path = dir.join(file_name);
        write_table(&path, &rows, delimiter)?;
        written.push(path);
    }

    let path = dir.join("vegetarian_shares.csv");
    write_table(&path, &report.shares, delimiter)?;
    written.push(path);

    let path = dir.join("report.json");
    write_json(&path, report)?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "Report written");
    Ok(written)
}
