use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::error::FetchError;
use crate::models::ProjectedRecord;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub records: usize,
    pub requests: u32,
    pub pages: u32,
    pub rate_limit_waits: Vec<Duration>,
    pub by_status: BTreeMap<&'static str, usize>,
}

impl RunSummary {
    pub fn new(
        records: &[ProjectedRecord],
        requests: u32,
        pages: u32,
        rate_limit_waits: Vec<Duration>,
    ) -> Self {
        let mut by_status = BTreeMap::new();
        for record in records {
            *by_status.entry(record.status.as_str()).or_insert(0) += 1;
        }

        Self {
            records: records.len(),
            requests,
            pages,
            rate_limit_waits,
            by_status,
        }
    }
}

pub fn render_json(records: &[ProjectedRecord]) -> Result<String, serde_json::Error> {
    let mut output = serde_json::to_string_pretty(records)?;
    output.push('\n');
    Ok(output)
}

/// Write the export next to its final location, then rename it into place.
pub fn write_export(path: &Path, records: &[ProjectedRecord]) -> Result<(), FetchError> {
    let output_error = |source: io::Error| FetchError::Output {
        path: path.to_path_buf(),
        source,
    };

    let contents = render_json(records).map_err(|err| output_error(io::Error::other(err)))?;

    let file_name = path.file_name().ok_or_else(|| {
        output_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output path has no file name",
        ))
    })?;
    let staging = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&staging, contents).map_err(output_error)?;
    if let Err(err) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(output_error(err));
    }

    Ok(())
}

pub fn render_summary(summary: &RunSummary, out: &Path) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Exported {} records to {}.",
        summary.records,
        out.display()
    );
    let _ = writeln!(
        output,
        "{} requests across {} pages.",
        summary.requests, summary.pages
    );

    if summary.rate_limit_waits.is_empty() {
        let _ = writeln!(output, "No rate limiting encountered.");
    } else {
        let waited: Duration = summary.rate_limit_waits.iter().sum();
        let _ = writeln!(
            output,
            "Rate limited {} times (server asked for {:.1}s in total).",
            summary.rate_limit_waits.len(),
            waited.as_secs_f64()
        );
    }

    for (status, count) in summary.by_status.iter() {
        let _ = writeln!(output, "- {status}: {count}");
    }

    output
}
