// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the training loss to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:     elapsed epochs (1, 2, 3, ...)
//   - loss:      mean loss over the epoch's steps
//   - best_loss: lowest epoch loss seen so far
//   - improved:  whether this epoch set a new best
//
// Example CSV output:
//   epoch,loss,best_loss,improved
//   1,6.912345,6.912345,true
//   2,6.401200,6.401200,true
//   3,6.455000,6.401200,false
//
// The `improved` column is the signal early stopping counts
// against its patience.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,loss,best_loss,improved";

/// One row of metrics for a single epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:     usize,
    pub loss:      f64,
    pub best_loss: f64,
    pub improved:  bool,
}

impl EpochMetrics {
    /// Build the row for `epoch` given the best loss before it.
    pub fn record(epoch: usize, loss: f64, previous_best: f64) -> Self {
        let improved = loss < previous_best;
        Self {
            epoch,
            loss,
            best_loss: if improved { loss } else { previous_best },
            improved,
        }
    }
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open (or create) the CSV at `path`.
    /// The header is only written when the file is new, so a
    /// resumed run keeps appending to the same log.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let csv_path = path.as_ref().to_path_buf();

        if let Some(parent) = csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6},{:.6},{}", m.epoch, m.loss, m.best_loss, m.improved)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_tracks_best() {
        let first = EpochMetrics::record(1, 3.0, f64::INFINITY);
        assert!(first.improved);
        assert_eq!(first.best_loss, 3.0);

        let worse = EpochMetrics::record(2, 3.5, first.best_loss);
        assert!(!worse.improved);
        assert_eq!(worse.best_loss, 3.0);

        // Equal loss is not an improvement
        let same = EpochMetrics::record(3, 3.0, 3.0);
        assert!(!same.improved);
    }

    #[test]
    fn test_log_appends_rows_under_one_header() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("logs").join("metrics.csv");

        let logger = MetricsLogger::new(&path).unwrap();
        logger.log(&EpochMetrics::record(1, 2.0, f64::INFINITY)).unwrap();

        // Reopening keeps the existing rows
        let logger = MetricsLogger::new(&path).unwrap();
        logger.log(&EpochMetrics::record(2, 2.5, 2.0)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            HEADER,
            "1,2.000000,2.000000,true",
            "2,2.500000,2.000000,false",
        ]);
    }
}
