// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per evaluation to <output_dir>/metrics.csv.
//
//   epoch,step,learning_rate,train_loss,val_loss,accuracy
//   1,120,0.003600,1.052311,1.031877,0.452000
//
// train_loss is the mean over the optimiser steps since the
// previous evaluation, so rows are comparable whatever the
// evaluation cadence.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,step,learning_rate,train_loss,val_loss,accuracy";

/// One evaluation point of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    pub epoch:         usize,
    /// Optimiser steps completed so far
    pub step:          usize,
    pub learning_rate: f64,
    pub train_loss:    f64,
    pub val_loss:      f64,
    /// Fraction of validation examples classified correctly, in [0, 1]
    pub accuracy:      f64,
}

impl EvalRecord {
    fn csv_row(&self) -> String {
        format!(
            "{},{},{:.8},{:.6},{:.6},{:.6}",
            self.epoch, self.step, self.learning_rate, self.train_loss, self.val_loss, self.accuracy,
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh metrics file in `dir`, replacing any previous run's.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, record: &EvalRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", record.csv_row())?;

        tracing::debug!(
            "Logged step {} metrics: val_loss={:.4}, accuracy={:.4}",
            record.step,
            record.val_loss,
            record.accuracy,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
