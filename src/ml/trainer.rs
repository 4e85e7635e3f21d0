// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives any EmbeddingModel over an endless batch stream.
//
// Per epoch:
//   1. pull exactly `steps_per_epoch` batches, one train_step each
//   2. epoch loss = mean of the step losses
//   3. periodic saves (model and/or doc embeddings)
//   4. early-stopping check
//
// Early stopping:
//   An epoch improves only if its loss is strictly below the
//   best loss so far. Each non-improving epoch increments `wait`;
//   training stops once `wait` reaches the patience. A plateau
//   starting after improving epoch E therefore ends at E + patience.
//
// Saving:
//   `{epoch}` in a save path is replaced by the elapsed epoch
//   count. Periodic save failures are logged and collected in
//   History; the final save after the loop propagates its error.
//   Every doc embeddings export, periodic or final, gets its
//   `<path>.docs.json` row index when `doc_sources` is set.
//
// Reference: Kingma & Ba (2015) Adam
//            Keras EarlyStopping callback semantics

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::traits::EmbeddingModel;
use crate::infra::checkpoint::{render_path, save_doc_index};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainOptions {
    pub epochs:          usize,
    pub steps_per_epoch: usize,
    /// `None` disables early stopping
    pub early_stopping_patience: Option<usize>,

    pub save_path:   Option<String>,
    pub save_period: Option<usize>,

    pub save_doc_embeddings_path:   Option<String>,
    pub save_doc_embeddings_period: Option<usize>,

    /// Source name of each document row; empty skips the row index
    #[serde(default)]
    pub doc_sources: Vec<String>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs:                     20,
            steps_per_epoch:            1000,
            early_stopping_patience:    None,
            save_path:                  None,
            save_period:                None,
            save_doc_embeddings_path:   None,
            save_doc_embeddings_period: None,
            doc_sources:                Vec::new(),
        }
    }
}

/// What happened during a call to `train`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    /// Mean loss of every completed epoch
    pub loss: Vec<f64>,
    pub stopped_early: bool,
    /// One message per periodic save that failed
    pub checkpoint_failures: Vec<String>,
}

impl History {
    pub fn elapsed_epochs(&self) -> usize {
        self.loss.len()
    }

    pub fn best_loss(&self) -> Option<f64> {
        self.loss.iter().copied().reduce(f64::min)
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.loss.last().copied()
    }
}

/// Run the training loop. The model must already be compiled.
pub fn train<M, I>(
    model:   &mut M,
    mut batches: I,
    opts:    &TrainOptions,
    metrics: Option<&MetricsLogger>,
) -> Result<History>
where
    M: EmbeddingModel,
    I: Iterator<Item = M::Batch>,
{
    if opts.steps_per_epoch == 0 {
        bail!("steps_per_epoch must be at least 1");
    }

    let mut history = History::default();
    let mut best    = f64::INFINITY;
    let mut wait    = 0usize;

    for epoch in 1..=opts.epochs {

        // ── Steps ─────────────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        for step in 1..=opts.steps_per_epoch {
            let batch = batches.next().with_context(|| {
                format!(
                    "batch stream ran dry at epoch {epoch}, step {step}/{}; \
                     the corpus yields no samples for this window size",
                    opts.steps_per_epoch
                )
            })?;
            loss_sum += model.train_step(batch)?;
        }
        let loss = loss_sum / opts.steps_per_epoch as f64;
        history.loss.push(loss);

        // ── Bookkeeping ───────────────────────────────────────────────────────
        let row = EpochMetrics::record(epoch, loss, best);
        if row.improved {
            best = loss;
            wait = 0;
        } else {
            wait += 1;
        }

        match opts.early_stopping_patience {
            Some(p) => tracing::info!(
                "Epoch {}/{} | loss={:.5} | best={:.5} | wait={}/{}",
                epoch, opts.epochs, loss, best, wait, p
            ),
            None => tracing::info!(
                "Epoch {}/{} | loss={:.5} | best={:.5}",
                epoch, opts.epochs, loss, best
            ),
        }

        if let Some(logger) = metrics {
            if let Err(e) = logger.log(&row) {
                tracing::warn!("Could not write metrics for epoch {epoch}: {e:#}");
            }
        }

        periodic_saves(model, epoch, opts, &mut history);

        // ── Early stopping ────────────────────────────────────────────────────
        if let Some(patience) = opts.early_stopping_patience {
            if !row.improved && wait >= patience {
                tracing::info!(
                    "Early stopping after epoch {epoch}: no improvement for {wait} epochs"
                );
                history.stopped_early = true;
                break;
            }
        }
    }

    final_saves(model, history.elapsed_epochs(), opts)?;
    Ok(history)
}

fn due(period: Option<usize>, epoch: usize) -> bool {
    matches!(period, Some(p) if p > 0 && epoch % p == 0)
}

fn periodic_saves<M: EmbeddingModel>(
    model:   &M,
    epoch:   usize,
    opts:    &TrainOptions,
    history: &mut History,
) {
    if let Some(template) = opts.save_path.as_deref().filter(|_| due(opts.save_period, epoch)) {
        let path = render_path(template, epoch);
        if let Err(e) = model.save(&path) {
            let msg = format!("epoch {epoch}: model save to '{}' failed: {e:#}", path.display());
            tracing::warn!("{msg}");
            history.checkpoint_failures.push(msg);
        }
    }

    if let Some(template) = opts
        .save_doc_embeddings_path
        .as_deref()
        .filter(|_| due(opts.save_doc_embeddings_period, epoch))
    {
        let path = render_path(template, epoch);
        if let Err(e) = export_doc_embeddings(model, &path, opts) {
            let msg = format!(
                "epoch {epoch}: doc embeddings save to '{}' failed: {e:#}",
                path.display()
            );
            tracing::warn!("{msg}");
            history.checkpoint_failures.push(msg);
        }
    }
}

fn final_saves<M: EmbeddingModel>(model: &M, elapsed: usize, opts: &TrainOptions) -> Result<()> {
    if let Some(template) = &opts.save_path {
        let path = render_path(template, elapsed);
        model
            .save(&path)
            .with_context(|| format!("Final model save to '{}' failed", path.display()))?;
        tracing::info!("Saved model to '{}'", path.display());
    }

    if let Some(template) = &opts.save_doc_embeddings_path {
        let path = render_path(template, elapsed);
        export_doc_embeddings(model, &path, opts)
            .with_context(|| format!("Final doc embeddings save to '{}' failed", path.display()))?;
        tracing::info!("Saved document embeddings to '{}'", path.display());
    }

    Ok(())
}

fn export_doc_embeddings<M: EmbeddingModel>(
    model: &M,
    path:  &std::path::Path,
    opts:  &TrainOptions,
) -> Result<()> {
    model.save_doc_embeddings(path)?;
    if !opts.doc_sources.is_empty() {
        save_doc_index(path, &opts.doc_sources)?;
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::variant::{LayerRole, ModelVariant};
    use crate::infra::checkpoint::doc_index_path;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    /// Replays a fixed loss per step and records every save.
    #[derive(Default)]
    struct FakeModel {
        losses:     Vec<f64>,
        steps:      usize,
        fail_on:    Option<PathBuf>,
        saves:      RefCell<Vec<PathBuf>>,
        emb_saves:  RefCell<Vec<PathBuf>>,
    }

    impl FakeModel {
        fn scripted(losses: &[f64]) -> Self {
            Self { losses: losses.to_vec(), ..Default::default() }
        }

        fn check(&self, path: &Path) -> Result<()> {
            if self.fail_on.as_deref() == Some(path) {
                bail!("disk full");
            }
            Ok(())
        }
    }

    impl EmbeddingModel for FakeModel {
        type Batch   = u32;
        type Weights = ();

        fn variant(&self) -> ModelVariant {
            ModelVariant::Dbow
        }

        fn compile(&mut self) {}

        fn train_step(&mut self, _batch: u32) -> Result<f64> {
            let loss = self.losses.get(self.steps).or(self.losses.last()).copied().unwrap_or(0.0);
            self.steps += 1;
            Ok(loss)
        }

        fn save(&self, path: &Path) -> Result<()> {
            self.check(path)?;
            self.saves.borrow_mut().push(path.to_path_buf());
            Ok(())
        }

        fn load(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn save_doc_embeddings(&self, path: &Path) -> Result<()> {
            self.check(path)?;
            self.emb_saves.borrow_mut().push(path.to_path_buf());
            Ok(())
        }

        fn get_weights(&self, _layer: LayerRole) -> Result<()> {
            Ok(())
        }

        fn replace_weights(&mut self, _layer: LayerRole, _weights: ()) -> Result<()> {
            Ok(())
        }

        fn freeze_layer(&mut self, _layer: LayerRole) -> Result<()> {
            Ok(())
        }
    }

    fn opts(epochs: usize, steps: usize) -> TrainOptions {
        TrainOptions { epochs, steps_per_epoch: steps, ..Default::default() }
    }

    fn paths(v: &RefCell<Vec<PathBuf>>) -> Vec<String> {
        v.borrow().iter().map(|p| p.display().to_string()).collect()
    }

    #[test]
    fn test_epoch_loss_is_mean_of_steps() {
        let mut model = FakeModel::scripted(&[4.0, 2.0, 1.0, 3.0]);
        let history = train(&mut model, std::iter::repeat(0), &opts(2, 2), None).unwrap();
        assert_eq!(history.loss, vec![3.0, 2.0]);
        assert_eq!(history.elapsed_epochs(), 2);
        assert_eq!(history.best_loss(), Some(2.0));
    }

    #[test]
    fn test_consumes_exactly_epochs_times_steps() {
        let mut model = FakeModel::scripted(&[1.0]);
        let mut stream = 0u32..;
        train(&mut model, &mut stream, &opts(3, 4), None).unwrap();
        assert_eq!(model.steps, 12);
        assert_eq!(stream.next(), Some(12));
    }

    #[test]
    fn test_early_stopping_epoch_count() {
        // best at epoch 2, then three non-improving epochs (a tie included)
        let mut model = FakeModel::scripted(&[5.0, 4.0, 4.5, 4.0, 4.2, 1.0, 1.0]);
        let o = TrainOptions { early_stopping_patience: Some(3), ..opts(7, 1) };

        let history = train(&mut model, std::iter::repeat(0), &o, None).unwrap();
        assert!(history.stopped_early);
        assert_eq!(history.elapsed_epochs(), 5);
    }

    #[test]
    fn test_improvement_resets_patience() {
        let mut model = FakeModel::scripted(&[5.0, 6.0, 4.0, 6.0, 3.0, 6.0]);
        let o = TrainOptions { early_stopping_patience: Some(2), ..opts(6, 1) };

        let history = train(&mut model, std::iter::repeat(0), &o, None).unwrap();
        assert!(!history.stopped_early);
        assert_eq!(history.elapsed_epochs(), 6);
    }

    #[test]
    fn test_zero_patience_stops_on_first_plateau() {
        let mut model = FakeModel::scripted(&[2.0, 1.0, 1.5, 0.5]);
        let o = TrainOptions { early_stopping_patience: Some(0), ..opts(4, 1) };

        let history = train(&mut model, std::iter::repeat(0), &o, None).unwrap();
        assert!(history.stopped_early);
        assert_eq!(history.loss, vec![2.0, 1.0, 1.5]);
    }

    #[test]
    fn test_periodic_and_final_save_paths() {
        let mut model = FakeModel::scripted(&[1.0]);
        let o = TrainOptions {
            save_path:                  Some("out/m-{epoch}".into()),
            save_period:                Some(2),
            save_doc_embeddings_path:   Some("out/d-{epoch}.txt".into()),
            save_doc_embeddings_period: Some(3),
            ..opts(5, 1)
        };

        let history = train(&mut model, std::iter::repeat(0), &o, None).unwrap();
        assert!(history.checkpoint_failures.is_empty());
        assert_eq!(paths(&model.saves), vec!["out/m-2", "out/m-4", "out/m-5"]);
        assert_eq!(paths(&model.emb_saves), vec!["out/d-3.txt", "out/d-5.txt"]);
    }

    #[test]
    fn test_every_doc_embeddings_export_gets_an_index() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("d-{epoch}.txt").display().to_string();

        let mut model = FakeModel::scripted(&[1.0]);
        let o = TrainOptions {
            save_doc_embeddings_path:   Some(template.clone()),
            save_doc_embeddings_period: Some(1),
            doc_sources:                vec!["a.txt".into(), "b.txt".into()],
            ..opts(3, 1)
        };

        let history = train(&mut model, std::iter::repeat(0), &o, None).unwrap();
        assert!(history.checkpoint_failures.is_empty());
        for epoch in 1..=3 {
            let index = doc_index_path(&render_path(&template, epoch));
            let names: Vec<String> =
                serde_json::from_str(&std::fs::read_to_string(&index).unwrap()).unwrap();
            assert_eq!(names, vec!["a.txt", "b.txt"]);
        }
    }

    #[test]
    fn test_final_save_uses_elapsed_epochs_after_early_stop() {
        let mut model = FakeModel::scripted(&[1.0, 2.0, 2.0, 2.0]);
        let o = TrainOptions {
            early_stopping_patience: Some(1),
            save_path:               Some("m-{epoch}".into()),
            ..opts(10, 1)
        };

        train(&mut model, std::iter::repeat(0), &o, None).unwrap();
        assert_eq!(paths(&model.saves), vec!["m-2"]);
    }

    #[test]
    fn test_periodic_save_failure_does_not_abort() {
        let mut model = FakeModel {
            fail_on: Some(PathBuf::from("m-2")),
            ..FakeModel::scripted(&[1.0])
        };
        let o = TrainOptions {
            save_path:   Some("m-{epoch}".into()),
            save_period: Some(1),
            ..opts(3, 1)
        };

        let history = train(&mut model, std::iter::repeat(0), &o, None).unwrap();
        assert_eq!(history.elapsed_epochs(), 3);
        assert_eq!(history.checkpoint_failures.len(), 1);
        assert!(history.checkpoint_failures[0].contains("m-2"));
        assert_eq!(paths(&model.saves), vec!["m-1", "m-3", "m-3"]);
    }

    #[test]
    fn test_final_save_failure_is_an_error() {
        let mut model = FakeModel {
            fail_on: Some(PathBuf::from("m-3")),
            ..FakeModel::scripted(&[1.0])
        };
        let o = TrainOptions { save_path: Some("m-{epoch}".into()), ..opts(3, 1) };
        assert!(train(&mut model, std::iter::repeat(0), &o, None).is_err());
    }

    #[test]
    fn test_dry_stream_is_an_error() {
        let mut model = FakeModel::scripted(&[1.0]);
        let err = train(&mut model, 0u32..5, &opts(2, 3), None).unwrap_err();
        assert!(format!("{err:#}").contains("epoch 2, step 3/3"));
    }

    #[test]
    fn test_zero_steps_is_rejected() {
        let mut model = FakeModel::scripted(&[1.0]);
        assert!(train(&mut model, std::iter::repeat(0), &opts(1, 0), None).is_err());
    }

    #[test]
    fn test_metrics_rows_are_written() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().join("m.csv")).unwrap();
        let mut model = FakeModel::scripted(&[2.0, 3.0]);

        train(&mut model, std::iter::repeat(0), &opts(2, 1), Some(&logger)).unwrap();

        let text = std::fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(2).unwrap().ends_with(",false"));
    }
}
