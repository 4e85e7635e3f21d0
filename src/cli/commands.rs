// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `infer`, and their
// flags. Flags shared by both live in `RunArgs` and are
// flattened into each subcommand.
//
// Save paths accept an `{epoch}` placeholder:
//   --save runs/dm-{epoch} --save-period 5
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{infer_use_case::InferConfig, train_use_case::TrainConfig};
use crate::domain::{variant::ModelVariant, vocabulary};
use crate::ml::model;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train word and document embeddings on a directory of documents
    Train(TrainArgs),

    /// Learn embeddings for new documents using a trained model
    Infer(InferArgs),
}

/// Flags shared by `train` and `infer`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory of .txt / .docx files, one document per file
    pub path: String,

    /// Model save path template
    #[arg(long)]
    pub save: Option<String>,

    /// Also save the model every N epochs
    #[arg(long, value_name = "N")]
    pub save_period: Option<usize>,

    /// Document embeddings save path template
    #[arg(long)]
    pub save_doc_embeddings: Option<String>,

    /// Also save document embeddings every N epochs
    #[arg(long, value_name = "N")]
    pub save_doc_embeddings_period: Option<usize>,

    /// Stop after N epochs without a lower loss
    #[arg(long, value_name = "N")]
    pub early_stopping_patience: Option<usize>,

    #[arg(long, default_value_t = 20)]
    pub num_epochs: usize,

    #[arg(long, default_value_t = 1000)]
    pub steps_per_epoch: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    /// Seed for weight initialisation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Append per-epoch loss to this CSV file
    #[arg(long, value_name = "CSV")]
    pub metrics: Option<String>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// dm or dbow
    #[arg(long, default_value = "dm")]
    pub model: ModelVariant,

    /// Continue training a saved model. Optimiser state is not saved, so
    /// Adam restarts fresh, and --learning-rate replaces the saved rate
    #[arg(long)]
    pub load: Option<String>,

    /// Use an existing vocabulary instead of building one
    #[arg(long)]
    pub load_vocab: Option<String>,

    /// Write the vocabulary to this file
    #[arg(long)]
    pub save_vocab: Option<String>,

    /// Maximum number of known tokens
    #[arg(long, default_value_t = vocabulary::DEFAULT_SIZE)]
    pub vocab_size: usize,

    /// Tokens seen fewer times than this become unknown
    #[arg(long, default_value_t = vocabulary::DEFAULT_RARE_THRESHOLD)]
    pub vocab_rare_threshold: u64,

    /// Context words on each side of the target (dm only)
    #[arg(long, default_value_t = model::DEFAULT_WINDOW_SIZE)]
    pub window_size: usize,

    #[arg(long, default_value_t = model::DEFAULT_EMBEDDING_SIZE)]
    pub embedding_size: usize,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            docs_dir:                   a.run.path,
            model:                      a.model,
            save:                       a.run.save,
            save_period:                a.run.save_period,
            save_vocab:                 a.save_vocab,
            save_doc_embeddings:        a.run.save_doc_embeddings,
            save_doc_embeddings_period: a.run.save_doc_embeddings_period,
            load:                       a.load,
            load_vocab:                 a.load_vocab,
            early_stopping_patience:    a.run.early_stopping_patience,
            vocab_size:                 a.vocab_size,
            vocab_rare_threshold:       a.vocab_rare_threshold,
            window_size:                a.window_size,
            embedding_size:             a.embedding_size,
            num_epochs:                 a.run.num_epochs,
            steps_per_epoch:            a.run.steps_per_epoch,
            batch_size:                 a.run.batch_size,
            learning_rate:              a.run.learning_rate,
            seed:                       a.run.seed,
            metrics:                    a.run.metrics,
        }
    }
}

#[derive(Args, Debug)]
pub struct InferArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Trained model (its <path>.json config must sit next to it)
    #[arg(long)]
    pub load: String,

    /// Vocabulary the model was trained with
    #[arg(long)]
    pub load_vocab: String,

    /// Fail unless the trained model is of this kind
    #[arg(long)]
    pub model: Option<ModelVariant>,
}

impl From<InferArgs> for InferConfig {
    fn from(a: InferArgs) -> Self {
        InferConfig {
            docs_dir:                   a.run.path,
            load:                       a.load,
            load_vocab:                 a.load_vocab,
            model:                      a.model,
            save:                       a.run.save,
            save_period:                a.run.save_period,
            save_doc_embeddings:        a.run.save_doc_embeddings,
            save_doc_embeddings_period: a.run.save_doc_embeddings_period,
            early_stopping_patience:    a.run.early_stopping_patience,
            num_epochs:                 a.run.num_epochs,
            steps_per_epoch:            a.run.steps_per_epoch,
            batch_size:                 a.run.batch_size,
            learning_rate:              a.run.learning_rate,
            seed:                       a.run.seed,
            metrics:                    a.run.metrics,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_train_defaults() {
        let Commands::Train(args) = parse(&["doc2vec", "train", "corpus"]) else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.docs_dir, "corpus");
        assert_eq!(cfg.model, ModelVariant::Dm);
        assert_eq!(cfg.vocab_size, 10_000);
        assert_eq!(cfg.vocab_rare_threshold, 0);
        assert_eq!(cfg.window_size, 5);
        assert_eq!(cfg.embedding_size, 100);
        assert_eq!(cfg.num_epochs, 20);
        assert_eq!(cfg.steps_per_epoch, 1000);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.learning_rate, 1e-3);
        assert!(cfg.save.is_none() && cfg.early_stopping_patience.is_none());
    }

    #[test]
    fn test_train_flags() {
        let Commands::Train(args) = parse(&[
            "doc2vec", "train", "corpus",
            "--model", "DBOW",
            "--save", "out/m-{epoch}",
            "--save-period", "5",
            "--early-stopping-patience", "3",
            "--vocab-rare-threshold", "2",
        ]) else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.model, ModelVariant::Dbow);
        assert_eq!(cfg.save.as_deref(), Some("out/m-{epoch}"));
        assert_eq!(cfg.save_period, Some(5));
        assert_eq!(cfg.early_stopping_patience, Some(3));
        assert_eq!(cfg.vocab_rare_threshold, 2);
    }

    #[test]
    fn test_infer_requires_model_and_vocab() {
        assert!(Cli::try_parse_from(["doc2vec", "infer", "new"]).is_err());

        let Commands::Infer(args) = parse(&[
            "doc2vec", "infer", "new", "--load", "m", "--load-vocab", "v.json",
        ]) else {
            panic!("expected infer");
        };
        let cfg: InferConfig = args.into();
        assert_eq!(cfg.load, "m");
        assert_eq!(cfg.load_vocab, "v.json");
        assert!(cfg.model.is_none());
    }

    #[test]
    fn test_load_help_explains_resume() {
        use clap::CommandFactory;

        let mut cmd = Cli::command();
        let help = cmd
            .find_subcommand_mut("train")
            .unwrap()
            .render_long_help()
            .to_string()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        assert!(help.contains("Adam restarts fresh"));
        assert!(help.contains("--learning-rate replaces the saved rate"));
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        assert!(Cli::try_parse_from(["doc2vec", "train", "c", "--model", "lstm"]).is_err());
    }
}
