// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands off to Layer 2.
//
//   doc2vec train <PATH> [--model dm|dbow] [--save ...] ...
//   doc2vec infer <PATH> --load <MODEL> --load-vocab <VOCAB> ...
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InferArgs, TrainArgs};

use crate::application::train_use_case::RunSummary;

#[derive(Parser, Debug)]
#[command(
    name = "doc2vec",
    version,
    about = "Train DM / DBOW paragraph vectors on a directory of documents."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Infer(args) => run_infer(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on documents in: {}", args.run.path);
    let summary = TrainUseCase::new(args.into()).execute()?;
    print_summary("Training", &summary);
    Ok(())
}

fn run_infer(args: InferArgs) -> Result<()> {
    use crate::application::infer_use_case::InferUseCase;

    tracing::info!("Inferring embeddings for documents in: {}", args.run.path);
    let summary = InferUseCase::new(args.into()).execute()?;
    print_summary("Inference", &summary);
    Ok(())
}

fn print_summary(what: &str, s: &RunSummary) {
    let h = &s.history;
    println!(
        "{what} complete ({}): {} documents, {} vocabulary ids, {} epochs{}",
        s.variant,
        s.num_docs,
        s.vocab_size,
        h.elapsed_epochs(),
        if h.stopped_early { " (stopped early)" } else { "" },
    );
    if let (Some(last), Some(best)) = (h.final_loss(), h.best_loss()) {
        println!("Final loss: {last:.5}  best: {best:.5}");
    }
    for failure in &h.checkpoint_failures {
        println!("Checkpoint failed: {failure}");
    }
}
