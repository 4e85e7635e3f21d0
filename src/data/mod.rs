// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from files on disk to model-ready batches.
//
//   .txt / .docx files
//       │
//       ▼
//   DirectoryLoader   → reads files, extracts raw text
//       │
//       ▼
//   Preprocessor      → cleans text, splits into word tokens
//       │
//       ▼
//   Vocabulary        → tokens to ids (domain layer)
//       │
//       ▼
//   SampleStream      → endless DM / DBOW window samples
//       │
//       ▼
//   Batcher           → fixed-size flat batches
//       │
//       ▼
//   training loop (ml layer)
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Stacks samples into fixed-size batches
pub mod batcher;

/// DM and DBOW window sample streams
pub mod generator;

/// Loads .txt and .docx files from a directory
pub mod loader;

/// Cleans and tokenises raw text
pub mod preprocessor;
