// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define the core
// concepts: documents, the vocabulary, training samples, model
// variants and the model contract.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Raw documents and the encoded corpus
pub mod document;

// Typed vocabulary errors
pub mod error;

// DM and DBOW sample shapes
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;

// DM / DBOW and their layer roles
pub mod variant;

// Frequency-ranked token ↔ id mapping
pub mod vocabulary;
