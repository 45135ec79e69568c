// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing the NLI task:
// what an example is, which labels exist, which dataset
// splits can be requested.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O or network calls
//   - Only structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

/// Premise/hypothesis pairs and the closed three-way label set
pub mod example;

/// Named benchmark splits and their on-disk file names
pub mod split;

/// Abstractions implemented by the data, ml and infra layers
pub mod traits;
