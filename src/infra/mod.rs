// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches disk or network on behalf of the
// other layers:
//
//   base_model.rs      — resolves a model identifier to a frozen
//                        encoder + tokenizer (local dir or hub)
//
//   tokenizer_store.rs — builds, saves and loads the word-level
//                        tokenizer of locally initialised bases
//
//   checkpoint.rs      — adapter weights + manifest; per-epoch
//                        checkpoints and the final export
//
//   metrics.rs         — evaluation rows appended to metrics.csv
//
//   registry.rs        — publishing an export to a local
//                        registry directory or the HF Hub
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Base encoder resolution, loading and saving
pub mod base_model;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Adapter checkpoint saving and loading
pub mod checkpoint;

/// Evaluation metrics CSV logger
pub mod metrics;

/// Local and Hugging Face Hub publishing
pub mod registry;
