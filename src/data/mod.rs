// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From JSONL benchmark files to tensor batches:
//
//   *.jsonl split files
//       │
//       ▼
//   JsonlLoader     → NliExample (premise, hypothesis, label)
//       │
//       ▼
//   take_subset     → optional seeded cap per split
//       │
//       ▼
//   Preprocessor    → NliSample (fixed-length ids + mask)
//       │
//       ▼
//   NliDataset      → Burn Dataset
//       │
//       ▼
//   NliBatcher      → NliBatch tensors for the DataLoader
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads MultiNLI / GLUE JSONL split files
pub mod loader;

/// Normalises and tokenises text pairs to fixed length
pub mod preprocessor;

/// Tokenised samples behind Burn's Dataset trait
pub mod dataset;

/// Stacks samples into tensor batches
pub mod batcher;

/// Seeded subset sampling and train/validation split
pub mod splitter;
