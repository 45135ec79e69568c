// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here.
//
//   encoder.rs      — BERT-style post-LayerNorm transformer encoder
//                     with a per-layer hook for hidden-state edits
//
//   intervention.rs — LoReFT: h + (W h + b − R h) Rᵀ on the first
//                     `positions` tokens, R with orthonormal rows
//
//   model.rs        — frozen encoder + trainable adapter
//                     (interventions + classification head)
//
//   schedule.rs     — warmup + constant / linear / cosine LR
//
//   trainer.rs      — the explicit training loop
//
//   evaluator.rs    — loss and accuracy over a labelled dataset
//
//   inferencer.rs   — single-pair prediction, adapter reload
//
//   backend.rs      — cpu / wgpu backend selection
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Wu et al. (2024) ReFT: Representation Finetuning

pub mod backend;

/// Frozen transformer encoder
pub mod encoder;

/// Low-rank linear subspace intervention
pub mod intervention;

/// ReFT classifier assembly and parameter accounting
pub mod model;

/// Learning-rate schedules
pub mod schedule;

/// Full training loop with evaluation and checkpointing
pub mod trainer;

pub mod evaluator;

/// Inference engine — loads an adapter and predicts labels
pub mod inferencer;
