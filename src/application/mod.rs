// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one user-level goal each.
//
// Rules for this layer:
//   - No tensor math here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination and backend dispatch
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Offline base model: tokenizer + random encoder
pub mod base_use_case;

// The training workflow
pub mod train_use_case;

// Single-pair prediction and split evaluation
pub mod predict_use_case;

// Registry publishing
pub mod publish_use_case;
