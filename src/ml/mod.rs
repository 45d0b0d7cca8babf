// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn networks and the loops that
// drive them.
//
// What's in this layer:
//
//   model.rs      — ActionClassifier trait, cross-entropy
//                   helper, and ModelSpec (which network to
//                   build, with which arguments)
//
//   lrcn.rs       — CNN frame encoder + stacked LSTM
//
//   c3d.rs        — 3D convolutional network
//
//   trainer.rs    — The training loop
//                   One pass per epoch, validation, best
//                   tracking and checkpoint writes
//
//   inferencer.rs — Staged frames → top-k softmax classes
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Classifier trait and model selection
pub mod model;

/// LRCN architecture
pub mod lrcn;

/// C3D architecture
pub mod c3d;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — staged frames to top-k classes
pub mod inferencer;
