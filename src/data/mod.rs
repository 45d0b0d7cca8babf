// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from a processed dataset on
// disk all the way to tensor batches.
//
// The pipeline flows in this order:
//
//   splits/<split>/{train,val}.txt + frames/*.png
//       │
//       ▼
//   read_split_list   → (video_id, label) annotations
//       │
//       ▼
//   ClipDataset       → implements Burn's Dataset trait,
//       │               decodes K frames per clip on demand
//       ▼
//   FrameTransform    → resize + ImageNet normalisation
//       │
//       ▼
//   ClipBatcher       → stacks samples into [N, K, C, H, W]
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Resize and normalise frames
pub mod transform;

/// Split lists and Burn's Dataset trait for clips
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
