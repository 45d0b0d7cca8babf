// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs      — Saving and loading trainable state
//                        last.pth / best.pth snapshots built
//                        from Burn records, the per-checkpoint
//                        validation metrics, and TrainConfig
//                        as JSON so inference can rebuild the
//                        model.
//
//   metrics.rs         — Where scalar metrics go
//                        NoopSink when tracking is off,
//                        CsvMetricsSink to append rows to a
//                        CSV file for later plotting.
//
//   reproducibility.rs — seed_everything(): one call that
//                        seeds the backend and hands back the
//                        host RNG.
//
//   video.rs           — Frame sources (frame directories,
//                        GIFs), sampling policies and the
//                        deployment staging directory.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Metrics sinks
pub mod metrics;

/// Seeding
pub mod reproducibility;

/// Frame extraction and staging
pub mod video;
