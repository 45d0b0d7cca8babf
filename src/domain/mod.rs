// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that name the concepts of the pipeline:
// which benchmark, which split, how frames were sampled,
// what a labelled clip is, and what a prediction looks like.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// Benchmarks, splits and frame-sampling variants
pub mod dataset_kind;

// Clip annotations, sampling policies and predictions
pub mod clip;

// Core abstractions (traits) that other layers implement
pub mod traits;
