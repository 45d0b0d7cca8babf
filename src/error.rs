use std::path::PathBuf;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint file doesn't exist: {0}")]
    NotFound(PathBuf),

    #[error("failed to encode {what}: {reason}")]
    Record { what: &'static str, reason: String },

    #[error("failed to decode checkpoint {path}: {source}")]
    Decode {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("failed to encode checkpoint: {0}")]
    Encode(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while sampling frames out of a video.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Videos shorter than the contiguous window are not handled.
    #[error("not implemented: video has {frame_count} frames, window needs {required}")]
    NotImplemented { frame_count: usize, required: usize },

    #[error("failed to open video {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading a processed dataset from disk.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("no archive published for {dataset} with process type {process_type}")]
    UnsupportedVariant {
        dataset: String,
        process_type: String,
    },

    #[error("{path}:{line}: expected `<video_id> <label>`, got {content:?}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("label {label} out of range for {num_classes} classes ({path}:{line})")]
    LabelOutOfRange {
        path: PathBuf,
        line: usize,
        label: usize,
        num_classes: usize,
    },

    #[error("video {video_id} has {found} frames, expected {expected}")]
    FrameCount {
        video_id: String,
        found: usize,
        expected: usize,
    },

    #[error("failed to read split list {path}: {source}")]
    SplitRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("image error in {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}
