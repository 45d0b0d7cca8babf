// ============================================================
// Layer 3 — Clip Domain Types
// ============================================================
// A "clip" is the model's unit of input: K frames sampled from
// one video, in temporal order, plus the action label.
//
// On disk a clip is described by one annotation line
// (`<video_id> <label>`) and K frame images named
// `<video_id>_1.png` … `<video_id>_K.png`.

use serde::{Deserialize, Serialize};

/// One labelled video in a split list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipAnnotation {
    /// Stem shared by all frame files of this video
    pub video_id: String,

    /// Zero-based action class index
    pub label: usize,
}

impl ClipAnnotation {
    pub fn new(video_id: impl Into<String>, label: usize) -> Self {
        Self { video_id: video_id.into(), label }
    }

    /// File name of frame `index` (1-based), e.g. `v_Biking_g01_c01_3.png`
    pub fn frame_file_name(&self, index: usize) -> String {
        format!("{}_{}.png", self.video_id, index)
    }
}

/// How frames are picked from a video at inference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingPolicy {
    /// `frames` frames spread evenly over the video, each resized
    /// to `resize`×`resize` before staging
    Uniform { frames: usize, resize: u32 },

    /// `frames` consecutive frames starting at a random position,
    /// staged at their native resolution
    RandomWindow { frames: usize },
}

impl SamplingPolicy {
    /// Number of frames this policy produces for a long enough video
    pub fn frames(&self) -> usize {
        match *self {
            SamplingPolicy::Uniform { frames, .. } => frames,
            SamplingPolicy::RandomWindow { frames } => frames,
        }
    }
}

/// One entry of a top-k prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class index into the dataset's label list
    pub class_index: usize,

    /// Softmax probability for this class
    pub score: f32,

    /// Human-readable class name, when a class list was supplied
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_file_name_is_one_based() {
        let a = ClipAnnotation::new("v_Biking_g01_c01", 10);
        assert_eq!(a.frame_file_name(1), "v_Biking_g01_c01_1.png");
    }

    #[test]
    fn test_policy_frame_counts() {
        assert_eq!(SamplingPolicy::Uniform { frames: 5, resize: 256 }.frames(), 5);
        assert_eq!(SamplingPolicy::RandomWindow { frames: 16 }.frames(), 16);
    }
}
