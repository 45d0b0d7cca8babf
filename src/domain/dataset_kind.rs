// ============================================================
// Layer 3 — Dataset Identity
// ============================================================
// The pipeline knows two public action-recognition benchmarks,
// three official train/test partitions for each, and three
// preprocessing variants (how frames were sampled from every
// video before the archive was published).
//
// clap's ValueEnum derive lets the CLI reject anything else at
// parse time with a usage message; serde lets TrainConfig carry
// these values into train_config.json.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// HMDB51 — 51 action classes
    Hmdb51,
    /// UCF101 — 101 action classes
    Ucf101,
}

impl DatasetKind {
    /// Number of output classes the classifier head must produce
    pub fn num_classes(self) -> usize {
        match self {
            DatasetKind::Hmdb51 => 51,
            DatasetKind::Ucf101 => 101,
        }
    }

    /// Lower-case identifier, as used on the command line and in archive names
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Hmdb51 => "hmdb51",
            DatasetKind::Ucf101 => "ucf101",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three official train/test partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataSplit {
    #[default]
    Split1,
    Split2,
    Split3,
}

impl DataSplit {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSplit::Split1 => "split1",
            DataSplit::Split2 => "split2",
            DataSplit::Split3 => "split3",
        }
    }
}

impl fmt::Display for DataSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame-sampling strategy applied when the dataset archive was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum ProcessType {
    /// 5 frames spread evenly across the whole video
    #[default]
    #[value(name = "5_frames_uniform")]
    #[serde(rename = "5_frames_uniform")]
    FiveFramesUniform,

    /// 5 consecutive frames from a random position
    #[value(name = "5_frames_conse_rand")]
    #[serde(rename = "5_frames_conse_rand")]
    FiveFramesConseRand,

    /// 16 consecutive frames from a random position
    #[value(name = "16_frames_conse_rand")]
    #[serde(rename = "16_frames_conse_rand")]
    SixteenFramesConseRand,
}

impl ProcessType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessType::FiveFramesUniform      => "5_frames_uniform",
            ProcessType::FiveFramesConseRand    => "5_frames_conse_rand",
            ProcessType::SixteenFramesConseRand => "16_frames_conse_rand",
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
