// ============================================================
// Layer 4 — Clip Dataset
// ============================================================
// Reads a processed dataset from disk:
//
//   <data_dir>/
//     splits/split1/train.txt     <video_id> <label>, one per line
//     splits/split1/val.txt
//     frames/<video_id>_1.png … <video_id>_K.png
//
// The split list is parsed and every clip's frame count checked
// when the dataset is built, so a broken dataset fails before
// the first epoch. Frame images are only decoded in get(),
// which the DataLoader calls from its worker threads.

use burn::data::dataset::Dataset;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::transform::{FrameTransform, CHANNELS};
use crate::domain::{clip::ClipAnnotation, dataset_kind::DataSplit};
use crate::error::DatasetError;

// ─── ClipSample ───────────────────────────────────────────────────────────────
/// One decoded clip: K transformed frames plus the class label.
#[derive(Debug, Clone)]
pub struct ClipSample {
    /// Pixel values laid out as [K, C, H, W]
    pub frames: Vec<f32>,

    /// [K, C, H, W]
    pub dims: [usize; 4],

    pub label: usize,
}

// ─── Split lists ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPhase {
    Train,
    Val,
}

impl SplitPhase {
    pub fn file_name(&self) -> &'static str {
        match self {
            SplitPhase::Train => "train.txt",
            SplitPhase::Val   => "val.txt",
        }
    }
}

/// `<data_dir>/splits/<split>/<phase>.txt`
pub fn split_list_path(data_dir: &Path, split: DataSplit, phase: SplitPhase) -> PathBuf {
    data_dir.join("splits").join(split.as_str()).join(phase.file_name())
}

/// Parse a split list. Blank lines and `#` comments are skipped.
pub fn read_split_list(path: &Path, num_classes: usize) -> Result<Vec<ClipAnnotation>, DatasetError> {
    let text = fs::read_to_string(path).map_err(|source| DatasetError::SplitRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut annotations = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = || DatasetError::MalformedLine {
            path:    path.to_path_buf(),
            line:    i + 1,
            content: raw.to_string(),
        };
        let mut fields = line.split_whitespace();
        let (Some(video_id), Some(label), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(malformed());
        };
        let label: usize = label.parse().map_err(|_| malformed())?;

        if label >= num_classes {
            return Err(DatasetError::LabelOutOfRange {
                path: path.to_path_buf(),
                line: i + 1,
                label,
                num_classes,
            });
        }
        annotations.push(ClipAnnotation::new(video_id, label));
    }
    Ok(annotations)
}

// ─── ClipDataset ──────────────────────────────────────────────────────────────
pub struct ClipDataset {
    frames_dir:      PathBuf,
    annotations:     Vec<ClipAnnotation>,
    frames_per_clip: usize,
    transform:       FrameTransform,
}

impl ClipDataset {
    /// Build a dataset over `annotations`, checking that every clip
    /// has exactly `frames_per_clip` frames in `frames_dir`.
    pub fn new(
        frames_dir:      impl Into<PathBuf>,
        annotations:     Vec<ClipAnnotation>,
        frames_per_clip: usize,
        transform:       FrameTransform,
    ) -> Result<Self, DatasetError> {
        let dataset = Self { frames_dir: frames_dir.into(), annotations, frames_per_clip, transform };
        for annotation in &dataset.annotations {
            let found = dataset.count_frames(annotation);
            if found != frames_per_clip {
                return Err(DatasetError::FrameCount {
                    video_id: annotation.video_id.clone(),
                    found,
                    expected: frames_per_clip,
                });
            }
        }
        Ok(dataset)
    }

    /// Load one phase of a split from a processed dataset root.
    pub fn from_split(
        data_dir:        &Path,
        split:           DataSplit,
        phase:           SplitPhase,
        num_classes:     usize,
        frames_per_clip: usize,
        transform:       FrameTransform,
    ) -> Result<Self, DatasetError> {
        let list        = split_list_path(data_dir, split, phase);
        let annotations = read_split_list(&list, num_classes)?;
        tracing::info!("'{}': {} clips", list.display(), annotations.len());
        Self::new(data_dir.join("frames"), annotations, frames_per_clip, transform)
    }

    /// Count frames `<id>_1.png`, `<id>_2.png`, … until the first gap.
    fn count_frames(&self, annotation: &ClipAnnotation) -> usize {
        (1..)
            .take_while(|&i| self.frames_dir.join(annotation.frame_file_name(i)).is_file())
            .count()
    }

    /// Decode and transform all frames of one clip.
    pub fn load_clip(&self, annotation: &ClipAnnotation) -> Result<ClipSample, DatasetError> {
        let side = self.transform.resize_to() as usize;
        let mut frames = Vec::with_capacity(self.frames_per_clip * self.transform.frame_len());

        for i in 1..=self.frames_per_clip {
            let path = self.frames_dir.join(annotation.frame_file_name(i));
            let frame = self
                .transform
                .load(&path)
                .map_err(|source| DatasetError::Image { path, source })?;
            frames.extend(frame);
        }

        Ok(ClipSample {
            frames,
            dims:  [self.frames_per_clip, CHANNELS, side, side],
            label: annotation.label,
        })
    }
}

impl Dataset<ClipSample> for ClipDataset {
    fn get(&self, index: usize) -> Option<ClipSample> {
        let annotation = self.annotations.get(index)?;
        match self.load_clip(annotation) {
            Ok(sample) => Some(sample),
            Err(e) => {
                tracing::error!("Cannot load clip '{}': {}", annotation.video_id, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.annotations.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Write a tiny processed dataset: `clips` videos per phase,
    /// `frames` frames each, labels cycling through `num_classes`.
    pub(crate) fn write_dataset(root: &Path, clips: usize, frames: usize, num_classes: usize) {
        let frames_dir = root.join("frames");
        fs::create_dir_all(&frames_dir).unwrap();

        for phase in [SplitPhase::Train, SplitPhase::Val] {
            let list = split_list_path(root, DataSplit::Split1, phase);
            fs::create_dir_all(list.parent().unwrap()).unwrap();

            let mut lines = vec!["# video label".to_string()];
            for c in 0..clips {
                let id = format!("{:?}_{}", phase, c);
                lines.push(format!("{} {}", id, c % num_classes));
                for i in 1..=frames {
                    RgbImage::from_pixel(6, 6, Rgb([c as u8, i as u8, 0]))
                        .save(frames_dir.join(format!("{}_{}.png", id, i)))
                        .unwrap();
                }
            }
            fs::write(&list, lines.join("\n")).unwrap();
        }
    }

    fn write_list(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("train.txt");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_list(dir.path(), "# header\n\nv_a 3\n  v_b 0  \n");
        let anns = read_split_list(&path, 51).unwrap();
        assert_eq!(anns, vec![ClipAnnotation::new("v_a", 3), ClipAnnotation::new("v_b", 0)]);
    }

    #[test]
    fn test_malformed_line_names_line_number() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_list(dir.path(), "v_a 3\nv_b\n");
        let err  = read_split_list(&path, 51).unwrap_err();
        assert!(matches!(err, DatasetError::MalformedLine { line: 2, .. }));

        let path = write_list(dir.path(), "v_a three\n");
        assert!(matches!(read_split_list(&path, 51), Err(DatasetError::MalformedLine { line: 1, .. })));
    }

    #[test]
    fn test_label_out_of_range() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_list(dir.path(), "v_a 51\n");
        assert!(matches!(
            read_split_list(&path, 51),
            Err(DatasetError::LabelOutOfRange { label: 51, num_classes: 51, .. })
        ));
    }

    #[test]
    fn test_missing_split_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_split_list(&dir.path().join("nope.txt"), 51),
            Err(DatasetError::SplitRead { .. })
        ));
    }

    #[test]
    fn test_clip_with_wrong_frame_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), 2, 4, 3);

        let err = ClipDataset::from_split(
            dir.path(), DataSplit::Split1, SplitPhase::Train, 3, 5, FrameTransform::new(4),
        )
        .err()
        .unwrap();
        assert!(matches!(err, DatasetError::FrameCount { found: 4, expected: 5, .. }));
    }

    #[test]
    fn test_get_decodes_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path(), 3, 4, 3);

        let ds = ClipDataset::from_split(
            dir.path(), DataSplit::Split1, SplitPhase::Val, 3, 4, FrameTransform::new(6),
        )
        .unwrap();
        assert_eq!(ds.len(), 3);

        let sample = ds.get(2).unwrap();
        assert_eq!(sample.label, 2);
        assert_eq!(sample.dims, [4, 3, 6, 6]);
        assert_eq!(sample.frames.len(), 4 * 3 * 6 * 6);

        // Green channel encodes the 1-based frame index
        let plane = 36;
        let frame_len = 3 * plane;
        for k in 0..4 {
            let green = sample.frames[k * frame_len + plane];
            let expected = ((k + 1) as f32 / 255.0 - 0.456) / 0.224;
            assert!((green - expected).abs() < 1e-5);
        }
        assert!(ds.get(3).is_none());
    }
}
