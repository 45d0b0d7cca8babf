// ============================================================
// Layer 6 — Video Frames and Staging
// ============================================================
// Turns a video into the handful of PNG frames a model reads.
//
//   video ──► FrameSource ──► sampling policy ──► staging dir
//                                                   │
//   ./deployment/staging/<model>/<name>_1.png  ◄────┘
//                               <name>_2.png
//                               ...
//
// Two sampling policies:
//
//   Uniform      — K frames spaced `max(n / K, 1)` apart, each
//                  resized to a square with a cubic filter.
//                  A frame that can't be read ends extraction
//                  early; whatever was already written is kept.
//
//   RandomWindow — K consecutive frames starting at a random
//                  position in 0..=n-K-2 (clamped at 0), written
//                  at native resolution. A video shorter than K
//                  frames is refused before anything is written.
//
// Extracting under a name first removes that name's old frames,
// so a rerun never mixes frames from two videos.
//
// Built-in sources: a directory of decoded frame images, and
// animated GIFs decoded with the `image` crate.

use image::{
    codecs::gif::GifDecoder,
    imageops::{self, FilterType},
    AnimationDecoder, DynamicImage, RgbImage,
};
use rand::Rng;
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::domain::{clip::SamplingPolicy, traits::FrameSource};
use crate::error::ExtractError;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// ─── FrameDirectory ───────────────────────────────────────────────────────────
/// A video already decoded into one image per frame.
/// Frame order is the lexicographic order of the file names.
pub struct FrameDirectory {
    frames: Vec<PathBuf>,
}

impl FrameDirectory {
    pub fn open(dir: &Path) -> Result<Self, ExtractError> {
        let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_frame_extension(p))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(ExtractError::Open {
                path:   dir.to_path_buf(),
                reason: "no frame images found".to_string(),
            });
        }
        tracing::debug!("'{}': {} frames", dir.display(), frames.len());
        Ok(Self { frames })
    }
}

impl FrameSource for FrameDirectory {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, ExtractError> {
        match self.frames.get(index) {
            Some(path) => Ok(Some(image::open(path)?.to_rgb8())),
            None       => Ok(None),
        }
    }
}

// ─── GifVideo ─────────────────────────────────────────────────────────────────
/// An animated GIF, fully decoded on open.
pub struct GifVideo {
    frames: Vec<RgbImage>,
}

impl GifVideo {
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let reader  = BufReader::new(File::open(path)?);
        let decoder = GifDecoder::new(reader)?;
        let frames  = decoder
            .into_frames()
            .collect_frames()?
            .into_iter()
            .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8())
            .collect();
        Ok(Self { frames })
    }
}

impl FrameSource for GifVideo {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, ExtractError> {
        Ok(self.frames.get(index).cloned())
    }
}

/// Pick a frame source from the path: a directory of frames or a `.gif`.
pub fn open_video(path: &Path) -> Result<Box<dyn FrameSource>, ExtractError> {
    if path.is_dir() {
        return Ok(Box::new(FrameDirectory::open(path)?));
    }
    if !path.exists() {
        return Err(ExtractError::Open {
            path:   path.to_path_buf(),
            reason: "no such file or directory".to_string(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("gif") => Ok(Box::new(GifVideo::open(path)?)),
        _ => Err(ExtractError::Open {
            path:   path.to_path_buf(),
            reason: "unsupported video container (expected a frame directory or .gif)".to_string(),
        }),
    }
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

// ─── Staging ──────────────────────────────────────────────────────────────────
/// Random hex stem for one prediction's staged frames.
pub fn staging_name<R: Rng>(rng: &mut R) -> String {
    format!("{:016x}", rng.gen::<u64>())
}

/// The per-model staging directory, e.g. `./deployment/staging/lrcn`.
pub struct FrameStager {
    dir: PathBuf,
}

impl FrameStager {
    pub fn new(staging_root: &Path, model_name: &str) -> Result<Self, ExtractError> {
        let dir = staging_root.join(model_name);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<name>_<index>.png`, index 1-based
    pub fn frame_path(&self, name: &str, index: usize) -> PathBuf {
        self.dir.join(format!("{}_{}.png", name, index))
    }

    /// Sample frames from `source` according to `policy` and write them
    /// under `name`, replacing any frames an earlier run left there.
    /// Returns the written paths in order.
    pub fn extract<R: Rng>(
        &self,
        source: &mut dyn FrameSource,
        policy: SamplingPolicy,
        name:   &str,
        rng:    &mut R,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let stale = self.clear(name)?;
        if stale > 0 {
            tracing::debug!("Removed {} stale frames for '{}'", stale, name);
        }

        match policy {
            SamplingPolicy::Uniform { frames, resize } => {
                Ok(self.extract_uniform(source, frames, resize, name))
            }
            SamplingPolicy::RandomWindow { frames } => {
                self.extract_window(source, frames, name, rng)
            }
        }
    }

    /// Spread `frames` frames over the whole video.
    ///
    /// Never fails: a read or write error is logged and stops
    /// extraction with the frames written so far.
    pub fn extract_uniform(
        &self,
        source: &mut dyn FrameSource,
        frames: usize,
        resize: u32,
        name:   &str,
    ) -> Vec<PathBuf> {
        let skip = (source.frame_count() / frames.max(1)).max(1);
        let mut written = Vec::with_capacity(frames);

        for counter in 0..frames {
            let frame = match source.read_frame(counter * skip) {
                Ok(Some(frame)) => frame,
                Ok(None)        => break,
                Err(e) => {
                    tracing::warn!("An error occurred while extracting frame {}: {}", counter * skip, e);
                    break;
                }
            };
            let resized = imageops::resize(&frame, resize, resize, FilterType::CatmullRom);
            let path    = self.frame_path(name, counter + 1);
            if let Err(e) = resized.save(&path) {
                tracing::warn!("Cannot write '{}': {}", path.display(), e);
                break;
            }
            written.push(path);
        }

        tracing::info!("Frame extraction completed: {} frames", written.len());
        written
    }

    /// Take `frames` consecutive frames from a random start.
    pub fn extract_window<R: Rng>(
        &self,
        source: &mut dyn FrameSource,
        frames: usize,
        name:   &str,
        rng:    &mut R,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let frame_count = source.frame_count();
        if frame_count < frames {
            return Err(ExtractError::NotImplemented { frame_count, required: frames });
        }

        let start = rng.gen_range(0..=window_start_limit(frame_count, frames));
        let mut written = Vec::with_capacity(frames);

        for counter in 0..frames {
            let Some(frame) = source.read_frame(start + counter)? else {
                break;
            };
            let path = self.frame_path(name, counter + 1);
            frame.save(&path)?;
            written.push(path);
        }

        tracing::debug!("Staged frames {}..{} under '{}'", start, start + written.len(), name);
        Ok(written)
    }

    /// All staged frames for `name`, ordered by numeric index
    /// (so `_10` comes after `_9`).
    pub fn staged_frames(&self, name: &str) -> Result<Vec<PathBuf>, ExtractError> {
        let mut indexed = self.indexed_frames(name)?;
        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, path)| path).collect())
    }

    /// Delete every staged frame for `name`. Returns how many were removed.
    pub fn clear(&self, name: &str) -> Result<usize, ExtractError> {
        let frames = self.indexed_frames(name)?;
        for (_, path) in &frames {
            fs::remove_file(path)?;
        }
        Ok(frames.len())
    }

    fn indexed_frames(&self, name: &str) -> Result<Vec<(usize, PathBuf)>, ExtractError> {
        let prefix = format!("{}_", name);
        let mut indexed = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let index = path
                .file_name()
                .and_then(|f| f.to_str())
                .and_then(|f| f.strip_prefix(&prefix))
                .and_then(|rest| rest.strip_suffix(".png"))
                .and_then(|idx| idx.parse::<usize>().ok());
            if let Some(index) = index {
                indexed.push((index, path));
            }
        }
        Ok(indexed)
    }
}

/// Largest allowed window start. The window may start anywhere in
/// `0..=n-K-2`, which collapses to 0 for videos of K..K+2 frames.
fn window_start_limit(frame_count: usize, frames: usize) -> usize {
    frame_count.saturating_sub(frames + 2)
}
