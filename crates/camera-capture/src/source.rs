//! Frame sources feeding the detection loop

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::{CameraError, CaptureConfig, VideoFrame};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// A pull-based producer of video frames.
///
/// `next_frame` resolves to `Ok(None)` once the source is exhausted or
/// released. Implementations must be safe to drop mid-await: the detection
/// loop races `next_frame` against its stop signal.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<VideoFrame>, CameraError>> + Send;

    /// Give up the underlying device/stream. Idempotent.
    fn release(&mut self);
}

/// Plays back a directory of stills at a fixed frame rate
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    looped: bool,
    period: Duration,
    ticker: Option<Interval>,
    sequence: u32,
    started: Instant,
    released: bool,
}

impl ImageSequenceSource {
    /// Open the configured directory; stills are played in file-name order
    pub fn open(config: &CaptureConfig) -> Result<Self, CameraError> {
        if config.fps == 0 {
            return Err(CameraError::Format("fps must be greater than zero".into()));
        }

        let entries = std::fs::read_dir(&config.directory).map_err(|e| {
            CameraError::Open(format!("{}: {}", config.directory.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(CameraError::Open(format!(
                "no images found in {}",
                config.directory.display()
            )));
        }

        info!(
            "Opened image sequence {} ({} frames @ {} fps)",
            config.directory.display(),
            paths.len(),
            config.fps
        );

        Ok(Self {
            paths,
            cursor: 0,
            looped: config.looped,
            period: Duration::from_secs_f64(1.0 / config.fps as f64),
            ticker: None,
            sequence: 0,
            started: Instant::now(),
            released: false,
        })
    }

    /// Number of stills in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.released {
            return Ok(None);
        }
        if self.cursor >= self.paths.len() {
            if !self.looped {
                return Ok(None);
            }
            self.cursor = 0;
        }

        // Created lazily: an interval needs a running tokio runtime.
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        ticker.tick().await;

        let path = &self.paths[self.cursor];
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CameraError::Stream(format!("{}: {}", path.display(), e)))?;
        let mut frame = VideoFrame::decode(&bytes)?;
        frame.sequence = self.sequence;
        frame.timestamp_ns = self.started.elapsed().as_nanos() as u64;

        self.cursor += 1;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if !self.released {
            debug!("Releasing image sequence after {} frames", self.sequence);
            self.released = true;
            self.ticker = None;
        }
    }
}

/// Frames pushed from elsewhere, e.g. a capture thread or a websocket
pub struct ChannelFrameSource {
    rx: mpsc::Receiver<VideoFrame>,
}

impl ChannelFrameSource {
    /// Create a bounded source and the sender feeding it
    pub fn new(capacity: usize) -> (mpsc::Sender<VideoFrame>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

impl FrameSource for ChannelFrameSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        Ok(self.rx.recv().await)
    }

    fn release(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn write_stills(dir: &std::path::Path, count: usize) {
        for i in 0..count {
            let img = RgbImage::new(2 + i as u32, 2);
            img.save_with_format(dir.join(format!("frame_{:03}.png", i)), ImageFormat::Png)
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_sequence_plays_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_stills(dir.path(), 3);

        let mut source = ImageSequenceSource::open(&CaptureConfig::directory(dir.path())).unwrap();
        assert_eq!(source.len(), 3);

        let mut widths = Vec::new();
        while let Some(frame) = source.next_frame().await.unwrap() {
            assert_eq!(frame.sequence as usize, widths.len());
            widths.push(frame.width);
        }
        assert_eq!(widths, vec![2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_sequence_loops_until_released() {
        let dir = tempfile::tempdir().unwrap();
        write_stills(dir.path(), 2);

        let config = CaptureConfig {
            looped: true,
            ..CaptureConfig::directory(dir.path())
        };
        let mut source = ImageSequenceSource::open(&config).unwrap();
        for _ in 0..5 {
            assert!(source.next_frame().await.unwrap().is_some());
        }

        source.release();
        source.release();
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[test]
    fn test_open_rejects_empty_directory_and_zero_fps() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequenceSource::open(&CaptureConfig::directory(dir.path())),
            Err(CameraError::Open(_))
        ));

        let config = CaptureConfig {
            fps: 0,
            ..CaptureConfig::directory(dir.path())
        };
        assert!(matches!(
            ImageSequenceSource::open(&config),
            Err(CameraError::Format(_))
        ));
    }

    #[tokio::test]
    async fn test_channel_source_ends_when_senders_drop() {
        let (tx, mut source) = ChannelFrameSource::new(4);
        tx.send(VideoFrame::new(vec![0; 3], 1, 1, 0, 0)).await.unwrap();
        drop(tx);

        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_channel_source_release_closes_sender() {
        let (tx, mut source) = ChannelFrameSource::new(1);
        source.release();
        assert!(tx.send(VideoFrame::new(vec![0; 3], 1, 1, 0, 0)).await.is_err());
    }
}
