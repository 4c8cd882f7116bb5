//! Decoded animation object and its resource lifecycle.
//!
//! An [`Animation`] is the renderable product of a decode: ordered frames
//! with per-frame display delays, playback state, and a lazily-built draw
//! cache for the first frame. An [`AnimationResource`] wraps an animation
//! with the lifecycle the surrounding cache drives: `initialize` on first
//! use, `recycle` on discard.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::decode::{DecodedFrame, PixelBufferProvider};

/// A fully-decoded animation: ordered frames plus playback state.
///
/// Frame order is display order and is fixed at construction; the frame list
/// is append-only during decode and never reordered. The animation itself
/// supports repeated playback via [`frame_at`](Animation::frame_at).
#[derive(Debug)]
pub struct Animation {
    frames: Vec<DecodedFrame>,
    running: bool,
    first_frame_cache: Option<RgbaImage>,
}

impl Animation {
    /// Assemble an animation from decoded frames in display order.
    pub fn from_frames(frames: Vec<DecodedFrame>) -> Self {
        debug_assert!(!frames.is_empty(), "animations have at least one frame");
        Self {
            frames,
            running: false,
            first_frame_cache: None,
        }
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// All frames in display order.
    pub fn frames(&self) -> &[DecodedFrame] {
        &self.frames
    }

    /// The frame shown before playback starts.
    pub fn first_frame(&self) -> &DecodedFrame {
        &self.frames[0]
    }

    /// Length of one playback loop: the sum of all frame delays.
    pub fn total_duration(&self) -> Duration {
        self.frames.iter().map(|frame| frame.delay).sum()
    }

    /// Index of the frame on screen `elapsed` into looped playback.
    ///
    /// Delays are positional and cumulative: frame `i` is on screen from the
    /// sum of delays `0..i` until that sum plus its own delay. Elapsed times
    /// past one loop wrap around.
    pub fn frame_at(&self, elapsed: Duration) -> usize {
        let total = self.total_duration();
        if total.is_zero() {
            return 0;
        }
        let mut remaining =
            Duration::from_nanos((elapsed.as_nanos() % total.as_nanos()) as u64);
        for (index, frame) in self.frames.iter().enumerate() {
            if remaining < frame.delay {
                return index;
            }
            remaining -= frame.delay;
        }
        self.frames.len() - 1
    }

    /// Begin playback progression.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Halt playback progression.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether playback is progressing.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Build the first frame's draw cache if it is not built yet.
    ///
    /// The cache is a premultiplied-alpha raster of frame 0, ready for
    /// immediate compositing the moment the animation becomes visible.
    pub fn prepare_first_frame(&mut self) {
        if self.first_frame_cache.is_none() {
            self.first_frame_cache = Some(premultiply(&self.frames[0].pixels));
        }
    }

    /// The premultiplied draw cache for frame 0, if prepared.
    pub fn first_frame_cache(&self) -> Option<&RgbaImage> {
        self.first_frame_cache.as_ref()
    }

    /// Total footprint of all frame buffers and the draw cache, in bytes.
    pub fn byte_size(&self) -> usize {
        let frames: usize = self.frames.iter().map(DecodedFrame::byte_size).sum();
        let cache = self
            .first_frame_cache
            .as_ref()
            .map_or(0, |cache| cache.as_raw().len());
        frames + cache
    }

    fn take_frames(&mut self) -> Vec<DecodedFrame> {
        self.first_frame_cache = None;
        mem::take(&mut self.frames)
    }
}

fn premultiply(source: &RgbaImage) -> RgbaImage {
    let mut cache = source.clone();
    for pixel in cache.pixels_mut() {
        let alpha = u16::from(pixel[3]);
        for channel in 0..3 {
            pixel[channel] = ((u16::from(pixel[channel]) * alpha) / 255) as u8;
        }
    }
    cache
}

/// Lifecycle state of an [`AnimationResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Decoded but not yet handed to a consumer.
    Uninitialized,
    /// In use: draw cache prepared, playback started.
    Initialized,
    /// Discarded: playback stopped, frame buffers released. Terminal.
    Recycled,
}

/// An [`Animation`] plus the lifecycle hooks its owner drives.
pub struct AnimationResource {
    animation: Animation,
    state: Lifecycle,
    provider: Arc<dyn PixelBufferProvider>,
}

impl AnimationResource {
    /// Wrap a freshly-decoded animation. Frame buffers are released to
    /// `provider` on recycle.
    pub fn new(animation: Animation, provider: Arc<dyn PixelBufferProvider>) -> Self {
        Self {
            animation,
            state: Lifecycle::Uninitialized,
            provider,
        }
    }

    /// The wrapped animation.
    pub fn get(&self) -> &Animation {
        &self.animation
    }

    /// Mutable access for playback control.
    pub fn get_mut(&mut self) -> &mut Animation {
        &mut self.animation
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Memory footprint for cache accounting, in bytes.
    pub fn size(&self) -> usize {
        self.animation.byte_size()
    }

    /// Signal first use: prepare frame 0 for immediate display and start
    /// playback.
    ///
    /// Caller contract is exactly-once, before any `recycle`. Violations are
    /// a debug assertion failure and a no-op in release builds.
    pub fn initialize(&mut self) {
        debug_assert_eq!(
            self.state,
            Lifecycle::Uninitialized,
            "initialize is a one-shot transition from Uninitialized"
        );
        if self.state != Lifecycle::Uninitialized {
            return;
        }
        self.animation.prepare_first_frame();
        self.animation.start();
        self.state = Lifecycle::Initialized;
    }

    /// Discard the resource: stop playback and release every frame buffer
    /// back to the provider.
    ///
    /// Legal from any state, including directly from `Uninitialized`, and
    /// idempotent once recycled. There is no transition out of `Recycled`.
    pub fn recycle(&mut self) {
        if self.state == Lifecycle::Recycled {
            return;
        }
        self.animation.stop();
        for frame in self.animation.take_frames() {
            self.provider.release(frame.pixels);
        }
        self.state = Lifecycle::Recycled;
    }
}

impl fmt::Debug for AnimationResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationResource")
            .field("state", &self.state)
            .field("frame_count", &self.animation.frame_count())
            .field("byte_size", &self.animation.byte_size())
            .finish()
    }
}
