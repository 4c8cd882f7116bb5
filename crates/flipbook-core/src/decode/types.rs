//! Core types and trait seams for animation decoding.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for animation decoding operations.
///
/// Malformed input is deliberately *not* represented here: an unparsable or
/// empty container is a soft "no result" outcome at the decode boundary, not
/// an error. Only faults that indicate a broken environment surface as
/// `DecodeError`.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// I/O error while collecting the source stream.
    #[error("I/O error while reading source: {0}")]
    Io(#[from] std::io::Error),
}

/// Status reported by the container header parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeaderStatus {
    /// The header parsed cleanly.
    #[default]
    Ok,
    /// The buffer does not hold a well-formed container.
    FormatError,
    /// The buffer could not be opened as a container at all.
    OpenError,
}

/// Metadata recovered from a container header.
///
/// `width` and `height` are the native canvas dimensions and are positive for
/// any header with [`HeaderStatus::Ok`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerHeader {
    /// Number of frames the container declares.
    pub frame_count: u32,
    /// Native canvas width in pixels.
    pub width: u32,
    /// Native canvas height in pixels.
    pub height: u32,
    /// Parse status.
    pub status: HeaderStatus,
}

impl ContainerHeader {
    /// Whether this header may drive frame decoding.
    ///
    /// A header with zero frames or a non-Ok status never reaches the frame
    /// decode loop; decode short-circuits to "no result" instead.
    pub fn is_decodable(&self) -> bool {
        self.frame_count > 0 && self.status == HeaderStatus::Ok
    }
}

/// A single decoded frame: an exclusively-owned pixel buffer plus its display
/// delay.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// RGBA pixel data for this frame.
    pub pixels: RgbaImage,
    /// How long this frame stays on screen.
    pub delay: Duration,
}

impl DecodedFrame {
    /// Create a frame from a decoded pixel buffer and its delay.
    pub fn new(pixels: RgbaImage, delay: Duration) -> Self {
        Self { pixels, delay }
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

/// Parses container headers out of a bound byte buffer.
///
/// Instances are pooled across decode calls (see
/// [`ParserPool`](super::ParserPool)); `bind` and `clear` are the only
/// mutation points for the bound buffer. Implementations may cache parsed
/// state between `parse_header` calls on the same buffer; `clear` must drop
/// both the buffer and any such cache.
pub trait HeaderParser {
    /// Bind the parser to a new input buffer.
    fn bind(&mut self, data: Arc<[u8]>);

    /// Parse the header of the currently bound buffer.
    ///
    /// Parse failures are reported through [`ContainerHeader::status`], not
    /// as errors.
    fn parse_header(&mut self) -> ContainerHeader;

    /// Drop the bound buffer and any cached parse state.
    fn clear(&mut self);
}

/// The opaque per-frame decompressor this pipeline drives.
///
/// The protocol is stateful: `advance` moves the decoder's cursor, then
/// `next_frame` reconstructs the frame under the cursor. The decode loop
/// advances once more than it reads after frame 0; that asymmetry is part of
/// the decoder contract, not something implementations should compensate for.
pub trait FrameDecoder {
    /// Move the internal frame cursor forward.
    fn advance(&mut self);

    /// Reconstruct the frame under the cursor, or `None` if it cannot be
    /// produced.
    fn next_frame(&mut self) -> Option<RgbaImage>;

    /// Total number of frames the decoder will produce.
    fn frame_count(&self) -> usize;

    /// Display delay for the frame at `index`.
    fn delay(&self, index: usize) -> Duration;
}

/// Builds a [`FrameDecoder`] bound to one decode call's inputs.
pub trait DecoderFactory {
    /// The concrete decoder this factory produces.
    type Decoder: FrameDecoder;

    /// Construct a decoder over `data`, allocating frame buffers through
    /// `provider` and downsampling by `sample_size`.
    fn build(
        &self,
        provider: Arc<dyn PixelBufferProvider>,
        header: &ContainerHeader,
        data: Arc<[u8]>,
        sample_size: u32,
    ) -> Self::Decoder;
}

/// Allocator capability for reusable pixel buffers.
///
/// Reuse-pool policy is entirely the implementor's concern; this pipeline
/// only promises to hand every buffer it took back through `release` when an
/// animation is recycled or a decode aborts mid-loop.
pub trait PixelBufferProvider: Send + Sync {
    /// Obtain an RGBA buffer of the given dimensions.
    fn obtain(&self, width: u32, height: u32) -> RgbaImage;

    /// Return a buffer for reuse or disposal.
    fn release(&self, buffer: RgbaImage);
}
