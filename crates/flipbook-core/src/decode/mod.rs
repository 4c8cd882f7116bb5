//! Animated image decoding pipeline.
//!
//! This module provides functionality for:
//! - Draining a source byte stream into one contiguous buffer
//! - Pooling header parsers across concurrent decode calls
//! - Computing a safe power-of-two downsampling factor
//! - Driving the frame-by-frame decode loop over an opaque frame decoder
//!
//! # Architecture
//!
//! [`AnimationDecoder`] owns the orchestration only. The byte-level pieces
//! live behind trait seams: [`HeaderParser`] recovers the container header,
//! [`FrameDecoder`] (built per call by a [`DecoderFactory`]) reconstructs the
//! pixels, and a [`PixelBufferProvider`] supplies the frame buffers. Each
//! decode call is synchronous and independent end-to-end; the parser pool's
//! idle set is the only state shared between concurrent calls.
//!
//! # Failure model
//!
//! Malformed input never errors: an unreadable stream, an unusable header, or
//! a missing frame all collapse to `None` at the decode boundary, so callers
//! can cache the negative outcome and fall back to a placeholder.

mod collect;
mod pool;
mod sample;
mod types;

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};

pub use collect::collect_bytes;
pub use pool::{ParserPool, PooledParser};
pub use sample::sample_size;
pub use types::{
    ContainerHeader, DecodeError, DecodedFrame, DecoderFactory, FrameDecoder, HeaderParser,
    HeaderStatus, PixelBufferProvider,
};

use crate::animation::{Animation, AnimationResource};

/// Decodes animated-raster containers into [`AnimationResource`]s.
///
/// One decoder instance serves many decode calls, concurrently; it holds the
/// shared [`ParserPool`], the factory for the per-call frame decoder, and the
/// pixel-buffer allocator.
pub struct AnimationDecoder<P: HeaderParser, F: DecoderFactory> {
    parser_pool: Arc<ParserPool<P>>,
    factory: F,
    provider: Arc<dyn PixelBufferProvider>,
}

impl<P, F> AnimationDecoder<P, F>
where
    P: HeaderParser + Default,
    F: DecoderFactory,
{
    /// Create a decoder with its own private parser pool.
    pub fn new(factory: F, provider: Arc<dyn PixelBufferProvider>) -> Self {
        Self::with_pool(Arc::new(ParserPool::new()), factory, provider)
    }

    /// Create a decoder over an injected parser pool.
    ///
    /// Lets several decoders (or whatever owns the surrounding cache) share
    /// one pool, tying the pool's lifetime to its owner rather than to
    /// process startup.
    pub fn with_pool(
        parser_pool: Arc<ParserPool<P>>,
        factory: F,
        provider: Arc<dyn PixelBufferProvider>,
    ) -> Self {
        Self {
            parser_pool,
            factory,
            provider,
        }
    }

    /// Decode `source` into an animation sized for `target_width` x
    /// `target_height`.
    ///
    /// Returns `None` for any input that cannot produce an animation: a
    /// failing source read, an unparsable or zero-frame container, or a
    /// decoder that yields no usable frame. None of these are errors; callers
    /// treat the absence as a cacheable negative result.
    pub fn decode<R: Read>(
        &self,
        source: R,
        target_width: u32,
        target_height: u32,
    ) -> Option<AnimationResource> {
        match self.try_decode(source, target_width, target_height) {
            Ok(resource) => resource,
            Err(err) => {
                debug!("byte collection failed: {err}");
                None
            }
        }
    }

    /// Like [`decode`](Self::decode), but surfaces the byte-collection
    /// failure instead of folding it into `None`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Io` if the source stream cannot be read to the
    /// end. Malformed container contents still yield `Ok(None)`.
    pub fn try_decode<R: Read>(
        &self,
        source: R,
        target_width: u32,
        target_height: u32,
    ) -> Result<Option<AnimationResource>, DecodeError> {
        let data: Arc<[u8]> = collect_bytes(source)?.into();
        // Scoped checkout: the parser returns to the pool when `parser`
        // drops, on every exit path out of the loop below.
        let mut parser = self.parser_pool.obtain(Arc::clone(&data));
        Ok(self.decode_frames(data, target_width, target_height, &mut parser))
    }

    fn decode_frames(
        &self,
        data: Arc<[u8]>,
        target_width: u32,
        target_height: u32,
        parser: &mut PooledParser<'_, P>,
    ) -> Option<AnimationResource> {
        let start = Instant::now();

        let header = parser.parse_header();
        if !header.is_decodable() {
            // Unparsable containers report frame_count 0 or a non-Ok status.
            debug!("container header not decodable: {header:?}");
            return None;
        }

        let sample_size = sample_size(header.width, header.height, target_width, target_height);
        let mut decoder =
            self.factory
                .build(Arc::clone(&self.provider), &header, data, sample_size);

        decoder.advance();
        let first = match decoder.next_frame() {
            Some(pixels) => pixels,
            None => {
                debug!("decoder produced no first frame");
                return None;
            }
        };

        let mut frames = Vec::with_capacity(decoder.frame_count());
        frames.push(DecodedFrame::new(first, decoder.delay(0)));

        // Advance-then-read for every frame after the first; the trailing
        // advance past the last frame is part of the decoder contract.
        decoder.advance();
        for index in 1..decoder.frame_count() {
            let Some(pixels) = decoder.next_frame() else {
                // Fail closed: a hole in the frame sequence makes the whole
                // animation unusable. Hand the buffers back before bailing.
                debug!("decoder produced no frame at index {index}, aborting");
                for frame in frames {
                    self.provider.release(frame.pixels);
                }
                return None;
            };
            frames.push(DecodedFrame::new(pixels, decoder.delay(index)));
            decoder.advance();
        }

        trace!(
            "decoded {} frames at sample size {sample_size} in {:?}",
            frames.len(),
            start.elapsed()
        );
        Some(AnimationResource::new(
            Animation::from_frames(frames),
            Arc::clone(&self.provider),
        ))
    }
}
