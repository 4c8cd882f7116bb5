//! Flipbook Core - Animated image decoding pipeline
//!
//! This crate turns a raw byte stream holding a multi-frame raster container
//! into a renderable [`AnimationResource`]: ordered bitmap frames with
//! per-frame display delays, downsampled to fit a requested target size.
//!
//! The container format and the per-frame decompressor are external concerns
//! consumed through the trait seams in [`decode`]; this crate owns the
//! orchestration around them: byte collection, header-parser pooling,
//! sample-size selection, the frame decode loop, and the produced resource's
//! lifecycle.

pub mod animation;
pub mod decode;

pub use animation::{Animation, AnimationResource, Lifecycle};
pub use decode::{
    AnimationDecoder, ContainerHeader, DecodeError, DecodedFrame, DecoderFactory, FrameDecoder,
    HeaderParser, HeaderStatus, ParserPool, PixelBufferProvider,
};
