//! Camera stream decoding
//!
//! A [`FrameSource`] produces frames on its own thread. The [`FrameAdapter`]
//! copies each borrowed buffer into an owned frame and offers it to the
//! [`StreamingDecoder`], whose workers drop frames rather than queue them
//! while busy.

/// Streaming decoder, worker pool and scan handle
pub mod decoder;
/// Image replay as a camera feed
pub mod replay;
/// Frame source trait, adapter and push-driven source
pub mod source;

pub use decoder::{CameraScan, StreamStats, StreamingDecoder};
pub use replay::ReplaySource;
pub use source::{FrameAdapter, FrameCallback, FrameEvent, FrameSource, ManualSource, Subscription};
