//! # hlspack Core
//!
//! Core types shared across the hlspack packager:
//! - Error handling types
//! - Media sample abstraction
//! - Track time-scale conversions
//! - Codec identifiers and decoder-configuration records

pub mod codec;
pub mod error;
pub mod sample;
pub mod timescale;

pub use codec::{AacConfig, AvcConfig, CodecId, HevcConfig};
pub use error::{ContainerError, Error, Result};
pub use sample::Sample;
pub use timescale::TimeScale;
