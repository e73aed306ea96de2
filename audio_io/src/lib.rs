//! Audio input/output handling for the sound garden
//!
//! This crate interfaces with audio hardware using cpal and decodes
//! recordings using symphonia.

mod decoder;
mod device;

pub use decoder::{decode_bytes, SymphoniaDecoder};
pub use device::{list_output_devices, OutputDevice};
