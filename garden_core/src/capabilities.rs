//! Capabilities the host runtime provides to the garden.

use crate::{DecodedAudio, Error};
use async_trait::async_trait;

/// Turns an encoded audio payload into playable PCM.
#[async_trait]
pub trait Decoder: Send + Sync {
    async fn decode(&self, payload: Vec<u8>) -> Result<DecodedAudio, Error>;
}

/// Resolves a source locator to its raw bytes.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, Error>;
}
