//! Fetch and decode work queued by the controller and run off the state
//! machine's thread. Each job yields exactly one [`Completion`].

use crate::library::Generation;
use crate::manifest::parse_manifest;
use garden_core::{AssetSource, DecodedAudio, Decoder, Error, RecordingId};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// Fetch and parse the catalog at `locator`.
    FetchManifest { locator: String },
    /// Fetch and decode the payload of an existing library entry.
    Decode {
        id: RecordingId,
        generation: Generation,
        locator: String,
    },
    /// Decode a user upload before it becomes an entry.
    DecodeUpload {
        name: String,
        digest: String,
        payload: Vec<u8>,
    },
}

#[derive(Debug)]
pub enum Completion {
    Manifest {
        locator: String,
        result: Result<Vec<String>, Error>,
    },
    Decoded {
        id: RecordingId,
        generation: Generation,
        result: Result<DecodedAudio, Error>,
    },
    Upload {
        name: String,
        digest: String,
        payload: Vec<u8>,
        result: Result<DecodedAudio, Error>,
    },
}

impl Job {
    pub async fn run(self, assets: &dyn AssetSource, decoder: &dyn Decoder) -> Completion {
        match self {
            Job::FetchManifest { locator } => {
                debug!("Fetching manifest {}", locator);
                let result = match assets.fetch(&locator).await {
                    Ok(bytes) => parse_manifest(&bytes),
                    Err(e) => Err(e),
                };
                Completion::Manifest { locator, result }
            }
            Job::Decode {
                id,
                generation,
                locator,
            } => {
                debug!("Decoding {} from {}", id, locator);
                let result = match assets.fetch(&locator).await {
                    Ok(bytes) => decoder.decode(bytes).await,
                    Err(e) => Err(e),
                };
                Completion::Decoded {
                    id,
                    generation,
                    result,
                }
            }
            Job::DecodeUpload {
                name,
                digest,
                payload,
            } => {
                debug!("Decoding upload '{}' ({} bytes)", name, payload.len());
                let result = decoder.decode(payload.clone()).await;
                Completion::Upload {
                    name,
                    digest,
                    payload,
                    result,
                }
            }
        }
    }
}
