use async_trait::async_trait;
use garden_core::{DecodedAudio, Decoder, Error};
use log::debug;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// [`Decoder`] backed by symphonia. Decoding runs on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

#[async_trait]
impl Decoder for SymphoniaDecoder {
    async fn decode(&self, payload: Vec<u8>) -> Result<DecodedAudio, Error> {
        tokio::task::spawn_blocking(move || decode_bytes(payload))
            .await
            .map_err(|e| Error::Decode(format!("decode task failed: {}", e)))?
    }
}

/// Decodes a complete encoded file held in memory to interleaved f32.
pub fn decode_bytes(payload: Vec<u8>) -> Result<DecodedAudio, Error> {
    if payload.is_empty() {
        return Err(Error::Decode("empty payload".to_string()));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(payload)), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("unrecognised audio format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("no audio track".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples = Vec::new();
    let mut channels = codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(format!("failed to read packet: {}", e))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count() as u16;
                sample_rate = spec.rate;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping corrupt packet: {}", e);
            }
            Err(e) => return Err(Error::Decode(format!("decode failed: {}", e))),
        }
    }

    let audio = DecodedAudio::new(samples, channels, sample_rate);
    if audio.is_empty() || sample_rate == 0 {
        return Err(Error::Decode("no audio frames".to_string()));
    }
    debug!(
        "Decoded {} frames, {} ch @ {} Hz",
        audio.frames(),
        channels,
        sample_rate
    );
    Ok(audio)
}
