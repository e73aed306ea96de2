use audio::Mixer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use garden_core::Error;
use log::{error, info, warn};

/// An open output stream rendering a [`Mixer`].
///
/// The stream stops when this value is dropped.
pub struct OutputDevice {
    _stream: cpal::Stream,
    name: String,
    sample_rate: u32,
    channels: u16,
}

impl OutputDevice {
    /// Opens `preferred` (or the system default) and starts rendering.
    ///
    /// Returns the device together with the mixer feeding it; the mixer runs
    /// at the device's sample rate.
    pub fn open(preferred: Option<&str>) -> Result<(Self, Mixer), Error> {
        let host = cpal::default_host();

        let device = match preferred.filter(|name| !name.is_empty()) {
            Some(wanted) => {
                let found = host
                    .output_devices()
                    .map_err(|e| Error::Audio(format!("Failed to list output devices: {}", e)))?
                    .find(|device| device.name().map(|n| n == wanted).unwrap_or(false));
                match found {
                    Some(device) => Some(device),
                    None => {
                        warn!("Output device '{}' not found, using default", wanted);
                        host.default_output_device()
                    }
                }
            }
            None => host.default_output_device(),
        }
        .ok_or_else(|| Error::Audio("No output device found".to_string()))?;

        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let supported = device
            .default_output_config()
            .map_err(|e| Error::Audio(format!("Default config not supported: {}", e)))?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let mixer = Mixer::new(config.sample_rate.0);
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer.clone())?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer.clone())?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer.clone())?,
            other => {
                return Err(Error::Audio(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::Audio(format!("Failed to start audio stream: {}", e)))?;

        info!(
            "Opened output '{}' at {} Hz, {} channels",
            name, config.sample_rate.0, config.channels
        );

        Ok((
            Self {
                _stream: stream,
                name,
                sample_rate: config.sample_rate.0,
                channels: config.channels,
            },
            mixer,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Mixer,
) -> Result<cpal::Stream, Error>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    let err_fn = |err: cpal::StreamError| {
        error!("an error occurred on the output stream: {}", err);
    };

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.render(&mut scratch, channels);
                for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                    *dst = T::from_sample(src);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| Error::Audio(format!("Failed to build output stream: {}", e)))
}

/// Names of the output devices the default host can see.
pub fn list_output_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.output_devices() {
        Ok(devices) => devices.filter_map(|device| device.name().ok()).collect(),
        Err(e) => {
            warn!("Failed to enumerate output devices: {}", e);
            Vec::new()
        }
    }
}
