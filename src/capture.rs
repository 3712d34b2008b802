use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::Arc;

use crate::constants::audio::SAMPLE_RATE;

/// Sink callback receiving 16 kHz mono signed 16-bit LE PCM bytes.
pub type ByteSink = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Acquires an audio device and delivers raw PCM bytes to a sink callback.
///
/// Implementations own the format conversion: whatever the device negotiates,
/// the sink always receives the target format.
pub trait CaptureSource {
    fn start(&mut self, sink: ByteSink) -> Result<()>;
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// cpal-backed capture from the default input device.
///
/// Requests 16 kHz; when unsupported, keeps the device's nearest rate and
/// resamples in the stream callback so the accumulator only ever sees
/// 16 kHz mono i16 bytes.
pub struct CpalCapture {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl CpalCapture {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .context("No input device available")?;

        log::info!("using audio input device: {}", device.name()?);

        let default_config = device
            .default_input_config()
            .context("Failed to get default input config")?;

        let mut config: StreamConfig = default_config.clone().into();

        // Prefer the engine's native rate when the device supports it
        let supported_configs = device
            .supported_input_configs()
            .context("Failed to query supported input configs")?;
        let mut found_16k = false;
        for supported in supported_configs {
            if supported.min_sample_rate().0 <= SAMPLE_RATE as u32
                && supported.max_sample_rate().0 >= SAMPLE_RATE as u32
            {
                config.sample_rate = cpal::SampleRate(SAMPLE_RATE as u32);
                found_16k = true;
                break;
            }
        }

        if !found_16k {
            log::warn!(
                "16kHz not supported, capturing at {} Hz and resampling",
                config.sample_rate.0
            );
        }

        log::info!(
            "audio config: {} channels at {} Hz",
            config.channels,
            config.sample_rate.0
        );

        Ok(CpalCapture {
            device,
            config,
            stream: None,
        })
    }
}

impl CaptureSource for CpalCapture {
    fn start(&mut self, sink: ByteSink) -> Result<()> {
        if self.stream.is_some() {
            return Ok(()); // Already capturing
        }

        let channels = self.config.channels as usize;
        let device_rate = self.config.sample_rate.0;

        let err_fn = |err| log::error!("audio stream error: {}", err);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = downmix_to_mono(data, channels);
                    let at_rate = if device_rate != SAMPLE_RATE as u32 {
                        resample(&mono, device_rate, SAMPLE_RATE as u32)
                    } else {
                        mono
                    };
                    sink(&to_i16_le_bytes(&at_rate));
                },
                err_fn,
                None,
            )
            .context("Failed to build input stream (check microphone permissions)")?;

        stream.play().context("Failed to start audio stream")?;

        self.stream = Some(stream);
        log::info!("capture started");

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("capture stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn downmix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

// Linear interpolation resampling, fine for speech input
fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (input.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let src_idx_floor = src_idx.floor() as usize;
        let src_idx_ceil = (src_idx_floor + 1).min(input.len() - 1);
        let frac = src_idx - src_idx_floor as f64;

        let sample =
            input[src_idx_floor] * (1.0 - frac) as f32 + input[src_idx_ceil] * frac as f32;
        output.push(sample);
    }

    output
}

fn to_i16_le_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix_to_mono(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let mono = [0.1, 0.2];
        assert_eq!(downmix_to_mono(&mono, 1), vec![0.1, 0.2]);
    }

    #[test]
    fn resample_halves_at_double_rate() {
        let input: Vec<f32> = (0..32000).map(|i| (i % 7) as f32).collect();
        let output = resample(&input, 32000, 16000);
        assert_eq!(output.len(), 16000);
    }

    #[test]
    fn resample_is_identity_at_same_rate() {
        let input = [0.1, 0.2, 0.3];
        assert_eq!(resample(&input, 16000, 16000), input.to_vec());
    }

    #[test]
    fn i16_conversion_clamps_and_round_trips_sign() {
        let bytes = to_i16_le_bytes(&[0.0, 1.0, -1.0, 2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 0);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 32767);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), -32767);
        // Out-of-range input clamps instead of wrapping
        assert_eq!(i16::from_le_bytes([bytes[6], bytes[7]]), 32767);
    }
}
