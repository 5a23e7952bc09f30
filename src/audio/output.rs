// SPDX-License-Identifier: GPL-3.0-only
//! Alert clip output

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rodio::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rodio::cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig};
use rodio::dynamic_mixer::{self, DynamicMixer, DynamicMixerController};
use rodio::{Decoder, Sink};

use crate::error::{InitError, PlayError};

const SAMPLE_RATE: u32 = 44_100;
const CHANNELS: u16 = 2;
const BUFFER_FRAMES: u32 = 2048;

/// Something that can play one clip at a time
pub trait ClipOutput {
    /// Decode `path` and start playing it once
    fn start(&mut self, path: &Path) -> Result<(), PlayError>;

    /// Whether the clip started last is still audible
    fn is_playing(&self) -> bool;

    /// Stop the current clip, if any
    fn halt(&mut self);

    /// Stop and release the output device
    fn close(&mut self);
}

/// 44.1kHz stereo with a fixed 2048 frame buffer
fn fixed_config() -> StreamConfig {
    StreamConfig {
        channels: CHANNELS,
        sample_rate: SampleRate(SAMPLE_RATE),
        buffer_size: BufferSize::Fixed(BUFFER_FRAMES),
    }
}

fn fill<T: Copy>(out: &mut [T], mixer: &mut DynamicMixer<f32>, convert: fn(f32) -> T) {
    for slot in out.iter_mut() {
        *slot = convert(mixer.next().unwrap_or(0.0));
    }
}

fn f32_to_i16(v: f32) -> i16 {
    (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn f32_to_u16(v: f32) -> u16 {
    ((v.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16
}

/// Build and start a cpal stream fed by a rodio mixer
fn open_stream(
    device: &Device,
    config: &StreamConfig,
    format: SampleFormat,
) -> Result<(Stream, Arc<DynamicMixerController<f32>>), InitError> {
    let (controller, mut mixer) =
        dynamic_mixer::mixer::<f32>(config.channels, config.sample_rate.0);
    let on_error = |e: rodio::cpal::StreamError| error!("Audio output error: {}", e);

    let stream = match format {
        SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _| fill(data, &mut mixer, |v| v),
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _| fill(data, &mut mixer, f32_to_i16),
            on_error,
            None,
        ),
        SampleFormat::U16 => device.build_output_stream(
            config,
            move |data: &mut [u16], _| fill(data, &mut mixer, f32_to_u16),
            on_error,
            None,
        ),
        other => return Err(InitError::Stream(format!("unsupported sample format {:?}", other))),
    }
    .map_err(|e| InitError::Stream(e.to_string()))?;

    stream.play().map_err(|e| InitError::Stream(e.to_string()))?;
    Ok((stream, controller))
}

/// Default output device, decoded and mixed through rodio
///
/// Not Send: the cpal stream must stay on the thread that opened it.
pub struct RodioOutput {
    stream: Option<Stream>,
    mixer: Arc<DynamicMixerController<f32>>,
    sink: Option<Sink>,
}

impl RodioOutput {
    /// Open the default output at 44.1kHz stereo with a fixed buffer
    ///
    /// Falls back to the device's preferred config if it rejects ours.
    pub fn open() -> Result<Self, InitError> {
        let device = rodio::cpal::default_host()
            .default_output_device()
            .ok_or(InitError::NoDevice)?;

        let (stream, mixer) = match open_stream(&device, &fixed_config(), SampleFormat::F32) {
            Ok(opened) => opened,
            Err(e) => {
                warn!(
                    "Output rejected {}Hz/{}ch/{} frames ({}), using device default",
                    SAMPLE_RATE, CHANNELS, BUFFER_FRAMES, e
                );
                let default = device
                    .default_output_config()
                    .map_err(|e| InitError::Stream(e.to_string()))?;
                open_stream(&device, &default.config(), default.sample_format())?
            }
        };

        Ok(Self {
            stream: Some(stream),
            mixer,
            sink: None,
        })
    }
}

impl ClipOutput for RodioOutput {
    fn start(&mut self, path: &Path) -> Result<(), PlayError> {
        if self.stream.is_none() {
            return Err(PlayError::Output("output closed".to_string()));
        }

        let load_failed = |reason: String| PlayError::LoadFailed {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| load_failed(e.to_string()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| load_failed(e.to_string()))?;

        let (sink, queue) = Sink::new_idle();
        self.mixer.add(queue);
        sink.append(source);

        self.halt();
        self.sink = Some(sink);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }

    fn halt(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn close(&mut self) {
        self.halt();
        self.stream = None;
    }
}
