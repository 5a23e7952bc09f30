// SPDX-License-Identifier: GPL-3.0-only
//! Host mixer control
//!
//! Stream enumeration and muting go through `pactl`, which works against both
//! PulseAudio and PipeWire's pulse server.

use std::ffi::OsString;
use std::process::Command;

use crate::environment::RuntimeEnvironment;
use crate::error::MixerError;

const PACTL: &str = "pactl";

/// One active output stream, as numbered by the audio server
///
/// Ids are reused by the server, so handles are only valid for the pass
/// that enumerated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AudioStreamHandle {
    pub id: u32,
}

/// Narrow view of the host mixer used for ducking
pub trait AudioMixerControl {
    /// Currently active output streams
    fn list_streams(&self) -> Result<Vec<AudioStreamHandle>, MixerError>;

    fn set_stream_mute(&self, stream: AudioStreamHandle, muted: bool) -> Result<(), MixerError>;

    /// Set the default sink's level (0-100)
    fn set_master_volume(&self, percent: u8) -> Result<(), MixerError>;
}

/// `AudioMixerControl` over the `pactl` command line tool
#[derive(Debug, Clone)]
pub struct PactlMixer {
    envs: Vec<(&'static str, OsString)>,
}

impl PactlMixer {
    pub fn new(env: &RuntimeEnvironment) -> Self {
        Self {
            envs: env
                .audio_vars()
                .iter()
                .map(|(key, value)| (*key, value.to_os_string()))
                .collect(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, MixerError> {
        debug!("Running {} {}", PACTL, args.join(" "));

        let output = Command::new(PACTL)
            .args(args)
            .envs(self.envs.iter().cloned())
            .output()
            .map_err(|source| MixerError::Spawn { program: PACTL, source })?;

        if !output.status.success() {
            return Err(MixerError::CommandFailed {
                command: format!("{} {}", PACTL, args.join(" ")),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl AudioMixerControl for PactlMixer {
    fn list_streams(&self) -> Result<Vec<AudioStreamHandle>, MixerError> {
        let stdout = self.run(&["list", "short", "sink-inputs"])?;
        parse_sink_inputs(&stdout)
    }

    fn set_stream_mute(&self, stream: AudioStreamHandle, muted: bool) -> Result<(), MixerError> {
        let id = stream.id.to_string();
        self.run(&["set-sink-input-mute", id.as_str(), if muted { "1" } else { "0" }])?;
        Ok(())
    }

    fn set_master_volume(&self, percent: u8) -> Result<(), MixerError> {
        let level = format!("{}%", percent.min(100));
        self.run(&["set-sink-volume", "@DEFAULT_SINK@", level.as_str()])?;
        Ok(())
    }
}

/// Parse `pactl list short sink-inputs`
///
/// Each line is tab separated and starts with the sink input index.
pub fn parse_sink_inputs(stdout: &str) -> Result<Vec<AudioStreamHandle>, MixerError> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let index = line.split_whitespace().next().unwrap_or_default();
            index
                .parse()
                .map(|id| AudioStreamHandle { id })
                .map_err(|_| MixerError::Parse(line.to_string()))
        })
        .collect()
}
