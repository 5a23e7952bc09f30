// SPDX-License-Identifier: GPL-3.0-only
//! Alert sound playback with audio ducking
//!
//! While the alert clip plays, every other output stream on the host mixer is
//! muted, then restored once the clip ends.

pub mod ducking;
pub mod mixer;
pub mod output;

use std::path::Path;
use std::time::Duration;

use crate::config::AlertConfig;
use crate::environment::RuntimeEnvironment;
use crate::error::{InitError, PlayError};

use ducking::DuckingSession;
use mixer::{AudioMixerControl, PactlMixer};
use output::{ClipOutput, RodioOutput};

/// Owns the audio output for one alert and ducks everything else around it
pub struct AudioDucker<M: AudioMixerControl = PactlMixer, O: ClipOutput = RodioOutput> {
    mixer: M,
    output: Option<O>,
    settle_delay: Duration,
    poll_interval: Duration,
}

impl AudioDucker {
    /// Open the default output device and the pactl mixer
    ///
    /// The stream identity comes from `PULSE_PROP_*`, exported once at startup.
    pub fn initialize(config: &AlertConfig, env: &RuntimeEnvironment) -> Result<Self, InitError> {
        info!(
            "Opening audio output as {} via {}",
            config.audio_identity, env.pulse_server
        );
        let output = RodioOutput::open()?;

        Ok(Self::with_parts(
            PactlMixer::new(env),
            output,
            config.settle_delay,
            config.poll_interval,
        ))
    }
}

impl<M: AudioMixerControl, O: ClipOutput> AudioDucker<M, O> {
    pub fn with_parts(
        mixer: M,
        output: O,
        settle_delay: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            mixer,
            output: Some(output),
            settle_delay,
            poll_interval,
        }
    }

    /// Play `path` once at `volume_percent`, muting other streams meanwhile
    ///
    /// Blocks until the clip ends. Streams muted here are always unmuted
    /// before returning, however playback ended.
    pub fn play(&mut self, path: &Path, volume_percent: u8) -> Result<(), PlayError> {
        let Some(output) = self.output.as_mut() else {
            return Err(PlayError::Output("audio output is shut down".to_string()));
        };

        if let Err(e) = self.mixer.set_master_volume(volume_percent.min(100)) {
            warn!("Failed to set output volume: {}", e);
        }

        output.start(path)?;
        info!("Playing {}", path.display());

        // Give the audio server time to register our stream before listing
        std::thread::sleep(self.settle_delay);
        let session = DuckingSession::duck(&self.mixer);

        while output.is_playing() {
            std::thread::sleep(self.poll_interval);
        }
        debug!("Playback of {} finished", path.display());

        session.restore();
        Ok(())
    }

    /// Halt playback and close the output; safe to call repeatedly
    pub fn shutdown(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.close();
            debug!("Audio output closed");
        }
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.output.is_some()
    }
}

impl<M: AudioMixerControl, O: ClipOutput> Drop for AudioDucker<M, O> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
