// SPDX-License-Identifier: GPL-3.0-only
//! Temporary muting of everything but the alert stream

use super::mixer::{AudioMixerControl, AudioStreamHandle};

/// Streams muted for one alert
///
/// Every stream muted here is unmuted exactly once: by `restore`, or on drop
/// if playback bailed out before reaching it.
pub struct DuckingSession<'a, M: AudioMixerControl> {
    mixer: &'a M,
    muted: Vec<AudioStreamHandle>,
}

impl<'a, M: AudioMixerControl> DuckingSession<'a, M> {
    /// Mute every active stream except the newest, which is ours
    ///
    /// Best effort: if the mixer cannot be queried, nothing is muted and the
    /// alert plays alongside everything else.
    pub fn duck(mixer: &'a M) -> Self {
        let mut session = Self {
            mixer,
            muted: Vec::new(),
        };

        let streams = match mixer.list_streams() {
            Ok(streams) => streams,
            Err(e) => {
                warn!("Skipping audio ducking, cannot list streams: {}", e);
                return session;
            }
        };

        // The server hands out increasing indices, so the newest stream is the
        // one opened for this alert
        let Some(own) = streams.iter().max().copied() else {
            debug!("No active streams found, nothing to duck");
            return session;
        };

        for stream in streams.into_iter().filter(|s| *s != own) {
            match mixer.set_stream_mute(stream, true) {
                Ok(()) => session.muted.push(stream),
                Err(e) => warn!("Failed to mute stream {}: {}", stream.id, e),
            }
        }

        info!("Ducked {} stream(s), keeping stream {}", session.muted.len(), own.id);
        session
    }

    #[cfg(test)]
    pub fn muted(&self) -> &[AudioStreamHandle] {
        &self.muted
    }

    /// Unmute everything this session muted
    pub fn restore(mut self) {
        self.restore_all();
    }

    fn restore_all(&mut self) {
        let count = self.muted.len();
        for stream in self.muted.drain(..) {
            if let Err(e) = self.mixer.set_stream_mute(stream, false) {
                // Usually the stream ended while we played
                debug!("Failed to unmute stream {}: {}", stream.id, e);
            }
        }
        if count > 0 {
            info!("Restored {} stream(s)", count);
        }
    }
}

impl<M: AudioMixerControl> Drop for DuckingSession<'_, M> {
    fn drop(&mut self) {
        self.restore_all();
    }
}
