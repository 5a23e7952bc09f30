// SPDX-License-Identifier: GPL-3.0-only
//! Display and audio server discovery
//!
//! Resolved once at startup so the daemon behaves the same from a desktop
//! session and from a systemd user service, where `DISPLAY` and friends may be
//! missing.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::AlertConfig;

const DEFAULT_DISPLAY: &str = ":0";

/// Where the display and the audio server live for this process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnvironment {
    /// X11 display name
    pub display: String,
    /// XDG runtime directory of the session user
    pub runtime_dir: PathBuf,
    /// PulseAudio/PipeWire-pulse server address
    pub pulse_server: String,
}

impl RuntimeEnvironment {
    /// Read from the process environment, filling in session defaults
    pub fn resolve() -> Self {
        let uid = unsafe { libc::getuid() };
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::runtime_dir(), uid)
    }

    fn from_lookup<F>(lookup: F, runtime_dir: Option<PathBuf>, uid: u32) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let display = lookup("DISPLAY")
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DISPLAY.to_string());

        let runtime_dir = runtime_dir.unwrap_or_else(|| PathBuf::from(format!("/run/user/{uid}")));

        let pulse_server = lookup("PULSE_SERVER")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_pulse_server(&runtime_dir));

        Self {
            display,
            runtime_dir,
            pulse_server,
        }
    }

    /// Variables handed to every audio control command
    pub fn audio_vars(&self) -> [(&'static str, &OsStr); 2] {
        [
            ("PULSE_SERVER", OsStr::new(&self.pulse_server)),
            ("XDG_RUNTIME_DIR", self.runtime_dir.as_os_str()),
        ]
    }

    /// Export server locations and stream identity for in-process clients
    ///
    /// The audio output library only reads the process environment. Must run
    /// before any other thread is spawned. Variables already set are kept,
    /// except the stream identity which always comes from the config.
    pub fn export_for_audio_client(&self, config: &AlertConfig) {
        let vars: [(&str, &OsStr, bool); 5] = [
            ("DISPLAY", OsStr::new(&self.display), false),
            ("XDG_RUNTIME_DIR", self.runtime_dir.as_os_str(), false),
            ("PULSE_SERVER", OsStr::new(&self.pulse_server), false),
            ("PULSE_PROP_application.name", OsStr::new(&config.audio_identity), true),
            ("PULSE_PROP_media.role", OsStr::new(&config.media_role), true),
        ];

        for (key, value, overwrite) in vars {
            if overwrite || std::env::var_os(key).is_none() {
                debug!("Setting {}={:?}", key, value);
                // SAFETY: called from main before any thread exists
                unsafe { std::env::set_var(key, value) };
            }
        }
    }
}

fn default_pulse_server(runtime_dir: &Path) -> String {
    format!("unix:{}", runtime_dir.join("pulse/native").display())
}
