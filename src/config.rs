// SPDX-License-Identifier: GPL-3.0-only
//! Alert tunables and asset lookup

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::overlay::Rgba;

/// Installed asset directory
pub const INSTALL_DIR: &str = "/opt/hotplug-alert";
/// Overrides `INSTALL_DIR`
pub const ASSET_DIR_ENV: &str = "HOTPLUG_ALERT_ASSET_DIR";

const BACKGROUND_FILE: &str = "background.png";
const SOUND_FILE: &str = "alert.mp3";
const DEV_BACKGROUND: &str = "resource/Layout/background.png";
const DEV_SOUND: &str = "resource/FX/alert.mp3";

/// Fade-out timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeConfig {
    /// Delay before the fade starts
    pub delay_before_fade: Duration,
    /// Alpha removed per frame (lower = slower fade)
    pub step: u8,
    /// Delay between frames (~16ms = 60 FPS)
    pub frame_delay: Duration,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            delay_before_fade: Duration::from_millis(100),
            step: 5,
            frame_delay: Duration::from_millis(16),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    /// Output level for the alert (0-100)
    pub volume_percent: u8,
    pub fade: FadeConfig,
    /// Wait for the audio server to register our stream before ducking
    pub settle_delay: Duration,
    /// Playback completion polling interval
    pub poll_interval: Duration,
    /// Shown when the background image is missing or unreadable
    pub fallback_color: Rgba,
    /// Application name reported to the audio server
    pub audio_identity: String,
    pub media_role: String,
    pub window_title: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            volume_percent: 100,
            fade: FadeConfig::default(),
            settle_delay: Duration::from_millis(150),
            poll_interval: Duration::from_millis(50),
            fallback_color: Rgba::new(255, 0, 90, 255),
            audio_identity: env!("CARGO_PKG_NAME").to_string(),
            media_role: "alert".to_string(),
            window_title: "USB device connected".to_string(),
        }
    }
}

/// Resolved alert assets
///
/// Paths are not guaranteed to exist; the overlay and the player check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub background: PathBuf,
    pub sound: PathBuf,
}

impl AssetPaths {
    /// Prefer the installed location, fall back to the development tree
    pub fn resolve() -> Self {
        let install_dir = std::env::var_os(ASSET_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(INSTALL_DIR));
        Self::resolve_in(&install_dir)
    }

    fn resolve_in(install_dir: &Path) -> Self {
        let paths = Self {
            background: pick(install_dir.join(BACKGROUND_FILE), DEV_BACKGROUND),
            sound: pick(install_dir.join(SOUND_FILE), DEV_SOUND),
        };
        info!(
            "Using background {} and sound {}",
            paths.background.display(),
            paths.sound.display()
        );
        paths
    }
}

fn pick(installed: PathBuf, dev_fallback: &str) -> PathBuf {
    if installed.exists() {
        installed
    } else {
        PathBuf::from(dev_fallback)
    }
}
