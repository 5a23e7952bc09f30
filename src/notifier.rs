// SPDX-License-Identifier: GPL-3.0-only
//! One audiovisual alert per USB device addition
//!
//! The overlay runs on the calling thread and blocks until the fade ends.
//! The sound plays on a detached thread; its failures are only logged.

use std::path::{Path, PathBuf};

use crate::audio::AudioDucker;
use crate::config::{AlertConfig, AssetPaths};
use crate::environment::RuntimeEnvironment;
use crate::hotplug::DeviceEvent;
use crate::overlay::{AlertOverlay, OverlayBackend, Rgba};

/// Blocking visual phase of an alert
pub trait Presenter {
    fn present(&mut self, title: &str, image_path: &Path, fallback: Rgba);
}

impl<B: OverlayBackend> Presenter for AlertOverlay<B> {
    fn present(&mut self, title: &str, image_path: &Path, fallback: Rgba) {
        AlertOverlay::present(self, title, image_path, fallback);
    }
}

/// Fire-and-forget audio phase of an alert
pub trait SoundLauncher {
    fn launch(&self, sound_path: &Path, volume_percent: u8);
}

/// Plays the alert on its own short-lived thread with a fresh `AudioDucker`
///
/// The audio output is opened on the playback thread because the stream
/// cannot move between threads.
pub struct DetachedPlayback {
    config: AlertConfig,
    env: RuntimeEnvironment,
}

impl DetachedPlayback {
    pub fn new(config: AlertConfig, env: RuntimeEnvironment) -> Self {
        Self { config, env }
    }
}

impl SoundLauncher for DetachedPlayback {
    fn launch(&self, sound_path: &Path, volume_percent: u8) {
        let config = self.config.clone();
        let env = self.env.clone();
        let path: PathBuf = sound_path.to_path_buf();

        let spawned = std::thread::Builder::new()
            .name("alert-audio".to_string())
            .spawn(move || {
                let mut ducker = match AudioDucker::initialize(&config, &env) {
                    Ok(ducker) => ducker,
                    Err(e) => {
                        warn!("Sound system initialization failed, alert is visual only: {}", e);
                        return;
                    }
                };

                if let Err(e) = ducker.play(&path, volume_percent) {
                    error!("Alert playback failed: {}", e);
                }
                ducker.shutdown();
            });

        // Detached: the handle is dropped and the result never observed
        if let Err(e) = spawned {
            error!("Failed to spawn audio thread: {}", e);
        }
    }
}

/// Sequences overlay and sound for each incoming event
pub struct NotificationCoordinator<P: Presenter, S: SoundLauncher> {
    presenter: P,
    sound: S,
    config: AlertConfig,
    assets: AssetPaths,
}

impl<P: Presenter, S: SoundLauncher> NotificationCoordinator<P, S> {
    pub fn new(presenter: P, sound: S, config: AlertConfig, assets: AssetPaths) -> Self {
        Self {
            presenter,
            sound,
            config,
            assets,
        }
    }

    /// Run one alert for `event`; returns once the fade has finished
    ///
    /// Returns the message describing the event.
    pub fn handle(&mut self, event: &DeviceEvent) -> String {
        let message = event.to_string();
        info!("{}\n{}", self.config.window_title, message);

        if self.assets.sound.exists() {
            self.sound.launch(&self.assets.sound, self.config.volume_percent);
        } else {
            warn!("Sound file missing: {}", self.assets.sound.display());
        }

        self.presenter.present(
            &self.config.window_title,
            &self.assets.background,
            self.config.fallback_color,
        );

        message
    }
}
