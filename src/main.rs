// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;

use crate::config::{AlertConfig, AssetPaths};
use crate::environment::RuntimeEnvironment;
use crate::hotplug::DeviceEventSource;
use crate::instance::InstanceLock;
use crate::notifier::{DetachedPlayback, NotificationCoordinator};
use crate::overlay::{AlertOverlay, X11Backend};

#[macro_use]
extern crate tracing;

mod audio;
mod config;
mod environment;
mod error;
mod hotplug;
mod instance;
mod notifier;
mod overlay;

fn setup_logs() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(format!(
        "warn,{}=info",
        env!("CARGO_CRATE_NAME")
    )));

    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    setup_logs();

    let config = AlertConfig::default();
    let env = RuntimeEnvironment::resolve();
    debug!("Runtime environment: {:?}", env);
    env.export_for_audio_client(&config);

    let _lock =
        InstanceLock::acquire_or_skip(&env.runtime_dir).context("Cannot start hotplug alerts")?;

    let assets = AssetPaths::resolve();
    let overlay = AlertOverlay::new(X11Backend::new(&env.display), config.fade);
    let playback = DetachedPlayback::new(config.clone(), env.clone());
    let mut coordinator = NotificationCoordinator::new(overlay, playback, config, assets);

    let mut source =
        DeviceEventSource::open().context("Failed to subscribe to USB hotplug events")?;

    let err = source.run(|event| {
        coordinator.handle(event);
    });
    source.close();

    Err(anyhow::Error::new(err).context("USB hotplug monitoring stopped"))
}
