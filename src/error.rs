// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the alert daemon
//!
//! Only `SubscriptionError` and `InstanceError` are fatal. Everything else is
//! logged by the component that hit it and the alert degrades.

use std::path::PathBuf;

use thiserror::Error;

/// The udev hotplug channel could not be set up
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("Failed to create udev monitor: {0}")]
    Monitor(#[source] std::io::Error),

    #[error("Failed to install filter {subsystem}/{devtype}: {source}")]
    Filter {
        subsystem: &'static str,
        devtype: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to enable receiving on udev socket: {0}")]
    Listen(#[source] std::io::Error),

    #[error("Poll on udev socket failed: {0}")]
    Poll(#[source] std::io::Error),
}

/// Audio output could not be opened
#[derive(Error, Debug)]
pub enum InitError {
    #[error("No default audio output device")]
    NoDevice,

    #[error("Failed to open audio output: {0}")]
    Stream(String),
}

/// A single playback failed
#[derive(Error, Debug)]
pub enum PlayError {
    #[error("Could not load sound {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },

    #[error("Audio output unavailable: {0}")]
    Output(String),
}

/// Talking to the audio server's control utility failed
#[derive(Error, Debug)]
pub enum MixerError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Unexpected output from pactl: {0}")]
    Parse(String),
}

/// Display connection or window creation failed
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Failed to connect to display {display}: {reason}")]
    Connect { display: String, reason: String },

    #[error("Required X11 extension missing: {0}")]
    MissingExtension(&'static str),

    #[error("Failed to create window: {0}")]
    Create(String),
}

/// Renderer creation or a frame upload failed
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Unsupported pixel format: depth {depth}, {bits_per_pixel} bpp")]
    UnsupportedFormat { depth: u8, bits_per_pixel: u8 },

    #[error("Failed to allocate frame buffer: {0}")]
    Buffer(String),

    #[error("Renderer not created")]
    NoRenderer,

    #[error("X11 request failed: {0}")]
    Request(String),
}

/// Another daemon already owns the hotplug alerts
#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("Another instance already holds {0}")]
    AlreadyRunning(PathBuf),

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Background image could not be decoded
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),
}

/// One alert's visual phase was aborted
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
