//! USB hotplug detection using udev
//!
//! This module turns kernel hotplug notifications for USB devices into
//! normalized `DeviceEvent`s. Only device additions are surfaced.

mod event;
mod source;
mod udev_monitor;

pub use event::DeviceEvent;
pub use source::DeviceEventSource;

#[cfg(test)]
pub use event::DeviceAction;
