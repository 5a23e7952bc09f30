// SPDX-License-Identifier: GPL-3.0-only
//! Blocking, filtered stream of USB attach events

use crate::error::SubscriptionError;

use super::event::{DeviceAction, DeviceEvent};
use super::udev_monitor::UdevChannel;

/// One notification as read off the kernel channel, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNotification {
    pub action: Option<String>,
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub devnode: Option<String>,
}

impl RawNotification {
    /// Normalize into a `DeviceEvent`, or `None` if this is not a device addition
    pub fn normalize(&self) -> Option<DeviceEvent> {
        let action = DeviceAction::from_udev(self.action.as_deref()?);
        if action != DeviceAction::Added {
            return None;
        }

        Some(DeviceEvent::new(
            action,
            self.vendor_id.as_deref(),
            self.product_id.as_deref(),
            self.devnode.as_deref(),
        ))
    }
}

/// A kernel-level notification channel with a pollable wait descriptor
pub trait NotificationChannel {
    /// Block until the channel signals readiness
    fn wait_readable(&mut self) -> Result<(), SubscriptionError>;

    /// Take one pending notification, if the channel has one
    fn receive(&mut self) -> Option<RawNotification>;
}

/// Presents USB attach events one at a time
///
/// Runs on the main thread. Bursts are buffered by the kernel-side socket
/// queue, so there is no in-process queue here.
pub struct DeviceEventSource<C = UdevChannel> {
    channel: C,
}

impl DeviceEventSource<UdevChannel> {
    /// Subscribe to `usb/usb_device` hotplug notifications
    pub fn open() -> Result<Self, SubscriptionError> {
        let channel = UdevChannel::new()?;
        info!("USB hotplug monitoring started (usb/usb_device)");
        Ok(Self { channel })
    }
}

impl<C: NotificationChannel> DeviceEventSource<C> {
    pub fn with_channel(channel: C) -> Self {
        Self { channel }
    }

    /// Block until the next device addition and return it
    ///
    /// Notifications for any other action are dropped and the wait resumes.
    /// Returns an error only if waiting on the channel itself fails.
    pub fn wait_next(&mut self) -> Result<DeviceEvent, SubscriptionError> {
        loop {
            debug!("Waiting for udev events...");
            self.channel.wait_readable()?;

            let Some(raw) = self.channel.receive() else {
                debug!("Poll indicated ready but no event available");
                continue;
            };

            match raw.normalize() {
                Some(event) => {
                    info!(
                        "USB device added: vendor={} product={} node={}",
                        event.vendor_id, event.product_id, event.device_path
                    );
                    return Ok(event);
                }
                None => {
                    debug!("Ignoring udev action {:?}", raw.action);
                }
            }
        }
    }

    /// Dispatch every device addition to `callback`, forever
    ///
    /// The next wait starts only after the callback returns. Returns only if
    /// the channel fails.
    pub fn run<F>(&mut self, mut callback: F) -> SubscriptionError
    where
        F: FnMut(&DeviceEvent),
    {
        loop {
            match self.wait_next() {
                Ok(event) => callback(&event),
                Err(e) => {
                    error!("USB hotplug monitoring stopped: {}", e);
                    return e;
                }
            }
        }
    }

    /// Release the subscription
    pub fn close(self) {
        drop(self.channel);
        debug!("USB hotplug subscription released");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Channel that replays queued notifications and fails once drained
    struct FakeChannel {
        pending: VecDeque<Option<RawNotification>>,
    }

    impl FakeChannel {
        fn new(items: Vec<Option<RawNotification>>) -> Self {
            Self {
                pending: items.into(),
            }
        }
    }

    impl NotificationChannel for FakeChannel {
        fn wait_readable(&mut self) -> Result<(), SubscriptionError> {
            if self.pending.is_empty() {
                return Err(SubscriptionError::Poll(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "drained",
                )));
            }
            Ok(())
        }

        fn receive(&mut self) -> Option<RawNotification> {
            self.pending.pop_front().flatten()
        }
    }

    fn raw(
        action: Option<&str>,
        vendor: Option<&str>,
        product: Option<&str>,
        node: Option<&str>,
    ) -> RawNotification {
        RawNotification {
            action: action.map(String::from),
            vendor_id: vendor.map(String::from),
            product_id: product.map(String::from),
            devnode: node.map(String::from),
        }
    }

    #[test]
    fn test_skips_non_add_actions() {
        let mut source = DeviceEventSource::with_channel(FakeChannel::new(vec![
            Some(raw(Some("remove"), Some("046d"), Some("c534"), None)),
            Some(raw(Some("change"), None, None, None)),
            Some(raw(Some("bind"), Some("1234"), Some("5678"), None)),
            None,
            Some(raw(None, Some("dead"), Some("beef"), None)),
            Some(raw(Some("add"), Some("046d"), Some("c534"), Some("/dev/bus/usb/001/004"))),
        ]));

        let event = source.wait_next().unwrap();
        assert_eq!(event.action, DeviceAction::Added);
        assert_eq!(event.vendor_id, "046d");
        assert_eq!(event.product_id, "c534");
        assert_eq!(event.device_path, "/dev/bus/usb/001/004");
    }

    #[test]
    fn test_never_returns_removals() {
        let mut source = DeviceEventSource::with_channel(FakeChannel::new(vec![
            Some(raw(Some("remove"), Some("046d"), Some("c534"), None)),
            Some(raw(Some("remove"), None, None, None)),
        ]));

        assert!(matches!(source.wait_next(), Err(SubscriptionError::Poll(_))));
    }

    #[test]
    fn test_missing_attributes_substituted() {
        let cases = [
            raw(Some("add"), None, None, None),
            raw(Some("add"), Some("046d"), None, None),
            raw(Some("add"), None, Some("c534"), None),
            raw(Some("add"), None, None, Some("/dev/bus/usb/002/007")),
        ];

        for case in cases {
            let event = case.normalize().unwrap();
            assert_eq!(event.action, DeviceAction::Added);
            assert_eq!(event.vendor_id, case.vendor_id.as_deref().unwrap_or("unknown"));
            assert_eq!(event.product_id, case.product_id.as_deref().unwrap_or("unknown"));
            assert_eq!(event.device_path, case.devnode.as_deref().unwrap_or("unknown"));
        }
    }

    #[test]
    fn test_run_dispatches_in_order() {
        let mut source = DeviceEventSource::with_channel(FakeChannel::new(vec![
            Some(raw(Some("add"), Some("aaaa"), None, None)),
            Some(raw(Some("remove"), Some("aaaa"), None, None)),
            Some(raw(Some("add"), Some("bbbb"), None, None)),
        ]));

        let mut seen = Vec::new();
        let err = source.run(|event| seen.push(event.vendor_id.clone()));

        assert!(matches!(err, SubscriptionError::Poll(_)));
        assert_eq!(seen, vec!["aaaa", "bbbb"]);
    }
}
