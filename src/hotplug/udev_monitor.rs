use std::ffi::OsStr;
use std::os::fd::AsRawFd;

use crate::error::SubscriptionError;

use super::source::{NotificationChannel, RawNotification};

const SUBSYSTEM: &str = "usb";
const DEVTYPE: &str = "usb_device";

/// udev netlink socket filtered to whole USB devices
///
/// udev's MonitorSocket is not Send, so this lives on the thread that created it.
/// It uses libc::poll() to wait for events on the udev socket.
pub struct UdevChannel {
    socket: udev::MonitorSocket,
}

impl UdevChannel {
    /// Create a new udev monitor for USB device events
    ///
    /// The usb_device devtype skips per-interface events, so one plug gives one event.
    pub fn new() -> Result<Self, SubscriptionError> {
        let socket = udev::MonitorBuilder::new()
            .map_err(SubscriptionError::Monitor)?
            .match_subsystem_devtype(SUBSYSTEM, DEVTYPE)
            .map_err(|source| SubscriptionError::Filter {
                subsystem: SUBSYSTEM,
                devtype: DEVTYPE,
                source,
            })?
            .listen()
            .map_err(SubscriptionError::Listen)?;

        Ok(Self { socket })
    }
}

impl NotificationChannel for UdevChannel {
    fn wait_readable(&mut self) -> Result<(), SubscriptionError> {
        let mut poll_fd = libc::pollfd {
            fd: self.socket.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        // Block until socket has data (negative timeout = wait forever)
        let poll_result = unsafe { libc::poll(&mut poll_fd, 1, -1) };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                debug!("Poll interrupted, retrying");
                return Ok(());
            }
            error!("Poll error: {}", err);
            return Err(SubscriptionError::Poll(err));
        }

        debug!("Poll returned {}, revents: {}", poll_result, poll_fd.revents);
        Ok(())
    }

    fn receive(&mut self) -> Option<RawNotification> {
        let event = self.socket.iter().next()?;

        debug!(
            "udev event: type={:?}, subsystem={:?}, devtype={:?}, syspath={:?}",
            event.event_type(),
            event.subsystem(),
            event.devtype(),
            event.syspath()
        );

        let text = |value: Option<&OsStr>| value.map(|v| v.to_string_lossy().into_owned());

        Some(RawNotification {
            action: text(event.action()),
            vendor_id: text(event.attribute_value("idVendor")),
            product_id: text(event.attribute_value("idProduct")),
            devnode: event.devnode().map(|p| p.to_string_lossy().into_owned()),
        })
    }
}
