// SPDX-License-Identifier: GPL-3.0-only
use std::fmt;

/// Placeholder for attributes missing from a raw notification
pub const UNKNOWN: &str = "unknown";

/// What happened to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Added,
    Removed,
    Other,
}

impl DeviceAction {
    /// Map a udev action string ("add", "remove", ...)
    pub fn from_udev(action: &str) -> Self {
        match action {
            "add" => Self::Added,
            "remove" => Self::Removed,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAction::Added => write!(f, "add"),
            DeviceAction::Removed => write!(f, "remove"),
            DeviceAction::Other => write!(f, "other"),
        }
    }
}

/// A normalized USB hotplug event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub action: DeviceAction,
    /// Vendor ID as reported by udev (e.g. "046d"), or "unknown"
    pub vendor_id: String,
    /// Product ID as reported by udev (e.g. "c534"), or "unknown"
    pub product_id: String,
    /// Device node (e.g. "/dev/bus/usb/001/004"), or "unknown"
    pub device_path: String,
}

impl DeviceEvent {
    pub fn new(
        action: DeviceAction,
        vendor_id: Option<&str>,
        product_id: Option<&str>,
        device_path: Option<&str>,
    ) -> Self {
        Self {
            action,
            vendor_id: vendor_id.unwrap_or(UNKNOWN).to_string(),
            product_id: product_id.unwrap_or(UNKNOWN).to_string(),
            device_path: device_path.unwrap_or(UNKNOWN).to_string(),
        }
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Action: {}\nVendor: {}\nProduct: {}\nNode: {}",
            self.action, self.vendor_id, self.product_id, self.device_path
        )
    }
}
