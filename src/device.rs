//! Device capability snapshot.
//!
//! The camera SDK is an external collaborator. What the resolver needs from
//! it is captured once, after the device is connected, as a
//! `DeviceCapabilities` value: which sensor sockets are populated and how the
//! device is linked to the host.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Board socket a sensor is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSocket {
    Left,
    Right,
    Color,
    Auto,
    CamD,
    CamE,
}

/// Link protocol between host and device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportProtocol {
    /// Vendor-specific USB class, the high-throughput USB link.
    UsbVsc,
    UsbCdc,
    Pcie,
    Ipc,
    TcpIp,
    Any,
}

impl TransportProtocol {
    pub fn is_high_throughput_usb(self) -> bool {
        self == TransportProtocol::UsbVsc
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportProtocol::UsbVsc => "X_LINK_USB_VSC",
            TransportProtocol::UsbCdc => "X_LINK_USB_CDC",
            TransportProtocol::Pcie => "X_LINK_PCIE",
            TransportProtocol::Ipc => "X_LINK_IPC",
            TransportProtocol::TcpIp => "X_LINK_TCP_IP",
            TransportProtocol::Any => "X_LINK_ANY_PROTOCOL",
        };
        f.write_str(name)
    }
}

/// Negotiated USB link speed, slowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsbSpeed {
    Unknown,
    Low,
    Full,
    High,
    Super,
    SuperPlus,
}

impl UsbSpeed {
    /// USB 3 tiers.
    pub fn is_super_speed(self) -> bool {
        self >= UsbSpeed::Super
    }
}

impl fmt::Display for UsbSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UsbSpeed::Unknown => "UNKNOWN",
            UsbSpeed::Low => "LOW",
            UsbSpeed::Full => "FULL",
            UsbSpeed::High => "HIGH",
            UsbSpeed::Super => "SUPER",
            UsbSpeed::SuperPlus => "SUPER_PLUS",
        };
        f.write_str(name)
    }
}

/// Read-only snapshot of what the attached device supports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    pub connected_camera_sockets: BTreeSet<CameraSocket>,
    pub transport_protocol: TransportProtocol,
    pub usb_link_speed: UsbSpeed,
}

impl DeviceCapabilities {
    pub fn new(
        sockets: impl IntoIterator<Item = CameraSocket>,
        transport_protocol: TransportProtocol,
        usb_link_speed: UsbSpeed,
    ) -> Self {
        Self {
            connected_camera_sockets: sockets.into_iter().collect(),
            transport_protocol,
            usb_link_speed,
        }
    }

    /// Both mono sensors of the stereo pair are present.
    pub fn has_stereo_pair(&self) -> bool {
        self.connected_camera_sockets.contains(&CameraSocket::Left)
            && self.connected_camera_sockets.contains(&CameraSocket::Right)
    }
}

/// Supplies capabilities once the device is connected.
pub trait DeviceDiscovery {
    fn capabilities(&self) -> Result<DeviceCapabilities>;
}

/// Capabilities recorded in a JSON file, e.g. captured from an earlier run.
#[derive(Clone, Debug)]
pub struct JsonDeviceDiscovery {
    path: PathBuf,
}

impl JsonDeviceDiscovery {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DeviceDiscovery for JsonDeviceDiscovery {
    fn capabilities(&self) -> Result<DeviceCapabilities> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            anyhow!(
                "failed to read device capabilities {}: {}",
                self.path.display(),
                e
            )
        })?;
        let caps = serde_json::from_str(&raw).map_err(|e| {
            anyhow!(
                "invalid device capabilities {}: {}",
                self.path.display(),
                e
            )
        })?;
        Ok(caps)
    }
}

impl DeviceDiscovery for DeviceCapabilities {
    fn capabilities(&self) -> Result<DeviceCapabilities> {
        Ok(self.clone())
    }
}
