//! Capturable devices and device filters.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::Serialize;

/// Name of the filter that captures on every interface at once.
pub const ALL_DEVICES: &str = "all";

/// Interface state bits, as reported by libpcap (`PCAP_IF_*`).
pub mod flags {
    pub const LOOPBACK: u32 = 0x0000_0001;
    pub const UP: u32 = 0x0000_0002;
    pub const RUNNING: u32 = 0x0000_0004;
    pub const WIRELESS: u32 = 0x0000_0008;
}

/// One address bound to an interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InterfaceAddress {
    #[serde(rename = "IP")]
    pub ip: IpAddr,
    pub netmask: Option<IpAddr>,
    #[serde(rename = "Broadaddr")]
    pub broadcast: Option<IpAddr>,
    #[serde(rename = "P2P")]
    pub point_to_point: Option<IpAddr>,
}

impl InterfaceAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            netmask: None,
            broadcast: None,
            point_to_point: None,
        }
    }
}

/// A capturable network device. Snapshots are immutable; re-enumerate to refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Interface {
    pub name: String,
    pub description: String,
    pub flags: u32,
    pub addresses: Vec<InterfaceAddress>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            flags: 0,
            addresses: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_address(mut self, address: InterfaceAddress) -> Self {
        self.addresses.push(address);
        self
    }
}

/// Which interface(s) a capture stream is scoped to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceFilter {
    All,
    Named(String),
}

impl DeviceFilter {
    /// Label used in logs and on produced summaries.
    pub fn label(&self) -> &str {
        match self {
            DeviceFilter::All => ALL_DEVICES,
            DeviceFilter::Named(name) => name,
        }
    }

    /// Device name handed to libpcap; `all` maps to the `any` pseudo-device.
    pub fn pcap_name(&self) -> &str {
        match self {
            DeviceFilter::All => "any",
            DeviceFilter::Named(name) => name,
        }
    }
}

impl From<&str> for DeviceFilter {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ALL_DEVICES) {
            DeviceFilter::All
        } else {
            DeviceFilter::Named(value.to_string())
        }
    }
}

impl From<String> for DeviceFilter {
    fn from(value: String) -> Self {
        DeviceFilter::from(value.as_str())
    }
}

impl FromStr for DeviceFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DeviceFilter::from(s))
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
