//! Live capture through libpcap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pcap::{Active, Capture};
use tracing::{debug, info, instrument};

use netpeek_core::events::{LinkType, RawFrame};

use crate::device::{DeviceFilter, Interface, InterfaceAddress};
use crate::driver::{CaptureDriver, FrameSource};
use crate::error::DriverError;

/// Parameters applied to every stream the driver opens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Snapshot length in bytes.
    pub snaplen: i32,
    pub promiscuous: bool,
    /// Read timeout in milliseconds; bounds how long a cancelled stream takes to notice.
    pub read_timeout_ms: i32,
    pub bpf_filter: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            snaplen: 4096,
            promiscuous: false,
            read_timeout_ms: 100,
            bpf_filter: None,
        }
    }
}

/// [`CaptureDriver`] backed by libpcap.
#[derive(Clone, Debug, Default)]
pub struct PcapDriver {
    options: CaptureOptions,
}

impl PcapDriver {
    pub fn new(options: CaptureOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }
}

impl CaptureDriver for PcapDriver {
    fn list_interfaces(&self) -> Result<Vec<Interface>, DriverError> {
        let devices =
            pcap::Device::list().map_err(|e| DriverError::Enumeration(e.to_string()))?;
        Ok(devices.into_iter().map(Interface::from).collect())
    }

    #[instrument(level = "debug", skip(self), fields(device = %device))]
    fn open_stream(&self, device: &DeviceFilter) -> Result<Box<dyn FrameSource>, DriverError> {
        let name = device.pcap_name();
        let inactive = Capture::from_device(name).map_err(|e| open_error(device, e))?;

        let mut capture = inactive
            .promisc(self.options.promiscuous)
            .snaplen(self.options.snaplen)
            .timeout(self.options.read_timeout_ms)
            .immediate_mode(true)
            .open()
            .map_err(|e| open_error(device, e))?;

        if let Some(filter) = &self.options.bpf_filter {
            capture
                .filter(filter, true)
                .map_err(|e| DriverError::Filter {
                    filter: filter.clone(),
                    reason: e.to_string(),
                })?;
            debug!("Applied capture filter `{}`", filter);
        }

        let link_type = LinkType::from_dlt(capture.get_datalink().0);
        info!("Opened pcap stream on {} (link type {})", name, link_type);

        Ok(Box::new(PcapSource {
            capture,
            link_type,
            interface: Arc::from(device.label()),
        }))
    }
}

fn open_error(device: &DeviceFilter, err: pcap::Error) -> DriverError {
    let reason = err.to_string();
    let lowered = reason.to_lowercase();
    if lowered.contains("permission") || lowered.contains("not permitted") {
        DriverError::PermissionDenied(device.label().to_string())
    } else if lowered.contains("no such device") {
        DriverError::UnknownDevice(device.label().to_string())
    } else {
        DriverError::Open {
            device: device.label().to_string(),
            reason,
        }
    }
}

/// An open pcap handle. Dropping it closes the handle.
pub struct PcapSource {
    capture: Capture<Active>,
    link_type: LinkType,
    interface: Arc<str>,
}

impl FrameSource for PcapSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, DriverError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let header = packet.header;
                let captured_at = timestamp(header.ts.tv_sec as i64, header.ts.tv_usec as i64);
                Ok(Some(RawFrame::copy_from_slice(
                    self.interface.clone(),
                    self.link_type,
                    captured_at,
                    header.len,
                    packet.data,
                )))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(pcap::Error::NoMorePackets) => {
                Err(DriverError::StreamEnded(self.interface.to_string()))
            }
            Err(e) => Err(DriverError::Read(e.to_string())),
        }
    }

    fn link_type(&self) -> LinkType {
        self.link_type
    }
}

fn timestamp(seconds: i64, micros: i64) -> DateTime<Utc> {
    let nanos = u32::try_from(micros.clamp(0, 999_999) * 1_000).unwrap_or(0);
    DateTime::<Utc>::from_timestamp(seconds, nanos).unwrap_or_else(Utc::now)
}

impl From<pcap::Address> for InterfaceAddress {
    fn from(address: pcap::Address) -> Self {
        Self {
            ip: address.addr,
            netmask: address.netmask,
            broadcast: address.broadcast_addr,
            point_to_point: address.dst_addr,
        }
    }
}

impl From<pcap::Device> for Interface {
    fn from(device: pcap::Device) -> Self {
        Self {
            name: device.name,
            description: device.desc.unwrap_or_default(),
            flags: device.flags.if_flags.bits(),
            addresses: device
                .addresses
                .into_iter()
                .map(InterfaceAddress::from)
                .collect(),
        }
    }
}
