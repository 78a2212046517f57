//! Interface registry: enumeration and lookup on top of a driver.

use tracing::{debug, instrument};

use crate::device::Interface;
use crate::driver::CaptureDriver;
use crate::error::DriverError;

/// Every interface the driver reports, in driver order. No side effects.
#[instrument(level = "debug", skip(driver))]
pub fn list_interfaces<D: CaptureDriver + ?Sized>(driver: &D) -> Result<Vec<Interface>, DriverError> {
    let interfaces = driver.list_interfaces()?;
    debug!("Enumerated {} interfaces", interfaces.len());
    Ok(interfaces)
}

/// Finds an interface by name or description.
pub fn find_interface<D: CaptureDriver + ?Sized>(
    driver: &D,
    name: &str,
) -> Result<Interface, DriverError> {
    list_interfaces(driver)?
        .into_iter()
        .find(|interface| interface.name == name || interface.description == name)
        .ok_or_else(|| DriverError::UnknownDevice(name.to_string()))
}
