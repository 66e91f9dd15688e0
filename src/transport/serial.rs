//! RS-232 instruments (`ASRL<port>::INSTR`) over `tokio-serial`.

use std::time::Duration;

use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, warn};

use super::stream::StreamSession;
use crate::error::{Error, Result};
use crate::resource::ResourceAddress;

/// VISA's default serial settings: 8 data bits, no parity, one stop bit.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

pub type SerialSession = StreamSession<SerialStream>;

/// Map the port part of an `ASRL` resource to an OS device. A bare number
/// follows the VISA convention (`ASRL1` is `COM1`, or `/dev/ttyS0` on Unix);
/// anything else is taken as a device path.
pub fn device_path(port: &str) -> String {
    match port.parse::<u32>() {
        Ok(n) if cfg!(windows) => format!("COM{n}"),
        Ok(n) => format!("/dev/ttyS{}", n.saturating_sub(1)),
        Err(_) => port.to_string(),
    }
}

/// The resource string that names an OS serial port.
pub fn resource_for_port(port_name: &str) -> String {
    match port_name.strip_prefix("COM").and_then(|n| n.parse::<u32>().ok()) {
        Some(n) => format!("ASRL{n}::INSTR"),
        None => format!("ASRL{port_name}::INSTR"),
    }
}

/// Serial ports the OS reports, as resource strings.
pub fn discover() -> Vec<String> {
    match tokio_serial::available_ports() {
        Ok(ports) => ports
            .iter()
            .map(|p| resource_for_port(&p.port_name))
            .collect(),
        Err(e) => {
            warn!("serial port enumeration failed: {e}");
            Vec::new()
        }
    }
}

pub fn open(
    address: &ResourceAddress,
    port: &str,
    baud_rate: u32,
    io_timeout: Duration,
) -> Result<SerialSession> {
    let path = device_path(port);
    debug!("serial open -> {path} at {baud_rate} baud");
    let stream = tokio_serial::new(&path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(io_timeout)
        .open_native_async()
        .map_err(|e| Error::Connect {
            resource: address.to_string(),
            cause: e.into(),
        })?;
    Ok(StreamSession::new(stream, address, io_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_ports_follow_visa_convention() {
        if cfg!(windows) {
            assert_eq!(device_path("3"), "COM3");
        } else {
            assert_eq!(device_path("1"), "/dev/ttyS0");
        }
        assert_eq!(device_path("/dev/ttyUSB0"), "/dev/ttyUSB0");
    }

    #[test]
    fn os_port_names_become_resources() {
        assert_eq!(resource_for_port("COM4"), "ASRL4::INSTR");
        assert_eq!(resource_for_port("/dev/ttyACM0"), "ASRL/dev/ttyACM0::INSTR");
        let address: ResourceAddress = resource_for_port("/dev/ttyACM0").parse().unwrap();
        assert_eq!(address.interface().kind(), "ASRL");
    }

    #[tokio::test]
    async fn missing_port_is_a_connect_error() {
        let address: ResourceAddress = "ASRL/dev/instrument-console-missing::INSTR".parse().unwrap();
        let err = open(&address, "/dev/instrument-console-missing", DEFAULT_BAUD_RATE, Duration::from_millis(50))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connect { .. }), "{err}");
    }
}
