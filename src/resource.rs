//! VISA resource strings.
//!
//! Only the forms this tool can route are modelled:
//!
//! ```text
//! TCPIP[board]::host[::device]::INSTR     VXI-11 (device defaults to inst0)
//! TCPIP[board]::host::hislipN::INSTR      HiSLIP
//! TCPIP[board]::host::port::SOCKET        raw SCPI socket
//! USB[board]::vid::pid::serial[::intf]::INSTR
//! GPIB[board]::primary[::secondary]::INSTR
//! ASRL<port>::INSTR
//! ```
//!
//! Interface keywords and the resource class are case-insensitive; the
//! original text is kept for display and for reporting back to the operator.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const DEFAULT_VXI11_DEVICE: &str = "inst0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interface {
    Vxi11 {
        board: u16,
        host: String,
        device: String,
    },
    Hislip {
        board: u16,
        host: String,
        device: String,
    },
    Socket {
        board: u16,
        host: String,
        port: u16,
    },
    Usb {
        board: u16,
        vendor_id: String,
        product_id: String,
        serial: String,
        interface_number: Option<u16>,
    },
    Gpib {
        board: u16,
        primary: u8,
        secondary: Option<u8>,
    },
    Serial {
        port: String,
    },
}

impl Interface {
    /// Short name of the bus, as it appears in VISA resource strings.
    pub fn kind(&self) -> &'static str {
        match self {
            Interface::Vxi11 { .. } => "VXI-11",
            Interface::Hislip { .. } => "HiSLIP",
            Interface::Socket { .. } => "SOCKET",
            Interface::Usb { .. } => "USBTMC",
            Interface::Gpib { .. } => "GPIB",
            Interface::Serial { .. } => "ASRL",
        }
    }
}

/// A parsed resource string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
    raw: String,
    interface: Interface,
}

impl ResourceAddress {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Human-readable breakdown, one `key: value` pair per line.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Resource", self.raw.clone()),
            ("Interface", self.interface.kind().to_string()),
        ];
        match &self.interface {
            Interface::Vxi11 { board, host, device } | Interface::Hislip { board, host, device } => {
                lines.push(("Board", board.to_string()));
                lines.push(("Host", host.clone()));
                lines.push(("Device", device.clone()));
            }
            Interface::Socket { board, host, port } => {
                lines.push(("Board", board.to_string()));
                lines.push(("Host", host.clone()));
                lines.push(("Port", port.to_string()));
            }
            Interface::Usb {
                board,
                vendor_id,
                product_id,
                serial,
                interface_number,
            } => {
                lines.push(("Board", board.to_string()));
                lines.push(("Vendor ID", vendor_id.clone()));
                lines.push(("Product ID", product_id.clone()));
                lines.push(("Serial", serial.clone()));
                if let Some(n) = interface_number {
                    lines.push(("USB interface", n.to_string()));
                }
            }
            Interface::Gpib {
                board,
                primary,
                secondary,
            } => {
                lines.push(("Board", board.to_string()));
                lines.push(("Primary address", primary.to_string()));
                if let Some(s) = secondary {
                    lines.push(("Secondary address", s.to_string()));
                }
            }
            Interface::Serial { port } => {
                lines.push(("Port", port.clone()));
            }
        }
        lines
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ResourceAddress {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let raw = input.trim().trim_matches('"').trim();
        let invalid = |reason: &str| Error::InvalidResource {
            resource: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("resource string is empty"));
        }

        let parts: Vec<&str> = raw.split("::").map(str::trim).collect();
        if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("expected <interface>::...::<class>"));
        }

        let class = parts[parts.len() - 1].to_ascii_uppercase();
        let fields = &parts[1..parts.len() - 1];
        let head = parts[0];
        let head_upper = head.to_ascii_uppercase();

        let interface = if let Some(board) = head_upper.strip_prefix("TCPIP") {
            let board = parse_board(board).ok_or_else(|| invalid("bad TCPIP board number"))?;
            match (class.as_str(), fields) {
                ("INSTR", [host]) => Interface::Vxi11 {
                    board,
                    host: host.to_string(),
                    device: DEFAULT_VXI11_DEVICE.to_string(),
                },
                ("INSTR", [host, device]) if device.to_ascii_lowercase().starts_with("hislip") => {
                    Interface::Hislip {
                        board,
                        host: host.to_string(),
                        device: device.to_string(),
                    }
                }
                ("INSTR", [host, device]) => Interface::Vxi11 {
                    board,
                    host: host.to_string(),
                    device: device.to_string(),
                },
                ("SOCKET", [host, port]) => Interface::Socket {
                    board,
                    host: host.to_string(),
                    port: port
                        .parse()
                        .map_err(|_| invalid("socket port must be a number in 0..=65535"))?,
                },
                ("SOCKET", _) => return Err(invalid("expected TCPIP::<host>::<port>::SOCKET")),
                ("INSTR", _) => return Err(invalid("expected TCPIP::<host>[::<device>]::INSTR")),
                _ => return Err(invalid("TCPIP resources end in ::INSTR or ::SOCKET")),
            }
        } else if let Some(board) = head_upper.strip_prefix("USB") {
            let board = parse_board(board).ok_or_else(|| invalid("bad USB board number"))?;
            if class != "INSTR" {
                return Err(invalid("USB resources end in ::INSTR"));
            }
            match fields {
                [vid, pid, serial] | [vid, pid, serial, _] => Interface::Usb {
                    board,
                    vendor_id: vid.to_string(),
                    product_id: pid.to_string(),
                    serial: serial.to_string(),
                    interface_number: match fields.get(3) {
                        Some(n) => Some(
                            n.parse()
                                .map_err(|_| invalid("USB interface number must be numeric"))?,
                        ),
                        None => None,
                    },
                },
                _ => return Err(invalid("expected USB::<vid>::<pid>::<serial>[::<intf>]::INSTR")),
            }
        } else if let Some(board) = head_upper.strip_prefix("GPIB") {
            let board = parse_board(board).ok_or_else(|| invalid("bad GPIB board number"))?;
            if class != "INSTR" {
                return Err(invalid("GPIB resources end in ::INSTR"));
            }
            let address = |s: &str| -> Result<u8, Error> {
                s.parse::<u8>()
                    .ok()
                    .filter(|a| *a <= 30)
                    .ok_or_else(|| invalid("GPIB addresses are 0..=30"))
            };
            match fields {
                [primary] => Interface::Gpib {
                    board,
                    primary: address(primary)?,
                    secondary: None,
                },
                [primary, secondary] => Interface::Gpib {
                    board,
                    primary: address(primary)?,
                    secondary: Some(address(secondary)?),
                },
                _ => return Err(invalid("expected GPIB::<primary>[::<secondary>]::INSTR")),
            }
        } else if head_upper.starts_with("ASRL") {
            if class != "INSTR" || !fields.is_empty() {
                return Err(invalid("expected ASRL<port>::INSTR"));
            }
            let port = &head[4..];
            if port.is_empty() {
                return Err(invalid("serial resources need a port, e.g. ASRL1::INSTR"));
            }
            Interface::Serial {
                port: port.to_string(),
            }
        } else {
            return Err(invalid("unknown interface type"));
        };

        Ok(ResourceAddress {
            raw: raw.to_string(),
            interface,
        })
    }
}

fn parse_board(digits: &str) -> Option<u16> {
    if digits.is_empty() {
        Some(0)
    } else {
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ResourceAddress {
        s.parse().unwrap()
    }

    #[test]
    fn vxi11_defaults_device_and_board() {
        let addr = parse("TCPIP::192.168.0.232::INSTR");
        assert_eq!(
            addr.interface(),
            &Interface::Vxi11 {
                board: 0,
                host: "192.168.0.232".into(),
                device: "inst0".into(),
            }
        );
        assert_eq!(addr.as_str(), "TCPIP::192.168.0.232::INSTR");
    }

    #[test]
    fn vxi11_explicit_device_and_lowercase_keywords() {
        let addr = parse("tcpip1::scope.lab::gpib0,5::instr");
        assert_eq!(
            addr.interface(),
            &Interface::Vxi11 {
                board: 1,
                host: "scope.lab".into(),
                device: "gpib0,5".into(),
            }
        );
    }

    #[test]
    fn hislip_and_socket() {
        assert_eq!(parse("TCPIP0::10.0.0.2::hislip0::INSTR").interface().kind(), "HiSLIP");
        assert_eq!(
            parse("TCPIP0::10.0.0.2::5025::SOCKET").interface(),
            &Interface::Socket {
                board: 0,
                host: "10.0.0.2".into(),
                port: 5025,
            }
        );
    }

    #[test]
    fn usb_gpib_serial() {
        let usb = parse("USB0::0x1AB1::0x0588::DS1ED141904883::INSTR");
        assert!(matches!(usb.interface(), Interface::Usb { interface_number: None, .. }));
        let usb = parse("USB0::0x0957::0x1798::MY123::0::INSTR");
        assert!(matches!(usb.interface(), Interface::Usb { interface_number: Some(0), .. }));

        assert_eq!(
            parse("GPIB0::2::INSTR").interface(),
            &Interface::Gpib {
                board: 0,
                primary: 2,
                secondary: None,
            }
        );
        assert_eq!(
            parse("ASRL/dev/ttyUSB0::INSTR").interface(),
            &Interface::Serial {
                port: "/dev/ttyUSB0".into(),
            }
        );
    }

    #[test]
    fn surrounding_quotes_are_stripped() {
        assert_eq!(parse("\"GPIB0::2::INSTR\"").as_str(), "GPIB0::2::INSTR");
    }

    #[test]
    fn malformed_strings_are_rejected() {
        for bad in [
            "",
            "INSTR",
            "FOO0::1::INSTR",
            "TCPIP0::host::notaport::SOCKET",
            "TCPIP0::host::INSTR::EXTRA",
            "GPIB0::31::INSTR",
            "USB0::0x1::INSTR",
            "TCPIP0::::INSTR",
        ] {
            let err = bad.parse::<ResourceAddress>().unwrap_err();
            assert!(matches!(err, Error::InvalidResource { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn describe_lists_socket_fields() {
        let addr = parse("TCPIP0::10.0.0.2::5025::SOCKET");
        let lines = addr.describe();
        assert!(lines.contains(&("Interface", "SOCKET".to_string())));
        assert!(lines.contains(&("Port", "5025".to_string())));
    }
}
