use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::socket::SocketSession;
use super::vxi11::Vxi11Session;
use super::{Session, Transport};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::resource::{Interface, ResourceAddress};

/// The bus the console runs against.
///
/// Network resources go over VXI-11 or raw sockets, serial resources over
/// `tokio-serial` and USB, GPIB and HiSLIP resources through the system
/// VISA library. The last two are cargo features; without them those
/// resources parse but cannot be opened.
///
/// Discovery asks the local buses what is attached, then appends the
/// configured network candidates, which cannot be found by scanning. With
/// `probe` enabled, only candidates that accept a connection within the
/// timeout are reported.
pub struct VisaBus {
    candidates: Vec<String>,
    probe: bool,
    scan: bool,
    #[cfg_attr(not(feature = "serial"), allow(dead_code))]
    baud_rate: u32,
    timeout: Duration,
}

impl VisaBus {
    pub fn new(candidates: Vec<String>, probe: bool, timeout: Duration) -> Self {
        Self {
            candidates,
            probe,
            scan: true,
            baud_rate: 9600,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.discovery.resources.clone(), config.discovery.probe, config.timeout())
            .scan(config.discovery.scan)
            .baud_rate(config.serial.baud_rate)
    }

    /// Whether `list` asks the local buses what is attached.
    pub fn scan(mut self, scan: bool) -> Self {
        self.scan = scan;
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    async fn reachable(&mut self, resource: &str) -> bool {
        let address = match resource.parse::<ResourceAddress>() {
            Ok(address) => address,
            Err(e) => {
                warn!("skipping discovery candidate: {e}");
                return false;
            }
        };
        match self.open(&address).await {
            Ok(mut session) => {
                if let Err(e) = session.close().await {
                    debug!("closing {resource} after the reachability check failed: {e}");
                }
                true
            }
            Err(e) => {
                debug!("{resource} is unreachable: {e}");
                false
            }
        }
    }

    /// Resources attached to the local buses.
    async fn scanned(&self) -> Vec<String> {
        let mut found = Vec::new();
        #[cfg(feature = "visa")]
        match super::visa::find_resources().await {
            Ok(resources) => found.extend(resources),
            Err(e) => warn!("VISA discovery failed: {e}"),
        }
        #[cfg(feature = "serial")]
        found.extend(super::serial::discover());
        found
    }

    #[cfg(feature = "serial")]
    fn open_serial(&self, address: &ResourceAddress, port: &str) -> Result<Box<dyn Session>> {
        let session = super::serial::open(address, port, self.baud_rate, self.timeout)?;
        Ok(Box::new(session))
    }

    #[cfg(not(feature = "serial"))]
    fn open_serial(&self, address: &ResourceAddress, _port: &str) -> Result<Box<dyn Session>> {
        Err(unsupported(address, "serial"))
    }

    #[cfg(feature = "visa")]
    async fn open_visa(&self, address: &ResourceAddress) -> Result<Box<dyn Session>> {
        let session = super::visa::VisaSession::open(address, self.timeout).await?;
        Ok(Box::new(session))
    }

    #[cfg(not(feature = "visa"))]
    async fn open_visa(&self, address: &ResourceAddress) -> Result<Box<dyn Session>> {
        Err(unsupported(address, "visa"))
    }
}

#[cfg_attr(all(feature = "serial", feature = "visa"), allow(dead_code))]
fn unsupported(address: &ResourceAddress, feature: &'static str) -> Error {
    Error::UnsupportedInterface {
        interface: address.interface().kind(),
        feature,
        resource: address.to_string(),
    }
}

/// Scanned resources first, then the candidates that were not already
/// found, both in their own order.
fn merge(mut found: Vec<String>, candidates: Vec<String>) -> Vec<String> {
    for candidate in candidates {
        if !found.iter().any(|f| f.eq_ignore_ascii_case(&candidate)) {
            found.push(candidate);
        }
    }
    found
}

#[async_trait(?Send)]
impl Transport for VisaBus {
    async fn list(&mut self) -> Result<Vec<String>> {
        let found = if self.scan { self.scanned().await } else { Vec::new() };
        let candidates = if self.probe {
            let mut reachable = Vec::new();
            for resource in self.candidates.clone() {
                if self.reachable(&resource).await {
                    reachable.push(resource);
                }
            }
            reachable
        } else {
            self.candidates.clone()
        };
        Ok(merge(found, candidates))
    }

    async fn open(&mut self, address: &ResourceAddress) -> Result<Box<dyn Session>> {
        match address.interface() {
            Interface::Vxi11 { host, device, .. } => {
                let session = Vxi11Session::connect(address, host, device, self.timeout).await?;
                Ok(Box::new(session))
            }
            Interface::Socket { host, port, .. } => {
                let session = SocketSession::connect(address, host, *port, self.timeout).await?;
                Ok(Box::new(session))
            }
            Interface::Serial { port } => self.open_serial(address, port),
            Interface::Usb { .. } | Interface::Gpib { .. } | Interface::Hislip { .. } => {
                self.open_visa(address).await
            }
        }
    }
}
