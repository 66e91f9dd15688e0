use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_vxi11::DeviceClient;
use tracing::debug;

use super::Session;
use crate::error::{Error, Result};
use crate::resource::ResourceAddress;

/// Upper bound for a single device_read. Large enough for a full VNA trace
/// in one transfer; screen dumps arrive over several reads.
const MAX_READ: u32 = 1 << 20;

/// A VXI-11 core channel to `TCPIP::<host>::<device>::INSTR`.
pub struct Vxi11Session {
    inner: DeviceClient,
    address: ResourceAddress,
    timeout: Duration,
}

impl Vxi11Session {
    pub async fn connect(
        address: &ResourceAddress,
        host: &str,
        device: &str,
        io_timeout: Duration,
    ) -> Result<Self> {
        debug!("VXI-11 connect -> {host} ({device})");
        let inner = DeviceClient::connect_with_timeout(host, device, io_timeout)
            .await
            .map_err(|e| Error::Connect {
                resource: address.to_string(),
                cause: e.into(),
            })?;
        Ok(Self {
            inner,
            address: address.clone(),
            timeout: io_timeout,
        })
    }
}

#[async_trait(?Send)]
impl Session for Vxi11Session {
    fn resource(&self) -> &ResourceAddress {
        &self.address
    }

    async fn write(&mut self, command: &str) -> Result<()> {
        debug!("SCPI write  -> {command}");
        let line = format!("{command}\n");
        match timeout(self.timeout, self.inner.write(line.as_bytes())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(Error::transport(format!("write {command:?}"), e)),
            Err(_) => Err(Error::Timeout {
                operation: format!("write {command:?}"),
                timeout: self.timeout,
            }),
        }
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        match timeout(self.timeout, self.inner.read(MAX_READ)).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(Error::transport("read", e)),
            Err(_) => Err(Error::Timeout {
                operation: "read".into(),
                timeout: self.timeout,
            }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        debug!("VXI-11 close -> {}", self.address);
        self.inner
            .close()
            .await
            .map(|_| ())
            .map_err(|e| Error::transport("close", e))
    }
}
