//! USB, GPIB and HiSLIP instruments through the system VISA library.
//!
//! VISA calls block, so every one runs on tokio's blocking pool. The
//! resource manager stays alive for as long as the session: closing it
//! would close the instrument with it.

use std::ffi::CString;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;
use visa_rs::prelude::*;

use super::Session;
use crate::error::{Error, Result};
use crate::resource::ResourceAddress;

/// One read transfer; a VISA read ends at the message terminator or here.
const READ_CHUNK: usize = 1 << 20;

struct Handle {
    instrument: Instrument,
    _rm: DefaultRM,
}

pub struct VisaSession {
    handle: Arc<Mutex<Handle>>,
    address: ResourceAddress,
    timeout: Duration,
}

fn visa_error(e: visa_rs::Error) -> anyhow::Error {
    anyhow::anyhow!("VISA error {e:?}")
}

fn resource_id(resource: &str) -> std::result::Result<VisaString, anyhow::Error> {
    let text = CString::new(resource).map_err(|e| anyhow::anyhow!("resource contains NUL: {e}"))?;
    Ok(VisaString::from(text))
}

/// Every `INSTR` resource the VISA library can see.
pub async fn find_resources() -> Result<Vec<String>> {
    let found = tokio::task::spawn_blocking(|| -> std::result::Result<Vec<String>, anyhow::Error> {
        let rm = DefaultRM::new().map_err(visa_error)?;
        let mut list = rm.find_res_list(&resource_id("?*::INSTR")?).map_err(visa_error)?;
        let mut found = Vec::new();
        while let Some(resource) = list.find_next().map_err(visa_error)? {
            found.push(resource.to_string());
        }
        Ok(found)
    })
    .await
    .map_err(|e| Error::transport("list VISA resources", e))?;
    found.map_err(|e| Error::transport("list VISA resources", e))
}

impl VisaSession {
    pub async fn open(address: &ResourceAddress, io_timeout: Duration) -> Result<Self> {
        debug!("VISA open -> {address}");
        let resource = address.to_string();
        let opened = tokio::task::spawn_blocking(move || -> std::result::Result<Handle, anyhow::Error> {
            let rm = DefaultRM::new().map_err(visa_error)?;
            let instrument = rm
                .open(&resource_id(&resource)?, AccessMode::NO_LOCK, io_timeout)
                .map_err(visa_error)?;
            Ok(Handle { instrument, _rm: rm })
        })
        .await
        .map_err(anyhow::Error::from)
        .and_then(|handle| handle);

        match opened {
            Ok(handle) => Ok(Self {
                handle: Arc::new(Mutex::new(handle)),
                address: address.clone(),
                timeout: io_timeout,
            }),
            Err(cause) => Err(Error::Connect {
                resource: address.to_string(),
                cause,
            }),
        }
    }

    /// Run one blocking VISA call, bounded by the session timeout.
    async fn call<T, F>(&self, operation: String, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Instrument) -> std::io::Result<T> + Send + 'static,
    {
        let handle = Arc::clone(&self.handle);
        let task = tokio::task::spawn_blocking(move || {
            let mut handle = handle.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut handle.instrument)
        });
        match timeout(self.timeout, task).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) if e.kind() == std::io::ErrorKind::TimedOut => Err(Error::Timeout {
                operation,
                timeout: self.timeout,
            }),
            Ok(Ok(Err(e))) => Err(Error::transport(operation, e)),
            Ok(Err(e)) => Err(Error::transport(operation, e)),
            Err(_) => Err(Error::Timeout {
                operation,
                timeout: self.timeout,
            }),
        }
    }
}

#[async_trait(?Send)]
impl Session for VisaSession {
    fn resource(&self) -> &ResourceAddress {
        &self.address
    }

    async fn write(&mut self, command: &str) -> Result<()> {
        debug!("SCPI write  -> {command}");
        let line = format!("{command}\n");
        self.call(format!("write {command:?}"), move |instrument| {
            instrument.write_all(line.as_bytes())
        })
        .await
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        self.call("read".into(), |instrument| {
            let mut buf = vec![0u8; READ_CHUNK];
            let n = instrument.read(&mut buf)?;
            buf.truncate(n);
            Ok(buf)
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        debug!("VISA close -> {}", self.address);
        // The session closes when the last handle drops.
        Ok(())
    }
}
