use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::resource::ResourceAddress;
use crate::transport::{Session, Transport};

/// Owns the transport and at most one open session.
///
/// Two states: nothing selected, or one device selected. `select` is the
/// only transition and replaces the current session in place.
pub struct DeviceRegistry {
    transport: Box<dyn Transport>,
    selected: Option<Box<dyn Session>>,
}

impl DeviceRegistry {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            selected: None,
        }
    }

    /// Resources reported by the transport, untouched.
    pub async fn list(&mut self) -> Result<Vec<String>> {
        self.transport.list().await
    }

    /// Open `resource` and make it the selected device.
    ///
    /// The new session is opened before the old one is closed, so a failed
    /// select leaves the previous selection usable. Re-selecting the device
    /// that is already selected closes it first: single-client instruments
    /// refuse a second connection.
    pub async fn select(&mut self, resource: &str) -> Result<&ResourceAddress> {
        let address: ResourceAddress = resource.parse()?;
        let reselect = self
            .selected()
            .is_some_and(|current| current.interface() == address.interface());
        if reselect {
            self.release().await;
        }

        let session = self.transport.open(&address).await?;
        self.release().await;
        info!("selected {address}");
        let session = self.selected.insert(session);
        Ok(session.resource())
    }

    /// Close the selected session, logging rather than returning a failure.
    async fn release(&mut self) {
        if let Some(mut previous) = self.selected.take() {
            info!("closing {}", previous.resource());
            if let Err(e) = previous.close().await {
                warn!("closing {} failed: {e}", previous.resource());
            }
        }
    }

    pub fn selected(&self) -> Option<&ResourceAddress> {
        self.selected.as_ref().map(|s| s.resource())
    }

    /// The selected session, or the no-device-selected precondition error.
    pub fn session(&mut self) -> Result<&mut dyn Session> {
        match self.selected.as_mut() {
            Some(session) => Ok(session.as_mut()),
            None => Err(Error::NoDeviceSelected),
        }
    }

    /// Close the selected session, if any.
    pub async fn close(&mut self) -> Result<()> {
        match self.selected.take() {
            Some(mut session) => {
                info!("closing {}", session.resource());
                session.close().await
            }
            None => Ok(()),
        }
    }
}
