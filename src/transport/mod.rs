//! Bus transports.
//!
//! A [`Transport`] knows which resources it can reach and how to open them;
//! a [`Session`] is one open channel to one instrument. Everything above
//! this module talks SCPI text through these two traits and never sees the
//! wire protocol underneath.
//!
//! The console runs on a current-thread runtime and owns at most one session
//! at a time, so neither trait requires `Send`.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::resource::ResourceAddress;
use crate::scpi::{self, Block};

pub mod bus;
pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;
pub mod socket;
pub mod stream;
#[cfg(feature = "visa")]
pub mod visa;
pub mod vxi11;

pub use bus::VisaBus;
pub use mock::{BusEvent, MockTransport};

/// An open channel to one instrument.
#[async_trait(?Send)]
pub trait Session {
    /// The resource this session was opened against.
    fn resource(&self) -> &ResourceAddress;

    /// Send one command. The line terminator is added by the session.
    async fn write(&mut self, command: &str) -> Result<()>;

    /// Read one response message (or one transfer, for block reads).
    async fn read(&mut self) -> Result<Vec<u8>>;

    async fn close(&mut self) -> Result<()>;

    /// Write `command` and read back a textual reply.
    async fn query(&mut self, command: &str) -> Result<String> {
        debug!("SCPI query  -> {command}");
        self.write(command).await?;
        let raw = self.read().await?;
        let reply = scpi::decode_reply(command, &raw)?;
        debug!("SCPI result <- {reply}");
        Ok(reply)
    }

    /// Write `command` and read back an IEEE 488.2 block, returning only its
    /// payload. Reads repeat until the announced length has arrived.
    async fn query_block(&mut self, command: &str) -> Result<Vec<u8>> {
        debug!("SCPI block  -> {command}");
        self.write(command).await?;
        let mut buf = Vec::new();
        loop {
            let chunk = self.read().await?;
            if chunk.is_empty() {
                return Err(Error::malformed(command, "binary transfer ended early"));
            }
            buf.extend_from_slice(&chunk);
            if let Block::Complete(range) = scpi::locate_block(command, &buf)? {
                debug!("SCPI block  <- {} bytes", range.len());
                return Ok(buf[range].to_vec());
            }
        }
    }
}

/// Discovery plus session factory for one kind of bus.
#[async_trait(?Send)]
pub trait Transport {
    /// Every resource the transport can currently report, in its own order.
    async fn list(&mut self) -> Result<Vec<String>>;

    async fn open(&mut self, address: &ResourceAddress) -> Result<Box<dyn Session>>;
}
