//! In-memory bus for tests and dry runs.
//!
//! Replies are scripted per command string; every bus operation is recorded
//! as a [`BusEvent`] so callers can assert on exactly what went over the
//! wire. A query with no scripted reply behaves like a silent instrument and
//! times out.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Session, Transport};
use crate::error::{Error, Result};
use crate::resource::ResourceAddress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    List,
    Open(String),
    Write { resource: String, command: String },
    Read { resource: String },
    Close(String),
}

#[derive(Debug, Default)]
struct MockState {
    resources: Vec<String>,
    unreachable: HashSet<String>,
    single_client: bool,
    open: HashSet<String>,
    replies: HashMap<String, Vec<u8>>,
    chunk_size: Option<usize>,
    listing_fails: bool,
    events: Vec<BusEvent>,
}

/// Cloning shares the scripted state and the event log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::default();
        mock.lock().resources = resources.into_iter().map(Into::into).collect();
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script the reply to `command`. The newline terminator is added.
    pub fn reply(&self, command: &str, reply: &str) -> &Self {
        self.reply_bytes(command, format!("{reply}\n").into_bytes())
    }

    pub fn reply_bytes(&self, command: &str, reply: Vec<u8>) -> &Self {
        self.lock().replies.insert(command.to_string(), reply);
        self
    }

    /// Opening `resource` fails as if nothing answered at that address.
    pub fn unreachable(&self, resource: &str) -> &Self {
        self.lock().unreachable.insert(resource.to_string());
        self
    }

    /// Refuse to open a resource that already has an open session, like an
    /// instrument that serves one client at a time.
    pub fn single_client(&self) -> &Self {
        self.lock().single_client = true;
        self
    }

    /// Deliver replies in reads of at most `size` bytes.
    pub fn chunked(&self, size: usize) -> &Self {
        self.lock().chunk_size = Some(size.max(1));
        self
    }

    /// Make `list` fail as if the bus backend were missing.
    pub fn fail_listing(&self) -> &Self {
        self.lock().listing_fails = true;
        self
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    /// Commands written to any session, in order.
    pub fn writes(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Write { command, .. } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of events that touched an instrument (anything but `List`).
    pub fn traffic(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| !matches!(e, BusEvent::List))
            .count()
    }
}

#[async_trait(?Send)]
impl Transport for MockTransport {
    async fn list(&mut self) -> Result<Vec<String>> {
        let mut state = self.lock();
        if state.listing_fails {
            return Err(Error::transport(
                "list resources",
                anyhow::anyhow!("no VISA backend available"),
            ));
        }
        state.events.push(BusEvent::List);
        Ok(state.resources.clone())
    }

    async fn open(&mut self, address: &ResourceAddress) -> Result<Box<dyn Session>> {
        let mut state = self.lock();
        if state.unreachable.contains(address.as_str()) {
            return Err(Error::Connect {
                resource: address.to_string(),
                cause: anyhow::anyhow!("no instrument answered"),
            });
        }
        if state.single_client && !state.open.insert(address.to_string()) {
            return Err(Error::Connect {
                resource: address.to_string(),
                cause: anyhow::anyhow!("instrument is busy with another client"),
            });
        }
        state.events.push(BusEvent::Open(address.to_string()));
        debug!("mock open -> {address}");
        Ok(Box::new(MockSession {
            address: address.clone(),
            state: Arc::clone(&self.state),
            pending: VecDeque::new(),
        }))
    }
}

struct MockSession {
    address: ResourceAddress,
    state: Arc<Mutex<MockState>>,
    pending: VecDeque<Vec<u8>>,
}

impl MockSession {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait(?Send)]
impl Session for MockSession {
    fn resource(&self) -> &ResourceAddress {
        &self.address
    }

    async fn write(&mut self, command: &str) -> Result<()> {
        let (reply, chunk) = {
            let mut state = self.lock();
            state.events.push(BusEvent::Write {
                resource: self.address.to_string(),
                command: command.to_string(),
            });
            (state.replies.get(command).cloned(), state.chunk_size)
        };
        if let Some(reply) = reply {
            match chunk {
                Some(size) => self.pending.extend(reply.chunks(size).map(<[u8]>::to_vec)),
                None => self.pending.push_back(reply),
            }
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        self.lock().events.push(BusEvent::Read {
            resource: self.address.to_string(),
        });
        self.pending.pop_front().ok_or_else(|| Error::Timeout {
            operation: "read".into(),
            timeout: Duration::ZERO,
        })
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.open.remove(self.address.as_str());
        state.events.push(BusEvent::Close(self.address.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> ResourceAddress {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn scripted_query_and_event_log() {
        let mut mock = MockTransport::new(["GPIB0::2::INSTR"]);
        mock.reply("*IDN?", "ACME,PSU,1,2.0");

        let mut session = mock.open(&addr("GPIB0::2::INSTR")).await.unwrap();
        assert_eq!(session.query("*IDN?").await.unwrap(), "ACME,PSU,1,2.0");
        session.close().await.unwrap();

        assert_eq!(
            mock.events(),
            vec![
                BusEvent::Open("GPIB0::2::INSTR".into()),
                BusEvent::Write {
                    resource: "GPIB0::2::INSTR".into(),
                    command: "*IDN?".into(),
                },
                BusEvent::Read {
                    resource: "GPIB0::2::INSTR".into(),
                },
                BusEvent::Close("GPIB0::2::INSTR".into()),
            ]
        );
    }

    #[tokio::test]
    async fn unscripted_query_times_out() {
        let mut mock = MockTransport::new(Vec::<String>::new());
        let mut session = mock.open(&addr("GPIB0::2::INSTR")).await.unwrap();
        let err = session.query(":MEAS:VOLT?").await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn block_reassembled_from_chunks() {
        let mut mock = MockTransport::new(Vec::<String>::new());
        mock.reply_bytes(":DISPlay:DATA? PNG", b"#211\x89PNG\r\n\x1a\n\0\0\0\n".to_vec())
            .chunked(3);
        let mut session = mock.open(&addr("GPIB0::2::INSTR")).await.unwrap();
        let payload = session.query_block(":DISPlay:DATA? PNG").await.unwrap();
        assert_eq!(payload, b"\x89PNG\r\n\x1a\n\0\0\0");
    }
}
