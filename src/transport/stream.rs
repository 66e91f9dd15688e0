use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::debug;

use super::Session;
use crate::error::{Error, Result};
use crate::resource::ResourceAddress;

/// How long to wait for the terminator that follows a binary block.
const TRAILER_GRACE: Duration = Duration::from_millis(50);

/// Largest binary block accepted from an instrument. Screen dumps and VNA
/// traces are a few megabytes at most.
pub const MAX_BLOCK_LEN: usize = 64 << 20;

/// Newline-terminated SCPI over a byte stream: a TCP socket or a serial
/// port.
pub struct StreamSession<S> {
    stream: BufReader<S>,
    address: ResourceAddress,
    timeout: Duration,
}

impl<S> StreamSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, address: &ResourceAddress, io_timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            address: address.clone(),
            timeout: io_timeout,
        }
    }

    fn timed_out(&self, operation: impl Into<String>) -> Error {
        Error::Timeout {
            operation: operation.into(),
            timeout: self.timeout,
        }
    }

    fn disconnected(&self) -> Error {
        Error::Disconnected {
            resource: self.address.to_string(),
        }
    }

    async fn read_exact_timed(&mut self, buf: &mut [u8], command: &str) -> Result<()> {
        let result = timeout(self.timeout, self.stream.read_exact(buf)).await;
        match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(self.disconnected()),
            Ok(Err(e)) => Err(Error::transport(format!("read block for {command:?}"), e)),
            Err(_) => Err(self.timed_out(format!("read block for {command:?}"))),
        }
    }

    /// Read exactly `len` payload bytes, growing the buffer as data arrives
    /// rather than trusting the announced length up front.
    async fn read_payload(&mut self, len: usize, command: &str) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        let mut reader = (&mut self.stream).take(len as u64);
        let result = timeout(self.timeout, reader.read_to_end(&mut payload)).await;
        match result {
            Ok(Ok(n)) if n == len => Ok(payload),
            Ok(Ok(_)) => Err(self.disconnected()),
            Ok(Err(e)) => Err(Error::transport(format!("read block for {command:?}"), e)),
            Err(_) => Err(self.timed_out(format!("read block for {command:?}"))),
        }
    }
}

#[async_trait(?Send)]
impl<S> Session for StreamSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn resource(&self) -> &ResourceAddress {
        &self.address
    }

    async fn write(&mut self, command: &str) -> Result<()> {
        debug!("SCPI write  -> {command}");
        let line = format!("{command}\n");
        let io = async {
            let stream = self.stream.get_mut();
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await
        };
        let result = timeout(self.timeout, io).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::transport(format!("write {command:?}"), e)),
            Err(_) => Err(self.timed_out(format!("write {command:?}"))),
        }
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let result = timeout(self.timeout, self.stream.read_until(b'\n', &mut buf)).await;
        match result {
            Ok(Ok(0)) => Err(self.disconnected()),
            Ok(Ok(_)) => Ok(buf),
            Ok(Err(e)) => Err(Error::transport("read", e)),
            Err(_) => Err(self.timed_out("read")),
        }
    }

    /// Binary payloads may contain newlines, so the block is read by its
    /// announced length instead of line by line.
    async fn query_block(&mut self, command: &str) -> Result<Vec<u8>> {
        debug!("SCPI block  -> {command}");
        self.write(command).await?;

        let mut head = [0u8; 2];
        self.read_exact_timed(&mut head, command).await?;
        if head[0] != b'#' || !head[1].is_ascii_digit() {
            return Err(Error::malformed(command, "binary block header missing"));
        }
        let width = usize::from(head[1] - b'0');
        if width == 0 {
            // Indefinite length: everything up to the terminator.
            let mut payload = self.read().await?;
            if payload.last() == Some(&b'\n') {
                payload.pop();
            }
            return Ok(payload);
        }

        let mut len_digits = vec![0u8; width];
        self.read_exact_timed(&mut len_digits, command).await?;
        let len: usize = std::str::from_utf8(&len_digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::malformed(command, "bad binary block length"))?;
        if len > MAX_BLOCK_LEN {
            return Err(Error::malformed(
                command,
                format!("binary block of {len} bytes exceeds the {MAX_BLOCK_LEN} byte limit"),
            ));
        }

        let payload = self.read_payload(len, command).await?;

        let trailer = matches!(
            timeout(TRAILER_GRACE, self.stream.fill_buf()).await,
            Ok(Ok(rest)) if rest.first() == Some(&b'\n')
        );
        if trailer {
            self.stream.consume(1);
        }
        debug!("SCPI block  <- {len} bytes");
        Ok(payload)
    }

    async fn close(&mut self) -> Result<()> {
        debug!("stream close -> {}", self.address);
        self.stream
            .get_mut()
            .shutdown()
            .await
            .map_err(|e| Error::transport("close", e))
    }
}
