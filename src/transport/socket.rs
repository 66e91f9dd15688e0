use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::stream::StreamSession;
use crate::error::{Error, Result};
use crate::resource::ResourceAddress;

/// Newline-terminated SCPI over a plain TCP connection
/// (`TCPIP::<host>::<port>::SOCKET`).
pub type SocketSession = StreamSession<TcpStream>;

impl StreamSession<TcpStream> {
    pub async fn connect(
        address: &ResourceAddress,
        host: &str,
        port: u16,
        io_timeout: Duration,
    ) -> Result<Self> {
        debug!("socket connect -> {host}:{port}");
        let stream = match timeout(io_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(Error::Connect {
                    resource: address.to_string(),
                    cause: e.into(),
                });
            }
            Err(_) => {
                return Err(Error::Timeout {
                    operation: format!("connect to {host}:{port}"),
                    timeout: io_timeout,
                });
            }
        };
        // Commands are short and latency-bound.
        stream
            .set_nodelay(true)
            .map_err(|e| Error::transport("set TCP_NODELAY", e))?;
        Ok(StreamSession::new(stream, address, io_timeout))
    }
}
