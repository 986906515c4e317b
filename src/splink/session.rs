use crate::prelude::*;

use bytes::Bytes;
use net2::TcpStreamExt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::splink::packet::{self, Op};
use crate::splink::ADDR_DISCONNECT;

/// Per-exchange deadline. A timeout is fatal; the device answers well within
/// this on a healthy link.
const TIMEOUT_SECS: u64 = 5;
const TCP_KEEPALIVE_SECS: u64 = 60;

/// A single point-to-point Splink session over a byte stream.
///
/// The protocol has no multiplexing: responses correlate to requests purely
/// by strict alternation on the wire, so the session takes `&mut self` for
/// every exchange and callers must serialize access.
pub struct Session<S> {
    stream: S,
}

impl Session<TcpStream> {
    pub async fn connect(host: &str, port: u16) -> Result<Self, Error> {
        info!("connecting to {}:{}", host, port);

        let stream = match tokio::time::timeout(
            Duration::from_secs(TIMEOUT_SECS),
            TcpStream::connect((host, port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(Error::Connection {
                    host: host.to_string(),
                    port,
                    source,
                })
            }
            Err(_) => return Err(Error::Timeout(TIMEOUT_SECS)),
        };

        let std_stream = stream.into_std()?;
        if let Err(err) = std_stream.set_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS))) {
            warn!("failed to set TCP keepalive: {}", err);
        }

        let stream = TcpStream::from_std(std_stream)?;
        if let Err(err) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY: {}", err);
        }

        Ok(Self::new(stream))
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Reads `count` registers starting at `addr`, returning the raw payload
    /// bytes with header and trailing CRC stripped.
    ///
    /// A checksum mismatch is logged but the payload is still returned; the
    /// protocol has no retransmission to fall back on.
    pub async fn read(&mut self, addr: u32, count: u8) -> Result<Bytes, Error> {
        let request = packet::encode_header(Op::Read, addr, count)?;
        self.send(&request).await?;

        let mut raw = vec![0u8; packet::response_len(count)];
        self.recv_exact(&mut raw).await?;

        let response = packet::decode_response(&raw, count)?;
        if !response.header_ok || !response.payload_ok {
            warn!(
                "response CRC mismatch reading {:#010x} (header {:?}): {:02x?}",
                addr, response.header, raw
            );
        }

        Ok(response.payload)
    }

    /// Reads a single register as a little-endian word.
    pub async fn read_u16(&mut self, addr: u32) -> Result<u16, Error> {
        let payload = self.read(addr, 1).await?;
        Ok(u16::from_le_bytes([payload[0], payload[1]]))
    }

    /// Writes `values` to consecutive registers starting at `addr`. The
    /// device acknowledges a write by echoing the packet byte-for-byte; any
    /// deviation leaves the wire in an unknown state and is fatal.
    pub async fn write(&mut self, addr: u32, values: &[u16]) -> Result<(), Error> {
        let count = u8::try_from(values.len()).map_err(|_| {
            Error::Frame(format!("write of {} registers exceeds frame limit", values.len()))
        })?;
        let mut request = packet::encode_header(Op::Write, addr, count)?;
        request.extend_from_slice(&packet::encode_write_payload(values));
        self.send(&request).await?;

        let mut echo = vec![0u8; request.len()];
        self.recv_exact(&mut echo).await?;

        if echo != request {
            return Err(Error::WriteEcho { addr });
        }

        Ok(())
    }

    /// Releases the comport assigned at authentication. No-op for comport
    /// values outside 1..=2, so repeated calls are safe.
    pub async fn disconnect(&mut self, com_port: u16) -> Result<(), Error> {
        if com_port == 1 || com_port == 2 {
            info!("disconnecting comport {}", com_port);
            self.write(ADDR_DISCONNECT + u32::from(com_port) - 1, &[1])
                .await?;
        }

        Ok(())
    }

    async fn send(&mut self, buf: &[u8]) -> Result<(), Error> {
        match tokio::time::timeout(
            Duration::from_secs(TIMEOUT_SECS),
            self.stream.write_all(buf),
        )
        .await
        {
            Ok(Ok(())) => Ok(self.stream.flush().await?),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(Error::Timeout(TIMEOUT_SECS)),
        }
    }

    async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        match tokio::time::timeout(
            Duration::from_secs(TIMEOUT_SECS),
            self.stream.read_exact(buf),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(Error::Timeout(TIMEOUT_SECS)),
        }
    }
}
