use std::io;

/// Errors raised by the Splink protocol layer.
///
/// Only checksum mismatches are tolerated on this link (the device has no
/// retransmission, so the payload is used optimistically and the mismatch is
/// logged where it happens). Everything below is fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection to {host}:{port} failed: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("no response within {0} seconds")]
    Timeout(u64),

    #[error("i/o error on splink stream: {0}")]
    Io(#[from] io::Error),

    #[error("malformed response frame: {0}")]
    Frame(String),

    #[error("authentication rejected by device (challenge success register read {0})")]
    AuthRejected(u16),

    #[error("write to {addr:#010x} was not echoed back by the device")]
    WriteEcho { addr: u32 },
}
