use crate::prelude::*;

use bytes::Bytes;
use nom_derive::{Nom, Parse};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Length of the header region on the wire: op, count-1, address, CRC.
pub const HEADER_LEN: usize = 8;
pub const CRC_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Op {
    Read = b'Q',
    Write = b'W',
}

/// The fixed frame header. The length byte on the wire is always one less
/// than the true register count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Nom)]
#[nom(LittleEndian)]
pub struct Header {
    pub op: u8,
    pub len: u8,
    pub addr: u32,
}

impl Header {
    pub fn count(&self) -> usize {
        self.len as usize + 1
    }
}

/// A decoded read/write response. Checksum failures are reported through the
/// flags rather than an error; the device never retransmits, so the payload
/// is handed to the caller either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub header: Header,
    pub payload: Bytes,
    pub header_ok: bool,
    pub payload_ok: bool,
}

/// CRC-16/CCITT as implemented by the SP PRO firmware. A valid region with
/// its own little-endian CRC appended sums to zero.
pub fn checksum(data: &[u8]) -> u16 {
    crc16::State::<crc16::KERMIT>::calculate(data)
}

/// Total response length for a read of `count` registers: header region plus
/// payload plus payload CRC.
pub fn response_len(count: u8) -> usize {
    HEADER_LEN + 2 * count as usize + CRC_LEN
}

/// Serializes `{op, count-1, addr}` little-endian and appends the header CRC.
/// The wire length byte is `count - 1`, so a count of zero is unrepresentable
/// and rejected here.
pub fn encode_header(op: Op, addr: u32, count: u8) -> Result<Vec<u8>, Error> {
    if count == 0 {
        return Err(Error::Frame("register count must be at least 1".into()));
    }

    let mut buf = Vec::with_capacity(HEADER_LEN);
    buf.push(op.into());
    buf.push(count - 1);
    buf.extend_from_slice(&addr.to_le_bytes());

    let crc = checksum(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

/// Serializes register values little-endian and appends the payload CRC.
pub fn encode_write_payload(values: &[u16]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 * values.len() + CRC_LEN);
    for value in values {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    let crc = checksum(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf
}

/// Splits a raw response into header and payload regions and validates both
/// CRC residues. `raw` must be exactly `response_len(count)` bytes.
pub fn decode_response(raw: &[u8], count: u8) -> Result<Response, Error> {
    if raw.len() != response_len(count) {
        return Err(Error::Frame(format!(
            "expected {} bytes, got {}",
            response_len(count),
            raw.len()
        )));
    }

    let (_, header) =
        Header::parse(&raw[..HEADER_LEN]).map_err(|err| Error::Frame(err.to_string()))?;

    let header_ok = checksum(&raw[..HEADER_LEN]) == 0;
    let payload_ok = checksum(&raw[HEADER_LEN..]) == 0;
    let payload = Bytes::copy_from_slice(&raw[HEADER_LEN..raw.len() - CRC_LEN]);

    Ok(Response {
        header,
        payload,
        header_ok,
        payload_ok,
    })
}
