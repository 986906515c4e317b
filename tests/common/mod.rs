// Drives the device side of a Splink exchange over a duplex stream.
#![allow(dead_code)] // not every test file uses every helper

use splink_bridge::splink::packet::{self, Op};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Consumes one read request and returns (address, register count).
pub async fn expect_read(dev: &mut DuplexStream) -> (u32, u8) {
    let mut req = [0u8; packet::HEADER_LEN];
    dev.read_exact(&mut req).await.unwrap();

    assert_eq!(req[0], u8::from(Op::Read), "expected a read request");
    assert_eq!(packet::checksum(&req), 0, "request failed CRC check");

    let count = req[1] + 1;
    let addr = u32::from_le_bytes([req[2], req[3], req[4], req[5]]);
    (addr, count)
}

/// Sends a well-formed read response carrying `words`.
pub async fn reply_words(dev: &mut DuplexStream, addr: u32, words: &[u16]) {
    let mut frame = packet::encode_header(Op::Read, addr, words.len() as u8).unwrap();
    frame.extend_from_slice(&packet::encode_write_payload(words));
    dev.write_all(&frame).await.unwrap();
}

/// Sends a well-formed read response carrying raw payload bytes.
pub async fn reply_bytes(dev: &mut DuplexStream, addr: u32, payload: &[u8]) {
    assert_eq!(payload.len() % 2, 0);

    let mut frame = packet::encode_header(Op::Read, addr, (payload.len() / 2) as u8).unwrap();
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&packet::checksum(payload).to_le_bytes());
    dev.write_all(&frame).await.unwrap();
}

/// Consumes one write request, echoes it back byte-for-byte, and returns
/// (address, values written).
pub async fn echo_write(dev: &mut DuplexStream) -> (u32, Vec<u16>) {
    let mut head = [0u8; packet::HEADER_LEN];
    dev.read_exact(&mut head).await.unwrap();

    assert_eq!(head[0], u8::from(Op::Write), "expected a write request");
    assert_eq!(packet::checksum(&head), 0, "request failed CRC check");

    let count = head[1] as usize + 1;
    let addr = u32::from_le_bytes([head[2], head[3], head[4], head[5]]);

    let mut rest = vec![0u8; 2 * count + packet::CRC_LEN];
    dev.read_exact(&mut rest).await.unwrap();
    assert_eq!(packet::checksum(&rest), 0, "write payload failed CRC check");

    dev.write_all(&head).await.unwrap();
    dev.write_all(&rest).await.unwrap();

    let values = rest[..2 * count]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    (addr, values)
}
