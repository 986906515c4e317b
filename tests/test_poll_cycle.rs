mod common;
use common::*;

use splink_bridge::channels::Channels;
use splink_bridge::coordinator::{ChannelData, Coordinator};
use splink_bridge::error::Error;
use splink_bridge::influx;
use splink_bridge::register;
use splink_bridge::splink::session::Session;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

const ADDR_SOURCE_POWER: u32 = 0x0000_A058;
const ADDR_GENERATOR_REASON: u32 = 0x0000_A07C;
const ADDR_DISCONNECT: u32 = 0x0000_A00D;

/// Answers the five telemetry reads and the generator reason read for one
/// poll cycle. `reason_word` packs start reason (low byte) and run reason
/// (high byte).
async fn answer_cycle(dev: &mut DuplexStream, reason_word: u16) {
    for _ in 0..6 {
        let (addr, count) = expect_read(dev).await;
        match addr {
            ADDR_GENERATOR_REASON => {
                assert_eq!(count, 1);
                reply_words(dev, addr, &[reason_word]).await;
            }
            ADDR_SOURCE_POWER => {
                assert_eq!(count, 2);
                reply_words(dev, addr, &[1000, 0]).await;
            }
            _ => {
                assert_eq!(count, 2);
                reply_words(dev, addr, &[0, 0]).await;
            }
        }
    }
}

#[tokio::test]
async fn transitions_emit_once_per_change() {
    let (client, mut dev) = tokio::io::duplex(1024);
    let channels = Channels::new();
    let mut influx_rx = channels.to_influx.subscribe();

    let coordinator = Coordinator::new(channels.clone(), Session::new(client), 1);
    let handle = tokio::spawn(coordinator.start());

    let device = tokio::spawn(async move {
        answer_cycle(&mut dev, 0x0000).await; // start 0, run 0
        answer_cycle(&mut dev, 0x0002).await; // start 2: transition
        answer_cycle(&mut dev, 0x0002).await; // unchanged: no duplicate

        let (addr, values) = echo_write(&mut dev).await; // disconnect
        assert_eq!(addr, ADDR_DISCONNECT);
        assert_eq!(values, vec![1]);
    });

    for _ in 0..3 {
        channels.to_coordinator.send(ChannelData::Poll).unwrap();
    }
    channels.to_coordinator.send(ChannelData::Shutdown).unwrap();

    device.await.unwrap();
    handle.await.unwrap().unwrap();

    let mut values = Vec::new();
    let mut transitions = Vec::new();
    while let Ok(data) = influx_rx.try_recv() {
        match data {
            influx::ChannelData::Value { kind, value, .. } => values.push((kind, value)),
            influx::ChannelData::Transition { kind, from, to, .. } => {
                transitions.push((kind, from, to))
            }
            influx::ChannelData::Shutdown => {}
        }
    }

    // every scalar is emitted every cycle, change or not
    assert_eq!(values.len(), 15);
    assert_eq!(
        values.iter().filter(|(kind, _)| *kind == "source_power").count(),
        3
    );
    for (kind, value) in &values {
        if *kind == "source_power" {
            assert_eq!(*value, register::watts32(1000));
        }
    }

    // one transition for the start reason, none for the unchanged run reason
    assert_eq!(
        transitions,
        vec![("generator_start_reason", "not running", "remote run request")]
    );
}

#[tokio::test]
async fn first_cycle_emits_no_transitions() {
    let (client, mut dev) = tokio::io::duplex(1024);
    let channels = Channels::new();
    let mut influx_rx = channels.to_influx.subscribe();

    let coordinator = Coordinator::new(channels.clone(), Session::new(client), 2);
    let handle = tokio::spawn(coordinator.start());

    let device = tokio::spawn(async move {
        // a mid-table state on the very first observation
        answer_cycle(&mut dev, 0x0D0D).await;
        let _ = echo_write(&mut dev).await;
    });

    channels.to_coordinator.send(ChannelData::Poll).unwrap();
    channels.to_coordinator.send(ChannelData::Shutdown).unwrap();

    device.await.unwrap();
    handle.await.unwrap().unwrap();

    while let Ok(data) = influx_rx.try_recv() {
        assert!(
            !matches!(data, influx::ChannelData::Transition { .. }),
            "unexpected transition on first observation"
        );
    }
}

#[tokio::test]
async fn failed_poll_disconnects_and_propagates() {
    let (client, mut dev) = tokio::io::duplex(1024);
    let channels = Channels::new();

    let coordinator = Coordinator::new(channels.clone(), Session::new(client), 1);
    let handle = tokio::spawn(coordinator.start());

    let device = tokio::spawn(async move {
        // break the first read of the cycle: a truncated reply, then close
        // our write side so the client sees EOF mid-frame
        let _ = expect_read(&mut dev).await;
        dev.write_all(&[0x51, 0x01]).await.unwrap();
        dev.shutdown().await.unwrap();

        // the best-effort disconnect still arrives on the wire
        let mut request = [0u8; 12];
        dev.read_exact(&mut request).await.unwrap();
        assert_eq!(request[0], b'W');
        let addr = u32::from_le_bytes([request[2], request[3], request[4], request[5]]);
        assert_eq!(addr, ADDR_DISCONNECT);
    });

    channels.to_coordinator.send(ChannelData::Poll).unwrap();

    device.await.unwrap();
    let result = handle.await.unwrap();
    assert!(matches!(result, Err(Error::Io(_))), "got {:?}", result);
}
