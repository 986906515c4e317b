use crate::prelude::*;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::influx;
use crate::register;
use crate::splink::session::Session;
use crate::status;

// Telemetry register addresses for this deployment.
const ADDR_SOURCE_POWER: u32 = 0x0000_A058;
const ADDR_LOAD_POWER: u32 = 0x0000_A05C;
const ADDR_INPUT_HOURS: u32 = 0x0000_A070;
const ADDR_GENERATOR_REASON: u32 = 0x0000_A07C;
const ADDR_SOURCE_ENERGY: u32 = 0x0000_A0A8;
const ADDR_LOAD_ENERGY: u32 = 0x0000_A0AC;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelData {
    Poll,
    Shutdown,
}

/// Watches one enumerated register for changes across poll cycles.
///
/// The first observation is recorded silently; after that, every change
/// yields exactly one transition carrying the from/to labels.
pub struct TrackedStatus {
    kind: &'static str,
    table: &'static [&'static str],
    last: i32,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Transition {
    pub kind: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

impl TrackedStatus {
    const UNSEEN: i32 = -1;

    pub fn new(kind: &'static str, table: &'static [&'static str]) -> Self {
        Self {
            kind,
            table,
            last: Self::UNSEEN,
        }
    }

    pub fn observe(&mut self, value: i32) -> Option<Transition> {
        let last = std::mem::replace(&mut self.last, value);
        if last == Self::UNSEEN || last == value {
            return None;
        }

        Some(Transition {
            kind: self.kind,
            from: status::lookup(self.table, last),
            to: status::lookup(self.table, value),
        })
    }
}

/// Owns the Splink session and executes poll cycles.
///
/// All session access funnels through this one task: scheduler ticks and the
/// shutdown request both arrive over the same channel, so reads, writes and
/// the final disconnect can never interleave on the wire. Ticks that arrive
/// while a cycle is in flight queue behind it.
pub struct Coordinator<S> {
    channels: Channels,
    receiver: broadcast::Receiver<ChannelData>,
    session: Session<S>,
    com_port: u16,
    start_reason: TrackedStatus,
    run_reason: TrackedStatus,
}

impl<S> Coordinator<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(channels: Channels, session: Session<S>, com_port: u16) -> Self {
        let receiver = channels.to_coordinator.subscribe();

        Self {
            channels,
            receiver,
            session,
            com_port,
            start_reason: TrackedStatus::new("generator_start_reason", status::GENERATOR_REASON),
            run_reason: TrackedStatus::new("generator_run_reason", status::GENERATOR_REASON),
        }
    }

    pub async fn start(mut self) -> Result<(), Error> {
        loop {
            match self.receiver.recv().await {
                Ok(ChannelData::Poll) => {
                    if let Err(err) = self.poll().await {
                        error!("poll cycle failed: {}", err);
                        if let Err(err) = self.session.disconnect(self.com_port).await {
                            warn!("best-effort disconnect failed: {}", err);
                        }
                        return Err(err);
                    }
                }
                Ok(ChannelData::Shutdown) => {
                    if let Err(err) = self.session.disconnect(self.com_port).await {
                        warn!("disconnect failed: {}", err);
                    }
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("coordinator lagged, skipped {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("coordinator exiting");
        Ok(())
    }

    async fn poll(&mut self) -> Result<(), Error> {
        let at = Utc::now();

        let raw = self.session.read(ADDR_SOURCE_POWER, 2).await?;
        self.emit_value("source_power", register::watts32(register::i32_le(&raw)), at);

        let raw = self.session.read(ADDR_LOAD_POWER, 2).await?;
        self.emit_value("load_power", register::watts32(register::i32_le(&raw)), at);

        let raw = self.session.read(ADDR_SOURCE_ENERGY, 2).await?;
        self.emit_value(
            "source_energy",
            register::watt_hours(register::u32_le(&raw)),
            at,
        );

        let raw = self.session.read(ADDR_LOAD_ENERGY, 2).await?;
        self.emit_value(
            "load_energy",
            register::watt_hours(register::u32_le(&raw)),
            at,
        );

        let raw = self.session.read(ADDR_INPUT_HOURS, 2).await?;
        self.emit_value("input_hours", register::hours(register::u32_le(&raw)), at);

        let word = self.session.read_u16(ADDR_GENERATOR_REASON).await?;
        let start = i32::from(register::low_byte(word));
        let run = i32::from(register::high_byte(word));

        if let Some(transition) = self.start_reason.observe(start) {
            self.emit_transition(transition, at);
        }
        if let Some(transition) = self.run_reason.observe(run) {
            self.emit_transition(transition, at);
        }

        Ok(())
    }

    fn emit_value(&self, kind: &'static str, value: f64, at: DateTime<Utc>) {
        debug!("{} = {}", kind, value);

        if self
            .channels
            .to_influx
            .send(influx::ChannelData::Value { kind, value, at })
            .is_err()
        {
            trace!("no influx consumers for {}", kind);
        }
    }

    fn emit_transition(&self, transition: Transition, at: DateTime<Utc>) {
        info!(
            "{}: {} -> {}",
            transition.kind, transition.from, transition.to
        );

        if self
            .channels
            .to_influx
            .send(influx::ChannelData::Transition {
                kind: transition.kind,
                from: transition.from,
                to: transition.to,
                at,
            })
            .is_err()
        {
            trace!("no influx consumers for {}", transition.kind);
        }
    }
}
