use crate::prelude::*;

use crate::coordinator::ChannelData;

/// Sends one poll request per interval. Cycles are serialized by the
/// coordinator's mailbox; a tick that fires while the previous cycle is
/// still running simply queues behind it, and missed ticks are skipped
/// rather than bursted.
pub struct Scheduler {
    config: Config,
    channels: Channels,
}

impl Scheduler {
    pub fn new(config: Config, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        // the first poll waits one full interval rather than firing at
        // startup, like the device-side ticker this replaces
        let period = std::time::Duration::from_secs(self.config.interval);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("polling every {}s", self.config.interval);

        loop {
            interval.tick().await;

            if self.channels.to_coordinator.send(ChannelData::Poll).is_err() {
                info!("coordinator gone, scheduler exiting");
                break;
            }
        }

        Ok(())
    }
}
