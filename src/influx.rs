use crate::prelude::*;

use chrono::{DateTime, Utc};
use rinfluxdb::line_protocol::{r#async::Client, LineBuilder};

static MEASUREMENT: &str = "sp_pro";

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelData {
    /// A continuously-varying quantity, emitted every poll cycle.
    Value {
        kind: &'static str,
        value: f64,
        at: DateTime<Utc>,
    },
    /// A state change in an enumerated register.
    Transition {
        kind: &'static str,
        from: &'static str,
        to: &'static str,
        at: DateTime<Utc>,
    },
    Shutdown,
}

#[derive(Clone)]
pub struct Influx {
    config: Config,
    channels: Channels,
}

impl Influx {
    pub fn new(config: Config, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.influx.enabled {
            info!("influx disabled, skipping");
            return Ok(());
        }

        info!("initialising influx at {}", self.config.influx.url);

        let url = reqwest::Url::parse(&self.config.influx.url)?;
        let credentials = match (&self.config.influx.username, &self.config.influx.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };
        let client = Client::new(url, credentials)?;

        let this = self.clone();
        tokio::spawn(async move {
            if let Err(err) = this.sender(client).await {
                error!("influx sender task failed: {}", err);
            }
        });

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_influx.send(ChannelData::Shutdown);
    }

    async fn sender(&self, client: Client) -> Result<()> {
        use ChannelData::*;

        let mut receiver = self.channels.to_influx.subscribe();
        info!("influx sender started");

        loop {
            match receiver.recv().await {
                Ok(Shutdown) => break,
                Ok(Value { kind, value, at }) => {
                    let line = LineBuilder::new(MEASUREMENT)
                        .insert_tag("type", kind)
                        .insert_field("value", value)
                        .set_timestamp(at)
                        .build();

                    self.send(&client, vec![line]).await;
                }
                Ok(Transition { kind, from, to, at }) => {
                    let line = LineBuilder::new(MEASUREMENT)
                        .insert_tag("type", kind)
                        .insert_field("from_state", from.to_string())
                        .insert_field("to_state", to.to_string())
                        .set_timestamp(at)
                        .build();

                    self.send(&client, vec![line]).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("influx sender lagged, dropped {} points", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("influx sender exiting");
        Ok(())
    }

    async fn send(&self, client: &Client, lines: Vec<rinfluxdb::line_protocol::Line>) {
        trace!("sending to influx: {:?}", lines);

        if let Err(err) = client.send(&self.config.influx.database, &lines).await {
            // telemetry is not buffered; a failed push is dropped
            error!("influx push failed: {:?}", err);
        }
    }
}
