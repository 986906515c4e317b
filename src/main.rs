use anyhow::Result;
use log::error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> Result<()> {
    let (shutdown_tx, _) = broadcast::channel(1);

    // SIGINT/SIGTERM both trigger an orderly disconnect before exit; the
    // device would otherwise keep the comport allocated.
    let shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                return;
            }
        };

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    error!("failed to listen for ctrl-c: {}", err);
                }
            }
            _ = sigterm.recv() => {}
        }

        let _ = shutdown.send(());
    });

    splink_bridge::app(shutdown_tx.subscribe()).await
}
