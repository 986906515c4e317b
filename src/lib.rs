pub mod channels;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod influx;
pub mod options;
pub mod prelude;
pub mod register;
pub mod scheduler;
pub mod splink;
pub mod status;

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

use crate::influx::Influx;
use crate::scheduler::Scheduler;
use crate::splink::session::Session;

/// Main application entry point.
///
/// Connects and authenticates the Splink session, then hands it to the
/// coordinator task. The session lives for the process lifetime; any fatal
/// protocol error tears the whole process down after a best-effort
/// disconnect, and restarting is the supervisor's job.
pub async fn app(mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let options = Options::new();
    let config = Config::new(&options.config_file)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.loglevel.clone()),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "[{} {} {}] {}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
            record.level(),
            record.module_path().unwrap_or(""),
            record.args()
        )
    })
    .write_style(env_logger::WriteStyle::Never)
    .init();

    info!(
        "starting splink-bridge {} with config file {}",
        CARGO_PKG_VERSION, options.config_file
    );

    let channels = Channels::new();

    let influx = Influx::new(config.clone(), channels.clone());
    influx.start().await?;

    let mut session = Session::connect(&config.host, config.port).await?;
    let com_port = splink::auth::authenticate(&mut session, &config.password).await?;
    info!("using comport {}", com_port);

    let coordinator = coordinator::Coordinator::new(channels.clone(), session, com_port);
    let mut coordinator_handle = tokio::spawn(coordinator.start());

    let scheduler = Scheduler::new(config.clone(), channels.clone());
    let scheduler_handle = tokio::spawn(async move { scheduler.start().await });

    let joined = tokio::select! {
        _ = shutdown_rx.recv() => {
            info!("shutdown signal received, disconnecting");
            let _ = channels.to_coordinator.send(coordinator::ChannelData::Shutdown);
            None
        }
        res = &mut coordinator_handle => Some(res),
    };

    // after a shutdown signal, wait for the coordinator to finish its
    // disconnect before tearing anything else down
    let joined = match joined {
        Some(res) => res,
        None => (&mut coordinator_handle).await,
    };

    scheduler_handle.abort();
    influx.stop();

    match joined {
        Ok(res) => res?,
        Err(err) => error!("coordinator task panicked: {}", err),
    }

    info!("shutdown complete");
    Ok(())
}
