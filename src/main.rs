use std::{
    path::PathBuf,
    process,
    sync::{Arc, OnceLock},
};

use hivesense::{
    config::Config,
    core::{
        env::{self, SystemEnvironment},
        helper::AmbienceHelper,
        pipeline::Sensor,
        resync::{self, binary_resync_interval, presence_poll_interval, ResyncScheduler},
        sensor::SensorSpec,
        session::{Engine, SessionEvent},
    },
    logger::LoggerManager,
    print_error,
};
use hivesense_mqtt::OneShotTransport;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::new().unwrap_or_else(|e| {
            print_error!("{}", e);
            process::exit(1);
        })
    })
}

/// Maps user signals to session events so the engine is drivable without a
/// desktop shell: SIGUSR1 locks, SIGUSR2 unlocks. The real shell feeds the
/// same channel from its session-switch subscription.
fn spawn_session_signals(tx: mpsc::Sender<SessionEvent>) {
    use tokio::signal::unix::{signal, SignalKind};

    for (kind, event) in [
        (SignalKind::user_defined1(), SessionEvent::Lock),
        (SignalKind::user_defined2(), SessionEvent::Unlock),
    ] {
        match signal(kind) {
            Ok(mut stream) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                });
            }
            Err(e) => warn!("Failed to install session signal handler: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config();
    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting hivesense version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);

    let broker = cfg.broker.settings();
    if broker.uri.is_empty() {
        warn!("Broker URI is not configured; every publish will fail until it is");
    }
    let gates = cfg.sensor.gate_set();
    let system = Arc::new(SystemEnvironment::new());
    let transport = Arc::new(OneShotTransport::new(broker.clone()));

    let machine_name = env::machine_name().await;
    let machine_spec = SensorSpec::machine(
        &machine_name,
        broker.clone(),
        cfg.sensor.expire_after,
        gates.clone(),
    );
    info!(
        sensor = %machine_spec.name,
        topic = %machine_spec.topic_prefix,
        "Machine sensor configured"
    );
    let machine = Arc::new(Mutex::new(Sensor::new(
        machine_spec,
        transport.clone(),
        system.clone(),
    )));

    let cancel = CancellationToken::new();
    let helper = AmbienceHelper::from_path(&cfg.helper.path);
    let (engine, mut status_rx) = Engine::new(machine.clone(), helper, cancel.clone());

    // The tray shell renders this; headless runs just log it.
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            debug!(status = %*status_rx.borrow(), "Status updated");
        }
    });

    let mut scheduler = ResyncScheduler::new(cancel.clone());
    if let Some(interval) = binary_resync_interval(cfg.sensor.expire_after) {
        scheduler.spawn_state_resync(machine.clone(), interval);
    } else {
        info!("State expiry disabled, resync timer not started");
    }

    if cfg.presence.enabled {
        let user_name = env::user_name();
        let presence_spec = SensorSpec::user_presence(
            &user_name,
            broker.clone(),
            cfg.sensor.expire_after,
            gates.clone(),
            cfg.presence.polling_interval,
        );
        info!(
            sensor = %presence_spec.name,
            topic = %presence_spec.topic_prefix,
            "Presence sensor configured"
        );
        let presence_sensor = Arc::new(Mutex::new(Sensor::new(
            presence_spec,
            transport.clone(),
            system.clone(),
        )));

        let log_path = cfg
            .presence
            .log_path
            .clone()
            .map(PathBuf::from)
            .or_else(env::default_presence_log);
        match log_path {
            Some(log_path) if log_path.exists() => {
                resync::poll_presence_once(&presence_sensor, &log_path, &cancel).await;
                if let Some(interval) = presence_poll_interval(cfg.presence.polling_interval) {
                    scheduler.spawn_presence_poll(presence_sensor, log_path, interval);
                } else {
                    info!("Presence polling interval disabled, poll timer not started");
                }
            }
            Some(log_path) => {
                info!(log = %log_path.display(), "Presence log not present, watcher idle");
            }
            None => info!("No presence log path available, watcher idle"),
        }
    }

    engine.startup().await;

    let (event_tx, event_rx) = mpsc::channel(16);
    spawn_session_signals(event_tx);

    tokio::select! {
        _ = engine.run(event_rx) => {
            warn!("Session event stream ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C — initiating graceful shutdown...");
        }
    }

    cancel.cancel();
    engine.shutdown().await;
    scheduler.join().await;
    info!("Shutdown complete");
    Ok(())
}
