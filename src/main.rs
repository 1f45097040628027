//! avatar-mirror - live landmark tracking onto a rigged avatar
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use avatar_mirror::{
    avatar::Skeleton,
    config::{BindingProfile, Config},
    driver::TickOutcome,
    error::TrackingError,
    session::TrackingSession,
    tracking::subprocess::LandmarkerSubprocess,
    web::WebServer,
    AppState, MirrorError,
};

/// avatar-mirror - drive a 3D avatar from webcam face and body tracking
#[derive(Parser, Debug)]
#[command(name = "avatar-mirror", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Avatar model path (overrides config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Limb binding profile: arm_chain or classic (overrides config)
    #[arg(long)]
    profile: Option<BindingProfile>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable HTTP server
    #[arg(long)]
    no_http: bool,

    /// HTTP server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", avatar_mirror::NAME, avatar_mirror::VERSION);

    let config = load_config(&args)?;

    // The avatar is mounted once; a bad asset is fatal before anything starts
    let skeleton = Skeleton::load(&config.avatar.model_path)?;

    let state = AppState::new(config.clone());

    if config.http.enabled {
        let server = WebServer::new(Arc::clone(&state), &config.http);
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    let tracking_state = Arc::clone(&state);
    let tracking = tokio::spawn(async move {
        if let Err(e) = run_tracking(tracking_state, skeleton).await {
            error!("Tracking error: {}", e);
        }
    });

    shutdown_signal().await;
    info!("Shutdown signal received");
    state.shutdown();

    let _ = tokio::time::timeout(Duration::from_secs(3), tracking).await;

    info!("avatar-mirror stopped");
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    if let Some(ref model) = args.model {
        config.avatar.model_path = model.clone();
    }
    if let Some(profile) = args.profile {
        config.binder.profile = profile;
    }
    if args.no_http {
        config.http.enabled = false;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    config.validate()?;

    info!("Avatar model: {}", config.avatar.model_path.display());
    info!(
        "Camera: device {} at {}x{}",
        config.camera.device, config.camera.width, config.camera.height
    );
    info!("Binding profile: {:?}", config.binder.profile);
    info!("HTTP server: {}", config.http.enabled);

    Ok(config)
}

/// Per-refresh loop: poll the landmark feed, drive the skeleton, publish.
async fn run_tracking(state: Arc<AppState>, skeleton: Skeleton) -> anyhow::Result<()> {
    let config = state.config.read().await.clone();
    let mut shutdown_rx = state.subscribe_shutdown();

    let mut subprocess = if config.detector.auto_launch {
        let mut sp = LandmarkerSubprocess::new(&config.detector, &config.camera);
        if let Err(e) = sp.start() {
            error!("Failed to auto-launch landmarker helper: {}", e);
        }
        Some(sp)
    } else {
        None
    };

    let mut session = TrackingSession::new(&config, skeleton);
    session.start()?;

    // Neutral pose until the first frame arrives
    state
        .publish_pose(session.skeleton().pose(0, false, false))
        .await;

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(
        1.0 / f64::from(config.driver.refresh_hz),
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Tracking started (port: {}, refresh: {} Hz)",
        config.detector.port, config.driver.refresh_hz
    );

    let mut last_published = state.get_pose().await;
    let mut restart_at: Option<tokio::time::Instant> = None;

    let result = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.recv() => {
                info!("Tracking shutting down");
                break Ok(());
            }
        }

        let (outcome, pose) = match session.step() {
            Ok(step) => step,
            Err(MirrorError::Tracking(TrackingError::CameraUnavailable(message))) => {
                error!(
                    "Could not access the camera ({}). Check camera permissions and try again.",
                    message
                );
                break Err(anyhow::Error::from(TrackingError::CameraUnavailable(message)));
            }
            Err(e) => {
                error!("Landmark receive error: {}", e);
                continue;
            }
        };

        if let TickOutcome::Detected { .. } = outcome {
            if !state.is_tracking_active() {
                info!("Landmark feed active");
                state.set_tracking_active(true);
            }
        }

        if !pose.same_pose(&last_published) {
            last_published = pose.clone();
            state.publish_pose(pose).await;
        }

        if let Some(ref mut sp) = subprocess {
            if config.detector.auto_restart && !sp.is_running() {
                let now = tokio::time::Instant::now();
                match restart_at {
                    None => {
                        info!(
                            "Landmarker helper exited, restarting in {}s",
                            config.detector.restart_delay_secs
                        );
                        state.set_tracking_active(false);
                        restart_at =
                            Some(now + Duration::from_secs(config.detector.restart_delay_secs));
                    }
                    Some(at) if now >= at => {
                        restart_at = None;
                        if let Err(e) = sp.start() {
                            error!("Failed to restart landmarker helper: {}", e);
                        }
                    }
                    Some(_) => {}
                }
            }
        }
    };

    session.stop();
    state.set_tracking_active(false);
    if let Some(ref mut sp) = subprocess {
        sp.stop().await;
    }

    result
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
