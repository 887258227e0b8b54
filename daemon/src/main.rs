use anyhow::Result;
use clap::Parser;
use seerd::config::{load_config, Config};
use seerd::control::{terminal_writer, ChannelInput, ControlEvent};
use seerd::dispatch::Dispatcher;
use seerd::models::{ensure_model, ModelFile};
use seerd::server::DaemonServer;
use seerd::speech::EspeakSpeaker;
use seerd::vision::{self, SeetaFaceRecognizer, TesseractReader};
use seerd::CaptureStore;
use shared::ipc::StatusInfo;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seerd")]
#[command(about = "Camera scene assistant daemon")]
struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/seer/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not read mode keys from the terminal
    #[arg(long)]
    no_keyboard: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .with_target(false)
        .with_writer(terminal_writer)
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    info!("seer daemon (seerd) starting...");

    provision_models(&config).await?;

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(StatusInfo {
        is_running: false,
        mode: config.capture.initial_mode,
        frames_processed: 0,
        failures: 0,
        interval_ms: config.capture.interval_ms,
    });

    let server = DaemonServer::new(
        config.control.socket_path(),
        control_tx.clone(),
        status_rx,
        Duration::from_secs(config.timeouts.socket_operation_timeout_seconds),
    );

    let keyboard = config.control.keyboard && !args.no_keyboard;
    let mut capture: JoinHandle<Result<()>> = tokio::task::spawn_blocking(move || {
        run_capture_loop(&config, ChannelInput::new(control_rx), status_tx, keyboard)
    });

    let stop = tokio::select! {
        joined = &mut capture => Stop::Finished(flatten(joined)),
        served = server.run() => Stop::ServerFailed(
            served.err().unwrap_or_else(|| anyhow::anyhow!("control server exited")),
        ),
        _ = tokio::signal::ctrl_c() => Stop::Interrupted,
    };

    let result = match stop {
        Stop::Finished(result) => result,
        Stop::ServerFailed(e) => {
            error!("Control server at {} failed: {}", server.socket_path().display(), e);
            let _ = control_tx.send(ControlEvent::Quit);
            flatten(capture.await).and(Err(e))
        }
        Stop::Interrupted => {
            info!("Interrupted, stopping capture loop");
            let _ = control_tx.send(ControlEvent::Quit);
            flatten(capture.await)
        }
    };

    if let Err(e) = &result {
        error!("seerd stopped: {:#}", e);
    } else {
        info!("seerd stopped");
    }
    result
}

enum Stop {
    Finished(Result<()>),
    ServerFailed(anyhow::Error),
    Interrupted,
}

fn flatten(joined: Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| anyhow::anyhow!("Capture thread failed: {}", e))?
}

async fn provision_models(config: &Config) -> Result<()> {
    let download_timeout = Duration::from_secs(config.timeouts.model_download_timeout_seconds);

    let objects = ModelFile {
        name: "YOLO",
        path: &config.objects.model_path,
        url: config.objects.model_url.as_deref(),
        checksum: config.objects.model_checksum.as_deref(),
    };
    let faces = ModelFile {
        name: "Face detector",
        path: &config.faces.model_path,
        url: config.faces.model_url.as_deref(),
        checksum: config.faces.model_checksum.as_deref(),
    };

    for model in [objects, faces] {
        ensure_model(&model, download_timeout).await?;
    }
    Ok(())
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let objects = vision::load_object_recognizer(&config.objects)?;
    let faces = SeetaFaceRecognizer::load(&config.faces)?;
    let text = TesseractReader::new(&config.ocr)?;
    let speaker = EspeakSpeaker::new(&config.speech)?;

    Ok(Dispatcher::new(
        objects,
        Box::new(faces),
        Box::new(text),
        Box::new(speaker),
    ))
}

/// Everything the capture loop owns is created here, on the blocking thread.
#[cfg(feature = "camera")]
fn run_capture_loop(
    config: &Config,
    remote: ChannelInput,
    status: watch::Sender<StatusInfo>,
    keyboard: bool,
) -> Result<()> {
    use seerd::assistant::Assistant;
    use seerd::camera::Camera;
    use seerd::control::{key_help, open_optional, KeyboardInput};

    let store = CaptureStore::open(&config.capture.directory)?;
    let dispatcher = build_dispatcher(config)?;
    let camera = Camera::open(&config.camera)?;

    let mut assistant = Assistant::new(
        camera,
        store,
        dispatcher,
        config.capture.initial_mode,
        config.capture.interval(),
        status,
    )
    .with_input(Box::new(remote));

    info!("Ready");
    println!("{}", key_help());
    if keyboard {
        if let Some(input) = open_optional("Keyboard", KeyboardInput::new) {
            assistant = assistant.with_input(input);
        }
    }

    assistant.run()?;
    Ok(())
}

#[cfg(not(feature = "camera"))]
fn run_capture_loop(
    config: &Config,
    _remote: ChannelInput,
    _status: watch::Sender<StatusInfo>,
    _keyboard: bool,
) -> Result<()> {
    CaptureStore::open(&config.capture.directory)?;
    build_dispatcher(config)?;
    anyhow::bail!(
        "cannot open camera {}: seerd was built without the `camera` feature",
        config.camera.device
    )
}
