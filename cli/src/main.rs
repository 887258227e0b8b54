mod client;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use client::DaemonClient;
use shared::ipc::{Command, Response};
use shared::Mode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seer")]
#[command(about = "CLI tool for the seer camera assistant daemon")]
struct Cli {
    /// Daemon socket (defaults to $XDG_RUNTIME_DIR/seerd.sock)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch what the daemon looks for
    Mode { mode: ModeArg },
    Status,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Objects,
    Faces,
    Text,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Objects => Mode::ObjectDetection,
            ModeArg::Faces => Mode::FaceRecognition,
            ModeArg::Text => Mode::TextRecognition,
        }
    }
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Mode { mode } => Command::SetMode(mode.into()),
            Commands::Status => Command::Status,
            Commands::Quit => Command::Quit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = match cli.socket {
        Some(path) => DaemonClient::with_socket_path(path),
        None => DaemonClient::new(),
    };

    match client.send_command(cli.command.into()).await {
        Ok(Response::Ok) => {
            println!("Success");
        }
        Ok(Response::Status(info)) => {
            println!("Status:");
            println!("  Running: {}", info.is_running);
            println!("  Mode: {}", info.mode);
            println!("  Frames processed: {}", info.frames_processed);
            println!("  Failures: {}", info.failures);
            println!("  Interval: {} ms", info.interval_ms);
        }
        Ok(Response::Error(msg)) => {
            eprintln!("Error: {}", msg);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to connect to seerd: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
