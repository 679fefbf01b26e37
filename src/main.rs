// main.rs
//
// Command-line front end over the echoscribe library.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;

use echoscribe::{
    export, ApiConfig, AssemblyAiClient, JobController, JobEvent, JobStage, LiveTranscriber,
    MediaFile, UnsupportedEngine,
};

#[derive(Parser)]
#[command(name = "echoscribe", about = "Transcribe media files and live speech")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a video or audio file and save its transcript.
    Transcribe {
        /// Media file to transcribe (max 100MB).
        file: PathBuf,
        /// Directory for the exported transcript (defaults to the cwd).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Transcribe microphone speech with the platform recognition engine.
    Listen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Transcribe { file, out } => transcribe(file, out).await,
        Command::Listen => listen().await,
    }
}

async fn transcribe(file: PathBuf, out: Option<PathBuf>) -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;
    let media = MediaFile::from_path(&file)?;
    let source_name = media.name().to_string();
    info!("selected {} ({} bytes)", source_name, media.size());

    let client = Arc::new(AssemblyAiClient::new(config));
    let (controller, mut events) = JobController::new(client);
    controller.transcribe(media)?;

    while let Some(event) = events.recv().await {
        match event {
            JobEvent::Stage(stage) => {
                let label = match stage {
                    JobStage::Uploading => "uploading media",
                    JobStage::Submitting => "starting transcription",
                    JobStage::Polling => "waiting for transcript",
                };
                eprintln!("{label}...");
            }
            JobEvent::Completed { text } => {
                let dir = out.unwrap_or_else(|| PathBuf::from("."));
                let path = export::save_transcript(&dir, Some(&source_name), &text)
                    .context("failed to save transcription")?;
                println!("{}", path.display());
                return Ok(());
            }
            JobEvent::Failed { message } => bail!(message),
        }
    }

    bail!("transcription ended without a result")
}

async fn listen() -> anyhow::Result<()> {
    // No recognition engine binding ships with the CLI build; this reports
    // the missing capability the same way the batch path reports errors.
    let mut live = LiveTranscriber::new(Box::new(UnsupportedEngine));
    match live.start_listening() {
        Ok(()) => {
            live.ended().await;
            let transcript = live.transcript();
            println!("{}", transcript.finalized());
            Ok(())
        }
        Err(e) => bail!(e),
    }
}
