use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chunked_transcribe::capture::CpalCapture;
use chunked_transcribe::config::Config;
use chunked_transcribe::engine::WhisperEngine;
use chunked_transcribe::model_download::ModelDownloader;
use chunked_transcribe::pipeline::{SessionPhase, TranscriptionPipeline};
use chunked_transcribe::transcript::TranscriptEntry;

#[derive(Parser)]
#[command(name = "chunked-transcribe")]
#[command(about = "Live chunked audio transcription with Whisper", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a Whisper model
    DownloadModel {
        /// Model to download (e.g., base.en, tiny.en, small.en). Defaults to
        /// the configured model from settings.yaml
        model: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::DownloadModel { model }) => download_model_command(&model),
        None => run_app(),
    }
}

fn download_model_command(model_name: &Option<String>) -> Result<()> {
    let model_to_download = if let Some(name) = model_name {
        name.clone()
    } else {
        let config = Config::load_or_create()?;
        println!(
            "No model specified, using configured model: {}",
            config.transcription.model
        );
        config.transcription.model
    };

    let models_dir = Config::config_dir()?.join("models");
    let downloader = ModelDownloader::new(models_dir.clone());

    println!("Available models:");
    for (name, size, desc) in ModelDownloader::list_available_models() {
        let marker = if name == model_to_download { "→" } else { " " };
        println!("  {} {} - {} ({})", marker, name, desc, size);
    }
    println!();
    println!("Models directory: {}", models_dir.display());
    println!();

    downloader.ensure_model_exists(&model_to_download)?;

    println!();
    println!("✓ Model setup complete!");

    Ok(())
}

fn run_app() -> Result<()> {
    let config = Config::load_or_create()?;

    // A failed model load means no engine and no pipeline; report and exit
    // instead of limping on with an unusable handle
    let engine = WhisperEngine::new(config.transcription.clone())
        .context("transcription is unavailable")?;
    let engine = Arc::new(Mutex::new(engine));

    let capture = CpalCapture::new()?;
    let (mut pipeline, results) = TranscriptionPipeline::new(capture, engine, &config.pipeline);

    // stdin runs on its own thread so the control loop never blocks on input
    let (input_tx, input_rx) = channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line.unwrap_or_default();
            if input_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("chunked-transcribe ({}s chunks)", config.pipeline.chunk_seconds);
    println!("Press ENTER to start/stop recording, q + ENTER to quit.");

    let mut quitting = false;
    loop {
        // Worker completions first, so a finished chunk re-opens admission
        // before the scheduler tick can queue more
        while let Ok(result) = results.try_recv() {
            match pipeline.on_result(result) {
                Some(TranscriptEntry::Text { sequence, text }) => {
                    if !text.is_empty() {
                        println!("[{}] {}", sequence, text);
                    }
                }
                Some(TranscriptEntry::Error { sequence, message }) => {
                    eprintln!("[{}] ✗ {}", sequence, message);
                }
                None => {}
            }
        }

        while let Ok(line) = input_rx.try_recv() {
            match line.trim() {
                "q" | "quit" => {
                    pipeline.stop();
                    quitting = true;
                    if pipeline.phase() == SessionPhase::Flushing {
                        println!("Flushing remaining audio...");
                    }
                }
                _ => {
                    if pipeline.is_recording() {
                        pipeline.stop();
                        println!("⏹ Stopped, flushing...");
                    } else {
                        pipeline.start()?;
                        println!("🔴 Recording...");
                    }
                }
            }
        }

        pipeline.poll();

        if quitting && pipeline.phase() == SessionPhase::Idle {
            break;
        }

        thread::sleep(Duration::from_millis(16));
    }

    if !pipeline.transcript().is_empty() {
        println!();
        println!("Transcript:");
        println!("{}", pipeline.transcript().render());
    }

    Ok(())
}
