//! tts-batch - batch text-to-speech and bulk rename driven by CSV tables.

use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tts_batch::backends::edge::EdgeTtsBackend;
use tts_batch::batch::{spawn_batch, BatchOptions, BatchResult, BatchRunner, ProgressEvent};
use tts_batch::catalog::{self, VoiceLabels};
use tts_batch::config_loader::Settings;
use tts_batch::report::BatchSummary;
use tts_batch::{rename, table};

/// Batch text-to-speech and bulk file renaming
#[derive(Parser)]
#[command(name = "tts-batch")]
#[command(author = "StarTuz")]
#[command(version)]
#[command(about = "Batch text-to-speech and bulk rename driven by CSV tables", long_about = None)]
struct Cli {
    /// Extra config file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize every row of a CSV table into audio files
    Synth {
        /// CSV file; the first column of each row after the header is spoken
        input: PathBuf,
        /// Directory the audio files are written to
        #[arg(short, long)]
        output: PathBuf,
        /// Engine voice identifier
        #[arg(long)]
        voice: Option<String>,
        /// Voice display label as printed by `voices`
        #[arg(long, conflicts_with = "voice")]
        voice_label: Option<String>,
        /// Speaking rate, e.g. +10% or -20%
        #[arg(long, allow_hyphen_values = true)]
        rate: Option<String>,
        /// Volume, e.g. +0% or -50%
        #[arg(long, allow_hyphen_values = true)]
        volume: Option<String>,
        /// Attempts per row
        #[arg(long)]
        retries: Option<u32>,
        /// Write a JSON report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Rename files in a folder from an old-name/new-name CSV table
    Rename {
        /// CSV file with old name and new name columns
        input: PathBuf,
        /// Folder containing the files
        #[arg(short, long)]
        folder: PathBuf,
        /// Write a JSON report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List the engine's voices
    Voices {
        /// Only show voices whose locale starts with this prefix (e.g. zh, en-US)
        #[arg(short, long)]
        locale: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_labels(settings: &Settings) -> Result<VoiceLabels, Box<dyn Error>> {
    match &settings.voice_labels_path {
        Some(path) => Ok(VoiceLabels::from_file(path)?),
        None => Ok(VoiceLabels::builtin().clone()),
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
    {
        bar.set_style(style);
    }
    bar
}

fn finish<E: std::fmt::Display>(
    result: &BatchResult<E>,
    started_at: chrono::DateTime<Utc>,
    report: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    println!(
        "{} done: {} succeeded, {} skipped, {} failed",
        result.kind,
        result.successes(),
        result.skips(),
        result.failures()
    );

    if let Some(path) = report {
        BatchSummary::from_result(result, started_at, Utc::now()).write_json(path)?;
        println!("Report written to {}", path.display());
    }

    match result.failure_report() {
        Some(report) => {
            eprintln!("{}", report);
            Err(format!("{} item(s) failed", result.failures()).into())
        }
        None => Ok(()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Synth {
            input,
            output,
            voice,
            voice_label,
            rate,
            volume,
            retries,
            report,
        } => {
            let engine = Arc::new(EdgeTtsBackend::from_settings(&settings));

            let mut config = settings.synthesis_config();
            if let Some(v) = voice {
                config.voice_id = v;
            }
            if let Some(label) = voice_label {
                let labels = load_labels(&settings)?;
                let voices = catalog::list_voices(engine.as_ref(), &labels)?;
                let found = catalog::find_voice(&voices, &label)
                    .ok_or_else(|| format!("no voice matches '{}'", label))?;
                config.voice_id = found.short_name.clone();
            }
            if let Some(r) = rate {
                config.rate = r;
            }
            if let Some(v) = volume {
                config.volume = v;
            }

            let mut options = BatchOptions::from_settings(&settings);
            if let Some(n) = retries {
                options.max_retries = n;
            }

            let items = table::read_text_rows(&input)?;
            println!(
                "Synthesizing {} row(s) with {} (rate {}, volume {})",
                items.len(),
                config.voice_id,
                config.rate,
                config.volume
            );

            let started_at = Utc::now();
            let bar = progress_bar(items.len());
            let runner = Arc::new(BatchRunner::new(engine, options));
            let handle = spawn_batch(runner, items, output, config, None);

            for ProgressEvent { current, .. } in handle.progress.iter() {
                bar.set_position(current as u64);
            }
            bar.finish_and_clear();

            let result = handle.join()?;
            finish(&result, started_at, report.as_deref())?;
        }

        Commands::Rename {
            input,
            folder,
            report,
        } => {
            let pairs = table::read_rename_pairs(&input)?;
            let started_at = Utc::now();
            let bar = progress_bar(pairs.len());
            let sink = |event: ProgressEvent| bar.set_position(event.current as u64);

            let result = rename::rename_batch(&pairs, &folder, &sink);
            bar.finish_and_clear();
            finish(&result, started_at, report.as_deref())?;
        }

        Commands::Voices { locale } => {
            let engine = EdgeTtsBackend::from_settings(&settings);
            let labels = load_labels(&settings)?;
            let voices = catalog::list_voices(&engine, &labels)?;

            let shown: Vec<_> = voices
                .iter()
                .filter(|v| {
                    locale
                        .as_deref()
                        .map_or(true, |prefix| v.locale.starts_with(prefix))
                })
                .collect();

            if shown.is_empty() {
                println!("No voices found");
            } else {
                println!("Available Voices");
                println!("────────────────");
                for voice in shown {
                    println!("  {} ({})", voice.display_label, voice.short_name);
                }
            }
        }
    }

    Ok(())
}
