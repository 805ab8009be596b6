//! sightline - scan a video for a target class and list detection intervals
//!
//! This tool:
//! 1. Decodes the video and samples every Nth frame
//! 2. Runs the configured detector restricted to the target class
//! 3. Writes detected frames to the output directory
//! 4. Groups consecutive detections into intervals and reports them

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

use sightline::report::{render_html, render_json, render_text};
use sightline::ui::Ui;
use sightline::{build_backend, scan, AppConfig, ClassId, FileConfig, FileSource, FrameStore};

#[derive(Parser, Debug)]
#[command(name = "sightline", version, about = "Find intervals where an object appears in a video")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a local video file (or stub://<name> for synthetic frames)
    Scan {
        /// Path to the video file
        video: String,
        /// Raw frames between evaluated samples
        #[arg(long)]
        stride: Option<u64>,
        /// Detector class id to look for
        #[arg(long)]
        target_class: Option<u32>,
        /// Human name of the target class
        #[arg(long)]
        label: Option<String>,
        /// Directory for detected frames
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Detector backend (stub|tract)
        #[arg(long)]
        backend: Option<String>,
        /// ONNX model path for the tract backend
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
        /// Write the HTML report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
        /// Print the result as JSON instead of text
        #[arg(long)]
        json: bool,
        /// UI mode for stderr progress (auto|plain|pretty)
        #[arg(long, default_value = "auto", value_name = "MODE")]
        ui: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Scan {
            video,
            stride,
            target_class,
            label,
            out,
            backend,
            model,
            report,
            json,
            ui,
        } => {
            let mut cfg = AppConfig::load()?;
            if let Some(stride) = stride {
                cfg.scan.stride = stride;
            }
            if let Some(class) = target_class {
                cfg.scan.target_class = ClassId(class);
            }
            if let Some(label) = label {
                cfg.report.target_label = label;
            }
            if let Some(out) = out {
                cfg.output_dir = out;
            }
            if let Some(backend) = backend {
                cfg.detector.backend = backend;
            }
            if model.is_some() {
                cfg.detector.model_path = model;
            }
            cfg.validate()?;

            let ui = Ui::from_args(Some(&ui), std::io::stderr().is_terminal());
            run_scan(&cfg, &video, report, json, &ui)
        }
    }
}

fn run_scan(
    cfg: &AppConfig,
    video: &str,
    report_path: Option<PathBuf>,
    json: bool,
    ui: &Ui,
) -> Result<()> {
    let mut source = {
        let _stage = ui.stage("Open video");
        FileSource::open(FileConfig {
            path: video.to_string(),
            allowed_extensions: cfg.upload.allowed_extensions.clone(),
            ..FileConfig::default()
        })?
    };
    let mut detector = {
        let _stage = ui.stage("Load detector");
        build_backend(&cfg.detector)?
    };
    let store = FrameStore::open(&cfg.output_dir)?;

    let report = {
        let scan_progress = ui.scan(video, &cfg.report.target_label);
        let mut progress = |frames: u64, closed: usize| scan_progress.update(frames, closed);
        scan(
            &mut source,
            &mut detector,
            &store,
            cfg.scan,
            Some(&mut progress),
        )?
    };

    if let Some(path) = report_path {
        let _stage = ui.stage("Render report");
        let html = render_html(&report, &cfg.report)?;
        std::fs::write(&path, html)
            .with_context(|| format!("writing report to {}", path.display()))?;
        log::info!("report written to {}", path.display());
    }

    if json {
        println!("{}", render_json(&report)?);
    } else {
        print!("{}", render_text(&report, &cfg.report.target_label));
        println!("frames stored in {}", store.dir().display());
    }
    Ok(())
}
