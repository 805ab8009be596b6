//! sightline_web - browser upload front-end for sightline
//!
//! Serves an upload page; each uploaded video is scanned and answered with an
//! HTML report of the detection intervals.

use anyhow::Result;
use clap::Parser;
use std::sync::mpsc;

use sightline::server::UploadServer;
use sightline::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "sightline_web", version, about = "Upload videos and view detection intervals")]
struct Args {
    /// Listen address (overrides SIGHTLINE_ADDR)
    #[arg(long, value_name = "ADDR")]
    addr: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = AppConfig::load()?;
    if let Some(addr) = args.addr {
        cfg.server_addr = addr;
    }

    let handle = UploadServer::new(cfg.clone()).spawn()?;
    log::info!("upload page at http://{}/", handle.addr);
    log::info!(
        "detector '{}', target class {} ({}), stride {}",
        cfg.detector.backend,
        cfg.scan.target_class,
        cfg.report.target_label,
        cfg.scan.stride
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("sightline_web waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping upload server...");
    handle.stop()?;

    Ok(())
}
