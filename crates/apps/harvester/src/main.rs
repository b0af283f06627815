//! Harvester - incremental mailbox export
//!
//! Runs one synchronization of the configured mailbox and exits. Re-running
//! resumes from the last committed checkpoint. `--rebuild-summary` and
//! `--render-pdf` post-process an already harvested day instead.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info, warn};
use mailharvest::{
    CancelFlag, ClientCredentialsAuth, GraphCredentials, GraphMailboxClient, HarvestConfig,
    SyncOrchestrator, Wkhtmltopdf, rebuild_summary, render_day,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Harvest new messages from a mailbox into numbered folders")]
struct Args {
    /// Settings file (defaults to ~/.config/mailharvest/harvest.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Regenerate a summary CSV from an existing day folder instead of syncing
    #[arg(long, value_name = "DAY_DIR")]
    rebuild_summary: Option<PathBuf>,

    /// Output CSV for --rebuild-summary
    #[arg(long, value_name = "CSV", requires = "rebuild_summary")]
    out: Option<PathBuf>,

    /// Convert every folder of a day to PDF and bundle each folder's PDFs
    #[arg(long, value_name = "DAY_DIR", conflicts_with = "rebuild_summary")]
    render_pdf: Option<PathBuf>,

    /// wkhtmltopdf executable for --render-pdf (defaults to the one on PATH)
    #[arg(long, value_name = "PATH", requires = "render_pdf")]
    wkhtmltopdf: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<HarvestConfig> {
    if let Some(path) = path {
        return HarvestConfig::from_file(path);
    }
    if config::config_exists(mailharvest::config::CONFIG_FILE) {
        return HarvestConfig::load();
    }

    let Some(path) = config::config_path(mailharvest::config::CONFIG_FILE) else {
        bail!("Could not determine config directory");
    };
    config::save_json_file(&path, &HarvestConfig::template())?;
    bail!(
        "No harvest settings found. A template was written to {}; edit it and run again.",
        path.display()
    )
}

fn run_rebuild(day_dir: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let out = out.unwrap_or_else(|| day_dir.join("summary.csv"));
    rebuild_summary(&day_dir, &out)
        .with_context(|| format!("Failed to rebuild summary from {}", day_dir.display()))?;
    Ok(())
}

fn run_render_pdf(day_dir: PathBuf, program: Option<PathBuf>) -> Result<bool> {
    let converter = program.map(Wkhtmltopdf::new).unwrap_or_default();
    let report = render_day(&day_dir, &converter)
        .with_context(|| format!("Failed to render {}", day_dir.display()))?;
    Ok(report.failed == 0)
}

fn run_sync(cfg: HarvestConfig) -> Result<bool> {
    let credentials = GraphCredentials::load().inspect_err(|_| {
        if let Some(path) = GraphCredentials::default_credentials_path() {
            warn!(
                "To configure Graph access, either:\n\
                 1. Place your application credentials at: {}\n\
                 2. Or set HARVEST_TENANT_ID, HARVEST_CLIENT_ID and HARVEST_CLIENT_SECRET",
                path.display()
            );
        }
    })?;

    let auth = Arc::new(ClientCredentialsAuth::new(credentials));
    let mailbox = GraphMailboxClient::new(&cfg.mailbox, auth);
    let checkpoints = cfg.checkpoint_store();
    let summary = cfg.summary_recorder();
    let materializer = cfg.materializer();

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after the current message");
        handler_flag.cancel();
    })
    .context("Failed to install interrupt handler")?;

    info!("Writing to {}", cfg.output_root.display());

    let report = SyncOrchestrator::new(
        cfg.sync_options(),
        &mailbox,
        &checkpoints,
        &summary,
        &materializer,
    )
    .with_cancel_flag(cancel)
    .run();

    // The orchestrator has already logged the terminal line
    Ok(report.is_success())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let args = Args::parse();

    let result = match (args.rebuild_summary, args.render_pdf) {
        (Some(day_dir), _) => run_rebuild(day_dir, args.out).map(|_| true),
        (None, Some(day_dir)) => run_render_pdf(day_dir, args.wkhtmltopdf),
        (None, None) => load_config(args.config.as_ref()).and_then(run_sync),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
