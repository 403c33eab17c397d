mod scripted;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facegate_core::launch::domain::action_launcher::ActionLauncher;
use facegate_core::launch::infrastructure::process_launcher::ProcessLauncher;
use facegate_core::session::controller::SessionController;
use facegate_core::session::frame_slot::FrameSlot;
use facegate_core::session::infrastructure::timer_session_runner::{
    CycleConfig, TimerSessionRunner,
};
use facegate_core::storage::infrastructure::json_face_store::JsonFaceStore;

use scripted::{DryRunLauncher, Scenario, ScriptedDetector, ScriptedFrameSource, ScriptedRecognizer};

/// Face-gated browser sessions, replayed from a recorded scenario.
#[derive(Parser)]
#[command(name = "facegate")]
struct Cli {
    /// Scenario file to replay (JSON).
    script: PathBuf,

    /// Launch the real platform browser instead of logging launches.
    #[arg(long)]
    launch: bool,

    /// Browser command override, comma-separated argv; the URL is appended.
    #[arg(long, value_delimiter = ',')]
    browser_command: Option<Vec<String>>,

    /// Detection cycle interval in milliseconds.
    #[arg(long, default_value = "50")]
    detect_interval_ms: u64,

    /// Recognition cycle interval in milliseconds.
    #[arg(long, default_value = "700")]
    recognize_interval_ms: u64,

    /// Face store root (defaults to the platform data directory).
    #[arg(long)]
    store_root: Option<PathBuf>,

    /// Enroll the first face seen mid-replay under this user name.
    #[arg(long, requires = "enroll_url")]
    enroll: Option<String>,

    /// URL to associate with --enroll.
    #[arg(long, requires = "enroll")]
    enroll_url: Option<String>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let raw = std::fs::read_to_string(&cli.script)?;
    let scenario = Scenario::parse(&raw)?;
    if scenario.steps.is_empty() {
        return Err("scenario has no steps".into());
    }

    let store = match &cli.store_root {
        Some(root) => JsonFaceStore::open(root),
        None => JsonFaceStore::open_default()?,
    };
    log::info!("face store at {}", store.root().display());

    let launcher: Box<dyn ActionLauncher> = if cli.launch {
        match &cli.browser_command {
            Some(argv) => Box::new(ProcessLauncher::with_browser_command(argv.clone())),
            None => Box::new(ProcessLauncher::new()),
        }
    } else {
        Box::new(DryRunLauncher::new())
    };

    let config = CycleConfig {
        detect_interval: Duration::from_millis(cli.detect_interval_ms),
        recognize_interval: Duration::from_millis(cli.recognize_interval_ms),
    };
    let steps = scenario.steps.len() as u32;
    let step_time = config.recognize_interval;

    let slot = Arc::new(FrameSlot::new());
    let controller = SessionController::new(
        Box::new(ScriptedDetector::new(&scenario)),
        Box::new(ScriptedRecognizer::new(&scenario)),
        launcher,
        Box::new(store),
        slot.clone(),
    );
    let source = ScriptedFrameSource::new(&scenario, step_time);

    log::info!("replaying {} step(s) from {}", steps, cli.script.display());
    let handle = TimerSessionRunner::new(config).run(controller, Box::new(source), slot);

    if let (Some(user), Some(url)) = (&cli.enroll, &cli.enroll_url) {
        // Let the replay reach its midpoint so there is a face to enroll.
        std::thread::sleep(step_time * (steps / 2).max(1));
        match handle.prepare_enrollment()? {
            Some(preview) => {
                if let Some((known, _)) = &preview.prefill {
                    log::info!("face already enrolled as '{known}'");
                }
                handle.save_face(user, url, &preview.image)?;
                log::info!("enrolled '{user}' ({} byte sample)", preview.image.len());
            }
            None => log::warn!("no face in frame, enrollment skipped"),
        }
        std::thread::sleep(step_time * (steps - (steps / 2).max(1) + 1));
    } else {
        std::thread::sleep(step_time * (steps + 1));
    }

    handle.shutdown()?;
    log::info!("replay finished");
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.script.exists() {
        return Err(format!("scenario file not found: {}", cli.script.display()).into());
    }
    if cli.detect_interval_ms == 0 || cli.recognize_interval_ms == 0 {
        return Err("cycle intervals must be positive".into());
    }
    if cli.recognize_interval_ms < cli.detect_interval_ms {
        return Err(format!(
            "recognition interval ({}ms) must not be shorter than detection interval ({}ms)",
            cli.recognize_interval_ms, cli.detect_interval_ms
        )
        .into());
    }
    if cli.browser_command.is_some() && !cli.launch {
        return Err("--browser-command requires --launch".into());
    }
    Ok(())
}
