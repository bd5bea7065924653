use std::path::PathBuf;

use clap::Parser;

use droidscout::agent::{Explorer, SessionReport, SessionStatus, Workspace};
use droidscout::config;
use droidscout::console;
use droidscout::device::{self, AdbController, DeviceController};
use droidscout::errors::{ScoutError, ScoutResult};
use droidscout::llm::OpenAiCompatibleModel;

#[derive(Parser)]
#[command(
    name = "droidscout",
    version,
    about = "Autonomous mobile UI exploration agent"
)]
struct Cli {
    /// Target application name; asked interactively when absent.
    #[arg(long)]
    app: Option<String>,

    /// Task description; asked interactively when absent.
    #[arg(long)]
    task: Option<String>,

    /// Root directory for session artifacts (overrides [session].root_dir).
    #[arg(long)]
    root_dir: Option<PathBuf>,

    /// Device serial (overrides [device].serial).
    #[arg(long)]
    serial: Option<String>,

    /// Maximum exploration rounds (overrides [session].max_rounds).
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Path to config.toml; defaults to the executable's directory, then
    /// the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(report) => {
            if report.status == SessionStatus::Completed
                || report.status == SessionStatus::MaxRoundsReached
            {
                std::process::exit(0);
            }
            std::process::exit(1);
        }
        Err(e) => {
            console::error(&format!("ERROR: {e}"));
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> ScoutResult<SessionReport> {
    let mut cfg = config::load_config(cli.config.as_deref())?;
    if let Some(max_rounds) = cli.max_rounds {
        cfg.session.max_rounds = max_rounds;
    }
    if let Some(root_dir) = cli.root_dir {
        cfg.session.root_dir = Some(root_dir);
    }
    if let Some(serial) = cli.serial {
        cfg.device.serial = Some(serial);
    }

    let app = match cli.app {
        Some(app) => app,
        None => console::ask("What is the name of the target app?")?,
    }
    .replace(' ', "");
    if app.is_empty() {
        return Err(ScoutError::Config("no target app given".into()));
    }

    let devices = device::list_devices(&cfg.device.adb_path).await?;
    if devices.is_empty() {
        return Err(ScoutError::Config("no device found".into()));
    }
    console::info(&format!("List of devices attached:\n{devices:?}"));

    let serial = match cfg.device.serial.clone() {
        Some(serial) => serial,
        None if devices.len() == 1 => devices[0].clone(),
        None => console::ask("Please choose a device by entering its serial:")?,
    };
    if !devices.contains(&serial) {
        return Err(ScoutError::Config(format!("device {serial} not attached")));
    }

    let controller = AdbController::connect(&cfg.device.adb_path, &serial).await?;
    let (width, height) = controller.screen_size().await?;
    console::info(&format!("Screen resolution of {serial}: {width}x{height}"));

    let task = match cli.task {
        Some(task) => task,
        None => console::ask(
            "Please enter the description of the task you want me to complete in a few sentences:",
        )?,
    };
    if task.trim().is_empty() {
        return Err(ScoutError::Config("no task description given".into()));
    }

    let workspace = Workspace::create(cfg.session.root_dir.as_deref(), &app)?;
    let oracle = OpenAiCompatibleModel::from_config(&cfg.oracle)?;
    let explorer = Explorer::new(controller, oracle, &cfg, workspace);

    let report = explorer.run(&task).await?;
    match report.status {
        SessionStatus::Completed => {
            console::success("Autonomous exploration completed successfully.");
        }
        SessionStatus::MaxRoundsReached => {
            console::info("Autonomous exploration finished after reaching the round limit.");
        }
        _ => {
            console::error(&format!(
                "Autonomous exploration finished unexpectedly after round {}.",
                report.rounds
            ));
        }
    }
    Ok(report)
}
