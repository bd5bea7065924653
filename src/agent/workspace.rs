use std::path::{Path, PathBuf};

use crate::errors::ScoutResult;

/// Per-session artifact directory:
/// `<root>/apps/<app>/demos/explore_<timestamp>/`, holding the round
/// screenshots and the two append-only logs.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub task_name: String,
    pub task_dir: PathBuf,
    pub explore_log: PathBuf,
    /// Reserved for a secondary reflection pass; created empty up front.
    pub reflect_log: PathBuf,
}

impl Workspace {
    pub fn create(root: Option<&Path>, app: &str) -> ScoutResult<Self> {
        let root = root.map(Path::to_path_buf).unwrap_or_else(default_root);
        let task_name = format!(
            "explore_{}",
            chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        let task_dir = root.join("apps").join(app).join("demos").join(&task_name);
        std::fs::create_dir_all(&task_dir)?;

        let explore_log = task_dir.join(format!("log_explore_{task_name}.jsonl"));
        let reflect_log = task_dir.join(format!("log_reflect_{task_name}.jsonl"));
        touch(&explore_log)?;
        touch(&reflect_log)?;

        tracing::info!(dir = %task_dir.display(), "workspace created");
        Ok(Self {
            task_name,
            task_dir,
            explore_log,
            reflect_log,
        })
    }
}

fn touch(path: &Path) -> ScoutResult<()> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(())
}

/// `~/.local/share/droidscout` (or platform equivalent), falling back to the
/// working directory.
fn default_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("droidscout"))
        .unwrap_or_else(|| PathBuf::from("."))
}
