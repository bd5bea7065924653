//! State-machine tests for the exploration loop, driven by a scripted
//! oracle and a mock device instead of live transports.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use droidscout::actions::{SwipeDirection, SwipeDistance};
use droidscout::agent::{Explorer, SessionStatus, Workspace};
use droidscout::config::{ActionsConfig, AppConfig, DeviceConfig, OracleConfig, SessionConfig};
use droidscout::device::DeviceController;
use droidscout::errors::{ScoutError, ScoutResult};
use droidscout::llm::VisionModel;

const TAP_REPLY: &str = "Observation: A home screen.\n\
                         Thought: Tap the icon.\n\
                         Action: tap(500, 600)\n\
                         Summary: I tapped the app icon.";

#[derive(Clone)]
struct MockDevice {
    size: (u32, u32),
    /// When set, screenshots are real PNGs of this size (needed for grid
    /// rounds, which read the image dimensions back).
    screenshot_size: Option<(u32, u32)>,
    fail_tap: bool,
    taps: Arc<Mutex<Vec<(i32, i32)>>>,
    texts: Arc<Mutex<Vec<String>>>,
    enters: Arc<Mutex<u32>>,
    swipes: Arc<Mutex<Vec<(i32, i32, SwipeDirection, SwipeDistance)>>>,
}

impl MockDevice {
    fn new(size: (u32, u32)) -> Self {
        Self {
            size,
            screenshot_size: None,
            fail_tap: false,
            taps: Arc::new(Mutex::new(Vec::new())),
            texts: Arc::new(Mutex::new(Vec::new())),
            enters: Arc::new(Mutex::new(0)),
            swipes: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl DeviceController for MockDevice {
    async fn screen_size(&self) -> ScoutResult<(u32, u32)> {
        Ok(self.size)
    }

    async fn capture_screenshot(&self, label: &str, dir: &Path) -> ScoutResult<PathBuf> {
        let path = dir.join(format!("{label}.png"));
        match self.screenshot_size {
            Some((w, h)) => {
                image::RgbaImage::from_pixel(w, h, image::Rgba([10, 10, 10, 255]))
                    .save(&path)
                    .map_err(|e| ScoutError::Device(e.to_string()))?;
            }
            None => std::fs::write(&path, b"stub-screenshot")?,
        }
        Ok(path)
    }

    async fn tap(&self, x: i32, y: i32) -> ScoutResult<()> {
        if self.fail_tap {
            return Err(ScoutError::Device("tap refused".into()));
        }
        self.taps.lock().unwrap().push((x, y));
        Ok(())
    }

    async fn input_text(&self, text: &str) -> ScoutResult<()> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn press_enter(&self) -> ScoutResult<()> {
        *self.enters.lock().unwrap() += 1;
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32) -> ScoutResult<()> {
        self.taps.lock().unwrap().push((x, y));
        Ok(())
    }

    async fn swipe(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: SwipeDistance,
    ) -> ScoutResult<()> {
        self.swipes.lock().unwrap().push((x, y, direction, distance));
        Ok(())
    }
}

/// Replays queued replies in order; once the queue runs dry every further
/// call gets the fallback reply.
struct ScriptedOracle {
    replies: Mutex<VecDeque<ScoutResult<String>>>,
    fallback: String,
}

impl ScriptedOracle {
    fn new(replies: Vec<ScoutResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: "Action: FINISH".into(),
        }
    }

    fn with_fallback(replies: Vec<ScoutResult<String>>, fallback: &str) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: fallback.into(),
        }
    }
}

#[async_trait]
impl VisionModel for ScriptedOracle {
    async fn get_response(&self, _prompt: &str, _images: &[PathBuf]) -> ScoutResult<String> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

fn test_config(max_rounds: u32) -> AppConfig {
    AppConfig {
        oracle: OracleConfig {
            api_base: "http://localhost/unused".into(),
            model: "scripted".into(),
            temperature: 0.0,
            max_tokens: 64,
            api_key: None,
        },
        session: SessionConfig {
            max_rounds,
            request_interval_secs: 0,
            root_dir: None,
        },
        device: DeviceConfig::default(),
        actions: ActionsConfig::default(),
    }
}

fn workspace_in(dir: &Path) -> Workspace {
    Workspace::create(Some(dir), "testapp").unwrap()
}

fn log_entries(workspace: &Workspace) -> usize {
    std::fs::read_to_string(&workspace.explore_log)
        .unwrap()
        .lines()
        .count()
}

#[tokio::test]
async fn completes_when_oracle_finishes_on_round_three() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let device = MockDevice::new((1000, 1000));
    let taps = device.taps.clone();
    let oracle = ScriptedOracle::new(vec![
        Ok(TAP_REPLY.into()),
        Ok(TAP_REPLY.into()),
        Ok("Action: FINISH".into()),
    ]);

    let explorer = Explorer::new(device, oracle, &test_config(10), workspace.clone());
    let report = explorer.run("open the app").await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.rounds, 3);
    assert_eq!(log_entries(&workspace), 3);
    assert_eq!(taps.lock().unwrap().as_slice(), &[(500, 600), (500, 600)]);
}

#[tokio::test]
async fn stops_after_exactly_max_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let device = MockDevice::new((1000, 1000));
    let oracle = ScriptedOracle::with_fallback(Vec::new(), TAP_REPLY);

    let explorer = Explorer::new(device, oracle, &test_config(5), workspace.clone());
    let report = explorer.run("keep tapping").await.unwrap();

    assert_eq!(report.status, SessionStatus::MaxRoundsReached);
    assert_eq!(report.rounds, 5);
    assert_eq!(log_entries(&workspace), 5);
}

#[tokio::test]
async fn malformed_reply_ends_with_failed_oracle_after_logging() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let device = MockDevice::new((1000, 1000));
    let taps = device.taps.clone();
    let oracle = ScriptedOracle::new(vec![Ok("I have no idea what to do here.".into())]);

    let explorer = Explorer::new(device, oracle, &test_config(10), workspace.clone());
    let report = explorer.run("do something").await.unwrap();

    assert_eq!(report.status, SessionStatus::FailedOracle);
    assert_eq!(report.rounds, 1);
    // The oracle call itself succeeded, so the round was logged.
    assert_eq!(log_entries(&workspace), 1);
    assert!(taps.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transport_failure_ends_with_failed_oracle_and_no_log_entry() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let device = MockDevice::new((1000, 1000));
    let oracle = ScriptedOracle::new(vec![Err(ScoutError::Oracle("503 backend overloaded".into()))]);

    let explorer = Explorer::new(device, oracle, &test_config(10), workspace.clone());
    let report = explorer.run("do something").await.unwrap();

    assert_eq!(report.status, SessionStatus::FailedOracle);
    assert_eq!(report.rounds, 1);
    assert_eq!(log_entries(&workspace), 0);
}

#[tokio::test]
async fn device_failure_ends_with_failed_execution() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let mut device = MockDevice::new((1000, 1000));
    device.fail_tap = true;
    let oracle = ScriptedOracle::new(vec![Ok(TAP_REPLY.into())]);

    let explorer = Explorer::new(device, oracle, &test_config(10), workspace.clone());
    let report = explorer.run("tap once").await.unwrap();

    assert_eq!(report.status, SessionStatus::FailedExecution);
    assert_eq!(report.rounds, 1);
    assert_eq!(log_entries(&workspace), 1);
}

#[tokio::test]
async fn grid_request_switches_addressing_and_resolves_cells() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let mut device = MockDevice::new((240, 360));
    // Real PNGs so the grid round can derive the partition: 240x360 gives
    // 120-pixel cells, 2 columns x 3 rows.
    device.screenshot_size = Some((240, 360));
    let taps = device.taps.clone();
    let oracle = ScriptedOracle::new(vec![
        Ok("Action: grid()\nSummary: ignored".into()),
        Ok("Action: tap(1, \"center\")\nSummary: Tapped the first cell.".into()),
        Ok("Action: FINISH".into()),
    ]);

    let explorer = Explorer::new(device, oracle, &test_config(10), workspace.clone());
    let report = explorer.run("tap the corner").await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.rounds, 3);
    // Cell 1 spans (0,0)..(120,120); its center is (60,60).
    assert_eq!(taps.lock().unwrap().as_slice(), &[(60, 60)]);
    // The grid round captured an overlay image alongside the screenshot.
    assert!(workspace.task_dir.join("2_grid.png").exists());
    assert!(workspace.task_dir.join("2.png").exists());
}

#[tokio::test]
async fn type_text_runs_the_nested_localization_protocol() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let device = MockDevice::new((1000, 1000));
    let taps = device.taps.clone();
    let texts = device.texts.clone();
    let enters = device.enters.clone();
    let oracle = ScriptedOracle::new(vec![
        Ok("Action: text(\"Hello, world!\", \"the search bar\")\n\
            Summary: I typed a greeting."
            .into()),
        // Reply to the nested localization query.
        Ok("The search bar is at [[100, 200, 300, 400]].".into()),
        Ok("Action: FINISH".into()),
    ]);

    let explorer = Explorer::new(device, oracle, &test_config(10), workspace.clone());
    let report = explorer.run("search for something").await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.rounds, 2);
    // Only the two main rounds are logged; the nested call is part of the
    // text action.
    assert_eq!(log_entries(&workspace), 2);
    // Box center (200, 300) on the 0-1000 scale against a 1000x1000 screen.
    assert_eq!(taps.lock().unwrap().as_slice(), &[(200, 300)]);
    assert_eq!(texts.lock().unwrap().as_slice(), &["Hello, world!".to_string()]);
    assert_eq!(*enters.lock().unwrap(), 1);
}

#[tokio::test]
async fn localization_parse_failure_is_an_oracle_failure() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let device = MockDevice::new((1000, 1000));
    let texts = device.texts.clone();
    let oracle = ScriptedOracle::new(vec![
        Ok("Action: text(\"hi\", \"the field\")".into()),
        Ok("I cannot find it, sorry.".into()),
    ]);

    let explorer = Explorer::new(device, oracle, &test_config(10), workspace.clone());
    let report = explorer.run("type hi").await.unwrap();

    assert_eq!(report.status, SessionStatus::FailedOracle);
    assert_eq!(report.rounds, 1);
    assert_eq!(log_entries(&workspace), 1);
    assert!(texts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn swipe_reply_reaches_the_device() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = workspace_in(dir.path());
    let device = MockDevice::new((1000, 2000));
    let swipes = device.swipes.clone();
    let oracle = ScriptedOracle::new(vec![
        Ok("Action: swipe(500, 500, \"up\", \"medium\")\nSummary: Scrolled up.".into()),
        Ok("Action: FINISH".into()),
    ]);

    let explorer = Explorer::new(device, oracle, &test_config(10), workspace.clone());
    let report = explorer.run("scroll the feed").await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(
        swipes.lock().unwrap().as_slice(),
        &[(500, 1000, SwipeDirection::Up, SwipeDistance::Medium)]
    );
}
