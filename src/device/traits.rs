use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::actions::{SwipeDirection, SwipeDistance};
use crate::errors::ScoutResult;

/// The device-control boundary. Every interaction with the phone goes
/// through this trait; the exploration loop and dispatcher never see raw
/// transport details, which also keeps them testable against mocks.
#[async_trait]
pub trait DeviceController: Send + Sync {
    /// Screen size in pixels. Detected at startup; a zero dimension is a
    /// configuration error that aborts before any round begins.
    async fn screen_size(&self) -> ScoutResult<(u32, u32)>;

    /// Capture the screen into `<dir>/<label>.png` and return the path.
    async fn capture_screenshot(&self, label: &str, dir: &Path) -> ScoutResult<PathBuf>;

    async fn tap(&self, x: i32, y: i32) -> ScoutResult<()>;

    async fn input_text(&self, text: &str) -> ScoutResult<()>;

    async fn press_enter(&self) -> ScoutResult<()>;

    async fn long_press(&self, x: i32, y: i32) -> ScoutResult<()>;

    async fn swipe(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: SwipeDistance,
    ) -> ScoutResult<()>;
}
