//! adb transport for a physical or emulated Android device.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::actions::{SwipeDirection, SwipeDistance};
use crate::device::traits::DeviceController;
use crate::errors::{ScoutError, ScoutResult};

pub struct AdbController {
    adb_path: String,
    serial: String,
    width: u32,
    height: u32,
}

/// Parse `adb devices` into the list of attached serials.
pub async fn list_devices(adb_path: &str) -> ScoutResult<Vec<String>> {
    let output = Command::new(adb_path).arg("devices").output().await?;
    if !output.status.success() {
        return Err(ScoutError::Device(format!(
            "adb devices failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect())
}

impl AdbController {
    /// Connect to `serial` and detect its screen size. A missing or
    /// zero-sized display aborts here, before any round begins.
    pub async fn connect(adb_path: &str, serial: &str) -> ScoutResult<Self> {
        let mut controller = Self {
            adb_path: adb_path.to_string(),
            serial: serial.to_string(),
            width: 0,
            height: 0,
        };
        let (width, height) = controller.query_screen_size().await?;
        if width == 0 || height == 0 {
            return Err(ScoutError::Config(format!(
                "invalid device size {width}x{height} for {serial}"
            )));
        }
        controller.width = width;
        controller.height = height;
        tracing::info!(serial, width, height, "device connected");
        Ok(controller)
    }

    async fn shell(&self, cmd: &str) -> ScoutResult<String> {
        let output = Command::new(&self.adb_path)
            .args(["-s", &self.serial, "shell", cmd])
            .output()
            .await?;
        if !output.status.success() {
            return Err(ScoutError::Device(format!(
                "adb shell `{cmd}` failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn query_screen_size(&self) -> ScoutResult<(u32, u32)> {
        let out = self.shell("wm size").await?;
        // "Physical size: 1080x2400", possibly followed by an override line
        // which takes precedence when present.
        let size_line = out
            .lines()
            .rev()
            .find(|l| l.contains("size:"))
            .ok_or_else(|| ScoutError::Device(format!("unexpected wm size output: {out}")))?;
        let dims = size_line
            .rsplit(':')
            .next()
            .unwrap_or_default()
            .trim()
            .split('x')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ScoutError::Device(format!("unexpected wm size output: {out}")))?;
        match dims.as_slice() {
            [w, h] => Ok((*w, *h)),
            _ => Err(ScoutError::Device(format!(
                "unexpected wm size output: {out}"
            ))),
        }
    }

    /// `input text` rejects raw spaces; adb substitutes `%s` back.
    fn escape_text(text: &str) -> String {
        text.replace(' ', "%s")
    }

    /// Base swipe unit: a tenth of the screen width, scaled by distance.
    fn swipe_offset(&self, direction: SwipeDirection, distance: SwipeDistance) -> (i32, i32) {
        let unit = (self.width / 10 * distance.factor()) as i32;
        match direction {
            SwipeDirection::Up => (0, -unit),
            SwipeDirection::Down => (0, unit),
            SwipeDirection::Left => (-unit, 0),
            SwipeDirection::Right => (unit, 0),
        }
    }
}

#[async_trait]
impl DeviceController for AdbController {
    async fn screen_size(&self) -> ScoutResult<(u32, u32)> {
        Ok((self.width, self.height))
    }

    async fn capture_screenshot(&self, label: &str, dir: &Path) -> ScoutResult<PathBuf> {
        let remote = format!("/sdcard/{label}.png");
        let local = dir.join(format!("{label}.png"));
        self.shell(&format!("screencap -p {remote}")).await?;

        let output = Command::new(&self.adb_path)
            .args(["-s", &self.serial, "pull", &remote])
            .arg(&local)
            .output()
            .await?;
        if !output.status.success() {
            return Err(ScoutError::Device(format!(
                "adb pull {remote} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        // Best-effort cleanup of the device-side copy.
        let _ = self.shell(&format!("rm {remote}")).await;
        tracing::debug!(path = %local.display(), "screenshot captured");
        Ok(local)
    }

    async fn tap(&self, x: i32, y: i32) -> ScoutResult<()> {
        self.shell(&format!("input tap {x} {y}")).await?;
        Ok(())
    }

    async fn input_text(&self, text: &str) -> ScoutResult<()> {
        self.shell(&format!("input text {}", Self::escape_text(text)))
            .await?;
        Ok(())
    }

    async fn press_enter(&self) -> ScoutResult<()> {
        self.shell("input keyevent KEYCODE_ENTER").await?;
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32) -> ScoutResult<()> {
        // A press is a swipe that goes nowhere for a second.
        self.shell(&format!("input swipe {x} {y} {x} {y} 1000"))
            .await?;
        Ok(())
    }

    async fn swipe(
        &self,
        x: i32,
        y: i32,
        direction: SwipeDirection,
        distance: SwipeDistance,
    ) -> ScoutResult<()> {
        let (dx, dy) = self.swipe_offset(direction, distance);
        self.shell(&format!(
            "input swipe {x} {y} {} {} 400",
            x + dx,
            y + dy
        ))
        .await?;
        Ok(())
    }
}
