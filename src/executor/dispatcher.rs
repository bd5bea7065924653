//! Executes a typed [`Action`] against the device-control boundary.
//!
//! Locators are resolved to device pixels here; no raw model text ever
//! reaches a device call. The dispatcher holds no state across calls; its
//! only observable effects go through the device (and, for the two-phase
//! text action, one nested oracle round-trip).

use thiserror::Error;

use crate::actions::parser;
use crate::actions::{Action, Locator};
use crate::device::DeviceController;
use crate::llm::VisionModel;
use crate::perception::coords::normalized_to_pixel;
use crate::perception::types::Observation;
use crate::prompts;

/// Localization target used when the oracle issued a bare `text("…")`.
const DEFAULT_TEXT_TARGET: &str = "the active text input field";

/// What a dispatched action means for the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Device action performed; the session continues.
    Advanced,
    /// The oracle declared the task done; no device call was made.
    TaskComplete,
    /// The oracle asked for the grid overlay; subsequent rounds use grid
    /// addressing. No device call was made.
    GridRequested,
    /// The reply matched no known action grammar; carries the raw text.
    Rejected(String),
}

/// Dispatch failures, kept apart so the loop can distinguish a device that
/// misbehaved from an oracle that did.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("device {step} failed: {message}")]
    Device { step: &'static str, message: String },

    /// The nested localization call failed in transport.
    #[error("oracle localization call failed: {0}")]
    OracleTransport(String),

    /// The nested localization call returned no usable bounding box.
    #[error("could not parse localization reply: {0}")]
    Localization(String),

    /// A locator that cannot be resolved against this observation, e.g. a
    /// grid cell without a grid or an element index with no element list.
    #[error("unresolvable locator: {0}")]
    UnresolvableLocator(String),
}

pub struct Dispatcher<'a, D: DeviceController + ?Sized, M: VisionModel + ?Sized> {
    device: &'a D,
    oracle: &'a M,
}

impl<'a, D: DeviceController + ?Sized, M: VisionModel + ?Sized> Dispatcher<'a, D, M> {
    pub fn new(device: &'a D, oracle: &'a M) -> Self {
        Self { device, oracle }
    }

    pub async fn dispatch(
        &self,
        action: &Action,
        obs: &Observation,
    ) -> Result<Outcome, DispatchError> {
        match action {
            Action::Tap(locator) => {
                let (x, y) = self.resolve(locator, obs)?;
                tracing::info!(x, y, "tap");
                self.device.tap(x, y).await.map_err(|e| DispatchError::Device {
                    step: "tap",
                    message: e.to_string(),
                })?;
                Ok(Outcome::Advanced)
            }

            Action::LongPress(locator) => {
                let (x, y) = self.resolve(locator, obs)?;
                tracing::info!(x, y, "long press");
                self.device
                    .long_press(x, y)
                    .await
                    .map_err(|e| DispatchError::Device {
                        step: "long_press",
                        message: e.to_string(),
                    })?;
                Ok(Outcome::Advanced)
            }

            Action::Swipe {
                from,
                direction,
                distance,
            } => {
                let (x, y) = self.resolve(from, obs)?;
                tracing::info!(x, y, %direction, %distance, "swipe");
                self.device
                    .swipe(x, y, *direction, *distance)
                    .await
                    .map_err(|e| DispatchError::Device {
                        step: "swipe",
                        message: e.to_string(),
                    })?;
                Ok(Outcome::Advanced)
            }

            Action::TypeText { text, target } => {
                self.type_text(text, target.as_deref(), obs).await?;
                Ok(Outcome::Advanced)
            }

            Action::RequestGrid => Ok(Outcome::GridRequested),

            Action::Finish => Ok(Outcome::TaskComplete),

            Action::Unrecognized(raw) => Ok(Outcome::Rejected(raw.clone())),
        }
    }

    /// The two-phase text action: localize the target field via a follow-up
    /// oracle query on the same screenshot, tap the box center, type,
    /// confirm. The first failing sub-step aborts the whole action; oracle
    /// failures stay distinguishable from device failures.
    async fn type_text(
        &self,
        text: &str,
        target: Option<&str>,
        obs: &Observation,
    ) -> Result<(), DispatchError> {
        let target = target.unwrap_or(DEFAULT_TEXT_TARGET);
        let prompt = prompts::locate_prompt(target);
        tracing::info!(target, "localizing input field");

        let reply = self
            .oracle
            .get_response(&prompt, std::slice::from_ref(&obs.screenshot))
            .await
            .map_err(|e| DispatchError::OracleTransport(e.to_string()))?;

        let (cx, cy) = parser::parse_bounding_box(&reply).ok_or_else(|| {
            DispatchError::Localization(format!("no bounding box in reply: {reply}"))
        })?;
        let (x, y) = normalized_to_pixel(cx, cy, obs.width, obs.height);
        tracing::info!(x, y, "typing into localized field");

        self.device.tap(x, y).await.map_err(|e| DispatchError::Device {
            step: "tap",
            message: e.to_string(),
        })?;
        self.device
            .input_text(text)
            .await
            .map_err(|e| DispatchError::Device {
                step: "text",
                message: e.to_string(),
            })?;
        self.device
            .press_enter()
            .await
            .map_err(|e| DispatchError::Device {
                step: "enter",
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn resolve(&self, locator: &Locator, obs: &Observation) -> Result<(i32, i32), DispatchError> {
        match locator {
            Locator::Point { nx, ny } => Ok(normalized_to_pixel(
                *nx as f64,
                *ny as f64,
                obs.width,
                obs.height,
            )),
            Locator::Element(index) => {
                let element = (*index)
                    .checked_sub(1)
                    .and_then(|i| obs.elements.get(i as usize))
                    .ok_or_else(|| {
                        DispatchError::UnresolvableLocator(format!(
                            "element {index} of {}",
                            obs.elements.len()
                        ))
                    })?;
                Ok(element.center())
            }
            Locator::Cell { area, subarea } => {
                let grid = obs.grid.as_ref().ok_or_else(|| {
                    DispatchError::UnresolvableLocator(format!(
                        "cell {area} addressed without a grid overlay"
                    ))
                })?;
                grid.resolve(*area, *subarea).ok_or_else(|| {
                    DispatchError::UnresolvableLocator(format!(
                        "cell {area} outside the {}-cell grid",
                        grid.cell_count()
                    ))
                })
            }
        }
    }
}
