//! Prompt templates for the exploration rounds.
//!
//! Which interaction functions are offered to the oracle follows the
//! `[actions]` configuration; the dispatcher itself handles every action in
//! both addressing modes.

use crate::config::ActionsConfig;

const REPLY_FORMAT: &str = "\
Your reply must contain exactly these four parts:
Observation: <What you observe in the screenshot>
Thought: <The next step needed to proceed with the task>
Action: <One function call with correct parameters. If you believe the task \
is completed or there is nothing to be done, output FINISH instead. Nothing \
else is allowed in this field.>
Summary: <Your past actions along with the latest one, in one or two \
sentences>
Take exactly one action per reply.";

/// Prompt for the grounded (normalized-coordinate) addressing mode.
pub fn exploration_prompt(task: &str, history: &str, actions: &ActionsConfig) -> String {
    let mut functions = vec![
        "tap(x: int, y: int)\n\
         Taps the screen at the given position. Coordinates are expressed on \
         a 0-1000 scale in each axis, independent of the real screen \
         resolution: tap(500, 500) taps the exact center of the screen."
            .to_string(),
        "text(\"text_input\", \"target\")\n\
         Types text into an input field. \"text_input\" is the string to \
         insert and must be wrapped in double quotes; \"target\" is a short \
         description of the input field, e.g. text(\"Hello, world!\", \"the \
         search bar\"). Usually callable when a keyboard is showing in the \
         lower half of the screen."
            .to_string(),
    ];
    if actions.enable_long_press {
        functions.push(
            "long_press(x: int, y: int)\n\
             Long-presses the screen at the given position, on the same \
             0-1000 scale as tap."
                .to_string(),
        );
    }
    if actions.enable_swipe {
        functions.push(
            "swipe(x: int, y: int, \"direction\", \"distance\")\n\
             Swipes starting at the given position, usually on a scroll view \
             or slide bar. \"direction\" is one of \"up\", \"down\", \
             \"left\", \"right\"; \"distance\" is one of \"short\", \
             \"medium\", \"long\"."
                .to_string(),
        );
    }
    if actions.enable_grid {
        functions.push(
            "grid()\n\
             Call this when the part of the screen you want to interact with \
             is hard to address precisely. It overlays a labeled grid on the \
             screenshot, giving you more freedom to pick any area of the \
             screen."
                .to_string(),
        );
    }

    format!(
        "You are an agent trained to perform basic tasks on a smartphone. You \
         will be given a smartphone screenshot.\n\n\
         You can call the following functions to control the smartphone:\n\n\
         {functions}\n\n\
         The task you need to complete is: {task}. Your past actions to \
         proceed with this task are summarized as follows: {history}\n\
         {format}",
        functions = numbered(&functions),
        task = task,
        history = history,
        format = REPLY_FORMAT,
    )
}

/// Prompt for grid addressing: the screenshot carries a numbered overlay and
/// every position is a cell number plus a named sub-area.
pub fn grid_prompt(task: &str, history: &str, actions: &ActionsConfig) -> String {
    let mut functions = vec![
        "tap(area: int, \"subarea\")\n\
         Taps a grid area. \"area\" is the number printed in the top-left \
         corner of the cell; \"subarea\" picks the exact position inside it \
         and is one of \"center\", \"top\", \"bottom\", \"left\", \"right\", \
         \"top-left\", \"top-right\", \"bottom-left\", \"bottom-right\". \
         Example: tap(5, \"center\")."
            .to_string(),
        "text(\"text_input\", \"target\")\n\
         Types text into an input field, as in the un-gridded mode."
            .to_string(),
    ];
    if actions.enable_long_press {
        functions.push(
            "long_press(area: int, \"subarea\")\n\
             Long-presses a grid area; parameters as for tap. Example: \
             long_press(7, \"top-left\")."
                .to_string(),
        );
    }
    if actions.enable_swipe {
        functions.push(
            "swipe(area: int, \"subarea\", \"direction\", \"distance\")\n\
             Swipes starting from the given position within a grid area. \
             \"direction\" is one of \"up\", \"down\", \"left\", \"right\"; \
             \"distance\" is one of \"short\", \"medium\", \"long\". \
             Example: swipe(21, \"center\", \"up\", \"medium\")."
                .to_string(),
        );
    }

    format!(
        "You are an agent trained to perform basic tasks on a smartphone. You \
         will be given a smartphone screenshot overlaid by a grid that \
         divides it into small areas, each labeled with a number in its \
         top-left corner.\n\n\
         You can call the following functions to control the smartphone:\n\n\
         {functions}\n\n\
         The task you need to complete is: {task}. Your past actions to \
         proceed with this task are summarized as follows: {history}\n\
         {format}",
        functions = numbered(&functions),
        task = task,
        history = history,
        format = REPLY_FORMAT,
    )
}

/// Follow-up, single-purpose localization query used by the two-phase text
/// action. The reply is expected to contain a `[[x_min, y_min, x_max,
/// y_max]]` bounding box on the same 0-1000 scale.
pub fn locate_prompt(target: &str) -> String {
    format!(
        "Guide me to the location of {target} within the image by providing \
         its bounding boxes."
    )
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_actions_are_not_offered() {
        let actions = ActionsConfig {
            enable_long_press: false,
            enable_swipe: false,
            enable_grid: false,
        };
        let prompt = exploration_prompt("open the settings app", "None", &actions);
        assert!(prompt.contains("tap(x: int, y: int)"));
        assert!(!prompt.contains("long_press"));
        assert!(!prompt.contains("swipe"));
        assert!(!prompt.contains("grid()"));
    }

    #[test]
    fn task_and_history_are_substituted() {
        let actions = ActionsConfig::default();
        let prompt = exploration_prompt("send a message", "I opened the chat.", &actions);
        assert!(prompt.contains("send a message"));
        assert!(prompt.contains("I opened the chat."));
        assert!(prompt.contains("FINISH"));
    }

    #[test]
    fn grid_prompt_describes_subareas() {
        let prompt = grid_prompt("task", "None", &ActionsConfig::default());
        assert!(prompt.contains("tap(area: int, \"subarea\")"));
        assert!(prompt.contains("bottom-right"));
        assert!(prompt.contains("swipe(area: int, \"subarea\""));
    }
}
