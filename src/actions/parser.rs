//! Turns an oracle's free-text reply into a typed [`Action`].
//!
//! The reply is expected to carry an `Action:` line with a function-call-like
//! expression (`tap(5)`, `text("hello")`, `swipe(21, "up", "medium")`) or the
//! literal `FINISH` token, but the format is not enforced by the oracle, so
//! everything here is tolerant: unknown names, bad arity, unterminated
//! quotes and plain prose all collapse into [`Action::Unrecognized`].

use std::sync::OnceLock;

use regex::Regex;

use crate::actions::{Action, Locator};

/// Call names the grammar recognizes. Matching requires the name to be
/// followed immediately by `(` and not preceded by an identifier character,
/// so prose mentioning "text" or "tap" does not trigger a parse.
const KNOWN_CALLS: [&str; 5] = ["long_press", "swipe", "text", "tap", "grid"];

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Int(i64),
    Text(String),
}

/// Parse a full oracle reply into an action.
///
/// When the reply contains an `Action:` marker, only the text from that
/// marker onward is scanned; otherwise the whole reply is. A literal
/// `FINISH` in the scanned region wins over any function call.
pub fn parse_response(raw: &str) -> Action {
    let scan = raw.find("Action:").map_or(raw, |i| &raw[i..]);

    if scan.contains("FINISH") {
        return Action::Finish;
    }

    match find_first_call(scan) {
        Some((name, args)) => {
            build_action(name, &args).unwrap_or_else(|| Action::Unrecognized(raw.to_string()))
        }
        None => Action::Unrecognized(raw.to_string()),
    }
}

/// Pull the oracle's own `Summary:` section out of the reply, used to update
/// the accumulated action history fed into the next prompt.
pub fn extract_summary(raw: &str) -> Option<String> {
    let idx = raw.find("Summary:")?;
    let summary = raw[idx + "Summary:".len()..].trim();
    if summary.is_empty() {
        None
    } else {
        Some(summary.to_string())
    }
}

/// Extract the center of a `[[x_min, y_min, x_max, y_max]]` bounding box
/// from a localization reply, still on the normalized 0–1000 scale.
pub fn parse_bounding_box(raw: &str) -> Option<(f64, f64)> {
    static BOX_RE: OnceLock<Regex> = OnceLock::new();
    let re = BOX_RE.get_or_init(|| Regex::new(r"\[\[(.*?)\]\]").expect("bounding box regex"));

    let caps = re.captures(raw)?;
    let nums: Vec<f64> = caps[1]
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if nums.len() != 4 {
        return None;
    }
    Some(((nums[0] + nums[2]) / 2.0, (nums[1] + nums[3]) / 2.0))
}

/// Find the earliest recognized call in `scan` and tokenize its arguments.
fn find_first_call(scan: &str) -> Option<(&'static str, Vec<Arg>)> {
    let mut earliest: Option<(usize, &'static str)> = None;

    for name in KNOWN_CALLS {
        let mut from = 0;
        while let Some(pos) = scan[from..].find(name) {
            let at = from + pos;
            let boundary_ok = scan[..at]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_');
            let opens = scan[at + name.len()..].starts_with('(');
            if boundary_ok && opens {
                if earliest.map_or(true, |(best, _)| at < best) {
                    earliest = Some((at, name));
                }
                break;
            }
            from = at + name.len();
        }
    }

    let (at, name) = earliest?;
    let args = tokenize_args(&scan[at + name.len() + 1..])?;
    Some((name, args))
}

/// Split a parenthesized argument list, respecting double-quoted strings
/// that may contain commas, parentheses, or backslash-escaped quotes.
/// `src` starts just after the opening parenthesis. Returns `None` when the
/// list is unterminated or an argument is empty.
fn tokenize_args(src: &str) -> Option<Vec<Arg>> {
    let mut args = Vec::new();
    let mut cur = String::new();
    let mut cur_quoted = false;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut closed = false;

    for ch in src.chars() {
        if in_quotes {
            if escaped {
                cur.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quotes = false;
            } else {
                cur.push(ch);
            }
            continue;
        }
        match ch {
            '"' => {
                in_quotes = true;
                cur_quoted = true;
            }
            ',' => {
                args.push(finish_arg(&mut cur, &mut cur_quoted)?);
            }
            ')' => {
                closed = true;
                break;
            }
            c if c.is_whitespace() => {}
            c => cur.push(c),
        }
    }

    if !closed || in_quotes {
        return None;
    }
    if cur_quoted || !cur.is_empty() {
        args.push(finish_arg(&mut cur, &mut cur_quoted)?);
    } else if !args.is_empty() {
        // A trailing comma left an empty slot.
        return None;
    }
    Some(args)
}

fn finish_arg(cur: &mut String, cur_quoted: &mut bool) -> Option<Arg> {
    let text = std::mem::take(cur);
    let quoted = std::mem::replace(cur_quoted, false);
    if quoted {
        return Some(Arg::Text(text));
    }
    if text.is_empty() {
        return None;
    }
    match text.parse::<i64>() {
        Ok(n) => Some(Arg::Int(n)),
        // Bare words are tolerated as strings: some models drop the quotes
        // around direction/distance arguments.
        Err(_) => Some(Arg::Text(text)),
    }
}

fn build_action(name: &str, args: &[Arg]) -> Option<Action> {
    match name {
        "tap" => locator_from_args(args).map(Action::Tap),
        "long_press" => locator_from_args(args).map(Action::LongPress),
        "text" => match args {
            [Arg::Text(text)] => Some(Action::TypeText {
                text: text.clone(),
                target: None,
            }),
            [Arg::Text(text), Arg::Text(target)] => Some(Action::TypeText {
                text: text.clone(),
                target: Some(target.clone()),
            }),
            _ => None,
        },
        "swipe" => match args {
            [locator @ .., Arg::Text(dir), Arg::Text(dist)] if !locator.is_empty() => {
                Some(Action::Swipe {
                    from: locator_from_args(locator)?,
                    direction: dir.parse().ok()?,
                    distance: dist.parse().ok()?,
                })
            }
            _ => None,
        },
        "grid" => args.is_empty().then_some(Action::RequestGrid),
        _ => None,
    }
}

/// The argument shape selects the locator form: one integer is an element
/// index, two integers a normalized point, integer + string a grid cell.
fn locator_from_args(args: &[Arg]) -> Option<Locator> {
    match args {
        [Arg::Int(n)] => u32::try_from(*n).ok().map(Locator::Element),
        [Arg::Int(x), Arg::Int(y)] => Some(Locator::Point { nx: *x, ny: *y }),
        [Arg::Int(n), Arg::Text(sub)] => Some(Locator::Cell {
            area: u32::try_from(*n).ok()?,
            subarea: sub.parse().ok()?,
        }),
        _ => None,
    }
}
