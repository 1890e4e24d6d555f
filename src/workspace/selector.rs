//! Workspace selector language
//!
//! Selectors pick workspaces by ID, name, monitor, window/group counts
//! or fullscreen state. The grammar is a space-separated sequence of
//! bracketed predicates, all of which must hold; any parse failure makes
//! the whole selector match nothing (fail-closed).
//!
//! Allowed predicates:
//! - `r[1-5]`: ID range, inclusive, both bounds >= 1
//! - `s[0|1]`: special flag
//! - `n[0|1]`, `n[s:prefix]`, `n[e:suffix]`: named-range / name checks
//! - `m[monitor]`: monitor selector, matched against the workspace's
//!   monitor
//! - `w[4]`, `w[1-4]`, `w[tg2]`, `w[fv1-2]`: window/group counts with
//!   optional tiled/floating, group and visible flags
//! - `f[-1|0|1|2]`: fullscreen state

use log::debug;
use thiserror::Error;

use crate::compositor::Compositor;
use crate::workspace::{FullscreenMode, Workspace, WORKSPACE_INVALID, WORKSPACE_NAME_START};

/// Why a selector token or animation percentage failed to parse.
///
/// Call sites pick the failure policy: selectors fail closed (the whole
/// match becomes false), animation percentages fail soft (log and fall
/// back to zero).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorParseError {
    #[error("malformed predicate `{0}`")]
    MalformedPredicate(String),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("invalid range `{0}`")]
    InvalidRange(String),
    #[error("invalid boolean `{0}`")]
    InvalidBool(String),
    #[error("unknown predicate `{0}`")]
    UnknownPredicate(char),
    #[error("no trailing percentage in `{0}`")]
    MissingPercent(String),
}

/// Parse the trailing `N%` token of an animation style string, e.g.
/// `"slide 30%"` -> `30.0`.
pub fn parse_style_percent(style: &str) -> Result<f64, SelectorParseError> {
    let token = style.rsplit(' ').next().unwrap_or(style);
    let digits = token
        .strip_suffix('%')
        .ok_or_else(|| SelectorParseError::MissingPercent(style.to_string()))?;
    digits
        .parse::<i64>()
        .map(|v| v as f64)
        .map_err(|_| SelectorParseError::InvalidNumber(digits.to_string()))
}

/// An optionally-signed decimal integer, at least one digit.
pub(crate) fn is_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_i64(text: &str) -> Result<i64, SelectorParseError> {
    if !is_number(text) {
        return Err(SelectorParseError::InvalidNumber(text.to_string()));
    }
    text.parse::<i64>()
        .map_err(|_| SelectorParseError::InvalidNumber(text.to_string()))
}

/// Accepts the usual config spellings of a boolean.
fn parse_bool(text: &str) -> Result<bool, SelectorParseError> {
    match text {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SelectorParseError::InvalidBool(other.to_string())),
    }
}

/// Strip `X[` and `]` from a predicate token, returning the inner text.
fn bracket_inner<'a>(token: &'a str, kind: char) -> Result<&'a str, SelectorParseError> {
    let rest = token
        .strip_prefix(kind)
        .and_then(|t| t.strip_prefix('['))
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| SelectorParseError::MalformedPredicate(token.to_string()))?;
    Ok(rest)
}

/// An inclusive `A-B` range with both bounds >= 1 and `A <= B`.
fn parse_range(text: &str) -> Result<(i64, i64), SelectorParseError> {
    let dash = text
        .find('-')
        .ok_or_else(|| SelectorParseError::InvalidRange(text.to_string()))?;
    let (lhs, rhs) = (&text[..dash], &text[dash + 1..]);
    let from = parse_i64(lhs)?;
    let to = parse_i64(rhs)?;
    if to < from || to < 1 || from < 1 {
        return Err(SelectorParseError::InvalidRange(text.to_string()));
    }
    Ok((from, to))
}

/// Count-predicate flags: `t`/`f` restrict to tiled/floating (first one
/// wins), `g` counts groups instead of windows, `v` counts only visible
/// windows. Flag scanning stops at the first non-flag character.
struct CountFlags {
    only_tiled: Option<bool>,
    count_groups: bool,
    only_visible: bool,
    consumed: usize,
}

fn parse_count_flags(text: &str) -> CountFlags {
    let mut flags = CountFlags {
        only_tiled: None,
        count_groups: false,
        only_visible: false,
        consumed: 0,
    };
    for ch in text.chars() {
        match ch {
            't' if flags.only_tiled.is_none() => flags.only_tiled = Some(true),
            'f' if flags.only_tiled.is_none() => flags.only_tiled = Some(false),
            'g' if !flags.count_groups => flags.count_groups = true,
            'v' if !flags.only_visible => flags.only_visible = true,
            _ => break,
        }
        flags.consumed += 1;
    }
    flags
}

impl Workspace {
    /// Evaluate a selector against this workspace. All predicates are
    /// ANDed; an empty selector matches everything; any parse failure
    /// returns false.
    pub fn matches_static_selector(&self, ctx: &Compositor, selector: &str) -> bool {
        let selector = selector.trim();

        // Inert workspaces hold no valid ID or monitor and resolve to
        // nothing.
        if self.inert {
            return false;
        }

        if selector.is_empty() {
            return true;
        }

        if is_number(selector) {
            let resolved = ctx.workspace_id_from_string(selector);
            if resolved == WORKSPACE_INVALID {
                return false;
            }
            return resolved == self.id;
        }

        if let Some(name) = selector.strip_prefix("name:") {
            return self.name == name;
        }

        if selector.starts_with("special") {
            return self.name == selector;
        }

        for token in selector.split_whitespace() {
            match self.match_predicate(ctx, token) {
                Ok(true) => continue,
                Ok(false) => return false,
                Err(err) => {
                    debug!("Invalid selector '{selector}': {err}");
                    return false;
                }
            }
        }

        true
    }

    fn match_predicate(&self, ctx: &Compositor, token: &str) -> Result<bool, SelectorParseError> {
        let kind = token
            .chars()
            .next()
            .ok_or_else(|| SelectorParseError::MalformedPredicate(token.to_string()))?;

        match kind {
            'r' => {
                let inner = bracket_inner(token, 'r')?;
                let (from, to) = parse_range(inner)?;
                Ok(self.id >= from && self.id <= to)
            }
            's' => {
                let inner = bracket_inner(token, 's')?;
                let wants_special = parse_bool(inner)?;
                Ok(wants_special == self.special)
            }
            'n' => {
                let inner = bracket_inner(token, 'n')?;
                if let Some(prefix) = inner.strip_prefix("s:") {
                    return Ok(self.name.starts_with(prefix));
                }
                if let Some(suffix) = inner.strip_prefix("e:") {
                    return Ok(self.name.ends_with(suffix));
                }
                let wants_named = parse_bool(inner)?;
                Ok(wants_named == (self.id <= WORKSPACE_NAME_START))
            }
            'm' => {
                let inner = bracket_inner(token, 'm')?;
                let matches = ctx
                    .monitor_from_string(inner)
                    .map_or(false, |m| m.borrow().id == self.monitor_id);
                Ok(matches)
            }
            'w' => {
                let inner = bracket_inner(token, 'w')?;
                let flags = parse_count_flags(inner);
                let rest = &inner[flags.consumed..];

                let count = if flags.count_groups {
                    ctx.groups_on_workspace(
                        self.id,
                        flags.only_tiled,
                        flags.only_visible.then_some(true),
                    )
                } else {
                    ctx.windows_on_workspace(
                        self.id,
                        flags.only_tiled,
                        flags.only_visible.then_some(true),
                    )
                };

                if rest.contains('-') {
                    let (from, to) = parse_range(rest)?;
                    Ok(count >= from && count <= to)
                } else {
                    let wanted = parse_i64(rest)?;
                    Ok(count == wanted)
                }
            }
            'f' => {
                let inner = bracket_inner(token, 'f')?;
                let state = parse_i64(inner)?;
                let matches = match state {
                    -1 => !self.has_fullscreen_window,
                    0 => {
                        self.has_fullscreen_window
                            && self.fullscreen_mode == FullscreenMode::Fullscreen
                    }
                    1 => {
                        self.has_fullscreen_window
                            && self.fullscreen_mode == FullscreenMode::Maximized
                    }
                    // Other values (e.g. 2, fullscreen without client
                    // notification) are accepted without a state check.
                    _ => true,
                };
                Ok(matches)
            }
            other => Err(SelectorParseError::UnknownPredicate(other)),
        }
    }
}
