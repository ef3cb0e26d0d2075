//! Counter deltas for like/save toggles.

use serde::{Deserialize, Serialize};

/// Which per-user flag a toggle touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleKind {
    Like,
    Save,
}

impl ToggleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleKind::Like => "like",
            ToggleKind::Save => "save",
        }
    }
}

/// Change to the prompt counter when a flag moves from `previous` to `requested`.
/// A missing interaction row counts as `false`.
pub fn flag_delta(previous: Option<bool>, requested: bool) -> i32 {
    match (previous.unwrap_or(false), requested) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}

/// Applies a delta, flooring the counter at zero.
pub fn apply_delta(count: i32, delta: i32) -> i32 {
    count.saturating_add(delta).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_delta() {
        assert_eq!(flag_delta(None, true), 1);
        assert_eq!(flag_delta(None, false), 0);
        assert_eq!(flag_delta(Some(true), true), 0);
        assert_eq!(flag_delta(Some(true), false), -1);
        assert_eq!(flag_delta(Some(false), true), 1);
    }

    #[test]
    fn test_toggle_sequence_nets_zero() {
        let mut state = None;
        let mut count = 7;
        for requested in [true, false, true, false] {
            count = apply_delta(count, flag_delta(state, requested));
            state = Some(requested);
        }
        assert_eq!(count, 7);
    }

    #[test]
    fn test_repeated_like_counts_once() {
        let first = flag_delta(None, true);
        let second = flag_delta(Some(true), true);
        assert_eq!(apply_delta(apply_delta(0, first), second), 1);
    }

    #[test]
    fn test_floor_at_zero() {
        assert_eq!(apply_delta(0, -1), 0);
    }
}
