//! Run-mode vocabulary and resolution of chained modifiers.

use serde::Serialize;
use std::fmt;

/// Repetitions used when `repeats` is chained without an explicit count.
pub const DEFAULT_REPEATS: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Run,
    Skip,
    Only,
    Todo,
    Repeats,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Skip => "skip",
            Self::Only => "only",
            Self::Todo => "todo",
            Self::Repeats => "repeats",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modifier flags accumulated by a declaration chain.
///
/// Order of chaining is irrelevant: every flag lands in this one record and
/// [`resolve_mode`] applies a fixed priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub concurrent: bool,
    pub shuffle: bool,
    pub skip: bool,
    pub only: bool,
    pub todo: bool,
    pub fails: bool,
    pub repeats: bool,
}

impl Modifiers {
    pub fn mode(&self) -> RunMode {
        resolve_mode(self)
    }
}

/// `only` > `skip` > `todo` > `repeats` > `run`.
pub fn resolve_mode(flags: &Modifiers) -> RunMode {
    if flags.only {
        RunMode::Only
    } else if flags.skip {
        RunMode::Skip
    } else if flags.todo {
        RunMode::Todo
    } else if flags.repeats {
        RunMode::Repeats
    } else {
        RunMode::Run
    }
}

/// Repeat count for a node: a positive explicit count wins, `repeats` mode
/// otherwise falls back to [`DEFAULT_REPEATS`].
pub fn resolve_repeats(mode: RunMode, explicit: Option<u32>) -> Option<u32> {
    match explicit {
        Some(count) if count > 0 => Some(count),
        _ if mode == RunMode::Repeats => Some(DEFAULT_REPEATS),
        other => other,
    }
}
