//! Canned companion lines, picked at random per mood.
//!
//! Lines may contain `{task}` and `{minutes}` placeholders which are filled
//! from a [`MessageContext`] before the line is returned.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Idle,
    Distracted,
    Starting,
    Finished,
    GaveUp,
    Extending,
    Flowing,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Idle,
        Mood::Distracted,
        Mood::Starting,
        Mood::Finished,
        Mood::GaveUp,
        Mood::Extending,
        Mood::Flowing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Idle => "idle",
            Mood::Distracted => "distracted",
            Mood::Starting => "starting",
            Mood::Finished => "finished",
            Mood::GaveUp => "gaveup",
            Mood::Extending => "extending",
            Mood::Flowing => "flowing",
        }
    }

    /// Parse a category name, falling back to [`Mood::Idle`] for anything unknown.
    pub fn parse_lossy(name: &str) -> Self {
        name.parse().unwrap_or(Mood::Idle)
    }

    fn lines(self) -> &'static [&'static str] {
        match self {
            Mood::Idle => IDLE,
            Mood::Distracted => DISTRACTED,
            Mood::Starting => STARTING,
            Mood::Finished => FINISHED,
            Mood::GaveUp => GAVE_UP,
            Mood::Extending => EXTENDING,
            Mood::Flowing => FLOWING,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "category".into(),
                message: format!("unknown message category '{s}'"),
            })
    }
}

const IDLE: &[&str] = &[
    "hey boss... what are we doing today?",
    "let's go let's go!",
    "i'm just sitting here. vibing. waiting for a task.",
    "pick something. anything. i believe in you.",
    "bzzz... bzzz...",
];

const DISTRACTED: &[&str] = &[
    "hey. HEY. that is not what you said you'd be doing.",
    "oh, taking a little 'break' are we?",
    "you said you were working on: {task}. this isn't that.",
    "i'm watching you.",
    "nice try. back to work.",
    "fascinating. anyway. back to {task}.",
];

const STARTING: &[&str] = &[
    "okay. {task}. let's go!!!",
    "timer started... you've got this.",
    "finish this and you've earned a snack.",
    "do it do it do it!!!",
    "let's make it happen.",
];

const FINISHED: &[&str] = &[
    "you actually did it!!!",
    "session complete! look at you go!",
    "that's {minutes} minutes of real work. take a break, you earned it.",
    "done! now drink some water.",
    "nice work. i'm proud of you.",
];

const GAVE_UP: &[&str] = &[
    "wow. okay. leaving already?",
    "i believed in you...",
    "for real? we were doing so well...",
    "fine. FINE. go do whatever.",
    "disappointing but not surprising tbh.",
];

const EXTENDING: &[&str] = &[
    "let's keep going together!",
    "you're on a roll!!!",
    "don't stop now!",
    "nobody's doing it like you.",
];

const FLOWING: &[&str] = &[
    "i'm here with you.",
    "take your time. you're in the zone.",
    "still going? still proud.",
    "quietly cheering over here.",
    "hungry... but focused.",
];

/// Values substituted into message placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageContext<'a> {
    pub task: &'a str,
    pub total_seconds: i64,
}

impl<'a> MessageContext<'a> {
    pub fn new(task: &'a str, total_seconds: i64) -> Self {
        Self {
            task,
            total_seconds,
        }
    }
}

/// Pick a random line for `mood` using the thread-local RNG.
pub fn select(mood: Mood, ctx: MessageContext<'_>) -> String {
    select_with(mood, ctx, &mut rand::thread_rng())
}

/// Pick a random line for `mood` using the given RNG.
pub fn select_with<R: Rng + ?Sized>(mood: Mood, ctx: MessageContext<'_>, rng: &mut R) -> String {
    let line = mood.lines().choose(rng).copied().unwrap_or_default();
    render(line, ctx)
}

fn render(line: &str, ctx: MessageContext<'_>) -> String {
    let task = if ctx.task.trim().is_empty() {
        "your task"
    } else {
        ctx.task
    };
    line.replace("{task}", task)
        .replace("{minutes}", &round_minutes(ctx.total_seconds).to_string())
}

/// Seconds to whole minutes, rounding half up.
pub fn round_minutes(seconds: i64) -> i64 {
    (seconds + 30).div_euclid(60)
}
