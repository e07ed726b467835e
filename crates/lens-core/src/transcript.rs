//! Transcript segmentation: raw role-tagged text → ordered turns.
//!
//! A line of the form `User: ...` or `Assistant: ...` (any case) opens a new
//! turn; every other line continues the open turn. Parsing never fails:
//! malformed input degrades to fewer turns, never to an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static ROLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(user|assistant)\s*:\s*(.*)$").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn tag(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }

    fn other(self) -> Self {
        match self {
            Role::User => Role::Assistant,
            Role::Assistant => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One role-attributed block of transcript text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Turn as handed in by a host; the role may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnInput {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub text: String,
}

/// Parse raw transcript text into turns.
///
/// Untagged lines before the first tag open an implicit `User` turn. Turn
/// text is trimmed at both ends when the turn closes, and turns left empty
/// are dropped.
pub fn parse_transcript(text: &str) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut current: Option<Turn> = None;

    for raw in text.split('\n') {
        let line = raw.trim_end();
        if let Some(caps) = ROLE_TAG.captures(line) {
            flush(&mut turns, current.take());
            let role = if caps[1].eq_ignore_ascii_case("assistant") {
                Role::Assistant
            } else {
                Role::User
            };
            let rest = caps.get(2).map_or("", |m| m.as_str());
            current = Some(Turn::new(role, rest));
        } else {
            let turn = current.get_or_insert_with(|| Turn::new(Role::User, ""));
            if !turn.text.is_empty() {
                turn.text.push('\n');
            }
            turn.text.push_str(line);
        }
    }
    flush(&mut turns, current);

    turns
}

fn flush(turns: &mut Vec<Turn>, turn: Option<Turn>) {
    if let Some(mut turn) = turn {
        let trimmed = turn.text.trim();
        if trimmed.is_empty() {
            return;
        }
        if trimmed.len() != turn.text.len() {
            turn.text = trimmed.to_string();
        }
        turns.push(turn);
    }
}

/// Serialize turn input into role-tagged transcript text.
///
/// Turns without a role alternate starting from `User`; the alternation
/// advances on every turn, tagged or not.
pub fn turns_to_transcript(turns: &[TurnInput]) -> String {
    let mut alternate = Role::User;
    let mut blocks = Vec::with_capacity(turns.len());
    for turn in turns {
        let role = turn.role.unwrap_or(alternate);
        alternate = alternate.other();
        blocks.push(format!("{}: {}", role.tag(), turn.text));
    }
    blocks.join("\n\n")
}

/// Serialize parsed turns back into transcript text.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.tag(), t.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
