use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::DropdownOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Expert];

    pub fn value(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Expert => "Expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.value().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown difficulty: '{}'. Supported: easy, medium, hard, expert", s))
    }
}

/// Static difficulty dropdown; the id doubles as the value.
pub fn question_difficulties() -> Vec<DropdownOption> {
    Difficulty::ALL
        .into_iter()
        .map(|d| DropdownOption {
            id: d.value().to_string(),
            value: d.value().to_string(),
            label: d.label().to_string(),
        })
        .collect()
}
