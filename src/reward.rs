//! Reward summary shown after a task is scored
//!
//! Turns a task scoring result into the list of reward chips (stat deltas)
//! and the drop caption. Placement and animation are left to the front end.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::DisplayConfig;
use crate::Result;

/// Chips shown when the result also has a drop
const MAX_CHIPS_WITH_DROP: usize = 4;
/// Chips shown otherwise
const MAX_CHIPS: usize = 5;

/// Item dropped by a scored task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDrop {
    /// Item key, e.g. "Egg_Wolf"
    #[serde(default)]
    pub key: Option<String>,
    /// Item category, e.g. "Egg"
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Stat changes caused by scoring a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskScoringResult {
    pub health_delta: Option<f64>,
    pub experience_delta: Option<f64>,
    pub gold_delta: Option<f64>,
    pub mana_delta: Option<f64>,
    pub quest_damage: Option<f64>,
    pub quest_items_found: Option<i64>,
    pub drop: Option<TaskDrop>,
}

impl TaskScoringResult {
    /// Read a result from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn drop_key(&self) -> Option<&str> {
        self.drop.as_ref().and_then(|d| d.key.as_deref())
    }

    /// Whether the task dropped an item or found quest items
    #[must_use]
    pub fn has_drop(&self) -> bool {
        self.quest_items_found.unwrap_or(0) != 0 || self.drop_key().is_some()
    }
}

/// Stat a chip reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Health,
    Experience,
    Gold,
    Mana,
    QuestDamage,
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Health => "HP",
            Self::Experience => "XP",
            Self::Gold => "Gold",
            Self::Mana => "MP",
            Self::QuestDamage => "Damage",
        };
        f.write_str(label)
    }
}

/// One stat delta to display
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardChip {
    pub kind: RewardKind,
    pub value: f64,
}

impl fmt::Display for RewardChip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.2} {}", self.value, self.kind)
    }
}

/// What to show for a scored task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardSummary {
    pub chips: Vec<RewardChip>,
    pub has_drop: bool,
    pub drop_caption: Option<String>,
}

impl RewardSummary {
    /// Build the summary for a scoring result
    ///
    /// Health, experience and gold show when non-zero; mana and quest damage
    /// only when positive. The list is capped to leave room for the drop row.
    #[must_use]
    pub fn from_result(result: &TaskScoringResult) -> Self {
        let nonzero = |v: Option<f64>| v.filter(|v| *v != 0.0);
        let positive = |v: Option<f64>| v.filter(|v| *v > 0.0);

        let mut chips: Vec<RewardChip> = [
            (RewardKind::Health, nonzero(result.health_delta)),
            (RewardKind::Experience, nonzero(result.experience_delta)),
            (RewardKind::Gold, nonzero(result.gold_delta)),
            (RewardKind::Mana, positive(result.mana_delta)),
            (RewardKind::QuestDamage, positive(result.quest_damage)),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.map(|value| RewardChip { kind, value }))
        .collect();

        let has_drop = result.has_drop();
        chips.truncate(if has_drop { MAX_CHIPS_WITH_DROP } else { MAX_CHIPS });

        Self {
            chips,
            has_drop,
            drop_caption: has_drop.then(|| drop_caption(result)).flatten(),
        }
    }

    /// Whether there is anything to show
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty() && !self.has_drop
    }
}

/// Whether the reward screen should be shown at all
///
/// The preference is read once, when the result arrives.
#[must_use]
pub const fn should_display(display: &DisplayConfig) -> bool {
    !display.hide_task_results
}

fn drop_caption(result: &TaskScoringResult) -> Option<String> {
    let mut parts = Vec::new();

    match result.quest_items_found.unwrap_or(0) {
        0 => {}
        1 => parts.push("1 quest item".to_string()),
        n => parts.push(format!("{n} quest items")),
    }

    if result.drop_key().is_some() {
        let kind = result
            .drop
            .as_ref()
            .and_then(|d| d.kind.as_deref())
            .unwrap_or("item");
        parts.push(format!("some {kind}"));
    }

    match parts.len() {
        0 => None,
        1 => parts.pop(),
        2 => Some(format!("{} and {}", parts[0], parts[1])),
        _ => Some(parts.join(", ")),
    }
}
