use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

/// Checklist priority, stored as 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Priority {
    pub fn value(&self) -> i64 {
        *self as i64
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Baixa",
            Priority::Medium => "Média",
            Priority::High => "Alta",
        }
    }

    /// Lenient conversion used for stored rows; unknown values fall back to `Low`.
    pub fn from_stored(value: i64) -> Self {
        Priority::try_from(value).unwrap_or(Priority::Low)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl TryFrom<i64> for Priority {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(Error::InvalidValue(format!(
                "priority must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<Priority> for i64 {
    fn from(priority: Priority) -> Self {
        priority.value()
    }
}

/// Non-work slots a checklist item can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakType {
    Rest,
    Lunch,
    Meeting,
    Training,
}

impl BreakType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakType::Rest => "rest",
            BreakType::Lunch => "lunch",
            BreakType::Meeting => "meeting",
            BreakType::Training => "training",
        }
    }

    pub fn label(break_type: Option<BreakType>) -> &'static str {
        match break_type {
            Some(BreakType::Rest) => "Descanso",
            Some(BreakType::Lunch) => "Almoço",
            Some(BreakType::Meeting) => "Reunião",
            Some(BreakType::Training) => "Treinamento",
            None => "Tarefa",
        }
    }
}

impl FromStr for BreakType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rest" => Ok(BreakType::Rest),
            "lunch" => Ok(BreakType::Lunch),
            "meeting" => Ok(BreakType::Meeting),
            "training" => Ok(BreakType::Training),
            other => Err(Error::InvalidValue(format!("unknown break type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineStatus {
    Active,
    Completed,
    Cancelled,
}

impl RoutineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineStatus::Active => "active",
            RoutineStatus::Completed => "completed",
            RoutineStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for RoutineStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RoutineStatus::Active),
            "completed" => Ok(RoutineStatus::Completed),
            "cancelled" => Ok(RoutineStatus::Cancelled),
            other => Err(Error::InvalidValue(format!("unknown status: {}", other))),
        }
    }
}

/// Whole-number completion percentage, rounded down. Empty routines are 0%.
pub fn completion_percentage(total: i64, completed: i64) -> u8 {
    if total <= 0 {
        return 0;
    }
    let completed = completed.clamp(0, total);
    ((completed * 100) / total) as u8
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub percentage: u8,
}

impl DaySummary {
    pub fn new(total: i64, completed: i64) -> Self {
        Self {
            total,
            completed,
            pending: (total - completed).max(0),
            percentage: completion_percentage(total, completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(3, 1), 33);
        assert_eq!(completion_percentage(3, 2), 66);
        assert_eq!(completion_percentage(4, 4), 100);
        assert_eq!(completion_percentage(2, 5), 100);
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!(Priority::try_from(3).unwrap(), Priority::High);
        assert!(Priority::try_from(0).is_err());
        assert_eq!(Priority::from_stored(9), Priority::Low);
        assert_eq!(Priority::Medium.label(), "Média");

        let parsed: Priority = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, Priority::Medium);
        assert!(serde_json::from_str::<Priority>("4").is_err());
    }

    #[test]
    fn test_break_type_labels() {
        assert_eq!("lunch".parse::<BreakType>().unwrap(), BreakType::Lunch);
        assert!("nap".parse::<BreakType>().is_err());
        assert_eq!(BreakType::label(Some(BreakType::Meeting)), "Reunião");
        assert_eq!(BreakType::label(None), "Tarefa");
    }

    #[test]
    fn test_day_summary() {
        let summary = DaySummary::new(5, 2);
        assert_eq!(summary.pending, 3);
        assert_eq!(summary.percentage, 40);
    }
}
