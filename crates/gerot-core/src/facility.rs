use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, Error> {
        if end <= start {
            return Err(Error::InvalidValue(
                "end_time must be after start_time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Back-to-back slots do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Kind of file attached to an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[serde(rename = "model_3d")]
    Model3d,
    #[serde(rename = "plant_2d")]
    Plant2d,
    Photo,
    Document,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Model3d => "model_3d",
            ResourceType::Plant2d => "plant_2d",
            ResourceType::Photo => "photo",
            ResourceType::Document => "document",
        }
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model_3d" => Ok(ResourceType::Model3d),
            "plant_2d" => Ok(ResourceType::Plant2d),
            "photo" => Ok(ResourceType::Photo),
            "document" => Ok(ResourceType::Document),
            other => Err(Error::InvalidValue(format!("unknown resource type: {}", other))),
        }
    }
}
