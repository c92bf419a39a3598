use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CheckInKind {
    Completed,
    Incomplete,
}

impl CheckInKind {
    pub fn is_completed(self) -> bool {
        self == CheckInKind::Completed
    }
}

impl FromStr for CheckInKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "completed" => Ok(Self::Completed),
            "incomplete" => Ok(Self::Incomplete),
            _ => Err(AppError::Validation(
                "Check-in kind must be 'completed' or 'incomplete'".into(),
            )),
        }
    }
}

impl fmt::Display for CheckInKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Incomplete => f.write_str("incomplete"),
        }
    }
}

/// A checklist item the user did not finish that day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncompleteTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: String,
    pub kind: CheckInKind,
    pub is_completed: bool,
    pub incomplete_tasks: Json<Vec<IncompleteTask>>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckInRequest {
    #[serde(alias = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub incomplete_tasks: Vec<IncompleteTask>,
    #[serde(default)]
    pub note: String,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodayStatus {
    pub checked_in: bool,
    pub record: Option<CheckInRecord>,
}
