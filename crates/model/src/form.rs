use crate::question::Question;
use alloc::{string::String, vec::Vec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub inactive: bool,
    pub author: Option<i32>,
    pub created_on: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Sorted by order. Archived questions are included so old submissions still resolve.
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub id: i32,
    pub title: String,
    pub created_on: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub inactive: Option<bool>,
}

impl FormPatch {
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.inactive.is_none()
    }
}
