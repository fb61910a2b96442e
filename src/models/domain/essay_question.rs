use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A past FE-1 essay question. Only questions with a known paper year are
/// eligible for simulations.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct EssayQuestion {
    pub id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub year: Option<i32>,
    pub question_number: Option<i32>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}
