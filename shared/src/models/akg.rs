//! AKG (Angka Kecukupan Gizi) threshold models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::nutrition::Threshold;

/// A named nutrition standard a meal is evaluated against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Akg {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub threshold: Threshold,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
