use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shared categorization rule. The keyword is globally unique and matched
/// by substring containment inside the uppercased transaction label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralRule {
    pub id: i64,
    pub keyword: String,
    pub clean_label: String,
    pub category: String,
    pub subcategory: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGeneralRule {
    pub keyword: String,
    pub clean_label: String,
    pub category: String,
    pub subcategory: String,
}

/// Per-user categorization rule. Wins over any general rule matching the
/// same transaction. Keyword is unique per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalRule {
    pub id: i64,
    pub user_id: i64,
    pub keyword: String,
    pub clean_label: String,
    pub category: String,
    pub subcategory: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPersonalRule {
    pub user_id: i64,
    pub keyword: String,
    pub clean_label: String,
    pub category: String,
    pub subcategory: String,
}
