//! Canonical output records.
//!
//! Source pages omit fields inconsistently, so everything except the
//! identity fields (name, page name) is optional. Classification fills in
//! what it finds and leaves the rest defaulted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lightweight reference produced by a listing page. Carries the defaults
/// (description, review figures) that a detail page may fail to repeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub name: String,
    pub page_name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub review_score: Option<f64>,
    pub review_count: Option<i64>,
}

/// One entry of a property's review breakdown (e.g. "Cleanliness" → 8.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScore {
    pub name: String,
    pub score: f64,
}

/// Fully detailed property record assembled from one detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRecord {
    pub name: String,
    pub page_name: String,
    pub url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub accommodation_type: Option<String>,
    pub description: Option<String>,
    pub photos: Vec<String>,
    pub review_score: Option<f64>,
    pub review_count: Option<i64>,
    pub reviews: Vec<ReviewScore>,
    pub facilities: Vec<String>,
    pub verification_status: String,
    pub harvested_at: NaiveDate,
}

impl DetailRecord {
    /// Empty record for a given page URL. Newly harvested records start
    /// unverified; downstream review flips the status.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            page_name: String::new(),
            url: url.into(),
            latitude: None,
            longitude: None,
            address: None,
            accommodation_type: None,
            description: None,
            photos: Vec::new(),
            review_score: None,
            review_count: None,
            reviews: Vec::new(),
            facilities: Vec::new(),
            verification_status: "new".to_string(),
            harvested_at: chrono::Utc::now().date_naive(),
        }
    }
}
