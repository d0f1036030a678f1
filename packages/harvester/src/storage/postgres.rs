//! Postgres-backed listing store.
//!
//! Upserts land in `accommodations`, keyed on (source_website,
//! external_id); activity rows go to `parsing_logs`. Schema and
//! migrations are owned elsewhere — both tables are assumed to exist.

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error};

use crate::error::Result;
use crate::records::DetailRecord;
use crate::storage::{validate, ActivityEntry, ListingStore, UpsertOutcome, SOURCE_WEBSITE};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingStore for PostgresStore {
    async fn upsert(&self, record: &DetailRecord) -> Result<UpsertOutcome> {
        validate(record)?;

        debug!(page_name = %record.page_name, "upserting accommodation");

        let photos = photos_json(record);
        let reviews = reviews_json(record);
        let amenities = amenities_from_facilities(&record.facilities);

        // `xmax = 0` distinguishes a fresh insert from a conflict-update.
        let was_insert: bool = sqlx::query_scalar(
            r#"
            INSERT INTO accommodations (
                name, latitude, longitude, address, accommodation_type,
                service_description, website_url, photos, rating, review_count,
                reviews, amenities, verification_status, source_website,
                source_url, external_id
            ) VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9, $10,
                $11, $12, $13, $14,
                $15, $16
            )
            ON CONFLICT (source_website, external_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                address = EXCLUDED.address,
                accommodation_type = EXCLUDED.accommodation_type,
                service_description = EXCLUDED.service_description,
                website_url = EXCLUDED.website_url,
                photos = EXCLUDED.photos,
                rating = EXCLUDED.rating,
                review_count = EXCLUDED.review_count,
                reviews = EXCLUDED.reviews,
                amenities = EXCLUDED.amenities,
                verification_status = EXCLUDED.verification_status,
                last_updated = CURRENT_TIMESTAMP
            RETURNING (xmax = 0) AS was_insert
            "#,
        )
        .bind(&record.name)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(&record.address)
        .bind(&record.accommodation_type)
        .bind(&record.description)
        .bind(&record.url)
        .bind(photos)
        .bind(record.review_score)
        .bind(record.review_count)
        .bind(reviews)
        .bind(amenities)
        .bind(&record.verification_status)
        .bind(SOURCE_WEBSITE)
        .bind(&record.url)
        .bind(&record.page_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(if was_insert {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn log_activity(&self, entry: &ActivityEntry) {
        let completed_at = entry.started_at + chrono::Duration::milliseconds(entry.duration_ms);
        let result = sqlx::query(
            r#"
            INSERT INTO parsing_logs (
                source_website, operation, status, error_message,
                started_at, completed_at, duration_ms, external_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(SOURCE_WEBSITE)
        .bind(&entry.operation)
        .bind(&entry.status)
        .bind(&entry.error_text)
        .bind(entry.started_at)
        .bind(completed_at)
        .bind(entry.duration_ms)
        .bind(&entry.external_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            error!(
                external_id = %entry.external_id,
                error = %e,
                "failed to write activity log row"
            );
        }
    }
}

fn photos_json(record: &DetailRecord) -> Option<serde_json::Value> {
    if record.photos.is_empty() {
        return None;
    }
    Some(json!(record.photos))
}

fn reviews_json(record: &DetailRecord) -> serde_json::Value {
    json!({
        "general_rating": record.review_score.unwrap_or(0.0),
        "general_review_count": record.review_count.unwrap_or(0),
        "detailed_reviews": record.reviews,
        "source": SOURCE_WEBSITE,
    })
}

/// Keyword → amenity flag. First match per facility string wins.
const AMENITY_KEYWORDS: &[(&str, &str)] = &[
    ("wifi", "wifi"),
    ("internet", "wifi"),
    ("parking", "parking"),
    ("pool", "pool"),
    ("swimming", "pool"),
    ("gym", "gym"),
    ("fitness", "gym"),
    ("spa", "spa"),
    ("wellness", "spa"),
    ("restaurant", "restaurant"),
    ("dining", "restaurant"),
    ("bar", "bar"),
    ("lounge", "bar"),
    ("breakfast", "breakfast"),
    ("room service", "room_service"),
    ("laundry", "laundry"),
    ("air conditioning", "ac"),
    ("a/c", "ac"),
    ("heating", "heating"),
    ("tv", "tv"),
    ("television", "tv"),
    ("minibar", "minibar"),
    ("safe", "safe"),
    ("balcony", "balcony"),
    ("terrace", "balcony"),
    ("kitchen", "kitchen"),
    ("kitchenette", "kitchen"),
    ("pet", "pets_allowed"),
    ("animal", "pets_allowed"),
    ("wheelchair", "disabled_access"),
    ("accessible", "disabled_access"),
];

/// Collapse free-form facility titles into a flat amenity-flag object.
/// Facilities with no matching keyword contribute nothing.
fn amenities_from_facilities(facilities: &[String]) -> Option<serde_json::Value> {
    let mut amenities = serde_json::Map::new();
    for facility in facilities {
        let lowered = facility.to_lowercase();
        if let Some((_, amenity)) = AMENITY_KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
        {
            amenities.insert((*amenity).to_string(), serde_json::Value::Bool(true));
        }
    }
    if amenities.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(amenities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amenities_map_recognized_keywords() {
        let facilities = vec![
            "Free WiFi".to_string(),
            "Outdoor swimming pool".to_string(),
            "Karaoke machine".to_string(),
        ];
        let amenities = amenities_from_facilities(&facilities).unwrap();
        assert_eq!(amenities["wifi"], true);
        assert_eq!(amenities["pool"], true);
        assert!(amenities.get("karaoke").is_none());
    }

    #[test]
    fn amenities_cover_alternate_phrasings() {
        let facilities = vec![
            "Dining area".to_string(),
            "Lounge".to_string(),
            "Flat-screen television".to_string(),
            "In-room safe".to_string(),
            "Kitchenette".to_string(),
            "Animals welcome".to_string(),
            "A/C in all rooms".to_string(),
        ];
        let amenities = amenities_from_facilities(&facilities).unwrap();
        assert_eq!(amenities["restaurant"], true);
        assert_eq!(amenities["bar"], true);
        assert_eq!(amenities["tv"], true);
        assert_eq!(amenities["safe"], true);
        assert_eq!(amenities["kitchen"], true);
        assert_eq!(amenities["pets_allowed"], true);
        assert_eq!(amenities["ac"], true);
    }

    #[test]
    fn amenities_empty_when_nothing_matches() {
        assert!(amenities_from_facilities(&["Karaoke".to_string()]).is_none());
        assert!(amenities_from_facilities(&[]).is_none());
    }

    #[test]
    fn reviews_json_defaults_missing_figures() {
        let record = DetailRecord::new("u");
        let value = reviews_json(&record);
        assert_eq!(value["general_rating"], 0.0);
        assert_eq!(value["general_review_count"], 0);
        assert_eq!(value["source"], "booking");
    }
}
