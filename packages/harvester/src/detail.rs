//! Node classifier: interprets a detail-page state graph into one
//! `DetailRecord`.
//!
//! Every top-level graph key is dispatched by its type prefix through a
//! fixed table. Classification is best-effort and never fails: absent or
//! oddly shaped fields leave their target defaulted, and the graph is
//! never mutated.

use regex::Regex;
use serde_json::Value;

use crate::graph::{self, StateGraph};
use crate::records::{DetailRecord, ReviewScore};

/// Node categories the classifier understands. Everything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    BasicPropertyData,
    LocalizedText,
    Photo,
    Facility,
    FacilityHighlight,
    Property,
}

/// Ordered prefix table; first match wins.
const PREFIXES: &[(&str, NodeKind)] = &[
    ("BasicPropertyData:", NodeKind::BasicPropertyData),
    ("TextWithTranslationTag:", NodeKind::LocalizedText),
    ("AccommodationPhoto:", NodeKind::Photo),
    ("BaseFacility:", NodeKind::Facility),
    ("GenericFacilityHighlight:", NodeKind::FacilityHighlight),
    ("Property:", NodeKind::Property),
];

/// Photo nodes key their largest rendition under this parameterized field.
const MAX_RESOLUTION_FIELD: &str = r#"resource({"size":"max1024x768"})"#;

fn classify_key(key: &str) -> Option<NodeKind> {
    PREFIXES
        .iter()
        .find(|(prefix, _)| key.starts_with(prefix))
        .map(|(_, kind)| *kind)
}

/// Defaults carried over from the listing entry; they win only when the
/// detail graph offers nothing of its own.
#[derive(Debug, Clone, Default)]
pub struct DetailDefaults {
    pub description: Option<String>,
    pub review_score: Option<f64>,
    pub review_count: Option<i64>,
}

impl DetailDefaults {
    pub fn from_summary(summary: &crate::records::SummaryRecord) -> Self {
        Self {
            description: summary.description.clone(),
            review_score: summary.review_score,
            review_count: summary.review_count,
        }
    }
}

/// Classify every node of a detail-page graph into one record.
pub fn classify(graph: &StateGraph, url: &str, defaults: &DetailDefaults) -> DetailRecord {
    let mut record = DetailRecord::new(url);
    record.description = defaults.description.clone();
    record.review_score = defaults.review_score;
    record.review_count = defaults.review_count;

    for (key, value) in graph.entries() {
        match classify_key(key) {
            Some(NodeKind::BasicPropertyData) => extract_basic_data(value, &mut record),
            Some(NodeKind::LocalizedText) => extract_description(value, &mut record),
            Some(NodeKind::Photo) => extract_photo(value, &mut record),
            Some(NodeKind::Facility) => extract_facility_instances(value, &mut record),
            Some(NodeKind::FacilityHighlight) => extract_facility_highlight(value, &mut record),
            Some(NodeKind::Property) => extract_property(graph, value, &mut record),
            None => {}
        }
    }

    record
}

fn extract_basic_data(value: &Value, record: &mut DetailRecord) {
    if let Some(name) = graph::str_field(value, "name") {
        record.name = name.to_string();
    }
    if let Some(page_name) = graph::str_field(value, "pageName") {
        record.page_name = page_name.to_string();
    }
    // Coarse numeric code; the Property node refines this to a readable
    // type when its cross-reference resolves.
    if let Some(type_id) = graph::f64_field(value, "accommodationTypeId") {
        record.accommodation_type = Some(format!("Type-{}", type_id as i64));
    }
    if let Some(location) = value.get("location") {
        record.latitude = graph::f64_field(location, "latitude");
        record.longitude = graph::f64_field(location, "longitude");
        if let Some(address) = graph::str_field(location, "formattedAddress") {
            record.address = Some(address.to_string());
        }
    }
}

fn extract_description(value: &Value, record: &mut DetailRecord) {
    if record.description.as_deref().is_some_and(|d| !d.is_empty()) {
        return;
    }
    if let Some(text) = graph::non_empty_str_field(value, "text") {
        record.description = Some(text.to_string());
    }
}

fn extract_photo(value: &Value, record: &mut DetailRecord) {
    if let Some(resource) = value.get(MAX_RESOLUTION_FIELD) {
        if let Some(url) = graph::str_field(resource, "absoluteUrl") {
            record.photos.push(clean_photo_url(url));
        }
    }
}

fn extract_facility_instances(value: &Value, record: &mut DetailRecord) {
    if let Some(instances) = graph::list_field(value, "instances") {
        for instance in instances {
            if let Some(title) = graph::non_empty_str_field(instance, "title") {
                record.facilities.push(title.to_string());
            }
        }
    }
}

fn extract_facility_highlight(value: &Value, record: &mut DetailRecord) {
    if let Some(title) = graph::non_empty_str_field(value, "title") {
        record.facilities.push(title.to_string());
    }
}

fn extract_property(graph: &StateGraph, value: &Value, record: &mut DetailRecord) {
    if let Some(acc_type) = value.get("accommodationType") {
        if let Some(reference) = graph::str_field(acc_type, "__ref") {
            if let Some(raw) = resolve_type_reference(graph, reference) {
                record.accommodation_type = Some(title_case(&raw.to_lowercase()));
            }
        }
    }

    if let Some(reviews) = value.get("reviews") {
        if let Some(questions) = graph::list_field(reviews, "questions") {
            for question in questions {
                // A name is required; a missing score defaults to zero.
                if let Some(name) = graph::non_empty_str_field(question, "name") {
                    record.reviews.push(ReviewScore {
                        name: name.to_string(),
                        score: graph::f64_field(question, "score").unwrap_or(0.0),
                    });
                }
            }
        }
    }
}

/// Resolve an accommodation-type cross-reference. The referenced node is
/// often never materialized (its key exists only inside the reference
/// descriptor, e.g. `PropertyType:{"type":"CAMPING"}`); in that case the
/// embedded type field is recovered from the descriptor text itself.
fn resolve_type_reference(graph: &StateGraph, reference: &str) -> Option<String> {
    if let Some(node) = graph.get(reference) {
        if let Some(kind) = graph::str_field(node, "type") {
            return Some(kind.to_string());
        }
    }
    let re = Regex::new(r#""type":"([^"]+)""#).expect("valid regex");
    re.captures(reference).map(|cap| cap[1].to_string())
}

/// Un-escape encoded ampersands and strip the trailing placeholder query
/// suffix the CDN appends to max-resolution renditions.
fn clean_photo_url(url: &str) -> String {
    let url = url.replace("\\u0026", "&");
    let url = url.strip_suffix("&o=").unwrap_or(&url);
    url.trim().to_string()
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(raw: &str) -> StateGraph {
        StateGraph::parse(raw).unwrap()
    }

    #[test]
    fn basic_property_data_populates_identity_and_location() {
        let graph = graph_of(
            r#"{
                "BasicPropertyData:1": {
                    "name": "Guesthouse Aisha",
                    "pageName": "guesthouse-aisha",
                    "location": {
                        "latitude": 43.2,
                        "longitude": 76.9,
                        "formattedAddress": "Almaty"
                    }
                }
            }"#,
        );

        let record = classify(&graph, "https://example.com/p", &DetailDefaults::default());

        assert_eq!(record.name, "Guesthouse Aisha");
        assert_eq!(record.page_name, "guesthouse-aisha");
        assert_eq!(record.latitude, Some(43.2));
        assert_eq!(record.longitude, Some(76.9));
        assert_eq!(record.address.as_deref(), Some("Almaty"));
        // Everything else stays default.
        assert!(record.accommodation_type.is_none());
        assert!(record.description.is_none());
        assert!(record.photos.is_empty());
        assert!(record.reviews.is_empty());
        assert!(record.facilities.is_empty());
        assert!(record.review_score.is_none());
        assert!(record.review_count.is_none());
    }

    #[test]
    fn accommodation_type_resolved_via_graph_lookup() {
        let graph = graph_of(
            r#"{
                "Property:99": {
                    "accommodationType": {"__ref": "PropertyType:7"}
                },
                "PropertyType:7": {"type": "HOTEL"}
            }"#,
        );

        let record = classify(&graph, "u", &DetailDefaults::default());
        assert_eq!(record.accommodation_type.as_deref(), Some("Hotel"));
    }

    #[test]
    fn accommodation_type_falls_back_to_ref_descriptor() {
        // The referenced key is absent from the graph; the type is embedded
        // in the reference string itself.
        let graph = graph_of(
            r#"{
                "Property:99": {
                    "accommodationType": {"__ref": "PropertyType:{\"type\":\"CAMPING\"}"}
                }
            }"#,
        );

        let record = classify(&graph, "u", &DetailDefaults::default());
        assert_eq!(record.accommodation_type.as_deref(), Some("Camping"));
    }

    #[test]
    fn description_default_wins_only_when_graph_is_silent() {
        let defaults = DetailDefaults {
            description: Some("from listing".to_string()),
            ..Default::default()
        };
        let graph = graph_of(r#"{"TextWithTranslationTag:1": {"text": "from detail page"}}"#);
        let record = classify(&graph, "u", &defaults);
        assert_eq!(record.description.as_deref(), Some("from listing"));

        let record = classify(&graph, "u", &DetailDefaults::default());
        assert_eq!(record.description.as_deref(), Some("from detail page"));
    }

    #[test]
    fn photo_url_is_normalized() {
        let graph = graph_of(
            r#"{
                "AccommodationPhoto:5": {
                    "resource({\"size\":\"max1024x768\"})": {
                        "absoluteUrl": " https://cdn.example.com/img.jpg?k=1\\u0026s=2&o="
                    }
                }
            }"#,
        );

        let record = classify(&graph, "u", &DetailDefaults::default());
        assert_eq!(
            record.photos,
            vec!["https://cdn.example.com/img.jpg?k=1&s=2".to_string()]
        );
    }

    #[test]
    fn facilities_collected_from_instances_and_highlights() {
        let graph = graph_of(
            r#"{
                "BaseFacility:1": {
                    "instances": [
                        {"title": "Free WiFi"},
                        {"title": ""},
                        {"title": "Parking"}
                    ]
                },
                "GenericFacilityHighlight:2": {"title": "Airport shuttle"},
                "GenericFacilityHighlight:3": {"title": ""}
            }"#,
        );

        let record = classify(&graph, "u", &DetailDefaults::default());
        assert_eq!(
            record.facilities,
            vec!["Free WiFi", "Parking", "Airport shuttle"]
        );
    }

    #[test]
    fn review_breakdown_keeps_named_entries_only() {
        let graph = graph_of(
            r#"{
                "Property:1": {
                    "reviews": {
                        "questions": [
                            {"name": "Cleanliness", "score": 8.7},
                            {"name": "", "score": 5.0},
                            {"name": "Location", "score": 9.1},
                            {"name": "Staff"}
                        ]
                    }
                }
            }"#,
        );

        let record = classify(&graph, "u", &DetailDefaults::default());
        assert_eq!(
            record.reviews,
            vec![
                ReviewScore {
                    name: "Cleanliness".to_string(),
                    score: 8.7
                },
                ReviewScore {
                    name: "Location".to_string(),
                    score: 9.1
                },
                ReviewScore {
                    name: "Staff".to_string(),
                    score: 0.0
                },
            ]
        );
    }

    #[test]
    fn unknown_prefixes_are_ignored() {
        let graph = graph_of(r#"{"SomethingElse:1": {"name": "nope"}}"#);
        let record = classify(&graph, "u", &DetailDefaults::default());
        assert!(record.name.is_empty());
    }

    #[test]
    fn numeric_type_code_from_basic_data() {
        let graph = graph_of(r#"{"BasicPropertyData:1": {"accommodationTypeId": 204}}"#);
        let record = classify(&graph, "u", &DetailDefaults::default());
        assert_eq!(record.accommodation_type.as_deref(), Some("Type-204"));
    }
}
