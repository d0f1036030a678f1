//! Listing-page extraction: turns one search-results page into a list of
//! lightweight property references.

use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::graph::{self, StateGraph};
use crate::locator;
use crate::records::SummaryRecord;

/// Collection key the listing page stores its property entries under.
/// Its nesting depth varies between page variants, hence the graph-wide
/// search rather than a fixed path.
const RESULTS_KEY: &str = "results";

/// Fetch the listing page and extract its property references.
///
/// Any failure here is fatal to a harvest run: nothing downstream can
/// proceed without the listing.
pub async fn fetch_summaries(
    fetcher: &dyn PageFetcher,
    listing_url: &str,
) -> Result<Vec<SummaryRecord>> {
    let html = fetcher.fetch(listing_url).await?;
    let blob = locator::locate_state_blob(&html)?;
    let graph = StateGraph::parse(blob)?;
    let results = graph.named_list(RESULTS_KEY)?;

    let summaries = summaries_from_results(results);
    info!(
        url = listing_url,
        entries = results.len(),
        summaries = summaries.len(),
        "listing page extracted"
    );
    Ok(summaries)
}

/// Map raw result entries to summary records. Entries without a display
/// name carry no usable identity and are skipped.
pub fn summaries_from_results(results: &[Value]) -> Vec<SummaryRecord> {
    results.iter().filter_map(summary_from_entry).collect()
}

fn summary_from_entry(entry: &Value) -> Option<SummaryRecord> {
    let name = entry
        .get("displayName")
        .and_then(|d| graph::non_empty_str_field(d, "text"))?
        .to_string();

    let description = entry
        .get("description")
        .and_then(|d| graph::non_empty_str_field(d, "text"))
        .map(str::to_string);

    let basic = entry.get("basicPropertyData");

    let page_name = basic
        .and_then(|b| graph::non_empty_str_field(b, "pageName"))
        .unwrap_or_default()
        .to_string();

    let address = basic
        .and_then(|b| b.get("location"))
        .and_then(|l| graph::non_empty_str_field(l, "address"))
        .map(str::to_string);

    let reviews = basic.and_then(|b| b.get("reviews"));
    let review_score = reviews.and_then(|r| graph::f64_field(r, "totalScore"));
    let review_count = reviews.and_then(|r| graph::i64_field(r, "reviewsCount"));

    Some(SummaryRecord {
        name,
        page_name,
        address,
        description,
        review_score,
        review_count,
    })
}
