//! Locates the serialized state graph inside page markup.
//!
//! The graph ships in a `<script>` tag carrying a store-marker attribute.
//! Listing pages frequently embed several such scripts; the one holding the
//! root query is the one we want.

use regex::Regex;

use crate::error::{HarvestError, Result};

/// Substring identifying the root-query snapshot among several candidates.
const ROOT_SENTINEL: &str = "ROOT_QUERY";

/// Find the embedded-state blob in decoded page text.
///
/// When multiple marked scripts exist, prefers the first whose body
/// contains the root-query sentinel, falling back to the first candidate
/// in document order. The returned text is trimmed of surrounding
/// whitespace.
pub fn locate_state_blob(html: &str) -> Result<&str> {
    let re = Regex::new(r#"(?is)<script[^>]*data-capla-store-data=["']apollo["'][^>]*>(.*?)</script>"#)
        .expect("valid regex");

    let candidates: Vec<&str> = re
        .captures_iter(html)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();

    if candidates.is_empty() {
        return Err(HarvestError::NotFound(
            "no embedded state script in page".to_string(),
        ));
    }

    let chosen = candidates
        .iter()
        .find(|body| body.contains(ROOT_SENTINEL))
        .unwrap_or(&candidates[0]);

    Ok(chosen.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(scripts: &[&str]) -> String {
        let mut html = String::from("<html><head><title>x</title></head><body>");
        for s in scripts {
            html.push_str(s);
        }
        html.push_str("</body></html>");
        html
    }

    #[test]
    fn single_fragment_returned_trimmed_verbatim() {
        let html = page(&[
            r#"<script data-capla-store-data="apollo" type="application/json">  {"A:1":{"x":1}}  </script>"#,
        ]);
        let blob = locate_state_blob(&html).unwrap();
        assert_eq!(blob, r#"{"A:1":{"x":1}}"#);
    }

    #[test]
    fn zero_fragments_is_not_found() {
        let html = page(&[r#"<script type="application/json">{"other":1}</script>"#]);
        let err = locate_state_blob(&html).unwrap_err();
        assert!(matches!(err, HarvestError::NotFound(_)));
    }

    #[test]
    fn prefers_candidate_with_root_sentinel() {
        let html = page(&[
            r#"<script data-capla-store-data="apollo">{"decoy":true}</script>"#,
            r#"<script data-capla-store-data="apollo">{"ROOT_QUERY":{}}</script>"#,
        ]);
        let blob = locate_state_blob(&html).unwrap();
        assert_eq!(blob, r#"{"ROOT_QUERY":{}}"#);
    }

    #[test]
    fn falls_back_to_first_candidate_in_document_order() {
        let html = page(&[
            r#"<script data-capla-store-data="apollo">{"first":1}</script>"#,
            r#"<script data-capla-store-data="apollo">{"second":2}</script>"#,
        ]);
        let blob = locate_state_blob(&html).unwrap();
        assert_eq!(blob, r#"{"first":1}"#);
    }

    #[test]
    fn matches_single_quoted_marker_and_multiline_body() {
        let html = page(&[
            "<script data-capla-store-data='apollo' type=\"application/json\">\n{\"ROOT_QUERY\":\n{}}\n</script>",
        ]);
        let blob = locate_state_blob(&html).unwrap();
        assert_eq!(blob, "{\"ROOT_QUERY\":\n{}}");
    }
}
