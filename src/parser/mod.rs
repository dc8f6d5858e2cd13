pub mod extract;
pub mod text;

use scraper::Html;

use crate::model::{DetailFields, ExtractionResult};

/// Listing snapshot → records + seller. Never fails; missing data degrades to "".
pub fn extract_from_html(html: &str) -> ExtractionResult {
    let doc = Html::parse_document(html);
    extract::extract_all(&doc)
}

/// Item page snapshot → detail fields.
pub fn extract_details(html: &str) -> DetailFields {
    let doc = Html::parse_document(html);
    extract::detail::extract(&doc)
}
