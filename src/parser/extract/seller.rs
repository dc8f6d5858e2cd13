use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::model::SellerInfo;
use crate::parser::text::element_text;

static NAME_WRAP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[class*="AvatarNameView-name"]"#).unwrap());
static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, h2").unwrap());
static RATING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[data-marker="profile/score"]"#).unwrap());

/// Seller block is page-level, searched once per snapshot.
pub fn extract(doc: &Html) -> SellerInfo {
    let name = doc
        .select(&NAME_WRAP)
        .find_map(|wrap| wrap.select(&HEADING).next())
        .map(element_text)
        .unwrap_or_default();

    let rating = doc
        .select(&RATING)
        .next()
        .map(element_text)
        .unwrap_or_default();

    SellerInfo { name, rating }
}
