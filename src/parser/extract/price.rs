use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::parser::text::element_text;

static META_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[itemprop="price"]"#).unwrap());
static PRICE_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-marker="item-price"]"#).unwrap());
static RUBLES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d\s]*₽").unwrap());

/// Price of a card: meta content, then the labelled price node, then the
/// first ruble amount anywhere in the card.
pub fn extract(card: ElementRef<'_>) -> String {
    let meta = card
        .select(&META_PRICE)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if let Some(content) = meta {
        return content.to_string();
    }

    let labelled = card
        .select(&PRICE_TEXT)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());
    if let Some(text) = labelled {
        return text;
    }

    let text = element_text(card);
    RUBLES_RE
        .find(&text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
