use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::price;
use crate::model::ListingRecord;
use crate::parser::text::element_text;

pub const BASE_URL: &str = "https://www.avito.ru";

/// Avito renders two card layouts interchangeably.
pub const ITEM_SELECTOR: &str = r#"[data-marker="item"], div[class*="iva-item-root"]"#;

static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse(BASE_URL).unwrap());
static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse(ITEM_SELECTOR).unwrap());
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[data-marker="item-title"]"#).unwrap());
static GEO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[class*="geo-root"]"#).unwrap());
static DATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-marker="item-date"]"#).unwrap());

/// Cards without a title anchor are dropped before numbering, so indices
/// always run 1..N.
pub fn extract(doc: &Html) -> Vec<ListingRecord> {
    doc.select(&ITEM)
        .filter_map(card_to_record)
        .enumerate()
        .map(|(i, mut record)| {
            record.index = i + 1;
            record
        })
        .collect()
}

fn card_to_record(card: ElementRef<'_>) -> Option<ListingRecord> {
    let title_a = card.select(&TITLE).next()?;
    let attrs = title_a.value();

    Some(ListingRecord {
        index: 0,
        name: element_text(title_a),
        url: resolve_url(attrs.attr("href").unwrap_or("")),
        title: attrs.attr("title").unwrap_or("").to_string(),
        price: price::extract(card),
        location: first_text(card, &GEO),
        date: first_text(card, &DATE),
        detail: None,
    })
}

/// Resolve an href against the site origin. Unparseable input is kept verbatim.
pub fn resolve_url(href: &str) -> String {
    BASE.join(href.trim())
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_href_resolves_to_origin() {
        assert_eq!(
            resolve_url("/moskva/tovary/stul_123"),
            "https://www.avito.ru/moskva/tovary/stul_123"
        );
    }

    #[test]
    fn absolute_href_untouched() {
        assert_eq!(
            resolve_url("https://m.avito.ru/item/1"),
            "https://m.avito.ru/item/1"
        );
    }

    #[test]
    fn empty_href_is_origin() {
        assert_eq!(resolve_url(""), "https://www.avito.ru/");
    }

    #[test]
    fn card_without_title_is_skipped() {
        let html = r#"
            <div data-marker="item"><span>Реклама</span></div>
            <div data-marker="item"><a data-marker="item-title" href="/a_1">Первый</a></div>
            <div data-marker="item"><p>пусто</p></div>
            <div data-marker="item"><a data-marker="item-title" href="/b_2">Второй</a></div>
        "#;
        let doc = Html::parse_document(html);
        let records = extract(&doc);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 1);
        assert_eq!(records[0].name, "Первый");
        assert_eq!(records[1].index, 2);
        assert_eq!(records[1].url, "https://www.avito.ru/b_2");
    }

    #[test]
    fn title_attribute_is_raw() {
        let html = r#"<div class="iva-item-root-abc"><a data-marker="item-title" href="/x" title="  Стул  венский ">Стул</a></div>"#;
        let doc = Html::parse_document(html);
        let records = extract(&doc);
        assert_eq!(records[0].title, "  Стул  венский ");
    }
}
