use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::model::DetailFields;
use crate::parser::text::element_text;

const ADDRESS: &[&str] = &[
    r#"[data-marker="item-view/item-address"]"#,
    r#"[itemprop="address"]"#,
    r#"div[class*="style-item-address"]"#,
];
const PARAMS: &[&str] = &[
    r#"[data-marker="item-view/item-params"]"#,
    r#"#bx_item-params"#,
    r#"div[class*="params-paramsList"]"#,
];
const PRICE_LIST: &[&str] = &[
    r#"[data-marker="item-view/price-list"]"#,
    r#"div[class*="price-list"]"#,
];
const DESCRIPTION: &[&str] = &[
    r#"[data-marker="item-view/item-description"]"#,
    r#"[itemprop="description"]"#,
];
const ADDITIONAL: &[&str] = &[
    r#"[data-marker="item-view/additional-services"]"#,
    r#"div[class*="additional-services"]"#,
];

static ADDRESS_SEL: LazyLock<Vec<Selector>> = LazyLock::new(|| parse_all(ADDRESS));
static PARAMS_SEL: LazyLock<Vec<Selector>> = LazyLock::new(|| parse_all(PARAMS));
static PRICE_LIST_SEL: LazyLock<Vec<Selector>> = LazyLock::new(|| parse_all(PRICE_LIST));
static DESCRIPTION_SEL: LazyLock<Vec<Selector>> = LazyLock::new(|| parse_all(DESCRIPTION));
static ADDITIONAL_SEL: LazyLock<Vec<Selector>> = LazyLock::new(|| parse_all(ADDITIONAL));
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

/// Fields of an item page. Each block is independent; a missing one is "".
pub fn extract(doc: &Html) -> DetailFields {
    DetailFields {
        location_detail: first_block(doc, &ADDRESS_SEL).map(element_text).unwrap_or_default(),
        details: first_block(doc, &PARAMS_SEL).map(list_text).unwrap_or_default(),
        price_list: first_block(doc, &PRICE_LIST_SEL).map(list_text).unwrap_or_default(),
        description: first_block(doc, &DESCRIPTION_SEL).map(element_text).unwrap_or_default(),
        additional: first_block(doc, &ADDITIONAL_SEL).map(list_text).unwrap_or_default(),
    }
}

fn parse_all(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

fn first_block<'a>(doc: &'a Html, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| doc.select(sel).next())
}

/// `li` entries joined with "; ", or the whole block when it is not a list.
fn list_text(block: ElementRef<'_>) -> String {
    let items: Vec<String> = block
        .select(&LIST_ITEM)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    if items.is_empty() {
        element_text(block)
    } else {
        items.join("; ")
    }
}
