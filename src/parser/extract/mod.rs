pub mod detail;
pub mod listing;
pub mod price;
pub mod seller;

use scraper::Html;

use crate::model::ExtractionResult;

pub fn extract_all(doc: &Html) -> ExtractionResult {
    let products = listing::extract(doc);
    let seller_info = seller::extract(doc);
    ExtractionResult::new(products, seller_info)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(fixture: &str) -> ExtractionResult {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap();
        extract_all(&Html::parse_document(&html))
    }

    #[test]
    fn profile_counts_and_indices() {
        let r = parse("seller_profile");
        assert_eq!(r.total_products, r.products.len());
        assert_eq!(r.total_products, 4, "ad card without title must be dropped");
        let indices: Vec<usize> = r.products.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn profile_first_card_fields() {
        let r = parse("seller_profile");
        let p = &r.products[0];
        assert_eq!(p.name, "Стул венский");
        assert_eq!(p.url, "https://www.avito.ru/moskva/mebel/stul_venskiy_1001");
        assert_eq!(p.title, "Стул венский, дуб");
        assert_eq!(p.price, "3500");
        assert_eq!(p.location, "Москва, Арбатская");
        assert_eq!(p.date, "2 дня назад");
        assert!(p.detail.is_none());
    }

    #[test]
    fn profile_second_layout_and_fallbacks() {
        let r = parse("seller_profile");
        let by_name = |n: &str| r.products.iter().find(|p| p.name == n).unwrap();

        let table = by_name("Стол обеденный");
        assert_eq!(table.price, "12 000 ₽");
        assert_eq!(table.url, "https://www.avito.ru/moskva/mebel/stol_1002");

        let shelf = by_name("Полка настенная");
        assert_eq!(shelf.price, "800 ₽");
        assert_eq!(shelf.location, "");

        let lamp = by_name("Лампа");
        assert_eq!(lamp.price, "");
        assert_eq!(lamp.date, "");
    }

    #[test]
    fn profile_seller() {
        let r = parse("seller_profile");
        assert_eq!(r.seller_info.name, "Мебельная мастерская");
        assert_eq!(r.seller_info.rating, "4,9");
    }

    #[test]
    fn empty_profile_is_not_an_error() {
        let r = parse("empty_profile");
        assert_eq!(r.total_products, 0);
        assert!(r.products.is_empty());
        assert_eq!(r.seller_info.name, "Частное лицо");
        assert_eq!(r.seller_info.rating, "");
    }

    #[test]
    fn garbage_input() {
        let r = extract_all(&Html::parse_document("<<<not html"));
        assert_eq!(r.total_products, 0);
        assert!(r.seller_info.is_empty());
    }
}
