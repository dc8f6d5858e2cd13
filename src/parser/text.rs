use scraper::{ElementRef, Node};

/// Subtrees whose text is never visible on the page.
const SKIPPED_TAGS: &[&str] = &["svg", "script", "style", "noscript"];

/// Collapse whitespace runs (NBSP included) into single spaces and trim.
pub fn normalize(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text of an element with icon and script subtrees removed.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(el, &mut parts);
    normalize(&parts.join(" "))
}

fn collect_text<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push(&**text),
            Node::Element(e) if SKIPPED_TAGS.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_text(html: &str, css: &str) -> String {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse(css).unwrap();
        element_text(doc.select(&sel).next().unwrap())
    }

    #[test]
    fn collapses_whitespace_and_nbsp() {
        assert_eq!(normalize("  12\u{a0}500 \n\t ₽  "), "12 500 ₽");
    }

    #[test]
    fn idempotent() {
        for s in ["", "  a  b ", "x\u{a0}\u{a0}y\n\nz", "уже нормально"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn skips_svg_icons() {
        let html = r#"<p id="p"><svg><title>icon</title><path d="M0"/></svg>Москва,<span>&nbsp;Арбат</span></p>"#;
        assert_eq!(first_text(html, "#p"), "Москва, Арбат");
    }

    #[test]
    fn skips_scripts() {
        let html = r#"<div id="d">Цена<script>var x = 1;</script> договорная</div>"#;
        assert_eq!(first_text(html, "#d"), "Цена договорная");
    }

    #[test]
    fn empty_element() {
        assert_eq!(first_text(r#"<div id="e">   </div>"#, "#e"), "");
    }
}
