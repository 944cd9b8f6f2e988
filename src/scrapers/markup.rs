//! Small DOM helpers over `scraper` used by the HTML adapters.
//!
//! `scraper::Html` is not `Send`, so every parse happens inside a synchronous
//! function that returns owned records before the next `.await`.

use itertools::Itertools;
use scraper::{ElementRef, Selector};

/// Text of all descendants with each fragment trimmed, joined without separators.
pub fn text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect::<String>()
}

/// Text of all descendants, non-empty fragments trimmed and joined by one space.
pub fn spaced_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).join(" ")
}

/// Text of all descendants exactly as it appears in the markup.
pub fn raw_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Nearest ancestor whose tag is one of `names`.
pub fn closest<'a>(el: ElementRef<'a>, names: &[&str]) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| names.contains(&a.value().name()))
}

/// First descendant (not `el` itself) matching `selector`.
pub fn first<'a>(el: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    el.select(selector).next()
}

/// Trimmed text of the first descendant matching `selector`, falling back to
/// the element's own text.
pub fn heading_or_self(el: ElementRef<'_>, selector: &Selector) -> String {
    first(el, selector).map(text).unwrap_or_else(|| text(el))
}

/// Whether any of the nearest `max_depth` ancestors contains `needle`.
pub fn ancestor_contains(el: ElementRef<'_>, needle: &str, max_depth: usize) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .take(max_depth)
        .any(|a| raw_text(a).contains(needle))
}

/// `href` attribute, trimmed. `None` when absent or blank.
pub fn href(el: ElementRef<'_>) -> Option<&str> {
    el.value().attr("href").map(str::trim).filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const DOC: &str = r#"<html><body>
      <section><div class="box"><p>[사설]</p>
        <ul><li><a href=" /a/1 "><h3> 제목 </h3><span>부제</span></a></li></ul>
      </div></section>
    </body></html>"#;

    #[test]
    fn test_text_helpers() {
        let doc = Html::parse_document(DOC);
        let a_sel = Selector::parse("a").unwrap();
        let a = doc.select(&a_sel).next().unwrap();
        assert_eq!(text(a), "제목부제");
        assert_eq!(spaced_text(a), "제목 부제");
        assert!(raw_text(a).contains(" 제목 "));
        assert_eq!(href(a), Some("/a/1"));
    }

    #[test]
    fn test_closest_and_first() {
        let doc = Html::parse_document(DOC);
        let a_sel = Selector::parse("a").unwrap();
        let h_sel = Selector::parse("h2, h3").unwrap();
        let a = doc.select(&a_sel).next().unwrap();
        assert_eq!(closest(a, &["li", "div"]).unwrap().value().name(), "li");
        assert_eq!(closest(a, &["div"]).unwrap().value().attr("class"), Some("box"));
        assert_eq!(heading_or_self(a, &h_sel), "제목");
        assert!(first(a, &a_sel).is_none());
    }

    #[test]
    fn test_ancestor_contains_depth() {
        let doc = Html::parse_document(DOC);
        let a_sel = Selector::parse("a").unwrap();
        let a = doc.select(&a_sel).next().unwrap();
        // li, ul, div.box
        assert!(!ancestor_contains(a, "[사설]", 2));
        assert!(ancestor_contains(a, "[사설]", 3));
    }
}
