use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::ListingRecord;

/// Candidate strategies, most specific first. The site is an Angular app
/// whose markup shifts between releases, so each fallback is a little more
/// generic than the last.
const CANDIDATE_SELECTORS: [&str; 7] = [
    ".p-datatable-tbody tr",
    "div[class*='product']",
    "div[class*='item']",
    "div[class*='card']",
    "div[class*='auction']",
    "div[class*='col']",
    "div[class*='row'] > div",
];

/// Navigation/site-furniture markers. Any candidate whose text or classes
/// contain one of these is dropped before extraction.
const CHROME_KEYWORDS: [&str; 9] = [
    "sign in", "login", "register", "cart", "search", "menu", "nav", "header", "footer",
];

const DATE_TEXT_KEYWORDS: [&str; 4] = ["end", "closing", "time", "date"];

/// Extract up to `max_results` listing records from a parsed search page.
///
/// Pure function of its inputs: the same document and keyword always yield
/// the same records. Never returns an empty list; when nothing qualifies it
/// emits exactly one synthetic "no results" record so callers can always
/// index the first element.
pub fn extract_listings(
    document: &Html,
    keyword: &str,
    max_results: usize,
    base_url: &Url,
) -> Vec<ListingRecord> {
    let max_results = max_results.max(1);
    let candidates = select_candidates(document);

    let mut records = Vec::new();
    for (index, item) in candidates.into_iter().take(max_results).enumerate() {
        let description = extract_description(item, index);
        if description.is_empty() || description == ListingRecord::placeholder_description(index) {
            // No real description means this was not a listing after all.
            continue;
        }

        records.push(ListingRecord {
            description,
            price_text: extract_price(item),
            end_date_text: extract_end_date(item),
            image_url: extract_image_url(item, base_url),
        });
    }

    if records.is_empty() {
        log::warn!("No listings extracted for query: {}", keyword);
        records.push(ListingRecord::no_results(keyword));
    }

    records
}

fn select_candidates(document: &Html) -> Vec<ElementRef<'_>> {
    for raw in CANDIDATE_SELECTORS {
        let selector = Selector::parse(raw).unwrap();
        let filtered: Vec<ElementRef> = document
            .select(&selector)
            .filter(|el| !is_site_chrome(*el))
            .collect();

        if !filtered.is_empty() {
            log::debug!("Found {} candidates with selector: {}", filtered.len(), raw);
            return filtered;
        }
    }

    // Last resort: any link to an item page, widened to its parent container
    // so sibling price/date/image elements stay in scope.
    let item_link_selector = Selector::parse("a[href*='/item/']").unwrap();
    let mut seen = HashSet::new();
    let mut containers = Vec::new();
    for link in document.select(&item_link_selector) {
        let container = link.parent().and_then(ElementRef::wrap).unwrap_or(link);
        if seen.insert(container.id()) && !is_site_chrome(container) {
            containers.push(container);
        }
    }

    log::debug!("Found {} candidates via item links", containers.len());
    containers
}

fn is_site_chrome(el: ElementRef) -> bool {
    let text = el.text().collect::<String>().to_lowercase();
    let classes = el
        .value()
        .classes()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    CHROME_KEYWORDS
        .iter()
        .any(|kw| text.contains(kw) || classes.contains(kw))
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// True when a direct child element's text also satisfies the predicate,
/// meaning `el` is just a wrapper around the interesting node.
fn has_matching_child(el: ElementRef, matches: impl Fn(&str) -> bool) -> bool {
    el.children()
        .filter_map(ElementRef::wrap)
        .any(|child| matches(&child.text().collect::<String>()))
}

fn extract_description(item: ElementRef, index: usize) -> String {
    let lookups = [
        Selector::parse("a[href*='/item/']").unwrap(),
        Selector::parse("a").unwrap(),
        Selector::parse("h3").unwrap(),
        Selector::parse("h4").unwrap(),
        Selector::parse("[class*='title'], [class*='name'], [class*='desc']").unwrap(),
    ];

    for selector in &lookups {
        if let Some(el) = item.select(selector).next() {
            let text = element_text(el);
            if !text.is_empty() {
                return text;
            }
        }
    }

    ListingRecord::placeholder_description(index)
}

fn extract_price(item: ElementRef) -> String {
    let price_class_selector = Selector::parse("[class*='price'], [class*='Price']").unwrap();
    if let Some(el) = item.select(&price_class_selector).next() {
        let text = element_text(el);
        if !text.is_empty() {
            return text;
        }
    }

    // Fall back to the innermost span/div containing a dollar amount.
    let span_div_selector = Selector::parse("span, div").unwrap();
    for el in item.select(&span_div_selector) {
        let text = element_text(el);
        if text.contains('$') && !has_matching_child(el, |t| t.contains('$')) {
            return text;
        }
    }

    "Price not available".to_string()
}

fn extract_end_date(item: ElementRef) -> String {
    let date_class_selector =
        Selector::parse("[class*='date'], [class*='time'], [class*='end'], [class*='timer']")
            .unwrap();
    if let Some(el) = item.select(&date_class_selector).next() {
        let text = element_text(el);
        if !text.is_empty() {
            return text;
        }
    }

    let contains_date_keyword =
        |t: &str| DATE_TEXT_KEYWORDS.iter().any(|kw| t.to_lowercase().contains(kw));

    let span_div_selector = Selector::parse("span, div").unwrap();
    for el in item.select(&span_div_selector) {
        let text = element_text(el);
        if contains_date_keyword(&text) && !has_matching_child(el, |t| contains_date_keyword(t)) {
            return text;
        }
    }

    "Date not available".to_string()
}

fn extract_image_url(item: ElementRef, base_url: &Url) -> String {
    let img_selector = Selector::parse("img").unwrap();

    for img in item.select(&img_selector) {
        for attr in ["src", "data-src", "data-lazy", "data-original"] {
            if let Some(raw) = img.value().attr(attr) {
                if raw.is_empty() {
                    continue;
                }
                // Rewrites protocol-relative and root-relative forms against
                // the site origin; already-absolute URLs pass through.
                return match base_url.join(raw) {
                    Ok(url) => url.to_string(),
                    Err(_) => raw.to_string(),
                };
            }
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::extract_listings;
    use scraper::Html;
    use url::Url;

    fn base() -> Url {
        Url::parse("https://shopgoodwill.com").unwrap()
    }

    #[test]
    fn extracts_single_listing_with_all_fields() {
        let html = r#"
            <html><body>
                <a href="/item/123">Vintage Lamp</a>
                <span>$45.00</span>
                <div>Ends Dec 1</div>
                <img src="/img/lamp.jpg">
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let records = extract_listings(&document, "vintage lamp", 10, &base());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Vintage Lamp");
        assert_eq!(records[0].price_text, "$45.00");
        assert_eq!(records[0].end_date_text, "Ends Dec 1");
        assert_eq!(records[0].image_url, "https://shopgoodwill.com/img/lamp.jpg");
    }

    #[test]
    fn respects_max_results_in_document_order() {
        let mut html = String::from("<html><body>");
        for i in 1..=5 {
            html.push_str(&format!(
                "<div class='product-tile'><a href='/item/{i}'>Item number {i}</a>\
                 <span class='price'>${i}.00</span></div>"
            ));
        }
        html.push_str("</body></html>");

        let document = Html::parse_document(&html);
        let records = extract_listings(&document, "items", 2, &base());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description, "Item number 1");
        assert_eq!(records[1].description, "Item number 2");
    }

    #[test]
    fn empty_page_yields_single_synthetic_record() {
        let document = Html::parse_document("<html><body><p>nothing here</p></body></html>");
        let records = extract_listings(&document, "rare coin", 10, &base());

        assert_eq!(records.len(), 1);
        assert!(records[0].description.contains("rare coin"));
        assert!(records[0].description.contains("No results found"));
        assert_eq!(records[0].price_text, "N/A");
        assert_eq!(records[0].end_date_text, "N/A");
        assert_eq!(records[0].image_url, "");
    }

    #[test]
    fn site_chrome_is_filtered_out() {
        let html = r#"
            <html><body>
                <div class="product nav-bar"><a href="/login">Sign in</a></div>
                <div class="product"><a href="/item/9">Brass Clock</a>
                    <span class="price">$12.50</span></div>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let records = extract_listings(&document, "clock", 10, &base());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Brass Clock");
    }

    #[test]
    fn missing_fields_get_sentinel_values() {
        let html = r#"
            <html><body>
                <div class="product"><a href="/item/1">Bare Item</a></div>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let records = extract_listings(&document, "bare", 10, &base());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price_text, "Price not available");
        assert_eq!(records[0].end_date_text, "Date not available");
        assert_eq!(records[0].image_url, "");
    }

    #[test]
    fn protocol_relative_image_is_rewritten() {
        let html = r#"
            <html><body>
                <div class="product"><a href="/item/2">Framed Print</a>
                    <img data-src="//cdn.shopgoodwill.com/p/2.jpg"></div>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let records = extract_listings(&document, "print", 10, &base());

        assert_eq!(
            records[0].image_url,
            "https://cdn.shopgoodwill.com/p/2.jpg"
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let html = r#"
            <html><body>
                <div class="item-row"><a href="/item/7">Oak Table</a>
                    <span>$99.00</span><div class="end-timer">2d 4h</div></div>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let first = extract_listings(&document, "table", 10, &base());
        let second = extract_listings(&document, "table", 10, &base());

        assert_eq!(first, second);
    }
}
