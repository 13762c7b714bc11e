use prefetch_core::Frequency;
use scraper::{Html, Selector};

const NOT_FOUND: &str = "Fail to find the word";

/// Reads the dictionary's frequency indicator:
/// `<span class="word-frequency-img" data-band="4" title="Very common">`.
///
/// Always yields a value; a missing or malformed marker becomes band 0 with
/// the reason as label.
pub fn extract_frequency(html: &str) -> Frequency {
    let doc = Html::parse_document(html);
    let Ok(selector) = Selector::parse(".word-frequency-img") else {
        return Frequency::unknown("invalid frequency selector");
    };
    let Some(marker) = doc.select(&selector).next() else {
        return Frequency::unknown(NOT_FOUND);
    };
    let Some(raw_band) = marker.value().attr("data-band") else {
        return Frequency::unknown(NOT_FOUND);
    };
    match raw_band.trim().parse::<u32>() {
        Ok(band) => Frequency::new(band, marker.value().attr("title").unwrap_or_default().trim()),
        Err(err) => Frequency::unknown(format!("invalid frequency band '{raw_band}': {err}")),
    }
}

/// Plain-text rendition of the page's main content for display.
///
/// Prefers `<main>`, then `<article>`, then `<body>`, then the whole document.
pub fn readable_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let content_html = ["main", "article", "body"]
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .find_map(|sel| doc.select(&sel).next().map(|node| node.inner_html()))
        .unwrap_or_else(|| doc.root_element().html());
    html2md::parse_html(&content_html).trim().to_string()
}
