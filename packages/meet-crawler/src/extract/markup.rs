//! Markup parsing for the three index layouts.
//!
//! `scraper::Html` is not `Send`; everything here is synchronous and never
//! held across an await point.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use crate::error::{ExtractError, ExtractResult};
use crate::types::{is_final_results_reference, LinkPair};

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("anchor selector");
    static ref INDEX_COLUMN: Selector =
        Selector::parse("td#idx_colonna1").expect("index column selector");
    static ref INDEX_LINK: Selector = Selector::parse("a.idx_link[href]").expect("index link selector");
}

/// Visible text of an element with runs of whitespace collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a pair from an anchor, truncating first and filtering after.
fn pair_from_anchor(anchor: ElementRef<'_>, drop_fragments: bool) -> Option<LinkPair> {
    let href = anchor.value().attr("href")?.trim();
    let pair = LinkPair::new(&visible_text(anchor), href);

    if pair.reference().is_empty() || pair.reference().starts_with("http") {
        return None;
    }
    if drop_fragments && pair.reference().starts_with('#') {
        return None;
    }
    Some(pair)
}

/// New generation: every anchor on the index page.
pub fn new_index_pairs(url: &str, html: &str) -> ExtractResult<Vec<LinkPair>> {
    let document = Html::parse_document(html);
    let anchors: Vec<_> = document.select(&ANCHOR).collect();

    if anchors.is_empty() {
        return Err(ExtractError::MissingElement {
            url: url.to_string(),
            element: "anchor",
        });
    }

    Ok(anchors
        .into_iter()
        .filter_map(|a| pair_from_anchor(a, true))
        .collect())
}

/// Old generation: the first link inside each `td#idx_colonna1` cell.
pub fn old_index_pairs(url: &str, html: &str) -> ExtractResult<Vec<LinkPair>> {
    let document = Html::parse_document(html);
    let cells: Vec<_> = document.select(&INDEX_COLUMN).collect();

    if cells.is_empty() {
        return Err(ExtractError::MissingElement {
            url: url.to_string(),
            element: "index column",
        });
    }

    Ok(cells
        .into_iter()
        .filter_map(|cell| cell.select(&ANCHOR).next())
        .filter_map(|a| pair_from_anchor(a, false))
        .collect())
}

/// Ancient generation: `a.idx_link` anchors on the landing page.
pub fn ancient_index_pairs(url: &str, html: &str) -> ExtractResult<Vec<LinkPair>> {
    let document = Html::parse_document(html);
    let anchors: Vec<_> = document.select(&INDEX_LINK).collect();

    if anchors.is_empty() {
        return Err(ExtractError::MissingElement {
            url: url.to_string(),
            element: "index link",
        });
    }

    Ok(anchors
        .into_iter()
        .filter_map(|a| pair_from_anchor(a, false))
        .collect())
}

/// Whether an ancient landing page already links final results.
pub fn landing_has_results(html: &str) -> bool {
    let document = Html::parse_document(html);
    let found = document
        .select(&INDEX_LINK)
        .filter_map(|a| a.value().attr("href"))
        .any(|href| is_final_results_reference(href.trim()));
    found
}
