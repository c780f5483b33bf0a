//! Dealer-card extraction from rendered listing pages.
//!
//! All selectors mirror the markup of the dealer directory: ZIP search pages
//! render `div.sds-container.dealer-card` cards, state listing pages render
//! `.dealer-card-content` cards linking to an inventory page.

use crate::domain::model::{DealerRecord, InventoryContact, StateCard};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

static ZIP_CARD: LazyLock<Selector> = LazyLock::new(|| selector("div.sds-container.dealer-card"));
static ZIP_NAME: LazyLock<Selector> = LazyLock::new(|| selector("h2.dealer-heading"));
static ZIP_ADDRESS: LazyLock<Selector> =
    LazyLock::new(|| selector("div.dealer-address a.sds-link--ext"));
static ZIP_PHONES: LazyLock<Selector> =
    LazyLock::new(|| selector("a.phone-number, .desktop-phone-number"));

static STATE_CARD: LazyLock<Selector> = LazyLock::new(|| selector(".dealer-card-content"));
static STATE_NAME: LazyLock<Selector> = LazyLock::new(|| selector(".dealer-heading"));
static STATE_ADDRESS: LazyLock<Selector> = LazyLock::new(|| selector(".dealer-address"));
static STATE_PHONES: LazyLock<Selector> = LazyLock::new(|| selector(".phone-number"));
static INVENTORY_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector("a.inventory-badge-link"));

static CONTACT_CANDIDATES: LazyLock<Selector> = LazyLock::new(|| selector("p, div, span"));
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("static regex must compile")
});

/// 取出元素的可見文字並壓縮空白
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Trimmed, non-empty texts in document order, first occurrence wins.
fn unique_texts(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    let mut texts: Vec<String> = Vec::new();
    for text in scope.select(selector).map(element_text) {
        if !text.is_empty() && !texts.contains(&text) {
            texts.push(text);
        }
    }
    texts
}

/// Parses every dealer card on a ZIP search page.
pub fn parse_zip_page(html: &str) -> Vec<DealerRecord> {
    let document = Html::parse_document(html);

    document
        .select(&ZIP_CARD)
        .map(|card| DealerRecord {
            business_name: first_text(card, &ZIP_NAME),
            phones: unique_texts(card, &ZIP_PHONES),
            address: first_text(card, &ZIP_ADDRESS),
        })
        .collect()
}

/// Parses dealer cards on a state listing page.
pub fn parse_state_page(html: &str) -> Vec<StateCard> {
    let document = Html::parse_document(html);

    document
        .select(&STATE_CARD)
        .map(|card| StateCard {
            business_name: first_text(card, &STATE_NAME),
            address: first_text(card, &STATE_ADDRESS),
            phones: card
                .select(&STATE_PHONES)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect(),
            inventory_href: card
                .select(&INVENTORY_LINK)
                .next()
                .and_then(|link| link.value().attr("href"))
                .map(str::to_string),
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 從經銷商庫存頁找出聯絡人姓氏與第一個 email
pub fn parse_inventory_page(html: &str) -> InventoryContact {
    let document = Html::parse_document(html);

    let mut contact_last_name = None;
    for element in document.select(&CONTACT_CANDIDATES) {
        let text = element_text(element).to_lowercase();
        if !text.contains("contact") || text.split_whitespace().count() < 2 {
            continue;
        }
        let after_contact = text.rsplit("contact").next().unwrap_or_default();
        if let Some(last) = after_contact.split_whitespace().last() {
            contact_last_name = Some(capitalize(last));
            break;
        }
    }

    let page_text = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let email = EMAIL_PATTERN
        .find(&page_text)
        .map(|m| m.as_str().to_string());

    InventoryContact {
        contact_last_name,
        email,
    }
}
