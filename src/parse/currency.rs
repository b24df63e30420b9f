// src/parse/currency.rs
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::parse::xml::{descendants, Element};

/// One `<item>` of the table. Every child is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateItem {
    pub base_currency: Option<String>,
    pub target_currency: Option<String>,
    pub target_name: Option<String>,
    pub exchange_rate: Option<String>,
}

impl RateItem {
    fn from_element(el: &Element) -> Self {
        let field = |name: &str| {
            el.child(name)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        };
        Self {
            base_currency: field("baseCurrency"),
            target_currency: field("targetCurrency"),
            target_name: field("targetName"),
            exchange_rate: field("exchangeRate"),
        }
    }
}

/// Every `<item>` in the document, at any depth, in document order.
pub fn parse_items(xml: &str) -> Result<Vec<RateItem>, quick_xml::Error> {
    Ok(descendants(xml, "item")?
        .iter()
        .map(RateItem::from_element)
        .collect())
}

/// Outcome of scanning the table for one target code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLookup {
    /// Rate of the first matching item, rounded to four places.
    Found { rate: Decimal, position: usize },
    NotFound,
}

/// Scan `items` in order and stop at the first viable item whose target code is
/// `target` and whose rate parses.
///
/// Precondition: the feed lists each code at most once, so the first match is
/// the only match. A repeated code is logged, not resolved.
pub fn find_rate(items: &[RateItem], base: &str, target: &str) -> RateLookup {
    for (position, item) in items.iter().enumerate() {
        let Some(code) = item.target_currency.as_deref().map(str::trim) else {
            continue;
        };
        let Some(rate_text) = item.exchange_rate.as_deref() else {
            continue;
        };

        tracing::debug!(
            code,
            name = item.target_name.as_deref().unwrap_or("Unknown"),
            "currency item"
        );

        if code != target {
            continue;
        }

        if let Some(declared) = item.base_currency.as_deref().map(str::trim) {
            if !declared.eq_ignore_ascii_case(base) {
                tracing::warn!(
                    declared,
                    expected = base,
                    code,
                    "item quoted against an unexpected base currency, skipping"
                );
                continue;
            }
        }

        match parse_rate(rate_text) {
            Some(rate) => {
                tracing::info!(code, %rate, "found target rate");
                warn_on_repeats(&items[position + 1..], target);
                return RateLookup::Found {
                    rate: rate.round_dp(4),
                    position,
                };
            }
            None => {
                tracing::warn!(code, rate = rate_text, "unparsable exchange rate, continuing scan");
            }
        }
    }
    RateLookup::NotFound
}

fn parse_rate(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn warn_on_repeats(rest: &[RateItem], target: &str) {
    let repeats = rest
        .iter()
        .filter(|i| i.target_currency.as_deref().map(str::trim) == Some(target))
        .count();
    if repeats > 0 {
        tracing::warn!(
            target_code = target,
            repeats,
            "feed lists the target currency more than once; using the first entry"
        );
    }
}

/// Up to `n` complete items formatted for the "what was available" log line.
pub fn describe_available(items: &[RateItem], n: usize) -> Vec<String> {
    items
        .iter()
        .filter_map(|i| {
            Some(format!(
                "{}: {} (Rate: {})",
                i.target_currency.as_deref()?,
                i.target_name.as_deref()?,
                i.exchange_rate.as_deref()?
            ))
        })
        .take(n)
        .collect()
}
