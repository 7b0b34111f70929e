//! Price extraction from notification banners
//!
//! Banners look like
//! `"BUY 0.01 EURUSD @ 1.08512 | Stop Loss: 1.08000 | Take Profit: 1,090.5"`.
//! The labelled numbers are pulled out so they can be compared with a
//! tolerance, and re-rendered so two banners that agree within tolerance
//! also agree as text.

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde_json::{json, Value};
use std::sync::OnceLock;
use tradecheck_common::numeric::{decimal_places, format_grouped, parse_tolerant_number};

/// Fields extracted from banners
pub const PRICE_FIELDS: &[&str] = &["stop_loss", "take_profit", "price", "entry_price"];

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:\b(?P<label>stop[\s_]*loss|take[\s_]*profit|entry[\s_]*price|price|sl|tp)\b\s*[:=]?\s*|@\s*)(?P<num>[+-]?\d+(?:,\d{3})*(?:\.\d+)?)",
        )
        .expect("price pattern is valid")
    })
}

fn field_for(caps: &Captures<'_>) -> &'static str {
    let Some(label) = caps.name("label") else {
        return "price";
    };
    let key: String = label
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_lowercase();
    match key.as_str() {
        "stoploss" | "sl" => "stop_loss",
        "takeprofit" | "tp" => "take_profit",
        "entryprice" => "entry_price",
        _ => "price",
    }
}

/// Extract labelled prices. The first occurrence of each field wins.
pub fn parse_prices(text: &str) -> IndexMap<String, Value> {
    let mut prices = IndexMap::new();
    for caps in price_regex().captures_iter(text) {
        let field = field_for(&caps);
        if prices.contains_key(field) {
            continue;
        }
        if let Ok(number) = parse_tolerant_number(&caps["num"]) {
            prices.insert(field.to_string(), json!(number));
        }
    }
    prices
}

/// Largest number of decimals among the banner's labelled prices
pub fn price_decimals(text: &str) -> Option<usize> {
    price_regex()
        .captures_iter(text)
        .map(|caps| decimal_places(&caps["num"]))
        .max()
}

/// Fields whose number is written with `,` thousands grouping in `text`
pub fn grouped_fields(text: &str) -> Vec<&'static str> {
    let mut fields = Vec::new();
    for caps in price_regex().captures_iter(text) {
        let field = field_for(&caps);
        if caps["num"].contains(',') && !fields.contains(&field) {
            fields.push(field);
        }
    }
    fields
}

/// Rewrite each labelled price in `text` with the value from `prices`,
/// formatted with `decimals` places. Fields listed in `grouped` get
/// thousands commas whatever the original number looked like.
pub fn render_prices(text: &str, prices: &IndexMap<String, Value>, decimals: usize, grouped: &[&str]) -> String {
    price_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let original = &caps["num"];
            let field = field_for(caps);
            let Some(value) = prices.get(field).and_then(Value::as_f64) else {
                return whole.to_string();
            };

            let formatted = if grouped.contains(&field) {
                format_grouped(value, decimals)
            } else {
                format!("{:.*}", decimals, value)
            };
            let prefix_len = whole.len() - original.len();
            format!("{}{}", &whole[..prefix_len], formatted)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANNER: &str = "BUY 0.01 EURUSD @ 1.08512 | Stop Loss: 1.08000 | Take Profit: 1,090.5";

    #[test]
    fn test_parse_labelled_prices() {
        let prices = parse_prices(BANNER);
        assert_eq!(prices["price"], json!(1.08512));
        assert_eq!(prices["stop_loss"], json!(1.08));
        assert_eq!(prices["take_profit"], json!(1090.5));
        assert!(!prices.contains_key("entry_price"));
    }

    #[test]
    fn test_entry_price_is_not_price() {
        let prices = parse_prices("Position closed. Entry Price: 2,345.10, Price: 2,350.00, SL: 2300");
        assert_eq!(prices["entry_price"], json!(2345.1));
        assert_eq!(prices["price"], json!(2350.0));
        assert_eq!(prices["stop_loss"], json!(2300.0));
    }

    #[test]
    fn test_no_prices() {
        assert!(parse_prices("Order cancelled").is_empty());
        assert_eq!(price_decimals("Order cancelled"), None);
    }

    #[test]
    fn test_price_decimals() {
        assert_eq!(price_decimals(BANNER), Some(5));
    }

    #[test]
    fn test_render_prices() {
        let mut prices = IndexMap::new();
        prices.insert("price".to_string(), json!(1.085));
        prices.insert("take_profit".to_string(), json!(1090.25));
        let rendered = render_prices(BANNER, &prices, 3, &grouped_fields(BANNER));
        assert_eq!(
            rendered,
            "BUY 0.01 EURUSD @ 1.085 | Stop Loss: 1.08000 | Take Profit: 1,090.250"
        );
    }

    #[test]
    fn test_grouping_follows_the_given_fields() {
        assert_eq!(grouped_fields(BANNER), vec!["take_profit"]);
        assert!(grouped_fields("Take Profit: 1090.50").is_empty());

        let mut prices = IndexMap::new();
        prices.insert("take_profit".to_string(), json!(1090.5));
        assert_eq!(
            render_prices("Take Profit: 1090.50", &prices, 1, &["take_profit"]),
            "Take Profit: 1,090.5"
        );
        assert_eq!(render_prices("Take Profit: 1,090.50", &prices, 1, &[]), "Take Profit: 1090.5");
    }
}
