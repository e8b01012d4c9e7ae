//! Variant extraction: structured variants from embedded JSON when present,
//! otherwise a cross-product of DOM option groups. Capped at
//! [`MAX_VARIANTS`] to keep mis-extracted option sets from exploding.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use shelfwatch_core::{StockStatus, VariantShell, MAX_VARIANTS};

use crate::money;
use crate::strategy::ExtractionContext;
use crate::text::collapse_whitespace;

/// Option names assumed for Shopify `option1..3` when the product carries
/// no `options` array.
const DEFAULT_OPTION_NAMES: [&str; 3] = ["size", "color", "style"];

/// DOM option groups must look like one of these to participate.
const OPTION_WORDS: &[&str] = &[
    "size", "color", "colour", "style", "material", "finish", "flavor", "flavour", "option",
    "variant",
];

/// Placeholder option values that are not real choices.
const PLACEHOLDER_VALUES: &[&str] = &["choose", "select", "pick", "default title"];

/// Run variant extraction over the snapshot context.
#[must_use]
pub fn extract_variants(ctx: &ExtractionContext<'_>, notes: &mut Vec<String>) -> Vec<VariantShell> {
    let mut shells = shopify_variants(ctx.json_blobs);
    if !shells.is_empty() {
        notes.push(format!("variants: {} from shopify json", shells.len()));
    }

    if shells.is_empty() {
        shells = json_ld_offer_variants(ctx.json_blobs);
        if !shells.is_empty() {
            notes.push(format!("variants: {} from json-ld offers", shells.len()));
        }
    }

    if shells.is_empty() {
        shells = dom_variants(ctx);
        if !shells.is_empty() {
            notes.push(format!("variants: {} from dom option groups", shells.len()));
        }
    }

    dedup_and_cap(shells)
}

/// Drop duplicate attribute sets (first wins) and enforce the cap.
fn dedup_and_cap(shells: Vec<VariantShell>) -> Vec<VariantShell> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for shell in shells {
        if seen.insert(shell.attributes_key()) {
            out.push(shell);
        }
        if out.len() >= MAX_VARIANTS {
            break;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Shopify product JSON
// ---------------------------------------------------------------------------

fn shopify_variants(blobs: &[Value]) -> Vec<VariantShell> {
    for blob in blobs {
        let product = blob.get("product").unwrap_or(blob);
        let Some(variants) = product.get("variants").and_then(Value::as_array) else {
            continue;
        };
        if variants.is_empty() {
            continue;
        }

        let option_names = shopify_option_names(product);
        let shells: Vec<VariantShell> = variants
            .iter()
            .take(MAX_VARIANTS)
            .filter_map(|v| shopify_variant_shell(v, &option_names))
            .collect();
        if !shells.is_empty() {
            return shells;
        }
    }
    Vec::new()
}

/// Option names from `product.options`, which holds either strings or
/// `{name}` objects; positional defaults otherwise.
fn shopify_option_names(product: &Value) -> Vec<String> {
    let configured: Vec<String> = product
        .get("options")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|o| match o {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(map) => map
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .map(|n| n.to_lowercase())
                .collect()
        })
        .unwrap_or_default();

    if configured.is_empty() {
        DEFAULT_OPTION_NAMES.iter().map(|s| (*s).to_string()).collect()
    } else {
        configured
    }
}

fn shopify_variant_shell(variant: &Value, option_names: &[String]) -> Option<VariantShell> {
    let obj = variant.as_object()?;

    let mut attributes = BTreeMap::new();
    for (position, key) in ["option1", "option2", "option3"].iter().enumerate() {
        let Some(value) = obj.get(*key).and_then(Value::as_str) else {
            continue;
        };
        let value = collapse_whitespace(value);
        if value.is_empty() || value.eq_ignore_ascii_case("default title") {
            continue;
        }
        let name = option_names
            .get(position)
            .cloned()
            .unwrap_or_else(|| format!("option{}", position + 1));
        attributes.insert(name, value);
    }

    let price = obj.get("price").and_then(price_from_value);
    let currency = obj
        .get("currency")
        .or_else(|| obj.get("price_currency"))
        .and_then(Value::as_str)
        .map(str::to_uppercase);
    let available = obj.get("available").and_then(Value::as_bool);
    let stock_status = available.map(|a| {
        if a {
            StockStatus::InStock
        } else {
            StockStatus::OutOfStock
        }
    });
    let sku = obj
        .get("sku")
        .and_then(Value::as_str)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty());

    Some(VariantShell {
        sku,
        attributes,
        price,
        currency,
        stock_status,
        available,
    })
}

fn price_from_value(value: &Value) -> Option<rust_decimal::Decimal> {
    match value {
        Value::String(s) => money::parse_amount(s),
        Value::Number(n) => money::parse_amount(&n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// JSON-LD offers
// ---------------------------------------------------------------------------

/// Multi-offer JSON-LD products: each named offer becomes a shell. A single
/// offer is product-level pricing, not a variant, and is left to the price
/// cascade.
fn json_ld_offer_variants(blobs: &[Value]) -> Vec<VariantShell> {
    for blob in blobs {
        let Some(offers) = blob.get("offers").and_then(Value::as_array) else {
            continue;
        };
        if offers.len() < 2 {
            continue;
        }

        let shells: Vec<VariantShell> = offers
            .iter()
            .take(MAX_VARIANTS)
            .filter_map(|offer| {
                let obj = offer.as_object()?;
                let label = obj
                    .get("name")
                    .or_else(|| obj.get("sku"))
                    .and_then(Value::as_str)
                    .map(collapse_whitespace)
                    .filter(|s| !s.is_empty())?;

                let mut attributes = BTreeMap::new();
                attributes.insert("option".to_string(), label);

                let stock_status = obj
                    .get("availability")
                    .and_then(Value::as_str)
                    .and_then(crate::stock::status_from_text);

                Some(VariantShell {
                    sku: obj
                        .get("sku")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    attributes,
                    price: obj.get("price").and_then(price_from_value),
                    currency: obj
                        .get("priceCurrency")
                        .and_then(Value::as_str)
                        .map(str::to_uppercase),
                    stock_status,
                    available: stock_status.map(StockStatus::is_available),
                })
            })
            .collect();

        if shells.len() >= 2 {
            return shells;
        }
    }
    Vec::new()
}

// ---------------------------------------------------------------------------
// DOM option groups
// ---------------------------------------------------------------------------

/// Cross-product of `<select>` and radio-group options. Prices and
/// availability are unknowable here; ingestion reconciles those fields.
fn dom_variants(ctx: &ExtractionContext<'_>) -> Vec<VariantShell> {
    let mut option_sets: Vec<(String, Vec<String>)> = Vec::new();

    let option_re =
        Regex::new(r"(?is)<option([^>]*)>([^<]*)").expect("valid option regex");
    let value_re =
        Regex::new(r#"(?i)value\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid value regex");

    for select in ctx.dom.by_tag("select") {
        let Some(name) = option_group_name(
            select.attr("name").as_deref(),
            select.attr("id").as_deref(),
            select.attr("class").as_deref(),
        ) else {
            continue;
        };

        let mut values = Vec::new();
        for cap in option_re.captures_iter(select.inner_html()) {
            let attrs = cap.get(1).map_or("", |m| m.as_str());
            let value = value_re
                .captures(attrs)
                .and_then(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| crate::text::strip_tags(cap.get(2).map_or("", |m| m.as_str())));
            let value = collapse_whitespace(&value);
            if is_real_option_value(&value) && !values.contains(&value) {
                values.push(value);
            }
        }
        if !values.is_empty() {
            option_sets.push((name, values));
        }
    }

    // Radio groups, keyed by the input name.
    let mut radio_groups: Vec<(String, Vec<String>)> = Vec::new();
    for input in ctx.dom.by_tag("input") {
        let is_radio = input
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("radio"));
        if !is_radio {
            continue;
        }
        let Some(name) = option_group_name(input.attr("name").as_deref(), None, None) else {
            continue;
        };
        let Some(value) = input.attr("value").map(|v| collapse_whitespace(&v)) else {
            continue;
        };
        if !is_real_option_value(&value) {
            continue;
        }
        match radio_groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            None => radio_groups.push((name, vec![value])),
        }
    }
    option_sets.extend(radio_groups);

    if option_sets.is_empty() {
        return Vec::new();
    }

    cross_product(&option_sets)
        .into_iter()
        .map(|attributes| VariantShell {
            sku: None,
            attributes,
            price: None,
            currency: None,
            stock_status: None,
            available: None,
        })
        .collect()
}

/// A usable option-group name, derived from name/id/class hints. Returns a
/// cleaned lowercase name, preferring the recognized option word.
fn option_group_name(
    name: Option<&str>,
    id: Option<&str>,
    class: Option<&str>,
) -> Option<String> {
    let joined = [name, id, class]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let word = OPTION_WORDS.iter().find(|w| joined.contains(*w))?;
    if *word == "option" || *word == "variant" {
        // Generic wrapper names like "options[Size]": pull the concrete
        // option word when one is present.
        if let Some(inner) = OPTION_WORDS
            .iter()
            .filter(|w| **w != "option" && **w != "variant")
            .find(|w| joined.contains(*w))
        {
            return Some((*inner).to_string());
        }
    }
    Some((*word).to_string())
}

fn is_real_option_value(value: &str) -> bool {
    if value.is_empty() || value.len() > 60 {
        return false;
    }
    let lower = value.to_lowercase();
    !PLACEHOLDER_VALUES.iter().any(|p| lower.starts_with(p))
}

/// Cross-product of option sets into attribute maps, capped while building.
fn cross_product(option_sets: &[(String, Vec<String>)]) -> Vec<BTreeMap<String, String>> {
    let mut maps: Vec<BTreeMap<String, String>> = vec![BTreeMap::new()];

    for (name, values) in option_sets {
        let mut next = Vec::new();
        'outer: for map in &maps {
            for value in values {
                let mut grown = map.clone();
                grown.insert(name.clone(), value.clone());
                next.push(grown);
                if next.len() >= MAX_VARIANTS {
                    break 'outer;
                }
            }
        }
        maps = next;
    }

    maps.retain(|m| !m.is_empty());
    maps
}
