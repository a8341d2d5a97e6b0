//! Inbound merchant catalog payload
//!
//! Raw catalogs arrive as JSON with merchant-specific looseness: prices come
//! as numbers or strings with currency noise, variant lists hide under
//! `variants` or `prices`, some feeds only send a flat `sizes` list. This
//! module owns the tolerant decode into a typed catalog; the validator runs
//! on the raw JSON value first, so required fields are present by the time a
//! payload is deserialized here.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A merchant catalog after structural validation.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub store_info: StoreInfo,
    #[serde(default)]
    pub products: Vec<CatalogItem>,
}

impl Catalog {
    /// Decodes a validated raw payload into the typed catalog.
    pub fn from_value(payload: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload.clone())
    }
}

/// The merchant's own description of itself, carried in every catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreInfo {
    pub name: String,
    pub website_url: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One listing in a merchant catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    #[serde(default, deserialize_with = "de_price")]
    pub price: Option<f64>,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "de_price")]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub stock_status: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Explicit size/color/price combinations; some feeds call this `prices`.
    #[serde(default, alias = "prices")]
    pub variants: Vec<CatalogVariant>,
    /// Flat size list used by feeds without per-variant pricing.
    #[serde(default)]
    pub sizes: Vec<String>,
}

/// One size/color/price combination attached to a listing. Fields absent on
/// the variant fall back to the item-level values.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogVariant {
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "de_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub stock_status: Option<String>,
}

/// Coerces a raw price value into a number.
///
/// Accepts JSON numbers and strings with currency symbols or thousands
/// separators ("$1,299.00"). Anything else is unusable.
pub fn coerce_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|p| p.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
        }
        _ => None,
    }
}

fn de_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(coerce_price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_numeric_and_string_prices() {
        assert_eq!(coerce_price(&json!(19.99)), Some(19.99));
        assert_eq!(coerce_price(&json!("19.99")), Some(19.99));
        assert_eq!(coerce_price(&json!("$1,299.00")), Some(1299.0));
        assert_eq!(coerce_price(&json!("  24.50 EUR ")), Some(24.50));
        assert_eq!(coerce_price(&json!("sold out")), None);
        assert_eq!(coerce_price(&json!(null)), None);
        assert_eq!(coerce_price(&json!([19.99])), None);
    }

    #[test]
    fn decodes_variant_alias_and_flat_sizes() {
        let payload = json!({
            "store_info": { "name": "Nord Outfitters", "website_url": "https://nord.example.com" },
            "products": [
                {
                    "name": "Fjord Parka",
                    "price": "249.90",
                    "url": "https://nord.example.com/p/fjord-parka",
                    "prices": [
                        { "size": "M", "color": "Navy", "price": 249.90 },
                        { "size": "L", "price": "259.90", "stock_status": "sold out" }
                    ]
                },
                {
                    "name": "Trail Tee",
                    "price": 29.0,
                    "url": "https://nord.example.com/p/trail-tee",
                    "sizes": ["S", "M", "L"]
                }
            ]
        });

        let catalog = Catalog::from_value(&payload).unwrap();
        assert_eq!(catalog.store_info.name, "Nord Outfitters");
        assert_eq!(catalog.products.len(), 2);
        // `prices` is an alias for `variants`
        assert_eq!(catalog.products[0].variants.len(), 2);
        assert_eq!(catalog.products[0].variants[1].price, Some(259.90));
        assert_eq!(catalog.products[1].sizes, vec!["S", "M", "L"]);
        assert_eq!(catalog.products[1].price, Some(29.0));
    }
}
