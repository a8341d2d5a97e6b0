//! Structural catalog validation
//!
//! Checks a raw catalog payload against the minimal inbound shape before
//! anything touches the store. Validation never mutates its input and never
//! fails itself; it returns every violation found so an admin reviewing a
//! rejected upload sees the complete list, not just the first defect.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::domain::catalog::coerce_price;

/// Outcome of validating one catalog payload.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.valid {
            write!(f, "valid")
        } else {
            write!(f, "{}", self.errors.join("; "))
        }
    }
}

/// Validates a raw catalog payload, collecting all violations.
pub fn validate_catalog(payload: &Value) -> ValidationReport {
    let mut errors = Vec::new();

    let Some(root) = payload.as_object() else {
        errors.push("catalog: payload must be a JSON object".to_string());
        return ValidationReport::from_errors(errors);
    };

    check_store_info(root.get("store_info"), &mut errors);
    check_products(root.get("products"), &mut errors);

    ValidationReport::from_errors(errors)
}

fn check_store_info(store_info: Option<&Value>, errors: &mut Vec<String>) {
    let Some(store_info) = store_info else {
        errors.push("catalog: missing required field 'store_info'".to_string());
        return;
    };
    let Some(store) = store_info.as_object() else {
        errors.push("catalog: 'store_info' must be an object".to_string());
        return;
    };

    let name = store.get("name").and_then(Value::as_str).unwrap_or("");
    if name.trim().is_empty() {
        errors.push("store_info: missing required field 'name'".to_string());
    }

    match store.get("website_url").and_then(Value::as_str) {
        None => errors.push("store_info: missing required field 'website_url'".to_string()),
        Some(raw) => {
            if !is_reachable_looking_url(raw) {
                errors.push(format!(
                    "store_info: website_url '{raw}' is not a reachable-looking http(s) URL"
                ));
            }
        }
    }
}

fn check_products(products: Option<&Value>, errors: &mut Vec<String>) {
    let Some(products) = products else {
        errors.push("catalog: missing required field 'products'".to_string());
        return;
    };
    let Some(items) = products.as_array() else {
        errors.push("catalog: 'products' must be an array".to_string());
        return;
    };

    for (index, item) in items.iter().enumerate() {
        let Some(entry) = item.as_object() else {
            errors.push(format!("products[{index}]: entry must be an object"));
            continue;
        };

        let name = entry.get("name").and_then(Value::as_str).unwrap_or("");
        if name.trim().is_empty() {
            errors.push(format!("products[{index}]: missing required field 'name'"));
        }

        match entry.get("price") {
            None | Some(Value::Null) => {
                errors.push(format!("products[{index}]: missing required field 'price'"));
            }
            Some(value) => {
                if coerce_price(value).is_none() {
                    errors.push(format!(
                        "products[{index}]: price {value} is not a usable number"
                    ));
                }
            }
        }

        let url = entry.get("url").and_then(Value::as_str).unwrap_or("");
        if url.trim().is_empty() {
            errors.push(format!("products[{index}]: missing required field 'url'"));
        }
    }
}

fn is_reachable_looking_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_catalog() -> Value {
        json!({
            "store_info": { "name": "Nord Outfitters", "website_url": "https://nord.example.com" },
            "products": [
                { "name": "Fjord Parka", "price": 249.9, "url": "https://nord.example.com/p/1" },
                { "name": "Trail Tee", "price": "29.00", "url": "https://nord.example.com/p/2" }
            ]
        })
    }

    #[test]
    fn accepts_a_well_formed_catalog() {
        let report = validate_catalog(&valid_catalog());
        assert!(report.valid, "unexpected errors: {:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn an_empty_product_list_is_structurally_valid() {
        let payload = json!({
            "store_info": { "name": "Nord Outfitters", "website_url": "https://nord.example.com" },
            "products": []
        });
        assert!(validate_catalog(&payload).valid);
    }

    #[test]
    fn reports_every_violation_not_just_the_first() {
        // Missing website_url plus two products without a price: the report
        // must carry one message per defect, with distinct product indexes.
        let payload = json!({
            "store_info": { "name": "Nord Outfitters" },
            "products": [
                { "name": "Fjord Parka", "url": "https://nord.example.com/p/1" },
                { "name": "Trail Tee", "price": 29.0, "url": "https://nord.example.com/p/2" },
                { "name": "Summit Cap", "url": "https://nord.example.com/p/3" }
            ]
        });

        let report = validate_catalog(&payload);
        assert!(!report.valid);

        let price_errors: Vec<&String> = report
            .errors
            .iter()
            .filter(|e| e.contains("'price'"))
            .collect();
        assert_eq!(price_errors.len(), 2);
        assert_ne!(price_errors[0], price_errors[1]);

        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("website_url")),
            "missing website_url error in {:?}",
            report.errors
        );
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn rejects_unusable_urls_and_prices() {
        let payload = json!({
            "store_info": { "name": "Nord Outfitters", "website_url": "not a url" },
            "products": [
                { "name": "Fjord Parka", "price": "call us", "url": "https://nord.example.com/p/1" }
            ]
        });

        let report = validate_catalog(&payload);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("reachable-looking"));
        assert!(report.errors[1].contains("not a usable number"));
    }

    #[test]
    fn rejects_missing_top_level_fields() {
        let report = validate_catalog(&json!({}));
        assert_eq!(report.errors.len(), 2);

        let report = validate_catalog(&json!([]));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("must be a JSON object"));
    }

    #[test]
    fn validation_does_not_mutate_input() {
        let payload = valid_catalog();
        let before = payload.clone();
        let _ = validate_catalog(&payload);
        assert_eq!(payload, before);
    }
}
