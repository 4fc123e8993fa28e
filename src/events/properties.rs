//! Ordered value maps carried by events (`Properties`, `Traits`) and the typed
//! view over the reserved revenue keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Macro to define an ordered string→JSON map newtype.
///
/// Generates: struct, `new()`, builder-style `with()`, lookups with lenient
/// coercion, iteration, and conversions from/to `serde_json::Map`.
macro_rules! define_value_map {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Map<String, Value>);

        impl $name {
            pub fn new() -> Self {
                Self(Map::new())
            }

            /// Builder-style insert.
            pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
                self.0.insert(key.into(), value.into());
                self
            }

            pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
                self.0.insert(key.into(), value.into());
            }

            pub fn get(&self, key: &str) -> Option<&Value> {
                self.0.get(key)
            }

            /// Key presence, whatever the value (`null` included).
            pub fn contains_key(&self, key: &str) -> bool {
                self.0.contains_key(key)
            }

            /// String view of a value; numbers and booleans are stringified.
            pub fn get_string(&self, key: &str) -> Option<String> {
                match self.get(key)? {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                }
            }

            pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
                self.0.iter()
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn as_map(&self) -> &Map<String, Value> {
                &self.0
            }

            pub fn into_map(self) -> Map<String, Value> {
                self.0
            }
        }

        impl From<Map<String, Value>> for $name {
            fn from(map: Map<String, Value>) -> Self {
                Self(map)
            }
        }

        impl From<$name> for Value {
            fn from(map: $name) -> Self {
                Value::Object(map.0)
            }
        }

        impl FromIterator<(String, Value)> for $name {
            fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
                Self(iter.into_iter().collect())
            }
        }
    };
}

define_value_map!(Properties);
define_value_map!(Traits);

impl Traits {
    pub fn name(&self) -> Option<String> {
        self.get_string("name")
    }
}

/// Reserved property keys read by the revenue sub-protocol.
pub mod keys {
    pub const REVENUE: &str = "revenue";
    pub const TOTAL: &str = "total";
    pub const PRICE: &str = "price";
    pub const QUANTITY: &str = "quantity";
    pub const PRODUCT_ID: &str = "productId";
    pub const REVENUE_TYPE: &str = "revenueType";
    pub const RECEIPT: &str = "receipt";
    pub const RECEIPT_SIGNATURE: &str = "receiptSignature";
}

/// Amount reported when `revenue`/`total` is present but unreadable.
pub const UNKNOWN_AMOUNT: f64 = -1.0;

/// Typed view over the reserved revenue keys of a [`Properties`] bag.
///
/// `price` and `quantity` are `Some` only when they hold a readable number;
/// unreadable values fall back to the caller's defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueFields {
    /// `revenue` when present, else `total`.
    pub amount: f64,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub product_id: Option<String>,
    pub revenue_type: Option<String>,
    pub receipt: Option<String>,
    pub receipt_signature: Option<String>,
}

impl Properties {
    /// Extract the revenue fields.
    ///
    /// `None` when neither `revenue` nor `total` is present. Presence is by
    /// key, so zero, negative and `null` amounts all count. A present amount
    /// that is not numeric becomes [`UNKNOWN_AMOUNT`].
    pub fn revenue_fields(&self) -> Option<RevenueFields> {
        let amount_key = if self.contains_key(keys::REVENUE) {
            keys::REVENUE
        } else if self.contains_key(keys::TOTAL) {
            keys::TOTAL
        } else {
            return None;
        };

        Some(RevenueFields {
            amount: self.number(amount_key).unwrap_or(UNKNOWN_AMOUNT),
            price: self.number(keys::PRICE),
            quantity: self.integer(keys::QUANTITY),
            product_id: self.get_string(keys::PRODUCT_ID),
            revenue_type: self.get_string(keys::REVENUE_TYPE),
            receipt: self.get_string(keys::RECEIPT),
            receipt_signature: self.get_string(keys::RECEIPT_SIGNATURE),
        })
    }

    /// Numeric view of a value; numeric strings are parsed. Anything else
    /// other than `null` is logged and read as absent.
    fn number(&self, key: &str) -> Option<f64> {
        let value = self.get(key)?;
        let number = match value {
            Value::Null => return None,
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if number.is_none() {
            tracing::warn!(key, value = %value, "ignoring non-numeric revenue field");
        }
        number
    }

    fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) if n.is_i64() => n.as_i64(),
            // Fractional quantities truncate toward zero.
            _ => self.number(key).map(|f| f.trunc() as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn test_insertion_order_preserved() {
        let props = Properties::new().with("z", 1).with("a", 2).with("m", 3);
        let keys: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_no_revenue_keys() {
        let props = Properties::new().with("price", 2.0).with("quantity", 10);
        assert_eq!(props.revenue_fields(), None);
    }

    #[test]
    fn test_revenue_wins_over_total() {
        let props = Properties::new().with("total", 15).with("revenue", 20);
        assert_eq!(props.revenue_fields().unwrap().amount, 20.0);
    }

    #[test]
    fn test_zero_and_negative_revenue_are_present() {
        let zero = Properties::new().with("revenue", 0);
        assert_eq!(zero.revenue_fields().unwrap().amount, 0.0);

        let refund = Properties::new().with("total", -12.5);
        assert_eq!(refund.revenue_fields().unwrap().amount, -12.5);
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let props = Properties::new()
            .with("revenue", "19.99")
            .with("quantity", "3")
            .with("productId", 42);
        let fields = props.revenue_fields().unwrap();
        assert_eq!(fields.amount, 19.99);
        assert_eq!(fields.quantity, Some(3));
        assert_eq!(fields.product_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_fractional_quantity_truncates() {
        let props = Properties::new().with("revenue", 1).with("quantity", 2.9);
        assert_eq!(props.revenue_fields().unwrap().quantity, Some(2));
    }

    #[test]
    #[traced_test]
    fn test_unreadable_fields_fall_back() {
        let props = Properties::new().with("revenue", json!({"amount": 1}));
        assert_eq!(props.revenue_fields().unwrap().amount, UNKNOWN_AMOUNT);

        let props = Properties::new()
            .with("revenue", 5)
            .with("price", "cheap")
            .with("quantity", "ten");
        let fields = props.revenue_fields().unwrap();
        assert_eq!(fields.amount, 5.0);
        assert_eq!(fields.price, None);
        assert_eq!(fields.quantity, None);
        assert!(logs_contain("ignoring non-numeric revenue field"));
    }

    #[test]
    fn test_null_amount_is_present() {
        let props = Properties::new().with("revenue", Value::Null).with("total", 7);
        assert!(props.contains_key("revenue"));
        assert_eq!(props.revenue_fields().unwrap().amount, UNKNOWN_AMOUNT);

        let props = Properties::new().with("total", Value::Null);
        assert_eq!(props.revenue_fields().unwrap().amount, UNKNOWN_AMOUNT);
    }

    #[test]
    fn test_traits_name() {
        let traits = Traits::new().with("name", "Segment");
        assert_eq!(traits.name().as_deref(), Some("Segment"));
        assert_eq!(Traits::new().name(), None);
    }
}
