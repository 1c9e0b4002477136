//! Attribute Layout - numeric projection of provider payloads
//!
//! The partition model was fitted on vectors in exactly this order.
//! Reordering or renaming an entry invalidates every stored artifact.

use serde_json::Value;

use crate::models::AttributeMap;

/// Attribute names in the order they appear in the vector
pub const FEATURE_LAYOUT: &[&str] = &[
    "MarketCapitalization",  // 0
    "RevenueTTM",            // 1
    "EBITDA",                // 2
    "Beta",                  // 3
    "DividendYield",         // 4
    "ReturnOnAssetsTTM",     // 5
    "ReturnOnEquityTTM",     // 6
    "PERatio",               // 7
    "PEGRatio",              // 8
    "PriceToSalesRatioTTM",  // 9
    "PriceToBookRatio",      // 10
    "EVToRevenue",           // 11
    "EVToEBITDA",            // 12
];

/// Must match FEATURE_LAYOUT.len()
pub const FEATURE_COUNT: usize = 13;

pub const MARKET_CAP: usize = 0;
pub const REVENUE: usize = 1;
pub const BETA: usize = 3;
pub const DIVIDEND_YIELD: usize = 4;
pub const RETURN_ON_ASSETS: usize = 5;
pub const PE_RATIO: usize = 7;
pub const PB_RATIO: usize = 10;

/// Read a provider value as a number.
///
/// The provider sends most figures as strings and uses `"None"` or `"-"` for
/// missing data, so only finite numbers and numeric strings count.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Numeric attribute `name`, or `default` when absent or not a number.
pub fn attribute_or(data: &AttributeMap, name: &str, default: f64) -> f64 {
    data.get(name).and_then(numeric_value).unwrap_or(default)
}

/// Fixed-order numeric projection of an attribute map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeVector {
    pub values: [f64; FEATURE_COUNT],
}

impl AttributeVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Project `data` onto FEATURE_LAYOUT, coercing unusable values to zero.
    pub fn from_attributes(data: &AttributeMap) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_LAYOUT) {
            *slot = attribute_or(data, name, 0.0);
        }
        Self { values }
    }

    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// True when no attribute carried a usable non-zero number.
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}
