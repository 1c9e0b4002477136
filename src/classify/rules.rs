//! Threshold Rule Engine
//!
//! Thresholds are medians over whatever population is passed in, and the
//! rule chain is evaluated top to bottom with the first match winning.

use serde::{Deserialize, Serialize};

use super::features::{
    attribute_or, AttributeVector, BETA, DIVIDEND_YIELD, MARKET_CAP, PB_RATIO, PE_RATIO,
    RETURN_ON_ASSETS, REVENUE,
};
use super::ClassifyError;
use crate::models::AttributeMap;

// ============================================================================
// MULTIPLIERS
// ============================================================================

/// Beta above `median * HIGH_VOLATILITY_FACTOR` = High Volatility
pub const HIGH_VOLATILITY_FACTOR: f64 = 1.5;

/// P/E below `median * UNDERVALUED_PE_FACTOR` may be Undervalued
pub const UNDERVALUED_PE_FACTOR: f64 = 0.7;

/// Beta assumed for companies that report none
pub const NEUTRAL_BETA: f64 = 1.0;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Blue Chip")]
    BlueChip,
    #[serde(rename = "High Volatility")]
    HighVolatility,
    #[serde(rename = "Dividend Stock")]
    DividendStock,
    #[serde(rename = "Growth Stock")]
    GrowthStock,
    Undervalued,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::BlueChip,
        Category::HighVolatility,
        Category::DividendStock,
        Category::GrowthStock,
        Category::Undervalued,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BlueChip => "Blue Chip",
            Category::HighVolatility => "High Volatility",
            Category::DividendStock => "Dividend Stock",
            Category::GrowthStock => "Growth Stock",
            Category::Undervalued => "Undervalued",
            Category::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Population medians used as cutoffs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSet {
    pub market_cap: f64,
    pub beta: f64,
    pub dividend_yield: f64,
    pub pe_ratio: f64,
    pub pb_ratio: f64,
    pub return_on_assets: f64,
    /// Median of `revenue[i] / revenue[i - 1]` in population order.
    /// Depends on the order records are given in. None when no finite ratio exists.
    pub revenue_growth: Option<f64>,
}

/// Compute thresholds for exactly this population.
pub fn compute_thresholds(population: &[AttributeVector]) -> Result<ThresholdSet, ClassifyError> {
    if population.is_empty() {
        return Err(ClassifyError::InputError("no companies to compute thresholds from".to_string()));
    }

    let column = |index: usize| -> Vec<f64> {
        population.iter().map(|v| v.get(index)).collect()
    };

    let growth: Vec<f64> = population
        .windows(2)
        .map(|pair| pair[1].get(REVENUE) / pair[0].get(REVENUE))
        .filter(|ratio| ratio.is_finite())
        .collect();

    Ok(ThresholdSet {
        market_cap: median(column(MARKET_CAP)).unwrap_or_default(),
        beta: median(column(BETA)).unwrap_or_default(),
        dividend_yield: median(column(DIVIDEND_YIELD)).unwrap_or_default(),
        pe_ratio: median(column(PE_RATIO)).unwrap_or_default(),
        pb_ratio: median(column(PB_RATIO)).unwrap_or_default(),
        return_on_assets: median(column(RETURN_ON_ASSETS)).unwrap_or_default(),
        revenue_growth: median(growth),
    })
}

/// Median, averaging the two middle values for even lengths.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

// ============================================================================
// RULE CHAIN
// ============================================================================

/// Classify one company against population thresholds.
///
/// Absent attributes read as 0, except Beta which reads as NEUTRAL_BETA so a
/// missing figure never looks like an extreme one.
pub fn classify(data: &AttributeMap, thresholds: &ThresholdSet) -> Category {
    let market_cap = attribute_or(data, "MarketCapitalization", 0.0);
    let beta = attribute_or(data, "Beta", NEUTRAL_BETA);
    let dividend_yield = attribute_or(data, "DividendYield", 0.0);
    let pe_ratio = attribute_or(data, "PERatio", 0.0);
    let pb_ratio = attribute_or(data, "PriceToBookRatio", 0.0);
    let return_on_assets = attribute_or(data, "ReturnOnAssetsTTM", 0.0);

    if market_cap > thresholds.market_cap && beta < thresholds.beta {
        return Category::BlueChip;
    }
    if beta > thresholds.beta * HIGH_VOLATILITY_FACTOR {
        return Category::HighVolatility;
    }
    if dividend_yield > thresholds.dividend_yield {
        return Category::DividendStock;
    }
    if pe_ratio > thresholds.pe_ratio && pb_ratio > thresholds.pb_ratio {
        return Category::GrowthStock;
    }
    if pe_ratio < thresholds.pe_ratio * UNDERVALUED_PE_FACTOR && return_on_assets > thresholds.return_on_assets {
        return Category::Undervalued;
    }

    Category::Other
}
