//! Domain models for DPGF computation.
//!
//! Input elements carry their numeric fields as decimal text, exactly as the
//! chiffrage layer stores them. Everything derived from them uses `Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Lot used when an element carries no lot number
pub const DEFAULT_LOT_NUMBER: u32 = 1;

/// Priced element from the chiffrage of an offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpgfElement {
    pub id: String,
    /// Sort order within its category; falls back to the input index
    pub position: Option<u32>,
    pub lot_number: Option<u32>,
    pub category: String,
    pub subcategory: Option<String>,
    pub designation: String,
    pub unit: String,
    pub quantity: String,
    pub unit_price: String,
    pub coefficient: Option<String>,
    pub margin_percentage: Option<String>,
    pub is_optional: bool,
    pub supplier_ref: Option<String>,
    pub notes: Option<String>,
}

/// Read a JSON string or number as its source text.
///
/// Numbers keep their literal digits (serde_json `arbitrary_precision`).
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or a number, got {}",
            other
        ))),
    }
}

/// Lot registered on the tender (AO), used for lot-name resolution
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredLot {
    /// "2", "Lot 2" or a plain JSON number
    #[serde(deserialize_with = "string_or_number")]
    pub numero: String,
    pub designation: String,
}

impl RegisteredLot {
    /// Lot number encoded in `numero` ("3", " 03 ", "Lot 3")
    pub fn number(&self) -> Option<u32> {
        let trimmed = self.numero.trim();
        let digits = match trimmed.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("lot") => trimmed[3..].trim_start(),
            _ => trimmed,
        };
        digits.parse().ok()
    }
}

/// Offer the DPGF is generated for
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferContext {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Tender (AO) the offer answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AoContext {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Fully computed line of the bill of quantities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedLine {
    pub id: String,
    pub position: u32,
    pub lot_number: u32,
    pub category: String,
    pub subcategory: Option<String>,
    pub designation: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub coefficient: Decimal,
    pub margin_percentage: Decimal,
    /// quantity × unit_price × coefficient
    pub base_cost: Decimal,
    /// base_cost × margin_percentage / 100
    pub margin_amount: Decimal,
    /// unit_price × coefficient × (1 + margin_percentage / 100)
    pub sell_unit_price_ht: Decimal,
    /// quantity × sell_unit_price_ht
    pub line_total_ht: Decimal,
    pub is_optional: bool,
    pub supplier_ref: Option<String>,
    pub notes: Option<String>,
}

/// Lines of one category inside a lot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub category: String,
    pub category_label: String,
    pub items: Vec<ComputedLine>,
    pub subtotal_ht: Decimal,
}

/// Lot with its categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotGroup {
    pub lot_number: u32,
    pub lot_name: String,
    pub categories: Vec<CategoryGroup>,
    pub subtotal_ht: Decimal,
}

/// Grand totals of the DPGF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpgfTotals {
    pub total_ht: Decimal,
    pub tva_percentage: Decimal,
    pub total_tva: Decimal,
    pub total_ttc: Decimal,
    pub total_margin_amount: Decimal,
    pub total_margin_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpgfMetadata {
    pub offer_id: Option<Uuid>,
    pub offer_reference: Option<String>,
    pub client_name: Option<String>,
    pub location: Option<String>,
    pub ao_id: Option<Uuid>,
    pub ao_reference: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub item_count: usize,
    pub lot_count: usize,
    pub includes_optional: bool,
    pub version: String,
}

/// Complete DPGF, still decimal-typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpgfData {
    pub lots: Vec<LotGroup>,
    pub totals: DpgfTotals,
    pub metadata: DpgfMetadata,
}
