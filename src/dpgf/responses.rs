//! Serialized DPGF: the only representation that crosses a process or
//! storage boundary.
//!
//! Every decimal becomes a fixed-scale string, rounded half up.

use std::str::FromStr;

use chrono::SecondsFormat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calculators::round_half_up;
use super::models::{CategoryGroup, ComputedLine, DpgfData, DpgfMetadata, DpgfTotals, LotGroup};

/// Decimal places per kind of field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializationPrecision {
    pub currency: u32,
    pub quantity: u32,
    pub coefficient: u32,
    pub margin_percentage: u32,
    pub tva_percentage: u32,
    pub total_margin_percentage: u32,
}

impl Default for SerializationPrecision {
    fn default() -> Self {
        Self {
            currency: 2,
            quantity: 3,
            coefficient: 2,
            margin_percentage: 1,
            tva_percentage: 1,
            total_margin_percentage: 2,
        }
    }
}

/// Format with exactly `places` decimals ("1200" -> "1200.00").
pub fn format_fixed(value: Decimal, places: u32) -> String {
    let mut rounded = round_half_up(value, places);
    rounded.rescale(places);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}

/// Read back a serialized decimal string.
pub fn parse_fixed(text: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(text.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedLine {
    pub id: String,
    pub position: u32,
    pub lot_number: u32,
    pub category: String,
    pub subcategory: Option<String>,
    pub designation: String,
    pub unit: String,
    pub quantity: String,
    pub unit_price: String,
    pub coefficient: String,
    pub margin_percentage: String,
    pub base_cost: String,
    pub margin_amount: String,
    #[serde(rename = "sellUnitPriceHT")]
    pub sell_unit_price_ht: String,
    #[serde(rename = "lineTotalHT")]
    pub line_total_ht: String,
    pub is_optional: bool,
    pub supplier_ref: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCategory {
    pub category: String,
    pub category_label: String,
    pub items: Vec<SerializedLine>,
    #[serde(rename = "subtotalHT")]
    pub subtotal_ht: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedLot {
    pub lot_number: u32,
    pub lot_name: String,
    pub categories: Vec<SerializedCategory>,
    #[serde(rename = "subtotalHT")]
    pub subtotal_ht: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedTotals {
    #[serde(rename = "totalHT")]
    pub total_ht: String,
    pub tva_percentage: String,
    #[serde(rename = "totalTVA")]
    pub total_tva: String,
    #[serde(rename = "totalTTC")]
    pub total_ttc: String,
    pub total_margin_amount: String,
    pub total_margin_percentage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedMetadata {
    pub offer_id: Option<Uuid>,
    pub offer_reference: Option<String>,
    pub client_name: Option<String>,
    pub location: Option<String>,
    pub ao_id: Option<Uuid>,
    pub ao_reference: Option<String>,
    /// ISO-8601, UTC
    pub generated_at: String,
    pub item_count: usize,
    pub lot_count: usize,
    pub includes_optional: bool,
    pub version: String,
}

/// Storage/transport form of a DPGF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedDpgf {
    pub lots: Vec<SerializedLot>,
    pub totals: SerializedTotals,
    pub metadata: SerializedMetadata,
}

fn serialize_line(line: &ComputedLine, precision: &SerializationPrecision) -> SerializedLine {
    SerializedLine {
        id: line.id.clone(),
        position: line.position,
        lot_number: line.lot_number,
        category: line.category.clone(),
        subcategory: line.subcategory.clone(),
        designation: line.designation.clone(),
        unit: line.unit.clone(),
        quantity: format_fixed(line.quantity, precision.quantity),
        unit_price: format_fixed(line.unit_price, precision.currency),
        coefficient: format_fixed(line.coefficient, precision.coefficient),
        margin_percentage: format_fixed(line.margin_percentage, precision.margin_percentage),
        base_cost: format_fixed(line.base_cost, precision.currency),
        margin_amount: format_fixed(line.margin_amount, precision.currency),
        sell_unit_price_ht: format_fixed(line.sell_unit_price_ht, precision.currency),
        line_total_ht: format_fixed(line.line_total_ht, precision.currency),
        is_optional: line.is_optional,
        supplier_ref: line.supplier_ref.clone(),
        notes: line.notes.clone(),
    }
}

fn serialize_category(
    category: &CategoryGroup,
    precision: &SerializationPrecision,
) -> SerializedCategory {
    SerializedCategory {
        category: category.category.clone(),
        category_label: category.category_label.clone(),
        items: category
            .items
            .iter()
            .map(|line| serialize_line(line, precision))
            .collect(),
        subtotal_ht: format_fixed(category.subtotal_ht, precision.currency),
    }
}

fn serialize_lot(lot: &LotGroup, precision: &SerializationPrecision) -> SerializedLot {
    SerializedLot {
        lot_number: lot.lot_number,
        lot_name: lot.lot_name.clone(),
        categories: lot
            .categories
            .iter()
            .map(|category| serialize_category(category, precision))
            .collect(),
        subtotal_ht: format_fixed(lot.subtotal_ht, precision.currency),
    }
}

/// Serialize the totals block on its own.
pub fn serialize_totals(
    totals: &DpgfTotals,
    precision: &SerializationPrecision,
) -> SerializedTotals {
    SerializedTotals {
        total_ht: format_fixed(totals.total_ht, precision.currency),
        tva_percentage: format_fixed(totals.tva_percentage, precision.tva_percentage),
        total_tva: format_fixed(totals.total_tva, precision.currency),
        total_ttc: format_fixed(totals.total_ttc, precision.currency),
        total_margin_amount: format_fixed(totals.total_margin_amount, precision.currency),
        total_margin_percentage: format_fixed(
            totals.total_margin_percentage,
            precision.total_margin_percentage,
        ),
    }
}

fn serialize_metadata(metadata: &DpgfMetadata) -> SerializedMetadata {
    SerializedMetadata {
        offer_id: metadata.offer_id,
        offer_reference: metadata.offer_reference.clone(),
        client_name: metadata.client_name.clone(),
        location: metadata.location.clone(),
        ao_id: metadata.ao_id,
        ao_reference: metadata.ao_reference.clone(),
        generated_at: metadata
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        item_count: metadata.item_count,
        lot_count: metadata.lot_count,
        includes_optional: metadata.includes_optional,
        version: metadata.version.clone(),
    }
}

/// Convert a computed DPGF into its storage/transport form.
pub fn serialize_for_storage(
    data: &DpgfData,
    precision: &SerializationPrecision,
) -> SerializedDpgf {
    SerializedDpgf {
        lots: data
            .lots
            .iter()
            .map(|lot| serialize_lot(lot, precision))
            .collect(),
        totals: serialize_totals(&data.totals, precision),
        metadata: serialize_metadata(&data.metadata),
    }
}

/// Error body returned by the DPGF endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DpgfErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
