//! Request DTOs for DPGF API endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::calculators::parse_decimal;
use super::models::{string_or_number, AoContext, DpgfElement, OfferContext, RegisteredLot};
use super::services::{ComputeOptions, DpgfError};

/// Decimal kept as text; accepts a JSON string or a JSON number.
///
/// Numbers keep their literal digits, they never pass through `f64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalText(pub String);

impl<'de> Deserialize<'de> for DecimalText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(DecimalText)
    }
}

/// A priced element in the request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRequest {
    pub id: String,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub lot_number: Option<u32>,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub designation: String,
    #[serde(default)]
    pub unit: String,
    pub quantity: DecimalText,
    pub unit_price: DecimalText,
    #[serde(default)]
    pub coefficient: Option<DecimalText>,
    #[serde(default)]
    pub margin_percentage: Option<DecimalText>,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub supplier_ref: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<ElementRequest> for DpgfElement {
    fn from(req: ElementRequest) -> Self {
        DpgfElement {
            id: req.id,
            position: req.position,
            lot_number: req.lot_number,
            category: req.category,
            subcategory: req.subcategory,
            designation: req.designation,
            unit: req.unit,
            quantity: req.quantity.0,
            unit_price: req.unit_price.0,
            coefficient: req.coefficient.map(|c| c.0),
            margin_percentage: req.margin_percentage.map(|m| m.0),
            is_optional: req.is_optional,
            supplier_ref: req.supplier_ref,
            notes: req.notes,
        }
    }
}

/// Request to compute a DPGF (also used for the totals-only endpoint)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeDpgfRequest {
    pub elements: Vec<ElementRequest>,
    #[serde(default)]
    pub include_optional: bool,
    #[serde(default)]
    pub tva_percentage: Option<DecimalText>,
    #[serde(default)]
    pub offer: Option<OfferContext>,
    #[serde(default)]
    pub ao: Option<AoContext>,
    #[serde(default)]
    pub lots: Vec<RegisteredLot>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl ComputeDpgfRequest {
    /// Split into engine input; `default_tva` applies when the request has none.
    pub fn into_parts(
        self,
        default_tva: Decimal,
    ) -> Result<(Vec<DpgfElement>, ComputeOptions), DpgfError> {
        let tva_percentage = match self.tva_percentage {
            Some(DecimalText(text)) => {
                parse_decimal(&text).ok_or(DpgfError::InvalidTvaPercentage(text))?
            }
            None => default_tva,
        };

        let elements = self.elements.into_iter().map(DpgfElement::from).collect();
        let options = ComputeOptions {
            include_optional: self.include_optional,
            tva_percentage,
            offer: self.offer,
            ao: self.ao,
            lots: self.lots,
            generated_at: self.generated_at,
        };

        Ok((elements, options))
    }
}
