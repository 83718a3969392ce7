//! DPGF orchestration.
//!
//! Filters elements on the optional policy, computes lines, then groups and
//! totals them. No I/O; safe to call concurrently.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use super::calculators::{compute_line_items, compute_totals};
use super::grouping::group_by_lots_and_categories;
use super::models::{
    AoContext, DpgfData, DpgfElement, DpgfMetadata, OfferContext, RegisteredLot,
};

/// TVA applied when the caller does not specify one
pub const DEFAULT_TVA_PERCENTAGE: Decimal = dec!(20);

/// Version tag written in the metadata block
pub const FORMAT_VERSION: &str = "1.0";

/// DPGF computation error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DpgfError {
    #[error("No computable element after optional filtering ({received} received)")]
    NoComputableInput { received: usize },

    #[error("Invalid decimal for {field} on element {element_id}: '{value}'")]
    InvalidDecimal {
        element_id: String,
        field: &'static str,
        value: String,
    },

    #[error("Invalid TVA percentage: '{0}'")]
    InvalidTvaPercentage(String),

    #[error("Decimal overflow computing {field} for element {element_id}")]
    Overflow {
        element_id: String,
        field: &'static str,
    },

    #[error("Decimal overflow computing {field}")]
    TotalOverflow { field: &'static str },
}

/// Options for a DPGF computation
#[derive(Debug, Clone)]
pub struct ComputeOptions {
    /// Keep elements flagged optional
    pub include_optional: bool,
    pub tva_percentage: Decimal,
    pub offer: Option<OfferContext>,
    pub ao: Option<AoContext>,
    /// Lots registered on the AO, for lot names
    pub lots: Vec<RegisteredLot>,
    /// Pinned generation time; now when absent
    pub generated_at: Option<DateTime<Utc>>,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            include_optional: false,
            tva_percentage: DEFAULT_TVA_PERCENTAGE,
            offer: None,
            ao: None,
            lots: Vec::new(),
            generated_at: None,
        }
    }
}

fn build_metadata(options: &ComputeOptions, item_count: usize, lot_count: usize) -> DpgfMetadata {
    let offer = options.offer.clone().unwrap_or_default();
    let ao = options.ao.clone().unwrap_or_default();

    DpgfMetadata {
        offer_id: offer.id,
        offer_reference: offer.reference.or_else(|| ao.reference.clone()),
        client_name: offer.client.or(ao.client),
        location: offer.location.or(ao.location),
        ao_id: ao.id,
        ao_reference: ao.reference,
        generated_at: options.generated_at.unwrap_or_else(Utc::now),
        item_count,
        lot_count,
        includes_optional: options.include_optional,
        version: FORMAT_VERSION.to_string(),
    }
}

/// Compute the full DPGF for a list of priced elements.
///
/// # Errors
/// * `NoComputableInput` - nothing left once optional elements are filtered
/// * `InvalidDecimal` - an element carries unparseable numeric text
/// * `Overflow` / `TotalOverflow` - a product or sum exceeds `Decimal` range
pub fn compute_dpgf(
    elements: &[DpgfElement],
    options: &ComputeOptions,
) -> Result<DpgfData, DpgfError> {
    let included: Vec<DpgfElement> = elements
        .iter()
        .filter(|element| options.include_optional || !element.is_optional)
        .cloned()
        .collect();

    if included.is_empty() {
        return Err(DpgfError::NoComputableInput {
            received: elements.len(),
        });
    }

    debug!(
        "Computing DPGF: {} of {} elements included (include_optional={})",
        included.len(),
        elements.len(),
        options.include_optional
    );

    let lines = compute_line_items(&included)?;

    // Grouping and totals only share the computed lines
    let lots = group_by_lots_and_categories(&lines, &options.lots)?;
    let totals = compute_totals(&lines, options.tva_percentage)?;

    let metadata = build_metadata(options, lines.len(), lots.len());

    info!(
        "DPGF computed: {} items in {} lots, total HT {}",
        metadata.item_count, metadata.lot_count, totals.total_ht
    );

    Ok(DpgfData {
        lots,
        totals,
        metadata,
    })
}
