//! DPGF compute engine.
//!
//! Turns the priced elements of an offer into a costed bill of quantities
//! grouped by lot and category, with HT/TVA/TTC totals. Pure computation;
//! callers own persistence and rendering.

pub mod calculators;
pub mod grouping;
pub mod models;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;

// Re-export commonly used items
pub use calculators::{compute_line_items, compute_totals, round_half_up};
pub use grouping::group_by_lots_and_categories;
pub use models::{DpgfData, DpgfElement, RegisteredLot};
pub use responses::{serialize_for_storage, SerializationPrecision, SerializedDpgf};
pub use routes::router;
pub use services::{compute_dpgf, ComputeOptions, DpgfError};
