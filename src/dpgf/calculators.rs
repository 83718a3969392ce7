//! Core DPGF calculation functions.
//!
//! Pure functions for line and totals math - no I/O, no shared state.
//! All arithmetic stays in `Decimal`; rounding only happens where a division
//! cannot terminate, and in the serializer.

use std::str::FromStr;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::grouping::bucket_lines;
use super::models::{ComputedLine, DpgfElement, DpgfTotals, DEFAULT_LOT_NUMBER};
use super::services::DpgfError;

/// Coefficient applied when an element does not carry one
pub const DEFAULT_COEFFICIENT: Decimal = dec!(1);

/// Margin percentage applied when an element does not carry one
pub const DEFAULT_MARGIN_PERCENTAGE: Decimal = dec!(20);

/// Scale kept for non-terminating divisions
pub const INTERNAL_SCALE: u32 = 10;

/// Round to specified decimal places, halves away from zero (ROUND_HALF_UP).
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use dpgf_engine::dpgf::round_half_up;
///
/// assert_eq!(round_half_up(dec!(2.5), 0), dec!(3));
/// assert_eq!(round_half_up(dec!(-2.5), 0), dec!(-3));
/// assert_eq!(round_half_up(dec!(1.235), 2), dec!(1.24));
/// ```
pub fn round_half_up(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse decimal text ("12", "-0.5", "1.5e3"). Surrounding whitespace is ignored.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

fn required_field(
    element: &DpgfElement,
    field: &'static str,
    raw: &str,
) -> Result<Decimal, DpgfError> {
    parse_decimal(raw).ok_or_else(|| DpgfError::InvalidDecimal {
        element_id: element.id.clone(),
        field,
        value: raw.to_string(),
    })
}

/// Absent or blank values take `default`; anything else must parse.
fn defaulted_field(
    element: &DpgfElement,
    field: &'static str,
    raw: Option<&str>,
    default: Decimal,
) -> Result<Decimal, DpgfError> {
    match raw {
        Some(text) if !text.trim().is_empty() => required_field(element, field, text),
        _ => Ok(default),
    }
}

/// Compute one line from its element.
///
/// `index` is the element's position in the input list, used when the
/// element has no explicit position.
pub fn compute_line(element: &DpgfElement, index: usize) -> Result<ComputedLine, DpgfError> {
    let quantity = required_field(element, "quantity", &element.quantity)?;
    let unit_price = required_field(element, "unitPrice", &element.unit_price)?;
    let coefficient = defaulted_field(
        element,
        "coefficient",
        element.coefficient.as_deref(),
        DEFAULT_COEFFICIENT,
    )?;
    let margin_percentage = defaulted_field(
        element,
        "marginPercentage",
        element.margin_percentage.as_deref(),
        DEFAULT_MARGIN_PERCENTAGE,
    )?;

    let overflow = |field: &'static str| DpgfError::Overflow {
        element_id: element.id.clone(),
        field,
    };

    let margin_rate = margin_percentage / Decimal::ONE_HUNDRED;
    let base_cost = quantity
        .checked_mul(unit_price)
        .and_then(|cost| cost.checked_mul(coefficient))
        .ok_or_else(|| overflow("baseCost"))?;
    let margin_amount = base_cost
        .checked_mul(margin_rate)
        .ok_or_else(|| overflow("marginAmount"))?;
    let sell_unit_price_ht = unit_price
        .checked_mul(coefficient)
        .and_then(|price| price.checked_mul(Decimal::ONE + margin_rate))
        .ok_or_else(|| overflow("sellUnitPriceHT"))?;
    let line_total_ht = quantity
        .checked_mul(sell_unit_price_ht)
        .ok_or_else(|| overflow("lineTotalHT"))?;

    Ok(ComputedLine {
        id: element.id.clone(),
        position: element
            .position
            .unwrap_or_else(|| u32::try_from(index).unwrap_or(u32::MAX)),
        lot_number: element.lot_number.unwrap_or(DEFAULT_LOT_NUMBER),
        category: element.category.clone(),
        subcategory: element.subcategory.clone(),
        designation: element.designation.clone(),
        unit: element.unit.clone(),
        quantity,
        unit_price,
        coefficient,
        margin_percentage,
        base_cost,
        margin_amount,
        sell_unit_price_ht,
        line_total_ht,
        is_optional: element.is_optional,
        supplier_ref: element.supplier_ref.clone(),
        notes: element.notes.clone(),
    })
}

/// Compute every line, in input order.
pub fn compute_line_items(elements: &[DpgfElement]) -> Result<Vec<ComputedLine>, DpgfError> {
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| compute_line(element, index))
        .collect()
}

/// Add `value` to a running total, reporting `field` on overflow.
pub(crate) fn checked_total(
    total: Decimal,
    value: Decimal,
    field: &'static str,
) -> Result<Decimal, DpgfError> {
    total
        .checked_add(value)
        .ok_or(DpgfError::TotalOverflow { field })
}

/// Aggregate lines into grand totals.
///
/// Total HT is summed lot by lot in grouped order, the same way the lot
/// subtotals are, so both agree even where `Decimal` addition rounds.
/// The blended margin is margin / cost, and is zero when the total cost is
/// not positive.
pub fn compute_totals(
    lines: &[ComputedLine],
    tva_percentage: Decimal,
) -> Result<DpgfTotals, DpgfError> {
    let mut total_ht = Decimal::ZERO;
    let mut total_margin_amount = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;

    for lot in bucket_lines(lines) {
        total_ht = checked_total(total_ht, lot.subtotal_ht()?, "totalHT")?;
        for line in lot.categories.iter().flat_map(|category| &category.items) {
            total_margin_amount =
                checked_total(total_margin_amount, line.margin_amount, "totalMarginAmount")?;
            total_cost = checked_total(total_cost, line.base_cost, "totalCost")?;
        }
    }

    let total_tva = total_ht
        .checked_mul(tva_percentage / Decimal::ONE_HUNDRED)
        .ok_or(DpgfError::TotalOverflow { field: "totalTVA" })?;
    let total_ttc = checked_total(total_ht, total_tva, "totalTTC")?;

    let total_margin_percentage = if total_cost > Decimal::ZERO {
        let ratio = total_margin_amount
            .checked_div(total_cost)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or(DpgfError::TotalOverflow {
                field: "totalMarginPercentage",
            })?;
        round_half_up(ratio, INTERNAL_SCALE)
    } else {
        Decimal::ZERO
    };

    Ok(DpgfTotals {
        total_ht,
        tva_percentage,
        total_tva,
        total_ttc,
        total_margin_amount,
        total_margin_percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(quantity: &str, unit_price: &str) -> DpgfElement {
        DpgfElement {
            id: "el-1".to_string(),
            position: None,
            lot_number: None,
            category: "menuiseries_exterieures".to_string(),
            subcategory: None,
            designation: "Fenêtre PVC 2 vantaux".to_string(),
            unit: "u".to_string(),
            quantity: quantity.to_string(),
            unit_price: unit_price.to_string(),
            coefficient: None,
            margin_percentage: None,
            is_optional: false,
            supplier_ref: None,
            notes: None,
        }
    }

    // ==================== round_half_up tests ====================

    #[test]
    fn test_round_half_up_midpoints() {
        assert_eq!(round_half_up(dec!(2.5), 0), dec!(3));
        assert_eq!(round_half_up(dec!(3.5), 0), dec!(4));
        assert_eq!(round_half_up(dec!(2.25), 1), dec!(2.3));
        assert_eq!(round_half_up(dec!(2.45), 1), dec!(2.5));
    }

    #[test]
    fn test_round_half_up_negative() {
        assert_eq!(round_half_up(dec!(-2.5), 0), dec!(-3));
        assert_eq!(round_half_up(dec!(-1.234), 2), dec!(-1.23));
    }

    #[test]
    fn test_round_half_up_large_values() {
        assert_eq!(round_half_up(dec!(999999.995), 2), dec!(1000000.00));
        assert_eq!(round_half_up(dec!(123456.784), 2), dec!(123456.78));
    }

    // ==================== parse_decimal tests ====================

    #[test]
    fn test_parse_decimal_accepts_plain_and_scientific() {
        assert_eq!(parse_decimal("10"), Some(dec!(10)));
        assert_eq!(parse_decimal(" 12.345 "), Some(dec!(12.345)));
        assert_eq!(parse_decimal("-0.5"), Some(dec!(-0.5)));
        assert_eq!(parse_decimal("1.5e3"), Some(dec!(1500)));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
        assert_eq!(parse_decimal("douze"), None);
    }

    // ==================== compute_line tests ====================

    #[test]
    fn test_compute_line_reference_scenario() {
        let mut el = element("10", "100");
        el.coefficient = Some("1".to_string());
        el.margin_percentage = Some("20".to_string());

        let line = compute_line(&el, 0).unwrap();

        assert_eq!(line.base_cost, dec!(1000));
        assert_eq!(line.margin_amount, dec!(200));
        assert_eq!(line.sell_unit_price_ht, dec!(120));
        assert_eq!(line.line_total_ht, dec!(1200));
    }

    #[test]
    fn test_compute_line_defaults() {
        let line = compute_line(&element("2", "50"), 4).unwrap();

        assert_eq!(line.coefficient, dec!(1));
        assert_eq!(line.margin_percentage, dec!(20));
        assert_eq!(line.position, 4);
        assert_eq!(line.lot_number, DEFAULT_LOT_NUMBER);
        assert_eq!(line.line_total_ht, dec!(120));
    }

    #[test]
    fn test_compute_line_blank_optional_fields_use_defaults() {
        let mut el = element("1", "10");
        el.coefficient = Some("".to_string());
        el.margin_percentage = Some("  ".to_string());

        let line = compute_line(&el, 0).unwrap();
        assert_eq!(line.coefficient, dec!(1));
        assert_eq!(line.margin_percentage, dec!(20));
    }

    #[test]
    fn test_compute_line_explicit_position_and_lot() {
        let mut el = element("1", "10");
        el.position = Some(7);
        el.lot_number = Some(3);

        let line = compute_line(&el, 0).unwrap();
        assert_eq!(line.position, 7);
        assert_eq!(line.lot_number, 3);
    }

    #[test]
    fn test_compute_line_coefficient_applies_before_margin() {
        let mut el = element("3", "80");
        el.coefficient = Some("1.15".to_string());
        el.margin_percentage = Some("25".to_string());

        let line = compute_line(&el, 0).unwrap();

        // 3 × 80 × 1.15 = 276
        assert_eq!(line.base_cost, dec!(276));
        assert_eq!(line.margin_amount, dec!(69));
        // 80 × 1.15 × 1.25 = 115
        assert_eq!(line.sell_unit_price_ht, dec!(115));
        assert_eq!(line.line_total_ht, dec!(345));
    }

    #[test]
    fn test_compute_line_invariants_hold_exactly() {
        let mut el = element("3.333", "19.99");
        el.coefficient = Some("1.07".to_string());
        el.margin_percentage = Some("17.5".to_string());

        let line = compute_line(&el, 0).unwrap();

        assert_eq!(line.line_total_ht, line.quantity * line.sell_unit_price_ht);
        assert_eq!(
            line.margin_amount,
            line.base_cost * line.margin_percentage / dec!(100)
        );
        assert_eq!(line.line_total_ht, line.base_cost + line.margin_amount);
    }

    #[test]
    fn test_compute_line_zero_and_negative_pass_through() {
        let zero = compute_line(&element("0", "100"), 0).unwrap();
        assert_eq!(zero.line_total_ht, dec!(0));

        let credit = compute_line(&element("-2", "50"), 0).unwrap();
        assert_eq!(credit.base_cost, dec!(-100));
        assert_eq!(credit.line_total_ht, dec!(-120));
    }

    #[test]
    fn test_compute_line_invalid_quantity() {
        let err = compute_line(&element("abc", "10"), 0).unwrap_err();
        assert_eq!(
            err,
            DpgfError::InvalidDecimal {
                element_id: "el-1".to_string(),
                field: "quantity",
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_compute_line_invalid_margin() {
        let mut el = element("1", "10");
        el.margin_percentage = Some("vingt".to_string());

        let err = compute_line(&el, 0).unwrap_err();
        assert!(matches!(
            err,
            DpgfError::InvalidDecimal { field: "marginPercentage", .. }
        ));
    }

    #[test]
    fn test_compute_line_overflow_names_element_and_field() {
        let mut el = element("79228162514264337593543950335", "1");
        el.margin_percentage = Some("0".to_string());
        el.coefficient = Some("1.5".to_string());

        let err = compute_line(&el, 0).unwrap_err();
        assert_eq!(
            err,
            DpgfError::Overflow {
                element_id: "el-1".to_string(),
                field: "baseCost",
            }
        );
    }

    #[test]
    fn test_compute_line_overflow_in_sell_price() {
        let mut el = element("1", "70000000000000000000000000000");
        el.margin_percentage = Some("50".to_string());

        let err = compute_line(&el, 0).unwrap_err();
        assert!(matches!(err, DpgfError::Overflow { field: "sellUnitPriceHT", .. }));
    }

    #[test]
    fn test_compute_line_items_uses_input_index() {
        let elements = vec![element("1", "10"), element("2", "10"), element("3", "10")];
        let lines = compute_line_items(&elements).unwrap();

        let positions: Vec<u32> = lines.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    // ==================== compute_totals tests ====================

    #[test]
    fn test_compute_totals_reference_scenario() {
        let line = compute_line(&element("10", "100"), 0).unwrap();
        let totals = compute_totals(&[line], dec!(20)).unwrap();

        assert_eq!(totals.total_ht, dec!(1200));
        assert_eq!(totals.total_tva, dec!(240));
        assert_eq!(totals.total_ttc, dec!(1440));
        assert_eq!(totals.total_margin_amount, dec!(200));
        assert_eq!(totals.total_margin_percentage, dec!(20));
    }

    #[test]
    fn test_compute_totals_blended_margin() {
        let mut cheap = element("1", "100");
        cheap.margin_percentage = Some("10".to_string());
        let mut dear = element("1", "300");
        dear.margin_percentage = Some("30".to_string());

        let lines = compute_line_items(&[cheap, dear]).unwrap();
        let totals = compute_totals(&lines, dec!(20)).unwrap();

        // (10 + 90) / 400 = 25 %
        assert_eq!(totals.total_margin_amount, dec!(100));
        assert_eq!(totals.total_margin_percentage, dec!(25));
    }

    #[test]
    fn test_compute_totals_zero_cost_lines_still_blend() {
        let mut a = element("1", "3");
        a.margin_percentage = Some("0".to_string());
        let mut b = element("1", "0");
        b.margin_percentage = Some("0".to_string());
        let mut c = element("1", "1");
        c.margin_percentage = Some("100".to_string());

        let lines = compute_line_items(&[a, b, c]).unwrap();
        let totals = compute_totals(&lines, dec!(20)).unwrap();

        // margin 1 over cost 4
        assert_eq!(totals.total_margin_percentage, dec!(25));
    }

    #[test]
    fn test_compute_totals_thirds_are_rounded_at_internal_scale() {
        let mut a = element("1", "3");
        a.margin_percentage = Some("0".to_string());
        let mut b = element("1", "3");
        b.margin_percentage = Some("0".to_string());
        let mut c = element("1", "3");
        c.margin_percentage = Some("100".to_string());

        let lines = compute_line_items(&[a, b, c]).unwrap();
        let totals = compute_totals(&lines, dec!(20)).unwrap();

        // 3 / 9 × 100
        assert_eq!(totals.total_margin_percentage, dec!(33.3333333333));
    }

    #[test]
    fn test_compute_totals_zero_cost_guard() {
        let lines = compute_line_items(&[element("5", "0"), element("0", "100")]).unwrap();
        let totals = compute_totals(&lines, dec!(20)).unwrap();

        assert_eq!(totals.total_ht, dec!(0));
        assert_eq!(totals.total_margin_percentage, dec!(0));
    }

    #[test]
    fn test_compute_totals_overflow_is_an_error() {
        let mut a = element("50000000000000000000000000000", "1");
        a.margin_percentage = Some("0".to_string());
        let mut b = a.clone();
        b.id = "el-2".to_string();
        b.lot_number = Some(2);

        let lines = compute_line_items(&[a, b]).unwrap();
        let err = compute_totals(&lines, dec!(20)).unwrap_err();

        assert_eq!(err, DpgfError::TotalOverflow { field: "totalHT" });
    }

    #[test]
    fn test_compute_totals_follow_lot_order_at_decimal_limit() {
        let tiny = |id: &str, lot: u32| {
            let mut el = element("0.000000000000000000000000004", "1");
            el.id = id.to_string();
            el.lot_number = Some(lot);
            el.margin_percentage = Some("0".to_string());
            el
        };
        let mut hundred = element("1", "100");
        hundred.id = "el-c".to_string();
        hundred.lot_number = Some(2);
        hundred.margin_percentage = Some("0".to_string());

        let lines = compute_line_items(&[tiny("el-a", 1), hundred, tiny("el-b", 1)]).unwrap();
        let totals = compute_totals(&lines, dec!(20)).unwrap();
        let lots = crate::dpgf::grouping::group_by_lots_and_categories(&lines, &[]).unwrap();

        let grand = lots
            .iter()
            .fold(Decimal::ZERO, |acc, lot| acc + lot.subtotal_ht);
        assert_eq!(totals.total_ht, grand);
    }

    #[test]
    fn test_compute_totals_tva_invariant() {
        let mut el = element("7.5", "33.33");
        el.coefficient = Some("1.1".to_string());
        let lines = compute_line_items(&[el]).unwrap();
        let totals = compute_totals(&lines, dec!(5.5)).unwrap();

        assert_eq!(totals.total_ttc, totals.total_ht + totals.total_tva);
        assert_eq!(totals.total_tva, totals.total_ht * dec!(5.5) / dec!(100));
        assert_eq!(totals.tva_percentage, dec!(5.5));
    }

    #[test]
    fn test_compute_totals_empty() {
        let totals = compute_totals(&[], dec!(20)).unwrap();
        assert_eq!(totals.total_ht, dec!(0));
        assert_eq!(totals.total_ttc, dec!(0));
        assert_eq!(totals.total_margin_percentage, dec!(0));
    }
}
