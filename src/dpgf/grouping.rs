//! Lot and category grouping.
//!
//! Lines are bucketed in hash maps and every level is sorted explicitly
//! afterwards, so output order never depends on input order or on map
//! iteration order.

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;

use super::calculators::checked_total;
use super::models::{CategoryGroup, ComputedLine, LotGroup, RegisteredLot};
use super::services::DpgfError;

/// Display labels for chiffrage category codes
pub const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("menuiseries_exterieures", "Menuiseries extérieures"),
    ("menuiseries_interieures", "Menuiseries intérieures"),
    ("fenetres", "Fenêtres"),
    ("portes_fenetres", "Portes-fenêtres"),
    ("portes_entree", "Portes d'entrée"),
    ("portes_interieures", "Portes intérieures"),
    ("portes_garage", "Portes de garage"),
    ("baies_coulissantes", "Baies coulissantes"),
    ("volets", "Volets"),
    ("volets_roulants", "Volets roulants"),
    ("stores", "Stores"),
    ("fermetures", "Fermetures"),
    ("vitrages", "Vitrages"),
    ("verandas", "Vérandas"),
    ("escaliers", "Escaliers"),
    ("placards", "Placards et rangements"),
    ("parquets", "Parquets"),
    ("bardage", "Bardage"),
    ("isolation", "Isolation"),
    ("cloisons", "Cloisons"),
    ("faux_plafonds", "Faux plafonds"),
    ("quincaillerie", "Quincaillerie"),
    ("fournitures", "Fournitures"),
    ("main_oeuvre", "Main d'œuvre"),
    ("pose", "Pose"),
    ("depose", "Dépose"),
    ("transport", "Transport"),
    ("echafaudage", "Échafaudage"),
    ("divers", "Divers"),
];

/// Label for a category code; unknown codes are their own label.
pub fn category_label(code: &str) -> String {
    match CATEGORY_LABELS.iter().find(|(known, _)| *known == code) {
        Some((_, label)) => (*label).to_string(),
        None => {
            debug!("No label for category code '{}', using code", code);
            code.to_string()
        }
    }
}

/// Display name of a lot: designation of the first matching registered lot,
/// else "Lot N".
pub fn resolve_lot_name(lot_number: u32, registry: &[RegisteredLot]) -> String {
    registry
        .iter()
        .find(|lot| lot.number() == Some(lot_number) && !lot.designation.trim().is_empty())
        .map(|lot| lot.designation.trim().to_string())
        .unwrap_or_else(|| {
            debug!("Lot {} not in registry, synthesizing name", lot_number);
            format!("Lot {}", lot_number)
        })
}

fn push_folded(key: &mut String, c: char) {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => key.push('a'),
        'ç' => key.push('c'),
        'è' | 'é' | 'ê' | 'ë' => key.push('e'),
        'ì' | 'í' | 'î' | 'ï' => key.push('i'),
        'ñ' => key.push('n'),
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => key.push('o'),
        'ù' | 'ú' | 'û' | 'ü' => key.push('u'),
        'ý' | 'ÿ' => key.push('y'),
        'œ' => key.push_str("oe"),
        'æ' => key.push_str("ae"),
        other => key.push(other),
    }
}

/// Primary collation key: lowercase, accents and ligatures folded.
fn collation_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    for c in label.chars().flat_map(char::to_lowercase) {
        push_folded(&mut key, c);
    }
    key
}

/// French ordering of labels.
///
/// Base letters decide first ("Échafaudage" sorts with the e's), then
/// accents, then case with lowercase first.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

/// Lines of one category, in output order
pub(crate) struct CategoryBucket<'a> {
    pub code: &'a str,
    pub label: String,
    pub items: Vec<&'a ComputedLine>,
}

impl CategoryBucket<'_> {
    pub(crate) fn subtotal_ht(&self) -> Result<Decimal, DpgfError> {
        self.items.iter().try_fold(Decimal::ZERO, |total, line| {
            checked_total(total, line.line_total_ht, "subtotalHT")
        })
    }
}

/// Categories of one lot, in output order
pub(crate) struct LotBucket<'a> {
    pub lot_number: u32,
    pub categories: Vec<CategoryBucket<'a>>,
}

impl LotBucket<'_> {
    pub(crate) fn subtotal_ht(&self) -> Result<Decimal, DpgfError> {
        let mut total = Decimal::ZERO;
        for category in &self.categories {
            total = checked_total(total, category.subtotal_ht()?, "subtotalHT")?;
        }
        Ok(total)
    }
}

/// Nest lines by lot, then category, with every level sorted.
///
/// Lots come out by ascending number, categories by label then code, lines
/// by position then id.
pub(crate) fn bucket_lines(lines: &[ComputedLine]) -> Vec<LotBucket<'_>> {
    let mut buckets: HashMap<u32, HashMap<&str, Vec<&ComputedLine>>> = HashMap::new();
    for line in lines {
        buckets
            .entry(line.lot_number)
            .or_default()
            .entry(line.category.as_str())
            .or_default()
            .push(line);
    }

    let mut lots: Vec<LotBucket<'_>> = buckets
        .into_iter()
        .map(|(lot_number, categories)| {
            let mut categories: Vec<CategoryBucket<'_>> = categories
                .into_iter()
                .map(|(code, mut items)| {
                    items.sort_by(|a, b| {
                        a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id))
                    });
                    CategoryBucket {
                        code,
                        label: category_label(code),
                        items,
                    }
                })
                .collect();
            categories.sort_by(|a, b| {
                compare_labels(&a.label, &b.label).then_with(|| a.code.cmp(b.code))
            });

            LotBucket {
                lot_number,
                categories,
            }
        })
        .collect();

    lots.sort_by_key(|lot| lot.lot_number);
    lots
}

/// Partition lines by lot, then by category, with subtotals at each level.
///
/// # Errors
/// * `TotalOverflow` - a subtotal exceeds `Decimal` range
pub fn group_by_lots_and_categories(
    lines: &[ComputedLine],
    registry: &[RegisteredLot],
) -> Result<Vec<LotGroup>, DpgfError> {
    bucket_lines(lines)
        .into_iter()
        .map(|lot| -> Result<LotGroup, DpgfError> {
            let categories = lot
                .categories
                .into_iter()
                .map(|category| -> Result<CategoryGroup, DpgfError> {
                    Ok(CategoryGroup {
                        subtotal_ht: category.subtotal_ht()?,
                        category: category.code.to_string(),
                        category_label: category.label,
                        items: category.items.into_iter().cloned().collect(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let subtotal_ht = categories.iter().try_fold(Decimal::ZERO, |total, category| {
                checked_total(total, category.subtotal_ht, "subtotalHT")
            })?;

            Ok(LotGroup {
                lot_number: lot.lot_number,
                lot_name: resolve_lot_name(lot.lot_number, registry),
                categories,
                subtotal_ht,
            })
        })
        .collect()
}
