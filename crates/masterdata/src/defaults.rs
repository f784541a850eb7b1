use crate::option::{DropdownCategory, NewDropdownOption};

const COLORS: &[&str] = &[
    "Red", "Maroon", "Beige", "Ivory", "Cream", "Grey", "Charcoal", "Black", "Navy Blue",
    "Sky Blue", "Green", "Gold", "Brown", "Rust", "Multicolor",
];

const PATTERNS: &[&str] = &[
    "Solid", "Persian", "Oriental", "Geometric", "Floral", "Abstract", "Modern", "Traditional",
    "Kilim", "Striped", "Border", "Medallion",
];

const UNITS: &[&str] = &["kg", "g", "m", "sqm", "litre", "piece", "roll", "cone"];

const MATERIAL_CATEGORIES: &[&str] = &[
    "Yarn", "Wool", "Silk", "Cotton", "Jute", "Polyester", "Backing Cloth", "Latex", "Dye",
    "Chemical", "Packaging",
];

const PRODUCT_CATEGORIES: &[&str] = &[
    "Hand Tufted", "Hand Knotted", "Flat Weave", "Shaggy", "Runner", "Round", "Bath Mat",
    "Door Mat",
];

const QUALITY_GRADES: &[&str] = &["A", "B", "C"];

const MACHINES: &[&str] = &["Loom 1", "Loom 2", "Loom 3", "Tufting Gun 1", "Finishing Line"];

const WASTAGE_REASONS: &[&str] = &[
    "Yarn Breakage", "Colour Mismatch", "Cutting Waste", "Machine Fault", "Backing Defect",
    "Human Error", "Other",
];

const PRIORITIES: &[&str] = &["low", "normal", "high", "urgent"];

/// Built-in option set used by `seed_defaults` and the seed CLI.
pub fn default_options() -> Vec<NewDropdownOption> {
    let groups: [(DropdownCategory, &[&str]); 9] = [
        (DropdownCategory::Color, COLORS),
        (DropdownCategory::Pattern, PATTERNS),
        (DropdownCategory::Unit, UNITS),
        (DropdownCategory::MaterialCategory, MATERIAL_CATEGORIES),
        (DropdownCategory::ProductCategory, PRODUCT_CATEGORIES),
        (DropdownCategory::QualityGrade, QUALITY_GRADES),
        (DropdownCategory::Machine, MACHINES),
        (DropdownCategory::WastageReason, WASTAGE_REASONS),
        (DropdownCategory::Priority, PRIORITIES),
    ];

    groups
        .into_iter()
        .flat_map(|(category, values)| {
            values
                .iter()
                .enumerate()
                .map(move |(i, v)| NewDropdownOption::new(category, *v, i as i32 + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::option::normalize_value;

    #[test]
    fn every_category_is_seeded() {
        let seeded: HashSet<_> = default_options().iter().map(|o| o.category).collect();
        for category in DropdownCategory::ALL {
            assert!(seeded.contains(&category), "missing {category}");
        }
    }

    #[test]
    fn defaults_are_valid_and_unique_per_category() {
        let mut seen = HashSet::new();
        for option in default_options() {
            let value = normalize_value(&option.value).unwrap();
            assert!(
                seen.insert((option.category, value.to_lowercase())),
                "duplicate {}/{}",
                option.category,
                value
            );
        }
    }

    #[test]
    fn priorities_match_batch_default() {
        assert!(
            default_options()
                .iter()
                .any(|o| o.category == DropdownCategory::Priority && o.value == "normal")
        );
    }
}
