//! Bill of materials per square metre of finished carpet.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use loomworks_core::DomainError;
use loomworks_inventory::{RawMaterialId, round_quantity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub material_id: RawMaterialId,
    /// Material units (kg, m, litre, ...) needed for one SQM.
    pub quantity_per_sqm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub material_id: RawMaterialId,
    pub quantity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipe {
    lines: Vec<RecipeLine>,
}

impl Recipe {
    /// Rejects repeated materials and non-positive quantities.
    pub fn new(lines: Vec<RecipeLine>) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        for line in &lines {
            if !seen.insert(line.material_id) {
                return Err(DomainError::validation(format!(
                    "material {} appears more than once in the recipe",
                    line.material_id
                )));
            }
            if !line.quantity_per_sqm.is_finite() || line.quantity_per_sqm <= 0.0 {
                return Err(DomainError::validation(format!(
                    "quantity per SQM for material {} must be greater than zero",
                    line.material_id
                )));
            }
        }
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[RecipeLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Material needed to make `total_sqm` square metres.
    pub fn requirements(&self, total_sqm: f64) -> Vec<MaterialRequirement> {
        self.lines
            .iter()
            .map(|l| MaterialRequirement {
                material_id: l.material_id,
                quantity: round_quantity(l.quantity_per_sqm * total_sqm),
            })
            .collect()
    }

    /// Paise of material per SQM. `cost_of` returns paise per material unit;
    /// a material without a known cost makes the whole recipe uncostable.
    pub fn cost_per_sqm<F>(&self, mut cost_of: F) -> Result<u64, DomainError>
    where
        F: FnMut(RawMaterialId) -> Option<u64>,
    {
        let mut total = 0.0;
        for line in &self.lines {
            let unit_cost = cost_of(line.material_id).ok_or_else(|| {
                DomainError::invariant(format!("no cost known for material {}", line.material_id))
            })?;
            total += unit_cost as f64 * line.quantity_per_sqm;
        }
        Ok(total.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomworks_core::AggregateId;

    fn material() -> RawMaterialId {
        RawMaterialId::new(AggregateId::new())
    }

    #[test]
    fn duplicate_material_is_rejected() {
        let wool = material();
        let err = Recipe::new(vec![
            RecipeLine { material_id: wool, quantity_per_sqm: 2.0 },
            RecipeLine { material_id: wool, quantity_per_sqm: 1.0 },
        ])
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(Recipe::new(vec![RecipeLine { material_id: material(), quantity_per_sqm: 0.0 }]).is_err());
    }

    #[test]
    fn requirements_scale_with_area() {
        let wool = material();
        let latex = material();
        let recipe = Recipe::new(vec![
            RecipeLine { material_id: wool, quantity_per_sqm: 2.5 },
            RecipeLine { material_id: latex, quantity_per_sqm: 0.4 },
        ])
        .unwrap();

        let req = recipe.requirements(12.0);
        assert_eq!(req[0], MaterialRequirement { material_id: wool, quantity: 30.0 });
        assert_eq!(req[1], MaterialRequirement { material_id: latex, quantity: 4.8 });
    }

    #[test]
    fn cost_per_sqm_sums_lines() {
        let wool = material();
        let latex = material();
        let recipe = Recipe::new(vec![
            RecipeLine { material_id: wool, quantity_per_sqm: 2.5 },
            RecipeLine { material_id: latex, quantity_per_sqm: 0.5 },
        ])
        .unwrap();

        let cost = recipe
            .cost_per_sqm(|id| if id == wool { Some(80_000) } else { Some(30_000) })
            .unwrap();
        assert_eq!(cost, 215_000);

        let err = recipe.cost_per_sqm(|id| (id == wool).then_some(80_000)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
