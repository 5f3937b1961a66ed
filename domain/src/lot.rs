use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A quantity of vials of one product type that must be filled without
/// interruption. Immutable once admitted into a [`LotSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Unique lot identifier (batch number).
    pub id: String,

    /// Product type. Changeovers between fills of the same type are
    /// cheaper than between different types.
    pub product_type: String,

    /// Number of vials to fill. Always positive.
    pub vials: u64,
}

impl Lot {
    pub fn new(id: impl Into<String>, product_type: impl Into<String>, vials: u64) -> Self {
        Self {
            id: id.into(),
            product_type: product_type.into(),
            vials,
        }
    }
}

/// A validated, immutable set of lots admitted for scheduling.
///
/// Construction enforces the field-level input contract: non-empty set,
/// unique non-blank ids, non-blank product types, positive vial counts.
/// The config-dependent oversized-lot check lives in the feasibility
/// kernel, which knows the clean-window ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotSet {
    lots: Vec<Lot>,
}

impl LotSet {
    pub fn new(lots: Vec<Lot>) -> Result<Self, ValidationError> {
        if lots.is_empty() {
            return Err(ValidationError::new(
                "lots",
                "lot set must not be empty",
                "[]",
            ));
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(lots.len());
        for lot in &lots {
            if lot.id.trim().is_empty() {
                return Err(ValidationError::new(
                    "id",
                    "lot id must not be blank",
                    lot.id.clone(),
                ));
            }
            if lot.product_type.trim().is_empty() {
                return Err(ValidationError::new(
                    "product_type",
                    format!("lot {} has a blank product type", lot.id),
                    lot.product_type.clone(),
                ));
            }
            if lot.vials == 0 {
                return Err(ValidationError::new(
                    "vials",
                    format!("lot {} has a non-positive vial count", lot.id),
                    "0",
                ));
            }
            if !seen.insert(lot.id.as_str()) {
                return Err(ValidationError::new("id", "duplicate lot id", lot.id.clone()));
            }
        }

        Ok(Self { lots })
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        // A constructed set is never empty; kept for clippy's sake.
        self.lots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Lot> {
        self.lots.iter()
    }
}
