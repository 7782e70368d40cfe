use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{optional_text, require_non_empty, round_to};
use crate::error::{NexusError, Result};

/// One line of a traveler's bill of materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomItem {
    pub id: Uuid,
    pub part_number: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Option<f64>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBomItem {
    pub part_number: String,
    #[serde(default)]
    pub description: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

const MAX_PART_NUMBER: usize = 100;
const MAX_SUPPLIER: usize = 100;

impl BomItem {
    pub fn new(input: NewBomItem, now: DateTime<Utc>) -> Result<Self> {
        require_non_empty("partNumber", &input.part_number)?;
        let part_number = input.part_number.trim().to_string();
        if part_number.chars().count() > MAX_PART_NUMBER {
            return Err(NexusError::validation(
                "partNumber",
                format!("must be at most {MAX_PART_NUMBER} characters"),
            ));
        }
        if input.quantity == 0 {
            return Err(NexusError::validation("quantity", "must be at least 1"));
        }
        let unit_price = match input.unit_price {
            Some(price) if !price.is_finite() || price < 0.0 => {
                return Err(NexusError::validation(
                    "unitPrice",
                    "must be a non-negative amount",
                ));
            }
            // Stored at cent precision
            Some(price) => Some(round_to(price, 2)),
            None => None,
        };
        let supplier = optional_text(input.supplier);
        if supplier
            .as_ref()
            .is_some_and(|s| s.chars().count() > MAX_SUPPLIER)
        {
            return Err(NexusError::validation(
                "supplier",
                format!("must be at most {MAX_SUPPLIER} characters"),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            part_number,
            description: input.description.trim().to_string(),
            quantity: input.quantity,
            unit_price,
            supplier,
            notes: optional_text(input.notes),
            created_at: now,
        })
    }

    /// Quantity times unit price, when priced
    pub fn extended_price(&self) -> Option<f64> {
        self.unit_price
            .map(|price| round_to(price * f64::from(self.quantity), 2))
    }
}
