// Entity and value model for travelers and everything they own

pub mod approval;
pub mod audit;
pub mod bom;
pub mod catalog;
pub mod coating;
pub mod labor;
pub mod step;
pub mod traveler;
pub mod user;

pub use approval::{Approval, ApprovalStatus, PendingChange, RequestType};
pub use audit::{AuditAction, AuditEntry, FieldChange, RequestMeta};
pub use bom::{BomItem, NewBomItem};
pub use catalog::{find_work_center, WorkCenter, WORK_CENTERS};
pub use coating::{CoatingRecord, CoatingStatus, NewCoating};
pub use labor::{hours_between, LaborEntry};
pub use step::{NewStep, ProcessStep, StepOutcome, StepStatus};
pub use traveler::{
    NewTraveler, Priority, Traveler, TravelerPatch, TravelerStatus, TravelerSummary, TravelerType,
};
pub use user::{Actor, NewUser, User, UserRole};

use crate::error::{NexusError, Result};

pub type TravelerId = u64;
pub type UserId = u64;

/// Barcode field separator; never allowed inside encoded identifiers.
pub const BARCODE_DELIMITER: char = '|';

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NexusError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Trimmed text, with blank treated as absent
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn reject_delimiter(field: &str, value: &str) -> Result<()> {
    if value.contains(BARCODE_DELIMITER) {
        return Err(NexusError::validation(
            field,
            format!("must not contain '{BARCODE_DELIMITER}'"),
        ));
    }
    Ok(())
}

/// Barcode-encoded identifiers must be present and free of the delimiter
pub(crate) fn require_identifier(field: &str, value: &str) -> Result<()> {
    require_non_empty(field, value)?;
    reject_delimiter(field, value)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
