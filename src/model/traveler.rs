use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{
    optional_text, require_identifier, require_non_empty, Approval, AuditEntry, BomItem,
    CoatingRecord, FieldChange, LaborEntry, NewStep, ProcessStep, StepStatus, TravelerId, UserId,
};
use crate::error::{NexusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelerType {
    Pcb,
    PcbAssembly,
    Cable,
    CableAssembly,
    PcbCableAssembly,
    Parts,
    Assembly,
}

impl TravelerType {
    pub const ALL: [TravelerType; 7] = [
        TravelerType::Pcb,
        TravelerType::PcbAssembly,
        TravelerType::Cable,
        TravelerType::CableAssembly,
        TravelerType::PcbCableAssembly,
        TravelerType::Parts,
        TravelerType::Assembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelerType::Pcb => "PCB",
            TravelerType::PcbAssembly => "PCB_ASSEMBLY",
            TravelerType::Cable => "CABLE",
            TravelerType::CableAssembly => "CABLE_ASSEMBLY",
            TravelerType::PcbCableAssembly => "PCB_CABLE_ASSEMBLY",
            TravelerType::Parts => "PARTS",
            TravelerType::Assembly => "ASSEMBLY",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TravelerType::Pcb => "PCB",
            TravelerType::PcbAssembly => "PCB Assembly",
            TravelerType::Cable => "Cable",
            TravelerType::CableAssembly => "Cable Assembly",
            TravelerType::PcbCableAssembly => "PCB + Cable Assembly",
            TravelerType::Parts => "Parts",
            TravelerType::Assembly => "Assembly",
        }
    }
}

impl fmt::Display for TravelerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TravelerType {
    type Err = NexusError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        TravelerType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                NexusError::validation("travelerType", format!("'{}' is not a known type", s.trim()))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelerStatus {
    Created,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

impl TravelerStatus {
    /// Completed and cancelled travelers no longer accept routing changes
    pub fn is_closed(&self) -> bool {
        matches!(self, TravelerStatus::Completed | TravelerStatus::Cancelled)
    }
}

impl fmt::Display for TravelerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TravelerStatus::Created => "CREATED",
            TravelerStatus::InProgress => "IN_PROGRESS",
            TravelerStatus::Completed => "COMPLETED",
            TravelerStatus::OnHold => "ON_HOLD",
            TravelerStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// The traveler aggregate. Everything it owns is loaded, edited and committed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    pub id: TravelerId,
    pub job_number: String,
    pub work_order_number: Option<String>,
    pub traveler_type: TravelerType,
    pub part_number: String,
    pub part_description: String,
    pub revision: String,
    pub quantity: u32,
    pub customer_code: String,
    pub customer_name: String,
    pub priority: Priority,
    pub specs: String,
    pub comments: String,
    pub from_stock: Option<String>,
    pub to_stock: Option<String>,
    pub ship_via: Option<String>,
    pub lead_free: bool,
    pub itar_controlled: bool,
    pub status: TravelerStatus,
    pub hold_reason: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: u64,
    #[serde(default)]
    pub steps: Vec<ProcessStep>,
    #[serde(default)]
    pub labor_entries: Vec<LaborEntry>,
    #[serde(default)]
    pub approvals: Vec<Approval>,
    #[serde(default)]
    pub audit_log: Vec<AuditEntry>,
    #[serde(default)]
    pub coatings: Vec<CoatingRecord>,
    #[serde(default)]
    pub bom_items: Vec<BomItem>,
}

/// Creation request for a traveler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTraveler {
    pub job_number: String,
    #[serde(default)]
    pub work_order_number: Option<String>,
    pub traveler_type: String,
    pub part_number: String,
    #[serde(default)]
    pub part_description: String,
    pub revision: String,
    pub quantity: u32,
    #[serde(default)]
    pub customer_code: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub specs: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub from_stock: Option<String>,
    #[serde(default)]
    pub to_stock: Option<String>,
    #[serde(default)]
    pub ship_via: Option<String>,
    #[serde(default)]
    pub lead_free: bool,
    #[serde(default)]
    pub itar_controlled: bool,
    /// Custom routing; the type's template is used when absent
    #[serde(default)]
    pub steps: Option<Vec<NewStep>>,
}

/// Partial edit of a traveler's descriptive fields. `Some("")` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_stock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_stock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship_via: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itar_controlled: Option<bool>,
}

impl TravelerPatch {
    pub fn is_empty(&self) -> bool {
        *self == TravelerPatch::default()
    }
}

/// List view of a traveler without its owned collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerSummary {
    pub id: TravelerId,
    pub job_number: String,
    pub display_job_number: String,
    pub traveler_type: TravelerType,
    pub part_number: String,
    pub part_description: String,
    pub revision: String,
    pub quantity: u32,
    pub customer_name: String,
    pub priority: Priority,
    pub status: TravelerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub step_count: usize,
    pub completed_steps: usize,
    pub version: u64,
}

impl NewTraveler {
    pub fn validate(&self) -> Result<TravelerType> {
        require_identifier("jobNumber", &self.job_number)?;
        let traveler_type = self.traveler_type.parse::<TravelerType>()?;
        require_identifier("partNumber", &self.part_number)?;
        super::reject_delimiter("customerCode", &self.customer_code)?;
        require_non_empty("revision", &self.revision)?;
        if self.quantity == 0 {
            return Err(NexusError::validation("quantity", "must be greater than zero"));
        }
        Ok(traveler_type)
    }
}

impl Traveler {
    /// Validate a creation request and build a traveler with an empty routing.
    pub fn new(
        id: TravelerId,
        input: NewTraveler,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let traveler_type = input.validate()?;

        Ok(Self {
            id,
            job_number: input.job_number.trim().to_string(),
            work_order_number: optional_text(input.work_order_number),
            traveler_type,
            part_number: input.part_number.trim().to_string(),
            part_description: input.part_description.trim().to_string(),
            revision: input.revision.trim().to_string(),
            quantity: input.quantity,
            customer_code: input.customer_code.trim().to_string(),
            customer_name: input.customer_name.trim().to_string(),
            priority: input.priority,
            specs: input.specs,
            comments: input.comments,
            from_stock: optional_text(input.from_stock),
            to_stock: optional_text(input.to_stock),
            ship_via: optional_text(input.ship_via),
            lead_free: input.lead_free,
            itar_controlled: input.itar_controlled,
            status: TravelerStatus::Created,
            hold_reason: None,
            created_by,
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
            steps: Vec::new(),
            labor_entries: Vec::new(),
            approvals: Vec::new(),
            audit_log: Vec::new(),
            coatings: Vec::new(),
            bom_items: Vec::new(),
        })
    }

    /// Job number as printed: `L` for lead free, then `M` for ITAR
    pub fn display_job_number(&self) -> String {
        let mut display = self.job_number.clone();
        if self.lead_free {
            display.push('L');
        }
        if self.itar_controlled {
            display.push('M');
        }
        display
    }

    /// Advance `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    pub fn has_recorded_counts(&self) -> bool {
        self.steps.iter().any(ProcessStep::has_counts)
    }

    pub fn completed_step_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    pub fn summary(&self) -> TravelerSummary {
        TravelerSummary {
            id: self.id,
            job_number: self.job_number.clone(),
            display_job_number: self.display_job_number(),
            traveler_type: self.traveler_type,
            part_number: self.part_number.clone(),
            part_description: self.part_description.clone(),
            revision: self.revision.clone(),
            quantity: self.quantity,
            customer_name: self.customer_name.clone(),
            priority: self.priority,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
            step_count: self.steps.len(),
            completed_steps: self.completed_step_count(),
            version: self.version,
        }
    }

    /// Validate and apply a field edit. Either every provided field is applied or none is.
    ///
    /// Returns one change per field whose value actually differs.
    pub fn apply_patch(&mut self, patch: &TravelerPatch) -> Result<Vec<FieldChange>> {
        if let Some(job) = &patch.job_number {
            require_identifier("jobNumber", job)?;
            if job.trim() != self.job_number && self.status != TravelerStatus::Created {
                return Err(NexusError::validation(
                    "jobNumber",
                    format!("is locked once production has started (status {})", self.status),
                ));
            }
        }
        if let Some(part) = &patch.part_number {
            require_identifier("partNumber", part)?;
        }
        if let Some(code) = &patch.customer_code {
            super::reject_delimiter("customerCode", code)?;
        }
        if let Some(revision) = &patch.revision {
            require_non_empty("revision", revision)?;
        }
        if let Some(quantity) = patch.quantity {
            if quantity == 0 {
                return Err(NexusError::validation("quantity", "must be greater than zero"));
            }
            if quantity != self.quantity && self.has_recorded_counts() {
                return Err(NexusError::validation(
                    "quantity",
                    "cannot change after counts have been recorded on a step",
                ));
            }
        }

        let mut changes = Vec::new();
        set_text(&mut changes, "jobNumber", &mut self.job_number, &patch.job_number);
        set_optional(
            &mut changes,
            "workOrderNumber",
            &mut self.work_order_number,
            &patch.work_order_number,
        );
        set_text(&mut changes, "partNumber", &mut self.part_number, &patch.part_number);
        set_text(
            &mut changes,
            "partDescription",
            &mut self.part_description,
            &patch.part_description,
        );
        set_text(&mut changes, "revision", &mut self.revision, &patch.revision);
        set_text(&mut changes, "customerCode", &mut self.customer_code, &patch.customer_code);
        set_text(&mut changes, "customerName", &mut self.customer_name, &patch.customer_name);
        set_text(&mut changes, "specs", &mut self.specs, &patch.specs);
        set_text(&mut changes, "comments", &mut self.comments, &patch.comments);
        set_optional(&mut changes, "fromStock", &mut self.from_stock, &patch.from_stock);
        set_optional(&mut changes, "toStock", &mut self.to_stock, &patch.to_stock);
        set_optional(&mut changes, "shipVia", &mut self.ship_via, &patch.ship_via);
        set_value(&mut changes, "priority", &mut self.priority, patch.priority);
        set_value(&mut changes, "leadFree", &mut self.lead_free, patch.lead_free);
        set_value(
            &mut changes,
            "itarControlled",
            &mut self.itar_controlled,
            patch.itar_controlled,
        );

        if let Some(quantity) = patch.quantity {
            if quantity != self.quantity {
                changes.push(FieldChange::new(
                    "quantity",
                    Some(self.quantity.to_string()),
                    Some(quantity.to_string()),
                ));
                self.quantity = quantity;
                for step in self.steps.iter_mut().filter(|s| s.status == StepStatus::Pending) {
                    step.quantity = quantity;
                }
            }
        }

        Ok(changes)
    }
}

fn set_text(changes: &mut Vec<FieldChange>, field: &str, slot: &mut String, value: &Option<String>) {
    let Some(value) = value else { return };
    let value = value.trim();
    if slot != value {
        changes.push(FieldChange::new(field, Some(slot.clone()), Some(value.to_string())));
        *slot = value.to_string();
    }
}

fn set_optional(
    changes: &mut Vec<FieldChange>,
    field: &str,
    slot: &mut Option<String>,
    value: &Option<String>,
) {
    if value.is_none() {
        return;
    }
    let value = optional_text(value.clone());
    if *slot != value {
        changes.push(FieldChange::new(field, slot.clone(), value.clone()));
        *slot = value;
    }
}

fn set_value<T: PartialEq + Copy + fmt::Display>(
    changes: &mut Vec<FieldChange>,
    field: &str,
    slot: &mut T,
    value: Option<T>,
) {
    let Some(value) = value else { return };
    if *slot != value {
        changes.push(FieldChange::new(
            field,
            Some(slot.to_string()),
            Some(value.to_string()),
        ));
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewTraveler {
        NewTraveler {
            job_number: "8414".into(),
            traveler_type: "PCB_ASSEMBLY".into(),
            part_number: "PN-100".into(),
            part_description: "Controller board".into(),
            revision: "A".into(),
            quantity: 250,
            customer_code: "ACME".into(),
            customer_name: "Acme Corp".into(),
            ..Default::default()
        }
    }

    fn traveler() -> Traveler {
        Traveler::new(1, request(), 7, Utc::now()).unwrap()
    }

    #[test]
    fn test_display_job_number_suffixes() {
        let mut t = traveler();
        assert_eq!(t.display_job_number(), "8414");
        t.lead_free = true;
        assert_eq!(t.display_job_number(), "8414L");
        t.itar_controlled = true;
        assert_eq!(t.display_job_number(), "8414LM");
        t.lead_free = false;
        assert_eq!(t.display_job_number(), "8414M");
        assert_eq!(t.job_number, "8414");
    }

    #[test]
    fn test_validation_names_the_field() {
        let cases: Vec<(NewTraveler, &str)> = vec![
            (NewTraveler { quantity: 0, ..request() }, "quantity"),
            (NewTraveler { revision: " ".into(), ..request() }, "revision"),
            (NewTraveler { job_number: "".into(), ..request() }, "jobNumber"),
            (NewTraveler { traveler_type: "WIDGET".into(), ..request() }, "travelerType"),
            (NewTraveler { part_number: "A|B".into(), ..request() }, "partNumber"),
            (NewTraveler { customer_code: "C|1".into(), ..request() }, "customerCode"),
        ];

        for (input, expected) in cases {
            match Traveler::new(1, input, 7, Utc::now()) {
                Err(NexusError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error on {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_traveler_type_parsing_is_lenient() {
        assert_eq!("pcb-assembly".parse::<TravelerType>().unwrap(), TravelerType::PcbAssembly);
        assert_eq!("Cable Assembly".parse::<TravelerType>().unwrap(), TravelerType::CableAssembly);
        assert!("".parse::<TravelerType>().is_err());
    }

    #[test]
    fn test_patch_reports_only_changed_fields() {
        let mut t = traveler();
        let patch = TravelerPatch {
            revision: Some("A".into()),
            customer_name: Some("Acme Industries".into()),
            ship_via: Some("UPS".into()),
            ..Default::default()
        };

        let changes = t.apply_patch(&patch).unwrap();
        let fields: Vec<_> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["customerName", "shipVia"]);
        assert_eq!(t.ship_via.as_deref(), Some("UPS"));

        // Same patch again is a no-op
        assert!(t.apply_patch(&patch).unwrap().is_empty());

        // Empty string clears optional fields
        let changes = t
            .apply_patch(&TravelerPatch {
                ship_via: Some(String::new()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(t.ship_via, None);
    }

    #[test]
    fn test_patch_is_all_or_nothing() {
        let mut t = traveler();
        let before = t.clone();
        let patch = TravelerPatch {
            customer_name: Some("Someone Else".into()),
            revision: Some("".into()),
            ..Default::default()
        };
        assert!(t.apply_patch(&patch).is_err());
        assert_eq!(t, before);
    }

    #[test]
    fn test_job_number_locked_after_start() {
        let mut t = traveler();
        t.status = TravelerStatus::InProgress;
        let err = t
            .apply_patch(&TravelerPatch {
                job_number: Some("9000".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, NexusError::Validation { ref field, .. } if field == "jobNumber"));

        // Unchanged value is accepted
        assert!(t
            .apply_patch(&TravelerPatch {
                job_number: Some("8414".into()),
                ..Default::default()
            })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_quantity_locked_once_counts_recorded() {
        let mut t = traveler();
        t.steps.push(ProcessStep::new(1, "ENGINEER", "Review", 250).unwrap());

        t.apply_patch(&TravelerPatch {
            quantity: Some(300),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(t.steps[0].quantity, 300);

        t.steps[0].accepted = 5;
        let err = t
            .apply_patch(&TravelerPatch {
                quantity: Some(310),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, NexusError::Validation { ref field, .. } if field == "quantity"));
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut t = traveler();
        let later = t.updated_at + chrono::Duration::seconds(5);
        t.touch(later);
        t.touch(later - chrono::Duration::seconds(60));
        assert_eq!(t.updated_at, later);
    }
}
