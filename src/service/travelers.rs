use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{check_version, GateOutcome, TravelerService};
use crate::approval::audit;
use crate::barcode::{self, ScannedBarcode, TravelerBarcodes};
use crate::error::{NexusError, Result};
use crate::model::{
    Actor, AuditAction, AuditEntry, FieldChange, NewTraveler, PendingChange, ProcessStep, Traveler,
    TravelerId, TravelerPatch, TravelerStatus, TravelerSummary, TravelerType, UserRole,
};
use crate::observability::{service_metrics, OperationTimer};
use crate::routing::{self, engine, StatusTransition};

/// List filters; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerFilter {
    pub status: Option<TravelerStatus>,
    pub traveler_type: Option<TravelerType>,
    /// Case-insensitive match on job number, part number or customer
    pub search: Option<String>,
}

impl TravelerFilter {
    fn matches(&self, traveler: &Traveler) -> bool {
        if self.status.is_some_and(|s| s != traveler.status) {
            return false;
        }
        if self.traveler_type.is_some_and(|t| t != traveler.traveler_type) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    &traveler.job_number,
                    &traveler.part_number,
                    &traveler.customer_code,
                    &traveler.customer_name,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// A decoded scan together with the traveler it points at
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedTraveler {
    pub scan: ScannedBarcode,
    pub traveler: TravelerSummary,
}

impl TravelerService {
    pub async fn create_traveler(&self, actor: &Actor, mut input: NewTraveler) -> Result<Traveler> {
        actor.ensure_can_write()?;
        let timer = OperationTimer::new("create_traveler");
        let traveler_type = input.validate()?;
        let custom_steps = input.steps.take().filter(|steps| !steps.is_empty());

        let steps = match custom_steps {
            Some(steps) => {
                let mut built: Vec<ProcessStep> = Vec::with_capacity(steps.len());
                for step in steps {
                    let sequence = step.sequence.unwrap_or_else(|| engine::next_sequence(&built));
                    built.push(ProcessStep::new(
                        sequence,
                        &step.work_center,
                        &step.instruction,
                        input.quantity,
                    )?);
                }
                engine::sort_steps(&mut built);
                built
            }
            None => routing::instantiate_steps(traveler_type, input.quantity),
        };

        // Everything is validated before an id is taken from the sequence
        let now = Utc::now();
        let id = self.store.next_traveler_id().await?;
        let mut traveler = Traveler::new(id, input, actor.id(), now)?;
        traveler.steps = steps;

        let job_number = traveler.job_number.clone();
        audit::record(
            &mut traveler,
            actor,
            AuditAction::Created,
            Some(FieldChange::new("jobNumber", None, Some(job_number))),
            now,
        );

        let stored = self.store.insert(traveler).await?;
        service_metrics().record_commit();
        info!(
            traveler.id = stored.id,
            job_number = %stored.job_number,
            traveler_type = %stored.traveler_type,
            steps = stored.steps.len(),
            actor = %actor.user.username,
            "Traveler created"
        );
        timer.finish();
        Ok(stored)
    }

    pub async fn get_traveler(&self, id: TravelerId) -> Result<Traveler> {
        self.load(id).await
    }

    /// Newest first
    pub async fn list_travelers(&self, filter: &TravelerFilter) -> Result<Vec<TravelerSummary>> {
        let mut travelers: Vec<TravelerSummary> = self
            .store
            .list()
            .await?
            .iter()
            .filter(|t| filter.matches(t))
            .map(Traveler::summary)
            .collect();
        travelers.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(travelers)
    }

    pub async fn update_traveler(
        &self,
        actor: &Actor,
        id: TravelerId,
        patch: TravelerPatch,
        expected_version: Option<u64>,
        details: Option<String>,
    ) -> Result<GateOutcome<Traveler>> {
        self.gated(actor, id, expected_version, PendingChange::Edit { patch }, details)
            .await
    }

    pub async fn complete_traveler(
        &self,
        actor: &Actor,
        id: TravelerId,
        expected_version: Option<u64>,
        details: Option<String>,
    ) -> Result<GateOutcome<Traveler>> {
        self.gated(actor, id, expected_version, PendingChange::Complete, details)
            .await
    }

    pub async fn cancel_traveler(
        &self,
        actor: &Actor,
        id: TravelerId,
        reason: Option<String>,
        expected_version: Option<u64>,
    ) -> Result<GateOutcome<Traveler>> {
        let details = reason.clone();
        self.gated(actor, id, expected_version, PendingChange::Cancel { reason }, details)
            .await
    }

    pub async fn hold_traveler(
        &self,
        actor: &Actor,
        id: TravelerId,
        reason: Option<String>,
        expected_version: Option<u64>,
    ) -> Result<Traveler> {
        actor.ensure_can_write()?;
        let (traveler, _) = self
            .mutate(id, expected_version, |traveler, now| {
                let result = routing::apply_transition(traveler, StatusTransition::Hold { reason }, now)?;
                super::record_transition(traveler, actor, AuditAction::Updated, result, now);
                Ok(())
            })
            .await?;
        Ok(traveler)
    }

    pub async fn release_traveler(
        &self,
        actor: &Actor,
        id: TravelerId,
        expected_version: Option<u64>,
    ) -> Result<Traveler> {
        actor.ensure_can_write()?;
        let (traveler, _) = self
            .mutate(id, expected_version, |traveler, now| {
                let result = routing::apply_transition(traveler, StatusTransition::Release, now)?;
                let action = match result.status() {
                    TravelerStatus::Completed => AuditAction::Completed,
                    _ => AuditAction::Updated,
                };
                super::record_transition(traveler, actor, action, result, now);
                Ok(())
            })
            .await?;
        Ok(traveler)
    }

    /// Remove a traveler and everything it owns. Administrators only.
    pub async fn delete_traveler(&self, actor: &Actor, id: TravelerId, expected_version: Option<u64>) -> Result<()> {
        if actor.user.role != UserRole::Admin {
            return Err(NexusError::Forbidden(format!(
                "user '{}' may not delete travelers",
                actor.user.username
            )));
        }
        let traveler = self.load(id).await?;
        check_version(&traveler, expected_version)?;
        self.store.delete(id, traveler.version).await?;
        warn!(traveler.id = id, job_number = %traveler.job_number, actor = %actor.user.username, "Traveler deleted");
        Ok(())
    }

    /// History, oldest first
    pub async fn audit_log(&self, id: TravelerId) -> Result<Vec<AuditEntry>> {
        let mut entries = self.load(id).await?.audit_log;
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }

    pub async fn barcodes(&self, id: TravelerId) -> Result<TravelerBarcodes> {
        let traveler = self.load(id).await?;
        Ok(TravelerBarcodes::for_traveler(&traveler))
    }

    /// Decode a scan and load its traveler. A label whose job number no longer
    /// matches the traveler is refused.
    pub async fn lookup_by_barcode(&self, data: &str) -> Result<ScannedTraveler> {
        let scan = barcode::parse(data)?;
        let traveler = self.load(scan.traveler_id).await?;
        if traveler.job_number != scan.job_number {
            return Err(NexusError::validation(
                "barcode",
                format!(
                    "job number '{}' does not match traveler {} ({})",
                    scan.job_number, traveler.id, traveler.job_number
                ),
            ));
        }
        Ok(ScannedTraveler {
            scan,
            traveler: traveler.summary(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{fixture, new_traveler};
    use super::*;
    use crate::barcode::{encode, BarcodeFormat};
    use crate::model::{ApprovalStatus, NewStep, RequestMeta};

    #[tokio::test]
    async fn test_create_uses_template() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.operator, new_traveler("PCB_ASSEMBLY", 250))
            .await
            .unwrap();

        assert_eq!(traveler.version, 1);
        assert_eq!(traveler.status, TravelerStatus::Created);
        assert_eq!(traveler.steps.len(), 17);
        assert!(traveler.steps.iter().all(|s| s.quantity == 250));
        assert_eq!(traveler.audit_log[0].action, AuditAction::Created);
    }

    #[tokio::test]
    async fn test_create_with_custom_routing() {
        let f = fixture().await;
        let mut input = new_traveler("ASSEMBLY", 5);
        input.steps = Some(vec![
            NewStep {
                work_center: "ASSEMBLY".into(),
                instruction: "Build".into(),
                sequence: Some(20),
            },
            NewStep {
                work_center: "ENGINEER".into(),
                instruction: "Review".into(),
                sequence: Some(10),
            },
            NewStep {
                work_center: "PACKAGING".into(),
                instruction: "Box".into(),
                sequence: None,
            },
        ]);

        let traveler = f.service.create_traveler(&f.approver, input).await.unwrap();
        let routing: Vec<_> = traveler.steps.iter().map(|s| (s.sequence, s.work_center.as_str())).collect();
        assert_eq!(routing, vec![(10, "ENGINEER"), (20, "ASSEMBLY"), (21, "PACKAGING")]);
    }

    #[tokio::test]
    async fn test_invalid_create_consumes_no_id() {
        let f = fixture().await;
        let mut bad = new_traveler("PCB", 1);
        bad.revision.clear();
        assert!(f.service.create_traveler(&f.operator, bad).await.is_err());

        let mut bad_routing = new_traveler("PCB", 1);
        bad_routing.steps = Some(vec![NewStep {
            work_center: "TELEPORTER".into(),
            instruction: "Beam it over".into(),
            sequence: None,
        }]);
        let err = f
            .service
            .create_traveler(&f.operator, bad_routing)
            .await
            .unwrap_err();
        assert!(matches!(err, NexusError::Validation { .. }));

        let first = f
            .service
            .create_traveler(&f.operator, new_traveler("PCB", 1))
            .await
            .unwrap();
        assert_eq!(first.id, 1);
    }

    #[tokio::test]
    async fn test_identical_edit_leaves_version_alone() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.operator, new_traveler("CABLE", 10))
            .await
            .unwrap();
        let same = TravelerPatch {
            revision: Some("A".into()),
            ..Default::default()
        };

        let applied = f
            .service
            .update_traveler(&f.approver, traveler.id, same.clone(), Some(1), None)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(applied.version, 1);
        assert_eq!(applied.updated_at, traveler.updated_at);

        // Nothing to approve either
        let outcome = f
            .service
            .update_traveler(&f.operator, traveler.id, same, Some(1), None)
            .await
            .unwrap();
        assert!(outcome.applied().is_some());

        let stored = f.service.get_traveler(traveler.id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.audit_log.len(), traveler.audit_log.len());
        assert!(stored.approvals.is_empty());

        let step = &traveler.steps[0];
        let reordered = f
            .service
            .reorder_step(&f.approver, traveler.id, step.id, step.sequence, None)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(reordered.version, 1);
    }

    #[tokio::test]
    async fn test_operator_edit_waits_for_approval() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.operator, new_traveler("CABLE", 10))
            .await
            .unwrap();

        let patch = TravelerPatch {
            customer_name: Some("Globex".into()),
            ..Default::default()
        };
        let approval = f
            .service
            .update_traveler(&f.operator, traveler.id, patch.clone(), Some(1), None)
            .await
            .unwrap()
            .pending()
            .unwrap();
        assert_eq!(approval.status, ApprovalStatus::Pending);
        assert_eq!(approval.approver_ids, vec![f.approver.id()]);

        let stored = f.service.get_traveler(traveler.id).await.unwrap();
        assert_eq!(stored.customer_name, "Acme Corp");

        // The approver edits directly
        let applied = f
            .service
            .update_traveler(&f.approver, traveler.id, patch, None, None)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(applied.customer_name, "Globex");
        let last = applied.audit_log.last().unwrap();
        assert_eq!(last.field_changed.as_deref(), Some("customerName"));
    }

    #[tokio::test]
    async fn test_invalid_request_is_refused_before_approval() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.operator, new_traveler("CABLE", 10))
            .await
            .unwrap();

        let err = f
            .service
            .update_traveler(
                &f.operator,
                traveler.id,
                TravelerPatch {
                    quantity: Some(0),
                    ..Default::default()
                },
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NexusError::Validation { .. }));
        assert!(f.service.get_traveler(traveler.id).await.unwrap().approvals.is_empty());
    }

    #[tokio::test]
    async fn test_stale_expected_version() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.approver, new_traveler("CABLE", 10))
            .await
            .unwrap();
        f.service
            .hold_traveler(&f.approver, traveler.id, Some("parts".into()), Some(1))
            .await
            .unwrap();

        let err = f
            .service
            .release_traveler(&f.approver, traveler.id, Some(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NexusError::ConcurrentModification {
                expected: 1,
                actual: 2,
                ..
            }
        ));
        assert_eq!(
            f.service.get_traveler(traveler.id).await.unwrap().status,
            TravelerStatus::OnHold
        );
    }

    #[tokio::test]
    async fn test_hold_and_release() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.operator, new_traveler("CABLE", 10))
            .await
            .unwrap();

        let held = f
            .service
            .hold_traveler(&f.operator, traveler.id, Some("Missing connectors".into()), None)
            .await
            .unwrap();
        assert_eq!(held.status, TravelerStatus::OnHold);
        assert_eq!(held.hold_reason.as_deref(), Some("Missing connectors"));

        let released = f
            .service
            .release_traveler(&f.operator, traveler.id, None)
            .await
            .unwrap();
        assert_eq!(released.status, TravelerStatus::Created);

        // Releasing again is a no-op and does not bump the version
        let again = f
            .service
            .release_traveler(&f.operator, traveler.id, None)
            .await
            .unwrap();
        assert_eq!(again.version, released.version);
    }

    #[tokio::test]
    async fn test_approver_cancel_is_terminal() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.approver, new_traveler("PARTS", 4))
            .await
            .unwrap();
        let cancelled = f
            .service
            .cancel_traveler(&f.approver, traveler.id, Some("Customer withdrew".into()), None)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(cancelled.status, TravelerStatus::Cancelled);
        assert!(cancelled
            .audit_log
            .iter()
            .any(|e| e.new_value.as_deref() == Some("Customer withdrew")));

        let step_id = cancelled.steps[0].id;
        let err = f
            .service
            .start_step(&f.approver, traveler.id, step_id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NexusError::TravelerClosed { .. }));
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.approver, new_traveler("PCB", 1))
            .await
            .unwrap();
        let err = f
            .service
            .delete_traveler(&f.approver, traveler.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NexusError::Forbidden(_)));

        let mut admin = f.approver.user.clone();
        admin.role = UserRole::Admin;
        let admin = Actor::new(admin, RequestMeta::default());
        f.service.delete_traveler(&admin, traveler.id, None).await.unwrap();
        assert!(f.service.get_traveler(traveler.id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let f = fixture().await;
        for traveler_type in ["PCB", "CABLE", "PCB"] {
            f.service
                .create_traveler(&f.operator, new_traveler(traveler_type, 1))
                .await
                .unwrap();
        }

        let all = f.service.list_travelers(&TravelerFilter::default()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let pcb = f
            .service
            .list_travelers(&TravelerFilter {
                traveler_type: Some(TravelerType::Pcb),
                search: Some("acme".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pcb.len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_by_barcode() {
        let f = fixture().await;
        let traveler = f
            .service
            .create_traveler(&f.operator, new_traveler("PCB", 1))
            .await
            .unwrap();

        let scan = f
            .service
            .lookup_by_barcode(&encode(&traveler, BarcodeFormat::Pipe))
            .await
            .unwrap();
        assert_eq!(scan.traveler.id, traveler.id);

        let stale = format!("NEX-{:06}-9999", traveler.id);
        assert!(matches!(
            f.service.lookup_by_barcode(&stale).await,
            Err(NexusError::Validation { .. })
        ));
        assert!(matches!(
            f.service.lookup_by_barcode("NEX-000999-8414").await,
            Err(NexusError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_viewer_cannot_write() {
        let f = fixture().await;
        let mut viewer = f.operator.user.clone();
        viewer.role = UserRole::Viewer;
        let viewer = Actor::new(viewer, RequestMeta::default());
        let err = f
            .service
            .create_traveler(&viewer, new_traveler("PCB", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, NexusError::Forbidden(_)));
    }
}
