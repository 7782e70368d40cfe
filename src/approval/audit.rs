use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Actor, AuditAction, AuditEntry, FieldChange, Traveler};

/// Append one audit entry to the traveler's history.
pub fn record(
    traveler: &mut Traveler,
    actor: &Actor,
    action: AuditAction,
    change: Option<FieldChange>,
    now: DateTime<Utc>,
) {
    let (field_changed, old_value, new_value) = match change {
        Some(change) => (Some(change.field), change.old_value, change.new_value),
        None => (None, None, None),
    };

    traveler.audit_log.push(AuditEntry {
        id: Uuid::new_v4(),
        traveler_id: traveler.id,
        user_id: actor.user.id,
        user_name: actor.user.display_name(),
        action,
        field_changed,
        old_value,
        new_value,
        timestamp: now,
        ip_address: actor.meta.ip_address.clone(),
        user_agent: actor.meta.user_agent.clone(),
    });
}

/// One entry per changed field. Nothing is written when nothing changed.
pub fn record_changes(
    traveler: &mut Traveler,
    actor: &Actor,
    action: AuditAction,
    changes: Vec<FieldChange>,
    now: DateTime<Utc>,
) {
    for change in changes {
        record(traveler, actor, action, Some(change), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTraveler, RequestMeta, User, UserRole};

    fn actor() -> Actor {
        Actor::new(
            User {
                id: 4,
                username: "jsmith".into(),
                first_name: "Jo".into(),
                last_name: "Smith".into(),
                email: String::new(),
                role: UserRole::Supervisor,
                is_approver: true,
            },
            RequestMeta {
                ip_address: "10.0.0.8".into(),
                user_agent: "scanner/1.0".into(),
            },
        )
    }

    #[test]
    fn test_entries_carry_request_metadata() {
        let mut t = Traveler::new(
            1,
            NewTraveler {
                job_number: "8414".into(),
                traveler_type: "PCB".into(),
                part_number: "P".into(),
                revision: "A".into(),
                quantity: 1,
                ..Default::default()
            },
            4,
            Utc::now(),
        )
        .unwrap();

        record_changes(&mut t, &actor(), AuditAction::Updated, Vec::new(), Utc::now());
        assert!(t.audit_log.is_empty());

        record_changes(
            &mut t,
            &actor(),
            AuditAction::Updated,
            vec![
                FieldChange::new("revision", Some("A".into()), Some("B".into())),
                FieldChange::new("specs", Some(String::new()), Some("IPC-A-610".into())),
            ],
            Utc::now(),
        );

        assert_eq!(t.audit_log.len(), 2);
        let entry = &t.audit_log[0];
        assert_eq!(entry.user_name, "Jo Smith");
        assert_eq!(entry.ip_address, "10.0.0.8");
        assert_eq!(entry.field_changed.as_deref(), Some("revision"));
        assert_eq!(entry.new_value.as_deref(), Some("B"));
    }
}
