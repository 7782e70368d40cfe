use chrono::NaiveDate;
use uuid::Uuid;

use super::TravelerService;
use crate::approval::audit;
use crate::error::{Entity, NexusError, Result};
use crate::model::{
    Actor, AuditAction, CoatingRecord, CoatingStatus, FieldChange, NewCoating, TravelerId,
};

impl TravelerService {
    pub async fn list_coatings(&self, id: TravelerId) -> Result<Vec<CoatingRecord>> {
        Ok(self.load(id).await?.coatings)
    }

    /// Record a batch sent out for coating
    pub async fn add_coating(
        &self,
        actor: &Actor,
        id: TravelerId,
        input: NewCoating,
        expected_version: Option<u64>,
    ) -> Result<CoatingRecord> {
        actor.ensure_can_write()?;
        let record = CoatingRecord::new(input)?;
        let (_, record) = self
            .mutate(id, expected_version, |traveler, now| {
                traveler.coatings.push(record.clone());
                audit::record(
                    traveler,
                    actor,
                    AuditAction::Updated,
                    Some(FieldChange::new(
                        format!("coating.{}", record.id),
                        None,
                        Some(format!("{} {}", record.coating_type, record.status)),
                    )),
                    now,
                );
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    pub async fn advance_coating(
        &self,
        actor: &Actor,
        id: TravelerId,
        coating_id: Uuid,
        status: CoatingStatus,
        on: NaiveDate,
        expected_version: Option<u64>,
    ) -> Result<CoatingRecord> {
        actor.ensure_can_write()?;
        let (_, record) = self
            .mutate(id, expected_version, |traveler, now| {
                let record = traveler
                    .coatings
                    .iter_mut()
                    .find(|c| c.id == coating_id)
                    .ok_or_else(|| NexusError::not_found(Entity::Coating, coating_id))?;
                let previous = record.status;
                record.advance(status, on)?;
                let record = record.clone();
                audit::record(
                    traveler,
                    actor,
                    AuditAction::Updated,
                    Some(FieldChange::new(
                        format!("coating.{}.status", record.id),
                        Some(previous.to_string()),
                        Some(record.status.to_string()),
                    )),
                    now,
                );
                Ok(record)
            })
            .await?;
        Ok(record)
    }
}
