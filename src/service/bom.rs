use super::TravelerService;
use crate::approval::audit;
use crate::error::Result;
use crate::model::{Actor, AuditAction, BomItem, FieldChange, NewBomItem, TravelerId};

impl TravelerService {
    pub async fn list_bom(&self, id: TravelerId) -> Result<Vec<BomItem>> {
        Ok(self.load(id).await?.bom_items)
    }

    /// Append a line to the traveler's bill of materials
    pub async fn add_bom_item(
        &self,
        actor: &Actor,
        id: TravelerId,
        input: NewBomItem,
        expected_version: Option<u64>,
    ) -> Result<BomItem> {
        actor.ensure_can_write()?;
        let (_, item) = self
            .mutate(id, expected_version, |traveler, now| {
                let item = BomItem::new(input, now)?;
                traveler.bom_items.push(item.clone());
                audit::record(
                    traveler,
                    actor,
                    AuditAction::Updated,
                    Some(FieldChange::new(
                        format!("bom.{}", item.id),
                        None,
                        Some(format!("{} x{}", item.part_number, item.quantity)),
                    )),
                    now,
                );
                Ok(item)
            })
            .await?;
        Ok(item)
    }
}
