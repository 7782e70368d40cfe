use anyhow::Result;

use crate::model::{find_work_center, TravelerType};
use crate::routing::{template_for, traveler_types};

pub struct TemplatesCommand {
    pub traveler_type: Option<String>,
}

impl TemplatesCommand {
    pub fn new(traveler_type: Option<String>) -> Self {
        Self { traveler_type }
    }

    pub fn execute(&self) -> Result<()> {
        match self.traveler_type.as_deref() {
            None => {
                println!("📋 TRAVELER TYPES");
                println!("================");
                for info in traveler_types() {
                    println!("  {:<20} {:<22} {} steps", info.traveler_type.as_str(), info.label, info.step_count);
                }
            }
            Some(name) => {
                let traveler_type: TravelerType = name.parse()?;
                println!("📋 DEFAULT ROUTING: {}", traveler_type.label());
                println!("==================");
                for step in template_for(traveler_type) {
                    let center = find_work_center(step.work_center)
                        .map(|wc| wc.name)
                        .unwrap_or(step.work_center);
                    println!("  {:>3}  {:<24} {}", step.sequence, center, step.instruction);
                }
            }
        }
        Ok(())
    }
}
