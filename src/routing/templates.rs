// Default routings per traveler type

use serde::Serialize;

use crate::model::{ProcessStep, StepStatus, TravelerType};

/// One line of a default routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTemplate {
    pub sequence: u32,
    pub work_center: &'static str,
    pub instruction: &'static str,
}

const fn step(sequence: u32, work_center: &'static str, instruction: &'static str) -> StepTemplate {
    StepTemplate {
        sequence,
        work_center,
        instruction,
    }
}

const PCB_ASSEMBLY: &[StepTemplate] = &[
    step(1, "ENGINEER", "Review PCB assembly specifications"),
    step(2, "MAKE BOM", "Create Bill of Materials"),
    step(6, "PREPARE", "Prepare components"),
    step(10, "AUTO INSERTION", "Automated component insertion"),
    step(12, "WASH", "Wash PCB assembly"),
    step(16, "MANUAL INNER", "Manual inner component placement"),
    step(30, "WAVE SOLDER", "Wave soldering process"),
    step(32, "WASH", "Post-solder cleaning"),
    step(34, "TRIM", "PCB Trim/Cut"),
    step(36, "VISUAL INSPECTION", "Visual inspection"),
    step(40, "E-TEST", "Electrical testing"),
    step(42, "MANUAL OUTER", "Conformal Coating"),
    step(44, "SUB-ASSY", "Cable routing/test/kit"),
    step(46, "FINAL INSPEC", "Final quality inspection"),
    step(48, "LABELING", "Apply labels"),
    step(50, "PACKAGING", "Package for shipment"),
    step(52, "SHIPPING", "Prepare for shipping"),
];

const PCB: &[StepTemplate] = &[
    step(1, "ENGINEER", "Review PCB specifications"),
    step(2, "PCB FABRICATION", "PCB fabrication process"),
    step(3, "VISUAL INSPECTION", "Visual inspection"),
];

const CABLE: &[StepTemplate] = &[
    step(1, "WIRE PREP", "Prepare wires and cables"),
    step(2, "CRIMPING", "Crimp connectors"),
    step(3, "VISUAL INSPECTION", "Visual inspection"),
];

const CABLE_ASSEMBLY: &[StepTemplate] = &[
    step(1, "WIRE PREP", "Prepare wires"),
    step(2, "CRIMPING", "Crimp connectors"),
    step(3, "CABLE ASSEMBLY", "Assemble cable harness"),
    step(4, "TESTING", "Test cable assembly"),
    step(5, "LABELING", "Apply labels"),
    step(6, "PACKAGING", "Package for shipment"),
];

const PCB_CABLE_ASSEMBLY: &[StepTemplate] = &[
    step(1, "ENGINEER", "Review PCB and cable assembly specifications"),
    step(2, "ASSEMBLY", "PCB assembly"),
    step(3, "CABLE ASSEMBLY", "Cable assembly and routing"),
    step(4, "TESTING", "Integrated testing"),
    step(5, "FINAL INSPEC", "Final quality inspection"),
    step(6, "PACKAGING", "Package for shipment"),
];

const PARTS: &[StepTemplate] = &[
    step(1, "ENGINEER", "Review parts specifications"),
    step(2, "PREPARE", "Prepare and sort parts"),
    step(3, "QC", "Quality control check"),
    step(4, "PACKAGING", "Package parts"),
];

const ASSEMBLY: &[StepTemplate] = &[
    step(1, "ENGINEER", "Review assembly specifications"),
    step(2, "PREPARE", "Prepare components"),
    step(3, "ASSEMBLY", "General assembly process"),
    step(4, "TESTING", "Test assembled product"),
    step(5, "FINAL INSPEC", "Final quality inspection"),
    step(6, "PACKAGING", "Package for shipment"),
];

pub fn template_for(traveler_type: TravelerType) -> &'static [StepTemplate] {
    match traveler_type {
        TravelerType::Pcb => PCB,
        TravelerType::PcbAssembly => PCB_ASSEMBLY,
        TravelerType::Cable => CABLE,
        TravelerType::CableAssembly => CABLE_ASSEMBLY,
        TravelerType::PcbCableAssembly => PCB_CABLE_ASSEMBLY,
        TravelerType::Parts => PARTS,
        TravelerType::Assembly => ASSEMBLY,
    }
}

/// Fresh pending steps for a new traveler; each step carries the traveler quantity.
pub fn instantiate_steps(traveler_type: TravelerType, quantity: u32) -> Vec<ProcessStep> {
    template_for(traveler_type)
        .iter()
        .map(|t| ProcessStep {
            id: uuid::Uuid::new_v4(),
            sequence: t.sequence,
            work_center: t.work_center.to_string(),
            instruction: t.instruction.to_string(),
            quantity,
            accepted: 0,
            rejected: 0,
            assignee: None,
            sign: None,
            completed_date: None,
            status: StepStatus::Pending,
        })
        .collect()
}

/// Catalog entry describing one traveler type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerTypeInfo {
    #[serde(rename = "type")]
    pub traveler_type: TravelerType,
    pub label: &'static str,
    pub step_count: usize,
}

pub fn traveler_types() -> Vec<TravelerTypeInfo> {
    TravelerType::ALL
        .into_iter()
        .map(|traveler_type| TravelerTypeInfo {
            traveler_type,
            label: traveler_type.label(),
            step_count: template_for(traveler_type).len(),
        })
        .collect()
}
