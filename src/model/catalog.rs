use serde::Serialize;

/// A shop-floor station a process step can be routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkCenter {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const fn center(code: &'static str, name: &'static str, description: &'static str) -> WorkCenter {
    WorkCenter {
        code,
        name,
        description,
    }
}

pub const WORK_CENTERS: &[WorkCenter] = &[
    center("ENGINEER", "Engineering", "Specification and drawing review"),
    center("MAKE BOM", "Make BOM", "Bill of materials preparation"),
    center("PREPARE", "Prepare", "Kitting and component preparation"),
    center("AUTO INSERTION", "Auto Insertion", "Automated component insertion"),
    center("WASH", "Wash", "Board cleaning"),
    center("MANUAL INNER", "Manual Inner", "Manual inner component placement"),
    center("WAVE SOLDER", "Wave Solder", "Wave soldering"),
    center("TRIM", "Trim", "Lead trimming and board cutting"),
    center("VISUAL INSPECTION", "Visual Inspection", "Visual quality inspection"),
    center("E-TEST", "E-Test", "Electrical testing"),
    center("MANUAL OUTER", "Manual Outer", "Manual outer work and conformal coating"),
    center("SUB-ASSY", "Sub-Assembly", "Cable routing, test and kitting"),
    center("FINAL INSPEC", "Final Inspection", "Final quality inspection"),
    center("LABELING", "Labeling", "Label application"),
    center("PACKAGING", "Packaging", "Packaging for shipment"),
    center("SHIPPING", "Shipping", "Shipping preparation"),
    center("PCB FABRICATION", "PCB Fabrication", "Bare board fabrication"),
    center("WIRE PREP", "Wire Prep", "Wire cutting and stripping"),
    center("CRIMPING", "Crimping", "Connector crimping"),
    center("CABLE ASSEMBLY", "Cable Assembly", "Cable harness assembly"),
    center("TESTING", "Testing", "Functional testing"),
    center("ASSEMBLY", "Assembly", "General assembly"),
    center("QC", "Quality Control", "Quality control check"),
];

/// Case-insensitive lookup, surrounding whitespace ignored.
pub fn find_work_center(code: &str) -> Option<&'static WorkCenter> {
    let wanted = code.trim();
    WORK_CENTERS
        .iter()
        .find(|wc| wc.code.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<_> = WORK_CENTERS.iter().map(|wc| wc.code).collect();
        assert_eq!(codes.len(), WORK_CENTERS.len());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(find_work_center("wave solder").map(|wc| wc.code), Some("WAVE SOLDER"));
        assert_eq!(find_work_center(" E-TEST ").map(|wc| wc.code), Some("E-TEST"));
        assert!(find_work_center("PAINT").is_none());
    }
}
