use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{NexusError, Result};
use crate::model::{Traveler, TravelerId, BARCODE_DELIMITER};

const LINEAR_PREFIX: &str = "NEX";
const PIPE_PREFIX: &str = "NEXUS";

static LINEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^NEX-(\d{6,})-(.+)$").expect("linear barcode pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarcodeFormat {
    /// `NEX-000123-8414`, printed as a 1D code
    Linear,
    /// `NEXUS|123|8414|PN-100|ACME`, printed as a 2D code
    Pipe,
}

/// What a scanner read, decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedBarcode {
    pub traveler_id: TravelerId,
    pub barcode: String,
    pub format: BarcodeFormat,
    pub job_number: String,
    pub part_number: Option<String>,
    pub customer_code: Option<String>,
}

/// Both encodings for one traveler, for label printing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerBarcodes {
    pub traveler_id: TravelerId,
    pub linear: String,
    pub pipe: String,
    pub job_number: String,
    pub display_job_number: String,
    pub part_number: String,
    pub part_description: String,
}

impl TravelerBarcodes {
    pub fn for_traveler(traveler: &Traveler) -> Self {
        Self {
            traveler_id: traveler.id,
            linear: encode(traveler, BarcodeFormat::Linear),
            pipe: encode(traveler, BarcodeFormat::Pipe),
            job_number: traveler.job_number.clone(),
            display_job_number: traveler.display_job_number(),
            part_number: traveler.part_number.clone(),
            part_description: traveler.part_description.clone(),
        }
    }
}

pub fn encode(traveler: &Traveler, format: BarcodeFormat) -> String {
    match format {
        BarcodeFormat::Linear => {
            format!("{LINEAR_PREFIX}-{:06}-{}", traveler.id, traveler.job_number)
        }
        BarcodeFormat::Pipe => [
            PIPE_PREFIX.to_string(),
            traveler.id.to_string(),
            traveler.job_number.clone(),
            traveler.part_number.clone(),
            traveler.customer_code.clone(),
        ]
        .join(&BARCODE_DELIMITER.to_string()),
    }
}

/// Decode either barcode format. Scanner line endings are ignored.
pub fn parse(input: &str) -> Result<ScannedBarcode> {
    let data = input.trim();

    if data.starts_with(&format!("{PIPE_PREFIX}{BARCODE_DELIMITER}")) {
        return parse_pipe(data);
    }
    if let Some(captures) = LINEAR_PATTERN.captures(data) {
        let traveler_id = parse_id(&captures[1], data)?;
        return Ok(ScannedBarcode {
            traveler_id,
            barcode: data.to_string(),
            format: BarcodeFormat::Linear,
            job_number: captures[2].to_string(),
            part_number: None,
            customer_code: None,
        });
    }

    Err(NexusError::UnrecognizedFormat(preview(data)))
}

fn parse_pipe(data: &str) -> Result<ScannedBarcode> {
    let parts: Vec<&str> = data.split(BARCODE_DELIMITER).collect();
    let [_, id, job, part, customer] = parts.as_slice() else {
        return Err(NexusError::UnrecognizedFormat(preview(data)));
    };
    if job.is_empty() {
        return Err(NexusError::UnrecognizedFormat(preview(data)));
    }

    Ok(ScannedBarcode {
        traveler_id: parse_id(id, data)?,
        barcode: data.to_string(),
        format: BarcodeFormat::Pipe,
        job_number: job.to_string(),
        part_number: Some(part.to_string()),
        customer_code: Some(customer.to_string()),
    })
}

fn parse_id(digits: &str, data: &str) -> Result<TravelerId> {
    digits
        .parse::<TravelerId>()
        .map_err(|_| NexusError::UnrecognizedFormat(preview(data)))
}

// Scans can be arbitrary input; keep error messages short
fn preview(data: &str) -> String {
    const LIMIT: usize = 40;
    if data.chars().count() <= LIMIT {
        format!("'{data}'")
    } else {
        let head: String = data.chars().take(LIMIT).collect();
        format!("'{head}...'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTraveler;
    use chrono::Utc;

    fn traveler(id: TravelerId, job: &str) -> Traveler {
        Traveler::new(
            id,
            NewTraveler {
                job_number: job.into(),
                traveler_type: "PCB".into(),
                part_number: "PN-100".into(),
                revision: "A".into(),
                quantity: 1,
                customer_code: "ACME".into(),
                ..Default::default()
            },
            1,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_linear_round_trip() {
        let t = traveler(42, "8414");
        let code = encode(&t, BarcodeFormat::Linear);
        assert_eq!(code, "NEX-000042-8414");

        let scanned = parse(&code).unwrap();
        assert_eq!(scanned.traveler_id, 42);
        assert_eq!(scanned.job_number, "8414");
        assert_eq!(scanned.format, BarcodeFormat::Linear);
        assert_eq!(scanned.part_number, None);
    }

    #[test]
    fn test_pipe_round_trip() {
        let t = traveler(7, "8414");
        let code = encode(&t, BarcodeFormat::Pipe);
        assert_eq!(code, "NEXUS|7|8414|PN-100|ACME");

        let scanned = parse(&format!("{code}\r\n")).unwrap();
        assert_eq!(scanned.traveler_id, 7);
        assert_eq!(scanned.barcode, code);
        assert_eq!(scanned.part_number.as_deref(), Some("PN-100"));
        assert_eq!(scanned.customer_code.as_deref(), Some("ACME"));
    }

    #[test]
    fn test_job_numbers_with_hyphens_survive() {
        let t = traveler(1_234_567, "J-100-B");
        let code = encode(&t, BarcodeFormat::Linear);
        assert_eq!(code, "NEX-1234567-J-100-B");

        let scanned = parse(&code).unwrap();
        assert_eq!(scanned.traveler_id, 1_234_567);
        assert_eq!(scanned.job_number, "J-100-B");
    }

    #[test]
    fn test_pipe_with_empty_customer() {
        let mut t = traveler(3, "8414");
        t.customer_code.clear();
        let scanned = parse(&encode(&t, BarcodeFormat::Pipe)).unwrap();
        assert_eq!(scanned.customer_code.as_deref(), Some(""));
    }

    #[test]
    fn test_unrecognized_inputs() {
        for input in [
            "",
            "hello",
            "NEX-12-8414",
            "NEX-000042-",
            "NEXUS|7|8414|PN",
            "NEXUS|7|8414|PN|ACME|extra",
            "NEXUS|abc|8414|PN|ACME",
            "NEXUS|7||PN|ACME",
        ] {
            assert!(
                matches!(parse(input), Err(NexusError::UnrecognizedFormat(_))),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn test_label_set_includes_display_job_number() {
        let mut t = traveler(5, "8414");
        t.lead_free = true;
        let labels = TravelerBarcodes::for_traveler(&t);
        assert_eq!(labels.display_job_number, "8414L");
        assert_eq!(labels.linear, "NEX-000005-8414");
    }
}
