use anyhow::Result;

use crate::barcode::{parse, BarcodeFormat};

pub struct BarcodeParseCommand {
    pub data: String,
}

impl BarcodeParseCommand {
    pub fn new(data: String) -> Self {
        Self { data }
    }

    pub fn execute(&self) -> Result<()> {
        let scan = parse(&self.data)?;
        let format = match scan.format {
            BarcodeFormat::Linear => "linear",
            BarcodeFormat::Pipe => "pipe",
        };
        println!("🔎 Decoded {} barcode", format);
        println!("   Traveler:   {}", scan.traveler_id);
        println!("   Job number: {}", scan.job_number);
        if let Some(part) = &scan.part_number {
            println!("   Part:       {}", part);
        }
        if let Some(customer) = &scan.customer_code {
            println!("   Customer:   {}", customer);
        }
        Ok(())
    }
}
