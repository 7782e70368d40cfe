// Scannable identifiers for travelers

pub mod codec;

pub use codec::{encode, parse, BarcodeFormat, ScannedBarcode, TravelerBarcodes};
