// Approval gate and append-only audit history

pub mod audit;
pub mod gate;

pub use gate::{ensure_approver, evaluate, open_request, GateDecision};
