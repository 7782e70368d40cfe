// Routing: default templates, step edits, and traveler status

pub mod engine;
pub mod lifecycle;
pub mod templates;

pub use engine::{
    add_step, complete_open_steps, record_step_outcome, remove_step, reorder_step, start_step,
};
pub use lifecycle::{apply_transition, derive_status, StatusTransition, TransitionResult};
pub use templates::{instantiate_steps, template_for, traveler_types, StepTemplate, TravelerTypeInfo};
