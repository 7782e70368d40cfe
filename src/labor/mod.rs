// Labor timer: clock-in/clock-out against travelers and the summaries built on it

pub mod summary;
pub mod timer;

pub use summary::{recent_entries, summarize, week_bounds, LaborFilter, LaborSummary};
pub use timer::{close_entry, open_entry, EmployeeLocks};
