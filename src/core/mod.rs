mod engine;
pub mod solver;
mod types;

pub use engine::{depletion_year, project, project_with_summary, summarize};
pub(crate) use engine::round_half_up;
pub use types::{Projection, ProjectionInputs, Summary, YearRecord};
