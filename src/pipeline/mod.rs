pub mod fanout;
pub mod orchestrator;
pub mod report;
pub mod specialist;
pub mod synthesize;

pub use orchestrator::{Analysis, run_analysis};
pub use specialist::Role;
