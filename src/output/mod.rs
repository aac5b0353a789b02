pub mod report;

pub use report::{Finding, Report, Reporter};
