pub mod bias_table;
pub mod corrector;
pub mod date_key;
pub mod pipeline;
pub mod report;

mod traits;

pub use bias_table::BiasTable;
pub use corrector::LevelBroadcastCorrector;
pub use date_key::DateKeyExtractor;
pub use pipeline::CorrectionPipeline;
pub use report::{CorrectionReport, ReportError, render_human_summary, write_report_file};
pub use traits::{DatasetStore, RawBias};
