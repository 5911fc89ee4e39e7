//! Pipeline logic.
//!
//! This module contains:
//! - Scanner: Ant-style file set matching
//! - Aggregator: ordered, de-duplicated path collection
//! - Instrument / Project / Copy: the instrumentation goals
//! - Merge: metadata discovery and merging
//! - Repackage: archive assembly
//! - Report: report input assembly

pub mod aggregator;
pub mod copy;
pub mod instrument;
pub mod merge;
pub mod project;
pub mod repackage;
pub mod report;
pub mod scanner;

// Re-export commonly used types
pub use aggregator::PathAggregator;
pub use copy::{CopyConfig, CopySummary, RepositoryCopier};
pub use instrument::{InstrumentConfig, InstrumentPipeline, InstrumentSummary};
pub use merge::{merge_all, MergeConfig, MergeOutcome};
pub use project::{ProjectInstrumentConfig, ProjectInstrumenter, ProjectSummary};
pub use repackage::{repackage, RepackageSummary};
pub use report::{assemble, ReportConfig, ReportDefaults, ReportInputs, ReportPipeline, StandaloneReportConfig};
pub use scanner::{scan, CompiledFileSet};
