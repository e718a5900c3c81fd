//! Data contracts
//!
//! Records exchanged between the engine's components and with callers:
//!
//! - [`ExploratorySummary`]: generator input
//! - [`Hypothesis`] and [`HypothesisValidation`]: generator and validator output
//! - [`StatisticalTest`]: closed set of procedure identifiers
//! - [`TestSpecification`], [`TestResult`], [`TestFailure`]: executor input and output
//! - [`HypothesisExport`] and [`TestBatchExport`]: serialized pipeline output

pub mod export;
pub mod hypothesis;
pub mod summary;
pub mod test_result;

pub use export::*;
pub use hypothesis::*;
pub use statistical_test::*;
pub use summary::*;
pub use test_result::*;
