//! Output sinks for harvested rows and the run summary.
//!
//! # Submodules
//!
//! - [`csv`]: Writes [`VoteRow`](crate::models::VoteRow) and
//!   [`VetoRow`](crate::models::VetoRow) tables
//! - [`json`]: Writes the [`RunSummary`](crate::aggregate::RunSummary) for auditing
//!
//! # Output Structure
//!
//! ```text
//! UNResult.csv        # country,vote result,title,vote date,resolution
//! UNResultVeto.csv    # vote date,resolution,topic,country
//! summary.json        # optional, --summary-json
//! ```

pub mod csv;
pub mod json;
