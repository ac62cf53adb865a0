//! Multi-document DOCX report assembly: normalize each source against a
//! house-style table, renumber every colliding identifier family, and fold
//! the results into one consistent package.

pub mod config;
pub mod docx;
pub mod merge;
pub mod progress;
pub mod seq;
pub mod transform;
pub mod visit;
