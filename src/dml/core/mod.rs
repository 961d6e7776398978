//! Core building blocks of the dynamic-DML pipeline: validated panel data,
//! sequence/policy specifications, seeded fold partitioning, run-time
//! options, the cross-fitting engine, score construction, and summary
//! rendering.

pub mod data;
pub mod folds;
pub mod nuisance;
pub mod options;
pub mod policy;
pub mod scores;
pub mod summary;
