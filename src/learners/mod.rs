//! learners — pluggable nuisance estimators and bundled references.
//!
//! The estimation core consumes only the capability contracts in
//! [`traits`]: a regression surface ([`OutcomeLearner`]) and a
//! probability-producing assignment surface ([`PropensityLearner`]). The
//! bundled [`RidgeRegressor`] and [`LogisticRegression`] satisfy those
//! contracts deterministically; external estimators (including AutoML
//! backends) plug in through the closure adapters without subclassing
//! anything.

pub mod errors;
pub mod linear;
pub mod logistic;
pub mod traits;

pub use self::errors::{LearnerError, LearnerResult};
pub use self::linear::RidgeRegressor;
pub use self::logistic::LogisticRegression;
pub use self::traits::{
    FnOutcomeLearner, FnPropensityLearner, NuisanceLearners, OutcomeLearner, PropensityLearner,
};
