//! Model states tying the core pipeline together. Currently the two-period
//! estimator; longer horizons would live alongside it.

pub mod two_period;
