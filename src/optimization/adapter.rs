//! Adapter that exposes a user [`LogLikelihood`] as an `argmin` problem.
//!
//! A *maximization* of a log-likelihood `ℓ(θ)` becomes a *minimization*
//! problem with cost `c(θ) = -ℓ(θ)`. Analytic gradients (if provided by the
//! user) are negated accordingly. When no analytic gradient exists, the
//! **cost** closure is finite-differenced, so no sign flip is needed in that
//! branch.
use crate::optimization::{
    errors::OptError,
    traits::{validate_grad, Cost, Grad, LogLikelihood, Theta},
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Bridges a user [`LogLikelihood`] to argmin's `CostFunction` and `Gradient`.
///
/// - `CostFunction::cost` returns `-ℓ(θ)` (negative log-likelihood).
/// - `Gradient::gradient` returns:
///   - `-∇ℓ(θ)` if the user provides an analytic gradient, or
///   - a finite-difference gradient of the cost (no sign flip needed).
#[derive(Debug, Clone)]
pub struct MleProblem<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> MleProblem<'a, F> {
    /// Construct a new adapter over a user [`LogLikelihood`] and its data.
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for MleProblem<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate the cost `c(θ) = -ℓ(θ)`.
    ///
    /// # Errors
    /// Propagates any `OptError` from the user's `value`; a non-finite
    /// log-likelihood is reported as [`OptError::NonFiniteCost`].
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for MleProblem<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate the gradient of the cost at `θ`.
    ///
    /// Behavior:
    /// - If the user implements `grad(θ, data)`, validate it and return
    ///   `-grad` (the cost is `-ℓ`).
    /// - Otherwise, finite-difference the cost: central differences first,
    ///   falling back to forward differences if an evaluation failed or the
    ///   central gradient did not validate.
    ///
    /// The FD closure must return `f64`, so errors raised inside it are
    /// captured in a `RefCell` slot and replayed afterwards.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_fn = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let central = theta.central_diff(&cost_fn);
                let central_failed = closure_err.borrow().is_some();
                if !central_failed && validate_grad(&central, dim).is_ok() {
                    return Ok(central);
                }
                closure_err.replace(None);
                let forward = theta.forward_diff(&cost_fn);
                if let Some(err) = closure_err.take() {
                    return Err(err);
                }
                validate_grad(&forward, dim)?;
                Ok(forward)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use ndarray::array;

    /// Concave toy log-likelihood `ℓ(θ) = -θ·θ` with an analytic gradient.
    struct Quadratic;

    impl LogLikelihood for Quadratic {
        type Data = ();

        fn value(&self, theta: &Theta, _data: &()) -> OptResult<Cost> {
            Ok(-theta.dot(theta))
        }

        fn check(&self, _theta: &Theta, _data: &()) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, _data: &()) -> OptResult<Grad> {
            Ok(theta.mapv(|t| -2.0 * t))
        }
    }

    /// Same objective, but without an analytic gradient (FD fallback path).
    struct QuadraticNoGrad;

    impl LogLikelihood for QuadraticNoGrad {
        type Data = ();

        fn value(&self, theta: &Theta, _data: &()) -> OptResult<Cost> {
            Ok(-theta.dot(theta))
        }

        fn check(&self, _theta: &Theta, _data: &()) -> OptResult<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // The adapter must negate the user's value and analytic gradient, since
    // argmin minimizes the cost `-ℓ(θ)`.
    //
    // Given
    // -----
    // - `ℓ(θ) = -θ·θ` at `θ = [1, 2]` (ℓ = -5, ∇ℓ = [-2, -4]).
    //
    // Expect
    // ------
    // - `cost = 5` and `gradient = [2, 4]`.
    fn adapter_flips_sign_of_value_and_gradient() {
        let f = Quadratic;
        let problem = MleProblem::new(&f, &());
        let theta = array![1.0, 2.0];
        assert!((problem.cost(&theta).unwrap() - 5.0).abs() < 1e-12);
        let grad = problem.gradient(&theta).unwrap();
        assert!((grad[0] - 2.0).abs() < 1e-12);
        assert!((grad[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Without an analytic gradient, the adapter finite-differences the cost
    // and the result approximates the true cost gradient.
    //
    // Given
    // -----
    // - `c(θ) = θ·θ` at `θ = [1.5, -0.5]` (∇c = [3, -1]).
    //
    // Expect
    // ------
    // - The FD gradient matches `[3, -1]` to ~1e-5.
    fn adapter_falls_back_to_finite_differences() {
        let f = QuadraticNoGrad;
        let problem = MleProblem::new(&f, &());
        let theta = array![1.5, -0.5];
        let grad = problem.gradient(&theta).unwrap();
        assert!((grad[0] - 3.0).abs() < 1e-5);
        assert!((grad[1] + 1.0).abs() < 1e-5);
    }
}
