//! High-level entry point for maximizing a user-provided [`LogLikelihood`].
//!
//! This selects an L-BFGS solver with either Hager–Zhang or More–Thuente
//! line search, wraps the model in an [`MleProblem`] (which *minimizes*
//! `-ℓ(θ)`), configures the executor, and normalizes the result into an
//! [`OptimOutcome`].
use crate::optimization::{
    adapter::MleProblem,
    errors::OptResult,
    traits::{
        Cost, Grad, LineSearcher, LogLikelihood, MleOptions, OptimOutcome, Theta,
        DEFAULT_LBFGS_MEM,
    },
};
use argmin::core::{Executor, State};
use argmin::solver::linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch};
use argmin::solver::quasinewton::LBFGS;

/// Hager–Zhang line search over the crate's numeric aliases.
type HagerZhangLs = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search over the crate's numeric aliases.
type MoreThuenteLs = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// L-BFGS with Hager–Zhang line search.
type LbfgsHagerZhang = LBFGS<HagerZhangLs, Theta, Grad, Cost>;

/// L-BFGS with More–Thuente line search.
type LbfgsMoreThuente = LBFGS<MoreThuenteLs, Theta, Grad, Cost>;

/// Maximize a log-likelihood `ℓ(θ)` using L-BFGS with the chosen line search.
///
/// # Behavior
/// - Validates the initial guess via `f.check(theta0, data)`.
/// - Wraps `(f, data)` in an [`MleProblem`] that exposes a *minimization*
///   problem `c(θ) = -ℓ(θ)` to argmin.
/// - Builds an L-BFGS solver per `opts.line_searcher` and runs it with the
///   configured tolerances and iteration cap.
///
/// # Errors
/// - Propagates any error from `f.check`.
/// - Propagates solver construction errors (invalid tolerances).
/// - Propagates runtime errors from argmin (e.g., line search failures).
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MleOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = MleProblem::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
            let solver = configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLs::new(), mem), opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
            let solver = configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLs::new(), mem), opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

/// Apply optional gradient / cost-change tolerances from `opts` to a freshly
/// built L-BFGS solver. Initial parameters and `max_iters` are runtime
/// concerns handled by [`run_lbfgs`].
fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MleOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(tol_grad) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(tol_grad)?;
    }
    if let Some(tol_cost) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(tol_cost)?;
    }
    Ok(solver)
}

/// Run an argmin optimization for a log-likelihood problem.
///
/// Shared runner for both line-search variants: wires up the adapter, the
/// initial parameter vector, the optional iteration cap, and (behind the
/// `obs_slog` feature) a terminal observer when `opts.verbose` is set, then
/// converts the solver state into an [`OptimOutcome`].
///
/// # Errors
/// - Propagates any argmin runtime error via the crate's
///   `From<argmin::core::Error>` conversion.
/// - Propagates validation errors from [`OptimOutcome::new`].
fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MleOptions, problem: MleProblem<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: argmin::core::Solver<
            MleProblem<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), f64>,
        > + Send
        + 'static,
{
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}
