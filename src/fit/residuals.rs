//! Weighted residuals and their adapters to the solver crates.
//!
//! `r(p) = (f(p, x) - y) * sqrt(w)` is the single objective every method
//! minimizes (as `Σ r²`). The adapters translate it into each solver's
//! problem trait:
//!
//! - `levenberg_marquardt::LeastSquaresProblem` (residual vector + Jacobian)
//! - `argmin` `CostFunction` / `Gradient` on `Vec<f64>` (sum of squares)
//! - `argmin` `Anneal` with seeded Gaussian proposals (`AnnealSteps`)

use std::cell::{Cell, RefCell};

use argmin::core::{CostFunction, Error as ArgminError, Gradient};
use argmin::solver::simulatedannealing::Anneal;
use finitediff::FiniteDiff;
use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::fit::EvalObserver;
use crate::models::Ansatz;

/// Central finite-difference Jacobian `∂f_i/∂p_j` (N×P) of an ansatz.
pub fn numeric_jacobian<A: Ansatz + ?Sized>(
    ansatz: &A,
    params: &DVector<f64>,
    domain: &DMatrix<f64>,
) -> DMatrix<f64> {
    let p: Vec<f64> = params.iter().copied().collect();
    let model = |q: &Vec<f64>| -> Vec<f64> {
        ansatz
            .evaluate(&DVector::from_column_slice(q), domain)
            .iter()
            .copied()
            .collect()
    };
    // One inner vector per parameter.
    let columns = p.central_jacobian(&model);
    DMatrix::from_fn(domain.ncols(), p.len(), |i, j| columns[j][i])
}

/// The weighted residual function of one fit, with an evaluation counter.
pub(crate) struct WeightedResiduals<'a, A: ?Sized> {
    ansatz: &'a A,
    domain: &'a DMatrix<f64>,
    response: &'a DVector<f64>,
    sqrt_w: DVector<f64>,
    observer: Option<&'a dyn EvalObserver>,
    evaluations: Cell<usize>,
}

impl<'a, A: Ansatz + ?Sized> WeightedResiduals<'a, A> {
    pub(crate) fn new(
        ansatz: &'a A,
        domain: &'a DMatrix<f64>,
        response: &'a DVector<f64>,
        sqrt_w: DVector<f64>,
        observer: Option<&'a dyn EvalObserver>,
    ) -> Self {
        Self {
            ansatz,
            domain,
            response,
            sqrt_w,
            observer,
            evaluations: Cell::new(0),
        }
    }

    /// Number of residual evaluations so far.
    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    pub(crate) fn num_residuals(&self) -> usize {
        self.response.len()
    }

    /// Weighted residuals, or `None` when the model is not finite at `params`.
    pub(crate) fn residuals_at(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
        self.evaluations.set(self.evaluations.get() + 1);
        let model = self.ansatz.evaluate(params, self.domain);
        if model.len() != self.response.len() {
            return None;
        }
        let r = (&model - self.response).component_mul(&self.sqrt_w);
        if let Some(observer) = self.observer {
            observer.observe(params, &model, &r);
        }
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    /// Jacobian of the weighted residuals (N×P).
    pub(crate) fn jacobian_at(&self, params: &DVector<f64>) -> Option<DMatrix<f64>> {
        let mut jac = self
            .ansatz
            .jacobian(params, self.domain)
            .unwrap_or_else(|| numeric_jacobian(self.ansatz, params, self.domain));
        if jac.nrows() != self.sqrt_w.len() || jac.ncols() != params.len() {
            return None;
        }
        for (mut row, w) in jac.row_iter_mut().zip(self.sqrt_w.iter()) {
            row *= *w;
        }
        jac.iter().all(|v| v.is_finite()).then_some(jac)
    }

    /// `Σ r²`; infinite where the model is not finite, so simplex and
    /// annealing steps simply reject such points.
    pub(crate) fn sum_of_squares(&self, params: &DVector<f64>) -> f64 {
        self.residuals_at(params)
            .map(|r| r.norm_squared())
            .unwrap_or(f64::INFINITY)
    }
}

/// Levenberg-Marquardt view: owns the current parameter vector.
pub(crate) struct LmProblem<'p, 'a, A: ?Sized> {
    residuals: &'p WeightedResiduals<'a, A>,
    params: DVector<f64>,
}

impl<'p, 'a, A: Ansatz + ?Sized> LmProblem<'p, 'a, A> {
    pub(crate) fn new(residuals: &'p WeightedResiduals<'a, A>, initial: DVector<f64>) -> Self {
        Self {
            residuals,
            params: initial,
        }
    }

    pub(crate) fn into_params(self) -> DVector<f64> {
        self.params
    }
}

// Manual impl: a derive would demand `A: Clone`, which `dyn Ansatz` is not.
impl<A: ?Sized> Clone for LmProblem<'_, '_, A> {
    fn clone(&self) -> Self {
        Self {
            residuals: self.residuals,
            params: self.params.clone(),
        }
    }
}

impl<A: Ansatz + ?Sized> LeastSquaresProblem<f64, Dyn, Dyn> for LmProblem<'_, '_, A> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.residuals.residuals_at(&self.params)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        self.residuals.jacobian_at(&self.params)
    }
}

/// argmin view: scalar cost `Σ r²` with gradient `2 Jᵀ r`.
pub(crate) struct SumOfSquares<'p, 'a, A: ?Sized> {
    residuals: &'p WeightedResiduals<'a, A>,
}

impl<'p, 'a, A: Ansatz + ?Sized> SumOfSquares<'p, 'a, A> {
    pub(crate) fn new(residuals: &'p WeightedResiduals<'a, A>) -> Self {
        Self { residuals }
    }
}

impl<A: Ansatz + ?Sized> CostFunction for SumOfSquares<'_, '_, A> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok(self.residuals.sum_of_squares(&DVector::from_column_slice(param)))
    }
}

impl<A: Ansatz + ?Sized> Gradient for SumOfSquares<'_, '_, A> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, ArgminError> {
        let p = DVector::from_column_slice(param);
        let r = self
            .residuals
            .residuals_at(&p)
            .ok_or_else(|| ArgminError::msg("model is not finite at the current parameters"))?;
        let jac = self
            .residuals
            .jacobian_at(&p)
            .ok_or_else(|| ArgminError::msg("Jacobian is not finite at the current parameters"))?;
        Ok((jac.tr_mul(&r) * 2.0).iter().copied().collect())
    }
}

/// Smallest proposal width for parameters that start at (or near) zero.
const MIN_PROPOSAL_WIDTH: f64 = 1e-3;

/// argmin annealing view: the sum of squares plus a neighbour generator.
///
/// Proposals add `width_j * (T / T0) * z` to each parameter, with `z`
/// standard normal and `width_j` fixed from the starting point, so steps
/// shrink as the schedule cools.
pub(crate) struct AnnealSteps<'p, 'a, A: ?Sized> {
    cost: SumOfSquares<'p, 'a, A>,
    widths: Vec<f64>,
    initial_temperature: f64,
    rng: RefCell<StdRng>,
}

impl<'p, 'a, A: Ansatz + ?Sized> AnnealSteps<'p, 'a, A> {
    pub(crate) fn new(
        residuals: &'p WeightedResiduals<'a, A>,
        start: &[f64],
        step_scale: f64,
        initial_temperature: f64,
        seed: u64,
    ) -> Self {
        Self {
            cost: SumOfSquares::new(residuals),
            widths: start
                .iter()
                .map(|v| step_scale * v.abs().max(MIN_PROPOSAL_WIDTH))
                .collect(),
            initial_temperature,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<A: Ansatz + ?Sized> CostFunction for AnnealSteps<'_, '_, A> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        self.cost.cost(param)
    }
}

impl<A: Ansatz + ?Sized> Anneal for AnnealSteps<'_, '_, A> {
    type Param = Vec<f64>;
    type Output = Vec<f64>;
    type Float = f64;

    fn anneal(&self, param: &Self::Param, temperature: f64) -> Result<Self::Output, ArgminError> {
        let shrink = temperature / self.initial_temperature;
        let mut rng = self.rng.borrow_mut();
        Ok(param
            .iter()
            .zip(&self.widths)
            .map(|(&x, &w)| {
                let z: f64 = rng.sample(StandardNormal);
                x + shrink * w * z
            })
            .collect())
    }
}
