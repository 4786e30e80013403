//! Whole-system evaluation over a set of constraints.
//!
//! An [`Assembly`] owns the constraint list of one sketch and turns the
//! per-constraint scalar contract into the vector quantities a least squares
//! driver consumes: the stacked residual vector, the Jacobian with respect
//! to a chosen list of free parameters, and the global step-length bound.
//! Parallel variants of the expensive evaluations are provided through
//! Rayon; they produce bitwise the same results as the sequential ones
//! because each row is computed independently.

use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::constraint::Constraint;
use crate::error::{GcsError, Result};
use crate::params::{ParamHandle, ParamPool, RedirectMap, StepDirection};

/// Number of constraints from which the parallel evaluation paths start to
/// pay for their coordination overhead.
const PARALLEL_THRESHOLD: usize = 64;

/// A constraint system over one parameter pool.
///
/// # Examples
///
/// ```
/// use gcs2d::{Assembly, Constraint, ParamPool, Point};
///
/// let mut pool = ParamPool::new();
/// let p1 = Point::new(pool.add(0.0), pool.add(0.0));
/// let p2 = Point::new(pool.add(3.0), pool.add(4.0));
/// let d = pool.add(5.0);
///
/// let mut sys = Assembly::new();
/// sys.push(Constraint::p2p_distance(&pool, p1, p2, d));
/// sys.push(Constraint::equal(&pool, p2.x, d));
///
/// let r = sys.residuals(&pool);
/// assert_eq!(r.len(), 2);
/// assert_eq!(r[0], 0.0);
/// assert_eq!(r[1], -2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    constraints: Vec<Constraint>,
}

impl Assembly {
    /// Create an empty system.
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    /// Create an empty system with room for `capacity` constraints.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            constraints: Vec::with_capacity(capacity),
        }
    }

    /// Append a constraint. Residual and Jacobian rows follow insertion
    /// order.
    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Number of constraints (the residual count).
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the system holds no constraints.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// The constraints in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Every parameter referenced by some constraint's current dependency
    /// list, deduplicated and in pool index order.
    ///
    /// This is the natural column list for [`jacobian`](Assembly::jacobian)
    /// when all referenced parameters are free.
    pub fn referenced_params(&self) -> Vec<ParamHandle> {
        let mut params: Vec<ParamHandle> = self
            .constraints
            .iter()
            .flat_map(|c| c.params().iter().copied())
            .collect();
        params.sort_unstable();
        params.dedup();
        params
    }

    /// Stacked residual vector at the current parameter values.
    ///
    /// Row `i` is the scaled residual of constraint `i`. Degenerate
    /// geometry shows up as non-finite entries; callers check with
    /// [`Array1::iter`] before trusting a solve.
    pub fn residuals(&self, pool: &ParamPool) -> Array1<f64> {
        if self.constraints.len() >= PARALLEL_THRESHOLD {
            return self.residuals_parallel(pool);
        }
        Array1::from_iter(self.constraints.iter().map(|c| c.error(pool)))
    }

    /// [`residuals`](Assembly::residuals) with the rows computed in
    /// parallel.
    pub fn residuals_parallel(&self, pool: &ParamPool) -> Array1<f64> {
        let rows: Vec<f64> = self
            .constraints
            .par_iter()
            .map(|c| c.error(pool))
            .collect();
        Array1::from_vec(rows)
    }

    /// Write the residual vector into a caller-owned buffer.
    ///
    /// Drivers that evaluate every iteration reuse one allocation this way.
    ///
    /// # Returns
    ///
    /// * `Result<()>` - An error if `out` does not have exactly one row per
    ///   constraint
    pub fn residuals_into(&self, pool: &ParamPool, out: &mut Array1<f64>) -> Result<()> {
        if out.len() != self.constraints.len() {
            return Err(GcsError::DimensionMismatch(format!(
                "Expected {} residuals, got a buffer of {}",
                self.constraints.len(),
                out.len()
            )));
        }
        for (slot, c) in out.iter_mut().zip(&self.constraints) {
            *slot = c.error(pool);
        }
        Ok(())
    }

    /// Sum of squared residuals at the current parameter values.
    pub fn squared_error(&self, pool: &ParamPool) -> f64 {
        self.constraints
            .iter()
            .map(|c| {
                let e = c.error(pool);
                e * e
            })
            .sum()
    }

    /// Jacobian of the residual vector with respect to `free`.
    ///
    /// Entry `[i, j]` is the analytic partial of constraint `i` with respect
    /// to `free[j]`. Columns for parameters a constraint does not depend on
    /// are exactly zero.
    ///
    /// # Arguments
    ///
    /// * `pool` - The parameter arena to evaluate against
    /// * `free` - The parameters that form the Jacobian columns
    ///
    /// # Returns
    ///
    /// * `Result<Array2<f64>>` - A `len() x free.len()` matrix, or an error
    ///   if a handle in `free` does not belong to `pool`
    pub fn jacobian(&self, pool: &ParamPool, free: &[ParamHandle]) -> Result<Array2<f64>> {
        for &handle in free {
            pool.get(handle)?;
        }
        if self.constraints.len() >= PARALLEL_THRESHOLD {
            return self.jacobian_checked_parallel(pool, free);
        }
        let mut jac = Array2::zeros((self.constraints.len(), free.len()));
        for (i, c) in self.constraints.iter().enumerate() {
            for (j, &param) in free.iter().enumerate() {
                jac[[i, j]] = c.grad(pool, param);
            }
        }
        Ok(jac)
    }

    /// [`jacobian`](Assembly::jacobian) with the rows computed in parallel.
    pub fn jacobian_parallel(
        &self,
        pool: &ParamPool,
        free: &[ParamHandle],
    ) -> Result<Array2<f64>> {
        for &handle in free {
            pool.get(handle)?;
        }
        self.jacobian_checked_parallel(pool, free)
    }

    fn jacobian_checked_parallel(
        &self,
        pool: &ParamPool,
        free: &[ParamHandle],
    ) -> Result<Array2<f64>> {
        let rows: Vec<Vec<f64>> = self
            .constraints
            .par_iter()
            .map(|c| free.iter().map(|&param| c.grad(pool, param)).collect())
            .collect();

        let mut jac = Array2::zeros((self.constraints.len(), free.len()));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, value) in row.into_iter().enumerate() {
                jac[[i, j]] = value;
            }
        }
        Ok(jac)
    }

    /// Largest safe step-length factor for the proposed direction.
    ///
    /// Folds every constraint's `max_step` over the incoming `limit`; the
    /// result is the factor the driver multiplies into `direction` before
    /// committing it with [`ParamPool::apply_step`].
    pub fn max_step(&self, pool: &ParamPool, direction: &StepDirection, limit: f64) -> f64 {
        self.constraints
            .iter()
            .fold(limit, |lim, c| c.max_step(pool, direction, lim))
    }

    /// Recompute every constraint's conditioning scale from the current
    /// geometry.
    pub fn rescale(&mut self, pool: &ParamPool, coef: f64) {
        for c in &mut self.constraints {
            c.rescale(pool, coef);
        }
    }

    /// Redirect every constraint through the same substitution table.
    pub fn redirect_params(&mut self, map: &RedirectMap) {
        for c in &mut self.constraints {
            c.redirect_params(map);
        }
    }

    /// Undo all redirection, restoring every canonical dependency list.
    pub fn revert_params(&mut self) {
        for c in &mut self.constraints {
            c.revert_params();
        }
    }
}

impl Extend<Constraint> for Assembly {
    fn extend<T: IntoIterator<Item = Constraint>>(&mut self, iter: T) {
        self.constraints.extend(iter);
    }
}

impl FromIterator<Constraint> for Assembly {
    fn from_iter<T: IntoIterator<Item = Constraint>>(iter: T) -> Self {
        Self {
            constraints: Vec::from_iter(iter),
        }
    }
}
