//! Plain scalar relations between individual parameters.

use serde::{Deserialize, Serialize};

use crate::params::{ParamHandle, ParamPool};

/// Constrains two parameters to the same value: `p1 - p2 = 0`.
///
/// # Examples
///
/// ```
/// use gcs2d::{Constraint, ParamPool};
///
/// let mut pool = ParamPool::new();
/// let p1 = pool.add(3.0);
/// let p2 = pool.add(5.0);
/// let c = Constraint::equal(&pool, p1, p2);
/// assert_eq!(c.error(&pool), -2.0);
/// assert_eq!(c.grad(&pool, p1), 1.0);
/// assert_eq!(c.grad(&pool, p2), -1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equal {
    pub(crate) pvec: [ParamHandle; 2],
    pub(crate) origpvec: [ParamHandle; 2],
    pub(crate) scale: f64,
}

impl Equal {
    pub fn new(pool: &ParamPool, p1: ParamHandle, p2: ParamHandle) -> Self {
        let pvec = [p1, p2];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    fn param1(&self) -> ParamHandle {
        self.pvec[0]
    }

    fn param2(&self) -> ParamHandle {
        self.pvec[1]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        self.scale * (pool.value(self.param1()) - pool.value(self.param2()))
    }

    pub fn grad(&self, _pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if param == self.param1() {
            deriv += 1.0;
        }
        if param == self.param2() {
            deriv += -1.0;
        }
        self.scale * deriv
    }
}

/// Constrains the difference of two parameters: `p2 - p1 = d`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    pub(crate) pvec: [ParamHandle; 3],
    pub(crate) origpvec: [ParamHandle; 3],
    pub(crate) scale: f64,
}

impl Difference {
    pub fn new(pool: &ParamPool, p1: ParamHandle, p2: ParamHandle, d: ParamHandle) -> Self {
        let pvec = [p1, p2, d];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    fn param1(&self) -> ParamHandle {
        self.pvec[0]
    }

    fn param2(&self) -> ParamHandle {
        self.pvec[1]
    }

    fn difference(&self) -> ParamHandle {
        self.pvec[2]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        self.scale
            * (pool.value(self.param2()) - pool.value(self.param1())
                - pool.value(self.difference()))
    }

    pub fn grad(&self, _pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if param == self.param1() {
            deriv += -1.0;
        }
        if param == self.param2() {
            deriv += 1.0;
        }
        if param == self.difference() {
            deriv += -1.0;
        }
        self.scale * deriv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equal_error_and_grad() {
        let mut pool = ParamPool::new();
        let p1 = pool.add(3.0);
        let p2 = pool.add(5.0);
        let c = Equal::new(&pool, p1, p2);

        assert_relative_eq!(c.error(&pool), -2.0);
        assert_relative_eq!(c.grad(&pool, p1), 1.0);
        assert_relative_eq!(c.grad(&pool, p2), -1.0);
    }

    #[test]
    fn test_equal_zero_at_solution() {
        let mut pool = ParamPool::new();
        let p1 = pool.add(4.2);
        let p2 = pool.add(4.2);
        let c = Equal::new(&pool, p1, p2);
        assert_relative_eq!(c.error(&pool), 0.0);
    }

    #[test]
    fn test_equal_same_param_both_slots() {
        // A parameter bound to both slots accumulates both slot partials.
        let mut pool = ParamPool::new();
        let p = pool.add(1.0);
        let c = Equal::new(&pool, p, p);
        assert_relative_eq!(c.error(&pool), 0.0);
        assert_relative_eq!(c.grad(&pool, p), 0.0);
    }

    #[test]
    fn test_difference_error_and_grad() {
        let mut pool = ParamPool::new();
        let p1 = pool.add(1.0);
        let p2 = pool.add(4.5);
        let d = pool.add(3.5);
        let c = Difference::new(&pool, p1, p2, d);

        assert_relative_eq!(c.error(&pool), 0.0);
        assert_relative_eq!(c.grad(&pool, p1), -1.0);
        assert_relative_eq!(c.grad(&pool, p2), 1.0);
        assert_relative_eq!(c.grad(&pool, d), -1.0);

        pool.set_value(d, 1.0).unwrap();
        assert_relative_eq!(c.error(&pool), 2.5);
    }

    #[test]
    fn test_grad_foreign_param_is_zero() {
        let mut pool = ParamPool::new();
        let p1 = pool.add(1.0);
        let p2 = pool.add(2.0);
        let other = pool.add(9.0);
        let c = Equal::new(&pool, p1, p2);
        assert_eq!(c.grad(&pool, other), 0.0);
    }

    #[test]
    fn test_rescale_scales_both() {
        let mut pool = ParamPool::new();
        let p1 = pool.add(3.0);
        let p2 = pool.add(5.0);
        let mut c = Equal::new(&pool, p1, p2);
        c.rescale(&pool, 2.0);
        assert_relative_eq!(c.error(&pool), -4.0);
        assert_relative_eq!(c.grad(&pool, p1), 2.0);
    }
}
