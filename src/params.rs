//! Parameter arena and geometric grouping views.
//!
//! Every scalar unknown of the sketch (a point coordinate, a radius, an
//! angle, a driven distance) lives in a [`ParamPool`] owned by the external
//! document model. Constraints never own parameters; they store
//! [`ParamHandle`]s, stable integer indices into the pool's contiguous
//! buffer. This replaces raw-pointer aliasing into an external array with an
//! arena that survives reallocation and can be serialized with the document.
//!
//! [`Point`], [`Line`] and [`Ellipse`] are thin composition helpers used only
//! at constraint-construction time to group handles; the solver never stores
//! them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GcsError, Result};

/// A stable reference to one scalar unknown in a [`ParamPool`].
///
/// Identity is by index, not value: two handles are the same unknown exactly
/// when they are equal. Handles are only created by [`ParamPool::add`], so a
/// handle is valid for the pool that produced it for the pool's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamHandle(usize);

impl ParamHandle {
    /// The index of this parameter in the pool's contiguous buffer.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A proposed per-parameter step direction, as produced by the solver's
/// linear solve. Parameters absent from the map have a zero component.
pub type StepDirection = HashMap<ParamHandle, f64>;

/// A substitution table mapping canonical parameters to replacement
/// parameters, used by [`crate::Constraint::redirect_params`].
pub type RedirectMap = HashMap<ParamHandle, ParamHandle>;

/// Arena of scalar unknowns backing the constraint system.
///
/// The pool is owned by the external document model. Constraint evaluation
/// only reads values; the solver driver writes new values between iterations
/// through [`set_value`](ParamPool::set_value) or
/// [`apply_step`](ParamPool::apply_step).
///
/// # Examples
///
/// ```
/// use gcs2d::ParamPool;
///
/// let mut pool = ParamPool::new();
/// let h = pool.add(3.5);
/// assert_eq!(pool.value(h), 3.5);
/// pool.set_value(h, 4.0).unwrap();
/// assert_eq!(pool.value(h), 4.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamPool {
    values: Vec<f64>,
}

impl ParamPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Create an empty pool with room for `capacity` parameters.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Add a new parameter with the given initial value, returning its handle.
    pub fn add(&mut self, value: f64) -> ParamHandle {
        self.values.push(value);
        ParamHandle(self.values.len() - 1)
    }

    /// Current value of a parameter.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this pool.
    pub fn value(&self, handle: ParamHandle) -> f64 {
        self.values[handle.0]
    }

    /// Current value of a parameter, or an error for a foreign handle.
    pub fn get(&self, handle: ParamHandle) -> Result<f64> {
        self.values
            .get(handle.0)
            .copied()
            .ok_or(GcsError::InvalidHandle {
                index: handle.0,
                len: self.values.len(),
            })
    }

    /// Overwrite the value of a parameter.
    ///
    /// Only the solver driver (or the owning document) calls this, strictly
    /// between evaluation passes.
    pub fn set_value(&mut self, handle: ParamHandle, value: f64) -> Result<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(handle.0)
            .ok_or(GcsError::InvalidHandle {
                index: handle.0,
                len,
            })?;
        *slot = value;
        Ok(())
    }

    /// Apply `factor * direction` to every parameter named in the direction.
    ///
    /// This is the commit half of the step-limiting protocol: the driver
    /// first reduces `factor` through every constraint's `max_step`, then
    /// applies the damped step here.
    pub fn apply_step(&mut self, direction: &StepDirection, factor: f64) -> Result<()> {
        for (&handle, &delta) in direction {
            let value = self.get(handle)?;
            self.set_value(handle, value + factor * delta)?;
        }
        Ok(())
    }

    /// Number of parameters in the pool.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the pool holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all handles in index order.
    pub fn handles(&self) -> impl Iterator<Item = ParamHandle> + '_ {
        (0..self.values.len()).map(ParamHandle)
    }
}

/// A 2D point: a pair of parameter handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: ParamHandle,
    pub y: ParamHandle,
}

impl Point {
    pub fn new(x: ParamHandle, y: ParamHandle) -> Self {
        Self { x, y }
    }
}

/// A line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
}

impl Line {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }
}

/// An ellipse in the center / first-focus / minor-radius parameterization.
///
/// The second focus, major radius and rotation are all implied: the major
/// axis points from `center` to `focus1`, the focal distance is
/// `|focus1 - center|`, and the major radius is
/// `sqrt(radmin^2 + |focus1 - center|^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point,
    pub focus1: Point,
    pub radmin: ParamHandle,
}

impl Ellipse {
    pub fn new(center: Point, focus1: Point, radmin: ParamHandle) -> Self {
        Self {
            center,
            focus1,
            radmin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read() {
        let mut pool = ParamPool::new();
        let a = pool.add(1.0);
        let b = pool.add(2.0);
        assert_ne!(a, b);
        assert_eq!(pool.value(a), 1.0);
        assert_eq!(pool.value(b), 2.0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_set_value() {
        let mut pool = ParamPool::new();
        let a = pool.add(1.0);
        pool.set_value(a, -3.0).unwrap();
        assert_eq!(pool.value(a), -3.0);
    }

    #[test]
    fn test_foreign_handle_is_error() {
        let mut big = ParamPool::new();
        for i in 0..5 {
            big.add(i as f64);
        }
        let foreign = big.add(9.0);

        let mut small = ParamPool::new();
        small.add(0.0);
        assert!(matches!(
            small.get(foreign),
            Err(GcsError::InvalidHandle { .. })
        ));
        assert!(small.set_value(foreign, 1.0).is_err());
    }

    #[test]
    fn test_apply_step() {
        let mut pool = ParamPool::new();
        let a = pool.add(1.0);
        let b = pool.add(2.0);

        let mut dir = StepDirection::new();
        dir.insert(a, 2.0);
        dir.insert(b, -4.0);
        pool.apply_step(&dir, 0.5).unwrap();

        assert_eq!(pool.value(a), 2.0);
        assert_eq!(pool.value(b), 0.0);
    }
}
