//! The constraint catalog and its common contract.
//!
//! [`Constraint`] is a closed tagged variant over every constraint kind the
//! solver understands. Compared with open trait objects this keeps the
//! variant set exhaustive at compile time and dispatches through a plain
//! `match` in the solver's tight evaluation loops.
//!
//! Every variant carries two same-length handle lists: the canonical
//! dependency list fixed at construction, and a working list that can be
//! redirected to substitute parameters (and reverted) without rebuilding the
//! constraint. Evaluation always reads values through the working list, so a
//! redirected constraint transparently evaluates against the substitutes.
//! Diagnostic tooling uses this to probe a conflicting subsystem against
//! trial unknowns while the canonical topology stays intact.
//!
//! None of the operations here write parameter values; only the external
//! driver mutates the pool, strictly between evaluation passes.

use serde::{Deserialize, Serialize};

use crate::constraints::angle::{L2LAngle, P2PAngle, Parallel, Perpendicular};
use crate::constraints::basic::{Difference, Equal};
use crate::constraints::distance::{
    MidpointOnLine, P2LDistance, P2PDistance, PointOnLine, PointOnPerpBisector, TangentCircumf,
};
use crate::constraints::ellipse::{
    EllipseTangentLine, InternalAlignment, InternalAlignmentPoint2Ellipse, PointOnEllipse,
};
use crate::params::{Ellipse, Line, ParamHandle, ParamPool, Point, RedirectMap, StepDirection};

/// Discriminant identifying a constraint variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintType {
    Equal,
    Difference,
    P2PDistance,
    P2PAngle,
    P2LDistance,
    PointOnLine,
    PointOnPerpBisector,
    Parallel,
    Perpendicular,
    L2LAngle,
    MidpointOnLine,
    TangentCircumf,
    PointOnEllipse,
    EllipseTangentLine,
    InternalAlignmentPoint2Ellipse,
}

/// A geometric constraint between parameters of a [`ParamPool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Equal(Equal),
    Difference(Difference),
    P2PDistance(P2PDistance),
    P2PAngle(P2PAngle),
    P2LDistance(P2LDistance),
    PointOnLine(PointOnLine),
    PointOnPerpBisector(PointOnPerpBisector),
    Parallel(Parallel),
    Perpendicular(Perpendicular),
    L2LAngle(L2LAngle),
    MidpointOnLine(MidpointOnLine),
    TangentCircumf(TangentCircumf),
    PointOnEllipse(PointOnEllipse),
    EllipseTangentLine(EllipseTangentLine),
    InternalAlignmentPoint2Ellipse(InternalAlignmentPoint2Ellipse),
}

/// Expands to a `match` over every variant, binding the payload to `$c`.
macro_rules! dispatch {
    ($self:expr, $c:ident => $e:expr) => {
        match $self {
            Constraint::Equal($c) => $e,
            Constraint::Difference($c) => $e,
            Constraint::P2PDistance($c) => $e,
            Constraint::P2PAngle($c) => $e,
            Constraint::P2LDistance($c) => $e,
            Constraint::PointOnLine($c) => $e,
            Constraint::PointOnPerpBisector($c) => $e,
            Constraint::Parallel($c) => $e,
            Constraint::Perpendicular($c) => $e,
            Constraint::L2LAngle($c) => $e,
            Constraint::MidpointOnLine($c) => $e,
            Constraint::TangentCircumf($c) => $e,
            Constraint::PointOnEllipse($c) => $e,
            Constraint::EllipseTangentLine($c) => $e,
            Constraint::InternalAlignmentPoint2Ellipse($c) => $e,
        }
    };
}

impl Constraint {
    /// The discriminant for this variant.
    pub fn type_id(&self) -> ConstraintType {
        match self {
            Constraint::Equal(_) => ConstraintType::Equal,
            Constraint::Difference(_) => ConstraintType::Difference,
            Constraint::P2PDistance(_) => ConstraintType::P2PDistance,
            Constraint::P2PAngle(_) => ConstraintType::P2PAngle,
            Constraint::P2LDistance(_) => ConstraintType::P2LDistance,
            Constraint::PointOnLine(_) => ConstraintType::PointOnLine,
            Constraint::PointOnPerpBisector(_) => ConstraintType::PointOnPerpBisector,
            Constraint::Parallel(_) => ConstraintType::Parallel,
            Constraint::Perpendicular(_) => ConstraintType::Perpendicular,
            Constraint::L2LAngle(_) => ConstraintType::L2LAngle,
            Constraint::MidpointOnLine(_) => ConstraintType::MidpointOnLine,
            Constraint::TangentCircumf(_) => ConstraintType::TangentCircumf,
            Constraint::PointOnEllipse(_) => ConstraintType::PointOnEllipse,
            Constraint::EllipseTangentLine(_) => ConstraintType::EllipseTangentLine,
            Constraint::InternalAlignmentPoint2Ellipse(_) => {
                ConstraintType::InternalAlignmentPoint2Ellipse
            }
        }
    }

    /// The scaled residual at the current parameter values.
    ///
    /// Zero exactly when the geometric relation holds. At degenerate
    /// geometry (zero-length line, coincident points) the result is
    /// non-finite rather than an error; the driver detects and rejects such
    /// configurations.
    pub fn error(&self, pool: &ParamPool) -> f64 {
        dispatch!(self, c => c.error(pool))
    }

    /// Partial derivative of the scaled residual with respect to `param`.
    ///
    /// Returns exactly 0 when `param` is not among the constraint's current
    /// (possibly redirected) dependency list. A parameter appearing in
    /// several slots accumulates the partial of each slot.
    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        dispatch!(self, c => c.grad(pool, param))
    }

    /// Recompute the conditioning scale from the current geometry.
    ///
    /// Constructors call this with `coef = 1`; the driver calls it again
    /// whenever residual magnitudes should be renormalized after large
    /// geometry changes.
    pub fn rescale(&mut self, pool: &ParamPool, coef: f64) {
        dispatch!(self, c => c.rescale(pool, coef))
    }

    /// Tighten the global step-length factor so this constraint stays inside
    /// its valid domain.
    ///
    /// Given the proposed per-parameter direction and an incoming bound
    /// `limit`, returns a factor in `[0, limit]`. Variants without a domain
    /// restriction return `limit` unchanged. The driver takes the minimum
    /// over all constraints before committing `factor * direction`.
    pub fn max_step(&self, pool: &ParamPool, direction: &StepDirection, limit: f64) -> f64 {
        match self {
            Constraint::P2PDistance(c) => c.max_step(pool, direction, limit),
            Constraint::P2PAngle(c) => c.max_step(direction, limit),
            Constraint::P2LDistance(c) => c.max_step(pool, direction, limit),
            Constraint::L2LAngle(c) => c.max_step(direction, limit),
            _ => limit,
        }
    }

    /// Substitute parameters by position.
    ///
    /// For each slot whose canonical handle is a key of `map`, the working
    /// handle becomes the mapped replacement; all other slots are left as
    /// they are. Redirection composes from the canonical list, so repeated
    /// calls never chain through earlier substitutions.
    pub fn redirect_params(&mut self, map: &RedirectMap) {
        dispatch!(self, c => redirect_in_place(&c.origpvec, &mut c.pvec, map));
    }

    /// Undo any redirection, restoring the canonical dependency list.
    pub fn revert_params(&mut self) {
        dispatch!(self, c => c.pvec = c.origpvec);
    }

    /// The current (possibly redirected) dependency list.
    pub fn params(&self) -> &[ParamHandle] {
        dispatch!(self, c => &c.pvec)
    }

    /// The canonical dependency list fixed at construction.
    pub fn canonical_params(&self) -> &[ParamHandle] {
        dispatch!(self, c => &c.origpvec)
    }

    // Convenience constructors, one per variant.

    /// p1 = p2.
    pub fn equal(pool: &ParamPool, p1: ParamHandle, p2: ParamHandle) -> Self {
        Constraint::Equal(Equal::new(pool, p1, p2))
    }

    /// p2 - p1 = d.
    pub fn difference(pool: &ParamPool, p1: ParamHandle, p2: ParamHandle, d: ParamHandle) -> Self {
        Constraint::Difference(Difference::new(pool, p1, p2, d))
    }

    /// |P1 - P2| = d.
    pub fn p2p_distance(pool: &ParamPool, p1: Point, p2: Point, d: ParamHandle) -> Self {
        Constraint::P2PDistance(P2PDistance::new(pool, p1, p2, d))
    }

    /// Direction of P2 - P1 makes the given angle with the x axis.
    pub fn p2p_angle(pool: &ParamPool, p1: Point, p2: Point, angle: ParamHandle) -> Self {
        Constraint::P2PAngle(P2PAngle::new(pool, p1, p2, angle))
    }

    /// As [`Constraint::p2p_angle`] with a fixed offset added to the angle
    /// parameter.
    pub fn p2p_angle_offset(
        pool: &ParamPool,
        p1: Point,
        p2: Point,
        angle: ParamHandle,
        da: f64,
    ) -> Self {
        Constraint::P2PAngle(P2PAngle::with_offset(pool, p1, p2, angle, da))
    }

    /// Distance from point to line = d.
    pub fn p2l_distance(pool: &ParamPool, p: Point, l: Line, d: ParamHandle) -> Self {
        Constraint::P2LDistance(P2LDistance::new(pool, p, l, d))
    }

    /// Point lies on the (infinite) line.
    pub fn point_on_line(pool: &ParamPool, p: Point, l: Line) -> Self {
        Constraint::PointOnLine(PointOnLine::new(pool, p, l))
    }

    /// Point is equidistant from the line's endpoints.
    pub fn point_on_perp_bisector(pool: &ParamPool, p: Point, l: Line) -> Self {
        Constraint::PointOnPerpBisector(PointOnPerpBisector::new(pool, p, l))
    }

    /// The two lines are parallel.
    pub fn parallel(pool: &ParamPool, l1: Line, l2: Line) -> Self {
        Constraint::Parallel(Parallel::new(pool, l1, l2))
    }

    /// The two lines are perpendicular.
    pub fn perpendicular(pool: &ParamPool, l1: Line, l2: Line) -> Self {
        Constraint::Perpendicular(Perpendicular::new(pool, l1, l2))
    }

    /// Signed angle from l1 to l2 equals the angle parameter.
    pub fn l2l_angle(pool: &ParamPool, l1: Line, l2: Line, angle: ParamHandle) -> Self {
        Constraint::L2LAngle(L2LAngle::new(pool, l1, l2, angle))
    }

    /// Midpoint of l1 lies on l2.
    pub fn midpoint_on_line(pool: &ParamPool, l1: Line, l2: Line) -> Self {
        Constraint::MidpointOnLine(MidpointOnLine::new(pool, l1, l2))
    }

    /// Two circles are tangent, externally or internally.
    pub fn tangent_circumf(
        pool: &ParamPool,
        center1: Point,
        center2: Point,
        radius1: ParamHandle,
        radius2: ParamHandle,
        internal: bool,
    ) -> Self {
        Constraint::TangentCircumf(TangentCircumf::new(
            pool, center1, center2, radius1, radius2, internal,
        ))
    }

    /// Point lies on the ellipse.
    pub fn point_on_ellipse(pool: &ParamPool, p: Point, e: Ellipse) -> Self {
        Constraint::PointOnEllipse(PointOnEllipse::new(pool, p, e))
    }

    /// Line is tangent to the ellipse.
    pub fn ellipse_tangent_line(pool: &ParamPool, l: Line, e: Ellipse) -> Self {
        Constraint::EllipseTangentLine(EllipseTangentLine::new(pool, l, e))
    }

    /// Auxiliary point sits at a named ellipse landmark.
    pub fn internal_alignment_point2ellipse(
        pool: &ParamPool,
        e: Ellipse,
        p: Point,
        alignment: InternalAlignment,
    ) -> Self {
        Constraint::InternalAlignmentPoint2Ellipse(InternalAlignmentPoint2Ellipse::new(
            pool, e, p, alignment,
        ))
    }
}

/// Positional substitution of `cur` against the canonical list `orig`.
fn redirect_in_place(orig: &[ParamHandle], cur: &mut [ParamHandle], map: &RedirectMap) {
    for (slot, canonical) in cur.iter_mut().zip(orig) {
        if let Some(&replacement) = map.get(canonical) {
            *slot = replacement;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ids() {
        let mut pool = ParamPool::new();
        let a = pool.add(1.0);
        let b = pool.add(2.0);
        let d = pool.add(1.0);

        assert_eq!(Constraint::equal(&pool, a, b).type_id(), ConstraintType::Equal);
        assert_eq!(
            Constraint::difference(&pool, a, b, d).type_id(),
            ConstraintType::Difference
        );
    }

    #[test]
    fn test_redirect_then_revert_restores_canonical() {
        let mut pool = ParamPool::new();
        let a = pool.add(1.0);
        let b = pool.add(2.0);
        let substitute = pool.add(7.0);

        let mut c = Constraint::equal(&pool, a, b);
        let mut map = RedirectMap::new();
        map.insert(a, substitute);

        c.redirect_params(&map);
        assert_eq!(c.params(), &[substitute, b]);
        assert_eq!(c.canonical_params(), &[a, b]);

        c.revert_params();
        assert_eq!(c.params(), c.canonical_params());
    }

    #[test]
    fn test_redirect_composes_from_canonical() {
        let mut pool = ParamPool::new();
        let a = pool.add(1.0);
        let b = pool.add(2.0);
        let s1 = pool.add(3.0);
        let s2 = pool.add(4.0);

        let mut c = Constraint::equal(&pool, a, b);

        let mut map = RedirectMap::new();
        map.insert(a, s1);
        c.redirect_params(&map);

        // A second redirection keyed on s1 must not chain: keys are matched
        // against the canonical list only.
        let mut map2 = RedirectMap::new();
        map2.insert(s1, s2);
        c.redirect_params(&map2);
        assert_eq!(c.params(), &[s1, b]);

        let mut map3 = RedirectMap::new();
        map3.insert(a, s2);
        c.redirect_params(&map3);
        assert_eq!(c.params(), &[s2, b]);
    }

    #[test]
    fn test_default_max_step_passes_limit_through() {
        let mut pool = ParamPool::new();
        let a = pool.add(1.0);
        let b = pool.add(2.0);
        let c = Constraint::equal(&pool, a, b);

        let mut dir = StepDirection::new();
        dir.insert(a, -100.0);
        assert_eq!(c.max_step(&pool, &dir, 1.0), 1.0);
    }

    #[test]
    fn test_redirection_affects_evaluation() {
        let mut pool = ParamPool::new();
        let a = pool.add(3.0);
        let b = pool.add(3.0);
        let substitute = pool.add(10.0);

        let mut c = Constraint::equal(&pool, a, b);
        assert_eq!(c.error(&pool), 0.0);

        let mut map = RedirectMap::new();
        map.insert(a, substitute);
        c.redirect_params(&map);
        assert_eq!(c.error(&pool), 7.0);
        // Gradients follow the redirected list as well.
        assert_eq!(c.grad(&pool, substitute), 1.0);
        assert_eq!(c.grad(&pool, a), 0.0);

        c.revert_params();
        assert_eq!(c.error(&pool), 0.0);
    }
}
