//! Metric relations: point/point and point/line distances, incidence via
//! signed triangle areas, perpendicular-bisector membership and circle
//! tangency.
//!
//! The area-based residuals all use twice the signed triangle area
//! `area = -x0*dy + y0*dx + x1*y2 - x2*y1` of the point against the line
//! (p1, p2), divided by the line length. Partials of `area` are linear:
//!
//! ```text
//! darea/dx0 = (y1-y2)      darea/dy0 = (x2-x1)
//! darea/dx1 = (y2-y0)      darea/dy1 = (x0-x2)
//! darea/dx2 = (y0-y1)      darea/dy2 = (x1-x0)
//! ```
//!
//! The distance constraints also bound the solver step: a driven distance
//! must not be pushed below zero, and the measured separation/area must not
//! change by more than the larger of the target and 30% of its current value
//! in one step. The second rule keeps a linearized step from flipping the
//! sign of a quantity whose derivative was taken at the old configuration.

use serde::{Deserialize, Serialize};

use crate::params::{Line, ParamHandle, ParamPool, Point, StepDirection};

/// The fraction of the current separation/area a single step may change.
const RELATIVE_STEP_BOUND: f64 = 0.3;

/// Distance between two points: `|P1 - P2| = d`.
///
/// Singular when the points coincide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2PDistance {
    pub(crate) pvec: [ParamHandle; 5],
    pub(crate) origpvec: [ParamHandle; 5],
    pub(crate) scale: f64,
}

impl P2PDistance {
    pub fn new(pool: &ParamPool, p1: Point, p2: Point, d: ParamHandle) -> Self {
        let pvec = [p1.x, p1.y, p2.x, p2.y, d];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    fn p1x(&self) -> ParamHandle {
        self.pvec[0]
    }
    fn p1y(&self) -> ParamHandle {
        self.pvec[1]
    }
    fn p2x(&self) -> ParamHandle {
        self.pvec[2]
    }
    fn p2y(&self) -> ParamHandle {
        self.pvec[3]
    }
    fn distance(&self) -> ParamHandle {
        self.pvec[4]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let dx = pool.value(self.p1x()) - pool.value(self.p2x());
        let dy = pool.value(self.p1y()) - pool.value(self.p2y());
        let d = (dx * dx + dy * dy).sqrt();
        self.scale * (d - pool.value(self.distance()))
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if param == self.p1x()
            || param == self.p1y()
            || param == self.p2x()
            || param == self.p2y()
        {
            let dx = pool.value(self.p1x()) - pool.value(self.p2x());
            let dy = pool.value(self.p1y()) - pool.value(self.p2y());
            let d = (dx * dx + dy * dy).sqrt();
            if param == self.p1x() {
                deriv += dx / d;
            }
            if param == self.p1y() {
                deriv += dy / d;
            }
            if param == self.p2x() {
                deriv += -dx / d;
            }
            if param == self.p2y() {
                deriv += -dy / d;
            }
        }
        if param == self.distance() {
            deriv += -1.0;
        }
        self.scale * deriv
    }

    pub fn max_step(&self, pool: &ParamPool, dir: &StepDirection, mut lim: f64) -> f64 {
        // distance >= 0
        if let Some(&delta) = dir.get(&self.distance()) {
            if delta < 0.0 {
                lim = lim.min(-pool.value(self.distance()) / delta);
            }
        }
        // restrict actual distance change
        let mut ddx = 0.0;
        let mut ddy = 0.0;
        if let Some(&delta) = dir.get(&self.p1x()) {
            ddx += delta;
        }
        if let Some(&delta) = dir.get(&self.p1y()) {
            ddy += delta;
        }
        if let Some(&delta) = dir.get(&self.p2x()) {
            ddx -= delta;
        }
        if let Some(&delta) = dir.get(&self.p2y()) {
            ddy -= delta;
        }
        let dd = (ddx * ddx + ddy * ddy).sqrt();
        let dist = pool.value(self.distance());
        if dd > dist {
            let dx = pool.value(self.p1x()) - pool.value(self.p2x());
            let dy = pool.value(self.p1y()) - pool.value(self.p2y());
            let d = (dx * dx + dy * dy).sqrt();
            if dd > d {
                lim = lim.min(d.max(dist) / dd);
            }
        }
        lim
    }
}

/// Distance from a point to a line: `|area| / |L| = d`.
///
/// Singular when the line has zero length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2LDistance {
    pub(crate) pvec: [ParamHandle; 7],
    pub(crate) origpvec: [ParamHandle; 7],
    pub(crate) scale: f64,
}

impl P2LDistance {
    pub fn new(pool: &ParamPool, p: Point, l: Line, d: ParamHandle) -> Self {
        let pvec = [p.x, p.y, l.p1.x, l.p1.y, l.p2.x, l.p2.y, d];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    fn p0x(&self) -> ParamHandle {
        self.pvec[0]
    }
    fn p0y(&self) -> ParamHandle {
        self.pvec[1]
    }
    fn p1x(&self) -> ParamHandle {
        self.pvec[2]
    }
    fn p1y(&self) -> ParamHandle {
        self.pvec[3]
    }
    fn p2x(&self) -> ParamHandle {
        self.pvec[4]
    }
    fn p2y(&self) -> ParamHandle {
        self.pvec[5]
    }
    fn distance(&self) -> ParamHandle {
        self.pvec[6]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let x0 = pool.value(self.p0x());
        let y0 = pool.value(self.p0y());
        let x1 = pool.value(self.p1x());
        let y1 = pool.value(self.p1y());
        let x2 = pool.value(self.p2x());
        let y2 = pool.value(self.p2y());
        let dist = pool.value(self.distance());
        let dx = x2 - x1;
        let dy = y2 - y1;
        let d = (dx * dx + dy * dy).sqrt();
        let area = (-x0 * dy + y0 * dx + x1 * y2 - x2 * y1).abs();
        self.scale * (area / d - dist)
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if param == self.p0x()
            || param == self.p0y()
            || param == self.p1x()
            || param == self.p1y()
            || param == self.p2x()
            || param == self.p2y()
        {
            let x0 = pool.value(self.p0x());
            let y0 = pool.value(self.p0y());
            let x1 = pool.value(self.p1x());
            let y1 = pool.value(self.p1y());
            let x2 = pool.value(self.p2x());
            let y2 = pool.value(self.p2y());
            let dx = x2 - x1;
            let dy = y2 - y1;
            let d2 = dx * dx + dy * dy;
            let d = d2.sqrt();
            let area = -x0 * dy + y0 * dx + x1 * y2 - x2 * y1;
            if param == self.p0x() {
                deriv += (y1 - y2) / d;
            }
            if param == self.p0y() {
                deriv += (x2 - x1) / d;
            }
            if param == self.p1x() {
                deriv += ((y2 - y0) * d + (dx / d) * area) / d2;
            }
            if param == self.p1y() {
                deriv += ((x0 - x2) * d + (dy / d) * area) / d2;
            }
            if param == self.p2x() {
                deriv += ((y0 - y1) * d - (dx / d) * area) / d2;
            }
            if param == self.p2y() {
                deriv += ((x1 - x0) * d - (dy / d) * area) / d2;
            }
            if area < 0.0 {
                deriv *= -1.0;
            }
        }
        if param == self.distance() {
            deriv += -1.0;
        }
        self.scale * deriv
    }

    pub fn max_step(&self, pool: &ParamPool, dir: &StepDirection, mut lim: f64) -> f64 {
        // distance >= 0
        if let Some(&delta) = dir.get(&self.distance()) {
            if delta < 0.0 {
                lim = lim.min(-pool.value(self.distance()) / delta);
            }
        }
        // restrict actual area change
        let x0 = pool.value(self.p0x());
        let y0 = pool.value(self.p0y());
        let x1 = pool.value(self.p1x());
        let y1 = pool.value(self.p1y());
        let x2 = pool.value(self.p2x());
        let y2 = pool.value(self.p2y());
        let mut darea = 0.0;
        if let Some(&delta) = dir.get(&self.p0x()) {
            darea += (y1 - y2) * delta;
        }
        if let Some(&delta) = dir.get(&self.p0y()) {
            darea += (x2 - x1) * delta;
        }
        if let Some(&delta) = dir.get(&self.p1x()) {
            darea += (y2 - y0) * delta;
        }
        if let Some(&delta) = dir.get(&self.p1y()) {
            darea += (x0 - x2) * delta;
        }
        if let Some(&delta) = dir.get(&self.p2x()) {
            darea += (y0 - y1) * delta;
        }
        if let Some(&delta) = dir.get(&self.p2y()) {
            darea += (x1 - x0) * delta;
        }

        darea = darea.abs();
        if darea > 0.0 {
            let dx = x2 - x1;
            let dy = y2 - y1;
            let mut area =
                RELATIVE_STEP_BOUND * pool.value(self.distance()) * (dx * dx + dy * dy).sqrt();
            if darea > area {
                area = area
                    .max(RELATIVE_STEP_BOUND * (-x0 * dy + y0 * dx + x1 * y2 - x2 * y1).abs());
                if darea > area {
                    lim = lim.min(area / darea);
                }
            }
        }
        lim
    }
}

/// Incidence of a point on an (infinite) line: signed `area / |L| = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOnLine {
    pub(crate) pvec: [ParamHandle; 6],
    pub(crate) origpvec: [ParamHandle; 6],
    pub(crate) scale: f64,
}

impl PointOnLine {
    pub fn new(pool: &ParamPool, p: Point, l: Line) -> Self {
        Self::from_points(pool, p, l.p1, l.p2)
    }

    /// Construct from loose endpoints instead of a [`Line`] value.
    pub fn from_points(pool: &ParamPool, p: Point, lp1: Point, lp2: Point) -> Self {
        let pvec = [p.x, p.y, lp1.x, lp1.y, lp2.x, lp2.y];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    fn p0x(&self) -> ParamHandle {
        self.pvec[0]
    }
    fn p0y(&self) -> ParamHandle {
        self.pvec[1]
    }
    fn p1x(&self) -> ParamHandle {
        self.pvec[2]
    }
    fn p1y(&self) -> ParamHandle {
        self.pvec[3]
    }
    fn p2x(&self) -> ParamHandle {
        self.pvec[4]
    }
    fn p2y(&self) -> ParamHandle {
        self.pvec[5]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let x0 = pool.value(self.p0x());
        let y0 = pool.value(self.p0y());
        let x1 = pool.value(self.p1x());
        let y1 = pool.value(self.p1y());
        let x2 = pool.value(self.p2x());
        let y2 = pool.value(self.p2y());
        let dx = x2 - x1;
        let dy = y2 - y1;
        let d = (dx * dx + dy * dy).sqrt();
        let area = -x0 * dy + y0 * dx + x1 * y2 - x2 * y1;
        self.scale * area / d
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if param == self.p0x()
            || param == self.p0y()
            || param == self.p1x()
            || param == self.p1y()
            || param == self.p2x()
            || param == self.p2y()
        {
            let x0 = pool.value(self.p0x());
            let y0 = pool.value(self.p0y());
            let x1 = pool.value(self.p1x());
            let y1 = pool.value(self.p1y());
            let x2 = pool.value(self.p2x());
            let y2 = pool.value(self.p2y());
            let dx = x2 - x1;
            let dy = y2 - y1;
            let d2 = dx * dx + dy * dy;
            let d = d2.sqrt();
            let area = -x0 * dy + y0 * dx + x1 * y2 - x2 * y1;
            if param == self.p0x() {
                deriv += (y1 - y2) / d;
            }
            if param == self.p0y() {
                deriv += (x2 - x1) / d;
            }
            if param == self.p1x() {
                deriv += ((y2 - y0) * d + (dx / d) * area) / d2;
            }
            if param == self.p1y() {
                deriv += ((x0 - x2) * d + (dy / d) * area) / d2;
            }
            if param == self.p2x() {
                deriv += ((y0 - y1) * d - (dx / d) * area) / d2;
            }
            if param == self.p2y() {
                deriv += ((x1 - x0) * d - (dy / d) * area) / d2;
            }
        }
        self.scale * deriv
    }
}

/// Equidistance of a point from a segment's endpoints:
/// `|P - L1| - |P - L2| = 0`.
///
/// Singular when the point coincides with either endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOnPerpBisector {
    pub(crate) pvec: [ParamHandle; 6],
    pub(crate) origpvec: [ParamHandle; 6],
    pub(crate) scale: f64,
}

impl PointOnPerpBisector {
    pub fn new(pool: &ParamPool, p: Point, l: Line) -> Self {
        Self::from_points(pool, p, l.p1, l.p2)
    }

    /// Construct from loose endpoints instead of a [`Line`] value.
    pub fn from_points(pool: &ParamPool, p: Point, lp1: Point, lp2: Point) -> Self {
        let pvec = [p.x, p.y, lp1.x, lp1.y, lp2.x, lp2.y];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    fn p0x(&self) -> ParamHandle {
        self.pvec[0]
    }
    fn p0y(&self) -> ParamHandle {
        self.pvec[1]
    }
    fn p1x(&self) -> ParamHandle {
        self.pvec[2]
    }
    fn p1y(&self) -> ParamHandle {
        self.pvec[3]
    }
    fn p2x(&self) -> ParamHandle {
        self.pvec[4]
    }
    fn p2y(&self) -> ParamHandle {
        self.pvec[5]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let dx1 = pool.value(self.p1x()) - pool.value(self.p0x());
        let dy1 = pool.value(self.p1y()) - pool.value(self.p0y());
        let dx2 = pool.value(self.p2x()) - pool.value(self.p0x());
        let dy2 = pool.value(self.p2y()) - pool.value(self.p0y());
        self.scale * ((dx1 * dx1 + dy1 * dy1).sqrt() - (dx2 * dx2 + dy2 * dy2).sqrt())
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if param == self.p0x()
            || param == self.p0y()
            || param == self.p1x()
            || param == self.p1y()
        {
            let dx1 = pool.value(self.p1x()) - pool.value(self.p0x());
            let dy1 = pool.value(self.p1y()) - pool.value(self.p0y());
            let d1 = (dx1 * dx1 + dy1 * dy1).sqrt();
            if param == self.p0x() {
                deriv -= dx1 / d1;
            }
            if param == self.p0y() {
                deriv -= dy1 / d1;
            }
            if param == self.p1x() {
                deriv += dx1 / d1;
            }
            if param == self.p1y() {
                deriv += dy1 / d1;
            }
        }
        if param == self.p0x()
            || param == self.p0y()
            || param == self.p2x()
            || param == self.p2y()
        {
            let dx2 = pool.value(self.p2x()) - pool.value(self.p0x());
            let dy2 = pool.value(self.p2y()) - pool.value(self.p0y());
            let d2 = (dx2 * dx2 + dy2 * dy2).sqrt();
            if param == self.p0x() {
                deriv += dx2 / d2;
            }
            if param == self.p0y() {
                deriv += dy2 / d2;
            }
            if param == self.p2x() {
                deriv -= dx2 / d2;
            }
            if param == self.p2y() {
                deriv -= dy2 / d2;
            }
        }
        self.scale * deriv
    }
}

/// Incidence of l1's midpoint on l2, via the signed area of the midpoint
/// against l2 divided by l2's length.
///
/// Singular when l2 has zero length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidpointOnLine {
    pub(crate) pvec: [ParamHandle; 8],
    pub(crate) origpvec: [ParamHandle; 8],
    pub(crate) scale: f64,
}

impl MidpointOnLine {
    pub fn new(pool: &ParamPool, l1: Line, l2: Line) -> Self {
        Self::from_points(pool, l1.p1, l1.p2, l2.p1, l2.p2)
    }

    /// Construct from loose endpoints instead of [`Line`] values.
    pub fn from_points(pool: &ParamPool, l1p1: Point, l1p2: Point, l2p1: Point, l2p2: Point) -> Self {
        let pvec = [
            l1p1.x, l1p1.y, l1p2.x, l1p2.y, l2p1.x, l2p1.y, l2p2.x, l2p2.y,
        ];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    fn l1p1x(&self) -> ParamHandle {
        self.pvec[0]
    }
    fn l1p1y(&self) -> ParamHandle {
        self.pvec[1]
    }
    fn l1p2x(&self) -> ParamHandle {
        self.pvec[2]
    }
    fn l1p2y(&self) -> ParamHandle {
        self.pvec[3]
    }
    fn l2p1x(&self) -> ParamHandle {
        self.pvec[4]
    }
    fn l2p1y(&self) -> ParamHandle {
        self.pvec[5]
    }
    fn l2p2x(&self) -> ParamHandle {
        self.pvec[6]
    }
    fn l2p2y(&self) -> ParamHandle {
        self.pvec[7]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let x0 = (pool.value(self.l1p1x()) + pool.value(self.l1p2x())) / 2.0;
        let y0 = (pool.value(self.l1p1y()) + pool.value(self.l1p2y())) / 2.0;
        let x1 = pool.value(self.l2p1x());
        let y1 = pool.value(self.l2p1y());
        let x2 = pool.value(self.l2p2x());
        let y2 = pool.value(self.l2p2y());
        let dx = x2 - x1;
        let dy = y2 - y1;
        let d = (dx * dx + dy * dy).sqrt();
        let area = -x0 * dy + y0 * dx + x1 * y2 - x2 * y1;
        self.scale * area / d
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if self.pvec.contains(&param) {
            let x0 = (pool.value(self.l1p1x()) + pool.value(self.l1p2x())) / 2.0;
            let y0 = (pool.value(self.l1p1y()) + pool.value(self.l1p2y())) / 2.0;
            let x1 = pool.value(self.l2p1x());
            let y1 = pool.value(self.l2p1y());
            let x2 = pool.value(self.l2p2x());
            let y2 = pool.value(self.l2p2y());
            let dx = x2 - x1;
            let dy = y2 - y1;
            let d2 = dx * dx + dy * dy;
            let d = d2.sqrt();
            let area = -x0 * dy + y0 * dx + x1 * y2 - x2 * y1;
            // Midpoint coordinates carry a factor 1/2 through the chain rule.
            if param == self.l1p1x() {
                deriv += (y1 - y2) / (2.0 * d);
            }
            if param == self.l1p1y() {
                deriv += (x2 - x1) / (2.0 * d);
            }
            if param == self.l1p2x() {
                deriv += (y1 - y2) / (2.0 * d);
            }
            if param == self.l1p2y() {
                deriv += (x2 - x1) / (2.0 * d);
            }
            if param == self.l2p1x() {
                deriv += ((y2 - y0) * d + (dx / d) * area) / d2;
            }
            if param == self.l2p1y() {
                deriv += ((x0 - x2) * d + (dy / d) * area) / d2;
            }
            if param == self.l2p2x() {
                deriv += ((y0 - y1) * d - (dx / d) * area) / d2;
            }
            if param == self.l2p2y() {
                deriv += ((x1 - x0) * d - (dy / d) * area) / d2;
            }
        }
        self.scale * deriv
    }
}

/// Tangency of two circles:
/// `|C1 - C2| = r1 + r2` (external) or `|C1 - C2| = |r1 - r2|` (internal).
///
/// Singular when the centers coincide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TangentCircumf {
    pub(crate) pvec: [ParamHandle; 6],
    pub(crate) origpvec: [ParamHandle; 6],
    pub(crate) scale: f64,
    internal: bool,
}

impl TangentCircumf {
    pub fn new(
        pool: &ParamPool,
        center1: Point,
        center2: Point,
        radius1: ParamHandle,
        radius2: ParamHandle,
        internal: bool,
    ) -> Self {
        let pvec = [center1.x, center1.y, center2.x, center2.y, radius1, radius2];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
            internal,
        };
        c.rescale(pool, 1.0);
        c
    }

    /// Whether this is internal (one circle inside the other) tangency.
    pub fn internal(&self) -> bool {
        self.internal
    }

    fn c1x(&self) -> ParamHandle {
        self.pvec[0]
    }
    fn c1y(&self) -> ParamHandle {
        self.pvec[1]
    }
    fn c2x(&self) -> ParamHandle {
        self.pvec[2]
    }
    fn c2y(&self) -> ParamHandle {
        self.pvec[3]
    }
    fn r1(&self) -> ParamHandle {
        self.pvec[4]
    }
    fn r2(&self) -> ParamHandle {
        self.pvec[5]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let dx = pool.value(self.c1x()) - pool.value(self.c2x());
        let dy = pool.value(self.c1y()) - pool.value(self.c2y());
        let dist = (dx * dx + dy * dy).sqrt();
        let r1 = pool.value(self.r1());
        let r2 = pool.value(self.r2());
        if self.internal {
            self.scale * (dist - (r1 - r2).abs())
        } else {
            self.scale * (dist - (r1 + r2))
        }
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if self.pvec.contains(&param) {
            let dx = pool.value(self.c1x()) - pool.value(self.c2x());
            let dy = pool.value(self.c1y()) - pool.value(self.c2y());
            let d = (dx * dx + dy * dy).sqrt();
            if param == self.c1x() {
                deriv += dx / d;
            }
            if param == self.c1y() {
                deriv += dy / d;
            }
            if param == self.c2x() {
                deriv += -dx / d;
            }
            if param == self.c2y() {
                deriv += -dy / d;
            }
            if self.internal {
                let r1_larger = pool.value(self.r1()) > pool.value(self.r2());
                if param == self.r1() {
                    deriv += if r1_larger { -1.0 } else { 1.0 };
                }
                if param == self.r2() {
                    deriv += if r1_larger { 1.0 } else { -1.0 };
                }
            } else {
                if param == self.r1() {
                    deriv += -1.0;
                }
                if param == self.r2() {
                    deriv += -1.0;
                }
            }
        }
        self.scale * deriv
    }
}
