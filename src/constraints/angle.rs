//! Orientation relations: absolute and relative angles, parallelism and
//! perpendicularity.
//!
//! The angle residuals rotate the measured direction into the frame of the
//! target angle and take `atan2` of the result, so the residual is the
//! signed angular deviation and stays well-behaved near zero. Because atan2
//! has a branch cut at pi, the angle-valued unknowns additionally limit the
//! solver step to at most pi/18 (10 degrees) per iteration; a larger step
//! could cross the cut and invalidate the linear model by a multiple of
//! 2*pi.
//!
//! Parallel and Perpendicular are products of direction components, so their
//! conditioning scale divides by both line lengths to keep the residual
//! dimensionless.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::params::{Line, ParamHandle, ParamPool, Point, StepDirection};

/// Largest angle-parameter step allowed per iteration.
const MAX_ANGLE_STEP: f64 = PI / 18.0;

/// Tighten `lim` so the angle component of `dir` stays within
/// [`MAX_ANGLE_STEP`].
fn limit_angle_step(angle: ParamHandle, dir: &StepDirection, mut lim: f64) -> f64 {
    if let Some(&delta) = dir.get(&angle) {
        let step = delta.abs();
        if step > MAX_ANGLE_STEP {
            lim = lim.min(MAX_ANGLE_STEP / step);
        }
    }
    lim
}

/// Direction of `P2 - P1` makes angle `a + da` with the x axis, where `a` is
/// an angle parameter and `da` a fixed offset.
///
/// Singular when the points coincide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2PAngle {
    pub(crate) pvec: [ParamHandle; 5],
    pub(crate) origpvec: [ParamHandle; 5],
    pub(crate) scale: f64,
    da: f64,
}

impl P2PAngle {
    pub fn new(pool: &ParamPool, p1: Point, p2: Point, angle: ParamHandle) -> Self {
        Self::with_offset(pool, p1, p2, angle, 0.0)
    }

    pub fn with_offset(pool: &ParamPool, p1: Point, p2: Point, angle: ParamHandle, da: f64) -> Self {
        let pvec = [p1.x, p1.y, p2.x, p2.y, angle];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
            da,
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
    fn angle(&self) -> ParamHandle {
        self.pvec[4]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let dx = pool.value(self.p2x()) - pool.value(self.p1x());
        let dy = pool.value(self.p2y()) - pool.value(self.p1y());
        let a = pool.value(self.angle()) + self.da;
        let ca = a.cos();
        let sa = a.sin();
        let x = dx * ca + dy * sa;
        let y = -dx * sa + dy * ca;
        self.scale * y.atan2(x)
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if param == self.p1x()
            || param == self.p1y()
            || param == self.p2x()
            || param == self.p2y()
        {
            let dx = pool.value(self.p2x()) - pool.value(self.p1x());
            let dy = pool.value(self.p2y()) - pool.value(self.p1y());
            let a = pool.value(self.angle()) + self.da;
            let ca = a.cos();
            let sa = a.sin();
            let x = dx * ca + dy * sa;
            let y = -dx * sa + dy * ca;
            let r2 = dx * dx + dy * dy;
            let dx = -y / r2;
            let dy = x / r2;
            if param == self.p1x() {
                deriv += -ca * dx + sa * dy;
            }
            if param == self.p1y() {
                deriv += -sa * dx - ca * dy;
            }
            if param == self.p2x() {
                deriv += ca * dx - sa * dy;
            }
            if param == self.p2y() {
                deriv += sa * dx + ca * dy;
            }
        }
        if param == self.angle() {
            deriv += -1.0;
        }
        self.scale * deriv
    }

    pub fn max_step(&self, dir: &StepDirection, lim: f64) -> f64 {
        limit_angle_step(self.angle(), dir, lim)
    }
}

/// Signed angle from l1 to l2 equals the angle parameter.
///
/// Singular when either line has zero length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2LAngle {
    pub(crate) pvec: [ParamHandle; 9],
    pub(crate) origpvec: [ParamHandle; 9],
    pub(crate) scale: f64,
}

impl L2LAngle {
    pub fn new(pool: &ParamPool, l1: Line, l2: Line, angle: ParamHandle) -> Self {
        Self::from_points(pool, l1.p1, l1.p2, l2.p1, l2.p2, angle)
    }

    /// Construct from loose endpoints instead of [`Line`] values.
    pub fn from_points(
        pool: &ParamPool,
        l1p1: Point,
        l1p2: Point,
        l2p1: Point,
        l2p2: Point,
        angle: ParamHandle,
    ) -> Self {
        let pvec = [
            l1p1.x, l1p1.y, l1p2.x, l1p2.y, l2p1.x, l2p1.y, l2p2.x, l2p2.y, angle,
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
    fn angle(&self) -> ParamHandle {
        self.pvec[8]
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let dx1 = pool.value(self.l1p2x()) - pool.value(self.l1p1x());
        let dy1 = pool.value(self.l1p2y()) - pool.value(self.l1p1y());
        let dx2 = pool.value(self.l2p2x()) - pool.value(self.l2p1x());
        let dy2 = pool.value(self.l2p2y()) - pool.value(self.l2p1y());
        let a = dy1.atan2(dx1) + pool.value(self.angle());
        let ca = a.cos();
        let sa = a.sin();
        let x2 = dx2 * ca + dy2 * sa;
        let y2 = -dx2 * sa + dy2 * ca;
        self.scale * y2.atan2(x2)
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        if param == self.l1p1x()
            || param == self.l1p1y()
            || param == self.l1p2x()
            || param == self.l1p2y()
        {
            let dx1 = pool.value(self.l1p2x()) - pool.value(self.l1p1x());
            let dy1 = pool.value(self.l1p2y()) - pool.value(self.l1p1y());
            let r2 = dx1 * dx1 + dy1 * dy1;
            if param == self.l1p1x() {
                deriv += -dy1 / r2;
            }
            if param == self.l1p1y() {
                deriv += dx1 / r2;
            }
            if param == self.l1p2x() {
                deriv += dy1 / r2;
            }
            if param == self.l1p2y() {
                deriv += -dx1 / r2;
            }
        }
        if param == self.l2p1x()
            || param == self.l2p1y()
            || param == self.l2p2x()
            || param == self.l2p2y()
        {
            let dx1 = pool.value(self.l1p2x()) - pool.value(self.l1p1x());
            let dy1 = pool.value(self.l1p2y()) - pool.value(self.l1p1y());
            let dx2 = pool.value(self.l2p2x()) - pool.value(self.l2p1x());
            let dy2 = pool.value(self.l2p2y()) - pool.value(self.l2p1y());
            let a = dy1.atan2(dx1) + pool.value(self.angle());
            let ca = a.cos();
            let sa = a.sin();
            let x2 = dx2 * ca + dy2 * sa;
            let y2 = -dx2 * sa + dy2 * ca;
            let r2 = dx2 * dx2 + dy2 * dy2;
            let dx2 = -y2 / r2;
            let dy2 = x2 / r2;
            if param == self.l2p1x() {
                deriv += -ca * dx2 + sa * dy2;
            }
            if param == self.l2p1y() {
                deriv += -sa * dx2 - ca * dy2;
            }
            if param == self.l2p2x() {
                deriv += ca * dx2 - sa * dy2;
            }
            if param == self.l2p2y() {
                deriv += sa * dx2 + ca * dy2;
            }
        }
        if param == self.angle() {
            deriv += -1.0;
        }
        self.scale * deriv
    }

    pub fn max_step(&self, dir: &StepDirection, lim: f64) -> f64 {
        limit_angle_step(self.angle(), dir, lim)
    }
}

/// Parallelism of two lines: cross product of the direction vectors,
/// normalized by the product of their lengths through `rescale`.
///
/// Singular when either line has zero length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parallel {
    pub(crate) pvec: [ParamHandle; 8],
    pub(crate) origpvec: [ParamHandle; 8],
    pub(crate) scale: f64,
}

impl Parallel {
    pub fn new(pool: &ParamPool, l1: Line, l2: Line) -> Self {
        let pvec = [
            l1.p1.x, l1.p1.y, l1.p2.x, l1.p2.y, l2.p1.x, l2.p1.y, l2.p2.x, l2.p2.y,
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

    fn directions(&self, pool: &ParamPool) -> (f64, f64, f64, f64) {
        let dx1 = pool.value(self.l1p1x()) - pool.value(self.l1p2x());
        let dy1 = pool.value(self.l1p1y()) - pool.value(self.l1p2y());
        let dx2 = pool.value(self.l2p1x()) - pool.value(self.l2p2x());
        let dy2 = pool.value(self.l2p1y()) - pool.value(self.l2p2y());
        (dx1, dy1, dx2, dy2)
    }

    pub fn rescale(&mut self, pool: &ParamPool, coef: f64) {
        let (dx1, dy1, dx2, dy2) = self.directions(pool);
        self.scale = coef / ((dx1 * dx1 + dy1 * dy1) * (dx2 * dx2 + dy2 * dy2)).sqrt();
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let (dx1, dy1, dx2, dy2) = self.directions(pool);
        self.scale * (dx1 * dy2 - dy1 * dx2)
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        let (dx1, dy1, dx2, dy2) = self.directions(pool);
        if param == self.l1p1x() {
            deriv += dy2;
        }
        if param == self.l1p2x() {
            deriv += -dy2;
        }
        if param == self.l1p1y() {
            deriv += -dx2;
        }
        if param == self.l1p2y() {
            deriv += dx2;
        }
        if param == self.l2p1x() {
            deriv += -dy1;
        }
        if param == self.l2p2x() {
            deriv += dy1;
        }
        if param == self.l2p1y() {
            deriv += dx1;
        }
        if param == self.l2p2y() {
            deriv += -dx1;
        }
        self.scale * deriv
    }
}

/// Perpendicularity of two lines: dot product of the direction vectors,
/// normalized by the product of their lengths through `rescale`.
///
/// Singular when either line has zero length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perpendicular {
    pub(crate) pvec: [ParamHandle; 8],
    pub(crate) origpvec: [ParamHandle; 8],
    pub(crate) scale: f64,
}

impl Perpendicular {
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

    fn directions(&self, pool: &ParamPool) -> (f64, f64, f64, f64) {
        let dx1 = pool.value(self.l1p1x()) - pool.value(self.l1p2x());
        let dy1 = pool.value(self.l1p1y()) - pool.value(self.l1p2y());
        let dx2 = pool.value(self.l2p1x()) - pool.value(self.l2p2x());
        let dy2 = pool.value(self.l2p1y()) - pool.value(self.l2p2y());
        (dx1, dy1, dx2, dy2)
    }

    pub fn rescale(&mut self, pool: &ParamPool, coef: f64) {
        let (dx1, dy1, dx2, dy2) = self.directions(pool);
        self.scale = coef / ((dx1 * dx1 + dy1 * dy1) * (dx2 * dx2 + dy2 * dy2)).sqrt();
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let (dx1, dy1, dx2, dy2) = self.directions(pool);
        self.scale * (dx1 * dx2 + dy1 * dy2)
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let mut deriv = 0.0;
        let (dx1, dy1, dx2, dy2) = self.directions(pool);
        if param == self.l1p1x() {
            deriv += dx2;
        }
        if param == self.l1p2x() {
            deriv += -dx2;
        }
        if param == self.l1p1y() {
            deriv += dy2;
        }
        if param == self.l1p2y() {
            deriv += -dy2;
        }
        if param == self.l2p1x() {
            deriv += dx1;
        }
        if param == self.l2p2x() {
            deriv += -dx1;
        }
        if param == self.l2p1y() {
            deriv += dy1;
        }
        if param == self.l2p2y() {
            deriv += -dy1;
        }
        self.scale * deriv
    }
}
