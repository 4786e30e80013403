//! Relations against an ellipse given by center, first focus and minor
//! radius.
//!
//! With `c` the center, `f1` the first focus and `b` the minor radius, the
//! derived quantities are the focal distance `cf = |f1 - c|`, the major
//! radius `a = sqrt(b^2 + cf^2)` and the second focus `f2 = 2c - f1`. All
//! residuals here are polynomial or rational in the stored parameters, so
//! the gradients are exact closed forms. The expressions are long; each
//! `grad` builds a per-slot partial table and accumulates it over the
//! working dependency list, which keeps aliased parameters correct.
//!
//! Degenerate inputs (coincident foci and center, zero minor radius) divide
//! by zero and surface as non-finite values.

use serde::{Deserialize, Serialize};

use crate::params::{Ellipse, Line, ParamHandle, ParamPool, Point};

/// Accumulate slot partials over the working dependency list.
///
/// A parameter bound to several slots receives the sum of the slot
/// partials, matching the accumulation done by the simpler constraints.
fn accumulate<const N: usize>(
    pvec: &[ParamHandle; N],
    partials: &[f64; N],
    param: ParamHandle,
) -> f64 {
    let mut deriv = 0.0;
    for (handle, partial) in pvec.iter().zip(partials.iter()) {
        if *handle == param {
            deriv += partial;
        }
    }
    deriv
}

/// Point lies on the ellipse.
///
/// The residual is built from the two-focus characterization
/// `r1 + r2 = 2a` with the square roots eliminated: writing `T = r2^2 -
/// r1^2 + 4a^2` (where `r1`, `r2` are the focal distances of the point),
/// the residual is `r2^2 - T^2 / (16 a^2)`, which vanishes exactly on the
/// ellipse and is rational in the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOnEllipse {
    pub(crate) pvec: [ParamHandle; 7],
    pub(crate) origpvec: [ParamHandle; 7],
    pub(crate) scale: f64,
}

impl PointOnEllipse {
    pub fn new(pool: &ParamPool, p: Point, e: Ellipse) -> Self {
        let pvec = [
            p.x, p.y, e.center.x, e.center.y, e.focus1.x, e.focus1.y, e.radmin,
        ];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    // Slot order: px, py, cx, cy, f1x, f1y, radmin.
    fn geometry(&self, pool: &ParamPool) -> (f64, f64, f64, f64, f64, f64, f64, f64) {
        let x0 = pool.value(self.pvec[0]);
        let y0 = pool.value(self.pvec[1]);
        let xc = pool.value(self.pvec[2]);
        let yc = pool.value(self.pvec[3]);
        let xf = pool.value(self.pvec[4]);
        let yf = pool.value(self.pvec[5]);
        let b = pool.value(self.pvec[6]);
        // gx, gy point from the second focus 2c - f1 to the point.
        let gx = x0 + xf - 2.0 * xc;
        let gy = y0 + yf - 2.0 * yc;
        let ex = x0 - xf;
        let ey = y0 - yf;
        let fx = xf - xc;
        let fy = yf - yc;
        (gx, gy, ex, ey, fx, fy, b, b * b + fx * fx + fy * fy)
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let (gx, gy, ex, ey, _fx, _fy, _b, asq) = self.geometry(pool);
        let r2sq = gx * gx + gy * gy;
        let r1sq = ex * ex + ey * ey;
        let t = r2sq - r1sq + 4.0 * asq;
        self.scale * (r2sq - t * t / (16.0 * asq))
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let (gx, gy, ex, ey, fx, fy, b, asq) = self.geometry(pool);
        let r2sq = gx * gx + gy * gy;
        let r1sq = ex * ex + ey * ey;
        let t = r2sq - r1sq + 4.0 * asq;
        let t8a = t / (8.0 * asq);
        let t2_8a2 = t * t / (8.0 * asq * asq);
        let partials = [
            2.0 * gx - t8a * (2.0 * gx - 2.0 * ex),
            2.0 * gy - t8a * (2.0 * gy - 2.0 * ey),
            -4.0 * gx + 4.0 * t8a * (gx + 2.0 * fx) - t2_8a2 * fx,
            -4.0 * gy + 4.0 * t8a * (gy + 2.0 * fy) - t2_8a2 * fy,
            2.0 * gx - t8a * (2.0 * gx + 2.0 * ex + 8.0 * fx) + t2_8a2 * fx,
            2.0 * gy - t8a * (2.0 * gy + 2.0 * ey + 8.0 * fy) + t2_8a2 * fy,
            -8.0 * t8a * b + t2_8a2 * b,
        ];
        self.scale * accumulate(&self.pvec, &partials, param)
    }
}

/// Line is tangent to the ellipse.
///
/// Reflecting one focus across the tangent line lands on the circle of
/// radius `2a` around the other focus. With `s` the signed distance from
/// `f1` to the line over the line length, `(rx, ry)` is half the vector
/// from the reflected `f1` to the second focus, and the residual
/// `4(rx^2 + ry^2) - 4a^2` vanishes exactly at tangency. The root kept is
/// the perpendicular projection of `f1` onto the line, so the same
/// geometric configuration always produces the same residual sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseTangentLine {
    pub(crate) pvec: [ParamHandle; 9],
    pub(crate) origpvec: [ParamHandle; 9],
    pub(crate) scale: f64,
}

impl EllipseTangentLine {
    pub fn new(pool: &ParamPool, l: Line, e: Ellipse) -> Self {
        let pvec = [
            l.p1.x, l.p1.y, l.p2.x, l.p2.y, e.center.x, e.center.y, e.focus1.x, e.focus1.y,
            e.radmin,
        ];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
        };
        c.rescale(pool, 1.0);
        c
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    // Slot order: p1x, p1y, p2x, p2y, cx, cy, f1x, f1y, radmin.
    #[allow(clippy::type_complexity)]
    fn geometry(&self, pool: &ParamPool) -> (f64, f64, f64, f64, f64, f64, f64, f64, f64, f64, f64) {
        let x1 = pool.value(self.pvec[0]);
        let y1 = pool.value(self.pvec[1]);
        let x2 = pool.value(self.pvec[2]);
        let y2 = pool.value(self.pvec[3]);
        let xc = pool.value(self.pvec[4]);
        let yc = pool.value(self.pvec[5]);
        let xf = pool.value(self.pvec[6]);
        let yf = pool.value(self.pvec[7]);
        let b = pool.value(self.pvec[8]);
        let dx = x1 - x2;
        let dy = y1 - y2;
        let lsq = dx * dx + dy * dy;
        let ex = x1 - xf;
        let ey = y1 - yf;
        // Signed area of (p1, p2, f1) over the squared line length.
        let s = (ex * dy - dx * ey) / lsq;
        let fx = xf - xc;
        let fy = yf - yc;
        let rx = fx + dy * s;
        let ry = -fy + dx * s;
        (dx, dy, lsq, ex, ey, s, fx, fy, rx, ry, b)
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        let (_dx, _dy, _lsq, _ex, _ey, _s, fx, fy, rx, ry, b) = self.geometry(pool);
        // 4(rx^2 + ry^2) is |f2 - reflect(f1)|^2; 4a^2 = 4b^2 + 4cf^2.
        self.scale * (4.0 * (rx * rx + ry * ry) - 4.0 * b * b - 4.0 * (fx * fx + fy * fy))
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        let (dx, dy, lsq, ex, ey, s, _fx, _fy, rx, ry, b) = self.geometry(pool);

        // Partials of s with respect to the four line endpoints.
        let ds_x1 = (dy - ey) / lsq - 2.0 * s * dx / lsq;
        let ds_y1 = (ex - dx) / lsq - 2.0 * s * dy / lsq;
        let ds_x2 = ey / lsq + 2.0 * s * dx / lsq;
        let ds_y2 = -ex / lsq + 2.0 * s * dy / lsq;

        // rx = fx + dy*s, ry = -fy + dx*s; chain through dx, dy and s.
        let endpoint = |ddx: f64, ddy: f64, ds: f64| {
            let drx = ddy * s + dy * ds;
            let dry = ddx * s + dx * ds;
            8.0 * (rx * drx + ry * dry)
        };

        let partials = [
            endpoint(1.0, 0.0, ds_x1),
            endpoint(0.0, 1.0, ds_y1),
            endpoint(-1.0, 0.0, ds_x2),
            endpoint(0.0, -1.0, ds_y2),
            // Center: the -8*fx/-8*fy terms cancel against the rx/ry ones.
            -8.0 * dy * s,
            8.0 * dx * s,
            8.0 * rx * (1.0 - dy * dy / lsq) - 8.0 * ry * dx * dy / lsq - 8.0 * (rx - dy * s),
            8.0 * rx * dx * dy / lsq + 8.0 * ry * (dx * dx / lsq - 1.0) + 8.0 * (ry - dx * s),
            -8.0 * b,
        ];
        self.scale * accumulate(&self.pvec, &partials, param)
    }
}

/// Which ellipse landmark an internally aligned point is pinned to, per
/// coordinate.
///
/// Major and minor axis endpoints come in positive/negative pairs along
/// the focal direction; the two focus variants place the second focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternalAlignment {
    EllipsePositiveMajorX,
    EllipsePositiveMajorY,
    EllipseNegativeMajorX,
    EllipseNegativeMajorY,
    EllipsePositiveMinorX,
    EllipsePositiveMinorY,
    EllipseNegativeMinorX,
    EllipseNegativeMinorY,
    EllipseFocus2X,
    EllipseFocus2Y,
}

/// One coordinate of a point is pinned to an ellipse landmark chosen by an
/// [`InternalAlignment`] mode.
///
/// With `u = (f1 - c)/cf` the unit focal direction, the major endpoints
/// sit at `c +- a*u`, the minor endpoints at `c +- b*perp(u)` and the
/// second focus at `2c - f1`. X modes constrain the x coordinate only and
/// Y modes the y coordinate, so pinning a point takes a pair of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalAlignmentPoint2Ellipse {
    pub(crate) pvec: [ParamHandle; 7],
    pub(crate) origpvec: [ParamHandle; 7],
    pub(crate) scale: f64,
    alignment: InternalAlignment,
}

impl InternalAlignmentPoint2Ellipse {
    pub fn new(pool: &ParamPool, e: Ellipse, p: Point, alignment: InternalAlignment) -> Self {
        let pvec = [
            p.x, p.y, e.center.x, e.center.y, e.focus1.x, e.focus1.y, e.radmin,
        ];
        let mut c = Self {
            pvec,
            origpvec: pvec,
            scale: 1.0,
            alignment,
        };
        c.rescale(pool, 1.0);
        c
    }

    pub fn alignment(&self) -> InternalAlignment {
        self.alignment
    }

    pub fn rescale(&mut self, _pool: &ParamPool, coef: f64) {
        self.scale = coef;
    }

    // Slot order: px, py, cx, cy, f1x, f1y, radmin.
    fn geometry(&self, pool: &ParamPool) -> (f64, f64, f64, f64, f64) {
        let xc = pool.value(self.pvec[2]);
        let yc = pool.value(self.pvec[3]);
        let xf = pool.value(self.pvec[4]);
        let yf = pool.value(self.pvec[5]);
        let b = pool.value(self.pvec[6]);
        let fx = xf - xc;
        let fy = yf - yc;
        let cf = (fx * fx + fy * fy).sqrt();
        let ux = fx / cf;
        let uy = fy / cf;
        let a = (b * b + cf * cf).sqrt();
        (cf, ux, uy, a, b)
    }

    pub fn error(&self, pool: &ParamPool) -> f64 {
        use InternalAlignment::*;
        let x1 = pool.value(self.pvec[0]);
        let y1 = pool.value(self.pvec[1]);
        let xc = pool.value(self.pvec[2]);
        let yc = pool.value(self.pvec[3]);
        let xf = pool.value(self.pvec[4]);
        let yf = pool.value(self.pvec[5]);
        let err = match self.alignment {
            EllipseFocus2X => x1 + xf - 2.0 * xc,
            EllipseFocus2Y => y1 + yf - 2.0 * yc,
            _ => {
                let (_cf, ux, uy, a, b) = self.geometry(pool);
                match self.alignment {
                    EllipsePositiveMajorX => x1 - xc - a * ux,
                    EllipsePositiveMajorY => y1 - yc - a * uy,
                    EllipseNegativeMajorX => x1 - xc + a * ux,
                    EllipseNegativeMajorY => y1 - yc + a * uy,
                    EllipsePositiveMinorX => x1 - xc + b * uy,
                    EllipsePositiveMinorY => y1 - yc - b * ux,
                    EllipseNegativeMinorX => x1 - xc - b * uy,
                    EllipseNegativeMinorY => y1 - yc + b * ux,
                    EllipseFocus2X | EllipseFocus2Y => unreachable!(),
                }
            }
        };
        self.scale * err
    }

    pub fn grad(&self, pool: &ParamPool, param: ParamHandle) -> f64 {
        use InternalAlignment::*;
        // Slot order: px, py, cx, cy, f1x, f1y, radmin.
        let partials: [f64; 7] = match self.alignment {
            EllipseFocus2X => [1.0, 0.0, -2.0, 0.0, 1.0, 0.0, 0.0],
            EllipseFocus2Y => [0.0, 1.0, 0.0, -2.0, 0.0, 1.0, 0.0],
            _ => {
                let (cf, ux, uy, a, b) = self.geometry(pool);
                // d(a*ux)/df1 and friends, with center partials negated.
                let daux_dxf = ux * ux * cf / a + a * uy * uy / cf;
                let daux_dyf = ux * uy * (cf / a - a / cf);
                let dauy_dyf = uy * uy * cf / a + a * ux * ux / cf;
                let dauy_dxf = daux_dyf;
                match self.alignment {
                    EllipsePositiveMajorX => [
                        1.0,
                        0.0,
                        -1.0 + daux_dxf,
                        daux_dyf,
                        -daux_dxf,
                        -daux_dyf,
                        -ux * b / a,
                    ],
                    EllipseNegativeMajorX => [
                        1.0,
                        0.0,
                        -1.0 - daux_dxf,
                        -daux_dyf,
                        daux_dxf,
                        daux_dyf,
                        ux * b / a,
                    ],
                    EllipsePositiveMajorY => [
                        0.0,
                        1.0,
                        dauy_dxf,
                        -1.0 + dauy_dyf,
                        -dauy_dxf,
                        -dauy_dyf,
                        -uy * b / a,
                    ],
                    EllipseNegativeMajorY => [
                        0.0,
                        1.0,
                        -dauy_dxf,
                        -1.0 - dauy_dyf,
                        dauy_dxf,
                        dauy_dyf,
                        uy * b / a,
                    ],
                    EllipsePositiveMinorX => [
                        1.0,
                        0.0,
                        -1.0 + b * ux * uy / cf,
                        -b * ux * ux / cf,
                        -b * ux * uy / cf,
                        b * ux * ux / cf,
                        uy,
                    ],
                    EllipseNegativeMinorX => [
                        1.0,
                        0.0,
                        -1.0 - b * ux * uy / cf,
                        b * ux * ux / cf,
                        b * ux * uy / cf,
                        -b * ux * ux / cf,
                        -uy,
                    ],
                    EllipsePositiveMinorY => [
                        0.0,
                        1.0,
                        b * uy * uy / cf,
                        -1.0 - b * ux * uy / cf,
                        -b * uy * uy / cf,
                        b * ux * uy / cf,
                        -ux,
                    ],
                    EllipseNegativeMinorY => [
                        0.0,
                        1.0,
                        -b * uy * uy / cf,
                        -1.0 + b * ux * uy / cf,
                        b * uy * uy / cf,
                        -b * ux * uy / cf,
                        ux,
                    ],
                    EllipseFocus2X | EllipseFocus2Y => unreachable!(),
                }
            }
        };
        self.scale * accumulate(&self.pvec, &partials, param)
    }
}
