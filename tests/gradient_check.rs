//! Analytic gradients checked against central finite differences for every
//! constraint kind, over randomized non-degenerate configurations.
//!
//! Configurations are drawn from a seeded ChaCha generator so failures are
//! reproducible. Geometry is constructed with minimum separations so no
//! trial lands on a singularity or on the kink of an absolute-value
//! residual.

use gcs2d::{Constraint, Ellipse, InternalAlignment, Line, ParamHandle, ParamPool, Point};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const TRIALS: usize = 12;
const H: f64 = 1e-6;

fn fd_grad(c: &Constraint, pool: &mut ParamPool, param: ParamHandle) -> f64 {
    let x = pool.value(param);
    pool.set_value(param, x + H).unwrap();
    let forward = c.error(pool);
    pool.set_value(param, x - H).unwrap();
    let backward = c.error(pool);
    pool.set_value(param, x).unwrap();
    (forward - backward) / (2.0 * H)
}

/// Compare the analytic gradient against central differences for every
/// parameter the constraint depends on, plus one foreign parameter.
fn check_gradients(c: &Constraint, pool: &mut ParamPool) {
    let mut params: Vec<ParamHandle> = c.params().to_vec();
    params.sort_unstable();
    params.dedup();
    for param in params {
        let analytic = c.grad(pool, param);
        let numeric = fd_grad(c, pool, param);
        assert!(
            (analytic - numeric).abs() <= 1e-5 * (1.0 + numeric.abs()),
            "{:?}: d/d{:?} analytic {} vs numeric {}",
            c.type_id(),
            param,
            analytic,
            numeric
        );
    }

    let foreign = pool.add(0.123);
    assert_eq!(c.grad(pool, foreign), 0.0);
}

fn rand_point(pool: &mut ParamPool, rng: &mut ChaCha8Rng) -> Point {
    Point::new(
        pool.add(rng.gen_range(-5.0..5.0)),
        pool.add(rng.gen_range(-5.0..5.0)),
    )
}

/// A point separated from `from` by at least one unit in each coordinate.
fn rand_offset_point(pool: &mut ParamPool, rng: &mut ChaCha8Rng, from: Point) -> Point {
    let sx = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let sy = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    Point::new(
        pool.add(pool.value(from.x) + sx * rng.gen_range(1.0..4.0)),
        pool.add(pool.value(from.y) + sy * rng.gen_range(1.0..4.0)),
    )
}

fn rand_line(pool: &mut ParamPool, rng: &mut ChaCha8Rng) -> Line {
    let p1 = rand_point(pool, rng);
    let p2 = rand_offset_point(pool, rng, p1);
    Line::new(p1, p2)
}

/// Center and focus at least one unit apart, minor radius bounded away from
/// zero.
fn rand_ellipse(pool: &mut ParamPool, rng: &mut ChaCha8Rng) -> Ellipse {
    let center = rand_point(pool, rng);
    let focus1 = rand_offset_point(pool, rng, center);
    let radmin = pool.add(rng.gen_range(0.5..2.5));
    Ellipse::new(center, focus1, radmin)
}

#[test]
fn equal_and_difference() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let a = pool.add(rng.gen_range(-5.0..5.0));
        let b = pool.add(rng.gen_range(-5.0..5.0));
        let d = pool.add(rng.gen_range(-5.0..5.0));
        check_gradients(&Constraint::equal(&pool, a, b), &mut pool);
        check_gradients(&Constraint::difference(&pool, a, b, d), &mut pool);
    }
}

#[test]
fn p2p_distance() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let p1 = rand_point(&mut pool, &mut rng);
        let p2 = rand_offset_point(&mut pool, &mut rng, p1);
        let d = pool.add(rng.gen_range(0.5..5.0));
        check_gradients(&Constraint::p2p_distance(&pool, p1, p2, d), &mut pool);
    }
}

#[test]
fn p2p_angle() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let p1 = rand_point(&mut pool, &mut rng);
        let p2 = rand_offset_point(&mut pool, &mut rng, p1);
        // Keep the residual well inside (-pi, pi), away from the atan2 cut.
        let measured = (pool.value(p2.y) - pool.value(p1.y))
            .atan2(pool.value(p2.x) - pool.value(p1.x));
        let angle = pool.add(measured + rng.gen_range(-1.0..1.0));
        check_gradients(&Constraint::p2p_angle(&pool, p1, p2, angle), &mut pool);

        let da = rng.gen_range(-0.5..0.5);
        pool.set_value(angle, pool.value(angle) - da).unwrap();
        check_gradients(
            &Constraint::p2p_angle_offset(&pool, p1, p2, angle, da),
            &mut pool,
        );
    }
}

#[test]
fn p2l_distance() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        // Near-horizontal line with the point at least one unit above it
        // keeps the unsigned area away from its kink at zero.
        let l1 = Point::new(
            pool.add(rng.gen_range(-5.0..0.0)),
            pool.add(rng.gen_range(-2.0..2.0)),
        );
        let l2 = Point::new(
            pool.add(pool.value(l1.x) + rng.gen_range(2.0..5.0)),
            pool.add(pool.value(l1.y) + rng.gen_range(-0.3..0.3)),
        );
        let p = Point::new(
            pool.add(rng.gen_range(-3.0..3.0)),
            pool.add(pool.value(l1.y) + rng.gen_range(2.0..5.0)),
        );
        let d = pool.add(rng.gen_range(0.5..5.0));
        check_gradients(
            &Constraint::p2l_distance(&pool, p, Line::new(l1, l2), d),
            &mut pool,
        );
        check_gradients(
            &Constraint::point_on_line(&pool, p, Line::new(l1, l2)),
            &mut pool,
        );
    }
}

#[test]
fn point_on_perp_bisector() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let l = rand_line(&mut pool, &mut rng);
        let p = rand_offset_point(&mut pool, &mut rng, l.p1);
        check_gradients(&Constraint::point_on_perp_bisector(&pool, p, l), &mut pool);
    }
}

#[test]
fn parallel_and_perpendicular() {
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let l1 = rand_line(&mut pool, &mut rng);
        let l2 = rand_line(&mut pool, &mut rng);
        check_gradients(&Constraint::parallel(&pool, l1, l2), &mut pool);
        check_gradients(&Constraint::perpendicular(&pool, l1, l2), &mut pool);
    }
}

#[test]
fn l2l_angle() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let l1 = rand_line(&mut pool, &mut rng);
        let l2 = rand_line(&mut pool, &mut rng);
        let a1 = (pool.value(l1.p2.y) - pool.value(l1.p1.y))
            .atan2(pool.value(l1.p2.x) - pool.value(l1.p1.x));
        let a2 = (pool.value(l2.p2.y) - pool.value(l2.p1.y))
            .atan2(pool.value(l2.p2.x) - pool.value(l2.p1.x));
        let angle = pool.add(a2 - a1 + rng.gen_range(-1.0..1.0));
        check_gradients(&Constraint::l2l_angle(&pool, l1, l2, angle), &mut pool);
    }
}

#[test]
fn midpoint_on_line() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let l1 = rand_line(&mut pool, &mut rng);
        let l2 = rand_line(&mut pool, &mut rng);
        check_gradients(&Constraint::midpoint_on_line(&pool, l1, l2), &mut pool);
    }
}

#[test]
fn tangent_circumf() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let c1 = rand_point(&mut pool, &mut rng);
        let c2 = rand_offset_point(&mut pool, &mut rng, c1);
        // Radii separated by at least half a unit so the internal residual
        // |r1 - r2| stays away from its kink.
        let r1 = pool.add(rng.gen_range(1.0..3.0));
        let r2 = pool.add(pool.value(r1) + rng.gen_range(0.5..2.0));
        check_gradients(
            &Constraint::tangent_circumf(&pool, c1, c2, r1, r2, false),
            &mut pool,
        );
        check_gradients(
            &Constraint::tangent_circumf(&pool, c1, c2, r1, r2, true),
            &mut pool,
        );
    }
}

#[test]
fn point_on_ellipse() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let e = rand_ellipse(&mut pool, &mut rng);
        let p = rand_point(&mut pool, &mut rng);
        check_gradients(&Constraint::point_on_ellipse(&pool, p, e), &mut pool);
    }
}

#[test]
fn ellipse_tangent_line() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..TRIALS {
        let mut pool = ParamPool::new();
        let e = rand_ellipse(&mut pool, &mut rng);
        let l = rand_line(&mut pool, &mut rng);
        check_gradients(&Constraint::ellipse_tangent_line(&pool, l, e), &mut pool);
    }
}

#[test]
fn internal_alignment_point2ellipse() {
    use InternalAlignment::*;
    let modes = [
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
    ];
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    for mode in modes {
        for _ in 0..TRIALS / 2 {
            let mut pool = ParamPool::new();
            let e = rand_ellipse(&mut pool, &mut rng);
            let p = rand_point(&mut pool, &mut rng);
            check_gradients(
                &Constraint::internal_alignment_point2ellipse(&pool, e, p, mode),
                &mut pool,
            );
        }
    }
}
