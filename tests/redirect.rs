//! Parameter redirection: positional substitution, composition from the
//! canonical list, and full reversal.

use approx::assert_relative_eq;
use gcs2d::{Assembly, Constraint, ParamPool, Point, RedirectMap};

fn point(pool: &mut ParamPool, x: f64, y: f64) -> Point {
    Point::new(pool.add(x), pool.add(y))
}

#[test]
fn redirected_constraint_evaluates_against_substitutes() {
    let mut pool = ParamPool::new();
    let p1 = point(&mut pool, 0.0, 0.0);
    let p2 = point(&mut pool, 3.0, 4.0);
    let d = pool.add(5.0);
    let trial_y = pool.add(0.0);

    let mut c = Constraint::p2p_distance(&pool, p1, p2, d);
    assert_relative_eq!(c.error(&pool), 0.0);

    // Substituting a trial unknown for p2.y flattens the triangle.
    let mut map = RedirectMap::new();
    map.insert(p2.y, trial_y);
    c.redirect_params(&map);
    assert_relative_eq!(c.error(&pool), -2.0);

    // Gradients follow the working list: the displaced parameter reports
    // zero, the substitute reports the slot partial.
    assert_eq!(c.grad(&pool, p2.y), 0.0);
    assert_relative_eq!(c.grad(&pool, trial_y), 0.0);
    assert_relative_eq!(c.grad(&pool, p2.x), 1.0);
}

#[test]
fn revert_restores_canonical_evaluation() {
    let mut pool = ParamPool::new();
    let p1 = point(&mut pool, 0.0, 0.0);
    let p2 = point(&mut pool, 3.0, 4.0);
    let d = pool.add(5.0);
    let substitute = pool.add(100.0);

    let mut c = Constraint::p2p_distance(&pool, p1, p2, d);
    let original = c.error(&pool);

    let mut map = RedirectMap::new();
    map.insert(d, substitute);
    c.redirect_params(&map);
    assert_relative_eq!(c.error(&pool), 5.0 - 100.0);

    c.revert_params();
    assert_relative_eq!(c.error(&pool), original);
    assert_eq!(c.params(), c.canonical_params());
}

#[test]
fn redirection_keys_match_canonical_not_current() {
    let mut pool = ParamPool::new();
    let a = pool.add(1.0);
    let b = pool.add(2.0);
    let s1 = pool.add(3.0);
    let s2 = pool.add(4.0);

    let mut c = Constraint::equal(&pool, a, b);

    let mut map = RedirectMap::new();
    map.insert(a, s1);
    c.redirect_params(&map);
    assert_eq!(c.params(), &[s1, b]);

    // Keyed on the current substitute: no effect, substitution never
    // chains.
    let mut map = RedirectMap::new();
    map.insert(s1, s2);
    c.redirect_params(&map);
    assert_eq!(c.params(), &[s1, b]);

    // Keyed on the canonical parameter: replaces in one hop.
    let mut map = RedirectMap::new();
    map.insert(a, s2);
    c.redirect_params(&map);
    assert_eq!(c.params(), &[s2, b]);
}

#[test]
fn unmapped_slots_are_untouched() {
    let mut pool = ParamPool::new();
    let p1 = point(&mut pool, 0.0, 0.0);
    let p2 = point(&mut pool, 3.0, 4.0);
    let d = pool.add(5.0);
    let s = pool.add(9.0);

    let mut c = Constraint::p2p_distance(&pool, p1, p2, d);
    let mut map = RedirectMap::new();
    map.insert(p1.x, s);
    c.redirect_params(&map);

    assert_eq!(c.params(), &[s, p1.y, p2.x, p2.y, d]);
}

#[test]
fn system_wide_redirect_and_revert() {
    let mut pool = ParamPool::new();
    let a = pool.add(2.0);
    let b = pool.add(2.0);
    let c_param = pool.add(2.0);
    let trial = pool.add(7.0);

    let mut sys = Assembly::new();
    sys.push(Constraint::equal(&pool, a, b));
    sys.push(Constraint::equal(&pool, b, c_param));

    let mut map = RedirectMap::new();
    map.insert(b, trial);
    sys.redirect_params(&map);

    // Both constraints referenced b; both now see the trial value.
    let r = sys.residuals(&pool);
    assert_relative_eq!(r[0], -5.0);
    assert_relative_eq!(r[1], 5.0);

    sys.revert_params();
    let r = sys.residuals(&pool);
    assert_relative_eq!(r[0], 0.0);
    assert_relative_eq!(r[1], 0.0);
}
