//! # gcs2d
//!
//! `gcs2d` is the constraint-evaluation core of a 2D geometric constraint
//! solver. Given a pool of scalar unknowns (point coordinates, radii, angles,
//! distances) and a set of geometric constraints between them, it supplies,
//! for each constraint:
//!
//! - a scaled residual that is zero exactly when the relation holds,
//! - the analytic partial derivative with respect to any unknown,
//! - a bound on how far a proposed solver step may move before the constraint
//!   leaves its domain of validity.
//!
//! The library provides:
//! - A parameter arena with stable integer handles ([`ParamPool`], [`ParamHandle`])
//! - A closed catalog of constraint types ([`Constraint`]) covering equality,
//!   distance, angle, incidence, tangency and ellipse relations
//! - Residual-vector and Jacobian assembly over a constraint set, sequential
//!   and parallel ([`assembly`])
//!
//! The nonlinear iteration itself (Newton / Levenberg-Marquardt damping,
//! linear solves) is the caller's business: the driver evaluates residuals and
//! gradients through this crate, proposes a step direction, asks every
//! constraint for its step limit, and only then writes new parameter values.
//!
//! ## Basic Usage
//!
//! ```
//! use gcs2d::{Constraint, ParamPool, Point};
//!
//! let mut pool = ParamPool::new();
//! let p1 = Point::new(pool.add(0.0), pool.add(0.0));
//! let p2 = Point::new(pool.add(3.0), pool.add(4.0));
//! let d = pool.add(5.0);
//!
//! let c = Constraint::p2p_distance(&pool, p1, p2, d);
//! assert!(c.error(&pool).abs() < 1e-12);
//! ```

pub mod assembly;
pub mod constraint;
pub mod constraints;
pub mod error;
pub mod params;

// Re-exports for convenience
pub use assembly::Assembly;
pub use constraint::{Constraint, ConstraintType};
pub use constraints::ellipse::InternalAlignment;
pub use error::{GcsError, Result};
pub use params::{Ellipse, Line, ParamHandle, ParamPool, Point, RedirectMap, StepDirection};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
