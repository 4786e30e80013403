//! The constraint variant catalog.
//!
//! One file per category of residual:
//!
//! - `basic`: plain scalar relations (equality, fixed difference)
//! - `distance`: metric relations built from norms and triangle areas
//! - `angle`: orientation relations built from cross/dot products and atan2
//! - `ellipse`: relations against the center/focus/minor-radius ellipse
//!
//! Every variant stores two fixed-size handle arrays (canonical and working
//! dependency lists) plus its conditioning scale, and implements `error`,
//! `grad` and `rescale` as inherent methods; the [`crate::Constraint`] enum
//! dispatches over them. Gradients accumulate slot by slot, so a parameter
//! bound to several slots of one constraint receives the sum of the slot
//! partials.

pub mod angle;
pub mod basic;
pub mod distance;
pub mod ellipse;
