//! Add-medication wizard: transient form state, step descriptors, and the
//! controller that walks a flow and persists the result.

pub mod controller;
pub mod form;
pub mod steps;

pub use controller::*;
pub use form::*;
pub use steps::*;
