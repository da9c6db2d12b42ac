//! Small numeric routines behind the numeric service.

mod optimize;
mod quadrature;
mod stats;

use thiserror::Error;

pub use optimize::{minimize_scalar, Minimum};
pub use quadrature::{integrate, Quadrature};
pub use stats::{describe, Summary};

#[derive(Debug, Error, PartialEq)]
pub enum NumericsError {
    #[error("data must contain at least one value")]
    EmptyData,

    #[error("{0} is not finite")]
    NonFinite(&'static str),

    #[error("could not bracket a minimum from x = {0}")]
    NoMinimum(f64),
}

/// f(x) = x^2 + 5x + 10, minimised by the optimize endpoint.
pub fn objective_function(x: f64) -> f64 {
    x * x + 5.0 * x + 10.0
}

/// f(x) = x^2, integrated by the integrate endpoint.
pub fn integrand_function(x: f64) -> f64 {
    x * x
}
