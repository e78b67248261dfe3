//! 1D finite-volume simulation of mass transfer from a multilayer packaging
//! wall into a finite, well-mixed contact medium.
//!
//! The wall is a stack of [`models::packaging::Layer`]s with discontinuous
//! diffusivity and Henry-like partition coefficients; the potential C/k is
//! continuous across every interface and the discretization enforces the
//! jump condition through Patankar interface conductances. The semi-discrete
//! system is advanced in dimensionless time by a variable-step BDF driver
//! and post-processed into a [`processing::result::SimResult`] that supports
//! interpolation, concatenation and chained contact scenarios.
//!
//! ```no_run
//! use fvmig_rs::models::medium::Medium;
//! use fvmig_rs::models::packaging::{Layer, Multilayer};
//! use fvmig_rs::numerics::{sqrt_spaced, IntegrationOptions};
//! use fvmig_rs::scenario::simulate;
//!
//! # fn main() -> fvmig_rs::Result<()> {
//! let wall = Multilayer::new(vec![
//!     Layer::new(50e-6, 1e-15, 1.0, 0.0, 30)?,
//!     Layer::new(100e-6, 1e-13, 5.0, 200.0, 30)?,
//! ])?;
//! let medium = Medium::new(0.6, 1e-3, 2.0, 0.0)?;
//! let options = IntegrationOptions::over(sqrt_spaced(30.0 * 86400.0, 200));
//! let result = simulate(&wall, &medium, &options)?;
//! println!("CF after 30 days: {:.4}", result.cf().last().unwrap());
//! # Ok(())
//! # }
//! ```

pub mod discretization;
pub mod error;
pub mod models;
pub mod numerics;
pub mod physics;
pub mod processing;
pub mod scenario;

pub use error::{Error, Result};
