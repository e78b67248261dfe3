pub mod bdf;
pub mod tridiag;

use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;

use crate::discretization::generator::MeshSettings;
use crate::physics::operator::FarBoundary;

/// Absolute/relative tolerance pair on dimensionless concentrations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-8,
            rel: 1e-6,
        }
    }
}

impl Tolerances {
    /// Tolerance-scaled RMS norm of an error estimate; <= 1 means acceptable.
    pub fn error_norm(&self, err: &DVector<f64>, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        let n = err.len();
        debug_assert!(n > 0);
        let mut acc = 0.0;
        for i in 0..n {
            let scale = self.abs + self.rel * a[i].abs().max(b[i].abs());
            let e = err[i] / scale;
            acc += e * e;
        }
        (acc / n as f64).sqrt()
    }
}

/// Callback polled between steps; returning true cancels the integration.
pub type DeadlineFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Per-run integration settings.
#[derive(Clone)]
pub struct IntegrationOptions {
    /// Output times [s]; strictly increasing, final entry is the horizon.
    /// A leading 0 is implied when absent.
    pub time_grid: Vec<f64>,
    pub tol: Tolerances,
    pub far_boundary: FarBoundary,
    pub mesh: MeshSettings,
    /// Step budget; exceeding it cancels the run.
    pub max_steps: Option<usize>,
    /// Wall-clock deadline probe; exceeding it cancels the run.
    pub deadline: Option<DeadlineFn>,
    /// Also emit snapshots at every accepted solver step.
    pub include_solver_steps: bool,
    /// Relative mass-balance drift tolerated before the run is flagged.
    pub mass_balance_tol: f64,
    /// Promote a mass-balance violation from a warning to an error.
    pub fatal_mass_balance: bool,
}

impl IntegrationOptions {
    pub fn over(time_grid: Vec<f64>) -> Self {
        Self {
            time_grid,
            tol: Tolerances::default(),
            far_boundary: FarBoundary::default(),
            mesh: MeshSettings::default(),
            max_steps: None,
            deadline: None,
            include_solver_steps: false,
            mass_balance_tol: 1e-3,
            fatal_mass_balance: false,
        }
    }
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self::over(Vec::new())
    }
}

impl fmt::Debug for IntegrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationOptions")
            .field("time_grid", &self.time_grid.len())
            .field("tol", &self.tol)
            .field("far_boundary", &self.far_boundary)
            .field("mesh", &self.mesh)
            .field("max_steps", &self.max_steps)
            .field("deadline", &self.deadline.is_some())
            .field("include_solver_steps", &self.include_solver_steps)
            .field("mass_balance_tol", &self.mass_balance_tol)
            .field("fatal_mass_balance", &self.fatal_mass_balance)
            .finish()
    }
}

/// Time grid refined near t = 0 (uniform in sqrt t), ending at `t_end`.
pub fn sqrt_spaced(t_end: f64, n: usize) -> Vec<f64> {
    debug_assert!(n >= 2 && t_end > 0.0);
    let root = t_end.sqrt();
    (0..n)
        .map(|i| {
            let s = root * i as f64 / (n - 1) as f64;
            s * s
        })
        .collect()
}

/// Uniform time grid from 0 to `t_end`.
pub fn linspace(t_end: f64, n: usize) -> Vec<f64> {
    debug_assert!(n >= 2 && t_end > 0.0);
    (0..n)
        .map(|i| t_end * i as f64 / (n - 1) as f64)
        .collect()
}
