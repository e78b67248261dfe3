use log::{debug, trace};
use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::numerics::{tridiag, DeadlineFn, Tolerances};
use crate::physics::operator::TransferOperator;

/// Relative step-size floor; below this fraction of the span the step
/// controller is considered stalled.
const H_FLOOR_FRACTION: f64 = 1e-13;
/// Default step budget when the caller sets none.
const DEFAULT_MAX_STEPS: usize = 200_000;

/// Variable-step BDF(1/2) driver for the linear system du/dFo = L u.
///
/// The operator is constant, so every implicit stage reduces to one
/// tridiagonal (or cyclic) solve; the analytic Jacobian is the operator
/// itself and no Newton iteration is needed. A backward-Euler companion
/// solution provides the embedded error estimate.
pub struct StiffIntegrator<'a> {
    op: &'a TransferOperator,
    pub tol: Tolerances,
    pub max_steps: usize,
    pub deadline: Option<DeadlineFn>,
    pub include_solver_steps: bool,
}

/// Accepted/rejected step counts of one integration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepStats {
    pub accepted: usize,
    pub rejected: usize,
    pub last_dt: f64,
}

/// Monotone snapshots of one integration, on the caller grid (plus solver
/// steps when requested).
pub struct Integration {
    pub fo: Vec<f64>,
    pub states: Vec<DVector<f64>>,
    pub stats: StepStats,
}

impl<'a> StiffIntegrator<'a> {
    pub fn new(op: &'a TransferOperator) -> Self {
        Self {
            op,
            tol: Tolerances::default(),
            max_steps: DEFAULT_MAX_STEPS,
            deadline: None,
            include_solver_steps: false,
        }
    }

    /// Solve (I - c L) x = rhs.
    fn solve_shifted(&self, c: f64, rhs: &DVector<f64>) -> DVector<f64> {
        let (lower, main, upper) = self.op.diagonals();
        let n = main.len();
        let s_lower: Vec<f64> = lower.iter().map(|v| -c * v).collect();
        let s_main: Vec<f64> = main.iter().map(|v| 1.0 - c * v).collect();
        let s_upper: Vec<f64> = upper.iter().map(|v| -c * v).collect();

        let x = match self.op.corner() {
            Some((tr, bl)) if n >= 3 => tridiag::solve_cyclic(
                &s_lower,
                &s_main,
                &s_upper,
                -c * tr,
                -c * bl,
                rhs.as_slice(),
            ),
            _ => tridiag::solve(&s_lower, &s_main, &s_upper, rhs.as_slice()),
        };
        DVector::from_vec(x)
    }

    fn initial_step(&self, span: f64, u: &DVector<f64>, f: &DVector<f64>) -> f64 {
        let mut d0 = 0.0;
        let mut d1 = 0.0;
        for i in 0..u.len() {
            let scale = self.tol.abs + self.tol.rel * u[i].abs();
            d0 += (u[i] / scale).powi(2);
            d1 += (f[i] / scale).powi(2);
        }
        let (d0, d1) = (d0.sqrt(), d1.sqrt());
        let h = if d1 > 1e-300 {
            0.01 * d0 / d1
        } else {
            span * 1e-6
        };
        h.clamp(span * 1e-10, span * 1e-2)
    }

    /// Integrate from Fo = 0 over the strictly increasing grid (grid[0] == 0).
    pub fn integrate(&self, u0: DVector<f64>, grid: &[f64]) -> Result<Integration> {
        debug_assert!(grid.len() >= 2 && grid[0] == 0.0);
        let span = *grid.last().expect("non-empty grid");
        let tiny = span * 1e-12;

        let mut fo = Vec::with_capacity(grid.len());
        let mut states = Vec::with_capacity(grid.len());
        fo.push(0.0);
        states.push(u0.clone());

        let mut t = 0.0;
        let mut u = u0;
        let mut f = self.op.derivative(&u);
        let mut h = self.initial_step(span, &u, &f);
        let mut prev: Option<(DVector<f64>, f64)> = None;
        let mut grid_idx = 1;
        let mut stats = StepStats::default();
        let mut last_err = 0.0;

        debug!(
            "BDF integration over Fo in [0, {span:.3e}], {} unknowns, h0 = {h:.3e}",
            u.len()
        );

        while t < span - tiny {
            if stats.accepted + stats.rejected >= self.max_steps {
                return Err(Error::Cancelled {
                    t_last: t,
                    chain_step: None,
                });
            }
            if let Some(deadline) = &self.deadline {
                if deadline() {
                    return Err(Error::Cancelled {
                        t_last: t,
                        chain_step: None,
                    });
                }
            }

            h = h.min(span - t);
            if h < span * H_FLOOR_FRACTION {
                return Err(Error::IntegrationFailure {
                    t_last: t,
                    error_norm: last_err,
                    chain_step: None,
                });
            }

            // backward-Euler companion: (I - h L) u_be = u_n
            let u_be = self.solve_shifted(h, &u);

            let (candidate, err_vec, order) = match &prev {
                None => {
                    // trapezoidal comparison estimates the first-step error
                    let f_be = self.op.derivative(&u_be);
                    let err = (&f_be - &f) * (0.5 * h);
                    (u_be, err, 1u32)
                }
                Some((u_prev, h_prev)) => {
                    let rho = h / *h_prev;
                    let denom = 1.0 + 2.0 * rho;
                    let beta = (1.0 + rho) / denom;
                    let a0 = (1.0 + rho) * (1.0 + rho) / denom;
                    let a1 = rho * rho / denom;
                    let rhs = &u * a0 - u_prev * a1;
                    let u2 = self.solve_shifted(beta * h, &rhs);
                    let err = &u2 - &u_be;
                    (u2, err, 2u32)
                }
            };

            let err = self.tol.error_norm(&err_vec, &u, &candidate);
            last_err = err;

            if err <= 1.0 {
                let t_new = t + h;
                let f_new = self.op.derivative(&candidate);

                // dense output: cubic Hermite on (t, t_new]
                while grid_idx < grid.len() && grid[grid_idx] <= t_new + tiny {
                    let tq = grid[grid_idx];
                    let state = if tq >= t_new - tiny {
                        candidate.clone()
                    } else {
                        hermite(&u, &f, &candidate, &f_new, h, (tq - t) / h)
                    };
                    fo.push(tq);
                    states.push(state);
                    grid_idx += 1;
                }
                if self.include_solver_steps
                    && t_new < span - tiny
                    && fo.last().map_or(true, |&last| t_new > last + tiny)
                {
                    fo.push(t_new);
                    states.push(candidate.clone());
                }

                trace!(
                    "step {:>5} | Fo = {t_new:.6e} | h = {h:.3e} | err = {err:.3e}",
                    stats.accepted
                );
                prev = Some((std::mem::replace(&mut u, candidate), h));
                f = f_new;
                t = t_new;
                stats.accepted += 1;
                stats.last_dt = h;
            } else {
                stats.rejected += 1;
            }

            let exponent = -1.0 / (order as f64 + 1.0);
            let factor = if err <= f64::MIN_POSITIVE {
                4.0
            } else {
                (0.9 * err.powf(exponent)).clamp(0.2, 4.0)
            };
            h *= factor;
        }

        // guard against grid points lost to roundoff at the horizon
        while grid_idx < grid.len() {
            fo.push(grid[grid_idx]);
            states.push(u.clone());
            grid_idx += 1;
        }

        debug!(
            "BDF done: {} accepted, {} rejected, final h = {:.3e}",
            stats.accepted, stats.rejected, stats.last_dt
        );
        Ok(Integration { fo, states, stats })
    }
}

/// Cubic Hermite interpolant on one accepted step, theta in [0, 1].
fn hermite(
    u0: &DVector<f64>,
    f0: &DVector<f64>,
    u1: &DVector<f64>,
    f1: &DVector<f64>,
    h: f64,
    theta: f64,
) -> DVector<f64> {
    let t2 = theta * theta;
    let t3 = t2 * theta;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + theta;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    u0 * h00 + f0 * (h10 * h) + u1 * h01 + f1 * (h11 * h)
}
