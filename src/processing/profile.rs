use crate::error::{Error, Result};
use crate::physics::scaling::Normalized;

/// A concentration profile C(x) sampled at non-decreasing positions.
///
/// Linear interpolation between samples; zero outside the sampled range
/// (the wall does not extend past its faces).
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    x: Vec<f64>,
    c: Vec<f64>,
}

impl Profile {
    pub fn new(x: Vec<f64>, c: Vec<f64>) -> Result<Self> {
        if x.len() != c.len() || x.is_empty() {
            return Err(Error::invalid(format!(
                "profile needs matching non-empty coordinate arrays, got {} and {}",
                x.len(),
                c.len()
            )));
        }
        if x.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::invalid("profile positions must be non-decreasing"));
        }
        Ok(Self { x, c })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn c(&self) -> &[f64] {
        &self.c
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Linear interpolation at `xq`; zero outside the sampled range.
    pub fn interp(&self, xq: f64) -> f64 {
        let n = self.x.len();
        if xq < self.x[0] || xq > self.x[n - 1] {
            return 0.0;
        }
        let idx = match self.x.partition_point(|&x| x < xq) {
            0 => 0,
            i => i - 1,
        };
        let i = idx.min(n - 2);
        let (xa, xb) = (self.x[i], self.x[i + 1]);
        if xb - xa <= 0.0 {
            return self.c[i];
        }
        let frac = (xq - xa) / (xb - xa);
        self.c[i] + frac * (self.c[i + 1] - self.c[i])
    }

    /// Trapezoid integral of C over x.
    pub fn integrate(&self) -> f64 {
        self.x
            .windows(2)
            .zip(self.c.windows(2))
            .map(|(x, c)| 0.5 * (c[0] + c[1]) * (x[1] - x[0]))
            .sum()
    }

    /// Integral-mean concentration.
    pub fn mean(&self) -> f64 {
        let width = self.x[self.x.len() - 1] - self.x[0];
        if width <= 0.0 {
            self.c[0]
        } else {
            self.integrate() / width
        }
    }
}

/// Positions of the reconstructed profile: west face, center and east face
/// of every cell. Face positions are nudged inward by `xreltol` times the
/// smallest half-width so the sequence is strictly increasing and
/// interpolation stays well defined across the concentration jumps.
pub fn profile_positions(sys: &Normalized, xreltol: f64) -> Vec<f64> {
    let half_min = sys.width.iter().fold(f64::INFINITY, |m, w| m.min(0.5 * w));
    let xtol = half_min * xreltol;
    let mut x = Vec::with_capacity(3 * sys.width.len());
    for (center, w) in sys.center.iter().zip(&sys.width) {
        x.push(center - 0.5 * w + xtol);
        x.push(*center);
        x.push(center + 0.5 * w - xtol);
    }
    x
}

#[inline]
fn half_resistance(sys: &Normalized, i: usize) -> f64 {
    0.5 * sys.width[i] / (sys.diff[i] * sys.part[i])
}

/// Potential at the interface between cells `i` and `j`, recovered from the
/// continuity of flux: the resistance-weighted average of both potentials
/// with crossed weights.
#[inline]
fn interface_potential(sys: &Normalized, i: usize, j: usize, phi_i: f64, phi_j: f64) -> f64 {
    let r_i = half_resistance(sys, i);
    let r_j = half_resistance(sys, j);
    (r_j * phi_i + r_i * phi_j) / (r_i + r_j)
}

/// Reconstruct the wall-side concentrations at faces and centers for one
/// dimensionless state (3 values per cell, in cell order).
///
/// `cf` is the medium concentration when the contact face exchanges mass;
/// `None` wraps the stack periodically instead.
pub fn reconstruct(sys: &Normalized, cells: &[f64], cf: Option<f64>) -> Vec<f64> {
    let n = cells.len();
    debug_assert_eq!(n, sys.width.len());
    let phi: Vec<f64> = cells.iter().zip(&sys.part).map(|(c, k)| c / k).collect();

    let mut out = vec![0.0; 3 * n];
    for i in 0..n {
        out[3 * i + 1] = cells[i];
    }

    // internal interfaces
    for i in 0..n.saturating_sub(1) {
        let phi_if = interface_potential(sys, i, i + 1, phi[i], phi[i + 1]);
        out[3 * i + 2] = sys.part[i] * phi_if;
        out[3 * (i + 1)] = sys.part[i + 1] * phi_if;
    }

    match cf {
        Some(cf) => {
            // contact face: film resistance on the medium side of the series
            let r_f = sys.scales.biot.map_or(0.0, |bi| 1.0 / bi);
            let r_0 = half_resistance(sys, 0);
            let phi_face = (r_0 * cf + r_f * phi[0]) / (r_f + r_0);
            out[0] = sys.part[0] * phi_face;
            // far face is impermeable: zero gradient
            out[3 * n - 1] = cells[n - 1];
        }
        None => {
            // wrap around: last and first cells share an interface
            let phi_if = interface_potential(sys, n - 1, 0, phi[n - 1], phi[0]);
            out[3 * n - 1] = sys.part[n - 1] * phi_if;
            out[0] = sys.part[0] * phi_if;
        }
    }
    out
}

/// Piecewise-cubic (Hermite with three-point slopes) interpolation of a
/// sampled series; clamped to the end values outside the range.
pub fn interp_cubic(ts: &[f64], ys: &[f64], tq: f64) -> f64 {
    debug_assert_eq!(ts.len(), ys.len());
    let n = ts.len();
    if n == 1 || tq <= ts[0] {
        return ys[0];
    }
    if tq >= ts[n - 1] {
        return ys[n - 1];
    }

    let idx = match ts.partition_point(|&t| t < tq) {
        0 => 0,
        i => i - 1,
    };
    let i = idx.min(n - 2);
    let h = ts[i + 1] - ts[i];
    if h <= 0.0 {
        return ys[i];
    }

    let slope = |j: usize| -> f64 {
        if j == 0 {
            (ys[1] - ys[0]) / (ts[1] - ts[0])
        } else if j == n - 1 {
            (ys[n - 1] - ys[n - 2]) / (ts[n - 1] - ts[n - 2])
        } else {
            let h0 = ts[j] - ts[j - 1];
            let h1 = ts[j + 1] - ts[j];
            let d0 = (ys[j] - ys[j - 1]) / h0;
            let d1 = (ys[j + 1] - ys[j]) / h1;
            (d0 * h1 + d1 * h0) / (h0 + h1)
        }
    };

    let theta = (tq - ts[i]) / h;
    let t2 = theta * theta;
    let t3 = t2 * theta;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + theta;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * ys[i] + h10 * h * slope(i) + h01 * ys[i + 1] + h11 * h * slope(i + 1)
}
