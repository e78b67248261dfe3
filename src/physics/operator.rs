use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::physics::scaling::Normalized;

/// Far-face policy of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FarBoundary {
    /// Zero flux at x = L (no migration through the outermost layer).
    #[default]
    Impermeable,
    /// Mirror the stack at the far face (stacked setoff); solved internally
    /// as the doubled stack with an impermeable far face.
    Symmetric,
    /// Wrap the stack onto itself (rolled setoff); no medium exchange.
    Periodic,
}

/// Half-cell resistance to the adjacent face, in potential units.
#[inline]
fn half_resistance(width: f64, diff: f64, part: f64) -> f64 {
    0.5 * width / (diff * part)
}

/// Patankar conductances of the internal interfaces, cell i to i + 1.
///
/// With `wrap`, one extra conductance closes the ring between the last and
/// the first cell.
pub fn interface_conductances(sys: &Normalized, wrap: bool) -> Vec<f64> {
    let n = sys.width.len();
    let count = if wrap { n } else { n.saturating_sub(1) };
    (0..count)
        .map(|i| {
            let j = (i + 1) % n;
            let r = half_resistance(sys.width[i], sys.diff[i], sys.part[i])
                + half_resistance(sys.width[j], sys.diff[j], sys.part[j]);
            1.0 / r
        })
        .collect()
}

/// Conductance between the medium and the first cell, combining the optional
/// external film resistance with the half-cell resistance: 1/a_F = 1/Bi + r_0.
pub fn contact_conductance(sys: &Normalized) -> f64 {
    let mut r = half_resistance(sys.width[0], sys.diff[0], sys.part[0]);
    if let Some(biot) = sys.scales.biot {
        r += 1.0 / biot;
    }
    1.0 / r
}

/// Accumulates matrix entries into a tridiagonal-plus-corners layout.
struct Bands {
    lower: Vec<f64>,
    main: Vec<f64>,
    upper: Vec<f64>,
    top_right: f64,
    bottom_left: f64,
}

impl Bands {
    fn zeros(n: usize) -> Self {
        Self {
            lower: vec![0.0; n.saturating_sub(1)],
            main: vec![0.0; n],
            upper: vec![0.0; n.saturating_sub(1)],
            top_right: 0.0,
            bottom_left: 0.0,
        }
    }

    fn add(&mut self, row: usize, col: usize, value: f64) {
        let n = self.main.len();
        if col == row {
            self.main[row] += value;
        } else if col == row + 1 {
            self.upper[row] += value;
        } else if row == col + 1 {
            self.lower[col] += value;
        } else if row == 0 && col == n - 1 {
            self.top_right += value;
        } else if row == n - 1 && col == 0 {
            self.bottom_left += value;
        } else {
            unreachable!("entry ({row}, {col}) outside the banded layout");
        }
    }
}

/// The linear map L of the semi-discrete system du/dFo = L u.
///
/// State layout: `[C_F, C_0, ..., C_{N-1}]` when the medium is coupled,
/// `[C_0, ..., C_{N-1}]` under periodic wrapping. All data is copied out of
/// the normalized mesh at construction; the operator holds no references.
#[derive(Debug, Clone)]
pub struct TransferOperator {
    lower: Vec<f64>,
    main: Vec<f64>,
    upper: Vec<f64>,
    /// Corner entries (0, n-1) and (n-1, 0) under periodic wrapping.
    corner: Option<(f64, f64)>,
    has_medium: bool,
    contact: f64,
    dilution: f64,
    /// Cell widths, kept for the discrete mass functional.
    width: Vec<f64>,
}

impl TransferOperator {
    /// Assemble the operator for the given normalized system.
    pub fn assemble(sys: &Normalized, periodic: bool) -> Result<Self> {
        let n_cells = sys.width.len();
        if n_cells == 0 {
            return Err(Error::invalid("cannot assemble an operator on an empty mesh"));
        }
        if periodic {
            Self::assemble_periodic(sys)
        } else {
            Self::assemble_coupled(sys)
        }
    }

    fn assemble_coupled(sys: &Normalized) -> Result<Self> {
        let n_cells = sys.width.len();
        let n = n_cells + 1;
        let cond = interface_conductances(sys, false);
        let a_f = contact_conductance(sys);
        let gamma = sys.scales.dilution;
        if gamma <= 0.0 {
            return Err(Error::invalid(
                "medium coupling requires a positive dilution ratio",
            ));
        }

        let mut bands = Bands::zeros(n);
        // medium balance: dC_F/dFo = -Gamma a_F (C_F - C_0 / k_0)
        bands.add(0, 0, -gamma * a_f);
        bands.add(0, 1, gamma * a_f / sys.part[0]);

        for i in 0..n_cells {
            let row = i + 1;
            let (a_w, k_prev) = if i == 0 {
                (a_f, 1.0)
            } else {
                (cond[i - 1], sys.part[i - 1])
            };
            let a_e = if i + 1 < n_cells { cond[i] } else { 0.0 };
            let w = sys.width[i];

            bands.add(row, row - 1, a_w / (w * k_prev));
            bands.add(row, row, -(a_w + a_e) / (w * sys.part[i]));
            if i + 1 < n_cells {
                bands.add(row, row + 1, a_e / (w * sys.part[i + 1]));
            }
        }

        Ok(Self {
            lower: bands.lower,
            main: bands.main,
            upper: bands.upper,
            corner: None,
            has_medium: true,
            contact: a_f,
            dilution: gamma,
            width: sys.width.clone(),
        })
    }

    fn assemble_periodic(sys: &Normalized) -> Result<Self> {
        let n = sys.width.len();
        let cond = interface_conductances(sys, true);

        let mut bands = Bands::zeros(n);
        for i in 0..n {
            let west = (i + n - 1) % n;
            let east = (i + 1) % n;
            let a_w = cond[west];
            let a_e = cond[i];
            let w = sys.width[i];

            bands.add(i, i, -(a_w + a_e) / (w * sys.part[i]));
            bands.add(i, west, a_w / (w * sys.part[west]));
            bands.add(i, east, a_e / (w * sys.part[east]));
        }

        let corner = if n >= 3 {
            Some((bands.top_right, bands.bottom_left))
        } else {
            None
        };
        Ok(Self {
            lower: bands.lower,
            main: bands.main,
            upper: bands.upper,
            corner,
            has_medium: false,
            contact: 0.0,
            dilution: 0.0,
            width: sys.width.clone(),
        })
    }

    /// Dimensionless initial state in the operator's layout.
    pub fn initial_state(&self, sys: &Normalized) -> DVector<f64> {
        if self.has_medium {
            let mut u = DVector::zeros(sys.width.len() + 1);
            u[0] = sys.cf_init;
            for (i, &c) in sys.c_init.iter().enumerate() {
                u[i + 1] = c;
            }
            u
        } else {
            DVector::from_column_slice(&sys.c_init)
        }
    }

    pub fn state_len(&self) -> usize {
        self.main.len()
    }

    pub fn has_medium(&self) -> bool {
        self.has_medium
    }

    /// Contact conductance a_F (dimensionless).
    pub fn contact_conductance(&self) -> f64 {
        self.contact
    }

    pub fn dilution(&self) -> f64 {
        self.dilution
    }

    pub fn diagonals(&self) -> (&[f64], &[f64], &[f64]) {
        (&self.lower, &self.main, &self.upper)
    }

    pub fn corner(&self) -> Option<(f64, f64)> {
        self.corner
    }

    /// du = L u.
    pub fn apply(&self, u: &DVector<f64>, du: &mut DVector<f64>) {
        let n = self.main.len();
        debug_assert_eq!(u.len(), n);
        debug_assert_eq!(du.len(), n);
        for i in 0..n {
            let mut acc = self.main[i] * u[i];
            if i > 0 {
                acc += self.lower[i - 1] * u[i - 1];
            }
            if i + 1 < n {
                acc += self.upper[i] * u[i + 1];
            }
            du[i] = acc;
        }
        if let Some((tr, bl)) = self.corner {
            du[0] += tr * u[n - 1];
            du[n - 1] += bl * u[0];
        }
    }

    pub fn derivative(&self, u: &DVector<f64>) -> DVector<f64> {
        let mut du = DVector::zeros(self.main.len());
        self.apply(u, &mut du);
        du
    }

    /// Discrete total mass of a state: sum_i w_i C_i + C_F / Gamma.
    pub fn total_content(&self, u: &DVector<f64>) -> f64 {
        if self.has_medium {
            let mut total = u[0] / self.dilution;
            for (i, w) in self.width.iter().enumerate() {
                total += w * u[i + 1];
            }
            total
        } else {
            self.width
                .iter()
                .enumerate()
                .map(|(i, w)| w * u[i])
                .sum()
        }
    }

    /// Largest mass-weighted column sum relative to the largest entry.
    ///
    /// Zero (to roundoff) certifies that the operator conserves the discrete
    /// mass functional for every state.
    pub fn conservation_defect(&self) -> f64 {
        let n = self.main.len();
        let weight = |row: usize| -> f64 {
            if self.has_medium {
                if row == 0 {
                    1.0 / self.dilution
                } else {
                    self.width[row - 1]
                }
            } else {
                self.width[row]
            }
        };

        let mut col_sums = vec![0.0; n];
        let mut scale = 0.0_f64;
        for i in 0..n {
            let w = weight(i);
            col_sums[i] += w * self.main[i];
            scale = scale.max((w * self.main[i]).abs());
            if i > 0 {
                col_sums[i - 1] += w * self.lower[i - 1];
            }
            if i + 1 < n {
                col_sums[i + 1] += w * self.upper[i];
            }
        }
        if let Some((tr, bl)) = self.corner {
            col_sums[n - 1] += weight(0) * tr;
            col_sums[0] += weight(n - 1) * bl;
        }

        let defect = col_sums.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        if scale > 0.0 {
            defect / scale
        } else {
            defect
        }
    }
}
