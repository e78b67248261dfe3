use log::{info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::discretization::mesh::Mesh;
use crate::error::{Error, Result};
use crate::models::medium::Medium;
use crate::models::packaging::{Layer, Multilayer};
use crate::numerics::bdf::{Integration, StepStats};
use crate::numerics::IntegrationOptions;
use crate::physics::operator::{FarBoundary, TransferOperator};
use crate::physics::scaling::{Normalized, Scales};
use crate::processing::profile::{interp_cubic, profile_positions, reconstruct, Profile};

/// Everything needed to restart an integration from its final state.
///
/// Plain values only; the multilayer and far-face policy are the caller's,
/// so a resumed symmetric run mirrors the stack again. `cells` span the
/// solved domain, which for a symmetric run is the mirror-doubled wall.
#[derive(Debug, Clone)]
pub struct Restart {
    pub multilayer: Multilayer,
    pub medium: Medium,
    pub options: IntegrationOptions,
    /// Final cell concentrations, dimensional, in cell order.
    pub cells: Vec<f64>,
    /// Final medium concentration, dimensional. For a symmetric run this is
    /// the two-sided bookkeeping value, twice the reported contact-side CF.
    pub cf: f64,
    /// Duration covered by the run [s].
    pub elapsed: f64,
}

/// One simulation run: time grid, snapshot stack, dimensional scales and a
/// restart record. Immutable after construction; accessors hand out copies.
pub struct SimResult {
    name: String,
    far_boundary: FarBoundary,
    mesh: Mesh,
    sys: Normalized,
    periodic: bool,
    times: Vec<f64>,
    fo: Vec<f64>,
    /// Reconstructed profile positions [m], three per cell.
    x: Vec<f64>,
    /// Cell concentrations per snapshot (rows), dimensional.
    cells: DMatrix<f64>,
    /// Reconstructed profiles per snapshot (rows), dimensional.
    cx: DMatrix<f64>,
    cf: Vec<f64>,
    c_mean: Vec<f64>,
    flux: Vec<f64>,
    cumulative_flux: Vec<f64>,
    scales: Scales,
    stats: StepStats,
    mass_drift: f64,
    warnings: Vec<String>,
    restart: Restart,
}

impl SimResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        name: String,
        mesh: Mesh,
        sys: Normalized,
        periodic: bool,
        far_boundary: FarBoundary,
        op: &TransferOperator,
        integration: Integration,
        multilayer: Multilayer,
        medium: Medium,
        options: IntegrationOptions,
    ) -> Result<Self> {
        let n_cells = sys.width.len();
        let n_times = integration.fo.len();
        let c_scale = sys.scales.concentration;
        let tau = sys.scales.time;

        let fo = integration.fo;
        let times: Vec<f64> = fo.iter().map(|f| f * tau).collect();
        let x_hat = profile_positions(&sys, 1e-6);
        let x: Vec<f64> = x_hat.iter().map(|x| x * sys.scales.length).collect();

        let mut cells = DMatrix::zeros(n_times, n_cells);
        let mut cx = DMatrix::zeros(n_times, 3 * n_cells);
        let mut cf = vec![0.0; n_times];
        let mut c_mean = vec![0.0; n_times];
        let mut flux = vec![0.0; n_times];

        // dimensional instantaneous flux per area = (L / tau) C_eq a_F (phi_0 - phi_F)
        let flux_scale = sys.scales.length / tau * c_scale;
        let a_f = op.contact_conductance();
        // a symmetric far face splits the desorbed amount evenly between the
        // two mirror-image media; the contact side is credited with half
        let exchange = if far_boundary == FarBoundary::Symmetric {
            0.5
        } else {
            1.0
        };

        let mut cell_row = vec![0.0; n_cells];
        for (row, state) in integration.states.iter().enumerate() {
            let (cf_hat, offset) = if periodic {
                (None, 0)
            } else {
                (Some(state[0]), 1)
            };
            for i in 0..n_cells {
                cell_row[i] = state[offset + i];
                cells[(row, i)] = cell_row[i] * c_scale;
            }
            let rec = reconstruct(&sys, &cell_row, cf_hat);
            for (i, value) in rec.iter().enumerate() {
                cx[(row, i)] = value * c_scale;
            }
            c_mean[row] = Profile::new(x_hat.clone(), rec)?.mean() * c_scale;
            match cf_hat {
                Some(cf_hat) => {
                    cf[row] = exchange * cf_hat * c_scale;
                    flux[row] = exchange * flux_scale * a_f * (cell_row[0] / sys.part[0] - cf_hat);
                }
                None => cf[row] = medium.c_init(),
            }
        }

        let mut cumulative_flux = vec![0.0; n_times];
        for i in 1..n_times {
            cumulative_flux[i] = cumulative_flux[i - 1]
                + 0.5 * (flux[i] + flux[i - 1]) * (times[i] - times[i - 1]);
        }

        // discrete mass functional drift across all snapshots
        let total0 = op.total_content(&integration.states[0]);
        let denom = total0.abs().max(1e-30);
        let mass_drift = integration
            .states
            .iter()
            .map(|u| (op.total_content(u) - total0).abs() / denom)
            .fold(0.0_f64, f64::max);

        let mut warnings = Vec::new();
        if mass_drift > options.mass_balance_tol {
            if options.fatal_mass_balance {
                return Err(Error::MassBalanceViolation {
                    relative_drift: mass_drift,
                    tolerance: options.mass_balance_tol,
                });
            }
            warn!("mass balance drift {mass_drift:.3e} exceeds {:.1e}", options.mass_balance_tol);
            warnings.push(format!(
                "mass balance drift {mass_drift:.3e} exceeds {:.1e}",
                options.mass_balance_tol
            ));
        }

        // cross-check: CF from the ODE state vs time-integrated contact flux
        if !periodic {
            let by_state = cf[n_times - 1] - cf[0];
            let by_flux =
                cumulative_flux[n_times - 1] * medium.surface_area() / medium.volume();
            let mismatch = (by_state - by_flux).abs() / c_scale.max(1e-30);
            if mismatch > options.mass_balance_tol {
                warn!("CF/flux cross-check mismatch {mismatch:.3e}");
                warnings.push(format!("CF/flux cross-check mismatch {mismatch:.3e}"));
            }
        }

        // the restart keeps the unsplit medium state so a resumed symmetric
        // run continues the same trajectory
        let cf_bookkeeping = if periodic {
            medium.c_init()
        } else {
            integration.states[n_times - 1][0] * c_scale
        };
        let restart = Restart {
            multilayer,
            medium,
            options,
            // clamp solver-tolerance undershoots so the profile can seed a
            // follow-up run
            cells: (0..n_cells)
                .map(|i| cells[(n_times - 1, i)].max(0.0))
                .collect(),
            cf: cf_bookkeeping,
            elapsed: times[n_times - 1],
        };

        info!(
            "run '{name}': {n_times} snapshots, {} cells, CF end {:.4e}, drift {mass_drift:.2e}",
            n_cells,
            cf[n_times - 1]
        );

        let scales = sys.scales;
        Ok(Self {
            name,
            far_boundary,
            mesh,
            sys,
            periodic,
            times,
            fo,
            x,
            cells,
            cx,
            cf,
            c_mean,
            flux,
            cumulative_flux,
            scales,
            stats: integration.stats,
            mass_drift,
            warnings,
            restart,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn far_boundary(&self) -> FarBoundary {
        self.far_boundary
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn n_cells(&self) -> usize {
        self.mesh.len()
    }

    /// Snapshot times [s], strictly increasing, starting at 0.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Snapshot times as Fourier numbers.
    pub fn fo_times(&self) -> &[f64] {
        &self.fo
    }

    /// Positions of the reconstructed profile samples [m].
    pub fn positions(&self) -> &[f64] {
        &self.x
    }

    /// Medium concentration history.
    pub fn cf(&self) -> &[f64] {
        &self.cf
    }

    /// Mean wall concentration history.
    pub fn mean_wall(&self) -> &[f64] {
        &self.c_mean
    }

    /// Instantaneous contact-face flux history [concentration * m / s].
    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    /// Time-integrated contact-face flux [concentration * m].
    pub fn cumulative_flux(&self) -> &[f64] {
        &self.cumulative_flux
    }

    pub fn scales(&self) -> Scales {
        self.scales
    }

    pub fn stats(&self) -> StepStats {
        self.stats
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Largest relative drift of the discrete mass functional.
    pub fn mass_balance_drift(&self) -> f64 {
        self.mass_drift
    }

    pub fn restart(&self) -> &Restart {
        &self.restart
    }

    /// Medium concentration at an arbitrary time (piecewise-cubic in t).
    pub fn cf_at(&self, t: f64) -> f64 {
        interp_cubic(&self.times, &self.cf, t)
    }

    /// Cell concentrations at an arbitrary time (piecewise-cubic in t).
    pub fn c_wall_at(&self, t: f64) -> Vec<f64> {
        (0..self.cells.ncols())
            .map(|j| {
                let column: Vec<f64> = (0..self.cells.nrows()).map(|i| self.cells[(i, j)]).collect();
                interp_cubic(&self.times, &column, t)
            })
            .collect()
    }

    /// Reconstructed wall profile at an arbitrary time.
    pub fn profile_at(&self, t: f64) -> Result<Profile> {
        let values: Vec<f64> = (0..self.cx.ncols())
            .map(|j| {
                let column: Vec<f64> = (0..self.cx.nrows()).map(|i| self.cx[(i, j)]).collect();
                interp_cubic(&self.times, &column, t)
            })
            .collect();
        Profile::new(self.x.clone(), values)
    }

    /// Concatenate a follow-up run, shifting its time axis to start where
    /// this run ended. Requires matching mesh geometry and materials; the
    /// follow-up's initial CF must match this run's final CF unless
    /// `rebase_cf` shifts it.
    pub fn concat(&self, other: &SimResult, rebase_cf: bool) -> Result<SimResult> {
        if !self.mesh.same_materials(&other.mesh, 1e-9) {
            return Err(Error::incompatible(format!(
                "mesh mismatch: {} vs {} cells or differing layer data",
                self.mesh.len(),
                other.mesh.len()
            )));
        }
        if self.periodic != other.periodic {
            return Err(Error::incompatible(
                "cannot merge periodic and medium-coupled runs",
            ));
        }
        if self.far_boundary != other.far_boundary {
            return Err(Error::incompatible(
                "cannot merge runs with differing far-face policies",
            ));
        }

        let t_shift = *self.times.last().expect("non-empty result");
        let fo_shift = *self.fo.last().expect("non-empty result");
        let cf_gap = other.cf[0] - self.cf[self.cf.len() - 1];
        let cf_tol = 1e-6
            * self
                .scales
                .concentration
                .max(other.scales.concentration)
                .max(1e-30);
        let cf_offset = if rebase_cf {
            -cf_gap
        } else {
            if cf_gap.abs() > cf_tol {
                return Err(Error::incompatible(format!(
                    "CF discontinuity {cf_gap:.3e} at the junction (pass rebase to shift)"
                )));
            }
            0.0
        };

        // other's first snapshot duplicates this run's last
        let skip = 1;
        let n_a = self.times.len();
        let n_b = other.times.len() - skip;
        let n = n_a + n_b;
        let n_cols = self.cells.ncols();

        let mut times = Vec::with_capacity(n);
        let mut fo = Vec::with_capacity(n);
        times.extend_from_slice(&self.times);
        fo.extend_from_slice(&self.fo);
        for i in skip..other.times.len() {
            times.push(other.times[i] + t_shift);
            fo.push(other.fo[i] + fo_shift);
        }

        let mut cells = DMatrix::zeros(n, n_cols);
        let mut cx = DMatrix::zeros(n, self.cx.ncols());
        for i in 0..n_a {
            for j in 0..n_cols {
                cells[(i, j)] = self.cells[(i, j)];
            }
            for j in 0..self.cx.ncols() {
                cx[(i, j)] = self.cx[(i, j)];
            }
        }
        for i in 0..n_b {
            for j in 0..n_cols {
                cells[(n_a + i, j)] = other.cells[(skip + i, j)];
            }
            for j in 0..self.cx.ncols() {
                cx[(n_a + i, j)] = other.cx[(skip + i, j)];
            }
        }

        let mut cf = self.cf.clone();
        cf.extend(other.cf[skip..].iter().map(|c| c + cf_offset));
        let mut c_mean = self.c_mean.clone();
        c_mean.extend_from_slice(&other.c_mean[skip..]);
        let mut flux = self.flux.clone();
        flux.extend_from_slice(&other.flux[skip..]);
        let fc_last = self.cumulative_flux[n_a - 1];
        let mut cumulative_flux = self.cumulative_flux.clone();
        cumulative_flux.extend(other.cumulative_flux[skip..].iter().map(|f| f + fc_last));

        let mut warnings = self.warnings.clone();
        warnings.extend(other.warnings.iter().cloned());

        let mut restart = other.restart.clone();
        restart.elapsed = times[n - 1];

        Ok(SimResult {
            name: if self.name == other.name {
                self.name.clone()
            } else {
                format!("{} + {}", self.name, other.name)
            },
            far_boundary: self.far_boundary,
            mesh: self.mesh.clone(),
            sys: self.sys.clone(),
            periodic: self.periodic,
            times,
            fo,
            x: self.x.clone(),
            cells,
            cx,
            cf,
            c_mean,
            flux,
            cumulative_flux,
            scales: self.scales,
            stats: StepStats {
                accepted: self.stats.accepted + other.stats.accepted,
                rejected: self.stats.rejected + other.stats.rejected,
                last_dt: other.stats.last_dt,
            },
            mass_drift: self.mass_drift.max(other.mass_drift),
            warnings,
            restart,
        })
    }

    /// Fresh integration from the last snapshot with identical parameters,
    /// over a new time grid [s].
    pub fn resume(&self, time_grid: Vec<f64>) -> Result<SimResult> {
        let r = &self.restart;
        let mut options = r.options.clone();
        options.time_grid = time_grid;
        let medium = r.medium.clone().with_c_init(r.cf.max(0.0))?;
        crate::scenario::advance(
            &format!("{} (resumed)", self.name),
            &r.multilayer,
            &medium,
            &options,
            Some(&r.cells),
            None,
        )
    }

    /// Value-typed restart record for persistence. Carries the caller-level
    /// stack and far-face policy; for a symmetric run the stored profile
    /// spans the mirror-doubled domain and `cf` is the two-sided
    /// bookkeeping value.
    pub fn savestate(&self) -> RestartRecord {
        RestartRecord::from_restart(&self.restart)
    }

    /// Versioned persistence record of the full result.
    pub fn to_record(&self) -> ResultRecord {
        ResultRecord {
            schema_version: SCHEMA_VERSION,
            times: self.times.clone(),
            cxt: (0..self.cx.nrows())
                .map(|i| (0..self.cx.ncols()).map(|j| self.cx[(i, j)]).collect())
                .collect(),
            cf: self.cf.clone(),
            scales: self.scales,
            metadata: if self.warnings.is_empty() {
                self.name.clone()
            } else {
                format!("{}; warnings: {}", self.name, self.warnings.join("; "))
            },
        }
    }
}

pub const SCHEMA_VERSION: u32 = 1;

/// Persistence record of a result. Field order: times, Cxt matrix, CF
/// vector, scales, metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub schema_version: u32,
    pub times: Vec<f64>,
    pub cxt: Vec<Vec<f64>>,
    pub cf: Vec<f64>,
    pub scales: Scales,
    pub metadata: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord {
    pub thickness: f64,
    pub diffusivity: f64,
    pub partition: f64,
    pub c_init: f64,
    pub cells: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediumRecord {
    pub surface_area: f64,
    pub volume: f64,
    pub partition: f64,
    pub c_init: f64,
    pub film: Option<f64>,
}

/// Value-typed restart record; carries only serializable parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartRecord {
    pub schema_version: u32,
    pub layers: Vec<LayerRecord>,
    pub medium: MediumRecord,
    pub far_boundary: FarBoundary,
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub elapsed: f64,
    /// Final cell concentrations, dimensional, in cell order.
    pub cells: Vec<f64>,
    pub cf: f64,
}

impl RestartRecord {
    fn from_restart(restart: &Restart) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            layers: restart
                .multilayer
                .layers()
                .iter()
                .map(|l| LayerRecord {
                    thickness: l.thickness(),
                    diffusivity: l.diffusivity(),
                    partition: l.partition(),
                    c_init: l.c_init(),
                    cells: l.cells(),
                })
                .collect(),
            medium: MediumRecord {
                surface_area: restart.medium.surface_area(),
                volume: restart.medium.volume(),
                partition: restart.medium.partition(),
                c_init: restart.medium.c_init(),
                film: restart.medium.film(),
            },
            far_boundary: restart.options.far_boundary,
            abs_tol: restart.options.tol.abs,
            rel_tol: restart.options.tol.rel,
            elapsed: restart.elapsed,
            cells: restart.cells.clone(),
            cf: restart.cf,
        }
    }

    /// Rebuild the validated inputs carried by this record.
    pub fn to_inputs(&self) -> Result<(Multilayer, Medium)> {
        let layers = self
            .layers
            .iter()
            .map(|l| Layer::new(l.thickness, l.diffusivity, l.partition, l.c_init, l.cells))
            .collect::<Result<Vec<_>>>()?;
        let mut medium = Medium::new(
            self.medium.surface_area,
            self.medium.volume,
            self.medium.partition,
            self.medium.c_init,
        )?;
        if let Some(h) = self.medium.film {
            medium = medium.with_film(h)?;
        }
        Ok((Multilayer::new(layers)?, medium))
    }
}
