use std::fmt;

use crate::numerics::bdf::StepStats;
use crate::physics::scaling::Scales;
use crate::processing::result::SimResult;

/// Plain-data summary of one run: mesh statistics, dimensional scales,
/// solver statistics and the mass-balance diagnostic.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub name: String,
    pub n_layers: usize,
    pub n_cells: usize,
    pub n_snapshots: usize,
    pub min_cell_width: f64,
    pub max_cell_width: f64,
    pub scales: Scales,
    pub stats: StepStats,
    pub cf_end: f64,
    pub mass_drift: f64,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn from_result(result: &SimResult) -> Self {
        Self {
            name: result.name().to_string(),
            n_layers: result.mesh().n_layers(),
            n_cells: result.mesh().len(),
            n_snapshots: result.times().len(),
            min_cell_width: result.mesh().min_width(),
            max_cell_width: result.mesh().max_width(),
            scales: result.scales(),
            stats: result.stats(),
            cf_end: *result.cf().last().unwrap_or(&0.0),
            mass_drift: result.mass_balance_drift(),
            warnings: result.warnings().to_vec(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run '{}'", self.name)?;
        writeln!(
            f,
            "  mesh: {} cells over {} layers, widths [{:.3e}, {:.3e}] m",
            self.n_cells, self.n_layers, self.min_cell_width, self.max_cell_width
        )?;
        writeln!(
            f,
            "  scales: L = {:.3e} m, tau = {:.3e} s, C_eq = {:.4e}, dilution = {:.3e}",
            self.scales.length, self.scales.time, self.scales.concentration, self.scales.dilution
        )?;
        if let Some(biot) = self.scales.biot {
            writeln!(f, "  Biot number: {biot:.3e}")?;
        }
        writeln!(
            f,
            "  solver: {} accepted, {} rejected, final dFo = {:.3e}",
            self.stats.accepted, self.stats.rejected, self.stats.last_dt
        )?;
        writeln!(
            f,
            "  CF(end) = {:.5e}, mass drift = {:.2e} over {} snapshots",
            self.cf_end, self.mass_drift, self.n_snapshots
        )?;
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        Ok(())
    }
}
