//! Run orchestration: a single simulation is a pure function of its inputs,
//! and sequential contact scenarios fold that function over an ordered list
//! of media.

use log::info;

use crate::discretization::generator::build_mesh;
use crate::error::{Error, Result};
use crate::models::medium::Medium;
use crate::models::packaging::Multilayer;
use crate::numerics::bdf::StiffIntegrator;
use crate::numerics::{IntegrationOptions, Tolerances};
use crate::physics::operator::{FarBoundary, TransferOperator};
use crate::physics::scaling::normalize;
use crate::processing::result::{RestartRecord, SimResult};

fn validate_time_grid(grid: &[f64]) -> Result<Vec<f64>> {
    if grid.is_empty() {
        return Err(Error::invalid("time grid must not be empty"));
    }
    if grid.iter().any(|t| !t.is_finite() || *t < 0.0) {
        return Err(Error::invalid("time grid entries must be finite and non-negative"));
    }
    if grid.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::invalid("time grid must be strictly increasing"));
    }
    let mut grid = grid.to_vec();
    if grid[0] > 0.0 {
        grid.insert(0, 0.0);
    }
    if grid.len() < 2 {
        return Err(Error::invalid("time grid needs a positive horizon"));
    }
    Ok(grid)
}

/// A symmetric far face is solved on the mirror-doubled stack with an
/// impermeable far face; the post-processor credits the contact-side medium
/// with half of the desorbed bookkeeping amount.
fn resolve_far(stack: &Multilayer, far: FarBoundary) -> (Multilayer, FarBoundary) {
    match far {
        FarBoundary::Symmetric => (stack.mirrored(), FarBoundary::Impermeable),
        other => (stack.clone(), other),
    }
}

/// One simulation: mesh the stack, assemble the flux operator, integrate,
/// post-process. `initial_cells` (dimensional, in cell order) overrides the
/// layers' uniform initial concentrations, carrying a wall profile over from
/// an earlier run.
pub(crate) fn advance(
    name: &str,
    multilayer: &Multilayer,
    medium: &Medium,
    options: &IntegrationOptions,
    initial_cells: Option<&[f64]>,
    chain_step: Option<usize>,
) -> Result<SimResult> {
    let tag = |e: Error| match chain_step {
        Some(step) => e.with_chain_step(step),
        None => e,
    };

    let time_grid = validate_time_grid(&options.time_grid)?;
    let (stack, far) = resolve_far(multilayer, options.far_boundary);
    let periodic = far == FarBoundary::Periodic;

    let mut mesh = build_mesh(&stack, &options.mesh)?;
    if let Some(cells) = initial_cells {
        // a user-supplied half profile is mirrored along with the stack
        let mirrored: Vec<f64>;
        let cells = if options.far_boundary == FarBoundary::Symmetric
            && 2 * cells.len() == mesh.len()
        {
            mirrored = cells.iter().chain(cells.iter().rev()).copied().collect();
            &mirrored
        } else {
            cells
        };
        mesh = mesh.with_initial(cells)?;
    }

    let sys = normalize(&mesh, medium, periodic);
    let op = TransferOperator::assemble(&sys, periodic)?;
    let u0 = op.initial_state(&sys);
    let fo_grid: Vec<f64> = time_grid.iter().map(|t| t / sys.scales.time).collect();

    let mut solver = StiffIntegrator::new(&op);
    solver.tol = options.tol;
    solver.include_solver_steps = options.include_solver_steps;
    solver.deadline = options.deadline.clone();
    if let Some(max_steps) = options.max_steps {
        solver.max_steps = max_steps;
    }

    let integration = solver.integrate(u0, &fo_grid).map_err(tag)?;

    // the restart carries the caller-level stack and far-face policy, so a
    // resumed symmetric run mirrors again and keeps the half-credit view
    let mut effective = options.clone();
    effective.time_grid = time_grid;

    SimResult::assemble(
        name.to_string(),
        mesh,
        sys,
        periodic,
        options.far_boundary,
        &op,
        integration,
        multilayer.clone(),
        medium.clone(),
        effective,
    )
    .map_err(tag)
}

/// Run one simulation of the stack in contact with the medium.
pub fn simulate(
    multilayer: &Multilayer,
    medium: &Medium,
    options: &IntegrationOptions,
) -> Result<SimResult> {
    advance("run", multilayer, medium, options, None, None)
}

/// Same as [`simulate`] with a caller-chosen result name.
pub fn simulate_named(
    name: &str,
    multilayer: &Multilayer,
    medium: &Medium,
    options: &IntegrationOptions,
) -> Result<SimResult> {
    advance(name, multilayer, medium, options, None, None)
}

/// Resume a persisted run for a new duration.
pub fn resume_from_record(record: &RestartRecord, time_grid: Vec<f64>) -> Result<SimResult> {
    let (stack, medium) = record.to_inputs()?;
    let medium = medium.with_c_init(record.cf.max(0.0))?;
    let mut options = IntegrationOptions::over(time_grid);
    options.tol = Tolerances {
        abs: record.abs_tol,
        rel: record.rel_tol,
    };
    options.far_boundary = record.far_boundary;
    advance("resumed", &stack, &medium, &options, Some(&record.cells), None)
}

/// One step of a sequential contact scenario.
#[derive(Debug, Clone)]
pub struct ContactStep {
    pub medium: Medium,
    /// Output times of this step [s], relative to the step start.
    pub time_grid: Vec<f64>,
    /// Flip the stack before this step (contact on the other side).
    pub reorient: bool,
    /// Override the base far-face policy for this step (storage vs contact).
    /// A symmetric far face can only be set on the base options.
    pub far_boundary: Option<FarBoundary>,
}

impl ContactStep {
    pub fn new(medium: Medium, time_grid: Vec<f64>) -> Self {
        Self {
            medium,
            time_grid,
            reorient: false,
            far_boundary: None,
        }
    }

    pub fn reoriented(mut self) -> Self {
        self.reorient = true;
        self
    }

    pub fn with_far_boundary(mut self, far_boundary: FarBoundary) -> Self {
        self.far_boundary = Some(far_boundary);
        self
    }
}

/// Run the ordered contact sequence: run m+1 starts from run m's final wall
/// profile in contact with a fresh medium. An integration failure aborts the
/// chain and carries the failing step index.
pub fn chain(
    name: &str,
    multilayer: &Multilayer,
    steps: &[ContactStep],
    base: &IntegrationOptions,
) -> Result<Vec<SimResult>> {
    if steps.is_empty() {
        return Err(Error::invalid("contact sequence must not be empty"));
    }
    if steps.iter().any(|s| s.reorient) && base.mesh.total_cells.is_some() {
        // budget allocation is orientation-dependent and would misalign the
        // carried profile
        return Err(Error::invalid(
            "re-orientation requires explicit per-layer cell counts",
        ));
    }

    let symmetric = base.far_boundary == FarBoundary::Symmetric;
    let mut stack = multilayer.clone();
    let options = base.clone();

    let mut carried: Option<Vec<f64>> = None;
    let mut results = Vec::with_capacity(steps.len());
    for (idx, step) in steps.iter().enumerate() {
        if step.reorient {
            // the mirror-doubled wall is its own reversal; only the carried
            // profile flips
            if !symmetric {
                stack = stack.reversed();
            }
            if let Some(cells) = &mut carried {
                cells.reverse();
            }
        }
        let mut step_options = options.clone();
        step_options.time_grid = step.time_grid.clone();
        if let Some(step_far) = step.far_boundary {
            if step_far == FarBoundary::Symmetric {
                return Err(Error::invalid(
                    "a symmetric far face must be set on the base options",
                ));
            }
            step_options.far_boundary = step_far;
        }

        info!("chain '{name}': step {} of {}", idx + 1, steps.len());
        let result = advance(
            &format!("{name}:step{}", idx + 1),
            &stack,
            &step.medium,
            &step_options,
            carried.as_deref(),
            Some(idx),
        )?;
        carried = Some(result.restart().cells.clone());
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_validation() {
        assert!(validate_time_grid(&[]).is_err());
        assert!(validate_time_grid(&[0.0]).is_err());
        assert!(validate_time_grid(&[0.0, 1.0, 1.0]).is_err());
        assert!(validate_time_grid(&[0.0, -1.0]).is_err());
        assert!(validate_time_grid(&[0.0, f64::NAN]).is_err());
        // a leading zero is implied
        let grid = validate_time_grid(&[10.0, 20.0]).unwrap();
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid.len(), 3);
    }
}
