use log::debug;
use serde::{Deserialize, Serialize};

use crate::discretization::mesh::Mesh;
use crate::models::medium::Medium;

/// Dimensional scales of one run.
///
/// Time is measured in Fourier numbers Fo = t / time, lengths in units of the
/// total wall thickness, concentrations in units of the equilibrium medium
/// concentration implied by total-mass conservation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scales {
    /// Total wall thickness L [m].
    pub length: f64,
    /// Characteristic diffusion time L^2 / D_ref [s], D_ref of the contact layer.
    pub time: f64,
    /// Concentration scale (equilibrium medium concentration, or 1).
    pub concentration: f64,
    /// Dimensionless packaging-to-medium ratio A L / V (0 when no medium).
    pub dilution: f64,
    /// Dimensionless film coefficient Bi = h L / (D_ref k_F).
    pub biot: Option<f64>,
}

/// Mesh and medium data mapped onto the dimensionless unit wall.
///
/// Owned copies of the per-cell arrays; the operator and the post-processor
/// read these and never reach back into the mesh.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Cell widths, summing to 1.
    pub width: Vec<f64>,
    /// Cell centers in (0, 1).
    pub center: Vec<f64>,
    /// Diffusivities relative to the contact layer.
    pub diff: Vec<f64>,
    /// Partition coefficients relative to the medium (k_F maps to 1).
    pub part: Vec<f64>,
    /// Initial cell concentrations in units of the concentration scale.
    pub c_init: Vec<f64>,
    /// Initial medium concentration in units of the concentration scale.
    pub cf_init: f64,
    pub scales: Scales,
}

/// Map a mesh and its contact medium to dimensionless arrays.
///
/// Under periodic wrapping the medium exchanges no mass: its geometric
/// parameters are ignored, the dilution is zero and the concentration scale
/// falls back to the mean initial wall concentration.
pub fn normalize(mesh: &Mesh, medium: &Medium, periodic: bool) -> Normalized {
    let length = mesh.thickness();
    let diff_ref = mesh.cells()[0].diffusivity;
    let k_f = medium.partition();

    let width: Vec<f64> = mesh.cells().iter().map(|c| c.width / length).collect();
    let center: Vec<f64> = mesh.cells().iter().map(|c| c.center / length).collect();
    let diff: Vec<f64> = mesh
        .cells()
        .iter()
        .map(|c| c.diffusivity / diff_ref)
        .collect();
    let part: Vec<f64> = mesh.cells().iter().map(|c| c.partition / k_f).collect();

    let dilution = if periodic {
        0.0
    } else {
        medium.dilution(length)
    };
    let biot = if periodic {
        None
    } else {
        medium.film().map(|h| h * length / (diff_ref * k_f))
    };

    let wall_content: f64 = mesh
        .cells()
        .iter()
        .zip(&width)
        .map(|(c, w)| w * c.c_init)
        .sum();
    let capacity: f64 = part.iter().zip(&width).map(|(k, w)| w * k).sum();
    let cf0 = if periodic { 0.0 } else { medium.c_init() };

    let mut concentration = if periodic {
        wall_content
    } else {
        (cf0 + dilution * wall_content) / (1.0 + dilution * capacity)
    };
    if concentration <= 0.0 {
        concentration = 1.0;
    }

    let c_init: Vec<f64> = mesh
        .cells()
        .iter()
        .map(|c| c.c_init / concentration)
        .collect();
    let cf_init = cf0 / concentration;

    let scales = Scales {
        length,
        time: length * length / diff_ref,
        concentration,
        dilution,
        biot,
    };
    debug!(
        "scales: L = {:.3e} m, tau = {:.3e} s, C_eq = {:.4e}, dilution = {:.3e}, Bi = {:?}",
        scales.length, scales.time, scales.concentration, scales.dilution, scales.biot
    );

    Normalized {
        width,
        center,
        diff,
        part,
        c_init,
        cf_init,
        scales,
    }
}
