use log::debug;

use super::mesh::{Cell, Mesh};
use crate::error::Result;
use crate::models::packaging::Multilayer;

/// Controls how cells are distributed across layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshSettings {
    /// Lower bound on cells per layer; thin layers are refined up to this.
    pub min_cells_per_layer: usize,
    /// When set, ignore per-layer counts and distribute this global budget
    /// proportionally to the layer resistances.
    pub total_cells: Option<usize>,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            min_cells_per_layer: 20,
            total_cells: None,
        }
    }
}

/// Number of cells per layer under the given settings.
fn allocate(stack: &Multilayer, settings: &MeshSettings) -> Vec<usize> {
    let n_min = settings.min_cells_per_layer.max(1);
    let layers = stack.layers();

    let Some(total) = settings.total_cells else {
        return layers.iter().map(|l| l.cells().max(n_min)).collect();
    };

    // Weight layers by l / permeability relative to their neighbor, as a
    // proxy for where the concentration gradients concentrate.
    let mut weights = vec![1.0_f64; layers.len()];
    for i in 1..layers.len() {
        let ratio = (layers[i - 1].permeability() * layers[i].thickness())
            / (layers[i].permeability() * layers[i - 1].thickness());
        weights[i] = weights[i - 1] * ratio;
    }
    let sum: f64 = weights.iter().sum();
    let scaled: Vec<f64> = weights
        .iter()
        .map(|w| (total as f64 * w / sum).ceil().max(n_min as f64))
        .collect();
    let scaled_sum: f64 = scaled.iter().sum();
    scaled
        .iter()
        .map(|s| ((s / scaled_sum * total as f64).round() as usize).max(n_min))
        .collect()
}

/// Build the finite-volume mesh of a multilayer stack.
pub fn build_mesh(stack: &Multilayer, settings: &MeshSettings) -> Result<Mesh> {
    let counts = allocate(stack, settings);
    debug!("mesh allocation per layer: {counts:?}");

    let mut cells = Vec::with_capacity(counts.iter().sum());
    let mut x0 = 0.0;
    for (layer_idx, (layer, &n)) in stack.layers().iter().zip(&counts).enumerate() {
        let dx = layer.thickness() / n as f64;
        for i in 0..n {
            cells.push(Cell {
                center: x0 + (i as f64 + 0.5) * dx,
                width: dx,
                diffusivity: layer.diffusivity(),
                partition: layer.partition(),
                c_init: layer.c_init(),
                layer: layer_idx,
            });
        }
        x0 += layer.thickness();
    }

    Ok(Mesh::from_cells(cells, stack.len()))
}
