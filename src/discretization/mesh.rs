use crate::error::{Error, Result};

/// A single control volume of the wall mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Center position [m], measured from the contact face.
    pub center: f64,
    /// Cell width [m]; uniform within a layer.
    pub width: f64,
    /// Diffusivity inherited from the owning layer [m^2/s].
    pub diffusivity: f64,
    /// Partition coefficient inherited from the owning layer.
    pub partition: f64,
    /// Initial concentration.
    pub c_init: f64,
    /// Index of the owning layer.
    pub layer: usize,
}

/// The piecewise-uniform finite-volume mesh spanning all layers.
///
/// Cell 0 touches the contact face at x = 0; interfaces sit exactly on
/// material boundaries and there are no ghost cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    cells: Vec<Cell>,
    n_layers: usize,
}

impl Mesh {
    pub(crate) fn from_cells(cells: Vec<Cell>, n_layers: usize) -> Self {
        debug_assert!(!cells.is_empty());
        Self { cells, n_layers }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    /// Total wall thickness spanned by the mesh.
    pub fn thickness(&self) -> f64 {
        self.cells.iter().map(|c| c.width).sum()
    }

    pub fn min_width(&self) -> f64 {
        self.cells
            .iter()
            .map(|c| c.width)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_width(&self) -> f64 {
        self.cells.iter().map(|c| c.width).fold(0.0, f64::max)
    }

    /// The mesh with cell order reversed (contact on the other side).
    pub fn reversed(&self) -> Self {
        let mut cells: Vec<Cell> = self
            .cells
            .iter()
            .rev()
            .map(|c| Cell {
                layer: self.n_layers - 1 - c.layer,
                ..*c
            })
            .collect();
        // recompute centers from summed widths so roundoff cannot skew them
        let mut x = 0.0;
        for cell in &mut cells {
            cell.center = x + 0.5 * cell.width;
            x += cell.width;
        }
        Self {
            cells,
            n_layers: self.n_layers,
        }
    }

    /// Replace per-cell initial concentrations (profile carry-over).
    pub fn with_initial(&self, c_init: &[f64]) -> Result<Self> {
        if c_init.len() != self.cells.len() {
            return Err(Error::invalid(format!(
                "initial profile has {} values for {} cells",
                c_init.len(),
                self.cells.len()
            )));
        }
        if let Some(bad) = c_init.iter().find(|c| !c.is_finite() || **c < 0.0) {
            return Err(Error::invalid(format!(
                "initial profile value {bad} is not a finite non-negative number"
            )));
        }
        let mut mesh = self.clone();
        for (cell, &c) in mesh.cells.iter_mut().zip(c_init) {
            cell.c_init = c;
        }
        Ok(mesh)
    }

    /// Whether two meshes share cell count and widths up to a relative tolerance.
    pub fn same_geometry(&self, other: &Mesh, rel_tol: f64) -> bool {
        self.cells.len() == other.cells.len()
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| (a.width - b.width).abs() <= rel_tol * a.width.max(b.width))
    }

    /// Whether two meshes also carry the same material data per cell.
    pub fn same_materials(&self, other: &Mesh, rel_tol: f64) -> bool {
        self.same_geometry(other, rel_tol)
            && self.cells.iter().zip(&other.cells).all(|(a, b)| {
                (a.diffusivity - b.diffusivity).abs() <= rel_tol * a.diffusivity
                    && (a.partition - b.partition).abs() <= rel_tol * a.partition
            })
    }
}
