use crate::error::{Error, Result};

fn check_positive(value: f64, what: &str) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::invalid(format!(
            "{what} must be finite and strictly positive, got {value}"
        )));
    }
    Ok(value)
}

fn check_non_negative(value: f64, what: &str) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid(format!(
            "{what} must be finite and non-negative, got {value}"
        )));
    }
    Ok(value)
}

/// A contiguous homogeneous material slab.
///
/// All parameters are SI scalars: thickness [m], diffusivity [m^2/s], the
/// Henry-like partition coefficient k (larger k = larger solubility in this
/// layer, so that C/k is continuous across interfaces) and a uniform initial
/// concentration. `cells` is the desired number of finite-volume sub-cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    thickness: f64,
    diffusivity: f64,
    partition: f64,
    c_init: f64,
    cells: usize,
}

impl Layer {
    pub fn new(
        thickness: f64,
        diffusivity: f64,
        partition: f64,
        c_init: f64,
        cells: usize,
    ) -> Result<Self> {
        if cells == 0 {
            return Err(Error::invalid("layer needs at least one cell"));
        }
        Ok(Self {
            thickness: check_positive(thickness, "layer thickness")?,
            diffusivity: check_positive(diffusivity, "diffusivity")?,
            partition: check_positive(partition, "partition coefficient")?,
            c_init: check_non_negative(c_init, "initial concentration")?,
            cells,
        })
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn diffusivity(&self) -> f64 {
        self.diffusivity
    }

    pub fn partition(&self) -> f64 {
        self.partition
    }

    pub fn c_init(&self) -> f64 {
        self.c_init
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Mass-transfer resistance in potential units, l / (D k).
    pub fn resistance(&self) -> f64 {
        self.thickness / (self.diffusivity * self.partition)
    }

    /// Permeability D k / l, the reciprocal of [`Layer::resistance`].
    pub fn permeability(&self) -> f64 {
        self.diffusivity * self.partition / self.thickness
    }

    /// Diffusive lag time l^2 / (6 D).
    pub fn lag_time(&self) -> f64 {
        self.thickness * self.thickness / (6.0 * self.diffusivity)
    }
}

/// An ordered stack of layers; index 0 is the contact face.
#[derive(Debug, Clone, PartialEq)]
pub struct Multilayer {
    layers: Vec<Layer>,
}

impl Multilayer {
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::invalid("multilayer must contain at least one layer"));
        }
        Ok(Self { layers })
    }

    pub fn single(layer: Layer) -> Self {
        Self {
            layers: vec![layer],
        }
    }

    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total wall thickness.
    pub fn thickness(&self) -> f64 {
        self.layers.iter().map(Layer::thickness).sum()
    }

    /// Per-layer resistances l / (D k), contact layer first.
    pub fn resistances(&self) -> Vec<f64> {
        self.layers.iter().map(Layer::resistance).collect()
    }

    /// The stack with contact on the other side.
    pub fn reversed(&self) -> Self {
        let mut layers = self.layers.clone();
        layers.reverse();
        Self { layers }
    }

    /// The stack followed by its mirror image (used for symmetric far faces).
    pub fn mirrored(&self) -> Self {
        let mut layers = self.layers.clone();
        layers.extend(self.reversed().layers);
        Self { layers }
    }
}
