use crate::error::{Error, Result};

/// The finite, well-mixed compartment in contact with the wall.
///
/// `partition` is the Henry-like coefficient of the medium relative to the
/// contact layer (C_F / partition is the medium potential). An optional film
/// coefficient `film` [m/s on the potential scale] models an external
/// mass-transfer resistance; absent means perfect diffusive contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Medium {
    surface_area: f64,
    volume: f64,
    partition: f64,
    c_init: f64,
    film: Option<f64>,
}

impl Medium {
    pub fn new(surface_area: f64, volume: f64, partition: f64, c_init: f64) -> Result<Self> {
        let check = |value: f64, what: &str| -> Result<f64> {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::invalid(format!(
                    "medium {what} must be finite and strictly positive, got {value}"
                )));
            }
            Ok(value)
        };
        if !c_init.is_finite() || c_init < 0.0 {
            return Err(Error::invalid(format!(
                "medium initial concentration must be finite and non-negative, got {c_init}"
            )));
        }
        Ok(Self {
            surface_area: check(surface_area, "surface area")?,
            volume: check(volume, "volume")?,
            partition: check(partition, "partition coefficient")?,
            c_init,
            film: None,
        })
    }

    /// Add a finite external film coefficient (Biot-like boundary).
    pub fn with_film(mut self, film: f64) -> Result<Self> {
        if !film.is_finite() || film <= 0.0 {
            return Err(Error::invalid(format!(
                "film coefficient must be finite and strictly positive, got {film}"
            )));
        }
        self.film = Some(film);
        Ok(self)
    }

    /// Same medium with a different initial concentration (chaining helper).
    pub fn with_c_init(mut self, c_init: f64) -> Result<Self> {
        if !c_init.is_finite() || c_init < 0.0 {
            return Err(Error::invalid(format!(
                "medium initial concentration must be finite and non-negative, got {c_init}"
            )));
        }
        self.c_init = c_init;
        Ok(self)
    }

    pub fn surface_area(&self) -> f64 {
        self.surface_area
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn partition(&self) -> f64 {
        self.partition
    }

    pub fn c_init(&self) -> f64 {
        self.c_init
    }

    pub fn film(&self) -> Option<f64> {
        self.film
    }

    /// Packaging-to-medium volume ratio A L / V for a wall of thickness L.
    pub fn dilution(&self, wall_thickness: f64) -> f64 {
        self.surface_area * wall_thickness / self.volume
    }
}
