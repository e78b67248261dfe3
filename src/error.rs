use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by the solver core.
#[derive(Debug, Error)]
pub enum Error {
    /// Non-positive or non-finite physical parameter, empty stack, bad grid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Results with mismatched mesh geometry or material data cannot be merged.
    #[error("incompatible composition: {0}")]
    IncompatibleComposition(String),

    /// The integrator could not meet the tolerances at the step-size floor.
    #[error("integration failure at Fo = {t_last:.6e}, error norm {error_norm:.3e}")]
    IntegrationFailure {
        t_last: f64,
        error_norm: f64,
        chain_step: Option<usize>,
    },

    /// Step budget or deadline exceeded.
    #[error("integration cancelled at Fo = {t_last:.6e}")]
    Cancelled {
        t_last: f64,
        chain_step: Option<usize>,
    },

    /// End-of-run mass balance drifted beyond the configured tolerance.
    #[error("mass balance drift {relative_drift:.3e} exceeds tolerance {tolerance:.1e}")]
    MassBalanceViolation {
        relative_drift: f64,
        tolerance: f64,
    },
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidInput(reason.into())
    }

    pub(crate) fn incompatible(reason: impl Into<String>) -> Self {
        Error::IncompatibleComposition(reason.into())
    }

    /// Tag an integration error with the index of the failing chain step.
    pub(crate) fn with_chain_step(self, step: usize) -> Self {
        match self {
            Error::IntegrationFailure {
                t_last,
                error_norm,
                ..
            } => Error::IntegrationFailure {
                t_last,
                error_norm,
                chain_step: Some(step),
            },
            Error::Cancelled { t_last, .. } => Error::Cancelled {
                t_last,
                chain_step: Some(step),
            },
            other => other,
        }
    }
}
