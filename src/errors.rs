use thiserror::Error;

/// Errors raised by a caller-supplied ephemeris implementation, or by the façade itself
/// while dispatching to one.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EphemerisError {
    #[error("perturber index {index} is out of range [0, {bound})")]
    BodyIndexOutOfRange { index: usize, bound: usize },

    #[error("ephemeris unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Errors raised while driving the adaptive Gauss-Radau integrator.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum IntegratorError {
    #[error("step at t={t_begin} failed to converge within {attempts} iterations")]
    NonConvergingStep { t_begin: f64, attempts: usize },

    #[error("non-finite acceleration from term `{term}` on particle {particle_index}")]
    NumericalFailure {
        term: &'static str,
        particle_index: usize,
    },

    #[error("ephemeris error during integration: {0}")]
    Ephemeris(#[from] EphemerisError),
}

/// Errors that prevent a `Session::integrate` call from starting at all.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("variational particle {var_index} names parent {parent} which is not a real particle index below it")]
    BadVariationalLink { var_index: usize, parent: usize },

    #[error("output buffers are too small: need {needed} state slots, got {have}")]
    OutputBufferTooSmall { needed: usize, have: usize },
}

/// The status returned to the caller of `integrate`. Unlike the error types above, reaching
/// a non-`Ok` status is not necessarily a failure: `BufferFull` carries a valid, inspectable
/// partial result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegratorStatus {
    Ok,
    BufferFull,
    UserStop,
    NumericalFailure,
    EphemerisError,
}

impl From<&IntegratorError> for IntegratorStatus {
    fn from(e: &IntegratorError) -> Self {
        match e {
            IntegratorError::NonConvergingStep { .. } => IntegratorStatus::NumericalFailure,
            IntegratorError::NumericalFailure { .. } => IntegratorStatus::NumericalFailure,
            IntegratorError::Ephemeris(_) => IntegratorStatus::EphemerisError,
        }
    }
}
