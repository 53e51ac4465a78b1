use thiserror::Error;

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Caller errors. A legitimate deny is never reported here; it is an
/// `Ok` decision with `allowed == false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("invalid subject: {0}")]
    InvalidSubject(String),
}
