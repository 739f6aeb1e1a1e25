use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Non-finite entry in {what} at index {index}: {value}")]
    NonFiniteEntry {
        what: &'static str,
        index: usize,
        value: f64,
    },
}
