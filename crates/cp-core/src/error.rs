use thiserror::Error;

pub type CpResult<T> = Result<T, CpError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CpError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Shape mismatch for {what}: expected {expected}, found {found}")]
    Shape {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

impl CpError {
    /// Shorthand for a length / column-count mismatch.
    pub fn shape(what: &'static str, expected: usize, found: usize) -> Self {
        CpError::Shape {
            what,
            expected,
            found,
        }
    }
}
