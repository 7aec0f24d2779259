/// Errors produced by the `fuzzci-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A numeric environment variable did not hold a non-negative integer.
    #[error("invalid value for {var}: '{value}' is not a non-negative integer")]
    InvalidInteger { var: &'static str, value: String },
}
