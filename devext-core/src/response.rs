//! Outcome conversion traits.

use crate::error::BoxError;

/// Trait for converting an extension method's return value into an outcome.
///
/// # Default Implementations
///
/// - `()` → success
/// - `Result<(), E>` → success, or the error boxed
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `IntoOutcome`",
    label = "extension methods must return `()` or `Result<(), E>`",
    note = "Pipeline steps returning the subject are declared with `transform` or `try_transform`."
)]
pub trait IntoOutcome {
    /// Convert the return value into success or a boxed error.
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> IntoOutcome for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_is_success() {
        assert!(().into_outcome().is_ok());
    }

    #[test]
    fn result_error_is_boxed() {
        let outcome: Result<(), &str> = Err("nope");
        let err = outcome.into_outcome().unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
