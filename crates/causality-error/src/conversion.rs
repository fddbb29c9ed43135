// Error conversion utilities

use crate::{BoxError, CausalityError};

/// Trait for converting any error type to a BoxError
pub trait IntoBoxError {
    /// Convert the error into a BoxError
    fn into_box_error(self) -> BoxError;
}

// Implement for anything that already implements CausalityError
impl<E: CausalityError> IntoBoxError for E {
    fn into_box_error(self) -> BoxError {
        Box::new(self)
    }
}
