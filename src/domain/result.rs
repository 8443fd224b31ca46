//! Result type alias for Ediflow

use super::errors::EdiError;

/// Result type alias for Ediflow operations
///
/// # Examples
///
/// ```
/// use ediflow::domain::result::Result;
/// use ediflow::domain::errors::EdiError;
///
/// fn failing_function() -> Result<()> {
///     Err(EdiError::Validation("Invalid input".to_string()))
/// }
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, EdiError>;
