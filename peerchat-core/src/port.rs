//! Port parsing for user-supplied text.

use crate::error::CoreError;

/// Parse a TCP port typed by a human.
///
/// Surrounding whitespace is ignored. Anything that is not a decimal number
/// in `0..=65535` is rejected with [`CoreError::InvalidPort`].
pub fn parse_port(input: &str) -> Result<u16, CoreError> {
    input
        .trim()
        .parse::<u16>()
        .map_err(|_| CoreError::InvalidPort(input.to_string()))
}
