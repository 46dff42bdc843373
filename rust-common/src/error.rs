//! Failure classification for the retry envelope.
//!
//! Every attempt made under a [`RetryPolicy`](crate::RetryPolicy) ends in
//! success, a transient failure (retried) or a terminal failure (surfaced
//! immediately). [`RetryError`] records which of the two ways the envelope
//! gave up.

use thiserror::Error;

/// Classifies an error as transient or terminal.
///
/// # Examples
///
/// ```
/// use hcv_common::Retryable;
///
/// struct Blip;
///
/// impl Retryable for Blip {
///     fn is_retryable(&self) -> bool {
///         true
///     }
/// }
///
/// assert!(Blip.is_retryable());
/// ```
pub trait Retryable {
    /// Whether another attempt could plausibly succeed.
    fn is_retryable(&self) -> bool;
}

/// Outcome of an operation the retry envelope could not complete.
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// The attempt failed in a way retrying cannot fix. No retry was consumed.
    #[error("{0}")]
    Terminal(E),

    /// Every permitted attempt failed transiently.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Name of the operation being retried
        operation: String,
        /// Number of attempts performed
        attempts: u32,
        /// Failure reported by the final attempt
        #[source]
        last: E,
    },
}

impl<E> RetryError<E> {
    /// Whether the retry budget was exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
