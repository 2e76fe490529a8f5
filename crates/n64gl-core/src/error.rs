/// Recoverable API errors.
///
/// These are recorded in the context's [`ErrorState`] rather than returned to
/// the caller; the offending call performs no state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GlError {
    /// An enumerated argument is out of range for this call.
    #[error("invalid enum: {0}")]
    InvalidEnum(&'static str),

    /// A numeric argument is out of range.
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),

    /// The call is not allowed in the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// A matrix push would exceed the stack depth.
    #[error("matrix stack overflow")]
    StackOverflow,

    /// A matrix pop on a stack holding a single matrix.
    #[error("matrix stack underflow")]
    StackUnderflow,
}

/// Sticky error slot: the first recorded error is kept until queried.
#[derive(Debug, Default)]
pub struct ErrorState {
    pending: Option<GlError>,
}

impl ErrorState {
    /// Record `error` unless another one is already pending.
    pub fn record(&mut self, error: GlError) {
        log::warn!("{error}");
        if self.pending.is_none() {
            self.pending = Some(error);
        }
    }

    /// Record the error of a failed operation, if any.
    pub fn check(&mut self, result: Result<(), GlError>) {
        if let Err(error) = result {
            self.record(error);
        }
    }

    /// Return and clear the pending error.
    pub fn take(&mut self) -> Option<GlError> {
        self.pending.take()
    }
}
