// Logging macros

/// Emit a `warn` event for a denied request with the identifier passed
/// through the global redactor.
#[macro_export]
macro_rules! redacted_warn {
    (identifier = $id:expr, $($arg:tt)*) => {
        tracing::warn!(identifier = %$crate::redact($id), $($arg)*)
    };
}

#[macro_export]
macro_rules! redacted_error {
    (identifier = $id:expr, $($arg:tt)*) => {
        tracing::error!(identifier = %$crate::redact($id), $($arg)*)
    };
}
