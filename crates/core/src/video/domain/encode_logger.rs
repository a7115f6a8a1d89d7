/// Cross-cutting sink for pipeline lifecycle events.
///
/// Decouples the encoder from any concrete output mechanism (stdout, the
/// `log` crate, GUI signals) so callers choose how chatty encoding is.
/// The pipeline never touches process-wide logging state; silence is the
/// default.
pub trait EncodeLogger: Send {
    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Report a recoverable problem the pipeline worked around.
    fn warn(&mut self, message: &str);
}

/// Silent logger that discards all events. The default sink.
pub struct NullEncodeLogger;

impl EncodeLogger for NullEncodeLogger {
    fn info(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
}

/// Forwards events to the `log` crate, for callers that already run a
/// `log` backend (the CLI installs `env_logger`).
pub struct LogEncodeLogger;

impl EncodeLogger for LogEncodeLogger {
    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&mut self, message: &str) {
        log::warn!("{message}");
    }
}
