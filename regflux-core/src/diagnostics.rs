use std::sync::Mutex;

/// Injectable sink for non-fatal warnings.
///
/// Replaces ad hoc console printing so callers can choose where warnings
/// go and tests can assert on them.
pub trait DiagnosticSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Writes warnings to stderr. The default sink.
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn warn(&self, message: &str) {
        eprintln!("[warn] {}", message);
    }
}

/// Discards all warnings.
#[derive(Debug, Default)]
pub struct SilentSink;

impl DiagnosticSink for SilentSink {
    fn warn(&self, _message: &str) {}
}

/// Collects warnings in memory for inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
