use mailroom::Diagnostic;
use std::sync::{Arc, Mutex};

/// A diagnostics sink that records every reported error for assertions.
#[derive(Clone, Default)]
pub struct RecordingDiagnostic {
    errors: Arc<Mutex<Vec<String>>>,
}

impl RecordingDiagnostic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

impl Diagnostic for RecordingDiagnostic {
    fn error(&self, msg: &str, err: &anyhow::Error) {
        self.errors.lock().unwrap().push(format!("{msg}: {err}"));
    }
}
