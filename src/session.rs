use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Tracks which structure-inference pass is current for a viewer.
///
/// Document (re)loads are not composable: beginning a new pass supersedes
/// any pass still in flight, and a superseded pass must not publish its
/// result. Passes observe their [`PassToken`] between page fetches.
#[derive(Debug, Default)]
pub struct StructureSession {
    generation: Arc<AtomicU64>,
}

impl StructureSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new pass, invalidating every earlier token.
    pub fn begin(&self) -> PassToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        PassToken {
            generation,
            current: Arc::clone(&self.generation),
        }
    }
}

/// Handle for one inference pass; cheap to clone and check.
#[derive(Debug, Clone)]
pub struct PassToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl PassToken {
    /// Whether a newer pass has been started since this one.
    pub fn superseded(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }

    /// Checkpoint between page fetches; superseded passes bail out here.
    pub(crate) fn check(&self) -> Result<(), Superseded> {
        if self.superseded() { Err(Superseded) } else { Ok(()) }
    }

    /// A token that is never superseded, for one-shot callers that do not
    /// manage reloads.
    pub fn standalone() -> Self {
        StructureSession::new().begin()
    }
}

/// Internal signal that a newer pass has started; the superseded pass
/// unwinds without publishing anything.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Superseded;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_pass_supersedes_older() {
        let session = StructureSession::new();
        let first = session.begin();
        assert!(!first.superseded());

        let second = session.begin();
        assert!(first.superseded());
        assert!(!second.superseded());
    }

    #[test]
    fn test_standalone_token_stays_current() {
        let token = PassToken::standalone();
        assert!(!token.superseded());
    }
}
