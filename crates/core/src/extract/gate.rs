use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Allows at most one extraction in flight. A second caller is refused rather
/// than queued so a double tap never turns into a duplicate model call.
#[derive(Debug, Clone, Default)]
pub struct ScanGate {
    inner: Arc<Mutex<()>>,
}

/// Held for the duration of one extraction; dropping it (including when the
/// owning future is cancelled) reopens the gate.
#[derive(Debug)]
pub struct ScanPermit {
    _guard: OwnedMutexGuard<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanInProgress;

impl fmt::Display for ScanInProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a receipt scan is already in progress")
    }
}

impl std::error::Error for ScanInProgress {}

impl ScanGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<ScanPermit, ScanInProgress> {
        let guard = self.inner.clone().try_lock_owned().map_err(|_| ScanInProgress)?;
        Ok(ScanPermit { _guard: guard })
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_second_scan_until_first_is_dropped() {
        let gate = ScanGate::new();
        let permit = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert_eq!(gate.clone().try_acquire().unwrap_err(), ScanInProgress);

        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_ok());
    }
}
