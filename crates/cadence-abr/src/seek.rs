use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Shared seek notification.
///
/// The host calls [`SeekSignal::notify`] whenever playback seeks; rules holding
/// a clone compare generations on their next evaluation and drop state that
/// the discontinuity made stale.
#[derive(Clone, Debug, Default)]
pub struct SeekSignal {
    generation: Arc<AtomicU64>,
}

impl SeekSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(generation, "seek signalled");
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
