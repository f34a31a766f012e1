/// A single cancelable unit of work due at a simulated time.
///
/// Work is tagged with the epoch (rally id) it was scheduled in; asking for it
/// under a different epoch cancels it without effect.
#[derive(Debug, Clone)]
pub struct Deferred<T> {
    slot: Option<Scheduled<T>>,
}

#[derive(Debug, Clone)]
struct Scheduled<T> {
    due_ms: u64,
    epoch: u32,
    payload: T,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload`, replacing anything already pending
    pub fn schedule(&mut self, due_ms: u64, epoch: u32, payload: T) {
        self.slot = Some(Scheduled {
            due_ms,
            epoch,
            payload,
        });
    }

    /// Drop pending work. Returns true if something was cancelled.
    pub fn cancel(&mut self) -> bool {
        self.slot.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    pub fn due_ms(&self) -> Option<u64> {
        self.slot.as_ref().map(|s| s.due_ms)
    }

    /// Take the payload once due; stale-epoch work is discarded
    pub fn take_due(&mut self, now_ms: u64, epoch: u32) -> Option<T> {
        let slot = self.slot.as_ref()?;
        if slot.epoch != epoch {
            self.slot = None;
            return None;
        }
        if now_ms < slot.due_ms {
            return None;
        }
        self.slot.take().map(|s| s.payload)
    }
}
