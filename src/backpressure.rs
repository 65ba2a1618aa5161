/// Flow-control signal returned by every `accept` call.
///
/// `Pause` tells the producer side to stop pulling new chunks until the
/// signaling buffer has drained. The chunk that triggered the signal was
/// still accepted; no chunk is ever refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum BackpressureSignal {
    /// Buffer has headroom, keep producing
    Continue,
    /// Buffer is at capacity, stop pulling until drain
    Pause,
}

impl BackpressureSignal {
    /// Combine signals from a fan-out of accepts: any `Pause` wins
    pub fn and(self, other: BackpressureSignal) -> BackpressureSignal {
        if self == BackpressureSignal::Pause || other == BackpressureSignal::Pause {
            BackpressureSignal::Pause
        } else {
            BackpressureSignal::Continue
        }
    }

    pub fn is_pause(self) -> bool {
        self == BackpressureSignal::Pause
    }
}

/// Flow-control messages exchanged between the sink and the pipeline loop.
///
/// Coordination is event based rather than lock based: the sink posts
/// `Drained` when its buffer empties, and cancel handles post `Cancel` from
/// any thread. The pipeline is the sole receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Control {
    /// Buffer occupancy returned to zero; paused producers may resume
    Drained,
    /// External request to stop the run, with a caller-supplied reason
    Cancel(String),
}

/// High-water mark crossing logic.
///
/// Backpressure triggers when occupancy reaches the mark, and releases when
/// the buffer drains back to empty. There is no separate low-water mark.
#[derive(Debug, Clone, Copy)]
pub struct WaterMark {
    high: usize,
}

impl WaterMark {
    /// `high` must be validated as strictly positive by the caller
    pub fn new(high: usize) -> Self {
        Self { high }
    }

    /// The configured high-water mark
    pub fn high(&self) -> usize {
        self.high
    }

    /// Assess buffer occupancy after a write
    pub fn assess(&self, occupancy: usize) -> BackpressureSignal {
        if occupancy >= self.high {
            BackpressureSignal::Pause
        } else {
            BackpressureSignal::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_pause_at_the_mark() {
        let mark = WaterMark::new(5);
        assert_eq!(mark.assess(4), BackpressureSignal::Continue);
        assert_eq!(mark.assess(5), BackpressureSignal::Pause);
        assert_eq!(mark.assess(6), BackpressureSignal::Pause);
    }

    #[test]
    fn mark_of_one_pauses_every_write() {
        let mark = WaterMark::new(1);
        assert_eq!(mark.assess(1), BackpressureSignal::Pause);
    }

    #[test]
    fn pause_dominates_when_combined() {
        use BackpressureSignal::*;
        assert_eq!(Continue.and(Continue), Continue);
        assert_eq!(Continue.and(Pause), Pause);
        assert_eq!(Pause.and(Continue), Pause);
        assert_eq!(Pause.and(Pause), Pause);
    }
}
