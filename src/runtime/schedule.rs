//! Coalesced render scheduling.
//!
//! Any number of render requests between two ticks collapse into one
//! pending flag. The first request after a tick asks the caller to
//! schedule the next tick; later ones only keep the flag set. A render in
//! progress is never re-entered: a request arriving during it is carried
//! over to the next tick.

#[derive(Debug, Default)]
pub struct RenderScheduler {
    pending: bool,
    tick_queued: bool,
    rendering: bool,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a render. True when the caller must queue a tick.
    pub fn request(&mut self) -> bool {
        self.pending = true;
        if self.tick_queued {
            return false;
        }
        self.tick_queued = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    /// Tick: consume the pending flag and enter the render. False when
    /// nothing is pending or a render is already running.
    pub fn begin(&mut self) -> bool {
        self.tick_queued = false;
        if !self.pending || self.rendering {
            return false;
        }
        self.pending = false;
        self.rendering = true;
        true
    }

    /// Enter a render outside the tick cycle. False if one is running.
    pub fn begin_now(&mut self) -> bool {
        if self.rendering {
            self.pending = true;
            return false;
        }
        self.pending = false;
        self.rendering = true;
        true
    }

    pub fn finish(&mut self) {
        self.rendering = false;
    }
}
