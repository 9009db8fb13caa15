//! Coalesced redraw requests.
//!
//! Any number of state changes between two frames collapse into a single
//! outstanding frame request. The host calls back into the viewer when the
//! frame fires; dropping or cancelling the scheduler withdraws the request.
use log::debug;

/// Why a redraw was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedrawReason {
    Resize,
    Data,
    Filter,
    Transform,
    Layers,
    Hover,
    Selection,
}

impl RedrawReason {
    pub const ALL: [RedrawReason; 7] = [
        RedrawReason::Resize,
        RedrawReason::Data,
        RedrawReason::Filter,
        RedrawReason::Transform,
        RedrawReason::Layers,
        RedrawReason::Hover,
        RedrawReason::Selection,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of reasons accumulated for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reasons(u8);

impl Reasons {
    pub fn insert(&mut self, reason: RedrawReason) {
        self.0 |= reason.bit();
    }

    pub fn contains(&self, reason: RedrawReason) -> bool {
        self.0 & reason.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = RedrawReason> + '_ {
        RedrawReason::ALL.into_iter().filter(|r| self.contains(*r))
    }
}

/// Something that can call back once on the next display frame.
pub trait FrameHost {
    type Handle: Copy + std::fmt::Debug;

    fn request_frame(&mut self) -> Self::Handle;

    fn cancel_frame(&mut self, handle: Self::Handle);
}

pub struct RedrawScheduler<H: FrameHost> {
    host: H,
    pending: Option<H::Handle>,
    reasons: Reasons,
    frames: u64,
}

impl<H: FrameHost> RedrawScheduler<H> {
    pub fn new(host: H) -> Self {
        Self { host, pending: None, reasons: Reasons::default(), frames: 0 }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Frames begun so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Note a reason to redraw. Returns `true` only when this call asked the
    /// host for a new frame.
    pub fn request(&mut self, reason: RedrawReason) -> bool {
        self.reasons.insert(reason);
        if self.pending.is_some() {
            debug!("redraw coalesced ({reason:?})");
            return false;
        }
        self.pending = Some(self.host.request_frame());
        true
    }

    /// Consume the outstanding request. `None` if there was nothing to draw.
    ///
    /// The handle is returned to the host either way: a host that draws
    /// before its callback fires must not be left holding a live callback.
    pub fn begin_frame(&mut self) -> Option<Reasons> {
        let handle = self.pending.take()?;
        self.host.cancel_frame(handle);
        self.frames += 1;
        let reasons = std::mem::take(&mut self.reasons);
        debug!("frame {}: {:?}", self.frames, reasons.iter().collect::<Vec<_>>());
        Some(reasons)
    }

    /// Withdraw any outstanding request.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.host.cancel_frame(handle);
            debug!("pending frame {handle:?} cancelled");
        }
        self.reasons = Reasons::default();
    }
}

impl<H: FrameHost> Drop for RedrawScheduler<H> {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── Manual host ──────────────────────────────────────────────────────────────

/// Frame host driven by hand; for headless use and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualFrameHost {
    next: u64,
    outstanding: Vec<u64>,
    requested: u64,
    cancelled: u64,
}

impl ManualFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }

    /// Fire the oldest outstanding frame. Returns whether one fired.
    pub fn fire(&mut self) -> bool {
        if self.outstanding.is_empty() {
            return false;
        }
        self.outstanding.remove(0);
        true
    }
}

impl FrameHost for ManualFrameHost {
    type Handle = u64;

    fn request_frame(&mut self) -> u64 {
        self.next += 1;
        self.requested += 1;
        self.outstanding.push(self.next);
        self.next
    }

    fn cancel_frame(&mut self, handle: u64) {
        let before = self.outstanding.len();
        self.outstanding.retain(|&h| h != handle);
        if self.outstanding.len() != before {
            self.cancelled += 1;
        }
    }
}

impl<T: FrameHost + ?Sized> FrameHost for &mut T {
    type Handle = T::Handle;

    fn request_frame(&mut self) -> Self::Handle {
        (**self).request_frame()
    }

    fn cancel_frame(&mut self, handle: Self::Handle) {
        (**self).cancel_frame(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_coalesce_into_one_request() {
        let mut sched = RedrawScheduler::new(ManualFrameHost::new());
        assert!(sched.request(RedrawReason::Transform));
        for _ in 0..50 {
            assert!(!sched.request(RedrawReason::Transform));
        }
        assert!(!sched.request(RedrawReason::Hover));
        assert_eq!(sched.host().requested(), 1);
        assert_eq!(sched.host().outstanding(), 1);

        assert!(sched.host_mut().fire());
        let reasons = sched.begin_frame().unwrap();
        assert_eq!(reasons.iter().collect::<Vec<_>>(), vec![RedrawReason::Transform, RedrawReason::Hover]);
        assert!(!sched.is_pending());
    }

    #[test]
    fn next_change_after_a_frame_requests_again() {
        let mut sched = RedrawScheduler::new(ManualFrameHost::new());
        sched.request(RedrawReason::Filter);
        sched.begin_frame();
        assert!(sched.begin_frame().is_none());
        assert!(sched.request(RedrawReason::Layers));
        assert_eq!(sched.host().requested(), 2);
        assert_eq!(sched.frames(), 1);
    }

    #[test]
    fn drawing_early_releases_the_host_callback() {
        let mut sched = RedrawScheduler::new(ManualFrameHost::new());
        sched.request(RedrawReason::Resize);
        assert!(sched.begin_frame().is_some());
        assert_eq!(sched.host().outstanding(), 0);
        assert_eq!(sched.host().cancelled(), 1);
    }

    #[test]
    fn fired_frames_are_not_counted_as_cancelled() {
        let mut sched = RedrawScheduler::new(ManualFrameHost::new());
        sched.request(RedrawReason::Hover);
        assert!(sched.host_mut().fire());
        sched.begin_frame();
        assert_eq!(sched.host().cancelled(), 0);
    }

    #[test]
    fn cancel_withdraws_the_outstanding_request() {
        let mut sched = RedrawScheduler::new(ManualFrameHost::new());
        sched.request(RedrawReason::Resize);
        sched.cancel();
        assert_eq!(sched.host().outstanding(), 0);
        assert_eq!(sched.host().cancelled(), 1);
        assert!(sched.begin_frame().is_none());
    }

    #[test]
    fn drop_cancels() {
        let mut host = ManualFrameHost::new();
        {
            let mut sched = RedrawScheduler::new(&mut host);
            sched.request(RedrawReason::Data);
        }
        assert_eq!(host.outstanding(), 0);
        assert_eq!(host.cancelled(), 1);
    }
}
