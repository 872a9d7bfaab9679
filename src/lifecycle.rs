//! Mount and teardown
//!
//! A mounted effect is a running frame loop plus a set of event listener
//! registrations. Unmounting cancels the pending frame and drops every
//! listener; listener types detach themselves from their target when dropped.
//! After unmount no frame callback and no listener can reach the effect.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::Rc;

/// Host mechanism that calls back once per display frame
pub trait FrameScheduler {
    type Handle: Copy + PartialEq + Debug;

    /// Ask for one callback on the next frame
    fn request(&mut self) -> Self::Handle;

    /// Withdraw a pending request
    fn cancel(&mut self, handle: Self::Handle);
}

/// Self-rescheduling frame loop that can be stopped from outside
pub struct FrameLoop<S: FrameScheduler> {
    scheduler: S,
    running: bool,
    pending: Option<S::Handle>,
}

impl<S: FrameScheduler> FrameLoop<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            running: false,
            pending: None,
        }
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.pending = Some(self.scheduler.request());
        log::debug!("[FrameLoop::start] Frame loop started");
    }

    /// Called from the frame callback. Schedules the next frame and returns
    /// true when this frame should be rendered; false once cancelled.
    pub fn on_frame(&mut self) -> bool {
        self.pending = None;
        if !self.running {
            return false;
        }
        self.pending = Some(self.scheduler.request());
        true
    }

    pub fn cancel(&mut self) {
        self.running = false;
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> Option<S::Handle> {
        self.pending
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

/// A running effect: the frame loop plus listener registrations `L`
pub struct Mount<S: FrameScheduler, L> {
    frame_loop: FrameLoop<S>,
    listeners: Vec<L>,
    mounted: bool,
}

impl<S: FrameScheduler, L> Mount<S, L> {
    /// Start the frame loop and take ownership of the listeners
    pub fn new(mut frame_loop: FrameLoop<S>, listeners: Vec<L>) -> Self {
        frame_loop.start();
        log::info!("[Mount::new] Mounted with {} listeners", listeners.len());
        Self {
            frame_loop,
            listeners,
            mounted: true,
        }
    }

    pub fn frame_loop_mut(&mut self) -> &mut FrameLoop<S> {
        &mut self.frame_loop
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Stop the frame loop and detach every listener. Idempotent.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.frame_loop.cancel();
        self.listeners.clear();
        self.mounted = false;
        log::info!("[Mount::unmount] Frame loop cancelled, listeners detached");
    }
}

impl<S: FrameScheduler, L> Drop for Mount<S, L> {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Unmount request shared between a host handle and the frame callback.
///
/// The host may ask to unmount while the state is borrowed by a frame or an
/// event handler. The request is then kept and the next frame carries it out.
#[derive(Debug, Clone, Default)]
pub struct UnmountRequest(Rc<Cell<bool>>);

impl UnmountRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `unmount` on `state` now, or defer it if `state` is borrowed.
    /// Returns true when it ran now.
    pub fn unmount_or_defer<T>(&self, state: &RefCell<T>, unmount: impl FnOnce(&mut T)) -> bool {
        match state.try_borrow_mut() {
            Ok(mut state) => {
                self.0.set(false);
                unmount(&mut state);
                true
            }
            Err(_) => {
                log::debug!("[UnmountRequest::unmount_or_defer] State busy, deferring to the next frame");
                self.0.set(true);
                false
            }
        }
    }

    /// Consume a deferred request
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }

    pub fn is_pending(&self) -> bool {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Calls {
        requested: Vec<u32>,
        cancelled: Vec<u32>,
    }

    struct FakeScheduler {
        next: u32,
        calls: Rc<RefCell<Calls>>,
    }

    impl FrameScheduler for FakeScheduler {
        type Handle = u32;

        fn request(&mut self) -> u32 {
            self.next += 1;
            self.calls.borrow_mut().requested.push(self.next);
            self.next
        }

        fn cancel(&mut self, handle: u32) {
            self.calls.borrow_mut().cancelled.push(handle);
        }
    }

    fn frame_loop() -> (FrameLoop<FakeScheduler>, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let scheduler = FakeScheduler {
            next: 0,
            calls: calls.clone(),
        };
        (FrameLoop::new(scheduler), calls)
    }

    struct Listener(Rc<RefCell<u32>>);

    impl Drop for Listener {
        fn drop(&mut self) {
            *self.0.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_loop_reschedules_each_frame() {
        let (mut frame_loop, calls) = frame_loop();
        frame_loop.start();
        frame_loop.start();
        assert_eq!(calls.borrow().requested, vec![1]);

        assert!(frame_loop.on_frame());
        assert!(frame_loop.on_frame());
        assert_eq!(frame_loop.pending(), Some(3));
    }

    #[test]
    fn test_cancel_withdraws_pending_frame() {
        let (mut frame_loop, calls) = frame_loop();
        frame_loop.start();
        frame_loop.on_frame();
        frame_loop.cancel();

        assert_eq!(calls.borrow().cancelled, vec![2]);
        assert!(!frame_loop.is_running());
        assert_eq!(frame_loop.pending(), None);

        // a callback already in flight renders nothing and schedules nothing
        assert!(!frame_loop.on_frame());
        assert_eq!(calls.borrow().requested.len(), 2);
    }

    #[test]
    fn test_unmount_stops_loop_and_detaches_listeners() {
        let (frame_loop, calls) = frame_loop();
        let detached = Rc::new(RefCell::new(0));
        let listeners = (0..6).map(|_| Listener(detached.clone())).collect();

        let mut mount = Mount::new(frame_loop, listeners);
        assert!(mount.is_mounted());
        assert_eq!(mount.listener_count(), 6);
        assert!(mount.frame_loop_mut().on_frame());

        mount.unmount();
        assert!(!mount.is_mounted());
        assert_eq!(*detached.borrow(), 6);
        assert_eq!(calls.borrow().cancelled, vec![2]);

        mount.unmount();
        assert_eq!(calls.borrow().cancelled.len(), 1);
        assert!(!mount.frame_loop_mut().on_frame());
    }

    #[test]
    fn test_drop_unmounts() {
        let (frame_loop, calls) = frame_loop();
        let detached = Rc::new(RefCell::new(0));
        {
            let _mount = Mount::new(frame_loop, vec![Listener(detached.clone())]);
        }
        assert_eq!(*detached.borrow(), 1);
        assert_eq!(calls.borrow().cancelled, vec![1]);
    }

    #[test]
    fn test_unmount_while_busy_runs_on_next_frame() {
        let (frame_loop, calls) = frame_loop();
        let detached = Rc::new(RefCell::new(0));
        let state = RefCell::new(Mount::new(frame_loop, vec![Listener(detached.clone())]));
        let request = UnmountRequest::new();

        {
            // a frame callback holds the state
            let _busy = state.borrow_mut();
            assert!(!request.unmount_or_defer(&state, |mount| mount.unmount()));
            assert!(request.is_pending());
        }
        assert!(state.borrow().is_mounted());

        // next frame: the callback sees the request instead of rendering
        if request.take() {
            state.borrow_mut().unmount();
        }
        assert!(!request.is_pending());
        assert!(!state.borrow().is_mounted());
        assert_eq!(*detached.borrow(), 1);
        assert_eq!(calls.borrow().cancelled, vec![1]);
    }

    #[test]
    fn test_unmount_when_idle_runs_immediately() {
        let (frame_loop, _calls) = frame_loop();
        let state = RefCell::new(Mount::new(frame_loop, Vec::<Listener>::new()));
        let request = UnmountRequest::new();

        assert!(request.unmount_or_defer(&state, |mount| mount.unmount()));
        assert!(!request.take());
        assert!(!state.borrow().is_mounted());
    }
}
