use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct GateState {
    armed: u64,
    released: u64,
}

/// Ticket returned by [`TopologyGate::arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateTicket(u64);

/// One-shot rendezvous between a queued topology wait and the next wakeup.
///
/// `arm` is called when the wait is queued; `signal` (any wakeup) releases
/// every ticket armed so far. A signal that arrives before the waiter starts
/// waiting is not lost.
#[derive(Debug, Default)]
pub struct TopologyGate {
    state: Mutex<GateState>,
    cv: Condvar,
}

impl TopologyGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) -> GateTicket {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.armed += 1;
        GateTicket(st.armed)
    }

    pub fn signal(&self) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if st.released != st.armed {
            st.released = st.armed;
            self.cv.notify_all();
        }
    }

    /// Block until `ticket` is released or `timeout` elapses.
    ///
    /// Returns `true` if released, `false` on timeout.
    #[must_use]
    pub fn wait(&self, ticket: GateTicket, timeout: Duration) -> bool {
        let st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (st, _) = self
            .cv
            .wait_timeout_while(st, timeout, |s| s.released < ticket.0)
            .unwrap_or_else(PoisonError::into_inner);
        st.released >= ticket.0
    }
}
