//! Lifecycle phases of an editor client.
//!
//! Each phase fires at most once. Listeners added before the phase fires
//! are queued; listeners added afterwards run immediately.

type Listener = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Handshake and INIT done
    Start,
    /// Clean disconnect
    End,
}

enum Phase {
    Pending(Vec<Listener>),
    Fired,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Pending(Vec::new())
    }
}

impl Phase {
    fn add(&mut self, listener: Listener) {
        match self {
            Self::Pending(queue) => queue.push(listener),
            Self::Fired => listener(),
        }
    }

    fn fire(&mut self) -> bool {
        match std::mem::replace(self, Self::Fired) {
            Self::Pending(queue) => {
                for listener in queue {
                    listener();
                }
                true
            }
            Self::Fired => false,
        }
    }
}

#[derive(Default)]
pub struct Lifecycle {
    start: Phase,
    end: Phase,
}

impl Lifecycle {
    fn phase(&mut self, event: LifecycleEvent) -> &mut Phase {
        match event {
            LifecycleEvent::Start => &mut self.start,
            LifecycleEvent::End => &mut self.end,
        }
    }

    pub fn on(&mut self, event: LifecycleEvent, listener: impl FnOnce() + Send + 'static) {
        self.phase(event).add(Box::new(listener));
    }

    /// Fire `event`. Returns `false` if it had already fired.
    pub fn fire(&mut self, event: LifecycleEvent) -> bool {
        self.phase(event).fire()
    }

    pub fn has_fired(&self, event: LifecycleEvent) -> bool {
        let phase = match event {
            LifecycleEvent::Start => &self.start,
            LifecycleEvent::End => &self.end,
        };
        matches!(phase, Phase::Fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        let make = move || {
            let handle = Arc::clone(&handle);
            Box::new(move || {
                handle.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    #[test]
    fn test_queued_listeners_run_on_fire() {
        let (count, make) = counter();
        let mut lifecycle = Lifecycle::default();
        lifecycle.on(LifecycleEvent::Start, make());
        lifecycle.on(LifecycleEvent::Start, make());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(lifecycle.fire(LifecycleEvent::Start));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_late_listener_runs_immediately_once() {
        let (count, make) = counter();
        let mut lifecycle = Lifecycle::default();
        lifecycle.fire(LifecycleEvent::Start);

        lifecycle.on(LifecycleEvent::Start, make());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(!lifecycle.fire(LifecycleEvent::Start));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_phases_are_independent() {
        let (count, make) = counter();
        let mut lifecycle = Lifecycle::default();
        lifecycle.on(LifecycleEvent::End, make());
        lifecycle.fire(LifecycleEvent::Start);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(lifecycle.has_fired(LifecycleEvent::Start));
        assert!(!lifecycle.has_fired(LifecycleEvent::End));
    }
}
