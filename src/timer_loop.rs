//! Drive the virtual clock of a context from the wall clock.
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::{sleep, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use crate::context::NdContext;

/// A background thread that advances the clock of a context in real time.
///
/// Without it, time only moves when [`NdContext::advance`] is called,
/// which is what tests and simulations do.
pub struct TimerLoop {
    handle: JoinHandle<()>,
    stopped: Arc<Mutex<bool>>,
}

impl TimerLoop {
    pub fn new(context: Arc<NdContext>, tick: Duration) -> Self {
        let stopped = Arc::new(Mutex::new(false));
        let stopped_thr = stopped.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let origin = context.now();
            while !*stopped_thr.lock().unwrap() {
                sleep(tick);
                context.advance_to(origin + start.elapsed());
            }
            debug!("timer loop stopped at {:?}", context.now());
        });
        Self { stopped, handle }
    }

    pub fn stop(self) {
        *self.stopped.lock().unwrap() = true;
        self.handle.join().unwrap();
    }
}
