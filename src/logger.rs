//! Utilities for logging Neighbor Discovery statistics.
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::{sleep, JoinHandle};
use std::time::Duration;

use log::info;

use crate::statistics::NdStatistics;

/// Periodically log the statistics of a context, and once more when stopped.
pub struct StatisticsLogger {
    handle: JoinHandle<()>,
    stopped: Arc<Mutex<bool>>,
}

impl StatisticsLogger {
    pub fn new(statistics: Arc<Mutex<NdStatistics>>, interval: Duration) -> Self {
        let stopped = Arc::new(Mutex::new(false));
        let stopped_thr = stopped.clone();
        let handle = thread::spawn(move || {
            let log = || info!("{}", statistics.lock().unwrap());
            let refresh = Duration::from_millis(100).min(interval);
            let mut elapsed = Duration::ZERO;
            while !*stopped_thr.lock().unwrap() {
                sleep(refresh);
                elapsed += refresh;
                if elapsed >= interval {
                    log();
                    elapsed = Duration::ZERO;
                }
            }
            log();
        });
        Self { stopped, handle }
    }

    pub fn stop(self) {
        *self.stopped.lock().unwrap() = true;
        self.handle.join().unwrap();
    }
}
