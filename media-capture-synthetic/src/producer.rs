//! Paced producer thread shared by the synthetic sources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use media_capture_core::CaptureError;

/// Runs a tick closure at a fixed interval on a dedicated thread.
#[derive(Default)]
pub(crate) struct Producer {
    running: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Producer {
    /// Spawn the thread. `tick` receives the tick number, starting at 0.
    pub(crate) fn start<F>(&self, name: &str, interval: Duration, mut tick: F) -> Result<(), CaptureError>
    where
        F: FnMut(u64) + Send + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::Device(format!("{} already running", name)));
        }
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let epoch = Instant::now();
                let mut seq: u64 = 0;
                while running.load(Ordering::SeqCst) {
                    let deadline = epoch + interval.mul_f64(seq as f64);
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    }
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    tick(seq);
                    seq += 1;
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::Device(format!("failed to spawn {} thread: {}", name, e))
            })?;

        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Signal the thread and wait for it to exit. After this returns no
    /// further ticks run.
    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                log::error!("synthetic producer thread panicked");
            }
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.stop();
    }
}
