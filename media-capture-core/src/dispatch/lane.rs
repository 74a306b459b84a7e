use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use crate::models::config::BackpressurePolicy;
use crate::models::diagnostics::LaneStats;
use crate::models::error::CaptureError;
use crate::models::frame::{FrameBuffer, MediaKind};
use crate::traits::frame_processor::FrameProcessor;

/// Fault channel depth. Faults beyond this are still logged and counted.
const FAULT_CHANNEL_CAPACITY: usize = 64;

/// A processor failure caught by a lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneFault {
    pub lane: String,
    pub sequence: u64,
    pub message: String,
}

/// Outcome of submitting a frame to a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Admitted after evicting the oldest queued frame.
    AdmittedEvictedOldest,
    /// Refused because the queue was full.
    Dropped,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Self::Dropped)
    }
}

#[derive(Default)]
struct LaneCounters {
    admitted: AtomicU64,
    processed: AtomicU64,
    dropped: AtomicU64,
    faults: AtomicU64,
}

/// Count of admitted frames not yet processed or evicted.
#[derive(Default)]
struct InFlight {
    pending: Mutex<u64>,
    idle: Condvar,
}

impl InFlight {
    fn begin(&self) {
        *self.pending.lock() += 1;
    }

    fn finish(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.idle.wait(&mut pending);
        }
    }
}

/// Single-kind delivery pipeline from capture sources to one processor.
///
/// ```text
/// [producer threads] ──submit──▶ [bounded queue] ──▶ [lane-<label> thread] ──▶ processor
/// ```
///
/// Frames are delivered FIFO on a dedicated thread, so producers never wait
/// on processor work (except under `BackpressurePolicy::BlockProducer`).
pub struct DispatchLane {
    id: Uuid,
    label: String,
    kind: MediaKind,
    policy: BackpressurePolicy,
    sender: Mutex<Option<Sender<FrameBuffer>>>,
    // Second handle on the queue, used to evict under drop-oldest.
    evictor: Receiver<FrameBuffer>,
    counters: Arc<LaneCounters>,
    in_flight: Arc<InFlight>,
    fault_rx: Receiver<LaneFault>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DispatchLane {
    /// Spawn a lane bound to `processor`, with a queue of `capacity` frames.
    pub fn spawn(
        label: impl Into<String>,
        kind: MediaKind,
        processor: Box<dyn FrameProcessor>,
        capacity: usize,
        policy: BackpressurePolicy,
    ) -> Result<Arc<Self>, CaptureError> {
        let label = label.into();
        let (sender, receiver) = crossbeam_channel::bounded::<FrameBuffer>(capacity.max(1));
        let (fault_tx, fault_rx) = crossbeam_channel::bounded(FAULT_CHANNEL_CAPACITY);
        let counters = Arc::new(LaneCounters::default());
        let in_flight = Arc::new(InFlight::default());

        let worker = {
            let receiver = receiver.clone();
            let label = label.clone();
            let counters = Arc::clone(&counters);
            let in_flight = Arc::clone(&in_flight);
            thread::Builder::new()
                .name(format!("lane-{}", label))
                .spawn(move || {
                    delivery_loop(receiver, processor, &label, &counters, &in_flight, &fault_tx)
                })
                .map_err(|e| {
                    CaptureError::Configuration(format!("failed to spawn lane thread: {}", e))
                })?
        };

        log::debug!(
            "lane {} ({}) started: capacity {}, policy {:?}",
            label,
            kind,
            capacity.max(1),
            policy
        );

        Ok(Arc::new(Self {
            id: Uuid::new_v4(),
            label,
            kind,
            policy,
            sender: Mutex::new(Some(sender)),
            evictor: receiver,
            counters,
            in_flight,
            fault_rx,
            worker: Mutex::new(Some(worker)),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn policy(&self) -> BackpressurePolicy {
        self.policy
    }

    /// Frames currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.evictor.len()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Receiver for processor failures caught on this lane.
    pub fn faults(&self) -> Receiver<LaneFault> {
        self.fault_rx.clone()
    }

    pub fn stats(&self) -> LaneStats {
        LaneStats {
            admitted: self.counters.admitted.load(Ordering::Acquire),
            processed: self.counters.processed.load(Ordering::Acquire),
            dropped: self.counters.dropped.load(Ordering::Acquire),
            faults: self.counters.faults.load(Ordering::Acquire),
        }
    }

    /// Hand a frame to the lane, applying the backpressure policy if the
    /// queue is full.
    pub fn submit(&self, frame: FrameBuffer) -> Result<Admission, CaptureError> {
        // Clone out of the lock so a blocked producer never holds it.
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or_else(|| CaptureError::LaneClosed(self.label.clone()))?;

        // Counted up front so `processed` can never overtake `admitted`.
        self.in_flight.begin();
        self.counters.admitted.fetch_add(1, Ordering::AcqRel);
        let admission = match self.policy {
            BackpressurePolicy::BlockProducer => sender.send(frame).map(|_| Admission::Admitted).map_err(|_| ()),
            BackpressurePolicy::DropNewest => match sender.try_send(frame) {
                Ok(()) => Ok(Admission::Admitted),
                Err(TrySendError::Full(_)) => Ok(Admission::Dropped),
                Err(TrySendError::Disconnected(_)) => Err(()),
            },
            BackpressurePolicy::DropOldest => self.submit_evicting(&sender, frame),
        };

        match admission {
            Ok(Admission::Dropped) => {
                self.counters.admitted.fetch_sub(1, Ordering::AcqRel);
                self.in_flight.finish();
                self.counters.dropped.fetch_add(1, Ordering::AcqRel);
                log::trace!("lane {} full, dropped newest frame", self.label);
                Ok(Admission::Dropped)
            }
            Ok(admission) => Ok(admission),
            Err(()) => {
                self.counters.admitted.fetch_sub(1, Ordering::AcqRel);
                self.in_flight.finish();
                Err(CaptureError::LaneClosed(self.label.clone()))
            }
        }
    }

    fn submit_evicting(&self, sender: &Sender<FrameBuffer>, frame: FrameBuffer) -> Result<Admission, ()> {
        let mut frame = frame;
        let mut evicted = false;
        loop {
            match sender.try_send(frame) {
                Ok(()) => {
                    return Ok(if evicted {
                        Admission::AdmittedEvictedOldest
                    } else {
                        Admission::Admitted
                    });
                }
                Err(TrySendError::Full(returned)) => {
                    frame = returned;
                    // The worker may win the race for the oldest frame; retry either way.
                    if let Ok(oldest) = self.evictor.try_recv() {
                        log::trace!("lane {} full, evicted frame {}", self.label, oldest.sequence());
                        self.counters.dropped.fetch_add(1, Ordering::AcqRel);
                        self.in_flight.finish();
                        evicted = true;
                    }
                }
                Err(TrySendError::Disconnected(_)) => return Err(()),
            }
        }
    }

    /// Block until every admitted frame has been processed or evicted.
    pub fn drain(&self) {
        self.in_flight.wait_idle();
    }

    /// Stop admitting frames, let the processor finish everything already
    /// queued, and join the delivery thread. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() && self.worker.lock().is_none() {
            return;
        }
        drop(sender);

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                log::error!("lane {} delivery thread panicked", self.label);
            }
        }

        let stats = self.stats();
        log::debug!(
            "lane {} shut down: admitted {}, processed {}, dropped {}, faults {}",
            self.label,
            stats.admitted,
            stats.processed,
            stats.dropped,
            stats.faults
        );
    }
}

impl Drop for DispatchLane {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DispatchLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchLane")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Runs on the lane thread until every sender is gone and the queue is empty.
fn delivery_loop(
    receiver: Receiver<FrameBuffer>,
    mut processor: Box<dyn FrameProcessor>,
    label: &str,
    counters: &LaneCounters,
    in_flight: &InFlight,
    fault_tx: &Sender<LaneFault>,
) {
    let name = panic::catch_unwind(AssertUnwindSafe(|| processor.name().to_string()))
        .unwrap_or_else(|_| "processor".to_string());

    while let Ok(frame) = receiver.recv() {
        let sequence = frame.sequence();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&frame)));
        drop(frame);

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
        };

        counters.processed.fetch_add(1, Ordering::AcqRel);
        if let Some(message) = failure {
            counters.faults.fetch_add(1, Ordering::AcqRel);
            log::error!(
                "lane {}: {} failed on frame {}: {}",
                label,
                name,
                sequence,
                message
            );
            let _ = fault_tx.try_send(LaneFault {
                lane: label.to_string(),
                sequence,
                message,
            });
        }
        in_flight.finish();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
