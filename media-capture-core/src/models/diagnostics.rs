use serde::Serialize;

/// Counters for one dispatch lane.
///
/// `admitted` counts frames accepted into the queue; every admitted frame
/// ends up in exactly one of `processed` or `dropped` (evicted by the
/// drop-oldest policy). Frames refused by drop-newest are counted in
/// `dropped` without being admitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LaneStats {
    pub admitted: u64,
    pub processed: u64,
    pub dropped: u64,
    pub faults: u64,
}

/// Routing counters for a capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionDiagnostics {
    pub video_frames_routed: u64,
    pub audio_frames_routed: u64,
    /// Frames whose media kind had no attached output, or that arrived
    /// after admission was closed.
    pub unrouted_frames: u64,
}
