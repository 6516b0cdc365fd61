use serde::Serialize;

/// Structured trace events emitted across the driver and the transcript tool.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ConnectionAccepted {
        peer: String,
    },
    FrameReceived {
        bytes: usize,
    },
    FrameSent {
        bytes: usize,
    },
    TurnCompleted {
        prompt_chars: usize,
        reply_chars: usize,
        forced: bool,
        duration_ms: u64,
    },
    SnapshotSaved {
        path: String,
        bytes: usize,
    },
    SnapshotLoaded {
        path: String,
        bytes: usize,
    },
    SnapshotLoadFailed {
        path: String,
        reason: String,
    },
    ProfileSaved {
        path: String,
        bytes: usize,
    },
    ProfileLoaded {
        path: String,
    },
    BangHeaderApplied {
        load_state: bool,
        load_profile: bool,
        post_save: bool,
    },
    CommandDispatched {
        command: String,
    },
    GenerationError {
        reason: String,
    },
    TranscriptAppend {
        turn_id: u64,
        role: String,
    },
    TurnCounterAdvanced {
        from: u64,
        to: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "kvd_event");
    }
}
