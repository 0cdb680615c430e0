use serde::Serialize;
use tracing::{info, warn};

pub(crate) const TARGET: &str = "telemetry::interview";
pub(crate) const EVENT_PHASE: &str = "interview_phase_transition";
pub(crate) const EVENT_DATA_DROPPED: &str = "interview_data_dropped";
pub(crate) const EVENT_ANALYTICS: &str = "interview_analytics";
pub(crate) const EVENT_COACHING: &str = "interview_coaching_fetch";
pub(crate) const EVENT_TEARDOWN: &str = "interview_transport_teardown";

#[derive(Debug, Serialize)]
pub struct PhaseTransitionEvent<'a> {
    pub from: &'static str,
    pub to: &'static str,
    pub role: Option<&'static str>,
    pub reason: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct DataDroppedEvent<'a> {
    pub payload_bytes: usize,
    pub error: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsOutcomeEvent<'a> {
    pub candidate_id: Option<&'a str>,
    pub status: &'static str,
    pub transcript_lines: usize,
    pub detail: Option<&'a str>,
}

pub fn record_phase_transition(
    from: &'static str,
    to: &'static str,
    role: Option<&'static str>,
    reason: Option<&str>,
) {
    let event = PhaseTransitionEvent {
        from,
        to,
        role,
        reason,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_PHASE,
            from = event.from,
            to = event.to,
            role = event.role.unwrap_or("none"),
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_PHASE,
            %err,
            "failed to encode phase transition event"
        ),
    }
}

pub fn record_data_event_dropped(payload_bytes: usize, error: &str) {
    let event = DataDroppedEvent {
        payload_bytes,
        error,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_DATA_DROPPED,
            payload_bytes = event.payload_bytes,
            payload = %payload,
            "dropping malformed data channel payload"
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_DATA_DROPPED,
            %err,
            "failed to encode data dropped event"
        ),
    }
}

pub fn record_analytics_outcome(
    candidate_id: Option<&str>,
    status: &'static str,
    transcript_lines: usize,
    detail: Option<&str>,
) {
    let event = AnalyticsOutcomeEvent {
        candidate_id,
        status,
        transcript_lines,
        detail,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_ANALYTICS,
            status = event.status,
            transcript_lines = event.transcript_lines,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_ANALYTICS,
            %err,
            "failed to encode analytics outcome event"
        ),
    }
}

pub fn record_coaching_fetch(outcome: &'static str, detail: Option<&str>) {
    info!(
        target: TARGET,
        event = EVENT_COACHING,
        outcome,
        detail = detail.unwrap_or(""),
    );
}

pub fn record_transport_teardown(released_tracks: usize, had_room: bool) {
    info!(
        target: TARGET,
        event = EVENT_TEARDOWN,
        released_tracks,
        had_room,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_event_serializes_reason() {
        let event = PhaseTransitionEvent {
            from: "connecting",
            to: "role_select",
            role: Some("candidate"),
            reason: Some("token rejected"),
        };
        let encoded = serde_json::to_value(&event).expect("encode");
        assert_eq!(encoded["from"], "connecting");
        assert_eq!(encoded["reason"], "token rejected");
    }

    #[test]
    fn analytics_event_allows_missing_candidate() {
        let event = AnalyticsOutcomeEvent {
            candidate_id: None,
            status: "skipped",
            transcript_lines: 0,
            detail: Some("empty transcript"),
        };
        let encoded = serde_json::to_value(&event).expect("encode");
        assert!(encoded["candidate_id"].is_null());
        assert_eq!(encoded["transcript_lines"], 0);
    }
}
