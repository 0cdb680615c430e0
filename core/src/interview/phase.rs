//! 面试会话阶段状态机与阶段广播负载定义。

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 会话状态机的阶段划分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    RoleSelect,
    Connecting,
    Active,
    Ended,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::RoleSelect => "role_select",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Active => "active",
            SessionPhase::Ended => "ended",
        }
    }

    /// 判断 `self -> next` 是否为允许的迁移边。
    ///
    /// 允许的边：`RoleSelect -> Connecting -> Active -> Ended -> RoleSelect`，
    /// 以及连接失败时的 `Connecting -> RoleSelect` 和中止时的 `Connecting -> Ended`。
    pub fn can_transition_to(&self, next: SessionPhase) -> bool {
        matches!(
            (self, next),
            (SessionPhase::RoleSelect, SessionPhase::Connecting)
                | (SessionPhase::Connecting, SessionPhase::Active)
                | (SessionPhase::Connecting, SessionPhase::RoleSelect)
                | (SessionPhase::Connecting, SessionPhase::Ended)
                | (SessionPhase::Active, SessionPhase::Ended)
                | (SessionPhase::Ended, SessionPhase::RoleSelect)
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 参与者角色，在 `RoleSelect -> Connecting` 时确定，会话内不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Interviewer,
    Candidate,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Interviewer => "interviewer",
            ParticipantRole::Candidate => "candidate",
        }
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阶段变更事件。
#[derive(Debug, Clone)]
pub struct PhaseUpdate {
    pub from: SessionPhase,
    pub phase: SessionPhase,
    pub role: Option<ParticipantRole>,
    pub issued_at: SystemTime,
    pub reason: Option<String>,
}

impl PhaseUpdate {
    pub fn new(from: SessionPhase, phase: SessionPhase, role: Option<ParticipantRole>) -> Self {
        Self {
            from,
            phase,
            role,
            issued_at: SystemTime::now(),
            reason: None,
        }
    }

    /// 附带迁移原因，例如连接失败的错误信息。
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SessionPhase; 4] = [
        SessionPhase::RoleSelect,
        SessionPhase::Connecting,
        SessionPhase::Active,
        SessionPhase::Ended,
    ];

    #[test]
    fn only_documented_edges_are_allowed() {
        let allowed = [
            (SessionPhase::RoleSelect, SessionPhase::Connecting),
            (SessionPhase::Connecting, SessionPhase::Active),
            (SessionPhase::Connecting, SessionPhase::RoleSelect),
            (SessionPhase::Connecting, SessionPhase::Ended),
            (SessionPhase::Active, SessionPhase::Ended),
            (SessionPhase::Ended, SessionPhase::RoleSelect),
        ];

        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn active_cannot_fall_back_to_role_select() {
        assert!(!SessionPhase::Active.can_transition_to(SessionPhase::RoleSelect));
        assert!(!SessionPhase::Ended.can_transition_to(SessionPhase::Active));
    }

    #[test]
    fn role_serializes_lowercase() {
        let encoded = serde_json::to_string(&ParticipantRole::Interviewer).expect("encode");
        assert_eq!(encoded, "\"interviewer\"");
        let decoded: ParticipantRole = serde_json::from_str("\"candidate\"").expect("decode");
        assert_eq!(decoded, ParticipantRole::Candidate);
    }

    #[test]
    fn update_helper_sets_reason() {
        let update = PhaseUpdate::new(
            SessionPhase::Connecting,
            SessionPhase::RoleSelect,
            Some(ParticipantRole::Candidate),
        )
        .with_reason("token rejected");

        assert_eq!(update.phase, SessionPhase::RoleSelect);
        assert_eq!(update.reason.as_deref(), Some("token rejected"));
    }
}
