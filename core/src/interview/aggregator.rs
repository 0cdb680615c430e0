//! 转写与教练提示的聚合状态。
//!
//! 只持有状态、不做任何 I/O；由传输适配器写入，由控制器与界面读取。

use std::collections::VecDeque;

use super::phase::ParticipantRole;
use super::types::{CoachSuggestion, LatestExchange, TranscriptEntry};

/// 提示列表保留的最大条数，更早的提示直接丢弃。
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Default, Clone)]
pub struct TranscriptAggregator {
    transcript: Vec<TranscriptEntry>,
    suggestions: VecDeque<CoachSuggestion>,
    /// 会话代数。传输适配器按创建时的代数写入，代数推进后旧房间的写入一律丢弃。
    generation: u64,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_transcript(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }

    /// 新提示插入队首；超出上限时从队尾裁剪。
    pub fn push_suggestion(&mut self, suggestion: CoachSuggestion) {
        self.suggestions.push_front(suggestion);
        self.suggestions.truncate(MAX_SUGGESTIONS);
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn suggestions(&self) -> Vec<CoachSuggestion> {
        self.suggestions.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    /// 从最新记录向前查找双方各自最近的一条发言。
    pub fn latest_exchange(&self) -> Option<LatestExchange> {
        let mut interviewer = None;
        let mut candidate = None;

        for entry in self.transcript.iter().rev() {
            match entry.speaker {
                ParticipantRole::Interviewer if interviewer.is_none() => interviewer = Some(entry),
                ParticipantRole::Candidate if candidate.is_none() => candidate = Some(entry),
                _ => {}
            }

            if interviewer.is_some() && candidate.is_some() {
                break;
            }
        }

        Some(LatestExchange {
            interviewer: interviewer?.clone(),
            candidate: candidate?.clone(),
        })
    }

    pub fn full_transcript_text(&self) -> String {
        self.transcript
            .iter()
            .map(|entry| format!("{}: {}", entry.speaker.as_str(), entry.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
        self.suggestions.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 使此前发放的代数全部失效，返回新的代数。
    pub fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn accepts(&self, generation: u64) -> bool {
        self.generation == generation
    }
}
