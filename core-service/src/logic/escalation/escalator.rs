//! Escalator - debounce / threshold state machine
//!
//! ```text
//!   Normal ──Abnormal──▶ Escalating(n) ──n == threshold──▶ Alerting ─┐
//!     ▲                        │                           │  ▲        │
//!     └──────Normal label──────┴───────────────────────────┘  └─failed─┘
//!     └──────────────────delivered outcome─────────────────┘
//! ```
//!
//! A trigger is emitted once per crossing of the threshold. After a failed
//! dispatch the machine stays `Alerting` and armed: the next Abnormal label
//! re-fires at once. At most one trigger is ever in flight.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::RECENT_LABELS_CAPACITY;
use crate::logic::model::Label;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "count", rename_all = "snake_case")]
pub enum EscalationState {
    Normal,
    Escalating(u32),
    Alerting,
}

impl std::fmt::Display for EscalationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscalationState::Normal => write!(f, "NORMAL"),
            EscalationState::Escalating(n) => write!(f, "ESCALATING({})", n),
            EscalationState::Alerting => write!(f, "ALERTING"),
        }
    }
}

/// Emitted when the abnormal run crosses the threshold (or re-fires while armed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Monotonic trigger id, echoed back in `record_outcome`
    pub seq: u64,
    /// Threshold crossing this trigger belongs to; re-fires share it
    pub run: u64,
    /// Consecutive abnormal count at emission
    pub abnormal_count: u32,
    /// Re-fire after a failed or suppressed dispatch
    pub retry: bool,
}

/// What a dispatch outcome did to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeEffect {
    /// Delivered: count cleared, back to Normal
    Reset,
    /// Not delivered: stays Alerting, next Abnormal re-fires
    Armed,
    /// A Normal label reset the machine after this trigger; only the in-flight slot was freed
    Stale,
    /// No trigger with that id is in flight
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("escalation threshold must be at least 1")]
pub struct ZeroThreshold;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    seq: u64,
    epoch: u64,
}

/// Status view for logging
#[derive(Debug, Clone, Serialize)]
pub struct EscalationSnapshot {
    pub state: EscalationState,
    pub consecutive_abnormal: u32,
    pub threshold: u32,
    pub in_flight: bool,
    pub triggers_total: u64,
    pub recent_labels: Vec<Label>,
}

// ============================================================================
// ESCALATOR
// ============================================================================

#[derive(Debug)]
pub struct Escalator {
    threshold: u32,
    count: u32,
    state: EscalationState,
    in_flight: Option<InFlight>,
    /// Bumped on every Normal label; outcomes from an older epoch are stale
    epoch: u64,
    /// Bumped on every entry into `Alerting`
    run: u64,
    next_seq: u64,
    triggers_total: u64,
    recent_labels: VecDeque<Label>,
}

impl Escalator {
    pub fn new(threshold: u32) -> Result<Self, ZeroThreshold> {
        if threshold == 0 {
            return Err(ZeroThreshold);
        }
        Ok(Self {
            threshold,
            count: 0,
            state: EscalationState::Normal,
            in_flight: None,
            epoch: 0,
            run: 0,
            next_seq: 1,
            triggers_total: 0,
            recent_labels: VecDeque::with_capacity(RECENT_LABELS_CAPACITY),
        })
    }

    /// Feed one label; returns a trigger when one must be dispatched now
    pub fn update(&mut self, label: Label) -> Option<TriggerEvent> {
        if self.recent_labels.len() == RECENT_LABELS_CAPACITY {
            self.recent_labels.pop_front();
        }
        self.recent_labels.push_back(label);

        match label {
            Label::Normal => {
                if self.count > 0 {
                    log::debug!("Abnormal run of {} ended", self.count);
                }
                self.count = 0;
                self.state = EscalationState::Normal;
                self.epoch += 1;
                None
            }
            Label::Abnormal => {
                self.count = self.count.saturating_add(1);

                match self.state {
                    EscalationState::Alerting => {
                        if self.in_flight.is_none() {
                            Some(self.fire(true))
                        } else {
                            None
                        }
                    }
                    _ if self.count >= self.threshold => {
                        self.state = EscalationState::Alerting;
                        self.run += 1;
                        if self.in_flight.is_none() {
                            Some(self.fire(false))
                        } else {
                            // An older trigger is still being handled; its outcome re-arms us
                            log::debug!("Threshold crossed while a trigger is in flight");
                            None
                        }
                    }
                    _ => {
                        self.state = EscalationState::Escalating(self.count);
                        None
                    }
                }
            }
        }
    }

    fn fire(&mut self, retry: bool) -> TriggerEvent {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.triggers_total += 1;
        self.in_flight = Some(InFlight { seq, epoch: self.epoch });

        TriggerEvent {
            seq,
            run: self.run,
            abnormal_count: self.count,
            retry,
        }
    }

    /// Apply the dispatch outcome of trigger `seq`
    pub fn record_outcome(&mut self, seq: u64, delivered: bool) -> OutcomeEffect {
        let flight = match self.in_flight {
            Some(f) if f.seq == seq => f,
            _ => {
                log::warn!("Ignoring outcome for unknown trigger #{}", seq);
                return OutcomeEffect::Unknown;
            }
        };
        self.in_flight = None;

        if flight.epoch != self.epoch {
            return OutcomeEffect::Stale;
        }

        if delivered {
            self.count = 0;
            self.state = EscalationState::Normal;
            OutcomeEffect::Reset
        } else {
            OutcomeEffect::Armed
        }
    }

    pub fn state(&self) -> EscalationState {
        self.state
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn triggers_total(&self) -> u64 {
        self.triggers_total
    }

    pub fn recent_labels(&self) -> impl Iterator<Item = &Label> {
        self.recent_labels.iter()
    }

    pub fn snapshot(&self) -> EscalationSnapshot {
        EscalationSnapshot {
            state: self.state,
            consecutive_abnormal: self.count,
            threshold: self.threshold,
            in_flight: self.in_flight.is_some(),
            triggers_total: self.triggers_total,
            recent_labels: self.recent_labels.iter().copied().collect(),
        }
    }
}
