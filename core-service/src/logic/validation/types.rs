use serde::{Deserialize, Serialize};

// ============================================================================
// VERDICTS
// ============================================================================

/// Aggregate (and per-stage) verdict without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Fire,
    NoFire,
    Unavailable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Fire => "fire",
            Verdict::NoFire => "no_fire",
            Verdict::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage produced no verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UnavailableReason {
    Disabled,
    NoImage,
    Error(String),
    /// Validator answered, but not with a clear YES or NO
    Unparseable(String),
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::Disabled => write!(f, "disabled"),
            UnavailableReason::NoImage => write!(f, "no image"),
            UnavailableReason::Error(e) => write!(f, "error: {}", e),
            UnavailableReason::Unparseable(raw) => write!(f, "unparseable answer: {:?}", raw),
        }
    }
}

/// One stage's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum StageVerdict {
    Fire { confidence: f64 },
    NoFire { confidence: f64 },
    Unavailable { reason: UnavailableReason },
}

impl StageVerdict {
    pub fn unavailable(reason: UnavailableReason) -> Self {
        StageVerdict::Unavailable { reason }
    }

    pub fn verdict(&self) -> Verdict {
        match self {
            StageVerdict::Fire { .. } => Verdict::Fire,
            StageVerdict::NoFire { .. } => Verdict::NoFire,
            StageVerdict::Unavailable { .. } => Verdict::Unavailable,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            StageVerdict::Fire { confidence } | StageVerdict::NoFire { confidence } => Some(*confidence),
            StageVerdict::Unavailable { .. } => None,
        }
    }
}

/// Edge stages run locally; external stages call out over the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Edge,
    External,
}

// ============================================================================
// POLICY & REPORT
// ============================================================================

/// What to do when no stage could produce a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicy {
    /// Escalate anyway (a missed fire costs more than a false call)
    Open,
    /// Suppress escalation
    Closed,
}

impl Default for FailPolicy {
    fn default() -> Self {
        FailPolicy::Open
    }
}

impl FailPolicy {
    pub fn from_flag(fail_open: bool) -> Self {
        if fail_open {
            FailPolicy::Open
        } else {
            FailPolicy::Closed
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: String,
    pub kind: StageKind,
    #[serde(flatten)]
    pub verdict: StageVerdict,
    pub elapsed_ms: u64,
}

/// Full cascade result, stages in evaluation order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeReport {
    pub stages: Vec<StageOutcome>,
    /// Aggregate before the fail policy
    pub raw: Verdict,
    /// Aggregate after the fail policy; `Fire` means escalate
    pub decision: Verdict,
    pub fail_open_applied: bool,
    /// Highest confidence among Fire stages, 0.0 if none
    pub fire_confidence: f64,
}

impl CascadeReport {
    pub fn should_escalate(&self) -> bool {
        self.decision == Verdict::Fire
    }

    /// A stage actually saw fire (not just fail-open)
    pub fn fire_detected(&self) -> bool {
        self.raw == Verdict::Fire
    }

    pub fn summary(&self) -> String {
        let stages = self
            .stages
            .iter()
            .map(|s| format!("{}={}", s.stage, s.verdict.verdict()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "raw={} decision={}{} [{}]",
            self.raw,
            self.decision,
            if self.fail_open_applied { " (fail-open)" } else { "" },
            stages
        )
    }
}
