//! Trigger handling: capture → cascade → notify + send

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::logic::capture::{capture_or_absent, CaptureProvider};
use crate::logic::dispatch::{AlertPayload, DispatchOutcome, Dispatcher};
use crate::logic::escalation::TriggerEvent;
use crate::logic::features::Reading;
use crate::logic::validation::{CascadeReport, ValidationCascade};

/// One queued trigger with the reading that completed the run
#[derive(Debug, Clone)]
pub struct TriggerJob {
    pub trigger: TriggerEvent,
    pub reading: Reading,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerResolution {
    pub seq: u64,
    pub report: CascadeReport,
    /// A voice call was placed while handling this trigger
    pub notified: bool,
    /// Cascade did not confirm; nothing was sent
    pub suppressed: bool,
    pub outcome: DispatchOutcome,
}

impl TriggerResolution {
    pub fn delivered(&self) -> bool {
        self.outcome.delivered
    }
}

pub struct TriggerHandler {
    capture: Arc<dyn CaptureProvider>,
    cascade: Arc<ValidationCascade>,
    dispatcher: Dispatcher,
    /// Last run a voice call went out for; re-fires of that run only resend
    notified_run: Mutex<Option<u64>>,
}

impl TriggerHandler {
    pub fn new(
        capture: Arc<dyn CaptureProvider>,
        cascade: Arc<ValidationCascade>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            capture,
            cascade,
            dispatcher,
            notified_run: Mutex::new(None),
        }
    }

    pub async fn handle(&self, job: &TriggerJob) -> TriggerResolution {
        let trigger = job.trigger;
        log::warn!(
            "ALERT! {} consecutive abnormal readings detected (trigger #{}{})",
            trigger.abnormal_count,
            trigger.seq,
            if trigger.retry { ", retry" } else { "" }
        );

        let capture = capture_or_absent(self.capture.as_ref()).await;
        let report = self.cascade.run(&capture).await;
        log::info!("Validation: {}", report.summary());

        if !report.should_escalate() {
            // Not delivered: the Escalator stays armed and the next abnormal reading retries
            log::info!("No fire confirmed ({}), skipping alert", report.decision);
            let outcome = DispatchOutcome::failed(format!("suppressed: cascade decision {}", report.decision));
            return TriggerResolution {
                seq: trigger.seq,
                report,
                notified: false,
                suppressed: true,
                outcome,
            };
        }

        let notified = if *self.notified_run.lock() == Some(trigger.run) {
            log::info!("Voice alert already placed for run #{}, resending only", trigger.run);
            false
        } else {
            let placed = self.dispatcher.notify().await;
            if placed {
                *self.notified_run.lock() = Some(trigger.run);
            }
            placed
        };

        let payload = AlertPayload::build(trigger.abnormal_count, &job.reading, &report, &capture);
        if payload.image.is_some() {
            log::info!("Image included in alert data");
        } else {
            log::warn!("No image available to include in alert");
        }
        let outcome = self.dispatcher.send(&payload).await;

        TriggerResolution {
            seq: trigger.seq,
            report,
            notified,
            suppressed: false,
            outcome,
        }
    }
}
