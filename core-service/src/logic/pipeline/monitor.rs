//! Monitor loop
//!
//! Samples on a fixed cadence, classifies and feeds the Escalator. Trigger
//! handling runs on a separate worker behind a queue of one, so a slow
//! validator or collector never delays sampling. Resolutions come back on
//! a channel and are applied at the start of the next cycle.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::handler::{TriggerHandler, TriggerJob, TriggerResolution};
use crate::logic::escalation::{EscalationSnapshot, Escalator, OutcomeEffect, TriggerEvent};
use crate::logic::features::Reading;
use crate::logic::model::{ClassificationResult, Classifier};
use crate::logic::sensors::ReadingSource;

/// What one cycle did
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Sensor or classifier error; no state changed
    Skipped { reason: String },
    Completed {
        reading: Reading,
        classification: ClassificationResult,
        trigger: Option<TriggerEvent>,
        snapshot: EscalationSnapshot,
    },
}

impl CycleOutcome {
    pub fn trigger(&self) -> Option<TriggerEvent> {
        match self {
            CycleOutcome::Completed { trigger, .. } => *trigger,
            CycleOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CycleOutcome::Skipped { .. })
    }
}

pub struct Monitor {
    source: Box<dyn ReadingSource>,
    classifier: Arc<dyn Classifier>,
    escalator: Escalator,
    jobs: mpsc::Sender<TriggerJob>,
    resolutions: mpsc::UnboundedReceiver<TriggerResolution>,
    worker: JoinHandle<()>,
    cycles: u64,
}

impl Monitor {
    /// Build the monitor and start its trigger worker (needs a tokio runtime)
    pub fn spawn(
        source: Box<dyn ReadingSource>,
        classifier: Arc<dyn Classifier>,
        escalator: Escalator,
        handler: TriggerHandler,
    ) -> Self {
        let (jobs, mut job_rx) = mpsc::channel::<TriggerJob>(1);
        let (resolution_tx, resolutions) = mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            while let Some(job) = job_rx.recv().await {
                let resolution = handler.handle(&job).await;
                if resolution_tx.send(resolution).is_err() {
                    break;
                }
            }
            log::debug!("Trigger worker stopped");
        });

        Self {
            source,
            classifier,
            escalator,
            jobs,
            resolutions,
            worker,
            cycles: 0,
        }
    }

    pub fn escalator(&self) -> &Escalator {
        &self.escalator
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn apply(&mut self, resolution: TriggerResolution) -> OutcomeEffect {
        let effect = self
            .escalator
            .record_outcome(resolution.seq, resolution.outcome.delivered);

        match effect {
            OutcomeEffect::Reset => {
                log::info!("Alert #{} delivered; abnormal counter reset", resolution.seq)
            }
            OutcomeEffect::Armed => log::warn!(
                "Alert #{} not delivered ({}); trigger stays armed",
                resolution.seq,
                resolution.outcome.error.as_deref().unwrap_or("unknown")
            ),
            OutcomeEffect::Stale => log::info!(
                "Alert #{} resolved after the abnormal run ended",
                resolution.seq
            ),
            OutcomeEffect::Unknown => {}
        }
        effect
    }

    /// Wait for the in-flight trigger (if any) to resolve and apply it
    pub async fn settle(&mut self) -> Option<OutcomeEffect> {
        if !self.escalator.is_in_flight() {
            return None;
        }
        let resolution = self.resolutions.recv().await?;
        Some(self.apply(resolution))
    }

    /// One sample → classify → escalate step
    pub async fn cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;

        while let Ok(resolution) = self.resolutions.try_recv() {
            self.apply(resolution);
        }

        let reading = match self.source.sample().await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("[SensorReadError] {}: {}", self.source.name(), e);
                return CycleOutcome::Skipped { reason: e.to_string() };
            }
        };

        let classification = match self.classifier.classify(&reading.features()) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("[ClassificationError] {}", e);
                return CycleOutcome::Skipped { reason: e.to_string() };
            }
        };

        let trigger = self.escalator.update(classification.label);

        if let Some(t) = trigger {
            let job = TriggerJob { trigger: t, reading };
            if let Err(e) = self.jobs.try_send(job) {
                // Worker gone or queue full: resolve as undelivered so the trigger re-arms
                log::error!("Cannot queue trigger #{}: {}", t.seq, e);
                self.escalator.record_outcome(t.seq, false);
            }
        }

        let snapshot = self.escalator.snapshot();
        self.log_status(&reading, &classification, &snapshot);

        CycleOutcome::Completed {
            reading,
            classification,
            trigger,
            snapshot,
        }
    }

    fn log_status(&self, reading: &Reading, result: &ClassificationResult, snapshot: &EscalationSnapshot) {
        log::info!(
            "Status: {} (score: {:.4}) - Abnormal count: {}/{} [{}] - Temp: {:.1}°C, Humidity: {:.1}%, Pressure: {:.1}hPa",
            result.label,
            result.abnormal_score,
            snapshot.consecutive_abnormal,
            snapshot.threshold,
            snapshot.state,
            reading.temperature,
            reading.humidity,
            reading.pressure
        );

        if log::log_enabled!(log::Level::Debug) {
            let record = json!({
                "timestamp": reading.timestamp,
                "status": result.label,
                "confidence": result.abnormal_score,
                "sensor_data": reading,
                "inference_time_ms": result.latency_us as f64 / 1000.0,
                "abnormal_count": snapshot.consecutive_abnormal,
                "escalation": snapshot,
            });
            log::debug!("{}", record);
        }
    }

    /// Run until `stop` flips to true (or its sender is dropped), then join the worker
    pub async fn run(mut self, interval: Duration, mut stop: watch::Receiver<bool>) {
        log::info!(
            "Monitor loop started (every {} ms, threshold {})",
            interval.as_millis(),
            self.escalator.threshold()
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.changed() => break,
            }
            if *stop.borrow() {
                break;
            }
            self.cycle().await;
        }

        self.shutdown().await;
    }

    /// Close the queue, wait for the worker and apply what it finished
    pub async fn shutdown(mut self) {
        log::info!("Monitor stopping after {} cycles", self.cycles);

        let (closed, _) = mpsc::channel(1);
        drop(std::mem::replace(&mut self.jobs, closed));

        if let Err(e) = (&mut self.worker).await {
            log::error!("Trigger worker ended abnormally: {}", e);
        }

        while let Ok(resolution) = self.resolutions.try_recv() {
            self.apply(resolution);
        }
    }
}
