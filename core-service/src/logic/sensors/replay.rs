//! Replay Source - recorded JSON-lines session
//!
//! One reading per line; blank lines are skipped. A malformed line is
//! reported once and then skipped on the next call.

use std::path::Path;

use async_trait::async_trait;

use super::{RawReading, ReadingSource};
use crate::logic::errors::SensorReadError;
use crate::logic::features::Reading;

pub struct ReplaySource {
    name: String,
    lines: Vec<String>,
    position: usize,
    looping: bool,
}

impl ReplaySource {
    pub fn open(path: &Path, looping: bool) -> Result<Self, SensorReadError> {
        let text = std::fs::read_to_string(path)?;
        let mut source = Self::from_text(&text, looping);
        source.name = path.display().to_string();
        Ok(source)
    }

    pub fn from_text(text: &str, looping: bool) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        log::info!("Replay source loaded {} readings", lines.len());

        Self {
            name: "replay".to_string(),
            lines,
            position: 0,
            looping,
        }
    }

    pub fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.position)
    }
}

#[async_trait]
impl ReadingSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sample(&mut self) -> Result<Reading, SensorReadError> {
        if self.position >= self.lines.len() {
            if self.looping && !self.lines.is_empty() {
                self.position = 0;
            } else {
                return Err(SensorReadError::Exhausted);
            }
        }

        let line = &self.lines[self.position];
        self.position += 1;
        RawReading::parse(line)
    }
}
