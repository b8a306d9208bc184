use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::frame::Frame;

use super::Gateway;

enum Canned {
    Rows(Frame),
    Fail(String),
}

/// Gateway answering from canned frames keyed by exact SQL text.
///
/// SQL that was never registered fails like an unknown relation would.
#[derive(Default)]
pub struct MemoryGateway {
    answers: HashMap<String, Canned>,
    seen: Mutex<Vec<String>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, sql: &str, frame: Frame) -> Self {
        self.answers.insert(sql.trim().to_string(), Canned::Rows(frame));
        self
    }

    pub fn with_failure(mut self, sql: &str, reason: &str) -> Self {
        self.answers.insert(sql.trim().to_string(), Canned::Fail(reason.to_string()));
        self
    }

    /// SQL received so far, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn query(&self, sql: &str) -> Result<Frame, FetchError> {
        let key = sql.trim();
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(key.to_string());
        }
        match self.answers.get(key) {
            Some(Canned::Rows(frame)) => Ok(frame.clone()),
            Some(Canned::Fail(reason)) => Err(FetchError::execute(reason.clone())),
            None => Err(FetchError::execute(format!("no canned answer for `{}`", key))),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
