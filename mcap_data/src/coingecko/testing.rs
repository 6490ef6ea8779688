//! In-memory stand-ins for the upstream API, shared with the loader crates through the
//! `testing` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{StatusCode, Url};

use mcap_util::ManualClock;

use super::DEFAULT_BASE_URL;
use super::transport::{RawResponse, Transport};

/// Replays canned responses in order and records every requested URL.
///
/// Once the script runs out every request gets a 503.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    requests: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<(u16, &str)>) -> Arc<ScriptedTransport> {
        let responses = responses.into_iter()
            .map(|(status, body)| RawResponse::new(
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body.as_bytes().to_vec()))
            .collect();

        Arc::new(ScriptedTransport {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Url> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: Url) -> Result<RawResponse, reqwest::Error> {
        lock(&self.requests).push(url);
        let next = lock(&self.responses).pop_front()
            .unwrap_or_else(|| RawResponse::new(StatusCode::SERVICE_UNAVAILABLE, "no scripted response left"));
        Ok(next)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.ymd(2024, 3, 1).and_hms(0, 0, 0)))
}

pub fn base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).unwrap_or_else(|e| panic!("bad default base url: {}", e))
}
