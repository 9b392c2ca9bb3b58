//! Shared fakes for monitor integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use fundwatch_core::{
    ChannelConfig, Credentials, MonitorConfig, Signal, Timing, VenueConfig, VenueKind,
};
use fundwatch_events::{DeliveryError, Notifier};
use fundwatch_sources::{SignalSource, SourceError};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// What a [`ScriptedSource`] does on one fetch.
#[derive(Debug, Clone)]
pub enum Step {
    /// `(pair, price, rate)` triples, tagged with the source's venue.
    Rates(Vec<(&'static str, f64, f64)>),
    /// Signals tagged with an arbitrary venue name.
    Tagged(&'static str, Vec<(&'static str, f64, f64)>),
    Fail(&'static str),
    Panic,
}

/// Source that replays a script, repeating the last step forever.
pub struct ScriptedSource {
    venue: VenueKind,
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    cancel_on_fetch: Option<CancellationToken>,
}

impl ScriptedSource {
    pub fn new(venue: VenueKind, steps: Vec<Step>) -> Self {
        Self {
            venue,
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
            cancel_on_fetch: None,
        }
    }

    pub fn constant(venue: VenueKind, rates: Vec<(&'static str, f64, f64)>) -> Self {
        Self::new(venue, vec![Step::Rates(rates)])
    }

    /// Cancel `token` while a fetch is in flight, then finish it normally.
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_fetch = Some(token);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap_or(Step::Rates(Vec::new()))
        }
    }
}

fn build(venue: &str, rates: Vec<(&'static str, f64, f64)>) -> Vec<Signal> {
    rates
        .into_iter()
        .map(|(pair, price, rate)| {
            let symbol = pair.trim_end_matches("USDT");
            Signal::new(venue, symbol, pair, price, rate, Utc::now())
        })
        .collect()
}

#[async_trait]
impl SignalSource for ScriptedSource {
    fn venue(&self) -> VenueKind {
        self.venue
    }

    async fn fetch_signals(&self, _credentials: &Credentials) -> Result<Vec<Signal>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }

        match self.next_step() {
            Step::Rates(rates) => Ok(build(self.venue.name(), rates)),
            Step::Tagged(venue, rates) => Ok(build(venue, rates)),
            Step::Fail(message) => Err(SourceError::Api {
                venue: self.venue,
                code: -1,
                message: message.to_string(),
            }),
            Step::Panic => panic!("scripted source panic"),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Notifier that records `"<channel>:<venue>:<pair>"` for every send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        signal: &Signal,
        channel_id: &str,
        _action_url: Option<&str>,
    ) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push(format!("{channel_id}:{}:{}", signal.venue, signal.pair));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// A valid config for the given venues: one channel, no cooldown, no pacing.
pub fn config_for(venues: &[VenueKind]) -> MonitorConfig {
    MonitorConfig {
        venues: venues
            .iter()
            .map(|&venue| {
                VenueConfig::enabled(venue, Credentials::new("key", Some("secret".into())), -0.1)
            })
            .collect(),
        channels: vec![ChannelConfig::enabled("-1001")],
        bot_token: Some("123:abc".into()),
        action_url: None,
        timing: Timing {
            cooldown_hours: 0,
            pacing_millis: 0,
            ..Timing::default()
        },
    }
}

pub fn as_source(source: &Arc<ScriptedSource>) -> Arc<dyn SignalSource> {
    Arc::clone(source) as Arc<dyn SignalSource>
}
