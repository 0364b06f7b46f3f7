// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Handlers and payloads shared by the behavioural test suites.

use crate::{Handler, Message, MessageId, MessageKind};
use std::{sync::{Arc, Mutex, mpsc},
          thread::sleep,
          time::{Duration, Instant}};

/// A numbered unit of work. `gated` jobs make a [`GatedHandler`] block until released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub n: u32,
    pub gated: bool,
}

impl Job {
    pub fn new(n: u32) -> Self { Self { n, gated: false } }

    pub fn gated(n: u32) -> Self { Self { n, gated: true } }
}

impl MessageKind for Job {
    const ID: MessageId = MessageId::new("test.job");
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog { EventLog::default() }

pub fn snapshot(log: &EventLog) -> Vec<String> { log.lock().unwrap().clone() }

/// Only the `job-{n}` entries, tags included.
pub fn jobs(log: &EventLog) -> Vec<String> {
    snapshot(log).into_iter().filter(|it| it.contains("job-")).collect()
}

pub fn count(log: &EventLog, event: &str) -> usize {
    log.lock().unwrap().iter().filter(|it| *it == event).count()
}

/// Polls `condition` until it holds, failing the test after `timeout`.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < timeout, "condition not met within {timeout:?}");
        sleep(Duration::from_millis(1));
    }
}

/// Records every hook as `"{tag}:{hook}"`, and every handled job as `"{tag}:job-{n}"`
/// (bracketed by `begin`/`end` when `bracket` is set).
pub struct RecordingHandler {
    pub tag: &'static str,
    pub log: EventLog,
    pub handle_delay: Duration,
    pub succeed: bool,
    pub bracket: bool,
    pub record_updates: bool,
}

impl RecordingHandler {
    pub fn new(tag: &'static str, log: &EventLog) -> Self {
        Self {
            tag,
            log: Arc::clone(log),
            handle_delay: Duration::ZERO,
            succeed: true,
            bracket: false,
            record_updates: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.handle_delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.succeed = false;
        self
    }

    pub fn bracketed(mut self) -> Self {
        self.bracket = true;
        self
    }

    pub fn recording_updates(mut self) -> Self {
        self.record_updates = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Handler> { Box::new(self) }

    fn record(&self, event: impl AsRef<str>) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.tag, event.as_ref()));
    }
}

impl Handler for RecordingHandler {
    fn on_attach(&mut self) { self.record("on_attach"); }

    fn on_detach(&mut self) { self.record("on_detach"); }

    fn open(&mut self) { self.record("open"); }

    fn update(&mut self) {
        if self.record_updates {
            self.record("update");
        }
    }

    fn close(&mut self) { self.record("close"); }

    fn handle(&mut self, message: &Message) -> bool {
        let Some(job) = message.payload::<Job>() else {
            return true;
        };
        if self.bracket {
            self.record(format!("begin-{}", job.n));
        }
        if !self.handle_delay.is_zero() {
            sleep(self.handle_delay);
        }
        self.record(format!("job-{}", job.n));
        if self.bracket {
            self.record(format!("end-{}", job.n));
        }
        self.succeed
    }
}

/// Handles every job, but for a `gated` one it first reports the job number on
/// `entered` and then blocks until something arrives on `release`.
pub struct GatedHandler {
    pub log: EventLog,
    pub entered: mpsc::Sender<u32>,
    pub release: mpsc::Receiver<()>,
}

pub struct Gate {
    pub entered: mpsc::Receiver<u32>,
    pub release: mpsc::Sender<()>,
}

impl GatedHandler {
    pub fn new(log: &EventLog) -> (Box<dyn Handler>, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let handler = Box::new(Self {
            log: Arc::clone(log),
            entered: entered_tx,
            release: release_rx,
        });
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (handler, gate)
    }
}

impl Handler for GatedHandler {
    fn handle(&mut self, message: &Message) -> bool {
        let Some(job) = message.payload::<Job>() else {
            return true;
        };
        if job.gated {
            self.entered.send(job.n).unwrap();
            self.release.recv().unwrap();
        }
        self.log.lock().unwrap().push(format!("job-{}", job.n));
        true
    }
}
