// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Ordering, exclusivity, waiting, and cancellation as seen through an [`AsyncPort`].

use super::super::*;
use crate::{CancelOutcome, Handler, Message,
            test_fixtures::{GatedHandler, Job, RecordingHandler, jobs, new_log, snapshot}};
use pretty_assertions::assert_eq;
use std::{sync::{Arc, Mutex,
                 atomic::{AtomicBool, Ordering}},
          thread::{self, sleep},
          time::{Duration, Instant}};

fn open_port_with(handlers: Vec<Box<dyn Handler>>) -> AsyncPort {
    let port = AsyncPort::with_config(PortConfig::new("delivery-test"));
    for handler in handlers {
        port.attach_handler(handler).unwrap();
    }
    port.open().unwrap();
    port
}

#[test]
fn test_fifo_across_externally_ordered_producers() {
    let log = new_log();
    let port = Arc::new(open_port_with(vec![
        RecordingHandler::new("h", &log).boxed(),
    ]));

    let mut last = None;
    for n in 1..=3 {
        // Each send happens on its own thread, joined before the next one starts.
        let message = Message::shared(Job::new(n));
        let producer = {
            let port = Arc::clone(&port);
            let message = Arc::clone(&message);
            thread::spawn(move || port.send(&message))
        };
        producer.join().unwrap().unwrap();
        last = Some(message);
    }
    port.wait_for_message(&last.unwrap()).unwrap();

    assert_eq!(jobs(&log), vec!["h:job-1", "h:job-2", "h:job-3"]);
    port.close().unwrap();
}

#[test]
fn test_handlers_see_each_message_in_attachment_order() {
    let log = new_log();
    let port = open_port_with(vec![
        RecordingHandler::new("h1", &log)
            .bracketed()
            .with_delay(Duration::from_millis(10))
            .boxed(),
        RecordingHandler::new("h2", &log).bracketed().boxed(),
    ]);

    for n in 1..=2 {
        port.send_and_wait(&Message::shared(Job::new(n))).unwrap();
    }
    port.close().unwrap();

    let dispatch: Vec<_> = snapshot(&log)
        .into_iter()
        .filter(|it| it.contains("begin") || it.contains("end"))
        .collect();
    assert_eq!(
        dispatch,
        vec![
            "h1:begin-1",
            "h1:end-1",
            "h2:begin-1",
            "h2:end-1",
            "h1:begin-2",
            "h1:end-2",
            "h2:begin-2",
            "h2:end-2"
        ]
    );
}

/// Keeps a plain (non-atomic) counter and flags any overlapping `handle()` call.
struct Counter {
    count: usize,
    in_handle: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
    published: Arc<Mutex<Option<usize>>>,
}

impl Handler for Counter {
    fn close(&mut self) { *self.published.lock().unwrap() = Some(self.count); }

    fn handle(&mut self, _message: &Message) -> bool {
        if self.in_handle.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        let read = self.count;
        thread::yield_now();
        self.count = read + 1;
        self.in_handle.store(false, Ordering::SeqCst);
        true
    }
}

#[test]
fn test_no_concurrent_handle_calls_on_one_handler() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 100;

    let overlapped = Arc::new(AtomicBool::new(false));
    let published = Arc::new(Mutex::new(None));
    let counter: Box<dyn Handler> = Box::new(Counter {
        count: 0,
        in_handle: Arc::new(AtomicBool::new(false)),
        overlapped: Arc::clone(&overlapped),
        published: Arc::clone(&published),
    });
    let port = Arc::new(open_port_with(vec![counter]));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let port = Arc::clone(&port);
            thread::spawn(move || {
                let messages: Vec<_> = (0..PER_PRODUCER)
                    .map(|n| Message::shared(Job::new(n as u32)))
                    .collect();
                for message in &messages {
                    port.send(message).unwrap();
                }
                for message in &messages {
                    port.wait_for_message(message).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    port.close().unwrap();

    assert!(!overlapped.load(Ordering::SeqCst));
    assert_eq!(*published.lock().unwrap(), Some(PRODUCERS * PER_PRODUCER));
}

#[test]
fn test_wait_for_message_returns_only_once_handled() {
    let log = new_log();
    let port = open_port_with(vec![
        RecordingHandler::new("slow", &log)
            .with_delay(Duration::from_millis(50))
            .boxed(),
    ]);

    let message = Message::shared(Job::new(1));
    let start = Instant::now();
    port.send(&message).unwrap();
    assert!(!message.is_handled());

    port.wait_for_message(&message).unwrap();
    let elapsed = start.elapsed();

    assert!(message.is_handled());
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    port.close().unwrap();
}

#[test]
fn test_send_and_wait_reports_handling_failures() {
    let log = new_log();
    let port = open_port_with(vec![
        RecordingHandler::new("bad", &log).failing().boxed(),
        RecordingHandler::new("good", &log).boxed(),
    ]);

    let message = Message::shared(Job::new(1));
    port.send_and_wait(&message).unwrap();

    assert!(message.is_handled());
    assert_eq!(message.handling_failures(), 1);
    port.close().unwrap();
}

#[test]
fn test_cancel_before_batch_swap_prevents_delivery() {
    let log = new_log();
    let (gated, gate) = GatedHandler::new(&log);
    let port = open_port_with(vec![gated]);

    // Park the worker inside handle() so nothing further is swapped out of the queue.
    port.send(&Message::shared(Job::gated(0))).unwrap();
    assert_eq!(gate.entered.recv().unwrap(), 0);

    let cancelled = Message::shared(Job::new(1));
    port.send(&cancelled).unwrap();
    assert_eq!(port.cancel(&cancelled).unwrap(), CancelOutcome::Cancelled);

    gate.release.send(()).unwrap();
    let marker = Message::shared(Job::new(2));
    port.send_and_wait(&marker).unwrap();
    port.close().unwrap();

    assert!(!cancelled.is_handled());
    assert_eq!(snapshot(&log), vec!["job-0", "job-2"]);
}

#[test]
fn test_cancel_after_dispatch_started_is_a_no_op() {
    let log = new_log();
    let (gated, gate) = GatedHandler::new(&log);
    let port = open_port_with(vec![gated]);

    let message = Message::shared(Job::gated(7));
    port.send(&message).unwrap();
    assert_eq!(gate.entered.recv().unwrap(), 7);

    assert_eq!(port.cancel(&message).unwrap(), CancelOutcome::NotPending);

    gate.release.send(()).unwrap();
    port.wait_for_message(&message).unwrap();
    port.close().unwrap();

    assert!(message.is_handled());
    assert_eq!(snapshot(&log), vec!["job-7"]);
}

#[test]
fn test_cancel_after_delay_never_double_delivers() {
    let log = new_log();
    let port = open_port_with(vec![RecordingHandler::new("h", &log).boxed()]);

    let message = Message::shared(Job::new(3));
    port.send(&message).unwrap();
    sleep(Duration::from_millis(50));
    assert_eq!(port.cancel(&message).unwrap(), CancelOutcome::NotPending);
    port.wait_for_message(&message).unwrap();
    port.close().unwrap();

    assert_eq!(jobs(&log), vec!["h:job-3"]);
}
