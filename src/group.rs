//! Grouping of detection samples into time intervals.
//!
//! `IntervalGrouper` folds an ordered stream of `Sample`s into `Event`s, one per
//! maximal run of consecutive positive samples. At most one event is open at a
//! time; it closes on the next negative sample or when the stream ends.

use serde::Serialize;

use crate::sample::{Sample, Timestamp};

/// A contiguous interval over which the target was detected on every sample.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event<I> {
    pub start: Timestamp,
    pub end: Timestamp,
    /// Frame images of the run, in sample order. Never empty.
    pub images: Vec<I>,
}

impl<I> Event<I> {
    fn open(timestamp: Timestamp, image: I) -> Self {
        Self {
            start: timestamp,
            end: timestamp,
            images: vec![image],
        }
    }

    fn extend(&mut self, timestamp: Timestamp, image: I) {
        self.end = timestamp;
        self.images.push(image);
    }
}

/// Stateful interval accumulator.
#[derive(Debug)]
pub struct IntervalGrouper<I> {
    current: Option<Event<I>>,
    finished: Vec<Event<I>>,
}

impl<I> IntervalGrouper<I> {
    pub fn new() -> Self {
        Self {
            current: None,
            finished: Vec::new(),
        }
    }

    /// Feed the next sample. Samples must arrive in non-decreasing time order.
    pub fn push(&mut self, sample: Sample<I>) {
        match sample.hit {
            Some(image) => match self.current.as_mut() {
                Some(open) => open.extend(sample.timestamp, image),
                None => self.current = Some(Event::open(sample.timestamp, image)),
            },
            None => {
                if let Some(closed) = self.current.take() {
                    self.finished.push(closed);
                }
            }
        }
    }

    pub fn has_open_event(&self) -> bool {
        self.current.is_some()
    }

    /// Events closed so far, excluding any still-open event.
    pub fn closed_events(&self) -> usize {
        self.finished.len()
    }

    /// Close any open event and return all events in order.
    pub fn finish(mut self) -> Vec<Event<I>> {
        if let Some(open) = self.current.take() {
            self.finished.push(open);
        }
        self.finished
    }
}

impl<I> Default for IntervalGrouper<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Group a complete sample stream in one call.
pub fn group_samples<I, S>(samples: S) -> Vec<Event<I>>
where
    S: IntoIterator<Item = Sample<I>>,
{
    let mut grouper = IntervalGrouper::new();
    for sample in samples {
        grouper.push(sample);
    }
    grouper.finish()
}
