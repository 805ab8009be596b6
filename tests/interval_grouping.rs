//! Properties of detection-interval grouping.

use sightline::{group_samples, Event, IntervalGrouper, Sample, Timestamp};

fn samples_from(pattern: &[bool]) -> Vec<Sample<usize>> {
    pattern
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let ts = Timestamp::from_seconds(i as f64);
            if *hit {
                Sample::detected(i as u64, ts, i)
            } else {
                Sample::missed(i as u64, ts)
            }
        })
        .collect()
}

/// Deterministic pseudo-random patterns (xorshift) for broad coverage.
fn patterns() -> Vec<Vec<bool>> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut out = Vec::new();
    for len in 0..40 {
        for _ in 0..8 {
            let mut pattern = Vec::with_capacity(len);
            for _ in 0..len {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                pattern.push(state % 3 != 0);
            }
            out.push(pattern);
        }
    }
    out
}

fn bounds(events: &[Event<usize>]) -> Vec<(f64, f64, usize)> {
    events
        .iter()
        .map(|e| (e.start.seconds(), e.end.seconds(), e.images.len()))
        .collect()
}

#[test]
fn mixed_pattern_yields_three_events() {
    let events = group_samples(samples_from(&[true, true, false, true, false, false, true]));
    assert_eq!(
        bounds(&events),
        vec![(0.0, 1.0, 2), (3.0, 3.0, 1), (6.0, 6.0, 1)]
    );
    assert_eq!(events[0].images, vec![0, 1]);
}

#[test]
fn empty_stream_yields_no_events() {
    let events: Vec<Event<usize>> = group_samples(Vec::new());
    assert!(events.is_empty());
}

#[test]
fn all_negative_stream_yields_no_events() {
    assert!(group_samples(samples_from(&[false; 12])).is_empty());
}

#[test]
fn all_positive_stream_yields_one_spanning_event() {
    let events = group_samples(samples_from(&[true; 9]));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].start.seconds(), 0.0);
    assert_eq!(events[0].end.seconds(), 8.0);
    assert_eq!(events[0].images, (0..9).collect::<Vec<_>>());
}

#[test]
fn events_are_non_empty_ordered_and_separated() {
    for pattern in patterns() {
        let events = group_samples(samples_from(&pattern));
        for event in &events {
            assert!(!event.images.is_empty());
            assert!(event.start <= event.end);
            let first = event.images[0];
            let last = *event.images.last().unwrap();
            assert_eq!(event.start.seconds(), first as f64);
            assert_eq!(event.end.seconds(), last as f64);
            assert!(event.images.windows(2).all(|w| w[1] == w[0] + 1));
            assert!(event.images.iter().all(|i| pattern[*i]));
        }
        for pair in events.windows(2) {
            let prev_end = *pair[0].images.last().unwrap();
            let next_start = pair[1].images[0];
            assert!(pair[0].end < pair[1].start);
            assert!((prev_end + 1..next_start).any(|i| !pattern[i]));
        }
        let positives = pattern.iter().filter(|hit| **hit).count();
        let grouped: usize = events.iter().map(|e| e.images.len()).sum();
        assert_eq!(positives, grouped);
    }
}

#[test]
fn regrouping_is_idempotent() {
    for pattern in patterns() {
        let first = group_samples(samples_from(&pattern));
        let second = group_samples(samples_from(&pattern));
        assert_eq!(first, second);
    }
}

#[test]
fn incremental_push_matches_batch_grouping() {
    let pattern = [false, true, true, true, false, true];
    let mut grouper = IntervalGrouper::default();
    for sample in samples_from(&pattern) {
        grouper.push(sample);
    }
    assert!(grouper.has_open_event());
    assert_eq!(grouper.finish(), group_samples(samples_from(&pattern)));
}

#[test]
fn repeated_timestamps_are_accepted() {
    let ts = Timestamp::from_seconds(2.0);
    let samples = vec![
        Sample::detected(20, ts, "a"),
        Sample::detected(21, ts, "b"),
        Sample::missed(22, Timestamp::from_seconds(2.2)),
    ];
    let events = group_samples(samples);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].start, events[0].end);
    assert_eq!(events[0].images, vec!["a", "b"]);
}
