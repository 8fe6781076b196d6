//! Ordering specs
//!
//! Each muxer sees the events it accepts in publish order.

use crate::prelude::*;
use crate::prelude::assert_eq;
use std::thread;

#[test]
fn muxer_sees_publish_order_regardless_of_other_muxers() {
    let bus = Bus::running(100);
    let a = bus.subscribe("a", &[], &[]);
    let b = bus.subscribe("b", &[], &[1]);

    let published: Vec<Event> = (0..20).map(|i| ev(1 + (i % 2) as u32, i)).collect();
    for e in &published {
        bus.engine.publish(e.clone()).unwrap();
    }

    assert_eq!(drain(&a), published);
    let ones: Vec<Event> = published
        .iter()
        .filter(|e| e.event_type() == EventType::from_raw(1))
        .cloned()
        .collect();
    assert_eq!(drain(&b), ones);
}

#[test]
fn publish_returned_first_is_read_first() {
    let bus = Bus::running(100);
    let sub = bus.subscribe("sql", &[], &[]);
    let publisher = bus.engine.publisher();

    let first = {
        let publisher = publisher.clone();
        thread::spawn(move || publisher.write(ev(1, 0)).unwrap())
    };
    assert_eq!(first.join().unwrap(), 1);
    publisher.write(ev(1, 1)).unwrap();

    assert_eq!(drain(&sub), vec![ev(1, 0), ev(1, 1)]);
}

#[test]
fn overlapping_publishes_interleave_consistently() {
    let bus = Bus::running(8);
    let subs: Vec<Subscriber> = ["a", "b", "c"]
        .iter()
        .map(|name| bus.subscribe(name, &[], &[]))
        .collect();

    let writers: Vec<_> = (0..4u32)
        .map(|t| {
            let publisher = bus.engine.publisher();
            thread::spawn(move || {
                for seq in 0..100 {
                    publisher.write(ev(t + 1, seq)).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let first = drain(&subs[0]);
    assert_eq!(first.len(), 400);
    for sub in &subs[1..] {
        assert_eq!(drain(sub), first);
    }
}
