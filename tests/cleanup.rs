//! Teardown, immediate and deferred behind an asynchronous decompression.

mod common;

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use bytes::Bytes;
use websocket_receiver::{
    error::InflateError,
    extensions::{Extensions, Inflation},
    CloseCode, Error, ParserState, Receiver, ReceiverConfig,
};

use common::*;

/// Payloads handed to the inflater, each resolved later by the test.
type Calls = Rc<RefCell<Vec<(Bytes, bool)>>>;

fn pending_receiver() -> (Receiver<Recorder>, Calls) {
    let _ = env_logger::try_init();
    let calls = Calls::default();
    let seen = calls.clone();
    let extensions = Extensions::new().with_permessage_deflate(move |payload: Bytes, fin: bool| {
        seen.borrow_mut().push((payload, fin));
        Inflation::Pending
    });
    (Receiver::with_extensions(Recorder::default(), ReceiverConfig::default(), extensions), calls)
}

fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
    let count = Rc::new(Cell::new(0));
    let inner = count.clone();
    (count, move || inner.set(inner.get() + 1))
}

#[test]
fn idle_cleanup_is_immediate() {
    let mut receiver = pending_receiver().0;
    receiver.add(frame(TEXT, b"partial", None));
    receiver.add(&[FIN | CONTINUE][..]);

    let (count, on_done) = counter();
    receiver.cleanup(on_done);
    assert_eq!(count.get(), 1);
    assert!(receiver.is_halted());

    receiver.add(&[0x03, b'e', b'n', b'd'][..]);
    assert!(receiver.get_ref().events.is_empty());
}

#[test]
fn resume_continues_with_buffered_input() {
    let (mut receiver, calls) = pending_receiver();
    receiver.add(frame(FIN | RSV1 | TEXT, b"compressed", None));
    assert_eq!(receiver.state(), ParserState::Inflating);
    assert_eq!(*calls.borrow(), vec![(Bytes::from_static(b"compressed"), true)]);

    // Only buffered until the decompression resolves.
    receiver.add(frame(FIN | TEXT, b"next", None));
    assert!(receiver.get_ref().events.is_empty());

    receiver.resume_inflate(Ok(Bytes::from_static(b"inflated")));
    assert_eq!(receiver.state(), ParserState::AwaitingHeader);
    assert_eq!(receiver.get_ref().events, vec![text("inflated"), text("next")]);

    // Nothing is pending any more.
    receiver.resume_inflate(Ok(Bytes::from_static(b"stray")));
    assert_eq!(receiver.get_ref().events.len(), 2);
    assert!(!receiver.is_halted());
}

#[test]
fn fragments_inflate_one_at_a_time() {
    let (mut receiver, calls) = pending_receiver();
    let mut data = frame(RSV1 | BINARY, b"one", None);
    data.extend(frame(FIN | CONTINUE, b"two", None));
    receiver.add(data);
    assert_eq!(calls.borrow().len(), 1);

    receiver.resume_inflate(Ok(Bytes::from_static(b"1")));
    assert_eq!(calls.borrow().len(), 2);
    assert_eq!(calls.borrow()[1], (Bytes::from_static(b"two"), true));

    receiver.resume_inflate(Ok(Bytes::from_static(b"2")));
    let events = receiver.into_inner().events;
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Message(message) => assert_eq!(message.clone().into_data(), &b"12"[..]),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn cleanup_waits_for_inflation() {
    let (mut receiver, _calls) = pending_receiver();
    receiver.add(frame(FIN | RSV1 | TEXT, b"compressed", None));
    receiver.add(frame(FIN | TEXT, b"buffered", None));

    let (count, on_done) = counter();
    receiver.cleanup(on_done);
    assert_eq!(count.get(), 0);
    assert!(!receiver.is_halted());

    // Input while the teardown is pending goes nowhere.
    receiver.add(frame(FIN | TEXT, b"late", None));

    receiver.resume_inflate(Ok(Bytes::from_static(b"dropped")));
    assert_eq!(count.get(), 1);
    assert!(receiver.is_halted());
    assert_eq!(receiver.state(), ParserState::AwaitingHeader);
    assert!(receiver.get_ref().events.is_empty());

    // A second resume has nothing to finish.
    receiver.resume_inflate(Ok(Bytes::new()));
    assert_eq!(count.get(), 1);
}

#[test]
fn every_deferred_cleanup_completes() {
    let (mut receiver, _calls) = pending_receiver();
    receiver.add(frame(FIN | RSV1 | BINARY, b"x", None));

    let (first, on_first) = counter();
    let (second, on_second) = counter();
    receiver.cleanup(on_first);
    receiver.cleanup(on_second);
    receiver.resume_inflate(Err(InflateError::InvalidData("ignored".into())));

    assert_eq!((first.get(), second.get()), (1, 1));
    assert!(receiver.get_ref().events.is_empty());
}

#[test]
fn failed_inflation_is_fatal() {
    let (mut receiver, _calls) = pending_receiver();
    receiver.add(frame(FIN | RSV1 | BINARY, b"x", None));
    receiver.resume_inflate(Err(InflateError::InvalidData("invalid block type".into())));
    assert!(receiver.is_halted());

    let (count, on_done) = counter();
    receiver.cleanup(on_done);
    assert_eq!(count.get(), 1);
    assert_eq!(
        receiver.into_inner().events,
        vec![Event::Error(
            Error::Inflate(InflateError::InvalidData("invalid block type".into())),
            CloseCode::Invalid
        )]
    );
}
