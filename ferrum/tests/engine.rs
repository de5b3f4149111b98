//! Two connections wired back to back in memory

use bytes::{Bytes, BytesMut};
use ferrum::{
    connection::{ConnectionState, Error},
    frames::{wrap_frame, FRAME_TYPE_AMQP},
    link::{self, Link},
    session::{SessionConfig, SessionState},
    Acceptance, Connection, Event, LinkId, SendOutcome, Sendable, SessionId, SettleReason,
};
use ferrum_types::{
    definitions::{ErrorCondition, Handle, SessionError},
    messaging::DeliveryState,
    performatives::{Performative, Transfer},
};

struct Pair {
    client: Connection,
    server: Connection,
    client_events: Vec<Event>,
    server_events: Vec<Event>,
}

impl Pair {
    fn new(client: Connection, server: Connection) -> Self {
        Self {
            client,
            server,
            client_events: Vec::new(),
            server_events: Vec::new(),
        }
    }

    fn with_defaults() -> Self {
        Self::new(connection("client"), connection("server"))
    }

    /// Exchange bytes until both sides are quiet
    fn pump(&mut self) {
        self.client_events.append(&mut self.client.drain_events());
        self.server_events.append(&mut self.server.drain_events());
        loop {
            let to_server = self.client.take_outgoing();
            let to_client = self.server.take_outgoing();
            if to_server.is_empty() && to_client.is_empty() {
                break;
            }
            self.server_events.append(&mut self.server.process(&to_server));
            self.client_events.append(&mut self.client.process(&to_client));
        }
    }

    fn open(&mut self) {
        self.client.open().unwrap();
        self.server.open().unwrap();
        self.pump();
        assert_eq!(self.client.state(), ConnectionState::Opened);
        assert_eq!(self.server.state(), ConnectionState::Opened);
    }

    /// Open both ends, begin a session from the client and accept it
    fn session(&mut self) -> (SessionId, SessionId) {
        self.open();
        let client = self.client.begin().unwrap();
        self.pump();
        let server = self
            .server_events
            .iter()
            .find_map(|e| match e {
                Event::SessionRequested { session, .. } => Some(*session),
                _ => None,
            })
            .unwrap();
        self.server.accept_session(server).unwrap();
        self.pump();
        assert!(self
            .client_events
            .iter()
            .any(|e| matches!(e, Event::SessionBegun { session } if *session == client)));
        (client, server)
    }

    /// Attach a link from the client and accept it at the server
    fn link(
        &mut self,
        sessions: (SessionId, SessionId),
        builder: link::Builder,
        acceptance: Acceptance,
    ) -> (LinkId, LinkId) {
        let client = self.client.attach(sessions.0, builder).unwrap();
        self.pump();
        let server = self
            .server_events
            .iter()
            .rev()
            .find_map(|e| match e {
                Event::AttachRequested { link, .. } => Some(*link),
                _ => None,
            })
            .unwrap();
        self.server.accept_link(sessions.1, server, acceptance).unwrap();
        self.pump();
        assert!(self
            .client_events
            .iter()
            .any(|e| matches!(e, Event::LinkAttached { link, .. } if *link == client)));
        (client, server)
    }
}

fn connection(id: &str) -> Connection {
    Connection::builder().container_id(id).build().unwrap()
}

fn deliveries(events: &[Event]) -> Vec<&ferrum::Delivery> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Delivery { delivery, .. } => Some(delivery),
            _ => None,
        })
        .collect()
}

#[test]
fn unsettled_delivery_is_accepted() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();
    let (sender, receiver) = pair.link(
        sessions,
        Link::builder().name("out").sender().target("queue"),
        Acceptance::default(),
    );
    assert!(pair
        .client_events
        .iter()
        .any(|e| matches!(e, Event::FlowUpdated { credit: 10_000, .. })));

    let outcome = pair
        .client
        .send(sessions.0, sender, Sendable::new(&b"tag-1"[..], &b"hello"[..]))
        .unwrap();
    assert_eq!(outcome, SendOutcome::Sent { delivery_id: 0 });
    pair.pump();

    let received = deliveries(&pair.server_events);
    assert_eq!(received.len(), 1);
    assert_eq!(&received[0].payload[..], b"hello");
    assert!(!received[0].settled);
    let delivery_id = received[0].delivery_id;

    pair.server
        .dispose(sessions.1, receiver, delivery_id, Some(DeliveryState::accepted()), true)
        .unwrap();
    pair.pump();

    assert!(pair.client_events.iter().any(|e| matches!(
        e,
        Event::Settled {
            reason: SettleReason::DispositionReceived,
            state: Some(DeliveryState::Accepted(_)),
            ..
        }
    )));
    let link = pair.client.link(sessions.0, sender).unwrap();
    assert_eq!(link.unsettled_count(), 0);
    assert_eq!(link.link_credit(), 9_999);
    assert_eq!(pair.client.session(sessions.0).unwrap().outgoing_unsettled_bytes(), 0);
}

#[test]
fn large_message_is_split_and_reassembled() {
    let server = Connection::builder()
        .container_id("server")
        .max_frame_size(512)
        .build()
        .unwrap();
    let mut pair = Pair::new(connection("client"), server);
    let sessions = pair.session();
    assert_eq!(pair.client.max_outbound_frame_size(), 512);
    let (sender, _) = pair.link(
        sessions,
        Link::builder().name("out").sender().target("queue"),
        Acceptance::default(),
    );

    let payload = Bytes::from(vec![7u8; 2000]);
    pair.client
        .send(sessions.0, sender, Sendable::new(&b"t"[..], payload.clone()))
        .unwrap();
    assert!(pair.client.session(sessions.0).unwrap().next_outgoing_id() > 1);
    pair.pump();

    let received = deliveries(&pair.server_events);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].payload, payload);
}

#[test]
fn zero_credit_defers_sending() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();
    let (sender, receiver) = pair.link(
        sessions,
        Link::builder().name("out").sender().target("queue"),
        Acceptance {
            credit: Some(0),
            ..Default::default()
        },
    );

    let outcome = pair
        .client
        .send(sessions.0, sender, Sendable::new(&b"t"[..], &b"m"[..]))
        .unwrap();
    assert!(matches!(
        outcome,
        SendOutcome::Deferred(_, ferrum::link::DeferReason::LinkCredit)
    ));
    assert!(pair.client.take_outgoing().is_empty());

    pair.server.flow(sessions.1, receiver, 1, false).unwrap();
    pair.pump();
    assert_eq!(pair.client.link(sessions.0, sender).unwrap().link_credit(), 1);
    let outcome = pair
        .client
        .send(sessions.0, sender, Sendable::new(&b"t"[..], &b"m"[..]))
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Sent { .. }));
}

#[test]
fn session_window_defers_sending() {
    let server = Connection::builder()
        .container_id("server")
        .session_config(SessionConfig {
            incoming_window: 1024,
            ..Default::default()
        })
        .build()
        .unwrap();
    let mut pair = Pair::new(connection("client"), server);
    let sessions = pair.session();
    let (sender, _) = pair.link(
        sessions,
        Link::builder().name("out").sender().target("queue"),
        Acceptance::default(),
    );

    let outcome = pair
        .client
        .send(sessions.0, sender, Sendable::new(&b"t"[..], vec![0u8; 2000]))
        .unwrap();
    assert!(matches!(
        outcome,
        SendOutcome::Deferred(_, ferrum::link::DeferReason::SessionWindow)
    ));
}

#[test]
fn window_violation_ends_the_session() {
    let server = Connection::builder()
        .container_id("server")
        .session_config(SessionConfig {
            incoming_window: 1024,
            ..Default::default()
        })
        .build()
        .unwrap();
    let mut pair = Pair::new(connection("client"), server);
    let sessions = pair.session();
    pair.link(
        sessions,
        Link::builder().name("out").sender().target("queue"),
        Acceptance::default(),
    );

    // bypass the sender's window check
    let mut transfer = Transfer::new(Handle(0));
    transfer.delivery_id = Some(0);
    transfer.delivery_tag = Some(Bytes::from_static(b"t"));
    transfer.settled = Some(false);
    let mut performative = BytesMut::new();
    Performative::from(transfer).encode(&mut performative).unwrap();
    let frame = wrap_frame(FRAME_TYPE_AMQP, 0, &performative, Some(&[0u8; 2000][..])).unwrap();
    pair.server_events.append(&mut pair.server.process(&frame));
    pair.pump();

    let violation = ErrorCondition::SessionError(SessionError::WindowViolation);
    for events in [&pair.client_events, &pair.server_events] {
        assert!(events.iter().any(|e| matches!(
            e,
            Event::SessionEnded { error: Some(err), .. } if err.condition == violation
        )));
    }
    assert_eq!(pair.client.session_state(sessions.0), None);
    assert_eq!(pair.client.state(), ConnectionState::Opened);
}

#[test]
fn dynamic_node_address_is_adopted() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();

    let client = pair
        .client
        .attach(sessions.0, Link::builder().name("reply").receiver().dynamic(true))
        .unwrap();
    pair.pump();
    let (server, dynamic) = pair
        .server_events
        .iter()
        .find_map(|e| match e {
            Event::AttachRequested { link, attach, .. } => {
                Some((*link, attach.source.as_ref().map(|s| s.dynamic)))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(dynamic, Some(true));

    assert!(matches!(
        pair.server.accept_link(sessions.1, server, Acceptance::default()),
        Err(Error::Link(link::Error::MissingField(_)))
    ));
    pair.server
        .accept_link(
            sessions.1,
            server,
            Acceptance {
                dynamic_address: Some("tmp-1".into()),
                ..Default::default()
            },
        )
        .unwrap();
    pair.pump();

    let link = pair.client.link(sessions.0, client).unwrap();
    assert_eq!(
        link.source().and_then(|s| s.address.as_deref()),
        Some("tmp-1")
    );
}

#[test]
fn dynamic_with_address_is_rejected_locally() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();
    let result = pair.client.attach(
        sessions.0,
        Link::builder().name("bad").receiver().source("queue").dynamic(true),
    );
    assert!(matches!(
        result,
        Err(Error::Link(link::Error::DynamicWithAddress))
    ));
}

#[test]
fn duplicated_link_name_is_rejected() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();
    pair.client
        .attach(sessions.0, Link::builder().name("dup").sender().target("q"))
        .unwrap();
    let result = pair
        .client
        .attach(sessions.0, Link::builder().name("dup").receiver().source("q"));
    assert!(matches!(
        result,
        Err(Error::Link(link::Error::DuplicatedLinkName))
    ));
}

#[test]
fn detach_cancels_unsettled_deliveries() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();
    let (sender, _) = pair.link(
        sessions,
        Link::builder().name("out").sender().target("queue"),
        Acceptance::default(),
    );
    pair.client
        .send(sessions.0, sender, Sendable::new(&b"t"[..], &b"m"[..]))
        .unwrap();
    pair.client.detach(sessions.0, sender, true, None).unwrap();
    pair.pump();

    assert!(pair.client_events.iter().any(|e| matches!(
        e,
        Event::Settled {
            reason: SettleReason::Cancelled,
            ..
        }
    )));
    for events in [&pair.client_events, &pair.server_events] {
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::LinkDetached { closed: true, error: None, .. })));
    }
    assert!(pair.client.link(sessions.0, sender).is_none());
}

#[test]
fn end_and_close() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();
    pair.client.end(sessions.0, None).unwrap();
    pair.pump();
    assert_eq!(pair.client.session_state(sessions.0), None);
    assert_eq!(pair.server.session_state(sessions.1), None);

    pair.client.close(None).unwrap();
    pair.pump();
    assert_eq!(pair.client.state(), ConnectionState::End);
    assert_eq!(pair.server.state(), ConnectionState::End);
    for events in [&pair.client_events, &pair.server_events] {
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Closed { error: None })));
    }
    assert!(matches!(pair.client.begin(), Err(Error::IllegalState)));
}

#[test]
fn disposition_after_local_close_settles() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();
    let (sender, receiver) = pair.link(
        sessions,
        Link::builder().name("out").sender().target("queue"),
        Acceptance::default(),
    );
    pair.client
        .send(sessions.0, sender, Sendable::new(&b"t"[..], &b"m"[..]))
        .unwrap();
    pair.pump();
    let delivery_id = deliveries(&pair.server_events)[0].delivery_id;

    // the close and the disposition cross on the wire
    pair.client.close(None).unwrap();
    assert_eq!(pair.client.state(), ConnectionState::CloseSent);
    let close = pair.client.take_outgoing();
    pair.server
        .dispose(sessions.1, receiver, delivery_id, Some(DeliveryState::accepted()), true)
        .unwrap();
    let events = pair.client.process(&pair.server.take_outgoing());

    assert!(events.iter().any(|e| matches!(
        e,
        Event::Settled {
            reason: SettleReason::DispositionReceived,
            state: Some(DeliveryState::Accepted(_)),
            ..
        }
    )));
    assert!(pair.client.take_outgoing().is_empty());
    assert_eq!(pair.client.link(sessions.0, sender).unwrap().unsettled_count(), 0);

    pair.server_events.append(&mut pair.server.process(&close));
    pair.pump();
    assert_eq!(pair.client.state(), ConnectionState::End);
    assert!(!pair.client_events.iter().any(|e| matches!(
        e,
        Event::Settled {
            reason: SettleReason::Cancelled,
            ..
        }
    )));
}

#[test]
fn pipelined_close_with_error_discards() {
    let mut client = connection("client");
    client.open().unwrap();
    let error = ferrum_types::definitions::Error::from(
        ferrum_types::definitions::AmqpError::InternalError,
    );
    client.close(Some(error)).unwrap();
    assert_eq!(client.state(), ConnectionState::OpenClosePipe { error: true });

    let mut server = connection("server");
    server.open().unwrap();
    client.process(&server.take_outgoing());
    assert_eq!(client.state(), ConnectionState::Discarding);

    server.process(&client.take_outgoing());
    assert_eq!(server.state(), ConnectionState::End);
    client.process(&server.take_outgoing());
    assert_eq!(client.state(), ConnectionState::End);
}

#[test]
fn close_tears_down_sessions() {
    let mut pair = Pair::with_defaults();
    let sessions = pair.session();
    let (sender, _) = pair.link(
        sessions,
        Link::builder().name("out").sender().target("queue"),
        Acceptance::default(),
    );
    pair.client
        .send(sessions.0, sender, Sendable::new(&b"t"[..], &b"m"[..]))
        .unwrap();
    pair.client.close(None).unwrap();
    pair.pump();

    assert!(pair.client_events.iter().any(|e| matches!(
        e,
        Event::Settled {
            reason: SettleReason::Cancelled,
            ..
        }
    )));
    assert!(pair
        .client_events
        .iter()
        .any(|e| matches!(e, Event::SessionEnded { session, .. } if *session == sessions.0)));
    assert_eq!(pair.client.session_state(sessions.0), None);
    assert_eq!(pair.client.state(), ConnectionState::End);
}

#[test]
fn remote_close_error_is_reported() {
    let mut pair = Pair::with_defaults();
    pair.open();
    let error = ferrum_types::definitions::Error::from(
        ferrum_types::definitions::AmqpError::InternalError,
    );
    pair.server.close(Some(error.clone())).unwrap();
    pair.pump();
    assert_eq!(pair.server.state(), ConnectionState::End);
    assert!(pair
        .client_events
        .iter()
        .any(|e| matches!(e, Event::Closed { error: Some(err) } if *err == error)));
    assert!(matches!(pair.client.begin(), Err(Error::Remote(err)) if err == error));
}

#[test]
fn session_state_follows_begin() {
    let mut pair = Pair::with_defaults();
    pair.open();
    let session = pair.client.begin().unwrap();
    assert_eq!(pair.client.session_state(session), Some(SessionState::BeginSent));
    pair.pump();
    assert_eq!(pair.client.session_state(session), Some(SessionState::BeginSent));
}
