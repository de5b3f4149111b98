//! Results of processing input, returned to the application as data

use ferrum_types::{
    definitions::{self, DeliveryNumber, DeliveryTag},
    messaging::DeliveryState,
    performatives::{Attach, Open},
};

use crate::{
    frames::{Frame, FrameBody},
    link::{Delivery, LinkId, SettleReason},
    session::SessionId,
};

/// Something the application should know about
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The peer's open arrived
    Opened {
        /// The peer's open
        remote: Open,
    },

    /// The peer began a session that waits for
    /// [`Connection::accept_session`](crate::Connection::accept_session)
    SessionRequested {
        /// The new session
        session: SessionId,
        /// Channel the peer uses
        remote_channel: u16,
    },

    /// Both begins have been exchanged
    SessionBegun {
        /// The session
        session: SessionId,
    },

    /// The peer attached a link that waits for
    /// [`Connection::accept_link`](crate::Connection::accept_link)
    AttachRequested {
        /// The session
        session: SessionId,
        /// The new link
        link: LinkId,
        /// The peer's attach
        attach: Attach,
    },

    /// Both attaches have been exchanged
    LinkAttached {
        /// The session
        session: SessionId,
        /// The link
        link: LinkId,
    },

    /// The link credit changed after a flow from the peer
    FlowUpdated {
        /// The session
        session: SessionId,
        /// The link
        link: LinkId,
        /// The link credit now
        credit: u32,
    },

    /// A complete delivery arrived on a receiver link
    Delivery {
        /// The session
        session: SessionId,
        /// The link
        link: LinkId,
        /// The delivery
        delivery: Delivery,
    },

    /// A delivery left the unsettled map
    Settled {
        /// The session
        session: SessionId,
        /// The link
        link: LinkId,
        /// Delivery id
        delivery_id: DeliveryNumber,
        /// Delivery tag
        tag: DeliveryTag,
        /// Last known state
        state: Option<DeliveryState>,
        /// Why it left
        reason: SettleReason,
        /// Number of failed delivery attempts reported for it
        delivery_count: u32,
    },

    /// The peer changed the state of a delivery without settling it
    DeliveryUpdated {
        /// The session
        session: SessionId,
        /// The link
        link: LinkId,
        /// Delivery id
        delivery_id: DeliveryNumber,
        /// New state
        state: Option<DeliveryState>,
    },

    /// Both detaches have been exchanged and the link is gone
    LinkDetached {
        /// The session
        session: SessionId,
        /// The link
        link: LinkId,
        /// Whether the link was closed
        closed: bool,
        /// Error carried by either detach
        error: Option<definitions::Error>,
    },

    /// Both ends have been exchanged and the session is gone
    SessionEnded {
        /// The session
        session: SessionId,
        /// Error carried by either end
        error: Option<definitions::Error>,
    },

    /// The connection reached its end state
    Closed {
        /// Error carried by either close
        error: Option<definitions::Error>,
    },
}

/// Frames to write and events to report, collected while handling one input
#[derive(Debug, Default)]
pub(crate) struct Effects {
    pub frames: Vec<Frame>,
    pub events: Vec<Event>,
}

impl Effects {
    pub fn frame(&mut self, channel: u16, body: impl Into<FrameBody>) {
        self.frames.push(Frame::new(channel, body));
    }

    pub fn event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Take the events of `other` and drop its frames. Returns the number of frames dropped.
    pub fn keep_events(&mut self, other: Effects) -> usize {
        self.events.extend(other.events);
        other.frames.len()
    }
}
