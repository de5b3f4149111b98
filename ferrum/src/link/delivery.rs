//! Deliveries handed to and received from the application

use bytes::{Bytes, BytesMut};
use ferrum_types::{
    definitions::{DeliveryNumber, DeliveryTag, MessageFormat, ReceiverSettleMode},
    messaging::DeliveryState,
};

/// Message format of a plain AMQP message
pub const DEFAULT_MESSAGE_FORMAT: MessageFormat = 0;

/// A complete delivery received on a receiver link
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Delivery id assigned by the sending session
    pub delivery_id: DeliveryNumber,

    /// Delivery tag assigned by the sending link
    pub delivery_tag: DeliveryTag,

    /// Message format
    pub message_format: MessageFormat,

    /// Whether the sender already settled the delivery
    pub settled: bool,

    /// State the sender attached to the delivery
    pub state: Option<DeliveryState>,

    /// Receiver settle mode requested for this delivery
    pub rcv_settle_mode: Option<ReceiverSettleMode>,

    /// Bytes of all transfer frames of the delivery
    pub payload: Bytes,
}

/// A message to send on a sender link
#[derive(Debug, Clone, PartialEq)]
pub struct Sendable {
    /// Delivery tag, unique among the unsettled deliveries of the link
    pub tag: DeliveryTag,

    /// Encoded message
    pub payload: Bytes,

    /// Send pre-settled. Only consulted with the `mixed` sender settle mode
    pub settled: bool,

    /// Message format
    pub message_format: MessageFormat,
}

impl Sendable {
    /// An unsettled message with the default message format
    pub fn new(tag: impl Into<DeliveryTag>, payload: impl Into<Bytes>) -> Self {
        Self {
            tag: tag.into(),
            payload: payload.into(),
            settled: false,
            message_format: DEFAULT_MESSAGE_FORMAT,
        }
    }

    /// Send the message pre-settled
    pub fn settled(mut self, settled: bool) -> Self {
        self.settled = settled;
        self
    }

    /// Set the message format
    pub fn message_format(mut self, message_format: MessageFormat) -> Self {
        self.message_format = message_format;
        self
    }
}

/// Why a delivery left the unsettled map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleReason {
    /// The peer settled it with a disposition
    DispositionReceived,

    /// The local endpoint settled it
    Settled,

    /// The sender aborted the transfer
    NotDelivered,

    /// The link, session or connection went away first
    Cancelled,
}

/// Outcome of a send attempt at session level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransferState {
    /// Transfers may be sent
    Okay,

    /// The session is not mapped
    Error,

    /// The session window or link credit is exhausted
    Busy,
}

/// Which limit held a send back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// The link has no credit
    LinkCredit,

    /// The message does not fit the session windows
    SessionWindow,
}

/// Result of [`Connection::send`](crate::Connection::send)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The transfer frames are in the outgoing buffer
    Sent {
        /// Delivery id assigned to the message
        delivery_id: DeliveryNumber,
    },

    /// Nothing was sent, retry later
    Deferred(SessionTransferState, DeferReason),
}

/// An unsettled delivery tracked by a link
#[derive(Debug, Clone)]
pub(crate) struct Unsettled {
    pub tag: DeliveryTag,
    pub state: Option<DeliveryState>,
    pub delivery_count: u32,
}

impl Unsettled {
    pub fn new(tag: DeliveryTag, state: Option<DeliveryState>) -> Self {
        Self {
            tag,
            state,
            delivery_count: 0,
        }
    }
}

/// A delivery spread over several transfer frames
#[derive(Debug)]
pub(crate) struct IncompleteDelivery {
    pub delivery_id: DeliveryNumber,
    pub delivery_tag: DeliveryTag,
    pub message_format: MessageFormat,
    pub settled: bool,
    pub state: Option<DeliveryState>,
    pub rcv_settle_mode: Option<ReceiverSettleMode>,
    pub buffer: BytesMut,
}

impl IncompleteDelivery {
    pub fn into_delivery(self) -> Delivery {
        Delivery {
            delivery_id: self.delivery_id,
            delivery_tag: self.delivery_tag,
            message_format: self.message_format,
            settled: self.settled,
            state: self.state,
            rcv_settle_mode: self.rcv_settle_mode,
            payload: self.buffer.freeze(),
        }
    }
}
