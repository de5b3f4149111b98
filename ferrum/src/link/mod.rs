//! Link endpoints
//!
//! A [`Link`] holds the flow state and the unsettled deliveries of one endpoint. It never
//! writes frames itself: its methods return the link-level performatives and the owning
//! session attaches them to its channel.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};
use ferrum_types::{
    definitions::{
        self, DeliveryNumber, DeliveryTag, Fields, Handle, ReceiverSettleMode, Role,
        SenderSettleMode, SequenceNo,
    },
    messaging::{DeliveryState, Source, Target},
    performatives::{Attach, Detach, Disposition, Flow, Transfer},
};
use tracing::debug;

mod builder;
mod config;
mod delivery;
mod error;
mod state;

pub use builder::Builder;
pub use config::LinkConfig;
pub use delivery::{
    DeferReason, Delivery, SendOutcome, Sendable, SessionTransferState, SettleReason,
    DEFAULT_MESSAGE_FORMAT,
};
pub use error::Error;
pub use state::{LinkEvent, LinkState};

pub(crate) use delivery::{IncompleteDelivery, Unsettled};

/// Identifies a link within its session. Also used as the output handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(pub usize);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link {}", self.0)
    }
}

/// How a remotely initiated link is answered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acceptance {
    /// Address of the node created for a dynamic request
    pub dynamic_address: Option<String>,

    /// Credit of a local receiver, the configured default if unset
    pub credit: Option<u32>,

    /// Re-issue the credit when half of it is used
    pub auto_credit: bool,
}

/// Result of a flow frame at a link
#[derive(Debug, Default)]
pub(crate) struct FlowOutcome {
    /// Link part of a flow to send back
    pub reply: Option<Flow>,

    /// Current link credit, if the flow changed it
    pub credit: Option<u32>,
}

/// Result of a transfer frame at a receiver link
#[derive(Debug)]
pub(crate) enum Incoming {
    /// More frames follow
    Partial,

    /// The delivery is complete
    Complete(Delivery),

    /// The sender aborted the delivery
    Aborted {
        delivery_id: DeliveryNumber,
        delivery_tag: DeliveryTag,
    },
}

/// A delivery that left the unsettled map
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SettledDelivery {
    pub delivery_id: DeliveryNumber,
    pub tag: DeliveryTag,
    pub state: Option<DeliveryState>,
    pub delivery_count: u32,
}

/// Result of a disposition at a link
#[derive(Debug)]
pub(crate) enum DispositionOutcome {
    /// The delivery is settled. `reply` settles it at the peer as well
    Settled {
        delivery: SettledDelivery,
        reply: Option<Disposition>,
    },

    /// The delivery state changed but it stays unsettled
    Updated {
        delivery_id: DeliveryNumber,
        state: Option<DeliveryState>,
    },

    /// The delivery is not known
    Ignored,
}

/// A link endpoint
#[derive(Debug)]
pub struct Link {
    id: LinkId,
    name: String,
    role: Role,
    state: LinkState,
    input_handle: Option<Handle>,

    snd_settle_mode: SenderSettleMode,
    rcv_settle_mode: ReceiverSettleMode,
    source: Option<Source>,
    target: Option<Target>,
    properties: Option<Fields>,
    max_message_size: u64,
    remote_max_message_size: Option<u64>,

    // flow state
    initial_delivery_count: SequenceNo,
    delivery_count: SequenceNo,
    link_credit: u32,
    available: u32,
    drain: bool,

    credit: u32,
    auto_credit: bool,

    unsettled: BTreeMap<DeliveryNumber, Unsettled>,
    incomplete: Option<IncompleteDelivery>,

    detach_sent: bool,
    local_error: Option<definitions::Error>,
    remote_attach: Option<Attach>,
}

impl Link {
    /// Creates a link builder
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// A locally initiated link, not attached yet
    pub(crate) fn local(id: LinkId, builder: Builder) -> Result<Self, Error> {
        let (source, target) = builder.termini()?;
        let config = builder.config;
        Ok(Self {
            id,
            name: config.name,
            role: config.role,
            state: LinkState::Detached,
            input_handle: None,
            snd_settle_mode: config.snd_settle_mode,
            rcv_settle_mode: config.rcv_settle_mode,
            source: Some(source),
            target: Some(target),
            properties: builder.properties,
            max_message_size: config.max_message_size,
            remote_max_message_size: None,
            initial_delivery_count: config.initial_delivery_count,
            delivery_count: config.initial_delivery_count,
            link_credit: 0,
            available: 0,
            drain: false,
            credit: config.credit,
            auto_credit: config.auto_credit,
            unsettled: BTreeMap::new(),
            incomplete: None,
            detach_sent: false,
            local_error: None,
            remote_attach: None,
        })
    }

    /// A link created by the peer's attach, waiting to be accepted
    pub(crate) fn remote(id: LinkId, attach: Attach) -> Self {
        let role = attach.role.opposite();
        let initial_delivery_count = attach.initial_delivery_count.unwrap_or(0);
        Self {
            id,
            name: attach.name.clone(),
            role,
            state: LinkState::AttachReceived,
            input_handle: Some(attach.handle),
            snd_settle_mode: attach.snd_settle_mode,
            rcv_settle_mode: attach.rcv_settle_mode,
            source: attach.source.as_deref().cloned(),
            target: attach.target.as_deref().cloned(),
            properties: None,
            max_message_size: 0,
            remote_max_message_size: attach.max_message_size,
            initial_delivery_count: 0,
            delivery_count: match role {
                Role::Receiver => initial_delivery_count,
                Role::Sender => 0,
            },
            link_credit: 0,
            available: 0,
            drain: false,
            credit: definitions::DEFAULT_LINK_CREDIT,
            auto_credit: false,
            unsettled: BTreeMap::new(),
            incomplete: None,
            detach_sent: false,
            local_error: None,
            remote_attach: Some(attach),
        }
    }

    /// Link id
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Link name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role of the local endpoint
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Handle used in outgoing frames
    pub fn output_handle(&self) -> Handle {
        Handle(self.id.0 as u32)
    }

    /// Handle the peer uses, once its attach arrived
    pub fn input_handle(&self) -> Option<Handle> {
        self.input_handle
    }

    /// Source terminus
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// Target terminus
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Current link credit
    pub fn link_credit(&self) -> u32 {
        self.link_credit
    }

    /// Current delivery count
    pub fn delivery_count(&self) -> SequenceNo {
        self.delivery_count
    }

    /// Deliveries the sender reported as available
    pub fn available(&self) -> u32 {
        self.available
    }

    /// Sender settle mode
    pub fn snd_settle_mode(&self) -> SenderSettleMode {
        self.snd_settle_mode
    }

    /// Receiver settle mode
    pub fn rcv_settle_mode(&self) -> ReceiverSettleMode {
        self.rcv_settle_mode
    }

    /// Max message size the peer accepts, `None` for unlimited
    pub fn remote_max_message_size(&self) -> Option<u64> {
        self.remote_max_message_size.filter(|size| *size > 0)
    }

    /// Number of unsettled deliveries
    pub fn unsettled_count(&self) -> usize {
        self.unsettled.len()
    }

    /// Whether the delivery is still unsettled
    pub fn is_unsettled(&self, delivery_id: DeliveryNumber) -> bool {
        self.unsettled.contains_key(&delivery_id)
    }

    /// State recorded for an unsettled delivery
    pub fn delivery_state(&self, delivery_id: DeliveryNumber) -> Option<&DeliveryState> {
        self.unsettled.get(&delivery_id)?.state.as_ref()
    }

    /// The attach received from the peer, until the link is accepted
    pub fn remote_attach(&self) -> Option<&Attach> {
        self.remote_attach.as_ref()
    }

    /// Whether a detach has been sent
    pub fn is_detach_sent(&self) -> bool {
        self.detach_sent
    }

    /// Whether frames for this link are to be dropped
    pub(crate) fn is_errant(&self) -> bool {
        self.state == LinkState::Error
    }

    pub(crate) fn local_error(&self) -> Option<&definitions::Error> {
        self.local_error.as_ref()
    }

    fn transition(&mut self, event: LinkEvent) -> Result<(), Error> {
        let next = self.state.transition(event)?;
        debug!(link = %self.name, from = ?self.state, to = ?next, "link state");
        self.state = next;
        Ok(())
    }

    fn attach_performative(&self) -> Attach {
        let initial_delivery_count = match self.role {
            Role::Sender => Some(self.initial_delivery_count),
            Role::Receiver => None,
        };
        Attach {
            name: self.name.clone(),
            handle: self.output_handle(),
            role: self.role,
            snd_settle_mode: self.snd_settle_mode,
            rcv_settle_mode: self.rcv_settle_mode,
            source: self.source.clone().map(Box::new),
            target: self.target.clone().map(Box::new),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count,
            max_message_size: Some(self.max_message_size).filter(|size| *size > 0),
            offered_capabilities: None,
            desired_capabilities: None,
            properties: self.properties.clone(),
        }
    }

    /// The locally initiated attach
    pub(crate) fn send_attach(&mut self) -> Result<Attach, Error> {
        self.transition(LinkEvent::AttachSent)?;
        Ok(self.attach_performative())
    }

    /// The peer answered a locally initiated attach
    pub(crate) fn on_incoming_attach(&mut self, attach: Attach) -> Result<(), Error> {
        self.transition(LinkEvent::AttachReceived)?;
        self.input_handle = Some(attach.handle);
        self.remote_max_message_size = attach.max_message_size;

        match self.role {
            Role::Receiver => {
                self.delivery_count = attach.initial_delivery_count.unwrap_or(0);
                if let (Some(local), Some(remote)) = (self.source.as_mut(), attach.source.as_deref()) {
                    if local.dynamic {
                        local.address = remote.address.clone();
                    }
                }
            }
            Role::Sender => {
                if let (Some(local), Some(remote)) = (self.target.as_mut(), attach.target.as_deref()) {
                    if local.dynamic {
                        local.address = remote.address.clone();
                    }
                }
            }
        }
        Ok(())
    }

    /// Answer the peer's attach
    pub(crate) fn accept(&mut self, acceptance: Acceptance) -> Result<Attach, Error> {
        if self.state != LinkState::AttachReceived {
            return Err(Error::IllegalState);
        }

        let dynamic_address = acceptance.dynamic_address;
        let requested_dynamic = match self.role {
            Role::Sender => self.source.as_mut().filter(|s| s.dynamic).map(|s| &mut s.address),
            Role::Receiver => self.target.as_mut().filter(|t| t.dynamic).map(|t| &mut t.address),
        };
        if let Some(address) = requested_dynamic {
            match dynamic_address {
                Some(created) => *address = Some(created),
                None => return Err(Error::MissingField("dynamic-address")),
            }
        }

        if let Some(credit) = acceptance.credit {
            self.credit = credit;
        }
        self.auto_credit = acceptance.auto_credit;
        self.remote_attach = None;
        self.transition(LinkEvent::AttachSent)?;
        Ok(self.attach_performative())
    }

    /// Attach answering the peer without termini, sent before refusing the link
    pub(crate) fn refuse_attach(&mut self) -> Result<Attach, Error> {
        self.source = None;
        self.target = None;
        self.remote_attach = None;
        self.transition(LinkEvent::AttachSent)?;
        Ok(self.attach_performative())
    }

    /// Link part of a flow frame. The session fills in its own fields
    pub(crate) fn flow_state(&self, echo: bool) -> Flow {
        Flow {
            next_incoming_id: None,
            incoming_window: 0,
            next_outgoing_id: 0,
            outgoing_window: 0,
            handle: Some(self.output_handle()),
            delivery_count: Some(self.delivery_count),
            link_credit: Some(self.link_credit),
            available: Some(self.available),
            drain: self.drain,
            echo,
            properties: None,
        }
    }

    /// Credit issued by a receiver right after attaching
    pub(crate) fn initial_flow(&mut self) -> Option<Flow> {
        match self.role {
            Role::Receiver if self.credit > 0 => {
                self.link_credit = self.credit;
                Some(self.flow_state(false))
            }
            _ => None,
        }
    }

    /// Replace the credit of a receiver
    pub(crate) fn issue_credit(&mut self, credit: u32, drain: bool) -> Result<Flow, Error> {
        if self.role != Role::Receiver {
            return Err(Error::RoleMismatch {
                expected: Role::Receiver,
            });
        }
        if !self.state.is_attached() {
            return Err(Error::IllegalState);
        }
        self.link_credit = credit;
        self.drain = drain;
        Ok(self.flow_state(false))
    }

    /// Handles the link part of an incoming flow
    pub(crate) fn on_incoming_flow(&mut self, flow: &Flow) -> FlowOutcome {
        match self.role {
            Role::Sender => {
                // link-credit_snd := delivery-count_rcv + link-credit_rcv - delivery-count_snd
                let delivery_count_rcv = flow.delivery_count.unwrap_or(self.initial_delivery_count);
                if let Some(link_credit_rcv) = flow.link_credit {
                    self.link_credit = delivery_count_rcv
                        .wrapping_add(link_credit_rcv)
                        .wrapping_sub(self.delivery_count);
                }

                self.drain = flow.drain;
                if flow.drain {
                    self.delivery_count = self.delivery_count.wrapping_add(self.link_credit);
                    self.link_credit = 0;
                    return FlowOutcome {
                        reply: Some(self.flow_state(false)),
                        credit: Some(0),
                    };
                }

                FlowOutcome {
                    reply: flow.echo.then(|| self.flow_state(false)),
                    credit: Some(self.link_credit),
                }
            }
            Role::Receiver => {
                if let Some(delivery_count_snd) = flow.delivery_count {
                    // the sender advanced its delivery count, e.g. by draining
                    let advanced = delivery_count_snd.wrapping_sub(self.delivery_count);
                    self.link_credit = self.link_credit.saturating_sub(advanced);
                    self.delivery_count = delivery_count_snd;
                }
                if let Some(available) = flow.available {
                    self.available = available;
                }
                if self.link_credit == 0 {
                    self.drain = false;
                }

                FlowOutcome {
                    reply: flow.echo.then(|| self.flow_state(false)),
                    credit: Some(self.link_credit),
                }
            }
        }
    }

    /// Whether a message is sent settled under the sender settle mode
    pub(crate) fn settles(&self, sendable: &Sendable) -> bool {
        match self.snd_settle_mode {
            SenderSettleMode::Settled => true,
            SenderSettleMode::Unsettled => false,
            SenderSettleMode::Mixed => sendable.settled,
        }
    }

    /// Checks that a message may be sent now
    pub(crate) fn check_send(&self) -> Result<Option<DeferReason>, Error> {
        if self.role != Role::Sender {
            return Err(Error::RoleMismatch {
                expected: Role::Sender,
            });
        }
        if !self.state.is_attached() || self.detach_sent {
            return Err(Error::IllegalState);
        }
        if self.link_credit == 0 {
            return Ok(Some(DeferReason::LinkCredit));
        }
        Ok(None)
    }

    /// Consume one credit for an outgoing delivery and build its first transfer
    pub(crate) fn on_send(
        &mut self,
        delivery_id: DeliveryNumber,
        sendable: Sendable,
        settled: bool,
    ) -> (Transfer, Bytes) {
        self.link_credit = self.link_credit.saturating_sub(1);
        self.delivery_count = self.delivery_count.wrapping_add(1);
        if !settled {
            self.unsettled
                .insert(delivery_id, Unsettled::new(sendable.tag.clone(), None));
        }

        let mut transfer = Transfer::new(self.output_handle());
        transfer.delivery_id = Some(delivery_id);
        transfer.delivery_tag = Some(sendable.tag);
        transfer.message_format = Some(sendable.message_format);
        transfer.settled = Some(settled);
        (transfer, sendable.payload)
    }

    /// Size of the delivery being assembled
    pub(crate) fn incomplete_len(&self) -> usize {
        self.incomplete.as_ref().map(|d| d.buffer.len()).unwrap_or(0)
    }

    /// Handles an incoming transfer frame at a receiver
    pub(crate) fn on_incoming_transfer(
        &mut self,
        transfer: Transfer,
        payload: Bytes,
    ) -> Result<Incoming, Error> {
        if self.role != Role::Receiver {
            return Err(Error::RoleMismatch {
                expected: Role::Receiver,
            });
        }
        if !self.state.is_attached() {
            return Err(Error::IllegalState);
        }

        let mut incomplete = match self.incomplete.take() {
            None => {
                let delivery_id = transfer.delivery_id.ok_or(Error::MissingField("delivery-id"))?;
                let delivery_tag = transfer
                    .delivery_tag
                    .ok_or(Error::MissingField("delivery-tag"))?;
                if self.link_credit == 0 {
                    return Err(Error::TransferLimitExceeded);
                }
                if matches!(transfer.state, Some(DeliveryState::Received(_))) && !transfer.resume {
                    return Err(Error::MisplacedReceived);
                }
                IncompleteDelivery {
                    delivery_id,
                    delivery_tag,
                    message_format: transfer.message_format.unwrap_or(DEFAULT_MESSAGE_FORMAT),
                    settled: transfer.settled.unwrap_or(false),
                    state: transfer.state,
                    rcv_settle_mode: transfer.rcv_settle_mode,
                    buffer: BytesMut::new(),
                }
            }
            Some(mut incomplete) => {
                if transfer
                    .delivery_id
                    .is_some_and(|id| id != incomplete.delivery_id)
                {
                    return Err(Error::InconsistentTransfer);
                }
                match transfer.state {
                    Some(DeliveryState::Received(_)) => return Err(Error::MisplacedReceived),
                    Some(state) => incomplete.state = Some(state),
                    None => {}
                }
                if transfer.settled == Some(true) {
                    incomplete.settled = true;
                }
                incomplete
            }
        };

        if transfer.aborted {
            self.consume_credit();
            return Ok(Incoming::Aborted {
                delivery_id: incomplete.delivery_id,
                delivery_tag: incomplete.delivery_tag,
            });
        }

        incomplete.buffer.extend_from_slice(&payload);
        let size = incomplete.buffer.len() as u64;
        if self.max_message_size > 0 && size > self.max_message_size {
            return Err(Error::MessageSizeExceeded {
                size,
                max: self.max_message_size,
            });
        }

        if transfer.more {
            self.incomplete = Some(incomplete);
            return Ok(Incoming::Partial);
        }

        self.consume_credit();
        let delivery = incomplete.into_delivery();
        if !delivery.settled {
            self.unsettled.insert(
                delivery.delivery_id,
                Unsettled::new(delivery.delivery_tag.clone(), delivery.state.clone()),
            );
        }
        Ok(Incoming::Complete(delivery))
    }

    fn consume_credit(&mut self) {
        self.link_credit = self.link_credit.saturating_sub(1);
        self.delivery_count = self.delivery_count.wrapping_add(1);
    }

    /// Re-issue the configured credit once half of it is used
    pub(crate) fn auto_credit_flow(&mut self) -> Option<Flow> {
        if self.auto_credit && self.role == Role::Receiver && self.link_credit <= self.credit / 2 {
            self.link_credit = self.credit;
            return Some(self.flow_state(false));
        }
        None
    }

    fn record_state(
        unsettled: &mut Unsettled,
        delivery_id: DeliveryNumber,
        state: Option<DeliveryState>,
    ) -> Result<(), Error> {
        let state = match state {
            Some(state) => state,
            None => return Ok(()),
        };
        match &unsettled.state {
            Some(current) if current.is_terminal() => {
                if *current != state {
                    return Err(Error::TerminalStateChanged { delivery_id });
                }
            }
            _ => {
                if state.increments_delivery_count() {
                    unsettled.delivery_count += 1;
                }
                unsettled.state = Some(state);
            }
        }
        Ok(())
    }

    /// Handles a disposition from the peer covering `delivery_id`
    pub(crate) fn on_disposition(
        &mut self,
        delivery_id: DeliveryNumber,
        settled: bool,
        state: Option<DeliveryState>,
    ) -> Result<DispositionOutcome, Error> {
        let entry = match self.unsettled.get_mut(&delivery_id) {
            Some(entry) => entry,
            None => return Ok(DispositionOutcome::Ignored),
        };

        // only the receiving end reports progress with `received`
        if self.role == Role::Receiver && matches!(state, Some(DeliveryState::Received(_))) {
            return Err(Error::MisplacedReceived);
        }
        Self::record_state(entry, delivery_id, state)?;

        let terminal = entry.state.as_ref().is_some_and(|s| s.is_terminal());
        if settled || (self.role == Role::Sender && terminal) {
            let reply = (!settled).then(|| Disposition {
                role: self.role,
                first: delivery_id,
                last: None,
                settled: true,
                state: entry.state.clone(),
                batchable: false,
            });
            let delivery = self.take_settled(delivery_id);
            return Ok(match delivery {
                Some(delivery) => DispositionOutcome::Settled { delivery, reply },
                None => DispositionOutcome::Ignored,
            });
        }

        Ok(DispositionOutcome::Updated {
            delivery_id,
            state: entry.state.clone(),
        })
    }

    fn take_settled(&mut self, delivery_id: DeliveryNumber) -> Option<SettledDelivery> {
        self.unsettled
            .remove(&delivery_id)
            .map(|unsettled| SettledDelivery {
                delivery_id,
                tag: unsettled.tag,
                state: unsettled.state,
                delivery_count: unsettled.delivery_count,
            })
    }

    /// Update or settle an unsettled delivery locally
    pub(crate) fn dispose(
        &mut self,
        delivery_id: DeliveryNumber,
        state: Option<DeliveryState>,
        settled: bool,
    ) -> Result<(Disposition, Option<SettledDelivery>), Error> {
        if self.role == Role::Sender && matches!(state, Some(DeliveryState::Received(_))) {
            return Err(Error::MisplacedReceived);
        }
        let entry = self
            .unsettled
            .get_mut(&delivery_id)
            .ok_or(Error::DeliveryNotFound(delivery_id))?;
        Self::record_state(entry, delivery_id, state)?;

        let disposition = Disposition {
            role: self.role,
            first: delivery_id,
            last: None,
            settled,
            state: entry.state.clone(),
            batchable: false,
        };
        let settled = if settled {
            self.take_settled(delivery_id)
        } else {
            None
        };
        Ok((disposition, settled))
    }

    /// Local detach. A link the peer attached but nobody accepted is attached without
    /// termini first
    pub(crate) fn detach(
        &mut self,
        closed: bool,
        error: Option<definitions::Error>,
    ) -> Result<(Option<Attach>, Detach), Error> {
        if self.detach_sent {
            return Err(Error::IllegalState);
        }
        let attach = match self.state {
            LinkState::AttachReceived => Some(self.refuse_attach()?),
            _ => None,
        };
        self.transition(LinkEvent::DetachSent)?;
        self.detach_sent = true;
        Ok((
            attach,
            Detach {
                handle: self.output_handle(),
                closed,
                error,
            },
        ))
    }

    /// The peer violated the protocol on this link
    pub(crate) fn fail(&mut self, error: &Error) -> Detach {
        let error = definitions::Error::from(error);
        // entering `Error` is allowed from every state
        self.transition(LinkEvent::Failed).ok();
        self.detach_sent = true;
        self.incomplete = None;
        self.local_error = Some(error.clone());
        Detach {
            handle: self.output_handle(),
            closed: true,
            error: Some(error),
        }
    }

    /// The peer detached. Returns the echo if no local detach has been sent
    pub(crate) fn on_incoming_detach(&mut self, detach: &Detach) -> Result<Option<Detach>, Error> {
        self.transition(LinkEvent::DetachReceived)?;
        if self.detach_sent {
            return Ok(None);
        }
        self.detach_sent = true;
        Ok(Some(Detach {
            handle: self.output_handle(),
            closed: detach.closed,
            error: None,
        }))
    }

    /// Take every unsettled delivery, used on teardown
    pub(crate) fn take_unsettled(&mut self) -> Vec<SettledDelivery> {
        std::mem::take(&mut self.unsettled)
            .into_iter()
            .map(|(delivery_id, unsettled)| SettledDelivery {
                delivery_id,
                tag: unsettled.tag,
                state: unsettled.state,
                delivery_count: unsettled.delivery_count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use ferrum_types::{
        definitions::{Handle, Role},
        messaging::{DeliveryState, Modified, Received, Source},
        performatives::{Attach, Flow, Transfer},
    };

    use super::{
        Acceptance, DeferReason, DispositionOutcome, Error, Incoming, Link, LinkId, LinkState,
        Sendable,
    };

    fn attached(role: Role, credit: u32) -> (Link, Attach) {
        let builder = match role {
            Role::Sender => Link::builder().name("l").sender().target("q"),
            Role::Receiver => Link::builder().name("l").receiver().source("q").credit(credit),
        };
        let mut link = Link::local(LinkId(0), builder).unwrap();
        let ours = link.send_attach().unwrap();
        let mut theirs = ours.clone();
        theirs.role = role.opposite();
        theirs.handle = Handle(5);
        theirs.initial_delivery_count = match role {
            Role::Sender => None,
            Role::Receiver => Some(100),
        };
        link.on_incoming_attach(theirs).unwrap();
        assert_eq!(link.state(), LinkState::Attached);
        (link, ours)
    }

    fn flow(delivery_count: Option<u32>, link_credit: u32) -> Flow {
        Flow {
            next_incoming_id: Some(0),
            incoming_window: 65536,
            next_outgoing_id: 0,
            outgoing_window: 65536,
            handle: Some(Handle(5)),
            delivery_count,
            link_credit: Some(link_credit),
            available: None,
            drain: false,
            echo: false,
            properties: None,
        }
    }

    fn first_transfer(delivery_id: u32) -> Transfer {
        let mut transfer = Transfer::new(Handle(5));
        transfer.delivery_id = Some(delivery_id);
        transfer.delivery_tag = Some(Bytes::copy_from_slice(&delivery_id.to_be_bytes()));
        transfer
    }

    #[test]
    fn sender_credit_formula() {
        let (mut link, _) = attached(Role::Sender, 0);
        // receiver has not seen a transfer yet, delivery-count_rcv defaults to the initial one
        link.on_incoming_flow(&flow(None, 10));
        assert_eq!(link.link_credit(), 10);

        let (transfer, _) = link.on_send(0, Sendable::new(&b"a"[..], &b"x"[..]), false);
        assert_eq!(transfer.delivery_id, Some(0));
        assert_eq!(link.link_credit(), 9);
        assert_eq!(link.delivery_count(), 1);

        link.on_incoming_flow(&flow(Some(1), 5));
        assert_eq!(link.link_credit(), 5);
    }

    #[test]
    fn sender_credit_wraps() {
        let builder = Link::builder()
            .name("l")
            .sender()
            .initial_delivery_count(u32::MAX);
        let mut link = Link::local(LinkId(0), builder).unwrap();
        link.send_attach().unwrap();
        let mut attach = link.attach_performative();
        attach.role = Role::Receiver;
        link.on_incoming_attach(attach).unwrap();

        link.on_incoming_flow(&flow(Some(u32::MAX), 2));
        link.on_send(0, Sendable::new(&b"a"[..], Bytes::new()), true);
        assert_eq!(link.delivery_count(), 0);
        link.on_incoming_flow(&flow(Some(0), 2));
        assert_eq!(link.link_credit(), 2);
    }

    #[test]
    fn drain_consumes_all_credit() {
        let (mut link, _) = attached(Role::Sender, 0);
        let mut drain = flow(Some(0), 7);
        drain.drain = true;
        let outcome = link.on_incoming_flow(&drain);
        assert_eq!(link.link_credit(), 0);
        assert_eq!(link.delivery_count(), 7);
        let reply = outcome.reply.unwrap();
        assert_eq!(reply.delivery_count, Some(7));
        assert_eq!(reply.link_credit, Some(0));
    }

    #[test]
    fn echo_requests_a_reply() {
        let (mut link, _) = attached(Role::Sender, 0);
        let mut echo = flow(Some(0), 1);
        echo.echo = true;
        assert!(link.on_incoming_flow(&echo).reply.is_some());
        assert!(link.on_incoming_flow(&flow(Some(0), 1)).reply.is_none());
    }

    #[test]
    fn zero_credit_defers() {
        let (link, _) = attached(Role::Sender, 0);
        assert_eq!(link.check_send().unwrap(), Some(DeferReason::LinkCredit));
    }

    #[test]
    fn receiver_takes_delivery_count_from_attach() {
        let (mut link, _) = attached(Role::Receiver, 10);
        assert_eq!(link.delivery_count(), 100);
        let flow = link.initial_flow().unwrap();
        assert_eq!(flow.link_credit, Some(10));
        assert_eq!(flow.delivery_count, Some(100));
        assert_eq!(flow.handle, Some(Handle(0)));
    }

    #[test]
    fn receiver_flow_from_draining_sender() {
        let (mut link, _) = attached(Role::Receiver, 10);
        link.initial_flow();
        let outcome = link.on_incoming_flow(&flow(Some(110), 0));
        assert_eq!(outcome.credit, Some(0));
        assert_eq!(link.delivery_count(), 110);
    }

    #[test]
    fn transfer_without_credit_is_rejected() {
        let (mut link, _) = attached(Role::Receiver, 0);
        assert!(link.initial_flow().is_none());
        assert_eq!(
            link.on_incoming_transfer(first_transfer(0), Bytes::new()).unwrap_err(),
            Error::TransferLimitExceeded
        );
    }

    #[test]
    fn first_transfer_needs_id_and_tag() {
        let (mut link, _) = attached(Role::Receiver, 10);
        link.initial_flow();
        let transfer = Transfer::new(Handle(5));
        assert_eq!(
            link.on_incoming_transfer(transfer, Bytes::new()).unwrap_err(),
            Error::MissingField("delivery-id")
        );
    }

    #[test]
    fn multi_frame_delivery() {
        let (mut link, _) = attached(Role::Receiver, 10);
        link.initial_flow();

        let mut first = first_transfer(3);
        first.more = true;
        assert!(matches!(
            link.on_incoming_transfer(first, Bytes::from_static(b"hello ")).unwrap(),
            Incoming::Partial
        ));
        assert_eq!(link.incomplete_len(), 6);

        let mut other = Transfer::new(Handle(5));
        other.delivery_id = Some(4);
        assert_eq!(
            link.on_incoming_transfer(other, Bytes::new()).unwrap_err(),
            Error::InconsistentTransfer
        );
    }

    #[test]
    fn multi_frame_delivery_completes() {
        let (mut link, _) = attached(Role::Receiver, 10);
        link.initial_flow();

        let mut first = first_transfer(3);
        first.more = true;
        link.on_incoming_transfer(first, Bytes::from_static(b"hello "))
            .unwrap();
        let last = Transfer::new(Handle(5));
        match link.on_incoming_transfer(last, Bytes::from_static(b"world")).unwrap() {
            Incoming::Complete(delivery) => {
                assert_eq!(&delivery.payload[..], b"hello world");
                assert_eq!(delivery.delivery_id, 3);
                assert!(!delivery.settled);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(link.link_credit(), 9);
        assert_eq!(link.delivery_count(), 101);
        assert!(link.is_unsettled(3));
    }

    #[test]
    fn aborted_delivery_consumes_credit() {
        let (mut link, _) = attached(Role::Receiver, 10);
        link.initial_flow();
        let mut transfer = first_transfer(0);
        transfer.aborted = true;
        assert!(matches!(
            link.on_incoming_transfer(transfer, Bytes::new()).unwrap(),
            Incoming::Aborted { delivery_id: 0, .. }
        ));
        assert_eq!(link.link_credit(), 9);
        assert!(!link.is_unsettled(0));
    }

    #[test]
    fn received_only_on_resumed_first_transfer() {
        let (mut link, _) = attached(Role::Receiver, 10);
        link.initial_flow();
        let mut transfer = first_transfer(0);
        transfer.state = Some(DeliveryState::Received(Received {
            section_number: 0,
            section_offset: 0,
        }));
        assert_eq!(
            link.on_incoming_transfer(transfer.clone(), Bytes::new()).unwrap_err(),
            Error::MisplacedReceived
        );

        transfer.resume = true;
        assert!(link.on_incoming_transfer(transfer, Bytes::new()).is_ok());
    }

    #[test]
    fn message_size_limit() {
        let builder = Link::builder().name("l").receiver().max_message_size(4);
        let mut link = Link::local(LinkId(0), builder).unwrap();
        link.send_attach().unwrap();
        let mut attach = link.attach_performative();
        attach.role = Role::Sender;
        attach.initial_delivery_count = Some(0);
        link.on_incoming_attach(attach).unwrap();
        link.initial_flow();

        assert_eq!(
            link.on_incoming_transfer(first_transfer(0), Bytes::from_static(b"12345"))
                .unwrap_err(),
            Error::MessageSizeExceeded { size: 5, max: 4 }
        );
    }

    #[test]
    fn terminal_state_cannot_change() {
        let (mut link, _) = attached(Role::Sender, 0);
        link.on_incoming_flow(&flow(None, 10));
        link.on_send(0, Sendable::new(&b"a"[..], Bytes::new()), false);

        let (mut receiver, _) = attached(Role::Receiver, 10);
        receiver.initial_flow();
        receiver
            .on_incoming_transfer(first_transfer(0), Bytes::new())
            .unwrap();
        receiver
            .dispose(0, Some(DeliveryState::accepted()), false)
            .unwrap();
        receiver
            .dispose(0, Some(DeliveryState::accepted()), false)
            .unwrap();
        assert_eq!(
            receiver
                .dispose(0, Some(DeliveryState::released()), false)
                .unwrap_err(),
            Error::TerminalStateChanged { delivery_id: 0 }
        );
    }

    #[test]
    fn sender_settles_on_terminal_disposition() {
        let (mut link, _) = attached(Role::Sender, 0);
        link.on_incoming_flow(&flow(None, 10));
        link.on_send(0, Sendable::new(&b"a"[..], Bytes::new()), false);

        match link
            .on_disposition(0, false, Some(DeliveryState::rejected(None)))
            .unwrap()
        {
            DispositionOutcome::Settled { delivery, reply } => {
                assert_eq!(delivery.delivery_count, 1);
                let reply = reply.unwrap();
                assert!(reply.settled);
                assert_eq!(reply.role, Role::Sender);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(link.unsettled_count(), 0);
        assert_eq!(link.link_credit(), 9);
    }

    #[test]
    fn modified_delivery_failed_counts() {
        let (mut receiver, _) = attached(Role::Receiver, 10);
        receiver.initial_flow();
        receiver
            .on_incoming_transfer(first_transfer(0), Bytes::new())
            .unwrap();
        let modified = DeliveryState::Modified(Modified {
            delivery_failed: Some(true),
            ..Default::default()
        });
        let (disposition, settled) = receiver.dispose(0, Some(modified), true).unwrap();
        assert!(disposition.settled);
        assert_eq!(settled.unwrap().delivery_count, 1);
    }

    #[test]
    fn receiver_rejects_received_from_sender() {
        let (mut receiver, _) = attached(Role::Receiver, 10);
        receiver.initial_flow();
        receiver
            .on_incoming_transfer(first_transfer(0), Bytes::new())
            .unwrap();
        let received = DeliveryState::Received(Received {
            section_number: 0,
            section_offset: 1,
        });
        assert_eq!(
            receiver.on_disposition(0, false, Some(received)).unwrap_err(),
            Error::MisplacedReceived
        );
    }

    #[test]
    fn accept_remote_dynamic_receiver() {
        let mut attach = Attach {
            name: "dyn".into(),
            handle: Handle(0),
            role: Role::Receiver,
            snd_settle_mode: Default::default(),
            rcv_settle_mode: Default::default(),
            source: Some(Box::new(Source::builder().dynamic(true).build())),
            target: None,
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: None,
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        let mut link = Link::remote(LinkId(1), attach.clone());
        assert_eq!(link.role(), Role::Sender);
        assert_eq!(
            link.accept(Acceptance::default()).unwrap_err(),
            Error::MissingField("dynamic-address")
        );

        let reply = link
            .accept(Acceptance {
                dynamic_address: Some("tmp-1".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(reply.source.unwrap().address.as_deref(), Some("tmp-1"));
        assert_eq!(reply.initial_delivery_count, Some(0));
        assert_eq!(link.state(), LinkState::Attached);

        attach.name = "other".into();
        let mut link = Link::remote(LinkId(2), attach);
        let (refusal, detach) = link.detach(true, None).unwrap();
        assert!(refusal.unwrap().source.is_none());
        assert!(detach.closed);
    }

    #[test]
    fn failed_link_detaches_with_error() {
        let (mut link, _) = attached(Role::Receiver, 10);
        let detach = link.fail(&Error::TransferLimitExceeded);
        assert!(detach.closed);
        assert!(detach.error.is_some());
        assert!(link.is_errant());
        assert_eq!(link.on_incoming_detach(&detach).unwrap(), None);
        assert_eq!(link.state(), LinkState::Detached);
    }
}
