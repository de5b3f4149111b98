//! Session endpoints
//!
//! A [`Session`] owns its links in an arena keyed by [`LinkId`], maps the peer's handles to
//! them and routes dispositions by delivery id. Windows are counted in bytes of unsettled
//! transfer payload.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use ferrum_types::{
    definitions::{self, DeliveryNumber, Handle, Role, TransferNumber},
    messaging::DeliveryState,
    performatives::{Attach, Begin, Detach, Disposition, End, Flow, Transfer},
};
use slab::Slab;
use tracing::{debug, instrument, trace};

use crate::{
    event::{Effects, Event},
    frames::{split_transfer, FrameBody},
    link::{
        self, Acceptance, DeferReason, DispositionOutcome, Incoming, Link, LinkId, LinkState,
        SendOutcome, Sendable, SessionTransferState, SettleReason, SettledDelivery,
    },
};

mod config;
mod error;
mod state;

pub use config::{SessionConfig, DEFAULT_HANDLE_MAX};
pub use error::Error;
pub use state::{SessionEvent, SessionState};

/// Identifies a session within its connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub usize);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session {}", self.0)
    }
}

/// Where an unsettled delivery lives and how many window bytes it holds
#[derive(Debug, Clone, Copy)]
struct DeliveryEntry {
    link: LinkId,
    size: u32,
}

/// A session endpoint
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    config: SessionConfig,
    outgoing_channel: Option<u16>,
    incoming_channel: Option<u16>,

    next_outgoing_id: TransferNumber,
    next_incoming_id: TransferNumber,
    next_delivery_id: DeliveryNumber,
    remote_incoming_window: u32,
    remote_outgoing_window: u32,
    remote_handle_max: Option<u32>,

    incoming_unsettled_bytes: u64,
    outgoing_unsettled_bytes: u64,
    incoming_deliveries: BTreeMap<DeliveryNumber, DeliveryEntry>,
    outgoing_deliveries: BTreeMap<DeliveryNumber, DeliveryEntry>,

    links: Slab<Link>,
    input_handles: HashMap<Handle, LinkId>,

    local_error: Option<definitions::Error>,
    remote_error: Option<definitions::Error>,
}

impl Session {
    pub(crate) fn new(id: SessionId, config: SessionConfig) -> Self {
        Self {
            id,
            state: SessionState::Unmapped,
            config,
            outgoing_channel: None,
            incoming_channel: None,
            next_outgoing_id: 0,
            next_incoming_id: 0,
            next_delivery_id: 0,
            remote_incoming_window: 0,
            remote_outgoing_window: 0,
            remote_handle_max: None,
            incoming_unsettled_bytes: 0,
            outgoing_unsettled_bytes: 0,
            incoming_deliveries: BTreeMap::new(),
            outgoing_deliveries: BTreeMap::new(),
            links: Slab::new(),
            input_handles: HashMap::new(),
            local_error: None,
            remote_error: None,
        }
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Settings of the session
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Channel of outgoing frames, once allocated
    pub fn outgoing_channel(&self) -> Option<u16> {
        self.outgoing_channel
    }

    /// Channel of incoming frames, once the peer's begin arrived
    pub fn incoming_channel(&self) -> Option<u16> {
        self.incoming_channel
    }

    /// Transfer id of the next outgoing transfer frame
    pub fn next_outgoing_id(&self) -> TransferNumber {
        self.next_outgoing_id
    }

    /// Transfer id expected on the next incoming transfer frame
    pub fn next_incoming_id(&self) -> TransferNumber {
        self.next_incoming_id
    }

    /// Incoming window the peer advertised
    pub fn remote_incoming_window(&self) -> u32 {
        self.remote_incoming_window
    }

    /// Outgoing window the peer advertised
    pub fn remote_outgoing_window(&self) -> u32 {
        self.remote_outgoing_window
    }

    /// Bytes of received deliveries that are not settled yet
    pub fn incoming_unsettled_bytes(&self) -> u64 {
        self.incoming_unsettled_bytes
    }

    /// Bytes of sent deliveries that are not settled yet
    pub fn outgoing_unsettled_bytes(&self) -> u64 {
        self.outgoing_unsettled_bytes
    }

    /// Whether an unsettled send of `len` bytes fits the windows now
    pub fn transfer_state(&self, len: usize) -> SessionTransferState {
        if !self.state.can_send() || self.state == SessionState::BeginSent {
            return SessionTransferState::Error;
        }
        if self.fits_windows(len as u64, false) {
            SessionTransferState::Okay
        } else {
            SessionTransferState::Busy
        }
    }

    /// A link of the session
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    /// Links of the session
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().map(|(_, link)| link)
    }

    pub(crate) fn error(&self) -> Option<&definitions::Error> {
        self.remote_error.as_ref().or(self.local_error.as_ref())
    }

    fn transition(&mut self, event: SessionEvent) -> Result<(), Error> {
        let next = self.state.transition(event)?;
        debug!(session = self.id.0, from = ?self.state, to = ?next, "session state");
        self.state = next;
        Ok(())
    }

    fn channel(&self) -> Result<u16, Error> {
        self.outgoing_channel.ok_or(Error::IllegalState)
    }

    fn begin_performative(&self, remote_channel: Option<u16>) -> Begin {
        Begin {
            remote_channel,
            next_outgoing_id: self.next_outgoing_id,
            incoming_window: self.config.incoming_window,
            outgoing_window: self.config.outgoing_window,
            handle_max: Handle(self.config.handle_max),
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        }
    }

    /// Fill in the session fields of a flow carrying link state
    fn session_flow(&self, mut flow: Flow) -> Flow {
        flow.next_incoming_id = self.incoming_channel.map(|_| self.next_incoming_id);
        flow.incoming_window = self.config.incoming_window;
        flow.next_outgoing_id = self.next_outgoing_id;
        flow.outgoing_window = self.config.outgoing_window;
        flow
    }

    fn send_flow(&self, flow: Flow, fx: &mut Effects) -> Result<(), Error> {
        let channel = self.channel()?;
        fx.frame(channel, self.session_flow(flow));
        Ok(())
    }

    /* ------------------------------------------------------------------ */
    /*                              Outbound                              */
    /* ------------------------------------------------------------------ */

    /// Send the locally initiated begin
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn send_begin(&mut self, channel: u16, fx: &mut Effects) -> Result<(), Error> {
        self.transition(SessionEvent::BeginSent)?;
        self.outgoing_channel = Some(channel);
        let begin = self.begin_performative(None);
        trace!(channel, frame = ?begin);
        fx.frame(channel, begin);
        Ok(())
    }

    /// Answer the peer's begin
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn accept(&mut self, channel: u16, fx: &mut Effects) -> Result<(), Error> {
        if self.state != SessionState::BeginReceived {
            return Err(Error::IllegalState);
        }
        self.transition(SessionEvent::BeginSent)?;
        self.outgoing_channel = Some(channel);
        let begin = self.begin_performative(self.incoming_channel);
        trace!(channel, frame = ?begin);
        fx.frame(channel, begin);
        fx.event(Event::SessionBegun { session: self.id });
        Ok(())
    }

    /// Local end
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn end(
        &mut self,
        error: Option<definitions::Error>,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        let channel = self.channel()?;
        self.transition(SessionEvent::EndSent {
            error: error.is_some(),
        })?;
        if error.is_some() {
            self.local_error = error.clone();
        }
        let end = End { error };
        trace!(channel, frame = ?end);
        fx.frame(channel, end);
        Ok(())
    }

    /// End the session because the peer violated the protocol
    fn fail(&mut self, error: Error, fx: &mut Effects) {
        tracing::error!(session = self.id.0, %error, "session error");
        let error = definitions::Error::from(&error);
        if self.outgoing_channel.is_none() {
            // no begin was sent, so there is no end to send either
            debug!(session = self.id.0, from = ?self.state, "session abandoned");
            self.local_error = Some(error);
            self.state = SessionState::Unmapped;
            return;
        }
        if self.end(Some(error), fx).is_err() {
            debug!(session = self.id.0, state = ?self.state, "end already sent");
        }
    }

    fn check_link_name(&self, name: &str) -> Result<(), link::Error> {
        if self.links.iter().any(|(_, link)| link.name() == name) {
            return Err(link::Error::DuplicatedLinkName);
        }
        Ok(())
    }

    fn check_handle(&self, key: usize) -> Result<(), link::Error> {
        let local_max = self.config.handle_max;
        let max = self
            .remote_handle_max
            .map_or(local_max, |remote| remote.min(local_max));
        if key > max as usize {
            return Err(link::Error::HandleMaxReached);
        }
        Ok(())
    }

    /// Local attach
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn attach(
        &mut self,
        builder: link::Builder,
        fx: &mut Effects,
    ) -> Result<LinkId, Error> {
        if !matches!(self.state, SessionState::BeginSent | SessionState::Mapped) {
            return Err(Error::IllegalState);
        }
        let channel = self.channel()?;
        let id = LinkId(self.links.vacant_key());

        let wrap = |error| Error::Link { id, error };
        let mut link = Link::local(id, builder).map_err(wrap)?;
        self.check_link_name(link.name()).map_err(wrap)?;
        self.check_handle(id.0).map_err(wrap)?;

        let attach = link.send_attach().map_err(wrap)?;
        trace!(channel, frame = ?attach);
        fx.frame(channel, attach);
        self.links.insert(link);
        Ok(id)
    }

    fn link_mut(&mut self, id: LinkId) -> Result<&mut Link, Error> {
        self.links.get_mut(id.0).ok_or(Error::LinkNotFound(id))
    }

    /// Answer a link the peer attached
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn accept_link(
        &mut self,
        id: LinkId,
        acceptance: Acceptance,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        let channel = self.channel()?;
        let session = self.id;
        let link = self.link_mut(id)?;
        let attach = link
            .accept(acceptance)
            .map_err(|error| Error::Link { id, error })?;
        trace!(channel, frame = ?attach);
        fx.frame(channel, attach);
        fx.event(Event::LinkAttached { session, link: id });

        if let Some(flow) = link.initial_flow() {
            self.send_flow(flow, fx)?;
        }
        Ok(())
    }

    /// Replace the credit of a receiver link
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn flow(
        &mut self,
        id: LinkId,
        credit: u32,
        drain: bool,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        if !self.state.can_send() {
            return Err(Error::IllegalState);
        }
        let flow = self
            .link_mut(id)?
            .issue_credit(credit, drain)
            .map_err(|error| Error::Link { id, error })?;
        self.send_flow(flow, fx)
    }

    fn fits_windows(&self, len: u64, settled: bool) -> bool {
        if settled {
            return len <= u64::from(self.remote_incoming_window);
        }
        let outstanding = self.outgoing_unsettled_bytes + len;
        outstanding <= u64::from(self.remote_incoming_window)
            && outstanding <= u64::from(self.config.outgoing_window)
    }

    /// Send a message on a sender link
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn send(
        &mut self,
        id: LinkId,
        sendable: Sendable,
        max_frame_size: usize,
        fx: &mut Effects,
    ) -> Result<SendOutcome, Error> {
        if self.state != SessionState::Mapped {
            return Err(Error::IllegalState);
        }
        let channel = self.channel()?;
        let wrap = |error| Error::Link { id, error };

        let link = self.links.get(id.0).ok_or(Error::LinkNotFound(id))?;
        if let Some(reason) = link.check_send().map_err(wrap)? {
            return Ok(SendOutcome::Deferred(SessionTransferState::Busy, reason));
        }
        let settled = link.settles(&sendable);
        let len = sendable.payload.len();
        if !self.fits_windows(len as u64, settled) {
            return Ok(SendOutcome::Deferred(
                SessionTransferState::Busy,
                DeferReason::SessionWindow,
            ));
        }

        let delivery_id = self.next_delivery_id;
        let (transfer, payload) = self.link_mut(id)?.on_send(delivery_id, sendable, settled);
        let frames = split_transfer(transfer, payload, max_frame_size).map_err(|err| {
            tracing::error!(%err, "transfer cannot be framed");
            Error::IllegalState
        })?;

        self.next_delivery_id = self.next_delivery_id.wrapping_add(1);
        for (performative, payload) in frames {
            trace!(channel, frame = ?performative, payload.len = payload.len());
            self.next_outgoing_id = self.next_outgoing_id.wrapping_add(1);
            fx.frame(
                channel,
                FrameBody::Transfer {
                    performative,
                    payload,
                },
            );
        }

        if !settled {
            // window sizes are u32 so an accepted unsettled payload fits
            let size = u32::try_from(len).unwrap_or(u32::MAX);
            self.outgoing_unsettled_bytes += u64::from(size);
            self.outgoing_deliveries
                .insert(delivery_id, DeliveryEntry { link: id, size });
        }
        Ok(SendOutcome::Sent { delivery_id })
    }

    fn release_delivery(&mut self, role: Role, delivery_id: DeliveryNumber) {
        let (map, bytes) = match role {
            Role::Sender => (&mut self.outgoing_deliveries, &mut self.outgoing_unsettled_bytes),
            Role::Receiver => (&mut self.incoming_deliveries, &mut self.incoming_unsettled_bytes),
        };
        if let Some(entry) = map.remove(&delivery_id) {
            *bytes = bytes.saturating_sub(u64::from(entry.size));
        }
    }

    fn settled_event(&self, link: LinkId, delivery: SettledDelivery, reason: SettleReason) -> Event {
        Event::Settled {
            session: self.id,
            link,
            delivery_id: delivery.delivery_id,
            tag: delivery.tag,
            state: delivery.state,
            reason,
            delivery_count: delivery.delivery_count,
        }
    }

    /// Update or settle a delivery locally
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn dispose(
        &mut self,
        id: LinkId,
        delivery_id: DeliveryNumber,
        state: Option<DeliveryState>,
        settled: bool,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        if !self.state.can_send() {
            return Err(Error::IllegalState);
        }
        let channel = self.channel()?;
        let link = self.link_mut(id)?;
        let role = link.role();
        let (disposition, settled) = link
            .dispose(delivery_id, state, settled)
            .map_err(|error| Error::Link { id, error })?;
        trace!(channel, frame = ?disposition);
        fx.frame(channel, disposition);

        if let Some(delivery) = settled {
            self.release_delivery(role, delivery_id);
            fx.event(self.settled_event(id, delivery, SettleReason::Settled));
        }
        Ok(())
    }

    /// Local detach
    #[instrument(name = "SEND", skip_all, fields(session = self.id.0))]
    pub(crate) fn detach(
        &mut self,
        id: LinkId,
        closed: bool,
        error: Option<definitions::Error>,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        if !self.state.can_send() {
            return Err(Error::IllegalState);
        }
        let channel = self.channel()?;
        let (attach, detach) = self
            .link_mut(id)?
            .detach(closed, error)
            .map_err(|error| Error::Link { id, error })?;
        if let Some(attach) = attach {
            trace!(channel, frame = ?attach);
            fx.frame(channel, attach);
        }
        trace!(channel, frame = ?detach);
        fx.frame(channel, detach);
        Ok(())
    }

    /// Detach a link with an error because the peer violated the protocol on it
    fn fail_link(&mut self, id: LinkId, error: link::Error, fx: &mut Effects) {
        tracing::error!(session = self.id.0, link = id.0, %error, "link error");
        let channel = match self.outgoing_channel {
            Some(channel) => channel,
            None => return,
        };
        if let Some(link) = self.links.get_mut(id.0) {
            let detach = link.fail(&error);
            trace!(channel, frame = ?detach);
            fx.frame(channel, detach);
        }
    }

    /// Remove a link after both detaches, cancelling what is still unsettled
    fn remove_link(&mut self, id: LinkId, closed: bool, error: Option<definitions::Error>, fx: &mut Effects) {
        if !self.links.contains(id.0) {
            return;
        }
        let mut link = self.links.remove(id.0);
        if let Some(handle) = link.input_handle() {
            self.input_handles.remove(&handle);
        }
        let role = link.role();
        for delivery in link.take_unsettled() {
            self.release_delivery(role, delivery.delivery_id);
            fx.event(self.settled_event(id, delivery, SettleReason::Cancelled));
        }
        fx.event(Event::LinkDetached {
            session: self.id,
            link: id,
            closed,
            error: error.or_else(|| link.local_error().cloned()),
        });
    }

    /// Cancel everything left once the session is unmapped
    pub(crate) fn teardown(&mut self, fx: &mut Effects) {
        let ids: Vec<LinkId> = self.links.iter().map(|(key, _)| LinkId(key)).collect();
        for id in ids {
            let mut link = self.links.remove(id.0);
            let role = link.role();
            for delivery in link.take_unsettled() {
                self.release_delivery(role, delivery.delivery_id);
                fx.event(self.settled_event(id, delivery, SettleReason::Cancelled));
            }
        }
        self.input_handles.clear();
    }

    /* ------------------------------------------------------------------ */
    /*                               Inbound                              */
    /* ------------------------------------------------------------------ */

    /// The peer's begin, either answering ours or starting a new session
    #[instrument(name = "RECV", skip_all, fields(session = self.id.0))]
    pub(crate) fn on_incoming_begin(
        &mut self,
        channel: u16,
        begin: Begin,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        trace!(channel, frame = ?begin);
        self.transition(SessionEvent::BeginReceived)?;
        self.incoming_channel = Some(channel);
        self.next_incoming_id = begin.next_outgoing_id;
        self.remote_incoming_window = begin.incoming_window;
        self.remote_outgoing_window = begin.outgoing_window;
        self.remote_handle_max = Some(begin.handle_max.0);
        if self.state == SessionState::Mapped {
            fx.event(Event::SessionBegun { session: self.id });
        }
        Ok(())
    }

    /// Frames on the session's incoming channel other than `begin`
    ///
    /// Frames are still handled once the session cannot send, their replies are dropped.
    pub(crate) fn on_incoming_frame(&mut self, channel: u16, body: FrameBody, fx: &mut Effects) {
        if self.state.can_send() {
            return self.dispatch_frame(channel, body, fx);
        }
        let mut local = Effects::default();
        self.dispatch_frame(channel, body, &mut local);
        let dropped = fx.keep_events(local);
        if dropped > 0 {
            debug!(session = self.id.0, state = ?self.state, dropped, "replies not sent");
        }
    }

    fn dispatch_frame(&mut self, channel: u16, body: FrameBody, fx: &mut Effects) {
        if let FrameBody::End(end) = body {
            return self.on_incoming_end(channel, end, fx);
        }
        if self.state.drops_inbound() {
            debug!(session = self.id.0, state = ?self.state, frame = ?body, "dropped");
            return;
        }

        let result = match body {
            FrameBody::Attach(attach) => self.on_incoming_attach(channel, attach, fx),
            FrameBody::Flow(flow) => self.on_incoming_flow(channel, flow, fx),
            FrameBody::Transfer {
                performative,
                payload,
            } => self.on_incoming_transfer(channel, performative, payload, fx),
            FrameBody::Disposition(disposition) => {
                self.on_incoming_disposition(channel, disposition, fx)
            }
            FrameBody::Detach(detach) => self.on_incoming_detach(channel, detach, fx),
            other => {
                debug!(session = self.id.0, frame = ?other, "not a session frame");
                Err(Error::IllegalState)
            }
        };

        match result {
            Ok(()) => {}
            Err(Error::Link { id, error }) => self.fail_link(id, error, fx),
            Err(error) => self.fail(error, fx),
        }
    }

    /// Attach on a handle the peer is not using yet
    fn refuse_attach(&self, channel: u16, attach: Attach, error: link::Error, fx: &mut Effects) {
        let mut reply = attach;
        reply.role = reply.role.opposite();
        reply.source = None;
        reply.target = None;
        reply.initial_delivery_count = match reply.role {
            Role::Sender => Some(0),
            Role::Receiver => None,
        };
        reply.unsettled = None;
        let detach = Detach {
            handle: reply.handle,
            closed: true,
            error: Some(definitions::Error::from(&error)),
        };
        debug!(session = self.id.0, link = %reply.name, %error, "attach refused");
        fx.frame(channel, reply);
        fx.frame(channel, detach);
    }

    #[instrument(name = "RECV", skip_all, fields(session = self.id.0))]
    fn on_incoming_attach(
        &mut self,
        channel: u16,
        attach: Attach,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        trace!(channel, frame = ?attach);
        let out = self.channel()?;
        if attach.handle.0 > self.config.handle_max {
            return Err(Error::HandleMaxExceeded(attach.handle));
        }
        if self.input_handles.contains_key(&attach.handle) {
            return Err(Error::HandleInUse(attach.handle));
        }

        // answer to a locally initiated attach
        let pending = self.links.iter().find_map(|(key, link)| {
            (link.state() == LinkState::AttachSent
                && link.name() == attach.name
                && link.role() == attach.role.opposite())
            .then_some(LinkId(key))
        });
        if let Some(id) = pending {
            let handle = attach.handle;
            let session = self.id;
            let link = self.link_mut(id)?;
            link.on_incoming_attach(attach)
                .map_err(|error| Error::Link { id, error })?;
            let initial_flow = link.initial_flow();
            self.input_handles.insert(handle, id);
            fx.event(Event::LinkAttached { session, link: id });
            if let Some(flow) = initial_flow {
                self.send_flow(flow, fx)?;
            }
            return Ok(());
        }

        // a new link started by the peer
        if attach.is_dynamic_with_address() {
            self.refuse_attach(out, attach, link::Error::DynamicWithAddress, fx);
            return Ok(());
        }
        if let Err(error) = self.check_link_name(&attach.name) {
            self.refuse_attach(out, attach, error, fx);
            return Ok(());
        }
        let key = self.links.vacant_key();
        if let Err(error) = self.check_handle(key) {
            self.refuse_attach(out, attach, error, fx);
            return Ok(());
        }

        let id = LinkId(key);
        self.input_handles.insert(attach.handle, id);
        let event = Event::AttachRequested {
            session: self.id,
            link: id,
            attach: attach.clone(),
        };
        self.links.insert(Link::remote(id, attach));
        fx.event(event);
        Ok(())
    }

    #[instrument(name = "RECV", skip_all, fields(session = self.id.0))]
    fn on_incoming_flow(&mut self, channel: u16, flow: Flow, fx: &mut Effects) -> Result<(), Error> {
        trace!(channel, frame = ?flow);
        self.remote_incoming_window = flow.incoming_window;
        self.remote_outgoing_window = flow.outgoing_window;

        let handle = match flow.handle {
            Some(handle) => handle,
            None => {
                if flow.echo {
                    let channel = self.channel()?;
                    let reply = self.session_flow(Flow {
                        next_incoming_id: None,
                        incoming_window: 0,
                        next_outgoing_id: 0,
                        outgoing_window: 0,
                        handle: None,
                        delivery_count: None,
                        link_credit: None,
                        available: None,
                        drain: false,
                        echo: false,
                        properties: None,
                    });
                    fx.frame(channel, reply);
                }
                return Ok(());
            }
        };

        let id = *self
            .input_handles
            .get(&handle)
            .ok_or(Error::UnattachedHandle(handle))?;
        let session = self.id;
        let link = self.link_mut(id)?;
        if link.is_errant() || link.is_detach_sent() {
            debug!(link = id.0, "flow dropped");
            return Ok(());
        }
        let outcome = link.on_incoming_flow(&flow);
        if let Some(credit) = outcome.credit {
            fx.event(Event::FlowUpdated {
                session,
                link: id,
                credit,
            });
        }
        if let Some(reply) = outcome.reply {
            self.send_flow(reply, fx)?;
        }
        Ok(())
    }

    #[instrument(name = "RECV", skip_all, fields(session = self.id.0))]
    fn on_incoming_transfer(
        &mut self,
        channel: u16,
        transfer: Transfer,
        payload: Bytes,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        trace!(channel, frame = ?transfer, payload.len = payload.len());
        self.next_incoming_id = self.next_incoming_id.wrapping_add(1);

        let id = *self
            .input_handles
            .get(&transfer.handle)
            .ok_or(Error::UnattachedHandle(transfer.handle))?;
        let link = self.links.get(id.0).ok_or(Error::LinkNotFound(id))?;

        let pending = link.incomplete_len() as u64 + payload.len() as u64;
        if self.incoming_unsettled_bytes + pending > u64::from(self.config.incoming_window) {
            return Err(Error::WindowViolation);
        }
        if link.is_errant() || link.is_detach_sent() {
            debug!(link = id.0, "transfer dropped");
            return Ok(());
        }

        let session = self.id;
        let link = self.link_mut(id)?;
        let incoming = link
            .on_incoming_transfer(transfer, payload)
            .map_err(|error| Error::Link { id, error })?;
        let credit_flow = match incoming {
            Incoming::Partial => return Ok(()),
            Incoming::Aborted {
                delivery_id,
                delivery_tag,
            } => {
                let flow = link.auto_credit_flow();
                fx.event(Event::Settled {
                    session,
                    link: id,
                    delivery_id,
                    tag: delivery_tag,
                    state: None,
                    reason: SettleReason::NotDelivered,
                    delivery_count: 0,
                });
                flow
            }
            Incoming::Complete(delivery) => {
                let flow = link.auto_credit_flow();
                if !delivery.settled {
                    let size = u32::try_from(delivery.payload.len()).unwrap_or(u32::MAX);
                    self.incoming_unsettled_bytes += u64::from(size);
                    self.incoming_deliveries
                        .insert(delivery.delivery_id, DeliveryEntry { link: id, size });
                }
                fx.event(Event::Delivery {
                    session,
                    link: id,
                    delivery,
                });
                flow
            }
        };
        if let Some(flow) = credit_flow {
            self.send_flow(flow, fx)?;
        }
        Ok(())
    }

    /// Delivery ids of `map` in the wrapping range `[first, last]`
    fn ids_in_range(
        map: &BTreeMap<DeliveryNumber, DeliveryEntry>,
        first: DeliveryNumber,
        last: DeliveryNumber,
    ) -> Vec<(DeliveryNumber, LinkId)> {
        let collect = |(id, entry): (&DeliveryNumber, &DeliveryEntry)| (*id, entry.link);
        if first <= last {
            map.range(first..=last).map(collect).collect()
        } else {
            map.range(first..)
                .chain(map.range(..=last))
                .map(collect)
                .collect()
        }
    }

    #[instrument(name = "RECV", skip_all, fields(session = self.id.0))]
    fn on_incoming_disposition(
        &mut self,
        channel: u16,
        disposition: Disposition,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        trace!(channel, frame = ?disposition);
        let (first, last) = disposition.range();
        // the role names the peer, so a receiver's disposition is about our sends
        let local_role = disposition.role.opposite();
        let ids = match local_role {
            Role::Sender => Self::ids_in_range(&self.outgoing_deliveries, first, last),
            Role::Receiver => Self::ids_in_range(&self.incoming_deliveries, first, last),
        };

        for (delivery_id, id) in ids {
            let link = match self.links.get_mut(id.0) {
                Some(link) if !link.is_errant() => link,
                _ => continue,
            };
            let outcome = link
                .on_disposition(delivery_id, disposition.settled, disposition.state.clone())
                .map_err(|error| Error::Link { id, error })?;
            match outcome {
                DispositionOutcome::Settled { delivery, reply } => {
                    self.release_delivery(local_role, delivery_id);
                    if let Some(reply) = reply {
                        let channel = self.channel()?;
                        trace!(channel, frame = ?reply);
                        fx.frame(channel, reply);
                    }
                    fx.event(self.settled_event(id, delivery, SettleReason::DispositionReceived));
                }
                DispositionOutcome::Updated { delivery_id, state } => {
                    fx.event(Event::DeliveryUpdated {
                        session: self.id,
                        link: id,
                        delivery_id,
                        state,
                    });
                }
                DispositionOutcome::Ignored => {}
            }
        }
        Ok(())
    }

    #[instrument(name = "RECV", skip_all, fields(session = self.id.0))]
    fn on_incoming_detach(
        &mut self,
        channel: u16,
        detach: Detach,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        trace!(channel, frame = ?detach);
        let id = *self
            .input_handles
            .get(&detach.handle)
            .ok_or(Error::UnattachedHandle(detach.handle))?;
        let link = self.link_mut(id)?;
        let echo = link
            .on_incoming_detach(&detach)
            .map_err(|error| Error::Link { id, error })?;
        if let Some(echo) = echo {
            let channel = self.channel()?;
            trace!(channel, frame = ?echo);
            fx.frame(channel, echo);
        }
        self.remove_link(id, detach.closed, detach.error, fx);
        Ok(())
    }

    #[instrument(name = "RECV", skip_all, fields(session = self.id.0))]
    fn on_incoming_end(&mut self, channel: u16, end: End, fx: &mut Effects) {
        trace!(channel, frame = ?end);
        if let Err(error) = self.transition(SessionEvent::EndReceived) {
            self.remote_error = end.error;
            return self.fail(error, fx);
        }
        self.remote_error = end.error;
        if self.state == SessionState::EndReceived {
            if let Err(error) = self.end(None, fx) {
                debug!(session = self.id.0, %error, "cannot echo end");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use ferrum_types::{
        definitions::{ErrorCondition, Handle, Role, SessionError},
        messaging::DeliveryState,
        performatives::{Attach, Begin, Disposition, End, Flow, Transfer},
    };

    use super::{Session, SessionConfig, SessionId, SessionState};
    use crate::{
        event::{Effects, Event},
        frames::FrameBody,
        link::{Link, LinkId, SendOutcome, Sendable, SettleReason},
    };

    fn mapped(config: SessionConfig) -> (Session, Effects) {
        let mut fx = Effects::default();
        let mut session = Session::new(SessionId(0), config);
        session.send_begin(0, &mut fx).unwrap();
        session
            .on_incoming_begin(
                0,
                Begin {
                    remote_channel: Some(0),
                    next_outgoing_id: 0,
                    incoming_window: 65536,
                    outgoing_window: 65536,
                    handle_max: Handle(u32::MAX),
                    offered_capabilities: None,
                    desired_capabilities: None,
                    properties: None,
                },
                &mut fx,
            )
            .unwrap();
        assert_eq!(session.state(), SessionState::Mapped);
        (session, fx)
    }

    fn peer_attach(name: &str, role: Role, handle: u32) -> Attach {
        Attach {
            name: name.into(),
            handle: Handle(handle),
            role,
            snd_settle_mode: Default::default(),
            rcv_settle_mode: Default::default(),
            source: None,
            target: None,
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: (role == Role::Sender).then_some(0),
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        }
    }

    fn receiver(session: &mut Session, fx: &mut Effects) -> LinkId {
        let id = session
            .attach(Link::builder().name("r").receiver().source("q"), fx)
            .unwrap();
        session.on_incoming_frame(0, FrameBody::Attach(peer_attach("r", Role::Sender, 7)), fx);
        id
    }

    fn transfer(delivery_id: u32) -> Transfer {
        let mut transfer = Transfer::new(Handle(7));
        transfer.delivery_id = Some(delivery_id);
        transfer.delivery_tag = Some(Bytes::from_static(b"t"));
        transfer
    }

    fn last_end(fx: &Effects) -> Option<&End> {
        fx.frames.iter().rev().find_map(|frame| match &frame.body {
            FrameBody::End(end) => Some(end),
            _ => None,
        })
    }

    #[test]
    fn window_violation_ends_the_session() {
        let (mut session, mut fx) = mapped(SessionConfig {
            incoming_window: 1024,
            ..Default::default()
        });
        receiver(&mut session, &mut fx);

        let payload = Bytes::from(vec![0u8; 2000]);
        session.on_incoming_frame(
            0,
            FrameBody::Transfer {
                performative: transfer(0),
                payload,
            },
            &mut fx,
        );

        let end = last_end(&fx).unwrap();
        assert_eq!(
            end.error.as_ref().unwrap().condition,
            ErrorCondition::SessionError(SessionError::WindowViolation)
        );
        assert_eq!(session.state(), SessionState::Discarding);
    }

    #[test]
    fn unknown_handle_ends_the_session() {
        let (mut session, mut fx) = mapped(SessionConfig::default());
        session.on_incoming_frame(
            0,
            FrameBody::Transfer {
                performative: transfer(0),
                payload: Bytes::new(),
            },
            &mut fx,
        );
        let end = last_end(&fx).unwrap();
        assert_eq!(
            end.error.as_ref().unwrap().condition,
            ErrorCondition::SessionError(SessionError::UnattachedHandle)
        );
    }

    fn credit(handle: u32, link_credit: u32) -> Flow {
        Flow {
            next_incoming_id: Some(0),
            incoming_window: 65536,
            next_outgoing_id: 0,
            outgoing_window: 65536,
            handle: Some(Handle(handle)),
            delivery_count: Some(0),
            link_credit: Some(link_credit),
            available: None,
            drain: false,
            echo: false,
            properties: None,
        }
    }

    #[test]
    fn inbound_frames_handled_after_end_sent() {
        let (mut session, mut fx) = mapped(SessionConfig::default());
        let id = session
            .attach(Link::builder().name("s").sender().target("q"), &mut fx)
            .unwrap();
        session.on_incoming_frame(0, FrameBody::Attach(peer_attach("s", Role::Receiver, 3)), &mut fx);
        session.on_incoming_frame(0, FrameBody::Flow(credit(3, 1)), &mut fx);
        let outcome = session
            .send(id, Sendable::new(&b"t0"[..], &b"hi"[..]), 512, &mut fx)
            .unwrap();
        assert_eq!(outcome, SendOutcome::Sent { delivery_id: 0 });

        session.end(None, &mut fx).unwrap();
        assert_eq!(session.state(), SessionState::EndSent);
        let frames = fx.frames.len();
        fx.events.clear();

        // an unsettled outcome would normally be answered with a settling disposition
        session.on_incoming_frame(
            0,
            FrameBody::Disposition(Disposition {
                role: Role::Receiver,
                first: 0,
                last: None,
                settled: false,
                state: Some(DeliveryState::accepted()),
                batchable: false,
            }),
            &mut fx,
        );
        assert_eq!(fx.frames.len(), frames);
        assert!(matches!(
            &fx.events[..],
            [Event::Settled {
                delivery_id: 0,
                reason: SettleReason::DispositionReceived,
                ..
            }]
        ));
        assert_eq!(session.outgoing_unsettled_bytes(), 0);
        assert_eq!(session.link(id).unwrap().unsettled_count(), 0);

        session.on_incoming_frame(0, FrameBody::End(End { error: None }), &mut fx);
        assert_eq!(session.state(), SessionState::Unmapped);
        assert_eq!(fx.frames.len(), frames);
    }

    #[test]
    fn end_before_local_begin_abandons_the_session() {
        let mut fx = Effects::default();
        let mut session = Session::new(SessionId(1), SessionConfig::default());
        session
            .on_incoming_begin(
                4,
                Begin {
                    remote_channel: None,
                    next_outgoing_id: 0,
                    incoming_window: 100,
                    outgoing_window: 100,
                    handle_max: Handle(7),
                    offered_capabilities: None,
                    desired_capabilities: None,
                    properties: None,
                },
                &mut fx,
            )
            .unwrap();
        assert_eq!(session.state(), SessionState::BeginReceived);

        session.on_incoming_frame(4, FrameBody::End(End { error: None }), &mut fx);
        assert_eq!(session.state(), SessionState::Unmapped);
        assert!(session.error().is_some());
        assert!(fx.frames.is_empty());
    }

    #[test]
    fn remote_end_is_echoed() {
        let (mut session, mut fx) = mapped(SessionConfig::default());
        session.on_incoming_frame(0, FrameBody::End(End { error: None }), &mut fx);
        assert!(last_end(&fx).is_some());
        assert_eq!(session.state(), SessionState::Unmapped);
    }

    #[test]
    fn receiver_gets_delivery_and_settles() {
        let (mut session, mut fx) = mapped(SessionConfig::default());
        let id = receiver(&mut session, &mut fx);
        assert!(fx
            .frames
            .iter()
            .any(|f| matches!(&f.body, FrameBody::Flow(flow) if flow.link_credit == Some(10_000))));

        session.on_incoming_frame(
            0,
            FrameBody::Transfer {
                performative: transfer(0),
                payload: Bytes::from_static(b"hello"),
            },
            &mut fx,
        );
        assert!(fx.events.iter().any(|e| matches!(e, Event::Delivery { .. })));
        assert_eq!(session.incoming_unsettled_bytes(), 5);
        assert_eq!(session.next_incoming_id(), 1);

        session
            .dispose(id, 0, Some(DeliveryState::accepted()), true, &mut fx)
            .unwrap();
        assert_eq!(session.incoming_unsettled_bytes(), 0);
        assert!(fx.events.iter().any(|e| matches!(
            e,
            Event::Settled {
                reason: SettleReason::Settled,
                ..
            }
        )));
    }

    #[test]
    fn sender_waits_for_credit_and_settles_on_accept() {
        let (mut session, mut fx) = mapped(SessionConfig::default());
        let id = session
            .attach(Link::builder().name("s").sender().target("q"), &mut fx)
            .unwrap();
        session.on_incoming_frame(0, FrameBody::Attach(peer_attach("s", Role::Receiver, 3)), &mut fx);

        let outcome = session
            .send(id, Sendable::new(&b"t0"[..], &b"hi"[..]), 512, &mut fx)
            .unwrap();
        assert!(matches!(outcome, SendOutcome::Deferred(..)));

        session.on_incoming_frame(
            0,
            FrameBody::Flow(Flow {
                next_incoming_id: Some(0),
                incoming_window: 65536,
                next_outgoing_id: 0,
                outgoing_window: 65536,
                handle: Some(Handle(3)),
                delivery_count: Some(0),
                link_credit: Some(1),
                available: None,
                drain: false,
                echo: false,
                properties: None,
            }),
            &mut fx,
        );
        let outcome = session
            .send(id, Sendable::new(&b"t0"[..], &b"hi"[..]), 512, &mut fx)
            .unwrap();
        assert_eq!(outcome, SendOutcome::Sent { delivery_id: 0 });
        assert_eq!(session.outgoing_unsettled_bytes(), 2);
        assert_eq!(session.next_outgoing_id(), 1);

        session.on_incoming_frame(
            0,
            FrameBody::Disposition(Disposition {
                role: Role::Receiver,
                first: 0,
                last: None,
                settled: false,
                state: Some(DeliveryState::accepted()),
                batchable: false,
            }),
            &mut fx,
        );
        assert_eq!(session.outgoing_unsettled_bytes(), 0);
        assert_eq!(session.link(id).unwrap().unsettled_count(), 0);
        assert!(matches!(
            fx.frames.last().map(|f| &f.body),
            Some(FrameBody::Disposition(d)) if d.settled && d.role == Role::Sender
        ));
    }

    #[test]
    fn duplicate_handle_is_in_use() {
        let (mut session, mut fx) = mapped(SessionConfig::default());
        session.on_incoming_frame(0, FrameBody::Attach(peer_attach("a", Role::Sender, 1)), &mut fx);
        session.on_incoming_frame(0, FrameBody::Attach(peer_attach("b", Role::Sender, 1)), &mut fx);
        let end = last_end(&fx).unwrap();
        assert_eq!(
            end.error.as_ref().unwrap().condition,
            ErrorCondition::SessionError(SessionError::HandleInUse)
        );
    }
}
