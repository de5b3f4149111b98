//! Connection endpoint
//!
//! [`Connection`] is a sans-IO engine. Bytes read from the transport are handed to
//! [`Connection::process`], which returns the resulting [`Event`]s. Everything to be written
//! is appended to the connection's [`OutgoingBuffer`]; the application (or the
//! [`Driver`](crate::driver::Driver)) drains it into the transport.
//!
//! ```text
//!   transport ──bytes──▶ process() ──▶ sessions ──▶ links
//!       ▲                    │
//!       └──── OutgoingBuffer ◀── frames ◀── API calls
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use bytes::{Bytes, BytesMut};
use ferrum_types::{
    definitions::{self, AmqpError, ConnectionError, DeliveryNumber, MIN_MAX_FRAME_SIZE},
    messaging::DeliveryState,
    performatives::{Begin, Close, Open},
};
use slab::Slab;
use tokio_util::codec::Decoder;
use tracing::{debug, error, instrument, trace};

use crate::{
    event::{Effects, Event},
    frames::{Frame, FrameBody, FrameCodec},
    link::{self, Acceptance, Link, LinkId, SendOutcome, Sendable},
    outgoing::OutgoingBuffer,
    session::{Session, SessionId, SessionState},
    transport::{self, ProtocolHeader, ProtocolHeaderCodec},
};

mod builder;
mod config;
mod error;
mod state;

pub use builder::Builder;
pub use config::{ConnectionConfig, DEFAULT_CHANNEL_MAX, DEFAULT_MAX_FRAME_SIZE};
pub use error::Error;
pub use state::{ConnectionEvent, ConnectionState};

/// A connection endpoint
#[derive(Debug)]
pub struct Connection {
    config: ConnectionConfig,
    local_open: Open,
    state: ConnectionState,

    header_codec: ProtocolHeaderCodec,
    codec: FrameCodec,
    inbound: BytesMut,
    outgoing: OutgoingBuffer,

    remote_open: Option<Open>,
    agreed_channel_max: u16,

    sessions: Slab<Session>,
    outgoing_channels: BTreeMap<u16, SessionId>,
    incoming_channels: HashMap<u16, SessionId>,

    pending_events: Vec<Event>,
    local_error: Option<definitions::Error>,
    remote_error: Option<definitions::Error>,
}

impl Connection {
    /// Creates a builder for a connection
    pub fn builder() -> Builder {
        Builder::new()
    }

    pub(crate) fn new(builder: Builder) -> Self {
        let config = builder.config;
        let local_open = Open {
            container_id: config.container_id.clone(),
            hostname: config.hostname.clone(),
            max_frame_size: config.max_frame_size,
            channel_max: config.channel_max,
            idle_time_out: config.idle_time_out,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: builder.offered_capabilities,
            desired_capabilities: builder.desired_capabilities,
            properties: builder.properties,
        };
        let mut codec = FrameCodec::new(MIN_MAX_FRAME_SIZE);
        codec.set_max_inbound(config.max_frame_size as usize);

        Self {
            agreed_channel_max: config.channel_max,
            config,
            local_open,
            state: ConnectionState::Start,
            header_codec: ProtocolHeaderCodec::default(),
            codec,
            inbound: BytesMut::new(),
            outgoing: OutgoingBuffer::new(),
            remote_open: None,
            sessions: Slab::new(),
            outgoing_channels: BTreeMap::new(),
            incoming_channels: HashMap::new(),
            pending_events: Vec::new(),
            local_error: None,
            remote_error: None,
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Settings of the connection
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The peer's open, once received
    pub fn remote_open(&self) -> Option<&Open> {
        self.remote_open.as_ref()
    }

    /// Channel max agreed with the peer, the local one until the peer's open arrives
    pub fn channel_max(&self) -> u16 {
        self.agreed_channel_max
    }

    /// Largest frame written to the peer
    pub fn max_outbound_frame_size(&self) -> usize {
        self.codec.max_outbound()
    }

    /// Bytes waiting to be written to the transport
    pub fn outgoing(&self) -> &OutgoingBuffer {
        &self.outgoing
    }

    /// Take the bytes waiting to be written to the transport
    pub fn take_outgoing(&self) -> Bytes {
        self.outgoing.take()
    }

    /// Events produced by API calls since the last drain or [`process`](Self::process)
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }

    /// A session of the connection
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(id.0)
    }

    /// State of a session, `None` once the session is gone
    pub fn session_state(&self, id: SessionId) -> Option<SessionState> {
        self.session(id).map(Session::state)
    }

    /// A link of a session
    pub fn link(&self, session: SessionId, link: LinkId) -> Option<&Link> {
        self.session(session).and_then(|s| s.link(link))
    }

    /// Idle timeout the peer asked for. Something must be written at least this often
    pub fn remote_idle_timeout(&self) -> Option<Duration> {
        self.remote_open
            .as_ref()
            .and_then(|open| open.idle_time_out)
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Idle timeout advertised locally
    pub fn local_idle_timeout(&self) -> Option<Duration> {
        self.config
            .idle_time_out
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /* ------------------------------------------------------------------ */
    /*                              Helpers                               */
    /* ------------------------------------------------------------------ */

    fn transition(&mut self, event: ConnectionEvent) -> Result<(), Error> {
        let next = self.state.transition(event)?;
        debug!(from = ?self.state, to = ?next, "connection state");
        self.state = next;
        Ok(())
    }

    fn header_received(&self) -> bool {
        !matches!(
            self.state,
            ConnectionState::Start
                | ConnectionState::HeaderSent
                | ConnectionState::OpenPipe
                | ConnectionState::OpenClosePipe { .. }
        )
    }

    /// Run an API call, then write its frames and queue its events
    fn with_effects<T>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut Effects) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut fx = Effects::default();
        let result = f(self, &mut fx);
        self.reap_sessions(&mut fx);
        self.flush(&mut fx);
        self.pending_events.append(&mut fx.events);
        result
    }

    /// Write every queued frame. A frame that cannot be encoded closes the connection
    fn flush(&mut self, fx: &mut Effects) {
        while !fx.frames.is_empty() {
            let frames = std::mem::take(&mut fx.frames);
            for frame in frames {
                if let Err(err) = self.outgoing.put_frame(&mut self.codec, frame) {
                    error!(%err, "frame cannot be encoded");
                    self.fatal(definitions::Error::from(&err), fx);
                    break;
                }
            }
        }
    }

    /// Errors of a closed or closing connection
    fn ensure_usable(&self) -> Result<(), Error> {
        if let Some(err) = &self.remote_error {
            return Err(Error::Remote(err.clone()));
        }
        if self.state.close_sent() || self.state == ConnectionState::CloseReceived {
            return Err(match &self.local_error {
                Some(err) => Error::Local(err.clone()),
                None => Error::IllegalState,
            });
        }
        Ok(())
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut Session, Error> {
        self.sessions
            .get_mut(id.0)
            .ok_or(Error::SessionNotFound(id))
    }

    fn allocate_channel(&self) -> Result<u16, Error> {
        (0..=self.agreed_channel_max)
            .find(|channel| !self.outgoing_channels.contains_key(channel))
            .ok_or(Error::ChannelMaxReached)
    }

    fn write_header(&mut self) -> Result<(), Error> {
        self.transition(ConnectionEvent::HeaderSent)?;
        let bytes: [u8; 8] = ProtocolHeader::amqp().into();
        trace!(header = ?bytes, "SEND");
        self.outgoing.put_slice(&bytes);
        Ok(())
    }

    #[instrument(name = "SEND", skip_all)]
    fn send_open(&mut self, fx: &mut Effects) -> Result<(), Error> {
        self.transition(ConnectionEvent::OpenSent)?;
        let open = self.local_open.clone();
        trace!(channel = 0, frame = ?open);
        fx.frame(0, open);
        Ok(())
    }

    #[instrument(name = "SEND", skip_all)]
    fn send_close(
        &mut self,
        error: Option<definitions::Error>,
        fx: &mut Effects,
    ) -> Result<(), Error> {
        self.transition(ConnectionEvent::CloseSent {
            error: error.is_some(),
        })?;
        if error.is_some() {
            self.local_error = error.clone();
        }
        let close = Close { error };
        trace!(channel = 0, frame = ?close);
        fx.frame(0, close);
        if self.state == ConnectionState::End {
            self.finish(fx);
        }
        Ok(())
    }

    /// Close the connection because of an unrecoverable error
    fn fatal(&mut self, err: definitions::Error, fx: &mut Effects) {
        error!(error = %err, state = ?self.state, "connection error");
        if self.state.close_sent() || (!self.header_received() && !self.state.open_sent()) {
            if self.local_error.is_none() {
                self.local_error = Some(err);
            }
            return;
        }
        if matches!(
            self.state,
            ConnectionState::HeaderExchange | ConnectionState::OpenReceived
        ) {
            if let Err(e) = self.send_open(fx) {
                debug!(%e, "open cannot be sent");
            }
        }
        if let Err(e) = self.send_close(Some(err), fx) {
            debug!(%e, "close cannot be sent");
        }
    }

    /// Both closes are exchanged, tear down what is left
    fn finish(&mut self, fx: &mut Effects) {
        for (key, mut session) in std::mem::take(&mut self.sessions) {
            session.teardown(fx);
            fx.event(Event::SessionEnded {
                session: SessionId(key),
                error: session.error().cloned(),
            });
        }
        self.outgoing_channels.clear();
        self.incoming_channels.clear();
        fx.event(Event::Closed {
            error: self.remote_error.clone().or_else(|| self.local_error.clone()),
        });
    }

    /// Remove sessions that have been unmapped
    fn reap_sessions(&mut self, fx: &mut Effects) {
        let ended: Vec<usize> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.state() == SessionState::Unmapped)
            .map(|(key, _)| key)
            .collect();
        for key in ended {
            let mut session = self.sessions.remove(key);
            if let Some(channel) = session.outgoing_channel() {
                self.outgoing_channels.remove(&channel);
            }
            if let Some(channel) = session.incoming_channel() {
                self.incoming_channels.remove(&channel);
            }
            session.teardown(fx);
            fx.event(Event::SessionEnded {
                session: SessionId(key),
                error: session.error().cloned(),
            });
        }
    }

    /* ------------------------------------------------------------------ */
    /*                               Inbound                              */
    /* ------------------------------------------------------------------ */

    /// Feed bytes read from the transport
    ///
    /// Returns the events queued by API calls since the last drain followed by the events
    /// caused by `bytes`. Protocol violations by the peer never return an error, they close
    /// the connection and are reported through [`Event::Closed`].
    pub fn process(&mut self, bytes: &[u8]) -> Vec<Event> {
        let mut fx = Effects::default();
        if self.state == ConnectionState::End {
            debug!(len = bytes.len(), "connection ended, input dropped");
            return self.drain_events();
        }
        self.inbound.extend_from_slice(bytes);

        while self.state != ConnectionState::End {
            if !self.header_received() {
                match self.header_codec.decode(&mut self.inbound) {
                    Ok(Some(header)) => self.on_incoming_header(header, &mut fx),
                    Ok(None) => break,
                    Err(transport::Error::ProtocolHeaderMismatch(bytes)) => {
                        self.on_header_mismatch(bytes, &mut fx)
                    }
                    Err(transport::Error::Io(err)) => {
                        error!(%err, "protocol header");
                        break;
                    }
                }
                self.flush(&mut fx);
                continue;
            }

            match self.codec.decode(&mut self.inbound) {
                Ok(Some(frame)) => self.on_incoming_frame(frame, &mut fx),
                Ok(None) => break,
                Err(err) => {
                    self.inbound.clear();
                    self.fatal(definitions::Error::from(&err), &mut fx);
                }
            }
            self.reap_sessions(&mut fx);
            self.flush(&mut fx);
        }
        if self.state == ConnectionState::End {
            self.inbound.clear();
        }
        self.reap_sessions(&mut fx);
        self.flush(&mut fx);

        let mut events = self.drain_events();
        events.append(&mut fx.events);
        events
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_header(&mut self, header: ProtocolHeader, fx: &mut Effects) {
        trace!(?header);
        if header != ProtocolHeader::amqp() {
            return self.on_header_mismatch(header.into(), fx);
        }
        if let Err(err) = self.transition(ConnectionEvent::HeaderReceived) {
            return self.fatal(Error::amqp_error(AmqpError::IllegalState, err.to_string()), fx);
        }
        if !self.state.header_sent() {
            if let Err(err) = self.write_header() {
                debug!(%err, "header cannot be sent");
            }
        }
    }

    fn on_header_mismatch(&mut self, bytes: [u8; 8], fx: &mut Effects) {
        error!(header = ?bytes, "protocol header mismatch");
        if !self.state.header_sent() {
            let ours: [u8; 8] = ProtocolHeader::amqp().into();
            self.outgoing.put_slice(&ours);
        }
        self.state = ConnectionState::End;
        self.inbound.clear();
        let err = Error::connection_error(ConnectionError::FramingError, "protocol header mismatch");
        self.local_error = Some(err.clone());
        fx.event(Event::Closed { error: Some(err) });
    }

    fn on_incoming_frame(&mut self, frame: Frame, fx: &mut Effects) {
        let channel = frame.channel;
        match frame.body {
            FrameBody::Empty => trace!(channel, "heartbeat"),
            FrameBody::Open(open) => self.on_incoming_open(channel, open, fx),
            FrameBody::Close(close) => self.on_incoming_close(channel, close, fx),
            body => match self.state {
                ConnectionState::Opened => self.on_session_frame(channel, body, fx),
                ConnectionState::CloseSent => {
                    // sessions still see the frame, their replies cannot follow a close
                    let mut local = Effects::default();
                    self.on_session_frame(channel, body, &mut local);
                    let dropped = fx.keep_events(local);
                    if dropped > 0 {
                        debug!(channel, dropped, "replies not sent after close");
                    }
                }
                ConnectionState::Discarding | ConnectionState::CloseReceived => {
                    debug!(channel, frame = ?body, state = ?self.state, "dropped");
                }
                _ => self.fatal(
                    Error::amqp_error(AmqpError::IllegalState, "session frame before open"),
                    fx,
                ),
            },
        }
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_open(&mut self, channel: u16, open: Open, fx: &mut Effects) {
        trace!(channel, frame = ?open);
        if self.state == ConnectionState::Discarding {
            debug!("open dropped");
            return;
        }
        if let Err(err) = self.transition(ConnectionEvent::OpenReceived) {
            return self.fatal(Error::amqp_error(AmqpError::IllegalState, err.to_string()), fx);
        }
        if (open.max_frame_size as usize) < MIN_MAX_FRAME_SIZE {
            return self.fatal(
                Error::amqp_error(AmqpError::InvalidField, "max-frame-size is below 512"),
                fx,
            );
        }

        self.codec.set_max_outbound(open.max_frame_size as usize);
        self.agreed_channel_max = self.config.channel_max.min(open.channel_max);
        self.remote_open = Some(open.clone());
        fx.event(Event::Opened { remote: open });
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_close(&mut self, channel: u16, close: Close, fx: &mut Effects) {
        trace!(channel, frame = ?close);
        if let Err(err) = self.transition(ConnectionEvent::CloseReceived) {
            debug!(%err, state = ?self.state, "unexpected close");
            return self.fatal(Error::amqp_error(AmqpError::IllegalState, err.to_string()), fx);
        }
        self.remote_error = close.error;
        match self.state {
            ConnectionState::CloseReceived => {
                if let Err(err) = self.send_close(None, fx) {
                    debug!(%err, "close cannot be echoed");
                }
            }
            ConnectionState::End => self.finish(fx),
            _ => {}
        }
    }

    fn on_session_frame(&mut self, channel: u16, body: FrameBody, fx: &mut Effects) {
        if let FrameBody::Begin(begin) = body {
            return self.on_incoming_begin(channel, begin, fx);
        }
        match self.incoming_channels.get(&channel) {
            Some(id) => {
                if let Some(session) = self.sessions.get_mut(id.0) {
                    session.on_incoming_frame(channel, body, fx);
                }
            }
            None => self.fatal(
                Error::amqp_error(AmqpError::NotFound, format!("no session on channel {channel}")),
                fx,
            ),
        }
    }

    #[instrument(name = "RECV", skip_all)]
    fn on_incoming_begin(&mut self, channel: u16, begin: Begin, fx: &mut Effects) {
        if self.incoming_channels.contains_key(&channel) {
            return self.fatal(
                Error::amqp_error(AmqpError::NotAllowed, format!("channel {channel} is in use")),
                fx,
            );
        }

        match begin.remote_channel {
            Some(remote_channel) => {
                let id = match self.outgoing_channels.get(&remote_channel) {
                    Some(id) => *id,
                    None => {
                        return self.fatal(
                            Error::amqp_error(
                                AmqpError::NotFound,
                                format!("no session on channel {remote_channel}"),
                            ),
                            fx,
                        )
                    }
                };
                let result = match self.sessions.get_mut(id.0) {
                    Some(session) => session.on_incoming_begin(channel, begin, fx),
                    None => Err(crate::session::Error::IllegalState),
                };
                match result {
                    Ok(()) => {
                        self.incoming_channels.insert(channel, id);
                    }
                    Err(err) => {
                        self.fatal(Error::amqp_error(AmqpError::IllegalState, err.to_string()), fx)
                    }
                }
            }
            None => {
                let id = SessionId(self.sessions.vacant_key());
                let mut session = Session::new(id, self.config.session.clone());
                if let Err(err) = session.on_incoming_begin(channel, begin, fx) {
                    return self.fatal(Error::amqp_error(AmqpError::IllegalState, err.to_string()), fx);
                }
                self.sessions.insert(session);
                self.incoming_channels.insert(channel, id);
                fx.event(Event::SessionRequested {
                    session: id,
                    remote_channel: channel,
                });
            }
        }
    }

    /* ------------------------------------------------------------------ */
    /*                              Outbound                              */
    /* ------------------------------------------------------------------ */

    /// Write the protocol header, if not written yet, and the open
    pub fn open(&mut self) -> Result<(), Error> {
        self.with_effects(|this, fx| match this.state {
            ConnectionState::Start | ConnectionState::HeaderReceived => {
                this.write_header()?;
                this.send_open(fx)
            }
            ConnectionState::HeaderSent
            | ConnectionState::HeaderExchange
            | ConnectionState::OpenReceived => this.send_open(fx),
            _ => Err(Error::IllegalState),
        })
    }

    /// Close the connection, optionally with an error
    pub fn close(&mut self, error: Option<definitions::Error>) -> Result<(), Error> {
        self.with_effects(|this, fx| {
            if this.state.close_sent() {
                return Err(Error::IllegalState);
            }
            match this.state {
                ConnectionState::Start | ConnectionState::HeaderReceived => {
                    this.write_header()?;
                    this.send_open(fx)?;
                }
                ConnectionState::HeaderSent
                | ConnectionState::HeaderExchange
                | ConnectionState::OpenReceived => this.send_open(fx)?,
                _ => {}
            }
            this.send_close(error, fx)
        })
    }

    /// Write an empty frame to keep the peer's idle timer from expiring
    pub fn send_heartbeat(&mut self) -> Result<(), Error> {
        self.with_effects(|this, fx| {
            if !this.state.open_sent() || this.state == ConnectionState::End {
                return Err(Error::IllegalState);
            }
            fx.frames.push(Frame::empty());
            Ok(())
        })
    }

    /// Nothing arrived within the local idle timeout
    pub fn idle_timeout_elapsed(&mut self) {
        let mut fx = Effects::default();
        self.fatal(
            Error::amqp_error(AmqpError::ResourceLimitExceeded, "idle timeout"),
            &mut fx,
        );
        self.flush(&mut fx);
        self.pending_events.append(&mut fx.events);
    }

    /// Begin a session on the lowest free channel
    pub fn begin(&mut self) -> Result<SessionId, Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| {
            if !matches!(
                this.state,
                ConnectionState::OpenPipe | ConnectionState::OpenSent | ConnectionState::Opened
            ) {
                return Err(Error::IllegalState);
            }
            let channel = this.allocate_channel()?;
            let id = SessionId(this.sessions.vacant_key());
            let mut session = Session::new(id, this.config.session.clone());
            session.send_begin(channel, fx)?;
            this.sessions.insert(session);
            this.outgoing_channels.insert(channel, id);
            Ok(id)
        })
    }

    /// Answer a session the peer began
    pub fn accept_session(&mut self, id: SessionId) -> Result<(), Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| {
            if this.session_state(id) != Some(SessionState::BeginReceived) {
                return Err(match this.session(id) {
                    Some(_) => Error::IllegalState,
                    None => Error::SessionNotFound(id),
                });
            }
            let channel = this.allocate_channel()?;
            this.session_mut(id)?.accept(channel, fx)?;
            this.outgoing_channels.insert(channel, id);
            Ok(())
        })
    }

    /// End a session, optionally with an error
    pub fn end(&mut self, id: SessionId, error: Option<definitions::Error>) -> Result<(), Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| Ok(this.session_mut(id)?.end(error, fx)?))
    }

    /// Attach a link on a session
    pub fn attach(&mut self, id: SessionId, builder: link::Builder) -> Result<LinkId, Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| Ok(this.session_mut(id)?.attach(builder, fx)?))
    }

    /// Answer a link the peer attached
    pub fn accept_link(
        &mut self,
        id: SessionId,
        link: LinkId,
        acceptance: Acceptance,
    ) -> Result<(), Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| Ok(this.session_mut(id)?.accept_link(link, acceptance, fx)?))
    }

    /// Replace the credit of a receiver link
    pub fn flow(&mut self, id: SessionId, link: LinkId, credit: u32, drain: bool) -> Result<(), Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| Ok(this.session_mut(id)?.flow(link, credit, drain, fx)?))
    }

    /// Send a message on a sender link
    ///
    /// Returns [`SendOutcome::Deferred`] when link credit or the session windows do not allow
    /// the transfer now. Nothing is written in that case.
    pub fn send(
        &mut self,
        id: SessionId,
        link: LinkId,
        sendable: Sendable,
    ) -> Result<SendOutcome, Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| {
            let max_frame_size = this.codec.max_outbound();
            Ok(this
                .session_mut(id)?
                .send(link, sendable, max_frame_size, fx)?)
        })
    }

    /// Update the state of a delivery, settling it if `settled`
    pub fn dispose(
        &mut self,
        id: SessionId,
        link: LinkId,
        delivery_id: DeliveryNumber,
        state: Option<DeliveryState>,
        settled: bool,
    ) -> Result<(), Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| {
            Ok(this
                .session_mut(id)?
                .dispose(link, delivery_id, state, settled, fx)?)
        })
    }

    /// Detach a link. `closed` closes it instead of only detaching
    pub fn detach(
        &mut self,
        id: SessionId,
        link: LinkId,
        closed: bool,
        error: Option<definitions::Error>,
    ) -> Result<(), Error> {
        self.ensure_usable()?;
        self.with_effects(|this, fx| Ok(this.session_mut(id)?.detach(link, closed, error, fx)?))
    }
}
