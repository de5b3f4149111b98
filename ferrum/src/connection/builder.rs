//! Implements the builder for a connection

use ferrum_codec::primitives::Symbol;
use ferrum_types::definitions::{Fields, Milliseconds, MIN_MAX_FRAME_SIZE};

use crate::session::SessionConfig;

use super::{Connection, ConnectionConfig, Error};

/// Builder for a [`Connection`]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) config: ConnectionConfig,
    pub(crate) offered_capabilities: Option<Vec<Symbol>>,
    pub(crate) desired_capabilities: Option<Vec<Symbol>>,
    pub(crate) properties: Option<Fields>,
}

impl Builder {
    /// Creates a new builder with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded configuration
    pub fn from_config(config: ConnectionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// The id of the source container
    pub fn container_id(mut self, id: impl Into<String>) -> Self {
        self.config.container_id = id.into();
        self
    }

    /// The name of the target host
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.hostname = Some(hostname.into());
        self
    }

    /// Proposed maximum frame size
    pub fn max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.config.max_frame_size = max_frame_size;
        self
    }

    /// The maximum channel number that can be used on the connection
    pub fn channel_max(mut self, channel_max: u16) -> Self {
        self.config.channel_max = channel_max;
        self
    }

    /// Idle time-out in milliseconds
    pub fn idle_time_out(mut self, idle_time_out: Milliseconds) -> Self {
        self.config.idle_time_out = Some(idle_time_out);
        self
    }

    /// Settings of the sessions of this connection
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Add one extension capability the sender supports
    pub fn add_offered_capabilities(mut self, capability: impl Into<Symbol>) -> Self {
        self.offered_capabilities
            .get_or_insert_with(Vec::new)
            .push(capability.into());
        self
    }

    /// Add one extension capability the sender can use if the receiver supports it
    pub fn add_desired_capabilities(mut self, capability: impl Into<Symbol>) -> Self {
        self.desired_capabilities
            .get_or_insert_with(Vec::new)
            .push(capability.into());
        self
    }

    /// Connection properties
    pub fn properties(mut self, properties: Fields) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Creates the connection engine. Nothing is written until [`Connection::open`]
    pub fn build(self) -> Result<Connection, Error> {
        if self.config.container_id.is_empty() {
            return Err(Error::InvalidConfig("container id is empty"));
        }
        if (self.config.max_frame_size as usize) < MIN_MAX_FRAME_SIZE {
            return Err(Error::InvalidConfig("max frame size is below 512"));
        }
        Ok(Connection::new(self))
    }
}
