//! Implements the builder for a link

use ferrum_types::{
    definitions::{Fields, ReceiverSettleMode, Role, SenderSettleMode, SequenceNo},
    messaging::{Source, Target},
};

use super::{Error, LinkConfig};

/// Builder for a link
///
/// Termini set with [`source`](Builder::source) or [`target`](Builder::target) replace the
/// ones derived from the configured addresses.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) config: LinkConfig,
    pub(crate) source: Option<Source>,
    pub(crate) target: Option<Target>,
    pub(crate) properties: Option<Fields>,
}

impl Builder {
    /// Creates a new builder for a sender link
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded configuration
    pub fn from_config(config: LinkConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// The name of the link
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the link role to sender
    pub fn sender(mut self) -> Self {
        self.config.role = Role::Sender;
        self
    }

    /// Set the link role to receiver
    pub fn receiver(mut self) -> Self {
        self.config.role = Role::Receiver;
        self
    }

    /// Set the sender settle mode
    pub fn sender_settle_mode(mut self, mode: SenderSettleMode) -> Self {
        self.config.snd_settle_mode = mode;
        self
    }

    /// Set the receiver settle mode
    pub fn receiver_settle_mode(mut self, mode: ReceiverSettleMode) -> Self {
        self.config.rcv_settle_mode = mode;
        self
    }

    /// Set the source
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the target
    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Request a dynamically created node at the peer
    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.config.dynamic = dynamic;
        self
    }

    /// Credit issued by a receiver once attached
    pub fn credit(mut self, credit: u32) -> Self {
        self.config.credit = credit;
        self
    }

    /// Re-issue the credit when half of it is used
    pub fn auto_credit(mut self, auto_credit: bool) -> Self {
        self.config.auto_credit = auto_credit;
        self
    }

    /// Max message size, 0 for unlimited
    pub fn max_message_size(mut self, max_size: u64) -> Self {
        self.config.max_message_size = max_size;
        self
    }

    /// Set the initial delivery count of a sender
    pub fn initial_delivery_count(mut self, count: SequenceNo) -> Self {
        self.config.initial_delivery_count = count;
        self
    }

    /// Link properties
    pub fn properties(mut self, properties: Fields) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Resolve the termini
    ///
    /// A dynamic request marks the peer-side terminus (the source of a receiver, the target
    /// of a sender) as dynamic. That terminus must not carry an address.
    pub(crate) fn termini(&self) -> Result<(Source, Target), Error> {
        let mut source = self.source.clone().unwrap_or_else(|| Source {
            address: self.config.source_address.clone(),
            ..Default::default()
        });
        let mut target = self.target.clone().unwrap_or_else(|| Target {
            address: self.config.target_address.clone(),
            ..Default::default()
        });

        if self.config.dynamic {
            match self.config.role {
                Role::Receiver => source.dynamic = true,
                Role::Sender => target.dynamic = true,
            }
        }

        if source.is_dynamic_with_address() || target.is_dynamic_with_address() {
            return Err(Error::DynamicWithAddress);
        }
        Ok((source, target))
    }
}
