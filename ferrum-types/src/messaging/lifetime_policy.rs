use ferrum_codec::{
    composite::{CompositeDef, FieldValue},
    primitives::Symbol,
    Error as CodecError, Value,
};

use crate::registry;

/// Key of the lifetime policy in the dynamic node properties
pub const LIFETIME_POLICY: &str = "lifetime-policy";

/// 3.5.10 - 3.5.13 Lifetime policies of a dynamically created node
///
/// Each policy is an empty described list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifetimePolicy {
    /// <descriptor name="amqp:delete-on-close:list" code="0x00000000:0x0000002b"/>
    ///
    /// Lifetime of dynamic node scoped to lifetime of link which caused creation.
    DeleteOnClose,

    /// <descriptor name="amqp:delete-on-no-links:list" code="0x00000000:0x0000002c"/>
    ///
    /// Lifetime of dynamic node scoped to existence of links to the node
    DeleteOnNoLinks,

    /// <descriptor name="amqp:delete-on-no-messages:list" code="0x00000000:0x0000002d"/>
    ///
    /// Lifetime of dynamic node scoped to existence of messages on the node.
    DeleteOnNoMessages,

    /// <descriptor name="amqp:delete-on-no-links-or-messages:list" code="0x00000000:0x0000002e"/>
    ///
    /// Lifetime of node scoped to existence of messages on or links to the node.
    DeleteOnNoLinksOrMessages,
}

impl LifetimePolicy {
    /// The static definition of the policy
    pub fn definition(&self) -> &'static CompositeDef {
        match self {
            LifetimePolicy::DeleteOnClose => &registry::DELETE_ON_CLOSE,
            LifetimePolicy::DeleteOnNoLinks => &registry::DELETE_ON_NO_LINKS,
            LifetimePolicy::DeleteOnNoMessages => &registry::DELETE_ON_NO_MESSAGES,
            LifetimePolicy::DeleteOnNoLinksOrMessages => &registry::DELETE_ON_NO_LINKS_OR_MESSAGES,
        }
    }

    /// The key under which the policy is stored in node properties
    pub fn key() -> Symbol {
        Symbol::from(LIFETIME_POLICY)
    }
}

impl FieldValue for LifetimePolicy {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let def = registry::resolve(&value, &registry::LIFETIME_POLICIES)?;
        def.decode_fields(value)?;
        match def.code {
            0x2b => Ok(LifetimePolicy::DeleteOnClose),
            0x2c => Ok(LifetimePolicy::DeleteOnNoLinks),
            0x2d => Ok(LifetimePolicy::DeleteOnNoMessages),
            _ => Ok(LifetimePolicy::DeleteOnNoLinksOrMessages),
        }
    }

    fn into_value(self) -> Value {
        self.definition().to_described(Vec::new())
    }
}
