use ferrum_codec::{
    composite::{CompositeDef, FieldReader, FieldValue},
    primitives::{OrderedMap, Symbol},
    Error as CodecError, Value,
};

use crate::{
    composite::Composite,
    definitions::{Fields, Seconds},
    registry,
};

use super::{LifetimePolicy, TerminusDurability, TerminusExpiryPolicy};

/// 3.5.4 Target
///
/// <type name="target" class="composite" source="list" provides="target">
///     <descriptor name="amqp:target:list" code="0x00000000:0x00000029"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    /// <field name="address" type="*" requires="address"/>
    pub address: Option<String>,

    /// <field name="durable" type="terminus-durability" default="none"/>
    pub durable: TerminusDurability,

    /// <field name="expiry-policy" type="terminus-expiry-policy" default="session-end"/>
    pub expiry_policy: TerminusExpiryPolicy,

    /// <field name="timeout" type="seconds" default="0"/>
    pub timeout: Seconds,

    /// <field name="dynamic" type="boolean" default="false"/>
    pub dynamic: bool,

    /// <field name="dynamic-node-properties" type="node-properties"/>
    pub dynamic_node_properties: Option<Fields>,

    /// <field name="capabilities" type="symbol" multiple="true"/>
    pub capabilities: Option<Vec<Symbol>>,
}

impl Target {
    /// Creates a [`Target`] builder
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Whether the target requests a dynamic node while also naming an address
    pub fn is_dynamic_with_address(&self) -> bool {
        self.dynamic && self.address.is_some()
    }
}

impl<T: Into<String>> From<T> for Target {
    fn from(address: T) -> Self {
        Target {
            address: Some(address.into()),
            ..Default::default()
        }
    }
}

/// Target builder
#[derive(Debug, Clone, Default)]
pub struct Builder {
    target: Target,
}

impl Builder {
    /// Creates a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the "address" field
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.target.address = Some(address.into());
        self
    }

    /// Set the "durable" field
    pub fn durable(mut self, durability: TerminusDurability) -> Self {
        self.target.durable = durability;
        self
    }

    /// Set the "expiry-policy" field
    pub fn expiry_policy(mut self, policy: TerminusExpiryPolicy) -> Self {
        self.target.expiry_policy = policy;
        self
    }

    /// Set the "timeout" field
    pub fn timeout(mut self, timeout: Seconds) -> Self {
        self.target.timeout = timeout;
        self
    }

    /// Set the "dynamic" field
    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.target.dynamic = dynamic;
        self
    }

    /// Add a "lifetime-policy" to the "dynamic-node-properties" field
    pub fn add_lifetime_policy(mut self, policy: LifetimePolicy) -> Self {
        self.target
            .dynamic_node_properties
            .get_or_insert_with(OrderedMap::new)
            .insert(LifetimePolicy::key(), policy.into_value());
        self
    }

    /// Set the "capabilities" field
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Symbol>) -> Self {
        self.target.capabilities = Some(capabilities.into_iter().collect());
        self
    }

    /// Build the [`Target`]
    pub fn build(self) -> Target {
        self.target
    }
}

impl Composite for Target {
    fn definition() -> &'static CompositeDef {
        &registry::TARGET
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.address.into_value(),
            self.durable.into_value(),
            self.expiry_policy.into_value(),
            self.timeout.into_value(),
            self.dynamic.into_value(),
            self.dynamic_node_properties.into_value(),
            self.capabilities.into_value(),
        ]
    }

    fn from_fields(reader: &mut FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            address: reader.next()?,
            durable: reader.next()?,
            expiry_policy: reader.next()?,
            timeout: reader.next()?,
            dynamic: reader.next()?,
            dynamic_node_properties: reader.next()?,
            capabilities: reader.next()?,
        })
    }
}

composite_field_value!(Target);

#[cfg(test)]
mod tests {
    use ferrum_codec::{from_slice, to_vec};

    use super::Target;
    use crate::{composite::Composite, messaging::TerminusDurability};

    #[test]
    fn target_from_address() {
        let target = Target::from("q1");
        assert_eq!(target.address.as_deref(), Some("q1"));
        assert_eq!(target.durable, TerminusDurability::None);
    }

    #[test]
    fn target_round_trip() {
        let target = Target::builder()
            .address("q1")
            .durable(TerminusDurability::UnsettledState)
            .timeout(30)
            .build();
        let bytes = to_vec(&target.clone().try_into_value().unwrap()).unwrap();
        let decoded = Target::try_from_value(from_slice(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, target);
    }
}
