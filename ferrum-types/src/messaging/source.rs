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

use super::{DistributionMode, LifetimePolicy, Outcome, TerminusDurability, TerminusExpiryPolicy};

/// 3.5.3 Source
///
/// <type name="source" class="composite" source="list" provides="source">
///     <descriptor name="amqp:source:list" code="0x00000000:0x00000028"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Source {
    /// <field name="address" type="*" requires="address"/>
    pub address: Option<String>,

    /// <field name="durable" type="terminus-durability" default="none"/>
    pub durable: TerminusDurability,

    /// <field name="expiry-policy" type="terminus-expiry-policy" default="session-end"/>
    pub expiry_policy: TerminusExpiryPolicy,

    /// <field name="timeout" type="seconds" default="0"/>
    pub timeout: Seconds,

    /// <field name="dynamic" type="boolean" default="false"/>
    ///
    /// When set to true by the receiving link endpoint, this field constitutes a request for
    /// the sending peer to dynamically create a node at the source. In this case the address
    /// field MUST NOT be set.
    pub dynamic: bool,

    /// <field name="dynamic-node-properties" type="node-properties"/>
    ///
    /// If the dynamic field is not set to true this field MUST be left unset.
    pub dynamic_node_properties: Option<Fields>,

    /// <field name="distribution-mode" type="symbol" requires="distribution-mode"/>
    pub distribution_mode: Option<DistributionMode>,

    /// <field name="filter" type="filter-set"/>
    pub filter: Option<Fields>,

    /// <field name="default-outcome" type="*" requires="outcome"/>
    pub default_outcome: Option<Outcome>,

    /// <field name="outcomes" type="symbol" multiple="true"/>
    pub outcomes: Option<Vec<Symbol>>,

    /// <field name="capabilities" type="symbol" multiple="true"/>
    pub capabilities: Option<Vec<Symbol>>,
}

impl Source {
    /// Creates a [`Source`] builder
    pub fn builder() -> SourceBuilder {
        SourceBuilder::new()
    }

    /// Whether the source requests a dynamic node while also naming an address
    pub fn is_dynamic_with_address(&self) -> bool {
        self.dynamic && self.address.is_some()
    }
}

impl<T: Into<String>> From<T> for Source {
    fn from(address: T) -> Self {
        Source {
            address: Some(address.into()),
            ..Default::default()
        }
    }
}

/// Builder for [`Source`]
#[derive(Debug, Clone, Default)]
pub struct SourceBuilder {
    source: Source,
}

impl SourceBuilder {
    /// Creates a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the "address" field
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.source.address = Some(address.into());
        self
    }

    /// Set the "durable" field
    pub fn durable(mut self, durability: TerminusDurability) -> Self {
        self.source.durable = durability;
        self
    }

    /// Set the "expiry-policy" field
    pub fn expiry_policy(mut self, policy: TerminusExpiryPolicy) -> Self {
        self.source.expiry_policy = policy;
        self
    }

    /// Set the "timeout" field
    pub fn timeout(mut self, timeout: Seconds) -> Self {
        self.source.timeout = timeout;
        self
    }

    /// Set the "dynamic" field
    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.source.dynamic = dynamic;
        self
    }

    /// Set the "dynamic-node-properties" field
    pub fn dynamic_node_properties(mut self, properties: Fields) -> Self {
        self.source.dynamic_node_properties = Some(properties);
        self
    }

    /// Add a "lifetime-policy" to the "dynamic-node-properties" field
    pub fn add_lifetime_policy(mut self, policy: LifetimePolicy) -> Self {
        self.source
            .dynamic_node_properties
            .get_or_insert_with(OrderedMap::new)
            .insert(LifetimePolicy::key(), policy.into_value());
        self
    }

    /// Set the "distribution-mode" field
    pub fn distribution_mode(mut self, mode: DistributionMode) -> Self {
        self.source.distribution_mode = Some(mode);
        self
    }

    /// Add an entry to the "filter" field
    pub fn add_to_filter(mut self, key: impl Into<Symbol>, value: Value) -> Self {
        self.source
            .filter
            .get_or_insert_with(OrderedMap::new)
            .insert(key.into(), value);
        self
    }

    /// Set the "default-outcome" field
    pub fn default_outcome(mut self, outcome: Outcome) -> Self {
        self.source.default_outcome = Some(outcome);
        self
    }

    /// Set the "outcomes" field
    pub fn outcomes(mut self, outcomes: impl IntoIterator<Item = Symbol>) -> Self {
        self.source.outcomes = Some(outcomes.into_iter().collect());
        self
    }

    /// Set the "capabilities" field
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Symbol>) -> Self {
        self.source.capabilities = Some(capabilities.into_iter().collect());
        self
    }

    /// Build the [`Source`]
    pub fn build(self) -> Source {
        self.source
    }
}

impl Composite for Source {
    fn definition() -> &'static CompositeDef {
        &registry::SOURCE
    }

    fn into_fields(self) -> Vec<Value> {
        vec![
            self.address.into_value(),
            self.durable.into_value(),
            self.expiry_policy.into_value(),
            self.timeout.into_value(),
            self.dynamic.into_value(),
            self.dynamic_node_properties.into_value(),
            self.distribution_mode.into_value(),
            self.filter.into_value(),
            self.default_outcome.into_value(),
            self.outcomes.into_value(),
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
            distribution_mode: reader.next()?,
            filter: reader.next()?,
            default_outcome: reader.next()?,
            outcomes: reader.next()?,
            capabilities: reader.next()?,
        })
    }
}

composite_field_value!(Source);
