use ferrum_codec::{composite::FieldValue, Error as CodecError, Value};
use serde::{Deserialize, Serialize};

/// 3.5.5 Terminus Durability
/// Durability policy for a terminus.
/// <type name="terminus-durability" class="restricted" source="uint">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminusDurability {
    /// <choice name="none" value="0"/>
    #[default]
    None,

    /// <choice name="configuration" value="1"/>
    Configuration,

    /// <choice name="unsettled-state" value="2"/>
    UnsettledState,
}

impl FieldValue for TerminusDurability {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::UInt(0) => Ok(TerminusDurability::None),
            Value::UInt(1) => Ok(TerminusDurability::Configuration),
            Value::UInt(2) => Ok(TerminusDurability::UnsettledState),
            _ => Err(CodecError::InvalidValue),
        }
    }

    fn into_value(self) -> Value {
        Value::UInt(self as u32)
    }
}

symbol_enum! {
    /// 3.5.6 Terminus Expiry Policy
    ///
    /// Expiry policy for a terminus.
    pub enum TerminusExpiryPolicy {
        /// The expiry timer starts when terminus is detached
        LinkDetach => "link-detach",
        /// The expiry timer starts when the most recently associated session is ended
        SessionEnd => "session-end",
        /// The expiry timer starts when most recently associated connection is closed
        ConnectionClose => "connection-close",
        /// The terminus never expires
        Never => "never",
    }
}

impl Default for TerminusExpiryPolicy {
    fn default() -> Self {
        TerminusExpiryPolicy::SessionEnd
    }
}

symbol_enum! {
    /// 3.5.7 Standard Distribution Mode
    ///
    /// Link distribution policy.
    pub enum DistributionMode {
        /// Once successfully transferred over the link, the message will no longer be
        /// available to other links from the same node
        Move => "move",
        /// Once successfully transferred over the link, the message is still available for
        /// other links from the same node
        Copy => "copy",
    }
}

#[cfg(test)]
mod tests {
    use ferrum_codec::{composite::FieldValue, primitives::Symbol, Value};

    use super::{DistributionMode, TerminusDurability, TerminusExpiryPolicy};

    #[test]
    fn durability_is_a_uint() {
        assert_eq!(TerminusDurability::UnsettledState.into_value(), Value::UInt(2));
        assert!(TerminusDurability::from_value(Value::UInt(3)).is_err());
    }

    #[test]
    fn expiry_policy_symbols() {
        assert_eq!(TerminusExpiryPolicy::default().as_str(), "session-end");
        let policy =
            TerminusExpiryPolicy::from_value(Value::Symbol(Symbol::from("never"))).unwrap();
        assert_eq!(policy, TerminusExpiryPolicy::Never);
        assert!(DistributionMode::from_value(Value::Symbol(Symbol::from("steal"))).is_err());
    }
}
