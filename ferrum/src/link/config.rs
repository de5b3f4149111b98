use ferrum_types::definitions::{
    ReceiverSettleMode, Role, SenderSettleMode, SequenceNo, DEFAULT_LINK_CREDIT,
};
use serde::{Deserialize, Serialize};

/// Plain link settings, loadable from a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LinkConfig {
    /// Name of the link, unique within its session and direction
    pub name: String,

    /// Role of the local endpoint
    pub role: Role,

    /// Settlement policy of the sender
    pub snd_settle_mode: SenderSettleMode,

    /// Settlement policy of the receiver
    pub rcv_settle_mode: ReceiverSettleMode,

    /// Address of the source terminus
    pub source_address: Option<String>,

    /// Address of the target terminus
    pub target_address: Option<String>,

    /// Ask the peer to create the remote node. The peer-side terminus must not carry an
    /// address
    pub dynamic: bool,

    /// Credit a receiver issues once attached
    pub credit: u32,

    /// Re-issue `credit` when it falls to half
    pub auto_credit: bool,

    /// Largest message accepted, 0 for unlimited
    pub max_message_size: u64,

    /// First delivery-count of a sender
    pub initial_delivery_count: SequenceNo,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            role: Role::Sender,
            snd_settle_mode: SenderSettleMode::default(),
            rcv_settle_mode: ReceiverSettleMode::default(),
            source_address: None,
            target_address: None,
            dynamic: false,
            credit: DEFAULT_LINK_CREDIT,
            auto_credit: false,
            max_message_size: 0,
            initial_delivery_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use ferrum_types::definitions::{ReceiverSettleMode, Role, SenderSettleMode};

    use super::LinkConfig;

    #[test]
    fn partial_config_uses_defaults() {
        let config: LinkConfig = serde_json::from_str(
            r#"{ "name": "orders", "role": "receiver", "source-address": "q1", "rcv-settle-mode": "second" }"#,
        )
        .unwrap();
        assert_eq!(config.name, "orders");
        assert_eq!(config.role, Role::Receiver);
        assert_eq!(config.source_address.as_deref(), Some("q1"));
        assert_eq!(config.rcv_settle_mode, ReceiverSettleMode::Second);
        assert_eq!(config.snd_settle_mode, SenderSettleMode::Mixed);
        assert_eq!(config.credit, 10_000);
    }

    #[test]
    fn config_round_trip() {
        let config = LinkConfig {
            name: "l".into(),
            auto_credit: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"auto-credit\":true"));
        assert_eq!(serde_json::from_str::<LinkConfig>(&json).unwrap(), config);
    }
}
