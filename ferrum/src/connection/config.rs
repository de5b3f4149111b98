use ferrum_types::definitions::Milliseconds;
use serde::{Deserialize, Serialize};

use crate::session::SessionConfig;

/// Default max frame size of a connection, 256 KiB
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 256 * 1024;

/// Default channel max of a connection
pub const DEFAULT_CHANNEL_MAX: u16 = 255;

/// Plain connection settings, loadable from a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConnectionConfig {
    /// Container id sent in the open
    pub container_id: String,

    /// Name of the host the connection is for
    pub hostname: Option<String>,

    /// Largest frame accepted from the peer
    pub max_frame_size: u32,

    /// Highest channel number
    pub channel_max: u16,

    /// Idle timeout in milliseconds advertised to the peer
    pub idle_time_out: Option<Milliseconds>,

    /// Settings of sessions begun or accepted on this connection
    pub session: SessionConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            container_id: String::new(),
            hostname: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            channel_max: DEFAULT_CHANNEL_MAX,
            idle_time_out: None,
            session: SessionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionConfig;

    #[test]
    fn defaults() {
        let config: ConnectionConfig = serde_json::from_str(r#"{"container-id": "c1"}"#).unwrap();
        assert_eq!(config.container_id, "c1");
        assert_eq!(config.max_frame_size, 256 * 1024);
        assert_eq!(config.channel_max, 255);
        assert_eq!(config.idle_time_out, None);
        assert_eq!(config.session.incoming_window, 65536);
    }

    #[test]
    fn round_trip() {
        let config = ConnectionConfig {
            container_id: "c2".into(),
            hostname: Some("broker".into()),
            idle_time_out: Some(30_000),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"idle-time-out\":30000"));
        let decoded: ConnectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);
    }
}
