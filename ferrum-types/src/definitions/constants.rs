/// the IANA assigned port number for AMQP.
/// The standard AMQP port number that has been assigned
/// by IANA for TCP, UDP, and SCTP.
pub const PORT: u16 = 5672;

/// the IANA assigned port number for secure AMQP (amqps).
/// Implementations listening on this port SHOULD NOT expect a protocol handshake before TLS
/// is negotiated.
pub const SECURE_PORT: u16 = 5671;

/// major protocol version.
pub const MAJOR: u8 = 1;

/// minor protocol version.
pub const MINOR: u8 = 0;

/// protocol revision
pub const REVISION: u8 = 0;

/// major version of the TLS protocol header
pub const TLS_MAJOR: u8 = 1;

/// minor version of the TLS protocol header
pub const TLS_MINOR: u8 = 0;

/// revision of the TLS protocol header
pub const TLS_REVISION: u8 = 0;

/// major version of the SASL protocol header
pub const SASL_MAJOR: u8 = 1;

/// minor version of the SASL protocol header
pub const SASL_MINOR: u8 = 0;

/// revision of the SASL protocol header
pub const SASL_REVISION: u8 = 0;

/// the lower bound for the agreed maximum frame size (in bytes).
///
/// During the initial connection negotiation, the two peers MUST agree upon a maximum frame
/// size. This constant defines the minimum value to which the maximum frame size can be set.
pub const MIN_MAX_FRAME_SIZE: usize = 512;

/// Default incoming window of a session
pub const INCOMING_WINDOW: u32 = 64 * 1024;

/// Default outgoing window of a session
pub const OUTGOING_WINDOW: u32 = 64 * 1024;

/// Default credit a receiving link issues after attaching
pub const DEFAULT_LINK_CREDIT: u32 = 10_000;
