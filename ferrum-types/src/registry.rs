//! Static field tables of every composite and descriptor lookup
//!
//! Field order is wire order. Each table follows the `<field>` elements of the AMQP 1.0 XML
//! definitions.

use ferrum_codec::{
    composite::{CompositeDef, DefaultValue, FieldDef, FieldType},
    described::Descriptor,
    format_code::EncodingCodes,
    Error, Value,
};

use FieldType::*;

const fn mandatory(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef::mandatory(name, ty)
}

const fn optional(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef::optional(name, ty)
}

const fn symbols(name: &'static str) -> FieldDef {
    FieldDef::optional(name, Symbol).multiple()
}

/* -------------------------------------------------------------------------- */
/*                                 Definitions                                */
/* -------------------------------------------------------------------------- */

static ERROR_FIELDS: [FieldDef; 3] = [
    mandatory("condition", Symbol),
    optional("description", String),
    optional("info", Fields),
];

/// amqp:error:list
pub static ERROR: CompositeDef = CompositeDef::new("amqp:error:list", 0x1d, &ERROR_FIELDS);

static ERROR_TYPE: [&CompositeDef; 1] = [&ERROR];

/* -------------------------------------------------------------------------- */
/*                                Performatives                               */
/* -------------------------------------------------------------------------- */

static OPEN_FIELDS: [FieldDef; 10] = [
    mandatory("container-id", String),
    optional("hostname", String),
    optional("max-frame-size", UInt).default(DefaultValue::UInt(u32::MAX)),
    optional("channel-max", UShort).default(DefaultValue::UShort(u16::MAX)),
    optional("idle-time-out", UInt),
    symbols("outgoing-locales"),
    symbols("incoming-locales"),
    symbols("offered-capabilities"),
    symbols("desired-capabilities"),
    optional("properties", Fields),
];

/// amqp:open:list
pub static OPEN: CompositeDef = CompositeDef::new("amqp:open:list", 0x10, &OPEN_FIELDS);

static BEGIN_FIELDS: [FieldDef; 8] = [
    optional("remote-channel", UShort),
    mandatory("next-outgoing-id", UInt),
    mandatory("incoming-window", UInt),
    mandatory("outgoing-window", UInt),
    optional("handle-max", UInt).default(DefaultValue::UInt(u32::MAX)),
    symbols("offered-capabilities"),
    symbols("desired-capabilities"),
    optional("properties", Fields),
];

/// amqp:begin:list
pub static BEGIN: CompositeDef = CompositeDef::new("amqp:begin:list", 0x11, &BEGIN_FIELDS);

static ATTACH_FIELDS: [FieldDef; 14] = [
    mandatory("name", String),
    mandatory("handle", UInt),
    mandatory("role", Boolean),
    optional("snd-settle-mode", UByte).default(DefaultValue::UByte(2)),
    optional("rcv-settle-mode", UByte).default(DefaultValue::UByte(0)),
    optional("source", Composite(&SOURCE_TYPE)),
    optional("target", Composite(&TARGET_TYPE)),
    optional("unsettled", Map),
    optional("incomplete-unsettled", Boolean).default(DefaultValue::Bool(false)),
    optional("initial-delivery-count", UInt),
    optional("max-message-size", ULong),
    symbols("offered-capabilities"),
    symbols("desired-capabilities"),
    optional("properties", Fields),
];

/// amqp:attach:list
pub static ATTACH: CompositeDef = CompositeDef::new("amqp:attach:list", 0x12, &ATTACH_FIELDS);

static FLOW_FIELDS: [FieldDef; 11] = [
    optional("next-incoming-id", UInt),
    mandatory("incoming-window", UInt),
    mandatory("next-outgoing-id", UInt),
    mandatory("outgoing-window", UInt),
    optional("handle", UInt),
    optional("delivery-count", UInt),
    optional("link-credit", UInt),
    optional("available", UInt),
    optional("drain", Boolean).default(DefaultValue::Bool(false)),
    optional("echo", Boolean).default(DefaultValue::Bool(false)),
    optional("properties", Fields),
];

/// amqp:flow:list
pub static FLOW: CompositeDef = CompositeDef::new("amqp:flow:list", 0x13, &FLOW_FIELDS);

static TRANSFER_FIELDS: [FieldDef; 11] = [
    mandatory("handle", UInt),
    optional("delivery-id", UInt),
    optional("delivery-tag", Binary),
    optional("message-format", UInt),
    optional("settled", Boolean),
    optional("more", Boolean).default(DefaultValue::Bool(false)),
    optional("rcv-settle-mode", UByte),
    optional("state", Composite(&DELIVERY_STATES)),
    optional("resume", Boolean).default(DefaultValue::Bool(false)),
    optional("aborted", Boolean).default(DefaultValue::Bool(false)),
    optional("batchable", Boolean).default(DefaultValue::Bool(false)),
];

/// amqp:transfer:list
pub static TRANSFER: CompositeDef =
    CompositeDef::new("amqp:transfer:list", 0x14, &TRANSFER_FIELDS);

static DISPOSITION_FIELDS: [FieldDef; 6] = [
    mandatory("role", Boolean),
    mandatory("first", UInt),
    optional("last", UInt),
    optional("settled", Boolean).default(DefaultValue::Bool(false)),
    optional("state", Composite(&DELIVERY_STATES)),
    optional("batchable", Boolean).default(DefaultValue::Bool(false)),
];

/// amqp:disposition:list
pub static DISPOSITION: CompositeDef =
    CompositeDef::new("amqp:disposition:list", 0x15, &DISPOSITION_FIELDS);

static DETACH_FIELDS: [FieldDef; 3] = [
    mandatory("handle", UInt),
    optional("closed", Boolean).default(DefaultValue::Bool(false)),
    optional("error", Composite(&ERROR_TYPE)),
];

/// amqp:detach:list
pub static DETACH: CompositeDef = CompositeDef::new("amqp:detach:list", 0x16, &DETACH_FIELDS);

static END_FIELDS: [FieldDef; 1] = [optional("error", Composite(&ERROR_TYPE))];

/// amqp:end:list
pub static END: CompositeDef = CompositeDef::new("amqp:end:list", 0x17, &END_FIELDS);

static CLOSE_FIELDS: [FieldDef; 1] = [optional("error", Composite(&ERROR_TYPE))];

/// amqp:close:list
pub static CLOSE: CompositeDef = CompositeDef::new("amqp:close:list", 0x18, &CLOSE_FIELDS);

/* -------------------------------------------------------------------------- */
/*                               Delivery states                              */
/* -------------------------------------------------------------------------- */

static RECEIVED_FIELDS: [FieldDef; 2] = [
    mandatory("section-number", UInt),
    mandatory("section-offset", ULong),
];

/// amqp:received:list
pub static RECEIVED: CompositeDef =
    CompositeDef::new("amqp:received:list", 0x23, &RECEIVED_FIELDS);

/// amqp:accepted:list
pub static ACCEPTED: CompositeDef = CompositeDef::new("amqp:accepted:list", 0x24, &[]);

static REJECTED_FIELDS: [FieldDef; 1] = [optional("error", Composite(&ERROR_TYPE))];

/// amqp:rejected:list
pub static REJECTED: CompositeDef =
    CompositeDef::new("amqp:rejected:list", 0x25, &REJECTED_FIELDS);

/// amqp:released:list
pub static RELEASED: CompositeDef = CompositeDef::new("amqp:released:list", 0x26, &[]);

static MODIFIED_FIELDS: [FieldDef; 3] = [
    optional("delivery-failed", Boolean),
    optional("undeliverable-here", Boolean),
    optional("message-annotations", Fields),
];

/// amqp:modified:list
pub static MODIFIED: CompositeDef =
    CompositeDef::new("amqp:modified:list", 0x27, &MODIFIED_FIELDS);

/* -------------------------------------------------------------------------- */
/*                                   Termini                                  */
/* -------------------------------------------------------------------------- */

static SOURCE_FIELDS: [FieldDef; 11] = [
    optional("address", String),
    optional("durable", UInt).default(DefaultValue::UInt(0)),
    optional("expiry-policy", Symbol).default(DefaultValue::Symbol("session-end")),
    optional("timeout", UInt).default(DefaultValue::UInt(0)),
    optional("dynamic", Boolean).default(DefaultValue::Bool(false)),
    optional("dynamic-node-properties", Fields),
    optional("distribution-mode", Symbol),
    optional("filter", Fields),
    optional("default-outcome", Composite(&OUTCOMES)),
    symbols("outcomes"),
    symbols("capabilities"),
];

/// amqp:source:list
pub static SOURCE: CompositeDef = CompositeDef::new("amqp:source:list", 0x28, &SOURCE_FIELDS);

static SOURCE_TYPE: [&CompositeDef; 1] = [&SOURCE];

static TARGET_FIELDS: [FieldDef; 7] = [
    optional("address", String),
    optional("durable", UInt).default(DefaultValue::UInt(0)),
    optional("expiry-policy", Symbol).default(DefaultValue::Symbol("session-end")),
    optional("timeout", UInt).default(DefaultValue::UInt(0)),
    optional("dynamic", Boolean).default(DefaultValue::Bool(false)),
    optional("dynamic-node-properties", Fields),
    symbols("capabilities"),
];

/// amqp:target:list
pub static TARGET: CompositeDef = CompositeDef::new("amqp:target:list", 0x29, &TARGET_FIELDS);

static TARGET_TYPE: [&CompositeDef; 1] = [&TARGET];

/// amqp:delete-on-close:list
pub static DELETE_ON_CLOSE: CompositeDef =
    CompositeDef::new("amqp:delete-on-close:list", 0x2b, &[]);

/// amqp:delete-on-no-links:list
pub static DELETE_ON_NO_LINKS: CompositeDef =
    CompositeDef::new("amqp:delete-on-no-links:list", 0x2c, &[]);

/// amqp:delete-on-no-messages:list
pub static DELETE_ON_NO_MESSAGES: CompositeDef =
    CompositeDef::new("amqp:delete-on-no-messages:list", 0x2d, &[]);

/// amqp:delete-on-no-links-or-messages:list
pub static DELETE_ON_NO_LINKS_OR_MESSAGES: CompositeDef =
    CompositeDef::new("amqp:delete-on-no-links-or-messages:list", 0x2e, &[]);

/* -------------------------------------------------------------------------- */
/*                                   Groups                                   */
/* -------------------------------------------------------------------------- */

/// Frame bodies of AMQP frames
pub static PERFORMATIVES: [&CompositeDef; 9] = [
    &OPEN,
    &BEGIN,
    &ATTACH,
    &FLOW,
    &TRANSFER,
    &DISPOSITION,
    &DETACH,
    &END,
    &CLOSE,
];

/// Composites that provide `delivery-state`
pub static DELIVERY_STATES: [&CompositeDef; 5] =
    [&RECEIVED, &ACCEPTED, &REJECTED, &RELEASED, &MODIFIED];

/// Composites that provide `outcome`
pub static OUTCOMES: [&CompositeDef; 4] = [&ACCEPTED, &REJECTED, &RELEASED, &MODIFIED];

/// Composites that provide `lifetime-policy`
pub static LIFETIME_POLICIES: [&CompositeDef; 4] = [
    &DELETE_ON_CLOSE,
    &DELETE_ON_NO_LINKS,
    &DELETE_ON_NO_MESSAGES,
    &DELETE_ON_NO_LINKS_OR_MESSAGES,
];

/// Every known composite
pub static ALL: [&CompositeDef; 21] = [
    &ERROR,
    &OPEN,
    &BEGIN,
    &ATTACH,
    &FLOW,
    &TRANSFER,
    &DISPOSITION,
    &DETACH,
    &END,
    &CLOSE,
    &RECEIVED,
    &ACCEPTED,
    &REJECTED,
    &RELEASED,
    &MODIFIED,
    &SOURCE,
    &TARGET,
    &DELETE_ON_CLOSE,
    &DELETE_ON_NO_LINKS,
    &DELETE_ON_NO_MESSAGES,
    &DELETE_ON_NO_LINKS_OR_MESSAGES,
];

/// Find the definition by numeric code
pub fn lookup_code(code: u64) -> Option<&'static CompositeDef> {
    ALL.iter().copied().find(|def| def.code == code)
}

/// Find the definition by symbolic name
pub fn lookup_name(name: &str) -> Option<&'static CompositeDef> {
    ALL.iter().copied().find(|def| def.name == name)
}

/// Find the definition named by a descriptor
pub fn lookup(descriptor: &Descriptor) -> Option<&'static CompositeDef> {
    match descriptor {
        Descriptor::Code(code) => lookup_code(*code),
        Descriptor::Name(name) => lookup_name(name.as_str()),
    }
}

/// Resolve the definition of a described value within a group
///
/// A descriptor that is not in the group, or a value that is not described, is
/// [`Error::UnknownDescriptor`] or [`Error::InvalidValue`] respectively.
pub fn resolve(
    value: &Value,
    group: &[&'static CompositeDef],
) -> Result<&'static CompositeDef, Error> {
    let described = value.as_described().ok_or(Error::InvalidValue)?;
    group
        .iter()
        .copied()
        .find(|def| def.matches(&described.descriptor))
        .ok_or_else(|| Error::UnknownDescriptor(described.descriptor.clone()))
}

/// Decode one value and resolve its descriptor against every known composite
pub fn decode(bytes: &[u8]) -> Result<(Value, &'static CompositeDef, usize), Error> {
    let (value, code, consumed) = ferrum_codec::decode(bytes)?;
    if code != EncodingCodes::DescribedType {
        return Err(Error::InvalidValue);
    }
    let def = resolve(&value, &ALL)?;
    Ok((value, def, consumed))
}
