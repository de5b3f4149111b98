//! Custom error

use crate::described::Descriptor;

/// Encoding and decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Invalid format code
    #[error("Invalid format code 0x{0:02x}")]
    InvalidFormatCode(u8),

    /// The input ended before the value was complete
    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// The declared size of a compound value disagrees with the bytes its elements occupy
    #[error("Length mismatch: declared {declared}, consumed {consumed}")]
    LengthMismatch {
        /// Size or count found in the encoding
        declared: usize,
        /// Size or count actually taken by the elements
        consumed: usize,
    },

    /// Length is invalid
    #[error("Invalid length")]
    InvalidLength,

    /// Found invalid UTF-8 encoding
    #[error("Invalid UTF-8 encoding")]
    InvalidUtf8Encoding,

    /// A symbol contains non-ASCII characters
    #[error("Symbol must be ASCII")]
    InvalidSymbol,

    /// Invalid value
    #[error("Invalid value")]
    InvalidValue,

    /// A descriptor that is neither a ulong nor a symbol
    #[error("Descriptor must be a ulong or a symbol")]
    InvalidDescriptor,

    /// The descriptor does not name any known composite type
    #[error("Unknown descriptor {0}")]
    UnknownDescriptor(Descriptor),

    /// A composite was decoded against the wrong definition
    #[error("Expecting descriptor {expected}")]
    DescriptorMismatch {
        /// Name of the expected composite type
        expected: &'static str,
    },

    /// The same key appears twice in a map
    #[error("Duplicated map key")]
    DuplicateMapKey,

    /// The elements of an array do not share one constructor
    #[error("Array elements must be of the same type")]
    NotHomogeneous,

    /// The value does not fit in the largest encoding
    #[error("Too long")]
    TooLong,

    /// Described or compound values nested past the decoder's limit
    #[error("Nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    /// The value cannot be written with the requested encoding code
    #[error("Value cannot be encoded as {code}")]
    EncodingMismatch {
        /// Requested encoding code
        code: crate::format_code::EncodingCodes,
    },

    /// A mandatory field of a composite is absent
    #[error("Mandatory field {composite}.{field} is missing")]
    MissingMandatoryField {
        /// Name of the composite type
        composite: &'static str,
        /// Name of the field
        field: &'static str,
    },

    /// A field of a composite holds a value of the wrong type
    #[error("Field {composite}.{field} has the wrong type")]
    FieldTypeMismatch {
        /// Name of the composite type
        composite: &'static str,
        /// Name of the field
        field: &'static str,
    },

    /// A composite list carries more elements than its definition has fields
    #[error("{composite} has {count} fields, more than defined")]
    TooManyFields {
        /// Name of the composite type
        composite: &'static str,
        /// Number of elements found
        count: usize,
    },
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}
