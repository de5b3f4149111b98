//! Static field schemas of composite types
//!
//! A composite is a described list whose elements are the fields of the type in schema order.
//! Each composite carries a [`CompositeDef`]: its symbolic name, its numeric code and the
//! ordered [`FieldDef`] table. [`CompositeDef::encode_fields`] and
//! [`CompositeDef::decode_fields`] consult that table so that the typed layer never deals
//! with mandatory checks, defaults or multiple-valued fields itself.
//!
//! ```rust
//! use ferrum_codec::composite::{CompositeDef, DefaultValue, FieldDef, FieldType};
//! use ferrum_codec::Value;
//!
//! static FIELDS: [FieldDef; 2] = [
//!     FieldDef::mandatory("section-number", FieldType::UInt),
//!     FieldDef::optional("section-offset", FieldType::ULong).default(DefaultValue::ULong(0)),
//! ];
//! static RECEIVED: CompositeDef = CompositeDef::new("amqp:received:list", 0x23, &FIELDS);
//!
//! let value = RECEIVED.encode_fields(vec![Value::UInt(1)]).unwrap();
//! let fields = RECEIVED.decode_fields(value).unwrap();
//! assert_eq!(fields, vec![Value::UInt(1), Value::ULong(0)]);
//! ```

use crate::{
    described::Descriptor,
    error::Error,
    primitives::{Array, Binary, OrderedMap, Symbol, Timestamp, Uuid},
    value::Value,
};

/// Type of a field
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// Any value
    Any,
    /// boolean
    Boolean,
    /// ubyte
    UByte,
    /// ushort
    UShort,
    /// uint
    UInt,
    /// ulong
    ULong,
    /// int
    Int,
    /// long
    Long,
    /// timestamp
    Timestamp,
    /// uuid
    Uuid,
    /// binary
    Binary,
    /// string
    String,
    /// symbol
    Symbol,
    /// list
    List,
    /// map
    Map,
    /// A map keyed by symbols
    Fields,
    /// A described value of one of the listed composite types
    Composite(&'static [&'static CompositeDef]),
}

impl FieldType {
    /// Whether a single non-null value is of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::Boolean, Value::Bool(_))
            | (FieldType::UByte, Value::UByte(_))
            | (FieldType::UShort, Value::UShort(_))
            | (FieldType::UInt, Value::UInt(_))
            | (FieldType::ULong, Value::ULong(_))
            | (FieldType::Int, Value::Int(_))
            | (FieldType::Long, Value::Long(_))
            | (FieldType::Timestamp, Value::Timestamp(_))
            | (FieldType::Uuid, Value::Uuid(_))
            | (FieldType::Binary, Value::Binary(_))
            | (FieldType::String, Value::String(_))
            | (FieldType::Symbol, Value::Symbol(_))
            | (FieldType::List, Value::List(_))
            | (FieldType::Map, Value::Map(_)) => true,
            (FieldType::Fields, Value::Map(map)) => {
                map.iter().all(|(key, _)| matches!(key, Value::Symbol(_)))
            }
            (FieldType::Composite(defs), Value::Described(described)) => {
                defs.iter().any(|def| def.matches(&described.descriptor))
            }
            _ => false,
        }
    }
}

/// Default of an optional field, substituted when the field decodes as null
#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    /// boolean default
    Bool(bool),
    /// ubyte default
    UByte(u8),
    /// ushort default
    UShort(u16),
    /// uint default
    UInt(u32),
    /// ulong default
    ULong(u64),
    /// symbol default
    Symbol(&'static str),
}

impl DefaultValue {
    /// The default as a value
    pub fn to_value(&self) -> Value {
        match self {
            DefaultValue::Bool(b) => Value::Bool(*b),
            DefaultValue::UByte(n) => Value::UByte(*n),
            DefaultValue::UShort(n) => Value::UShort(*n),
            DefaultValue::UInt(n) => Value::UInt(*n),
            DefaultValue::ULong(n) => Value::ULong(*n),
            DefaultValue::Symbol(s) => Value::Symbol(Symbol::from(*s)),
        }
    }
}

/// One field of a composite
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Name of the field
    pub name: &'static str,
    /// Type of the field, or of each element if `multiple`
    pub ty: FieldType,
    /// Whether the field must be present
    pub mandatory: bool,
    /// Substituted for null on decode
    pub default: Option<DefaultValue>,
    /// Whether the field holds an array of `ty`
    pub multiple: bool,
}

impl FieldDef {
    /// A field that must be present
    pub const fn mandatory(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            mandatory: true,
            default: None,
            multiple: false,
        }
    }

    /// A field that may be null
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            mandatory: false,
            default: None,
            multiple: false,
        }
    }

    /// Set the default of the field
    pub const fn default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the field as multiple-valued
    pub const fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    fn check(&self, composite: &'static str, value: Value) -> Result<Value, Error> {
        let mismatch = || Error::FieldTypeMismatch {
            composite,
            field: self.name,
        };
        match (self.multiple, value) {
            (false, value) if self.ty.accepts(&value) => Ok(value),
            (true, Value::Array(array)) if array.iter().all(|e| self.ty.accepts(e)) => {
                Ok(Value::Array(array))
            }
            (true, value) if self.ty.accepts(&value) => Ok(Value::Array(Array(vec![value]))),
            _ => Err(mismatch()),
        }
    }
}

/// Static definition of a composite type
#[derive(Debug)]
pub struct CompositeDef {
    /// Symbolic descriptor
    pub name: &'static str,
    /// Numeric descriptor
    pub code: u64,
    /// Fields in wire order
    pub fields: &'static [FieldDef],
}

impl CompositeDef {
    /// Creates a new definition
    pub const fn new(name: &'static str, code: u64, fields: &'static [FieldDef]) -> Self {
        Self { name, code, fields }
    }

    /// The numeric descriptor, used when encoding
    pub fn descriptor(&self) -> Descriptor {
        Descriptor::Code(self.code)
    }

    /// Whether the descriptor names this composite, either by code or by name
    pub fn matches(&self, descriptor: &Descriptor) -> bool {
        match descriptor {
            Descriptor::Code(code) => *code == self.code,
            Descriptor::Name(name) => name.as_str() == self.name,
        }
    }

    /// Build the described list for the given field values
    ///
    /// Fields are given in schema order with [`Value::Null`] for absent ones. Mandatory fields
    /// must not be null and every present field must match its type. Trailing nulls are not
    /// written.
    pub fn encode_fields(&self, mut values: Vec<Value>) -> Result<Value, Error> {
        if values.len() > self.fields.len() {
            return Err(Error::TooManyFields {
                composite: self.name,
                count: values.len(),
            });
        }
        for (i, field) in self.fields.iter().enumerate() {
            match values.get_mut(i) {
                None | Some(Value::Null) if field.mandatory => {
                    return Err(Error::MissingMandatoryField {
                        composite: self.name,
                        field: field.name,
                    })
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    let checked = field.check(self.name, std::mem::take(value))?;
                    *value = checked;
                }
            }
        }
        Ok(self.to_described(values))
    }

    /// Build the described list without checking the fields
    ///
    /// Used for nested composites whose typed form already guarantees a valid encoding.
    pub fn to_described(&self, mut values: Vec<Value>) -> Value {
        while matches!(values.last(), Some(Value::Null)) {
            values.pop();
        }
        Value::described(self.descriptor(), Value::List(values))
    }

    /// Split a described list into its field values
    ///
    /// The result always has one value per field. Absent fields take their default or
    /// [`Value::Null`], and multiple-valued fields are always arrays.
    pub fn decode_fields(&self, value: Value) -> Result<Vec<Value>, Error> {
        let described = match value {
            Value::Described(described) if self.matches(&described.descriptor) => described,
            _ => return Err(Error::DescriptorMismatch { expected: self.name }),
        };
        let items = match described.value {
            Value::List(items) => items,
            _ => return Err(Error::InvalidValue),
        };
        if items.len() > self.fields.len() {
            return Err(Error::TooManyFields {
                composite: self.name,
                count: items.len(),
            });
        }

        let mut items = items.into_iter();
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let value = match items.next() {
                None | Some(Value::Null) => match (field.default, field.mandatory) {
                    (Some(default), _) => default.to_value(),
                    (None, true) => {
                        return Err(Error::MissingMandatoryField {
                            composite: self.name,
                            field: field.name,
                        })
                    }
                    (None, false) => Value::Null,
                },
                Some(value) => field.check(self.name, value)?,
            };
            fields.push(value);
        }
        Ok(fields)
    }

    /// Decode into a [`FieldReader`] for typed extraction
    pub fn reader(&'static self, value: Value) -> Result<FieldReader, Error> {
        let fields = self.decode_fields(value)?;
        Ok(FieldReader {
            def: self,
            fields: fields.into_iter(),
            index: 0,
        })
    }
}

/// Typed extraction of decoded fields, in schema order
#[derive(Debug)]
pub struct FieldReader {
    def: &'static CompositeDef,
    fields: std::vec::IntoIter<Value>,
    index: usize,
}

impl FieldReader {
    /// Convert the next field
    pub fn next<T: FieldValue>(&mut self) -> Result<T, Error> {
        let field = self.def.fields.get(self.index).map(|f| f.name).unwrap_or("");
        self.index += 1;
        let value = self.fields.next().unwrap_or(Value::Null);
        T::from_value(value).map_err(|err| match err {
            Error::InvalidValue => Error::FieldTypeMismatch {
                composite: self.def.name,
                field,
            },
            err => err,
        })
    }
}

/// Conversion between a Rust type and the value of a field
pub trait FieldValue: Sized {
    /// Convert from a field value, [`Error::InvalidValue`] if the type does not match
    fn from_value(value: Value) -> Result<Self, Error>;

    /// Convert into a field value
    fn into_value(self) -> Value;
}

macro_rules! impl_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn from_value(value: Value) -> Result<Self, Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        _ => Err(Error::InvalidValue),
                    }
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

impl_field_value! {
    bool => Bool,
    u8 => UByte,
    u16 => UShort,
    u32 => UInt,
    u64 => ULong,
    i32 => Int,
    i64 => Long,
    Timestamp => Timestamp,
    Uuid => Uuid,
    Binary => Binary,
    String => String,
    Symbol => Symbol,
}

impl FieldValue for Value {
    fn from_value(value: Value) -> Result<Self, Error> {
        Ok(value)
    }

    fn into_value(self) -> Value {
        self
    }
}

impl FieldValue for OrderedMap<Symbol, Value> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Map(map) => map
                .into_iter()
                .map(|(key, value)| match key {
                    Value::Symbol(key) => Ok((key, value)),
                    _ => Err(Error::InvalidValue),
                })
                .collect(),
            _ => Err(Error::InvalidValue),
        }
    }

    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(key, value)| (Value::Symbol(key), value))
                .collect(),
        )
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Array(array) => array.into_iter().map(T::from_value).collect(),
            _ => Err(Error::InvalidValue),
        }
    }

    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(FieldValue::into_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{CompositeDef, DefaultValue, FieldDef, FieldType};
    use crate::{
        de::from_slice, described::Descriptor, primitives::Array, primitives::Symbol,
        ser::to_vec, value::Value, Error,
    };

    static ITEM_FIELDS: [FieldDef; 1] = [FieldDef::mandatory("n", FieldType::UInt)];
    static ITEM: CompositeDef = CompositeDef::new("test:item:list", 0x9901, &ITEM_FIELDS);
    static ITEM_TYPE: [&CompositeDef; 1] = [&ITEM];

    static SAMPLE_FIELDS: [FieldDef; 5] = [
        FieldDef::mandatory("id", FieldType::String),
        FieldDef::optional("count", FieldType::UInt).default(DefaultValue::UInt(7)),
        FieldDef::optional("tags", FieldType::Symbol).multiple(),
        FieldDef::optional("item", FieldType::Composite(&ITEM_TYPE)),
        FieldDef::optional("props", FieldType::Fields),
    ];
    static SAMPLE: CompositeDef = CompositeDef::new("test:sample:list", 0x9900, &SAMPLE_FIELDS);

    #[test]
    fn missing_mandatory_field_fails_to_encode() {
        let err = SAMPLE.encode_fields(vec![Value::Null, Value::UInt(1)]).unwrap_err();
        assert_eq!(
            err,
            Error::MissingMandatoryField {
                composite: "test:sample:list",
                field: "id"
            }
        );
        assert!(SAMPLE.encode_fields(vec![]).is_err());
    }

    #[test]
    fn trailing_nulls_are_trimmed() {
        let value = SAMPLE
            .encode_fields(vec![Value::from("a"), Value::Null, Value::Null])
            .unwrap();
        assert_eq!(
            to_vec(&value).unwrap(),
            [0x00, 0x80, 0, 0, 0, 0, 0, 0, 0x99, 0x00, 0xc0, 0x04, 0x01, 0xa1, 0x01, b'a']
        );
    }

    #[test]
    fn absent_optional_field_decodes_to_default() {
        let value = SAMPLE.encode_fields(vec![Value::from("a")]).unwrap();
        let bytes = to_vec(&value).unwrap();
        let fields = SAMPLE.decode_fields(from_slice(&bytes).unwrap()).unwrap();
        assert_eq!(
            fields,
            vec![
                Value::from("a"),
                Value::UInt(7),
                Value::Null,
                Value::Null,
                Value::Null
            ]
        );
    }

    #[test]
    fn single_value_of_multiple_field_becomes_array() {
        let fields = vec![
            Value::from("a"),
            Value::Null,
            Value::Symbol(Symbol::from("x")),
        ];
        let value = Value::described(Descriptor::code(0x9900), Value::List(fields));
        let decoded = SAMPLE.decode_fields(value).unwrap();
        assert_eq!(
            decoded[2],
            Value::Array(Array::from(vec![Value::Symbol(Symbol::from("x"))]))
        );
    }

    #[test]
    fn type_mismatch_is_reported_with_the_field_name() {
        let value = Value::described(
            Descriptor::code(0x9900),
            Value::List(vec![Value::from("a"), Value::from("not a uint")]),
        );
        assert_eq!(
            SAMPLE.decode_fields(value),
            Err(Error::FieldTypeMismatch {
                composite: "test:sample:list",
                field: "count"
            })
        );
    }

    #[test]
    fn nested_composite_is_matched_by_code_or_name() {
        let by_code = Value::described(Descriptor::code(0x9901), Value::List(vec![Value::UInt(1)]));
        let by_name = Value::described(
            Descriptor::name("test:item:list"),
            Value::List(vec![Value::UInt(1)]),
        );
        let other = Value::described(Descriptor::code(0x1), Value::List(vec![]));

        for (nested, ok) in [(by_code, true), (by_name, true), (other, false)] {
            let result = SAMPLE.encode_fields(vec![Value::from("a"), Value::Null, Value::Null, nested]);
            assert_eq!(result.is_ok(), ok);
        }
    }

    #[test]
    fn wrong_descriptor_and_extra_fields() {
        let value = Value::described(Descriptor::code(0x9901), Value::List(vec![Value::UInt(1)]));
        assert_eq!(
            SAMPLE.decode_fields(value),
            Err(Error::DescriptorMismatch {
                expected: "test:sample:list"
            })
        );

        let value = Value::described(
            Descriptor::code(0x9901),
            Value::List(vec![Value::UInt(1), Value::UInt(2)]),
        );
        assert!(matches!(
            ITEM.decode_fields(value),
            Err(Error::TooManyFields { count: 2, .. })
        ));
    }

    #[test]
    fn reader_converts_in_order() {
        let value = SAMPLE
            .encode_fields(vec![Value::from("a"), Value::UInt(3)])
            .unwrap();
        let mut reader = SAMPLE.reader(value).unwrap();
        let id: String = reader.next().unwrap();
        let count: u32 = reader.next().unwrap();
        let tags: Option<Vec<Symbol>> = reader.next().unwrap();
        assert_eq!(id, "a");
        assert_eq!(count, 3);
        assert_eq!(tags, None);
        assert!(reader.next::<bool>().is_err());
    }
}
