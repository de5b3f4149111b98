/// Enum whose variants are encoded as fixed symbols
macro_rules! symbol_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $sym:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )*
        }

        impl $name {
            /// The symbol of the variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $sym,)*
                }
            }
        }

        impl std::convert::TryFrom<&str> for $name {
            type Error = ferrum_codec::Error;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                match value {
                    $($sym => Ok($name::$variant),)*
                    _ => Err(ferrum_codec::Error::InvalidValue),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ferrum_codec::composite::FieldValue for $name {
            fn from_value(value: ferrum_codec::Value) -> Result<Self, ferrum_codec::Error> {
                match value {
                    ferrum_codec::Value::Symbol(sym) => Self::try_from(sym.as_str()),
                    _ => Err(ferrum_codec::Error::InvalidValue),
                }
            }

            fn into_value(self) -> ferrum_codec::Value {
                ferrum_codec::Value::Symbol(ferrum_codec::primitives::Symbol::from(self.as_str()))
            }
        }
    };
}

/// Implements `FieldValue` for composites so they can be nested as fields
macro_rules! composite_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ferrum_codec::composite::FieldValue for $ty {
                fn from_value(value: ferrum_codec::Value) -> Result<Self, ferrum_codec::Error> {
                    <$ty as $crate::composite::Composite>::try_from_value(value)
                }

                fn into_value(self) -> ferrum_codec::Value {
                    let def = <$ty as $crate::composite::Composite>::definition();
                    def.to_described($crate::composite::Composite::into_fields(self))
                }
            }
        )*
    };
}
