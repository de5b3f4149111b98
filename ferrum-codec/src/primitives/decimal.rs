//! Decimal types are carried as raw IEEE 754-2008 octets; no arithmetic is provided

macro_rules! decimal {
    ($(#[$meta:meta])* $name:ident, $width:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $width]);

        impl $name {
            /// Returns the octets in network byte order
            pub fn into_inner(self) -> [u8; $width] {
                self.0
            }
        }

        impl From<[u8; $width]> for $name {
            fn from(octets: [u8; $width]) -> Self {
                Self(octets)
            }
        }
    };
}

decimal!(
    /// 32-bit decimal number (IEEE 754-2008 decimal32)
    ///
    /// encoding name = "ieee-754", encoding code = 0x74
    /// category = fixed, width = 4
    Dec32,
    4
);

decimal!(
    /// 64-bit decimal number (IEEE 754-2008 decimal64)
    ///
    /// encoding name = "ieee-754", encoding code = 0x84
    /// category = fixed, width = 8
    Dec64,
    8
);

decimal!(
    /// 128-bit decimal number (IEEE 754-2008 decimal128)
    ///
    /// encoding name = "ieee-754", encoding code = 0x94
    /// category = fixed, width = 16
    Dec128,
    16
);
