/// A universally unique identifier as defined by RFC-4122 section 4.1.2
///
/// encoding code = 0x98,
/// category = fixed, width = 16,
/// label="UUID as defined in section 4.1.2 of RFC-4122"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uuid([u8; 16]);

impl Uuid {
    /// Returns the octets in network byte order
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Consumes the wrapper into the inner octets
    pub fn into_inner(self) -> [u8; 16] {
        self.0
    }
}

impl From<[u8; 16]> for Uuid {
    fn from(val: [u8; 16]) -> Self {
        Self(val)
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for Uuid {
    fn from(val: uuid::Uuid) -> Self {
        Self(val.into_bytes())
    }
}

#[cfg(feature = "uuid")]
impl From<Uuid> for uuid::Uuid {
    fn from(val: Uuid) -> Self {
        uuid::Uuid::from_bytes(val.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Uuid;

    #[test]
    fn from_uuid_crate_bytes() {
        let id = uuid::Uuid::new_v4();
        let wrapped = Uuid::from(*id.as_bytes());
        assert_eq!(wrapped.as_bytes(), id.as_bytes());
    }
}
