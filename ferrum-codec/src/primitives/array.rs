use crate::value::Value;

/// A sequence of values of a single type
///
/// encoding name = "array8", encoding code = 0xe0
/// category = array, width = 1,
/// label="up to 2^8 - 1 array elements with total size less than 2^8 octets"
///
/// encoding name = "array32", encoding code = 0xf0,
/// category = array, width = 4
/// label="up to 2^32 - 1 array elements with total size less than 2^32 octets"
///
/// Homogeneity is checked when the array is encoded: every element must be expressible with
/// one shared constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Array(pub Vec<Value>);

impl Array {
    /// Creates an empty array
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the array has no element
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the elements
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Consumes the wrapper into the inner vec
    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Array {
    fn from(val: Vec<Value>) -> Self {
        Self(val)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Array {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
