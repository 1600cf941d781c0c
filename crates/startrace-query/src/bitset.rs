//! Set of non-negative 64-bit IDs.

use std::fmt;

use roaring::RoaringTreemap;

/// IDs matching a bitmap query. No duplicates; iteration is ascending.
#[derive(Clone, Default, PartialEq)]
pub struct BitSet {
    bits: RoaringTreemap,
}

impl BitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u64) -> bool {
        self.bits.insert(id)
    }

    pub fn remove(&mut self, id: u64) -> bool {
        self.bits.remove(id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.bits.contains(id)
    }

    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.bits.iter()
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.bits.iter().collect()
    }

    pub fn as_treemap(&self) -> &RoaringTreemap {
        &self.bits
    }
}

impl From<RoaringTreemap> for BitSet {
    fn from(bits: RoaringTreemap) -> Self {
        Self { bits }
    }
}

impl FromIterator<u64> for BitSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.bits.iter()).finish()
    }
}
