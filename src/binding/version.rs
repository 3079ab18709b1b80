//! Native library version descriptor.
//!
//! The shim reports its LLVM version as one packed 32-bit value with the
//! major version in the most significant non-zero byte. Decoding peels bytes
//! off the low end until nothing is left and then reverses them, so leading
//! zero bytes vanish and every other byte becomes a component.

use std::cmp::Ordering;
use std::fmt;

/// Version components, most significant first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    components: Vec<u8>,
}

impl Version {
    pub fn new(components: Vec<u8>) -> Self {
        Self { components }
    }

    /// Decode a packed version value.
    ///
    /// `0x000F0007` decodes to `15.0.7`. Zero decodes to an empty version.
    pub fn decode(packed: u32) -> Self {
        let mut bytes = Vec::with_capacity(4);
        let mut rest = packed;
        while rest != 0 {
            bytes.push((rest & 0xFF) as u8);
            rest >>= 8;
        }
        bytes.reverse();
        Self { components: bytes }
    }

    /// Re-pack the components; the inverse of [`Version::decode`]
    pub fn pack(&self) -> u32 {
        self.components
            .iter()
            .fold(0u32, |acc, &c| acc.wrapping_shl(8) | c as u32)
    }

    /// Parse a dotted version such as `15.0` or `18.1.8`
    pub fn parse(s: &str) -> Option<Self> {
        let components = s
            .trim()
            .split('.')
            .map(|part| part.parse::<u8>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self { components })
    }

    pub fn components(&self) -> &[u8] {
        &self.components
    }

    /// Component `n`, or 0 when the packed value did not carry it
    pub fn component(&self, n: usize) -> u8 {
        self.components.get(n).copied().unwrap_or(0)
    }

    pub fn major(&self) -> u8 {
        self.component(0)
    }

    pub fn minor(&self) -> u8 {
        self.component(1)
    }

    pub fn patch(&self) -> u8 {
        self.component(2)
    }

    /// `(major, minor, patch)`
    pub fn triple(&self) -> (u8, u8, u8) {
        (self.major(), self.minor(), self.patch())
    }

    /// True when the packed value carried no components at all
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component-wise comparison, missing components counting as 0
    pub fn at_least(&self, required: &Version) -> bool {
        self.compare(required) != Ordering::Less
    }

    fn compare(&self, other: &Version) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("0");
        }
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
