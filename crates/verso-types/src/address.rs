use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A location in the program's linear address space.
///
/// Addresses are immutable and totally ordered by offset. Property maps use
/// them as keys, so the ordering here is the ordering every forward scan of a
/// map observes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(u64);

impl Address {
    /// The lowest address in the space.
    pub const MIN: Self = Self(0);
    /// The highest address in the space.
    pub const MAX: Self = Self(u64::MAX);

    /// Create an address from a raw offset.
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// The raw offset.
    pub const fn offset(&self) -> u64 {
        self.0
    }

    /// The address immediately after this one, or `None` at the top of the space.
    pub fn successor(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Parse `0x`-prefixed (or bare) hexadecimal.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() {
            return Err(TypeError::InvalidAddress(s.to_string()));
        }
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| TypeError::InvalidAddress(format!("{s}: {e}")))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<u64> for Address {
    fn from(offset: u64) -> Self {
        Self(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_prefixed_and_bare_hex() {
        assert_eq!(Address::from_hex("0x1002472").unwrap(), Address::new(0x1002472));
        assert_eq!(Address::from_hex("10018ba").unwrap(), Address::new(0x10018ba));
        assert_eq!("0X10".parse::<Address>().unwrap(), Address::new(16));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Address::from_hex("").is_err());
        assert!(Address::from_hex("0x").is_err());
        assert!(Address::from_hex("0xzz").is_err());
    }

    #[test]
    fn display_is_prefixed_hex() {
        assert_eq!(Address::new(0x100248c).to_string(), "0x100248c");
    }

    #[test]
    fn successor_stops_at_max() {
        assert_eq!(Address::new(7).successor(), Some(Address::new(8)));
        assert_eq!(Address::MAX.successor(), None);
    }

    proptest! {
        #[test]
        fn ordering_follows_offset(a in any::<u64>(), b in any::<u64>()) {
            prop_assert_eq!(Address::new(a).cmp(&Address::new(b)), a.cmp(&b));
        }

        #[test]
        fn display_parses_back(a in any::<u64>()) {
            let addr = Address::new(a);
            prop_assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
        }
    }
}
