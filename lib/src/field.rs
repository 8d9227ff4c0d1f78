use alloy_primitives::ruint::ParseError;
use alloy_primitives::{Address, U256};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

// =============================================================================
//                           BN254 SCALAR FIELD
// =============================================================================

/// BN254 scalar field modulus:
///   0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001
pub const MODULUS: U256 = U256::from_limbs([
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);

/// A canonical element of the BN254 scalar field (`0 <= value < MODULUS`).
///
/// This is the domain of the hash primitive, of every tree node and of every
/// public signal. Encoded as 32 bytes big-endian.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "U256", into = "U256")]
pub struct Field(U256);

/// Returned when a value is not below the field modulus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("value {0:#x} is not a canonical field element")]
pub struct NonCanonical(pub U256);

/// Returned when text does not parse as a canonical field element.
#[derive(Debug, thiserror::Error)]
pub enum FieldParseError {
    #[error("invalid field element: {0}")]
    Malformed(#[from] ParseError),

    #[error(transparent)]
    NonCanonical(#[from] NonCanonical),
}

impl Field {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const ONE: Self = Self(U256::from_limbs([1, 0, 0, 0]));

    /// Reduce an arbitrary 256-bit value into the field.
    pub fn reduce(value: U256) -> Self {
        Self(value % MODULUS)
    }

    /// Interpret 32 big-endian bytes as an integer and reduce it.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self::reduce(U256::from_be_bytes(bytes))
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }

    /// Addresses are 160 bits, always below the modulus.
    pub fn from_address(address: Address) -> Self {
        Self(U256::from_be_slice(address.as_slice()))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    pub const fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<U256> for Field {
    type Error = NonCanonical;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value < MODULUS {
            Ok(Self(value))
        } else {
            Err(NonCanonical(value))
        }
    }
}

impl From<Field> for U256 {
    fn from(value: Field) -> Self {
        value.0
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

/// Accepts `0x`-prefixed hex or decimal, rejecting non-canonical values.
impl FromStr for Field {
    type Err = FieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::try_from(U256::from_str(s.trim())?)?)
    }
}
