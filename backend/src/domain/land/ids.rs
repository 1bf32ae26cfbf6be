//! Identifiers used by the land allocation aggregate.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LandValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id! {
    /// Identifier of a land parcel inventory pool.
    ParcelId
}

uuid_id! {
    /// Identifier of a unit carved out of a parcel.
    UnitId
}

uuid_id! {
    /// Identifier of a member-to-unit allocation.
    AllocationId
}

/// Opaque member identifier supplied by the authentication collaborator.
///
/// The value is not interpreted beyond basic hygiene checks.
///
/// # Examples
/// ```
/// use allotment::domain::land::MemberId;
///
/// let member = MemberId::new("member-1").expect("valid member id");
/// assert_eq!(member.as_ref(), "member-1");
/// assert!(MemberId::new(" padded ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    /// Maximum accepted length in characters.
    pub const MAX_LEN: usize = 128;

    /// Validate and construct a [`MemberId`].
    pub fn new(id: impl Into<String>) -> Result<Self, LandValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(LandValidationError::EmptyMemberId);
        }
        if id.trim() != id {
            return Err(LandValidationError::MemberIdWhitespace);
        }
        if id.chars().count() > Self::MAX_LEN {
            return Err(LandValidationError::MemberIdTooLong { max: Self::MAX_LEN });
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for MemberId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MemberId {
    type Error = LandValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MemberId> for String {
    fn from(value: MemberId) -> Self {
        value.0
    }
}

/// Human-readable allocation reference shown to members and operators.
///
/// Generated from a fresh UUID so uniqueness never depends on clock
/// behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    const PREFIX: &'static str = "LA-";

    /// Mint a new reference number.
    ///
    /// # Examples
    /// ```
    /// use allotment::domain::land::ReferenceNumber;
    ///
    /// let reference = ReferenceNumber::generate();
    /// assert!(reference.as_ref().starts_with("LA-"));
    /// assert_eq!(reference.as_ref().len(), 35);
    /// ```
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Derive the reference number for a known UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        let hex = uuid.simple().to_string().to_ascii_uppercase();
        Self(format!("{}{hex}", Self::PREFIX))
    }

    /// Parse a stored reference number.
    pub fn parse(value: impl Into<String>) -> Result<Self, LandValidationError> {
        let value = value.into();
        let valid = value
            .strip_prefix(Self::PREFIX)
            .is_some_and(|hex| {
                hex.len() == 32
                    && hex
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            });
        if valid {
            Ok(Self(value))
        } else {
            Err(LandValidationError::InvalidReferenceNumber)
        }
    }
}

impl AsRef<str> for ReferenceNumber {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReferenceNumber {
    type Error = LandValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ReferenceNumber> for String {
    fn from(value: ReferenceNumber) -> Self {
        value.0
    }
}
