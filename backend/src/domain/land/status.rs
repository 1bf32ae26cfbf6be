//! Status vocabularies for units and allocations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle state of a parcel unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LandUnitStatus {
    Available,
    Allotted,
    Locked,
}

impl LandUnitStatus {
    /// Stable storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Allotted => "allotted",
            Self::Locked => "locked",
        }
    }
}

/// Error returned when parsing a unit status from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLandUnitStatusError;

impl fmt::Display for LandUnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ParseLandUnitStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid land unit status")
    }
}

impl std::error::Error for ParseLandUnitStatusError {}

impl FromStr for LandUnitStatus {
    type Err = ParseLandUnitStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "available" => Ok(Self::Available),
            "allotted" => Ok(Self::Allotted),
            "locked" => Ok(Self::Locked),
            _ => Err(ParseLandUnitStatusError),
        }
    }
}

/// Lifecycle state of a member allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Revoked,
}

impl AllocationStatus {
    /// Stable storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Revoked => "revoked",
        }
    }
}

/// Error returned when parsing an allocation status from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAllocationStatusError;

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ParseAllocationStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid allocation status")
    }
}

impl std::error::Error for ParseAllocationStatusError {}

impl FromStr for AllocationStatus {
    type Err = ParseAllocationStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "revoked" => Ok(Self::Revoked),
            _ => Err(ParseAllocationStatusError),
        }
    }
}
