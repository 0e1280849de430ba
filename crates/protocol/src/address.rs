use crate::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A camera address in dotted-quad shape.
///
/// Only the shape is checked: four groups of one to three ASCII digits
/// separated by dots. Octet values are not range checked, so `999.999.999.999`
/// is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CameraAddress(String);

impl CameraAddress {
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        if is_dotted_quad(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(ProtocolError::InvalidAddress)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_dotted_quad(input: &str) -> bool {
    let mut groups = 0;
    for group in input.split('.') {
        groups += 1;
        if groups > 4 || group.is_empty() || group.len() > 3 {
            return false;
        }
        if !group.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    groups == 4
}

impl FromStr for CameraAddress {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CameraAddress {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CameraAddress> for String {
    fn from(value: CameraAddress) -> Self {
        value.0
    }
}

impl fmt::Display for CameraAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
