use crate::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_TUBE_NAME_LEN: usize = 200;

/// A tube name that the server will accept.
///
/// Names are 1 to 200 bytes of ASCII letters, digits and `-+/;.$_()`, and
/// may not begin with a hyphen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TubeName(String);

impl TubeName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        let reason = if name.is_empty() {
            Some("must not be empty")
        } else if name.len() > MAX_TUBE_NAME_LEN {
            Some("longer than 200 bytes")
        } else if name.starts_with('-') {
            Some("must not start with '-'")
        } else if !name.bytes().all(is_name_byte) {
            Some("contains a character outside [A-Za-z0-9-+/;.$_()]")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ProtocolError::InvalidTubeName { name, reason }),
            None => Ok(TubeName(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == crate::DEFAULT_TUBE
    }

    /// The tube every connection starts out watching.
    pub fn default_tube() -> Self {
        TubeName(crate::DEFAULT_TUBE.to_string())
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"-+/;.$_()".contains(&b)
}

impl fmt::Display for TubeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TubeName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        TubeName::new(s)
    }
}

impl TryFrom<String> for TubeName {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        TubeName::new(value)
    }
}

impl From<TubeName> for String {
    fn from(name: TubeName) -> Self {
        name.0
    }
}

impl AsRef<str> for TubeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
