use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Run identifier. Only the hyphenated textual form of a version-4 UUID is
/// accepted; anything else is rejected before it can reach the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        if is_valid_run_id(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(format!("run id `{raw}` is not a version-4 UUID"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::borrow::Borrow<str> for RunId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for RunId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}

pub fn is_valid_run_id(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (i, &b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if b != b'-' {
                    return false;
                }
            }
            14 => {
                // version nibble
                if b != b'4' {
                    return false;
                }
            }
            19 => {
                // variant nibble
                if !matches!(b.to_ascii_lowercase(), b'8' | b'9' | b'a' | b'b') {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_round_trip() {
        let id = RunId::generate();
        let parsed = RunId::parse(id.as_str()).expect("generated id parses");
        assert_eq!(parsed, id);
        assert_eq!(Uuid::parse_str(id.as_str()).expect("uuid").get_version_num(), 4);
    }

    #[test]
    fn rejects_non_v4_and_malformed_input() {
        assert!(RunId::parse("").is_err());
        assert!(RunId::parse("not-a-uuid").is_err());
        assert!(RunId::parse("../../../etc/passwd").is_err());
        // version 1 layout
        assert!(RunId::parse("c232ab00-9414-11ec-b3c8-9f6bdeced846").is_err());
        // bad variant nibble
        assert!(RunId::parse("6fa459ea-ee8a-4ca4-694f-db9c023c12d3").is_err());
        assert!(RunId::parse("6fa459ea-ee8a-4ca4-894f-db9c023c12d3").is_ok());
    }

    #[test]
    fn accepts_uppercase_hex() {
        assert!(RunId::parse("6FA459EA-EE8A-4CA4-894F-DB9C023C12D3").is_ok());
    }
}
