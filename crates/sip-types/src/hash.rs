use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Hash functions available for content integrity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashFunction {
    #[serde(rename = "sha-1")]
    Sha1,
    #[serde(rename = "sha-256")]
    Sha256,
    #[serde(rename = "sha-384")]
    Sha384,
    #[serde(rename = "sha-512")]
    Sha512,
    Blake3,
}

impl HashFunction {
    /// Name as written into PDI and descriptor attributes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha-1",
            Self::Sha256 => "sha-256",
            Self::Sha384 => "sha-384",
            Self::Sha512 => "sha-512",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashFunction {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "sha-1" | "sha1" => Ok(Self::Sha1),
            "sha-256" | "sha256" => Ok(Self::Sha256),
            "sha-384" | "sha384" => Ok(Self::Sha384),
            "sha-512" | "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(TypeError::UnknownHashFunction(s.to_string())),
        }
    }
}

/// Textual encoding of a digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Base64,
    Hex,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Hex => "hex",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            _ => Err(TypeError::UnknownEncoding(s.to_string())),
        }
    }
}

/// An encoded digest of one digital object's full byte stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash {
    pub function: HashFunction,
    pub encoding: Encoding,
    pub value: String,
}

impl ContentHash {
    pub fn new(function: HashFunction, encoding: Encoding, value: impl Into<String>) -> Self {
        Self {
            function,
            encoding,
            value: value.into(),
        }
    }
}

/// What the assembler learned about one embedded digital object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInfo {
    /// Path of the object inside the container.
    pub reference_information: String,
    /// Number of bytes read from the source stream.
    pub size: u64,
    pub hashes: Vec<ContentHash>,
}

impl ContentInfo {
    /// First hash computed with `function`, if any.
    pub fn hash(&self, function: HashFunction) -> Option<&ContentHash> {
        self.hashes.iter().find(|h| h.function == function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_function_names_parse_back() {
        for f in [
            HashFunction::Sha1,
            HashFunction::Sha256,
            HashFunction::Sha384,
            HashFunction::Sha512,
            HashFunction::Blake3,
        ] {
            assert_eq!(f.name().parse::<HashFunction>().unwrap(), f);
        }
    }

    #[test]
    fn hash_function_accepts_loose_spelling() {
        assert_eq!("SHA256".parse::<HashFunction>().unwrap(), HashFunction::Sha256);
        assert_eq!("sha_512".parse::<HashFunction>().unwrap(), HashFunction::Sha512);
    }

    #[test]
    fn unknown_hash_function() {
        let err = "md5".parse::<HashFunction>().unwrap_err();
        assert_eq!(err, TypeError::UnknownHashFunction("md5".into()));
    }

    #[test]
    fn encoding_parse() {
        assert_eq!("BASE64".parse::<Encoding>().unwrap(), Encoding::Base64);
        assert_eq!("hex".parse::<Encoding>().unwrap(), Encoding::Hex);
        assert!("base32".parse::<Encoding>().is_err());
    }

    #[test]
    fn serde_uses_attribute_names() {
        let json = serde_json::to_string(&HashFunction::Sha256).unwrap();
        assert_eq!(json, "\"sha-256\"");
        let enc: Encoding = serde_json::from_str("\"base64\"").unwrap();
        assert_eq!(enc, Encoding::Base64);
    }

    #[test]
    fn content_info_lookup_by_function() {
        let info = ContentInfo {
            reference_information: "a.txt".into(),
            size: 3,
            hashes: vec![
                ContentHash::new(HashFunction::Sha1, Encoding::Hex, "aa"),
                ContentHash::new(HashFunction::Sha256, Encoding::Base64, "bb"),
            ],
        };
        assert_eq!(info.hash(HashFunction::Sha256).unwrap().value, "bb");
        assert!(info.hash(HashFunction::Blake3).is_none());
    }
}
