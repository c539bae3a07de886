//! Language identifiers understood by the execution backend.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A language identifier as sent to the backend.
///
/// Unknown identifiers are kept verbatim in [`Language::Other`] rather than
/// rejected; the backend decides whether it can run them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    Python3,
    Nodejs,
    Java,
    Cpp,
    Other(String),
}

impl Language {
    pub fn parse(id: &str) -> Self {
        match id {
            "python3" => Self::Python3,
            "nodejs" => Self::Nodejs,
            "java" => Self::Java,
            "cpp" => Self::Cpp,
            other => Self::Other(other.to_string()),
        }
    }

    /// Identifier sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Python3 => "python3",
            Self::Nodejs => "nodejs",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Other(id) => id,
        }
    }

    /// Source file extension; `txt` for anything unrecognized.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Python3 => "py",
            Self::Nodejs => "js",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Other(_) => "txt",
        }
    }

    /// Name of the single file submitted to the backend.
    pub fn main_file_name(&self) -> String {
        format!("main.{}", self.extension())
    }
}

impl FromStr for Language {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Language {
    fn from(id: String) -> Self {
        Self::parse(&id)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.as_str().to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
