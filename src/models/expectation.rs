use serde::{Deserialize, Serialize};

/// Set of status codes a probe accepts as passing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusExpectation {
    /// Exactly this status code.
    Exact(u16),
    /// Any one of these status codes.
    OneOf(Vec<u16>),
    /// Any status code strictly below this one.
    Below(u16),
}

impl StatusExpectation {
    pub fn one_of(codes: &[u16]) -> Self {
        Self::OneOf(codes.to_vec())
    }

    /// Anything that isn't a server error.
    pub const fn not_server_error() -> Self {
        Self::Below(500)
    }

    pub fn matches(&self, status: u16) -> bool {
        match self {
            Self::Exact(expected) => status == *expected,
            Self::OneOf(codes) => codes.contains(&status),
            Self::Below(limit) => status < *limit,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Exact(code) => format!("= {code}"),
            Self::OneOf(codes) => {
                let codes: Vec<_> = codes.iter().map(ToString::to_string).collect();
                format!("in [{}]", codes.join(", "))
            }
            Self::Below(limit) => format!("< {limit}"),
        }
    }
}
