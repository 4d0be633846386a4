// This file is part of Barge.
//
// Barge is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Barge is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Barge.
// If not, see https://www.gnu.org/licenses/.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// An ERC-4337 entry point revert code, classified from a free-form failure
/// reason string such as `"AA25 invalid account nonce"`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum AaCode {
    Aa10,
    Aa13,
    Aa14,
    Aa15,
    Aa20,
    Aa21,
    Aa22,
    Aa23,
    Aa24,
    Aa25,
    Aa30,
    Aa31,
    Aa32,
    Aa33,
    Aa34,
    Aa40,
    Aa41,
    Aa50,
    Aa51,
    Aa90,
    Aa91,
    Aa92,
    Aa93,
    Aa94,
    Aa95,
    Aa96,
    /// The reason did not carry a recognized entry point revert code
    Unknown,
}

impl AaCode {
    /// Classify a failure reason by scanning for the first `AAnn` token.
    pub fn from_reason(reason: &str) -> Self {
        let bytes = reason.as_bytes();
        for i in 0..bytes.len().saturating_sub(3) {
            if &bytes[i..i + 2] == b"AA"
                && bytes[i + 2].is_ascii_digit()
                && bytes[i + 3].is_ascii_digit()
            {
                return Self::from_token(&reason[i + 2..i + 4]);
            }
        }
        Self::Unknown
    }

    fn from_token(digits: &str) -> Self {
        match digits {
            "10" => Self::Aa10,
            "13" => Self::Aa13,
            "14" => Self::Aa14,
            "15" => Self::Aa15,
            "20" => Self::Aa20,
            "21" => Self::Aa21,
            "22" => Self::Aa22,
            "23" => Self::Aa23,
            "24" => Self::Aa24,
            "25" => Self::Aa25,
            "30" => Self::Aa30,
            "31" => Self::Aa31,
            "32" => Self::Aa32,
            "33" => Self::Aa33,
            "34" => Self::Aa34,
            "40" => Self::Aa40,
            "41" => Self::Aa41,
            "50" => Self::Aa50,
            "51" => Self::Aa51,
            "90" => Self::Aa90,
            "91" => Self::Aa91,
            "92" => Self::Aa92,
            "93" => Self::Aa93,
            "94" => Self::Aa94,
            "95" => Self::Aa95,
            "96" => Self::Aa96,
            _ => Self::Unknown,
        }
    }

    /// The canonical code string, or `"unknown"`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aa10 => "AA10",
            Self::Aa13 => "AA13",
            Self::Aa14 => "AA14",
            Self::Aa15 => "AA15",
            Self::Aa20 => "AA20",
            Self::Aa21 => "AA21",
            Self::Aa22 => "AA22",
            Self::Aa23 => "AA23",
            Self::Aa24 => "AA24",
            Self::Aa25 => "AA25",
            Self::Aa30 => "AA30",
            Self::Aa31 => "AA31",
            Self::Aa32 => "AA32",
            Self::Aa33 => "AA33",
            Self::Aa34 => "AA34",
            Self::Aa40 => "AA40",
            Self::Aa41 => "AA41",
            Self::Aa50 => "AA50",
            Self::Aa51 => "AA51",
            Self::Aa90 => "AA90",
            Self::Aa91 => "AA91",
            Self::Aa92 => "AA92",
            Self::Aa93 => "AA93",
            Self::Aa94 => "AA94",
            Self::Aa95 => "AA95",
            Self::Aa96 => "AA96",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for AaCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
