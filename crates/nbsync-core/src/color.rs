// Cable and role color grammar.
//
//   color := ws* ( name | '#'? hex{3} | '#'? hex{6} ) ws*
//
// Output is always six lowercase hex digits, the form the API stores.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const NAMED: [(&str, &str); 10] = [
    ("purple", "800080"),
    ("blue", "0000ff"),
    ("yellow", "ffff00"),
    ("red", "ff0000"),
    ("white", "ffffff"),
    ("black", "000000"),
    ("gray", "808080"),
    ("grey", "808080"),
    ("orange", "ffa500"),
    ("green", "008000"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}': expected a color name or 3/6 hex digits")]
pub struct InvalidColor(pub String);

/// A normalised RGB color.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Color(String);

impl Color {
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl FromStr for Color {
    type Err = InvalidColor;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let raw = input.trim().to_ascii_lowercase();
        if let Some((_, hex)) = NAMED.iter().find(|(name, _)| *name == raw) {
            return Ok(Self((*hex).to_owned()));
        }

        let digits = raw.strip_prefix('#').unwrap_or(&raw);
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidColor(input.to_owned()));
        }
        match digits.len() {
            6 => Ok(Self(digits.to_owned())),
            3 => Ok(Self(digits.chars().flat_map(|c| [c, c]).collect())),
            _ => Err(InvalidColor(input.to_owned())),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hex(s: &str) -> String {
        s.parse::<Color>().unwrap().to_string()
    }

    #[test]
    fn names_map_to_hex() {
        assert_eq!(hex("purple"), "800080");
        assert_eq!(hex("  Grey "), "808080");
        assert_eq!(hex("GREEN"), "008000");
    }

    #[test]
    fn hex_forms_normalise() {
        assert_eq!(hex("#FF00aa"), "ff00aa");
        assert_eq!(hex("4caf50"), "4caf50");
        assert_eq!(hex("#abc"), "aabbcc");
        assert_eq!(hex("F0a"), "ff00aa");
    }

    #[test]
    fn malformed_input_is_rejected() {
        for bad in ["", "#", "ff00", "#ff00aa0", "magenta", "#gg0000", "##fff"] {
            assert!(bad.parse::<Color>().is_err(), "{bad:?} should be rejected");
        }
    }
}
