use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Telescopes served by the observation management system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Telescope {
    Jcmt,
    Ukirt,
}

impl Telescope {
    /// Every known telescope, in a stable order.
    pub const ALL: [Telescope; 2] = [Telescope::Jcmt, Telescope::Ukirt];

    /// Upper-case name, also used as the prefix of sentinel project IDs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Telescope::Jcmt => "JCMT",
            Telescope::Ukirt => "UKIRT",
        }
    }
}

impl fmt::Display for Telescope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Telescope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "JCMT" => Ok(Telescope::Jcmt),
            "UKIRT" => Ok(Telescope::Ukirt),
            other => Err(format!("Unknown telescope: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("jcmt".parse::<Telescope>().unwrap(), Telescope::Jcmt);
        assert_eq!(" Ukirt ".parse::<Telescope>().unwrap(), Telescope::Ukirt);
        assert!("keck".parse::<Telescope>().is_err());
    }

    #[test]
    fn test_serde_uses_upper_case() {
        let json = serde_json::to_string(&Telescope::Ukirt).unwrap();
        assert_eq!(json, "\"UKIRT\"");
        let tel: Telescope = serde_json::from_str("\"JCMT\"").unwrap();
        assert_eq!(tel, Telescope::Jcmt);
    }
}
