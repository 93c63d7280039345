use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TXID_HEX_LEN: usize = 64;

/// Channel identity: funding transaction id plus output index.
///
/// Always rendered as `<funding_txid>:<output_index>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChanPoint {
    txid: String,
    output_index: u32,
}

impl ChanPoint {
    pub fn txid(&self) -> &str {
        &self.txid
    }

    pub fn output_index(&self) -> u32 {
        self.output_index
    }
}

impl FromStr for ChanPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .split_once(':')
            .ok_or_else(|| Error::invalid(format!("channel point {:?} missing ':'", s)))?;

        if txid.len() != TXID_HEX_LEN || !txid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::invalid(format!(
                "channel point {:?}: txid must be {} hex characters",
                s, TXID_HEX_LEN
            )));
        }

        // Canonical decimal only: no sign, whitespace or leading zeros
        let canonical = !index.is_empty()
            && index.bytes().all(|b| b.is_ascii_digit())
            && (index == "0" || !index.starts_with('0'));
        if !canonical {
            return Err(Error::invalid(format!(
                "channel point {:?}: bad output index",
                s
            )));
        }
        let output_index = index.parse::<u32>().map_err(|_| {
            Error::invalid(format!("channel point {:?}: bad output index", s))
        })?;

        Ok(Self {
            txid: txid.to_ascii_lowercase(),
            output_index,
        })
    }
}

impl TryFrom<String> for ChanPoint {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ChanPoint> for String {
    fn from(cp: ChanPoint) -> Self {
        cp.to_string()
    }
}

impl fmt::Display for ChanPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.output_index)
    }
}
