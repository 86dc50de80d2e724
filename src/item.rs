//! Inscription item model.

use std::fmt;
use std::str::FromStr;

use bitcoin::{OutPoint, Txid};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Satoshi-level location of an inscription, rendered `txid:vout:offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatLocation {
    pub txid: Txid,
    pub vout: u32,
    /// Offset of the inscribed sat within its containing output.
    pub offset: u64,
}

impl SatLocation {
    pub fn new(txid: Txid, vout: u32, offset: u64) -> Self {
        Self { txid, vout, offset }
    }

    /// The containing output.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

impl fmt::Display for SatLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.txid, self.vout, self.offset)
    }
}

impl FromStr for SatLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let (Some(txid), Some(vout), Some(offset)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::BadItem(format!(
                "bad location `{s}` (txid:vout:offset)"
            )));
        };
        Ok(Self {
            txid: txid
                .parse()
                .map_err(|_| Error::BadItem(format!("bad txid in location `{s}`")))?,
            vout: vout
                .parse()
                .map_err(|_| Error::BadItem(format!("bad vout in location `{s}`")))?,
            offset: offset
                .parse()
                .map_err(|_| Error::BadItem(format!("bad offset in location `{s}`")))?,
        })
    }
}

/// Minimal inscription attributes consumed by the swap engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Inscription identifier.
    pub id: String,
    /// Address currently holding the inscription.
    pub owner: String,
    pub location: SatLocation,
    /// The outpoint carrying the inscription.
    pub output: OutPoint,
    /// Value of that output in sats.
    pub output_value: u64,
}

impl Item {
    /// Check the location/output consistency and the offset range.
    pub fn validate(&self) -> Result<()> {
        if self.location.outpoint() != self.output {
            return Err(Error::BadItem(format!(
                "location {} does not match output {}",
                self.location, self.output
            )));
        }
        if self.location.offset >= self.output_value {
            return Err(Error::BadItem(format!(
                "offset {} is outside the {}-sat output",
                self.location.offset, self.output_value
            )));
        }
        Ok(())
    }
}
