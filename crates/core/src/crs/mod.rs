//! Coordinate Reference System identity
//!
//! OpenRES never reprojects. Layers are only compared, and a run whose
//! layers disagree on their CRS is rejected before any processing starts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// Parse an authority identifier such as `"EPSG:32611"`.
    ///
    /// Anything that is not an EPSG identifier is kept verbatim as WKT.
    pub fn from_identifier(id: &str) -> Self {
        let trimmed = id.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .and_then(|c| c.parse::<u32>().ok());
        match code {
            Some(code) => Self::from_epsg(code),
            None => Self::from_wkt(trimmed),
        }
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Ensure every layer that declares a CRS agrees with the first declared one.
///
/// Layers without a CRS are assumed to share the projected units of the
/// others and are skipped.
pub fn ensure_same_crs<'a, I>(layers: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, Option<&'a CRS>)>,
{
    let mut reference: Option<(&str, &CRS)> = None;
    for (name, crs) in layers {
        let Some(crs) = crs else { continue };
        match reference {
            None => reference = Some((name, crs)),
            Some((ref_name, ref_crs)) => {
                if !ref_crs.is_equivalent(crs) {
                    return Err(Error::CrsMismatch(
                        format!("{} ({})", ref_name, ref_crs),
                        format!("{} ({})", name, crs),
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_identifier_parsing() {
        let crs = CRS::from_identifier("EPSG:32611");
        assert_eq!(crs.epsg(), Some(32611));
        assert_eq!(crs.identifier(), "EPSG:32611");

        let wkt = CRS::from_identifier("PROJCS[\"local\"]");
        assert_eq!(wkt.epsg(), None);
        assert!(wkt.wkt().is_some());
    }

    #[test]
    fn test_same_crs_skips_undeclared_layers() {
        let utm = CRS::from_epsg(32611);
        let same = CRS::from_epsg(32611);
        let layers = [("streams", Some(&utm)), ("valley", None), ("dem", Some(&same))];
        assert!(ensure_same_crs(layers).is_ok());
    }

    #[test]
    fn test_crs_mismatch_is_reported() {
        let utm = CRS::from_epsg(32611);
        let geographic = CRS::from_epsg(4326);
        let err = ensure_same_crs([("streams", Some(&utm)), ("belt", Some(&geographic))])
            .unwrap_err();
        assert!(matches!(err, Error::CrsMismatch(_, _)));
        assert!(err.to_string().contains("belt"));
    }
}
