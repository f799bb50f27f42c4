//! Block catalog: tag → payload codec.
//!
//! The table is closed, but the format is not.  A tag missing from it still
//! decodes, through the generic codec, so files written by newer software
//! stay readable.

use crate::block::Tag;
use crate::codec::BlockKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind:        BlockKind,
    /// Human-readable name (diagnostics only).
    pub description: &'static str,
    /// `false` for tags this build does not know.
    pub known:       bool,
}

const fn entry(kind: BlockKind, description: &'static str) -> CatalogEntry {
    CatalogEntry { kind, description, known: true }
}

/// Catalog entry for `tag`; unknown tags get a generic entry.
pub fn lookup(tag: Tag) -> CatalogEntry {
    use BlockKind::*;
    match tag.name_bytes() {
        b"WDF1" => entry(Metadata, "File header"),
        b"DATA" => entry(Data,     "Spectral data"),
        b"XLST" => entry(Axis,     "X axis"),
        b"YLST" => entry(Axis,     "Y axis"),
        b"ORGN" => entry(Generic,  "Origin"),
        b"TEXT" => entry(Generic,  "Comment"),
        b"WXDA" => entry(Generic,  "Wire data"),
        b"WXDB" => entry(Generic,  "Dataset data"),
        b"WXDM" => entry(Generic,  "Measurement"),
        b"WXCS" => entry(Generic,  "Calibration"),
        b"WXIS" => entry(Generic,  "Instrument"),
        b"WMAP" => entry(Generic,  "Map area"),
        b"WHTL" => entry(Generic,  "White light"),
        b"NAIL" => entry(Generic,  "Thumbnail"),
        b"MAP"  => entry(Generic,  "Map"),
        b"CFAR" => entry(Generic,  "Curve fit"),
        b"DCLS" => entry(Generic,  "Component"),
        b"PCAR" => entry(Generic,  "PCA"),
        b"MCRE" => entry(Generic,  "EM"),
        b"ZLDC" => entry(Generic,  "Zeldac"),
        b"RCAL" => entry(Generic,  "Response cal"),
        b"CAP"  => entry(Generic,  "Cap"),
        b"WARP" => entry(Generic,  "Processing"),
        b"WARA" => entry(Generic,  "Analysis"),
        b"WLBL" => entry(Generic,  "Spectrum labels"),
        b"WCHK" => entry(Generic,  "Checksum"),
        b"RXCD" => entry(Generic,  "RX cal data"),
        b"RXCF" => entry(Generic,  "RX cal fit"),
        b"XCAL" => entry(Generic,  "Xcal"),
        b"SRCH" => entry(Generic,  "Spec search"),
        b"TEMP" => entry(Generic,  "Temp profile"),
        b"UNCV" => entry(Generic,  "Unit convert"),
        b"ARPR" => entry(Generic,  "Ar plate"),
        b"ELEC" => entry(Generic,  "Electrical sign"),
        b"BKXL" => entry(Generic,  "BKX list"),
        b"AUX"  => entry(Generic,  "Auxiliary data"),
        b"CHLG" => entry(Generic,  "Changelog"),
        b"SURF" => entry(Generic,  "Surface"),
        b"PSET" => entry(Generic,  "Stream is Pset"),
        _       => CatalogEntry { kind: Generic, description: "Unknown", known: false },
    }
}
