//! Block payload codecs.
//!
//! Every block is decoded from its full payload (`length - 16` bytes, read up
//! front by the stream reader) and re-encoded to header + payload.  Codecs
//! account for every payload byte: whatever a layout does not describe is
//! kept verbatim as trailing bytes, so `encode(decode(bytes)) == bytes` holds
//! for all of them.
//!
//! # Sizing
//! `DATA`, `XLST` and `YLST` cannot be sized from their header alone.  Their
//! element counts come from the `WDF1` metadata block, handed over as an
//! immutable [`DeclaredCounts`] value.  A dependent block decoded without it
//! fails with [`CodecError::MissingContext`].

pub mod metadata;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Write};
use thiserror::Error;
use crate::block::{BlockHeader, Tag, BLOCK_HEADER_SIZE};

pub use metadata::{MetadataBlock, MetadataSummary, METADATA_BLOCK_SIZE};

/// Bytes per element of the float arrays.
pub const F32_SIZE: u64 = 4;
/// `axis_type` + `unit` ahead of an axis domain.
pub const AXIS_PREAMBLE_SIZE: u64 = 8;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Truncated input: needed {needed} bytes, {available} available")]
    TruncatedInput { needed: u64, available: u64 },
    #[error("Block {tag} declares length {length}, shorter than its 16-byte header")]
    InvalidLength { tag: Tag, length: u64 },
    #[error("Block {tag} is {length} bytes but its declared contents need {required}")]
    Undersized { tag: Tag, length: u64, required: u64 },
    #[error("Block {tag} cannot be sized before the WDF1 metadata block is decoded")]
    MissingContext { tag: Tag },
    #[error("Source already consumed by a failed decode")]
    SourceConsumed,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec identity ───────────────────────────────────────────────────────────

/// Which payload codec handled a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Metadata,
    Axis,
    Data,
    Generic,
}

impl BlockKind {
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Metadata => "metadata",
            BlockKind::Axis     => "axis",
            BlockKind::Data     => "data",
            BlockKind::Generic  => "generic",
        }
    }

    /// Whether decoding needs counts from an earlier `WDF1` block.
    pub fn needs_context(self) -> bool {
        matches!(self, BlockKind::Axis | BlockKind::Data)
    }
}

/// Element counts declared by the metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredCounts {
    /// `count * points`, the length of the `DATA` array.
    pub data: u64,
    pub xlst: u64,
    pub ylst: u64,
}

impl DeclaredCounts {
    /// Element count for a context-dependent tag.
    pub fn for_tag(&self, tag: Tag) -> Option<u64> {
        match tag.name_bytes() {
            b"DATA" => Some(self.data),
            b"XLST" => Some(self.xlst),
            b"YLST" => Some(self.ylst),
            _       => None,
        }
    }
}

// ── Decoded records ──────────────────────────────────────────────────────────

/// `XLST` / `YLST`: an axis description and its domain values.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisBlock {
    pub header:    BlockHeader,
    pub axis_type: u32,
    pub unit:      u32,
    pub domain:    Vec<f32>,
    pub unused:    Vec<u8>,
}

/// `DATA`: all spectra, flattened row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    pub header:  BlockHeader,
    pub spectra: Vec<f32>,
    pub unused:  Vec<u8>,
}

/// Any block without a dedicated layout; the payload is kept as bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericBlock {
    pub header:  BlockHeader,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Metadata(MetadataBlock),
    Axis(AxisBlock),
    Data(DataBlock),
    Generic(GenericBlock),
}

impl Block {
    pub fn header(&self) -> &BlockHeader {
        match self {
            Block::Metadata(b) => &b.header,
            Block::Axis(b)     => &b.header,
            Block::Data(b)     => &b.header,
            Block::Generic(b)  => &b.header,
        }
    }

    pub fn tag(&self) -> Tag { self.header().tag }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Metadata(_) => BlockKind::Metadata,
            Block::Axis(_)     => BlockKind::Axis,
            Block::Data(_)     => BlockKind::Data,
            Block::Generic(_)  => BlockKind::Generic,
        }
    }

    /// Size this block occupies when written, computed from its fields.
    pub fn encoded_len(&self) -> u64 {
        let payload = match self {
            Block::Metadata(b) => (METADATA_BLOCK_SIZE - BLOCK_HEADER_SIZE + b.unused.len()) as u64,
            Block::Axis(b)     => AXIS_PREAMBLE_SIZE + F32_SIZE * b.domain.len() as u64 + b.unused.len() as u64,
            Block::Data(b)     => F32_SIZE * b.spectra.len() as u64 + b.unused.len() as u64,
            Block::Generic(b)  => b.payload.len() as u64,
        };
        BLOCK_HEADER_SIZE as u64 + payload
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        self.header().write(&mut writer)?;
        match self {
            Block::Metadata(b) => b.write_payload(&mut writer),
            Block::Axis(b) => {
                writer.write_u32::<LittleEndian>(b.axis_type)?;
                writer.write_u32::<LittleEndian>(b.unit)?;
                write_f32s(&mut writer, &b.domain)?;
                writer.write_all(&b.unused)
            }
            Block::Data(b) => {
                write_f32s(&mut writer, &b.spectra)?;
                writer.write_all(&b.unused)
            }
            Block::Generic(b) => writer.write_all(&b.payload),
        }
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len() as usize);
        self.write(&mut out)?;
        Ok(out)
    }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait BlockCodec: Send + Sync {
    fn kind(&self) -> BlockKind;
    /// Decode a block from its header and complete payload.
    fn decode(
        &self,
        header:  BlockHeader,
        payload: &[u8],
        counts:  Option<&DeclaredCounts>,
    ) -> Result<Block, CodecError>;
}

// ── Built-in codec implementations ──────────────────────────────────────────

pub struct MetadataCodec;
impl BlockCodec for MetadataCodec {
    fn kind(&self) -> BlockKind { BlockKind::Metadata }
    fn decode(&self, header: BlockHeader, payload: &[u8], _: Option<&DeclaredCounts>) -> Result<Block, CodecError> {
        MetadataBlock::decode(header, payload).map(Block::Metadata)
    }
}

pub struct AxisCodec;
impl BlockCodec for AxisCodec {
    fn kind(&self) -> BlockKind { BlockKind::Axis }
    fn decode(&self, header: BlockHeader, payload: &[u8], counts: Option<&DeclaredCounts>) -> Result<Block, CodecError> {
        let n = element_count(&header, counts)?;
        let required = n.checked_mul(F32_SIZE)
            .and_then(|b| b.checked_add(AXIS_PREAMBLE_SIZE));
        check_fits(&header, payload, required)?;

        let mut cur = payload;
        let axis_type = cur.read_u32::<LittleEndian>()?;
        let unit      = cur.read_u32::<LittleEndian>()?;
        let domain    = read_f32s(&mut cur, n as usize)?;
        Ok(Block::Axis(AxisBlock { header, axis_type, unit, domain, unused: cur.to_vec() }))
    }
}

pub struct DataCodec;
impl BlockCodec for DataCodec {
    fn kind(&self) -> BlockKind { BlockKind::Data }
    fn decode(&self, header: BlockHeader, payload: &[u8], counts: Option<&DeclaredCounts>) -> Result<Block, CodecError> {
        let n = element_count(&header, counts)?;
        check_fits(&header, payload, n.checked_mul(F32_SIZE))?;

        let mut cur = payload;
        let spectra = read_f32s(&mut cur, n as usize)?;
        Ok(Block::Data(DataBlock { header, spectra, unused: cur.to_vec() }))
    }
}

pub struct GenericCodec;
impl BlockCodec for GenericCodec {
    fn kind(&self) -> BlockKind { BlockKind::Generic }
    fn decode(&self, header: BlockHeader, payload: &[u8], _: Option<&DeclaredCounts>) -> Result<Block, CodecError> {
        Ok(Block::Generic(GenericBlock { header, payload: payload.to_vec() }))
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a codec kind to its implementation.
pub fn get_codec(kind: BlockKind) -> &'static dyn BlockCodec {
    match kind {
        BlockKind::Metadata => &MetadataCodec,
        BlockKind::Axis     => &AxisCodec,
        BlockKind::Data     => &DataCodec,
        BlockKind::Generic  => &GenericCodec,
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn element_count(header: &BlockHeader, counts: Option<&DeclaredCounts>) -> Result<u64, CodecError> {
    counts
        .and_then(|c| c.for_tag(header.tag))
        .ok_or(CodecError::MissingContext { tag: header.tag })
}

/// `required` is the payload size the layout needs; `None` means it overflowed.
fn check_fits(header: &BlockHeader, payload: &[u8], required: Option<u64>) -> Result<(), CodecError> {
    match required {
        Some(r) if r <= payload.len() as u64 => Ok(()),
        r => Err(CodecError::Undersized {
            tag:      header.tag,
            length:   header.length,
            required: r.and_then(|r| r.checked_add(BLOCK_HEADER_SIZE as u64)).unwrap_or(u64::MAX),
        }),
    }
}

fn read_f32s(cur: &mut &[u8], n: usize) -> io::Result<Vec<f32>> {
    let mut out = vec![0f32; n];
    cur.read_f32_into::<LittleEndian>(&mut out)?;
    Ok(out)
}

fn write_f32s<W: Write>(writer: &mut W, values: &[f32]) -> io::Result<()> {
    for &v in values {
        writer.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}
