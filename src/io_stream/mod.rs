//! Streaming block engine: reader and writer.
//!
//! # Reader
//! [`WdfReader`] owns its byte source and walks it one block at a time:
//! peek the next tag, pick its codec from the catalog, read the 16-byte
//! header and the full payload, decode, record, repeat.  Blocks are decoded
//! strictly in order because `DATA`, `XLST` and `YLST` are sized from the
//! `WDF1` block that precedes them.
//!
//! The walk ends normally when fewer than four bytes (a tag) remain.  Any
//! other shortfall is [`CodecError::TruncatedInput`]; on error the blocks
//! decoded so far stay available through [`WdfReader::stream`].
//!
//! The source is dropped when [`WdfReader::decode_all`] returns, whatever
//! the outcome, and is never read again.  After a failed run every later
//! call fails with [`CodecError::SourceConsumed`]; retrying needs a new
//! reader.
//!
//! # Writer
//! [`WdfWriter`] writes blocks back out verbatim.  Decoding a file and
//! writing every block reproduces the input byte for byte.
//!
//! # Endianness
//! All binary I/O is little-endian; see `block.rs` and `codec/` for the
//! field layouts.

pub mod decoded;

use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use crate::block::{read_up_to, BlockHeader, Tag, BLOCK_HEADER_SIZE, TAG_SIZE};
use crate::catalog::{self, CatalogEntry};
use crate::codec::{get_codec, Block, BlockKind, CodecError};

pub use decoded::{DecodedStream, StreamEntry};

/// How tags are mapped to codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Use the block catalog; `WDF1`, `DATA`, `XLST`, `YLST` get typed records.
    #[default]
    Catalog,
    /// Treat every block as generic bytes.  Needs no metadata, so it also
    /// walks files whose `WDF1` block is missing or out of place.
    Raw,
}

/// Result of looking at the next tag without consuming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peek {
    Tag(Tag),
    /// No bytes left.
    End,
    /// 1–3 bytes left: too short to be a tag.
    Trailing(usize),
}

// ── Byte source ──────────────────────────────────────────────────────────────

/// Input with a small lookahead for tag peeking and a running offset.
struct Source<R: Read> {
    inner:     R,
    lookahead: Vec<u8>,
    position:  u64,
}

impl<R: Read> Source<R> {
    fn new(inner: R) -> Self {
        Self { inner, lookahead: Vec::with_capacity(TAG_SIZE), position: 0 }
    }

    fn peek_tag(&mut self) -> io::Result<Peek> {
        let have = self.lookahead.len();
        if have < TAG_SIZE {
            let mut buf = [0u8; TAG_SIZE];
            let got = read_up_to(&mut self.inner, &mut buf[have..])?;
            self.lookahead.extend_from_slice(&buf[have..have + got]);
        }
        Ok(match self.lookahead.len() {
            0 => Peek::End,
            n if n < TAG_SIZE => Peek::Trailing(n),
            _ => {
                let l = &self.lookahead;
                Peek::Tag(Tag([l[0], l[1], l[2], l[3]]))
            }
        })
    }

    fn read_header(&mut self) -> Result<BlockHeader, CodecError> {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];
        let have = self.lookahead.len();
        buf[..have].copy_from_slice(&self.lookahead);
        self.lookahead.clear();
        let got = have + read_up_to(&mut self.inner, &mut buf[have..])?;
        self.position += got as u64;
        BlockHeader::read(&buf[..got])
    }

    fn read_payload(&mut self, len: u64) -> Result<Vec<u8>, CodecError> {
        // Grow with the data actually present rather than trusting `len`.
        let mut payload = Vec::new();
        (&mut self.inner).take(len).read_to_end(&mut payload)?;
        self.position += payload.len() as u64;
        if (payload.len() as u64) < len {
            return Err(CodecError::TruncatedInput {
                needed:    len,
                available: payload.len() as u64,
            });
        }
        Ok(payload)
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct WdfReader<R: Read> {
    source:  Option<R>,
    mode:    DecodeMode,
    decoded: bool,
    failed:  bool,
    stream:  DecodedStream,
}

impl WdfReader<BufReader<File>> {
    /// Open a file for decoding.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> WdfReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_mode(reader, DecodeMode::Catalog)
    }

    pub fn with_mode(reader: R, mode: DecodeMode) -> Self {
        Self { source: Some(reader), mode, decoded: false, failed: false, stream: DecodedStream::new() }
    }

    /// Whether [`decode_all`](Self::decode_all) has run.
    pub fn is_decoded(&self) -> bool {
        self.decoded
    }

    /// Blocks decoded so far.
    pub fn stream(&self) -> &DecodedStream {
        &self.stream
    }

    pub fn into_stream(self) -> DecodedStream {
        self.stream
    }

    /// Decode every block until the input is exhausted.
    ///
    /// Runs once; the source is released on return.  Later calls return the
    /// stream as it stands if that run succeeded, and `SourceConsumed` if it
    /// failed.
    pub fn decode_all(&mut self) -> Result<&DecodedStream, CodecError> {
        let Some(reader) = self.source.take() else {
            if self.failed {
                return Err(CodecError::SourceConsumed);
            }
            debug!("source already consumed; returning {} decoded block(s)", self.stream.len());
            return Ok(&self.stream);
        };
        self.decoded = true;
        let mut source = Source::new(reader);
        if let Err(e) = self.run(&mut source) {
            self.failed = true;
            return Err(e);
        }
        info!("decoded {} block(s), {} bytes", self.stream.len(), source.position);
        Ok(&self.stream)
    }

    fn run(&mut self, source: &mut Source<R>) -> Result<(), CodecError> {
        loop {
            let tag = match source.peek_tag()? {
                Peek::Tag(tag) => tag,
                Peek::End => return Ok(()),
                Peek::Trailing(n) => {
                    warn!("ignoring {n} trailing byte(s) at offset {}", source.position);
                    return Ok(());
                }
            };

            let entry = self.codec_for(tag);
            let counts = if entry.kind.needs_context() {
                match self.stream.metadata() {
                    Some(m) => Some(m.declared_counts()),
                    None    => return Err(CodecError::MissingContext { tag }),
                }
            } else {
                None
            };

            let offset  = source.position;
            let header  = source.read_header()?;
            let payload = source.read_payload(header.payload_len())?;
            let block   = get_codec(entry.kind).decode(header, &payload, counts.as_ref())?;

            let length = block.header().length;
            assert_eq!(
                block.encoded_len(), length,
                "{} codec accounted for {} of {} bytes in block {tag} at offset {offset}",
                entry.kind.name(), block.encoded_len(), length,
            );
            assert_eq!(source.position, offset + length);

            if !entry.known {
                debug!("unrecognised tag {tag} at offset {offset}; kept as generic bytes");
            }
            debug!("{tag} ({}) at offset {offset}: {length} bytes, {} codec",
                entry.description, entry.kind.name());

            if !self.stream.push(offset, block) {
                warn!("duplicate {tag} block at offset {offset}; lookups keep the first one");
            }
        }
    }

    fn codec_for(&self, tag: Tag) -> CatalogEntry {
        let entry = catalog::lookup(tag);
        match self.mode {
            DecodeMode::Catalog => entry,
            DecodeMode::Raw     => CatalogEntry { kind: BlockKind::Generic, ..entry },
        }
    }
}

/// Decode a whole input with the block catalog.
pub fn decode_all<R: Read>(reader: R) -> Result<DecodedStream, CodecError> {
    let mut wdf = WdfReader::new(reader);
    wdf.decode_all()?;
    Ok(wdf.into_stream())
}

/// Decode a whole input treating every block as generic bytes.
pub fn decode_raw<R: Read>(reader: R) -> Result<DecodedStream, CodecError> {
    let mut wdf = WdfReader::with_mode(reader, DecodeMode::Raw);
    wdf.decode_all()?;
    Ok(wdf.into_stream())
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct WdfWriter<W: Write> {
    writer:  W,
    written: u64,
}

impl<W: Write> WdfWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn write_block(&mut self, block: &Block) -> io::Result<()> {
        block.write(&mut self.writer)?;
        self.written += block.encoded_len();
        Ok(())
    }

    pub fn write_stream(&mut self, stream: &DecodedStream) -> io::Result<()> {
        for block in stream.blocks() {
            self.write_block(block)?;
        }
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
