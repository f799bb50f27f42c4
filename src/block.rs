use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};
use crate::codec::CodecError;

/// Size of the fixed block preamble: tag, owner id, length.
pub const BLOCK_HEADER_SIZE: usize = 16;
/// Width of the tag field.
pub const TAG_SIZE: usize = 4;

/// Four raw tag bytes.  Short names (`MAP`, `CAP`, `AUX`) are padded with
/// NUL or space; the padding is kept so the header re-encodes exactly.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; TAG_SIZE]);

impl Tag {
    pub const WDF1: Tag = Tag(*b"WDF1");
    pub const DATA: Tag = Tag(*b"DATA");
    pub const XLST: Tag = Tag(*b"XLST");
    pub const YLST: Tag = Tag(*b"YLST");

    /// Build a tag from a name of at most four bytes, NUL padded.  Longer
    /// names are cut to their first four bytes, so `"DATAX"` names `DATA`.
    pub fn new(name: &str) -> Self {
        debug_assert!(name.len() <= TAG_SIZE, "tag name {name:?} longer than {TAG_SIZE} bytes");
        let mut raw = [0u8; TAG_SIZE];
        let n = name.len().min(TAG_SIZE);
        raw[..n].copy_from_slice(&name.as_bytes()[..n]);
        Tag(raw)
    }

    /// The tag bytes without trailing NUL/space padding.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.0.iter()
            .rposition(|&b| b != 0 && b != b' ')
            .map_or(0, |i| i + 1);
        &self.0[..end]
    }

    /// The same name with NUL padding, so `MAP ` and `MAP\0` compare equal.
    pub fn canonical(&self) -> Tag {
        let name = self.name_bytes();
        let mut raw = [0u8; TAG_SIZE];
        raw[..name.len()].copy_from_slice(name);
        Tag(raw)
    }

    /// Printable name, or `None` if the tag is not plain ASCII.
    pub fn name(&self) -> Option<&str> {
        let bytes = self.name_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            std::str::from_utf8(bytes).ok()
        } else {
            None
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None       => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self { Tag::new(name) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub tag:      Tag,
    pub owner_id: u32,
    /// Total block size in bytes, header included.
    pub length:   u64,
}

impl BlockHeader {
    pub fn new(tag: Tag, owner_id: u32, payload_len: usize) -> Self {
        Self { tag, owner_id, length: (BLOCK_HEADER_SIZE + payload_len) as u64 }
    }

    /// Bytes following the header.
    pub fn payload_len(&self) -> u64 {
        self.length.saturating_sub(BLOCK_HEADER_SIZE as u64)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.tag.0)?;
        writer.write_u32::<LittleEndian>(self.owner_id)?;
        writer.write_u64::<LittleEndian>(self.length)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self, CodecError> {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];
        let got = read_up_to(&mut reader, &mut buf)?;
        if got < BLOCK_HEADER_SIZE {
            return Err(CodecError::TruncatedInput {
                needed:    BLOCK_HEADER_SIZE as u64,
                available: got as u64,
            });
        }
        let mut cur = &buf[TAG_SIZE..];
        let tag      = Tag([buf[0], buf[1], buf[2], buf[3]]);
        let owner_id = cur.read_u32::<LittleEndian>()?;
        let length   = cur.read_u64::<LittleEndian>()?;
        if length < BLOCK_HEADER_SIZE as u64 {
            return Err(CodecError::InvalidLength { tag, length });
        }
        Ok(Self { tag, owner_id, length })
    }

    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];
        buf[..TAG_SIZE].copy_from_slice(&self.tag.0);
        buf[4..8].copy_from_slice(&self.owner_id.to_le_bytes());
        buf[8..].copy_from_slice(&self.length.to_le_bytes());
        buf
    }
}

/// Fill `buf` as far as the reader allows.  Returns the bytes read; only a
/// short count (never `UnexpectedEof`) signals the end of input.
pub(crate) fn read_up_to<R: Read>(mut reader: R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0)  => break,
            Ok(n)  => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
