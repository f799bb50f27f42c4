//! The `WDF1` file metadata block.
//!
//! A fixed 512-byte record (header included) at the start of every
//! well-formed file.  Text fields are fixed-width, NUL padded, and kept as
//! raw bytes; timestamps are kept as raw FILETIME ticks.  Accessors give the
//! decoded views, so a decode/encode cycle never loses a byte.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};
use uuid::Uuid;

use crate::block::{BlockHeader, Tag, BLOCK_HEADER_SIZE};
use crate::codec::{CodecError, DeclaredCounts};
use crate::filetime;

/// Size of the metadata block, header included.
pub const METADATA_BLOCK_SIZE: usize = 512;
const PAYLOAD_SIZE: usize = METADATA_BLOCK_SIZE - BLOCK_HEADER_SIZE;

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataBlock {
    pub header:           BlockHeader,
    pub signature:        u32,
    pub version:          u32,
    pub size:             u32,
    /// Four little-endian u32 words; see [`MetadataBlock::uuid`].
    pub uuid:             [u8; 16],
    pub reserved_0:       u64,
    pub reserved_1:       u32,
    pub tracks:           u32,
    /// Points per spectrum.
    pub points:           u32,
    pub capacity:         u64,
    /// Number of spectra acquired.
    pub count:            u64,
    pub accumulation:     u32,
    pub ylst_length:      u32,
    pub xlst_length:      u32,
    pub origin_length:    u32,
    pub application:      [u8; 24],
    pub major_version:    u16,
    pub minor_version:    u16,
    pub patch_version:    u16,
    pub build_version:    u16,
    pub scan_type:        u32,
    pub measurement_type: u32,
    /// FILETIME ticks.
    pub time_start:       u64,
    /// FILETIME ticks.
    pub time_end:         u64,
    pub unit:             u32,
    pub wave_number:      f32,
    pub spare:            [u64; 6],
    pub username:         [u8; 32],
    pub title:            [u8; 160],
    pub padded:           [u64; 6],
    pub third_party:      [u64; 4],
    pub internal_use:     [u64; 4],
    /// Bytes past the fixed record when the header declares more than 512.
    pub unused:           Vec<u8>,
}

impl MetadataBlock {
    /// A zeroed record declaring `count` spectra of `points` points, with an
    /// x-axis of `points` values and a single-value y-axis.
    pub fn new(count: u64, points: u32) -> Self {
        Self {
            header:           BlockHeader::new(Tag::WDF1, 0, PAYLOAD_SIZE),
            signature:        0,
            version:          1,
            size:             METADATA_BLOCK_SIZE as u32,
            uuid:             [0; 16],
            reserved_0:       0,
            reserved_1:       0,
            tracks:           0,
            points,
            capacity:         count,
            count,
            accumulation:     1,
            ylst_length:      1,
            xlst_length:      points,
            origin_length:    0,
            application:      [0; 24],
            major_version:    0,
            minor_version:    0,
            patch_version:    0,
            build_version:    0,
            scan_type:        0,
            measurement_type: 0,
            time_start:       filetime::EPOCH_OFFSET,
            time_end:         filetime::EPOCH_OFFSET,
            unit:             0,
            wave_number:      0.0,
            spare:            [0; 6],
            username:         [0; 32],
            title:            [0; 160],
            padded:           [0; 6],
            third_party:      [0; 4],
            internal_use:     [0; 4],
            unused:           Vec::new(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        fill_text(&mut self.title, title);
        self
    }

    pub fn with_username(mut self, username: &str) -> Self {
        fill_text(&mut self.username, username);
        self
    }

    pub fn with_application(mut self, application: &str) -> Self {
        fill_text(&mut self.application, application);
        self
    }

    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.time_start = filetime::encode(start);
        self.time_end   = filetime::encode(end);
        self
    }

    // ── Decoded views ────────────────────────────────────────────────────────

    pub fn application(&self) -> String { text(&self.application) }
    pub fn username(&self) -> String { text(&self.username) }
    pub fn title(&self) -> String { text(&self.title) }

    pub fn started_at(&self) -> DateTime<Utc> { filetime::decode(self.time_start) }
    pub fn ended_at(&self) -> DateTime<Utc> { filetime::decode(self.time_end) }

    pub fn uuid(&self) -> Uuid { Uuid::from_bytes_le(self.uuid) }

    pub fn application_version(&self) -> String {
        format!("{}.{}.{}.{}",
            self.major_version, self.minor_version, self.patch_version, self.build_version)
    }

    /// Sizing context for the blocks that depend on this one.
    pub fn declared_counts(&self) -> DeclaredCounts {
        DeclaredCounts {
            data: self.count.saturating_mul(self.points as u64),
            xlst: self.xlst_length as u64,
            ylst: self.ylst_length as u64,
        }
    }

    pub fn summary(&self) -> MetadataSummary {
        MetadataSummary {
            application: self.application(),
            version:     self.application_version(),
            uuid:        self.uuid(),
            title:       self.title(),
            username:    self.username(),
            count:       self.count,
            points:      self.points,
            capacity:    self.capacity,
            xlst_length: self.xlst_length,
            ylst_length: self.ylst_length,
            started_at:  self.started_at(),
            ended_at:    self.ended_at(),
            wave_number: self.wave_number,
        }
    }

    // ── Codec ────────────────────────────────────────────────────────────────

    pub fn decode(header: BlockHeader, payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < PAYLOAD_SIZE {
            return Err(CodecError::Undersized {
                tag:      header.tag,
                length:   header.length,
                required: METADATA_BLOCK_SIZE as u64,
            });
        }
        let mut r = payload;
        let signature = r.read_u32::<LittleEndian>()?;
        let version   = r.read_u32::<LittleEndian>()?;
        let size      = r.read_u32::<LittleEndian>()?;
        let uuid      = read_array::<16>(&mut r)?;
        let reserved_0 = r.read_u64::<LittleEndian>()?;
        let reserved_1 = r.read_u32::<LittleEndian>()?;
        let tracks    = r.read_u32::<LittleEndian>()?;
        let points    = r.read_u32::<LittleEndian>()?;
        let capacity  = r.read_u64::<LittleEndian>()?;
        let count     = r.read_u64::<LittleEndian>()?;
        let accumulation  = r.read_u32::<LittleEndian>()?;
        let ylst_length   = r.read_u32::<LittleEndian>()?;
        let xlst_length   = r.read_u32::<LittleEndian>()?;
        let origin_length = r.read_u32::<LittleEndian>()?;
        let application   = read_array::<24>(&mut r)?;
        let major_version = r.read_u16::<LittleEndian>()?;
        let minor_version = r.read_u16::<LittleEndian>()?;
        let patch_version = r.read_u16::<LittleEndian>()?;
        let build_version = r.read_u16::<LittleEndian>()?;
        let scan_type        = r.read_u32::<LittleEndian>()?;
        let measurement_type = r.read_u32::<LittleEndian>()?;
        let time_start  = r.read_u64::<LittleEndian>()?;
        let time_end    = r.read_u64::<LittleEndian>()?;
        let unit        = r.read_u32::<LittleEndian>()?;
        let wave_number = r.read_f32::<LittleEndian>()?;
        let spare       = read_words::<6>(&mut r)?;
        let username    = read_array::<32>(&mut r)?;
        let title       = read_array::<160>(&mut r)?;
        let padded       = read_words::<6>(&mut r)?;
        let third_party  = read_words::<4>(&mut r)?;
        let internal_use = read_words::<4>(&mut r)?;

        Ok(Self {
            header,
            signature,
            version,
            size,
            uuid,
            reserved_0,
            reserved_1,
            tracks,
            points,
            capacity,
            count,
            accumulation,
            ylst_length,
            xlst_length,
            origin_length,
            application,
            major_version,
            minor_version,
            patch_version,
            build_version,
            scan_type,
            measurement_type,
            time_start,
            time_end,
            unit,
            wave_number,
            spare,
            username,
            title,
            padded,
            third_party,
            internal_use,
            unused: r.to_vec(),
        })
    }

    pub(crate) fn write_payload<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.signature)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u32::<LittleEndian>(self.size)?;
        w.write_all(&self.uuid)?;
        w.write_u64::<LittleEndian>(self.reserved_0)?;
        w.write_u32::<LittleEndian>(self.reserved_1)?;
        w.write_u32::<LittleEndian>(self.tracks)?;
        w.write_u32::<LittleEndian>(self.points)?;
        w.write_u64::<LittleEndian>(self.capacity)?;
        w.write_u64::<LittleEndian>(self.count)?;
        w.write_u32::<LittleEndian>(self.accumulation)?;
        w.write_u32::<LittleEndian>(self.ylst_length)?;
        w.write_u32::<LittleEndian>(self.xlst_length)?;
        w.write_u32::<LittleEndian>(self.origin_length)?;
        w.write_all(&self.application)?;
        w.write_u16::<LittleEndian>(self.major_version)?;
        w.write_u16::<LittleEndian>(self.minor_version)?;
        w.write_u16::<LittleEndian>(self.patch_version)?;
        w.write_u16::<LittleEndian>(self.build_version)?;
        w.write_u32::<LittleEndian>(self.scan_type)?;
        w.write_u32::<LittleEndian>(self.measurement_type)?;
        w.write_u64::<LittleEndian>(self.time_start)?;
        w.write_u64::<LittleEndian>(self.time_end)?;
        w.write_u32::<LittleEndian>(self.unit)?;
        w.write_f32::<LittleEndian>(self.wave_number)?;
        write_words(w, &self.spare)?;
        w.write_all(&self.username)?;
        w.write_all(&self.title)?;
        write_words(w, &self.padded)?;
        write_words(w, &self.third_party)?;
        write_words(w, &self.internal_use)?;
        w.write_all(&self.unused)
    }
}

/// Serializable digest of the metadata block, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataSummary {
    pub application: String,
    pub version:     String,
    pub uuid:        Uuid,
    pub title:       String,
    pub username:    String,
    pub count:       u64,
    pub points:      u32,
    pub capacity:    u64,
    pub xlst_length: u32,
    pub ylst_length: u32,
    pub started_at:  DateTime<Utc>,
    pub ended_at:    DateTime<Utc>,
    pub wave_number: f32,
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn read_array<const N: usize>(r: &mut &[u8]) -> io::Result<[u8; N]> {
    let mut out = [0u8; N];
    io::Read::read_exact(r, &mut out)?;
    Ok(out)
}

fn read_words<const N: usize>(r: &mut &[u8]) -> io::Result<[u64; N]> {
    let mut out = [0u64; N];
    r.read_u64_into::<LittleEndian>(&mut out)?;
    Ok(out)
}

fn write_words<W: Write>(w: &mut W, words: &[u64]) -> io::Result<()> {
    for &word in words {
        w.write_u64::<LittleEndian>(word)?;
    }
    Ok(())
}

/// Text up to the first NUL, lossily decoded, trailing whitespace removed.
fn text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

/// Copy as much of `value` as fits, never splitting a UTF-8 character.
fn fill_text(field: &mut [u8], value: &str) {
    field.fill(0);
    let mut end = value.len().min(field.len());
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].copy_from_slice(&value.as_bytes()[..end]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn encode(block: &MetadataBlock) -> Vec<u8> {
        let mut out = block.header.to_bytes().to_vec();
        block.write_payload(&mut out).unwrap();
        out
    }

    fn decode(bytes: &[u8]) -> Result<MetadataBlock, CodecError> {
        let header = BlockHeader::read(bytes)?;
        MetadataBlock::decode(header, &bytes[BLOCK_HEADER_SIZE..])
    }

    #[test]
    fn encoded_size_is_512() {
        let block = MetadataBlock::new(10, 1021);
        let bytes = encode(&block);
        assert_eq!(bytes.len(), METADATA_BLOCK_SIZE);
        assert_eq!(block.header.length, METADATA_BLOCK_SIZE as u64);
    }

    #[test]
    fn field_offsets() {
        let block = MetadataBlock::new(10, 1021).with_application("WiRE").with_title("silicon");
        let bytes = encode(&block);
        // points at payload offset 44, count at 56, xlst_length at 72
        assert_eq!(&bytes[16 + 44..16 + 48], &1021u32.to_le_bytes());
        assert_eq!(&bytes[16 + 56..16 + 64], &10u64.to_le_bytes());
        assert_eq!(&bytes[16 + 72..16 + 76], &1021u32.to_le_bytes());
        assert_eq!(&bytes[16 + 80..16 + 84], b"WiRE");
        assert_eq!(&bytes[16 + 224..16 + 231], b"silicon");
    }

    #[test]
    fn roundtrip_preserves_every_byte() {
        let mut bytes = encode(&MetadataBlock::new(3, 7));
        // scatter non-zero bytes across the whole payload, including padding
        for (i, b) in bytes.iter_mut().enumerate().skip(BLOCK_HEADER_SIZE) {
            *b = (i * 31 % 251) as u8;
        }
        let block = decode(&bytes).unwrap();
        assert_eq!(encode(&block), bytes);
    }

    #[test]
    fn surplus_bytes_are_kept() {
        let mut block = MetadataBlock::new(1, 4);
        block.unused = vec![0xAB; 8];
        block.header.length += 8;
        let bytes = encode(&block);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.unused, vec![0xAB; 8]);
        assert_eq!(encode(&decoded), bytes);
    }

    #[test]
    fn short_record_is_undersized() {
        let bytes = encode(&MetadataBlock::new(1, 4));
        let mut short = bytes[..100].to_vec();
        short[8..16].copy_from_slice(&100u64.to_le_bytes());
        let err = decode(&short).unwrap_err();
        assert!(matches!(err, CodecError::Undersized { length: 100, required: 512, .. }));
    }

    #[test]
    fn text_and_time_views() {
        let start = Utc.with_ymd_and_hms(2022, 3, 1, 9, 0, 0).unwrap();
        let end   = Utc.with_ymd_and_hms(2022, 3, 1, 9, 5, 30).unwrap();
        let block = MetadataBlock::new(2, 5)
            .with_title("Raman map – 532 nm")
            .with_username("lab")
            .with_application("WiRE")
            .with_times(start, end);
        let decoded = decode(&encode(&block)).unwrap();
        assert_eq!(decoded.title(), "Raman map – 532 nm");
        assert_eq!(decoded.username(), "lab");
        assert_eq!(decoded.application(), "WiRE");
        assert_eq!(decoded.started_at(), start);
        assert_eq!(decoded.ended_at(), end);
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let block = MetadataBlock::new(1, 1).with_application("ééééééééééééé");
        assert_eq!(block.application(), "éééééééééééé");
    }

    #[test]
    fn declared_counts_from_fields() {
        let mut block = MetadataBlock::new(10, 1021);
        block.ylst_length = 2;
        let c = block.declared_counts();
        assert_eq!(c.data, 10_210);
        assert_eq!(c.xlst, 1021);
        assert_eq!(c.ylst, 2);
    }

    #[test]
    fn uuid_uses_little_endian_fields() {
        let mut block = MetadataBlock::new(1, 1);
        block.uuid = [
            0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66,
            0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
        ];
        assert_eq!(block.uuid().to_string(), "00112233-4455-6677-8899-aabbccddeeff");
    }

    #[test]
    fn summary_serializes() {
        let block = MetadataBlock::new(4, 8).with_title("t");
        let json = serde_json::to_value(block.summary()).unwrap();
        assert_eq!(json["count"], 4);
        assert_eq!(json["points"], 8);
        assert_eq!(json["title"], "t");
        assert_eq!(json["started_at"], "1970-01-01T00:00:00Z");
    }
}
