use proptest::prelude::*;
use specfp::codec::{AxisBlock, DataBlock, GenericBlock};
use specfp::{
    decode_all, decode_raw, load, Block, BlockHeader, BlockKind, CodecError, LoadError,
    MetadataBlock, Tag, ViewError, WdfReader, WdfWriter,
};
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

// ── fixtures ─────────────────────────────────────────────────────────────────

fn generic(tag: &[u8; 4], payload: &[u8]) -> Block {
    Block::Generic(GenericBlock {
        header:  BlockHeader::new(Tag(*tag), 0, payload.len()),
        payload: payload.to_vec(),
    })
}

fn metadata(count: u64, points: u32) -> Block {
    Block::Metadata(MetadataBlock::new(count, points).with_title("synthetic").with_application("WiRE"))
}

fn data(count: u64, points: u32) -> Block {
    let n = (count * points as u64) as usize;
    Block::Data(DataBlock {
        header:  BlockHeader::new(Tag::DATA, 0, 4 * n),
        spectra: (0..n).map(|i| i as f32 * 0.5).collect(),
        unused:  Vec::new(),
    })
}

fn axis(tag: Tag, domain: Vec<f32>) -> Block {
    Block::Axis(AxisBlock {
        header:    BlockHeader::new(tag, 0, 8 + 4 * domain.len()),
        axis_type: 1,
        unit:      1,
        domain,
        unused:    Vec::new(),
    })
}

fn encode(blocks: &[Block]) -> Vec<u8> {
    let mut w = WdfWriter::new(Vec::new());
    for b in blocks {
        w.write_block(b).unwrap();
    }
    w.finish().unwrap()
}

/// Metadata, data, both axes and a comment.
fn synthetic(count: u64, points: u32) -> Vec<u8> {
    encode(&[
        metadata(count, points),
        data(count, points),
        axis(Tag::XLST, (0..points).map(|i| 500.0 + i as f32).collect()),
        axis(Tag::YLST, vec![0.0]),
        generic(b"TEXT", b"hello"),
    ])
}

fn temp_wdf(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

// ── scenarios ────────────────────────────────────────────────────────────────

#[test]
fn test_header_only_text_block() {
    let bytes = b"TEXT\x00\x00\x00\x00\x10\x00\x00\x00\x00\x00\x00\x00";
    let stream = decode_all(&bytes[..]).unwrap();
    assert!(stream.contains("TEXT"));
    let Some(Block::Generic(g)) = stream.get("TEXT") else { panic!("TEXT not generic") };
    assert!(g.payload.is_empty());
}

#[test]
fn test_empty_source() {
    let mut wdf = WdfReader::new(&b""[..]);
    assert!(matches!(wdf.spectra(), Err(ViewError::NotDecoded)));

    assert!(wdf.decode_all().unwrap().is_empty());
    assert!(matches!(wdf.spectra(), Err(ViewError::MissingBlock { .. })));
}

#[test]
fn test_spectra_shape() {
    let f = temp_wdf(&synthetic(10, 1021));
    let mut wdf = WdfReader::open(f.path()).unwrap();
    wdf.decode_all().unwrap();
    let spectra = wdf.spectra().unwrap();
    assert_eq!(spectra.shape(), &[10, 1021]);
    assert_eq!(spectra[[1, 0]], 1021.0 * 0.5);
}

#[test]
fn test_wavelengths_match_points() {
    let f = temp_wdf(&synthetic(3, 64));
    let mut wdf = WdfReader::open(f.path()).unwrap();
    wdf.decode_all().unwrap();
    let wavelengths = wdf.wavelengths().unwrap();
    assert_eq!(wavelengths.len(), 64);
    assert_eq!(wavelengths[0], 500.0);
    assert_eq!(wavelengths[63], 563.0);
}

// ── ordering ─────────────────────────────────────────────────────────────────

#[test]
fn test_any_order_after_metadata() {
    let bytes = encode(&[
        generic(b"TEXT", b"first"),
        metadata(2, 3),
        axis(Tag::XLST, vec![1.0, 2.0, 3.0]),
        generic(b"ORGN", &[0u8; 12]),
        data(2, 3),
    ]);
    let stream = decode_all(&bytes[..]).unwrap();
    assert_eq!(stream.len(), 5);
    assert_eq!(
        stream.codecs().collect::<Vec<_>>(),
        vec![BlockKind::Generic, BlockKind::Metadata, BlockKind::Axis, BlockKind::Generic, BlockKind::Data],
    );
    assert_eq!(stream.spectra().unwrap().shape(), &[2, 3]);
}

#[test]
fn test_dependent_block_before_metadata() {
    let bytes = encode(&[data(1, 2), metadata(1, 2)]);
    let mut wdf = WdfReader::new(&bytes[..]);
    let err = wdf.decode_all().unwrap_err();
    assert!(matches!(err, CodecError::MissingContext { tag } if tag == Tag::DATA));
    assert!(wdf.stream().is_empty());
}

#[test]
fn test_raw_mode_ignores_order() {
    let bytes = encode(&[data(1, 2), metadata(1, 2)]);
    let stream = decode_raw(&bytes[..]).unwrap();
    assert_eq!(stream.len(), 2);
    assert!(stream.codecs().all(|k| k == BlockKind::Generic));
    assert_eq!(stream.to_bytes().unwrap(), bytes);
}

// ── partial streams ──────────────────────────────────────────────────────────

#[test]
fn test_partial_stream() {
    let bytes = synthetic(2, 4);

    // Too short for a tag: nothing to decode.
    assert!(decode_all(&bytes[..2]).unwrap().is_empty());

    // Mid-header.
    let err = decode_all(&bytes[..15]).unwrap_err();
    assert!(matches!(err, CodecError::TruncatedInput { needed: 16, available: 15 }));

    // Exactly after WDF1 + DATA.
    let boundary = 512 + 16 + 4 * 8;
    let stream = decode_all(&bytes[..boundary]).unwrap();
    assert_eq!(stream.len(), 2);
    assert!(stream.contains(Tag::DATA));
    assert!(!stream.contains(Tag::XLST));
}

#[test]
fn test_trailing_bytes() {
    let mut bytes = synthetic(1, 4);
    bytes.extend_from_slice(b"ZZ");
    assert_eq!(decode_all(&bytes[..]).unwrap().len(), 5);

    bytes.extend_from_slice(b"ZZZZZ");
    let mut wdf = WdfReader::new(&bytes[..]);
    let err = wdf.decode_all().unwrap_err();
    assert!(matches!(err, CodecError::TruncatedInput { needed: 16, available: 7 }));
    assert_eq!(wdf.stream().len(), 5);
}

#[test]
fn test_truncated_data_payload() {
    let bytes = synthetic(2, 4);
    let cut = 512 + 16 + 10;
    let mut wdf = WdfReader::new(&bytes[..cut]);
    let err = wdf.decode_all().unwrap_err();
    assert!(matches!(err, CodecError::TruncatedInput { needed: 32, available: 10 }));
    assert!(wdf.stream().metadata().is_some());
}

#[test]
fn test_undersized_data_block() {
    let mut bytes = encode(&[metadata(2, 4)]);
    bytes.extend_from_slice(&encode(&[generic(b"DATA", &[0u8; 12])]));
    let err = decode_all(&bytes[..]).unwrap_err();
    assert!(matches!(err, CodecError::Undersized { length: 28, required: 48, .. }));
}

// ── round trips ──────────────────────────────────────────────────────────────

#[test]
fn test_file_roundtrip() {
    let bytes = synthetic(5, 100);
    let f = temp_wdf(&bytes);
    let mut wdf = WdfReader::open(f.path()).unwrap();
    wdf.decode_all().unwrap();

    let out = NamedTempFile::new().unwrap();
    let mut w = WdfWriter::new(fs::File::create(out.path()).unwrap());
    w.write_stream(wdf.stream()).unwrap();
    assert_eq!(w.written(), bytes.len() as u64);
    w.finish().unwrap();

    assert_eq!(fs::read(out.path()).unwrap(), bytes);
}

#[test]
fn test_unused_bytes_survive() {
    let block = DataBlock {
        header:  BlockHeader::new(Tag::DATA, 9, 4 * 2 + 3),
        spectra: vec![1.5, -2.0],
        unused:  b"xyz".to_vec(),
    };
    let bytes = encode(&[metadata(1, 2), Block::Data(block)]);
    let stream = decode_all(&bytes[..]).unwrap();
    assert_eq!(stream.data().unwrap().unused, b"xyz");
    assert_eq!(stream.to_bytes().unwrap(), bytes);
}

#[test]
fn test_duplicate_and_unknown_tags() {
    let bytes = encode(&[
        metadata(1, 1),
        generic(b"TEXT", b"one"),
        generic(b"QQQQ", b"?"),
        generic(b"MAP ", b"m"),
        generic(b"TEXT", b"two"),
    ]);
    let stream = decode_all(&bytes[..]).unwrap();

    let Some(Block::Generic(g)) = stream.get("TEXT") else { panic!("TEXT missing") };
    assert_eq!(g.payload, b"one");
    assert!(stream.contains("QQQQ"));
    assert!(stream.contains("MAP"));
    assert_eq!(stream.len(), 5);
    assert_eq!(stream.tags().count(), 4);
    assert_eq!(stream.to_bytes().unwrap(), bytes);
}

// ── table + CSV ──────────────────────────────────────────────────────────────

#[test]
fn test_load_and_export_csv() {
    let f = temp_wdf(&synthetic(3, 5));
    let spectra = load(f.path()).unwrap();
    assert_eq!((spectra.count(), spectra.points()), (3, 5));

    let dir = tempdir().unwrap();
    let out = dir.path().join("spectra.csv");
    spectra.write_csv(fs::File::create(&out).unwrap()).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5 + 1);
    assert_eq!(lines[0], "wavelength,0,1,2");
    assert!(lines.iter().all(|l| l.split(',').count() == 3 + 1));
    assert_eq!(lines[1], "500,0,2.5,5");
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let err = load(dir.path().join("absent.wdf")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn test_load_without_axis() {
    let f = temp_wdf(&encode(&[metadata(1, 2), data(1, 2)]));
    let err = load(f.path()).unwrap_err();
    assert!(matches!(err, LoadError::View(ViewError::MissingBlock { tag }) if tag == Tag::XLST));
}

#[test]
fn test_metadata_summary() {
    let stream = decode_all(&synthetic(4, 8)[..]).unwrap();
    let summary = stream.metadata().unwrap().summary();
    assert_eq!(summary.title, "synthetic");
    assert_eq!(summary.application, "WiRE");
    assert_eq!((summary.count, summary.points), (4, 8));
}

// ── properties ───────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_generic_blocks_roundtrip(
        blocks in prop::collection::vec(("[a-z]{4}", any::<u32>(), prop::collection::vec(any::<u8>(), 0..64)), 0..8)
    ) {
        let blocks: Vec<Block> = blocks.iter().map(|(tag, owner, payload)| Block::Generic(GenericBlock {
            header:  BlockHeader::new(Tag::new(tag), *owner, payload.len()),
            payload: payload.clone(),
        })).collect();
        let bytes = encode(&blocks);
        let stream = decode_all(&bytes[..]).unwrap();
        prop_assert_eq!(stream.len(), blocks.len());
        prop_assert_eq!(stream.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn prop_raw_mode_roundtrip_any_bytes(
        blocks in prop::collection::vec((any::<[u8; 4]>(), prop::collection::vec(any::<u8>(), 0..64)), 0..8)
    ) {
        let blocks: Vec<Block> = blocks.iter().map(|(tag, payload)| generic(tag, payload)).collect();
        let bytes = encode(&blocks);
        prop_assert_eq!(decode_raw(&bytes[..]).unwrap().to_bytes().unwrap(), bytes);
    }

    #[test]
    fn prop_data_block_sizing(count in 1u64..6, points in 1u32..40, extra in 0usize..9) {
        let n = (count * points as u64) as usize;
        let block = Block::Data(DataBlock {
            header:  BlockHeader::new(Tag::DATA, 0, 4 * n + extra),
            spectra: vec![0.25; n],
            unused:  vec![7; extra],
        });
        let bytes = encode(&[metadata(count, points), block]);
        let stream = decode_all(&bytes[..]).unwrap();
        let d = stream.data().unwrap();
        prop_assert_eq!(d.spectra.len(), n);
        prop_assert_eq!(16 + 4 * n as u64 + d.unused.len() as u64, d.header.length);
    }
}
