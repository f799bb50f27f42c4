use std::collections::HashMap;
use std::io::{self, Write};

use crate::block::Tag;
use crate::codec::{AxisBlock, Block, BlockKind, DataBlock, MetadataBlock};

/// One decoded block and where it started in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub offset: u64,
    pub block:  Block,
}

/// Every block decoded from one input, in stream order.
///
/// Lookups by tag see the first block carrying that tag; later blocks with
/// the same tag stay in [`entries`](Self::entries) and are written back by
/// [`write_to`](Self::write_to).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedStream {
    entries: Vec<StreamEntry>,
    first:   HashMap<Tag, usize>,
}

impl DecodedStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block.  Returns `false` if its tag was already present.
    pub fn push(&mut self, offset: u64, block: Block) -> bool {
        let key = block.tag().canonical();
        let idx = self.entries.len();
        self.entries.push(StreamEntry { offset, block });
        match self.first.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(idx);
                true
            }
        }
    }

    pub fn get(&self, tag: impl Into<Tag>) -> Option<&Block> {
        let key = tag.into().canonical();
        self.first.get(&key).map(|&i| &self.entries[i].block)
    }

    pub fn contains(&self, tag: impl Into<Tag>) -> bool {
        self.get(tag).is_some()
    }

    /// Distinct tags in order of first appearance.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.entries.iter()
            .enumerate()
            .filter(|(i, e)| self.first.get(&e.block.tag().canonical()) == Some(i))
            .map(|(_, e)| e.block.tag())
    }

    pub fn entries(&self) -> &[StreamEntry] {
        &self.entries
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.entries.iter().map(|e| &e.block)
    }

    /// The codec used for each block, in stream order.
    pub fn codecs(&self) -> impl Iterator<Item = BlockKind> + '_ {
        self.blocks().map(Block::kind)
    }

    /// Number of blocks, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metadata(&self) -> Option<&MetadataBlock> {
        match self.get(Tag::WDF1)? {
            Block::Metadata(m) => Some(m),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&DataBlock> {
        match self.get(Tag::DATA)? {
            Block::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn axis(&self, tag: impl Into<Tag>) -> Option<&AxisBlock> {
        match self.get(tag)? {
            Block::Axis(a) => Some(a),
            _ => None,
        }
    }

    /// Bytes [`write_to`](Self::write_to) will produce.
    pub fn encoded_len(&self) -> u64 {
        self.blocks().map(Block::encoded_len).sum()
    }

    /// Re-encode every block in its original order.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for block in self.blocks() {
            block.write(&mut writer)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len() as usize);
        self.write_to(&mut out)?;
        Ok(out)
    }
}
