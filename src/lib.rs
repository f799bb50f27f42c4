pub mod filetime;
pub mod block;
pub mod codec;
pub mod catalog;
pub mod io_stream;
pub mod views;

pub use block::{BlockHeader, Tag};
pub use codec::{get_codec, Block, BlockKind, CodecError, MetadataBlock};
pub use io_stream::{decode_all, decode_raw, DecodeMode, DecodedStream, WdfReader, WdfWriter};
pub use views::{load, LoadError, Spectra, ViewError};
