pub mod buffer;
pub mod chunk_codec;
pub mod header;
pub mod hilbert;
pub mod palette_order;
pub mod reader;
pub mod writer;

pub use chunk_codec::{decode_chunk, encode_chunk};
pub use hilbert::BlockLayout;
pub use reader::ScarifReader;
pub use writer::{EncodeStats, EncoderOptions, ScarifWriter};
