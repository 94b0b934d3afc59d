pub mod reader;
pub mod writer;
pub mod types;
pub mod delta;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;
pub use types::*;
pub use delta::{
    DeltaField, DeltaFlags, IndexBlock, FIELDS,
    read_fields, write_fields, changed_fields,
};
