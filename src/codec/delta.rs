//! Per-field delta encoding of a single edict.
//!
//! Every replicated field has one entry in [`FIELDS`]: the flag that
//! announces it, its width on the wire, and how to read, write and compare
//! it. The table order is the wire order, so decoder and encoder cannot
//! drift apart.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::state::Edict;
use super::reader::BinaryReader;
use super::writer::BinaryWriter;

bitflags! {
    /// Field groups present in an index block (the `deltaBits` word)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeltaFlags: u32 {
        const ORIGIN_X = 1 << 0;
        const ORIGIN_Y = 1 << 1;
        const ORIGIN_Z = 1 << 2;
        const ANGLES_X = 1 << 3;
        const ANGLES_Y = 1 << 4;
        const ANGLES_Z = 1 << 5;
        const MODELINDEX = 1 << 6;
        const SKIN = 1 << 7;
        const BODY = 1 << 8;
        const EFFECTS = 1 << 9;
        const SEQUENCE = 1 << 10;
        const GAITSEQUENCE = 1 << 11;
        const FRAME = 1 << 12;
        const ANIMTIME = 1 << 13;
        const FRAMERATE = 1 << 14;
        const CONTROLLER_0 = 1 << 15;
        const CONTROLLER_1 = 1 << 16;
        const CONTROLLER_2 = 1 << 17;
        const CONTROLLER_3 = 1 << 18;
        const BLENDING_0 = 1 << 19;
        const BLENDING_1 = 1 << 20;
        const SCALE = 1 << 21;
        const RENDERMODE = 1 << 22;
        const RENDERAMT = 1 << 23;
        const RENDERCOLOR_0 = 1 << 24;
        const RENDERCOLOR_1 = 1 << 25;
        const RENDERCOLOR_2 = 1 << 26;
        const RENDERFX = 1 << 27;
        const AIMENT = 1 << 28;
    }
}

/// One replicated field
pub struct DeltaField {
    pub flag: DeltaFlags,
    pub name: &'static str,
    /// Bytes on the wire
    pub width: usize,
    pub read: fn(&mut BinaryReader, &mut Edict) -> Result<()>,
    pub write: fn(&mut BinaryWriter, &Edict),
    pub differs: fn(&Edict, &Edict) -> bool,
}

macro_rules! delta_fields {
    ($( $flag:ident : $width:literal, $read:ident, $write:ident, |$e:ident| $place:expr; )*) => {
        /// Replicated fields in wire order
        pub static FIELDS: &[DeltaField] = &[$(
            DeltaField {
                flag: DeltaFlags::$flag,
                name: stringify!($flag),
                width: $width,
                read: {
                    fn read(reader: &mut BinaryReader, $e: &mut Edict) -> Result<()> {
                        $place = reader.$read()?;
                        Ok(())
                    }
                    read
                },
                write: {
                    fn write(writer: &mut BinaryWriter, $e: &Edict) {
                        writer.$write($place);
                    }
                    write
                },
                differs: {
                    fn differs(a: &Edict, b: &Edict) -> bool {
                        let lhs = { let $e = a; $place };
                        let rhs = { let $e = b; $place };
                        lhs != rhs
                    }
                    differs
                },
            },
        )*];
    };
}

delta_fields! {
    ORIGIN_X: 4, read_f32_le, write_f32_le, |e| e.origin.x;
    ORIGIN_Y: 4, read_f32_le, write_f32_le, |e| e.origin.y;
    ORIGIN_Z: 4, read_f32_le, write_f32_le, |e| e.origin.z;
    ANGLES_X: 2, read_u16_le, write_u16_le, |e| e.angles.0[0];
    ANGLES_Y: 2, read_u16_le, write_u16_le, |e| e.angles.0[1];
    ANGLES_Z: 2, read_u16_le, write_u16_le, |e| e.angles.0[2];
    MODELINDEX: 2, read_u16_le, write_u16_le, |e| e.modelindex;
    SKIN: 1, read_u8, write_u8, |e| e.skin;
    BODY: 1, read_u8, write_u8, |e| e.body;
    EFFECTS: 1, read_u8, write_u8, |e| e.effects;
    SEQUENCE: 1, read_u8, write_u8, |e| e.sequence;
    GAITSEQUENCE: 1, read_u8, write_u8, |e| e.gaitsequence;
    FRAME: 1, read_u8, write_u8, |e| e.frame;
    ANIMTIME: 1, read_u8, write_u8, |e| e.animtime;
    FRAMERATE: 1, read_i8, write_i8, |e| e.framerate;
    CONTROLLER_0: 1, read_u8, write_u8, |e| e.controller[0];
    CONTROLLER_1: 1, read_u8, write_u8, |e| e.controller[1];
    CONTROLLER_2: 1, read_u8, write_u8, |e| e.controller[2];
    CONTROLLER_3: 1, read_u8, write_u8, |e| e.controller[3];
    BLENDING_0: 1, read_u8, write_u8, |e| e.blending[0];
    BLENDING_1: 1, read_u8, write_u8, |e| e.blending[1];
    SCALE: 1, read_u8, write_u8, |e| e.scale;
    RENDERMODE: 1, read_u8, write_u8, |e| e.rendermode;
    RENDERAMT: 1, read_u8, write_u8, |e| e.renderamt;
    RENDERCOLOR_0: 1, read_u8, write_u8, |e| e.rendercolor[0];
    RENDERCOLOR_1: 1, read_u8, write_u8, |e| e.rendercolor[1];
    RENDERCOLOR_2: 1, read_u8, write_u8, |e| e.rendercolor[2];
    RENDERFX: 1, read_u8, write_u8, |e| e.renderfx;
    AIMENT: 1, read_u8, write_u8, |e| e.aiment;
}

impl DeltaFlags {
    /// Parse a raw `deltaBits` word, rejecting flags with no field behind them
    pub fn from_wire(raw: u32) -> Result<Self> {
        Self::from_bits(raw)
            .ok_or_else(|| Error::InvalidPacket(format!("unknown delta bits: {raw:#010x}")))
    }

    /// Bytes the flagged fields occupy on the wire
    pub fn encoded_len(self) -> usize {
        FIELDS
            .iter()
            .filter(|f| self.contains(f.flag))
            .map(|f| f.width)
            .sum()
    }
}

/// Overwrite the flagged fields of `edict` from the stream
pub fn read_fields(reader: &mut BinaryReader, flags: DeltaFlags, edict: &mut Edict) -> Result<()> {
    for field in FIELDS.iter().filter(|f| flags.contains(f.flag)) {
        (field.read)(reader, edict)?;
    }
    Ok(())
}

/// Write the flagged fields of `edict`
pub fn write_fields(writer: &mut BinaryWriter, flags: DeltaFlags, edict: &Edict) {
    for field in FIELDS.iter().filter(|f| flags.contains(f.flag)) {
        (field.write)(writer, edict);
    }
}

/// Fields that must be sent to turn `from` into `to`
pub fn changed_fields(from: &Edict, to: &Edict) -> DeltaFlags {
    FIELDS
        .iter()
        .filter(|f| (f.differs)(from, to))
        .fold(DeltaFlags::empty(), |acc, f| acc | f.flag)
}

/// Header of one entity entry: which slot, and which fields follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBlock {
    pub index: usize,
    pub flags: DeltaFlags,
}

impl IndexBlock {
    /// Read an index block. `last_index` is the previous block's index
    /// (0 before the first block of a packet).
    pub fn read(reader: &mut BinaryReader, last_index: usize) -> Result<Self> {
        let offset = reader.read_u8()?;
        let index = if offset == 0 {
            reader.read_u16_le()? as usize
        } else {
            last_index + offset as usize
        };
        let flags = DeltaFlags::from_wire(reader.read_u32_le()?)?;
        Ok(Self { index, flags })
    }

    /// Write an index block, using the one-byte relative form when the
    /// index is within 255 slots after `last_index`.
    pub fn write(&self, writer: &mut BinaryWriter, last_index: usize) {
        match self.index.checked_sub(last_index) {
            Some(offset @ 1..=255) => writer.write_u8(offset as u8),
            _ => {
                writer.write_u8(0);
                writer.write_u16_le(self.index as u16);
            }
        }
        writer.write_u32_le(self.flags.bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PackedAngles, Vec3};

    #[test]
    fn test_table_matches_flags() {
        assert_eq!(FIELDS.len(), DeltaFlags::all().iter().count());
        for (bit, field) in FIELDS.iter().enumerate() {
            assert_eq!(field.flag.bits(), 1 << bit, "{} out of order", field.name);
        }
        assert_eq!(DeltaFlags::all().encoded_len(), 3 * 4 + 4 * 2 + 22);
    }

    #[test]
    fn test_changed_fields() {
        let from = Edict::EMPTY.with_origin(Vec3::new(1.0, 2.0, 3.0));
        let mut to = from;
        to.origin.y = 5.0;
        to.angles = PackedAngles([0, 100, 0]);
        to.rendercolor[2] = 255;

        let flags = changed_fields(&from, &to);
        assert_eq!(
            flags,
            DeltaFlags::ORIGIN_Y | DeltaFlags::ANGLES_Y | DeltaFlags::RENDERCOLOR_2
        );
        assert_eq!(flags.encoded_len(), 4 + 2 + 1);
    }

    #[test]
    fn test_fields_wire_layout() {
        let mut edict = Edict::EMPTY;
        edict.modelindex = 0x0102;
        edict.skin = 7;
        edict.framerate = -1;

        let flags = DeltaFlags::MODELINDEX | DeltaFlags::SKIN | DeltaFlags::FRAMERATE;
        let mut writer = BinaryWriter::new();
        write_fields(&mut writer, flags, &edict);
        assert_eq!(writer.as_slice(), &[0x02, 0x01, 7, 0xFF]);

        let data = writer.into_vec();
        let mut reader = BinaryReader::new(&data);
        let mut decoded = Edict::EMPTY;
        read_fields(&mut reader, flags, &mut decoded).unwrap();
        assert_eq!(decoded.modelindex, 0x0102);
        assert_eq!(decoded.skin, 7);
        assert_eq!(decoded.framerate, -1);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncated_fields_fail() {
        let data = [0x00, 0x00]; // half of origin.x
        let mut reader = BinaryReader::new(&data);
        let mut edict = Edict::EMPTY;
        let err = read_fields(&mut reader, DeltaFlags::ORIGIN_X, &mut edict).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof));
    }

    #[test]
    fn test_index_block_forms() {
        let mut writer = BinaryWriter::new();
        IndexBlock { index: 5, flags: DeltaFlags::SKIN }.write(&mut writer, 0);
        IndexBlock { index: 6, flags: DeltaFlags::empty() }.write(&mut writer, 5);
        IndexBlock { index: 1000, flags: DeltaFlags::BODY }.write(&mut writer, 6);
        IndexBlock { index: 2, flags: DeltaFlags::BODY }.write(&mut writer, 1000);

        let data = writer.into_vec();
        assert_eq!(data[0], 5);
        assert_eq!(data[5], 1);
        assert_eq!(&data[10..13], &[0, 0xE8, 0x03]);

        let mut reader = BinaryReader::new(&data);
        let mut last = 0;
        let mut indices = Vec::new();
        while !reader.is_empty() {
            let block = IndexBlock::read(&mut reader, last).unwrap();
            last = block.index;
            indices.push(block.index);
        }
        assert_eq!(indices, vec![5, 6, 1000, 2]);
    }

    #[test]
    fn test_unknown_flags_rejected() {
        assert!(DeltaFlags::from_wire(1 << 31).is_err());
        assert!(DeltaFlags::from_wire(DeltaFlags::AIMENT.bits()).is_ok());
    }
}
