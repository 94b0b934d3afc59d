use bytes::Bytes;

use crate::codec::{BinaryReader, BinaryWriter, DeltaFlags, IndexBlock, write_fields};
use crate::error::{Error, Result};
use crate::state::Edict;

/// Maximum datagram size (MTU-safe)
pub const MAX_PACKET_SIZE: usize = 1400;

/// Leading byte of every datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    ClcConnect = 0x01,
    SvcWelcome = 0x02,
    SvcDeltaPacketEntities = 0x03,
    ClcDeltaAck = 0x04,
    ClcDeltaReset = 0x05,
}

impl PacketType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::ClcConnect),
            0x02 => Some(Self::SvcWelcome),
            0x03 => Some(Self::SvcDeltaPacketEntities),
            0x04 => Some(Self::ClcDeltaAck),
            0x05 => Some(Self::ClcDeltaReset),
            _ => None,
        }
    }

    /// Read the type byte of a datagram
    pub fn of(data: &[u8]) -> Result<Self> {
        let byte = *data.first().ok_or(Error::UnexpectedEof)?;
        Self::from_u8(byte).ok_or(Error::InvalidPacketType(byte))
    }
}

/// Server greeting naming the map being played
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    pub map_name: String,
}

impl Welcome {
    pub const MIN_SIZE: usize = 2;
    pub const MAX_SIZE: usize = 64;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&data.len()) {
            return Err(Error::BadWelcomeSize {
                len: data.len(),
                min: Self::MIN_SIZE,
                max: Self::MAX_SIZE,
            });
        }
        let mut reader = BinaryReader::new(data);
        reader.skip(1)?;
        let map_name = reader.read_cstring(Self::MAX_SIZE - 1)?;
        if map_name.is_empty() {
            return Err(Error::InvalidPacket("welcome with empty map name".into()));
        }
        Ok(Self { map_name })
    }

    pub fn encode(&self) -> Vec<u8> {
        let name = self.map_name.as_bytes();
        let name = &name[..name.len().min(Self::MAX_SIZE - 1)];
        let mut packet = Vec::with_capacity(1 + name.len());
        packet.push(PacketType::SvcWelcome as u8);
        packet.extend_from_slice(name);
        packet
    }
}

/// One received piece of an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaFragment {
    pub update_id: u16,
    pub baseline_id: u16,
    pub fragment_id: u16,
    /// Index blocks following the header
    pub body: Bytes,
}

impl DeltaFragment {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let ty = reader.read_u8()?;
        if ty != PacketType::SvcDeltaPacketEntities as u8 {
            return Err(Error::InvalidPacketType(ty));
        }
        let update_id = reader.read_u16_le()?;
        let baseline_id = reader.read_u16_le()?;
        let fragment_id = reader.read_u16_le()?;
        Ok(Self {
            update_id,
            baseline_id,
            fragment_id,
            body: Bytes::copy_from_slice(reader.read_remaining()),
        })
    }
}

/// Builds `SvcDeltaPacketEntities` datagrams, as a server would send them
pub struct DeltaPacketBuilder {
    writer: BinaryWriter,
    last_index: usize,
}

impl DeltaPacketBuilder {
    pub fn new(update_id: u16, baseline_id: u16, fragment_id: u16) -> Self {
        let mut writer = BinaryWriter::with_capacity(MAX_PACKET_SIZE);
        writer.write_u8(PacketType::SvcDeltaPacketEntities as u8);
        writer.write_u16_le(update_id);
        writer.write_u16_le(baseline_id);
        writer.write_u16_le(fragment_id);
        Self { writer, last_index: 0 }
    }

    /// Append an entity entry carrying the flagged fields of `edict`
    pub fn entity(mut self, index: usize, flags: DeltaFlags, edict: &Edict) -> Self {
        IndexBlock { index, flags }.write(&mut self.writer, self.last_index);
        write_fields(&mut self.writer, flags, edict);
        self.last_index = index;
        self
    }

    /// Append an entry marking `index` as freed
    pub fn remove(mut self, index: usize) -> Self {
        IndexBlock { index, flags: DeltaFlags::empty() }.write(&mut self.writer, self.last_index);
        self.last_index = index;
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.writer.into_vec()
    }
}

pub fn connect_packet() -> Vec<u8> {
    vec![PacketType::ClcConnect as u8]
}

pub fn delta_reset_packet() -> Vec<u8> {
    vec![PacketType::ClcDeltaReset as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Vec3;

    #[test]
    fn test_packet_type_byte() {
        assert_eq!(PacketType::of(&[0x02, b'x']).unwrap(), PacketType::SvcWelcome);
        assert!(matches!(PacketType::of(&[0x7F]), Err(Error::InvalidPacketType(0x7F))));
        assert!(matches!(PacketType::of(&[]), Err(Error::UnexpectedEof)));
        assert_eq!(connect_packet(), vec![0x01]);
        assert_eq!(delta_reset_packet(), vec![0x05]);
    }

    #[test]
    fn test_welcome_parse() {
        let welcome = Welcome::parse(b"\x02svencoop1\0").unwrap();
        assert_eq!(welcome.map_name, "svencoop1");

        // Terminator is optional on the wire
        let welcome = Welcome::parse(b"\x02hl_c00").unwrap();
        assert_eq!(welcome.map_name, "hl_c00");
    }

    #[test]
    fn test_welcome_size_bounds() {
        assert!(matches!(Welcome::parse(&[0x02]), Err(Error::BadWelcomeSize { len: 1, .. })));

        let mut long = vec![0x02];
        long.extend(std::iter::repeat(b'a').take(64));
        assert!(matches!(Welcome::parse(&long), Err(Error::BadWelcomeSize { len: 65, .. })));

        long.truncate(64);
        assert_eq!(Welcome::parse(&long).unwrap().map_name.len(), 63);
    }

    #[test]
    fn test_welcome_encode() {
        let packet = Welcome { map_name: "svencoop1".into() }.encode();
        assert_eq!(packet[0], PacketType::SvcWelcome as u8);
        assert_eq!(Welcome::parse(&packet).unwrap().map_name, "svencoop1");
    }

    #[test]
    fn test_delta_header() {
        let edict = Edict::EMPTY.with_origin(Vec3::new(1.0, 2.0, 3.0));
        let packet = DeltaPacketBuilder::new(0x0102, 7, 3)
            .entity(5, DeltaFlags::ORIGIN_X, &edict)
            .build();

        assert_eq!(&packet[..7], &[0x03, 0x02, 0x01, 0x07, 0x00, 0x03, 0x00]);

        let fragment = DeltaFragment::parse(&packet).unwrap();
        assert_eq!(fragment.update_id, 0x0102);
        assert_eq!(fragment.baseline_id, 7);
        assert_eq!(fragment.fragment_id, 3);
        // offset(1) + bits(4) + origin.x(4)
        assert_eq!(fragment.body.len(), 9);
    }

    #[test]
    fn test_delta_header_truncated() {
        assert!(matches!(
            DeltaFragment::parse(&[0x03, 0x01, 0x00, 0x00]),
            Err(Error::UnexpectedEof)
        ));
    }
}
