use crate::codec::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};
use crate::state::Update;
use super::packet::PacketType;

/// Acknowledgment of the fragments received for one update.
///
/// `received[i]` is set when fragment `i` arrived. The vector spans
/// `0..=highest_fragment_id` seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaAck {
    pub update_id: u16,
    pub received: Vec<bool>,
}

impl DeltaAck {
    /// Build the ack for `update`, sorting its fragments by id first
    pub fn for_update(update: &mut Update) -> Self {
        update.fragments.sort_by_key(|f| f.fragment_id);

        let span = update
            .fragments
            .last()
            .map_or(0, |f| f.fragment_id as usize + 1);
        let mut received = vec![false; span];
        for fragment in &update.fragments {
            received[fragment.fragment_id as usize] = true;
        }

        Self { update_id: update.id, received }
    }

    pub fn is_received(&self, fragment_id: u16) -> bool {
        self.received.get(fragment_id as usize).copied().unwrap_or(false)
    }

    pub fn is_complete(&self) -> bool {
        self.received.iter().all(|&r| r)
    }

    /// `[ackType:1][updateId:2][bitfield]`
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(3 + self.received.len().div_ceil(8));
        writer.write_u8(PacketType::ClcDeltaAck as u8);
        writer.write_u16_le(self.update_id);
        writer.write_bits(&self.received);
        writer.into_vec()
    }

    /// Decode an ack. The bitfield carries no length, so trailing zero
    /// bits of the last byte read back as missing fragments.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let ty = reader.read_u8()?;
        if ty != PacketType::ClcDeltaAck as u8 {
            return Err(Error::InvalidPacketType(ty));
        }
        let update_id = reader.read_u16_le()?;
        let received = reader
            .read_remaining()
            .iter()
            .flat_map(|byte| (0..8).map(move |bit| byte & (1 << bit) != 0))
            .collect();
        Ok(Self { update_id, received })
    }
}
