use crate::codec::{read_fields, BinaryReader, IndexBlock, Vec3};
use crate::error::Result;
use super::edict::{Edict, EdictIndex};
use super::store::EntityStore;

/// A slot's `current` and `previous` before a fragment touched it
#[derive(Debug, Clone, Copy)]
struct SavedSlot {
    index: EdictIndex,
    current: Edict,
    previous: Edict,
}

/// Which array a delta is decoded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyTarget {
    /// Replay a retained update onto `baseline`
    Baseline,
    /// Apply a live fragment: `current = baseline + delta`
    Current,
}

impl EntityStore {
    /// Decode the index blocks of one delta fragment.
    ///
    /// Returns the number of entity entries applied. On any decode error
    /// against [`ApplyTarget::Current`], every slot the fragment touched
    /// gets its `current` and `previous` back, so the store is exactly as
    /// it was before the fragment.
    pub fn apply_delta(&mut self, body: &[u8], target: ApplyTarget) -> Result<usize> {
        let mut saved = Vec::new();
        let result = self.decode_entries(body, target, &mut saved);
        if result.is_err() && !saved.is_empty() {
            self.restore(&saved);
        }
        result
    }

    fn restore(&mut self, saved: &[SavedSlot]) {
        // Newest first, so a slot listed twice ends at its oldest value
        for slot in saved.iter().rev() {
            self.current[slot.index] = slot.current;
            self.previous[slot.index] = slot.previous;
        }
    }

    fn decode_entries(
        &mut self,
        body: &[u8],
        target: ApplyTarget,
        saved: &mut Vec<SavedSlot>,
    ) -> Result<usize> {
        let mut reader = BinaryReader::new(body);
        let mut last_index = 0;
        let mut applied = 0;

        while !reader.is_empty() {
            let block = IndexBlock::read(&mut reader, last_index)?;
            let index = EdictIndex::new(block.index)?;
            last_index = block.index;

            match target {
                ApplyTarget::Baseline => {
                    let edict = &mut self.baseline[index];
                    edict.is_valid = !block.flags.is_empty();
                    read_fields(&mut reader, block.flags, edict)?;
                }
                ApplyTarget::Current => {
                    saved.push(SavedSlot {
                        index,
                        current: self.current[index],
                        previous: self.previous[index],
                    });
                    self.previous[index] = self.current[index];

                    let mut edict = self.baseline[index];
                    edict.is_valid = !block.flags.is_empty();
                    read_fields(&mut reader, block.flags, &mut edict)?;

                    let previous = &self.previous[index];
                    edict.velocity = if edict.is_valid && previous.is_valid {
                        edict.origin - previous.origin
                    } else {
                        Vec3::ZERO
                    };
                    self.current[index] = edict;
                }
            }
            applied += 1;
        }

        Ok(applied)
    }
}
