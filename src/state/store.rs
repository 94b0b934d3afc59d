use std::ops::{Index, IndexMut};

use super::edict::{Edict, EdictIndex, MAX_EDICTS};

/// Fixed-capacity edict array addressed by [`EdictIndex`]
#[derive(Debug, Clone, PartialEq)]
pub struct EdictArena {
    edicts: Box<[Edict]>,
}

impl EdictArena {
    pub fn new() -> Self {
        Self {
            edicts: vec![Edict::EMPTY; MAX_EDICTS].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.edicts.len()
    }

    /// Reset every slot to [`Edict::EMPTY`]
    pub fn clear(&mut self) {
        self.edicts.fill(Edict::EMPTY);
    }

    pub fn copy_from(&mut self, other: &EdictArena) {
        self.edicts.copy_from_slice(&other.edicts);
    }

    pub fn as_slice(&self) -> &[Edict] {
        &self.edicts
    }

    pub fn as_mut_slice(&mut self) -> &mut [Edict] {
        &mut self.edicts
    }

    /// Valid edicts with their slot numbers
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, &Edict)> {
        self.edicts.iter().enumerate().filter(|(_, e)| e.is_valid)
    }

    pub fn valid_count(&self) -> usize {
        self.edicts.iter().filter(|e| e.is_valid).count()
    }
}

impl Default for EdictArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<EdictIndex> for EdictArena {
    type Output = Edict;

    fn index(&self, index: EdictIndex) -> &Edict {
        &self.edicts[index.get()]
    }
}

impl IndexMut<EdictIndex> for EdictArena {
    fn index_mut(&mut self, index: EdictIndex) -> &mut Edict {
        &mut self.edicts[index.get()]
    }
}

/// The three protocol-owned edict arrays.
///
/// `current` is always `baseline` with every delta since the baseline
/// folded in; `previous` is what `current` held before the latest delta
/// touched each slot.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub baseline: EdictArena,
    pub current: EdictArena,
    pub previous: EdictArena,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_baseline(&mut self) {
        self.baseline.clear();
    }
}
