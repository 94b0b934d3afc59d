use crate::codec::{PackedAngles, Vec3};
use crate::error::{Error, Result};

/// Capacity of every edict array
pub const MAX_EDICTS: usize = 8192;

/// Bounds-checked slot in an edict array
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdictIndex(u16);

impl EdictIndex {
    pub fn new(index: usize) -> Result<Self> {
        if index >= MAX_EDICTS {
            return Err(Error::IndexOutOfRange { index, max: MAX_EDICTS - 1 });
        }
        Ok(Self(index as u16))
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Replicated state of one networked entity.
///
/// `velocity` is derived on the client from successive origins and is
/// never carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edict {
    pub is_valid: bool,
    pub origin: Vec3,
    pub angles: PackedAngles,
    pub modelindex: u16,

    pub skin: u8,
    pub body: u8,
    pub effects: u8,

    pub sequence: u8,
    pub gaitsequence: u8,
    pub frame: u8,
    pub animtime: u8,
    pub framerate: i8,
    pub controller: [u8; 4],
    pub blending: [u8; 2],

    pub scale: u8,
    pub rendermode: u8,
    pub renderamt: u8,
    pub rendercolor: [u8; 3],
    pub renderfx: u8,

    pub aiment: u8,

    pub velocity: Vec3,
}

impl Edict {
    /// A freed slot
    pub const EMPTY: Self = Self {
        is_valid: false,
        origin: Vec3::ZERO,
        angles: PackedAngles([0; 3]),
        modelindex: 0,
        skin: 0,
        body: 0,
        effects: 0,
        sequence: 0,
        gaitsequence: 0,
        frame: 0,
        animtime: 0,
        framerate: 0,
        controller: [0; 4],
        blending: [0; 2],
        scale: 0,
        rendermode: 0,
        renderamt: 0,
        rendercolor: [0; 3],
        renderfx: 0,
        aiment: 0,
        velocity: Vec3::ZERO,
    };

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.is_valid = true;
        self.origin = origin;
        self
    }

    pub fn with_angles(mut self, angles: PackedAngles) -> Self {
        self.angles = angles;
        self
    }

    pub fn with_model(mut self, modelindex: u16) -> Self {
        self.is_valid = true;
        self.modelindex = modelindex;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_bounds() {
        assert_eq!(EdictIndex::new(0).unwrap().get(), 0);
        assert_eq!(EdictIndex::new(MAX_EDICTS - 1).unwrap().get(), MAX_EDICTS - 1);
        assert!(matches!(
            EdictIndex::new(MAX_EDICTS),
            Err(Error::IndexOutOfRange { index: MAX_EDICTS, .. })
        ));
    }

    #[test]
    fn test_default_is_empty() {
        assert_eq!(Edict::default(), Edict::EMPTY);
        assert!(!Edict::default().is_valid);
    }
}
