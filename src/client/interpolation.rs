use crate::codec::{lerp_wrapping_u16, lerp_wrapping_u8, PackedAngles};
use crate::state::{Edict, EdictArena, EntityStore};

pub const DEFAULT_UPDATE_RATE: f32 = 10.0;

/// Render-side smoothing between the previous and current states.
///
/// Owns the interpolated arena; the protocol never writes to it.
#[derive(Debug)]
pub struct Interpolator {
    update_rate: f32,
    output: EdictArena,
}

impl Interpolator {
    pub fn new(update_rate: f32) -> Self {
        Self {
            update_rate,
            output: EdictArena::new(),
        }
    }

    pub fn update_rate(&self) -> f32 {
        self.update_rate
    }

    pub fn output(&self) -> &EdictArena {
        &self.output
    }

    /// Fraction of an update interval elapsed since `last_update_time`
    pub fn fraction(&self, last_update_time: f64, now: f64) -> f32 {
        let interval = 1.0 / self.update_rate as f64;
        ((now - last_update_time) / interval).max(0.0) as f32
    }

    /// Rebuild the interpolated arena for render time `now`
    pub fn interpolate(&mut self, store: &EntityStore, last_update_time: f64, now: f64) -> &EdictArena {
        let t = self.fraction(last_update_time, now);

        if t >= 1.0 {
            // Never extrapolate past the latest confirmed state.
            self.output.copy_from(&store.current);
            return &self.output;
        }

        let slots = self
            .output
            .as_mut_slice()
            .iter_mut()
            .zip(store.previous.as_slice().iter().zip(store.current.as_slice()));
        for (out, (prev, cur)) in slots {
            *out = if prev.is_valid && cur.is_valid {
                lerp_edict(prev, cur, t)
            } else {
                Edict::EMPTY
            };
        }
        &self.output
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_RATE)
    }
}

fn lerp_edict(prev: &Edict, cur: &Edict, t: f32) -> Edict {
    let mut out = *prev;
    out.origin = prev.origin.lerp(cur.origin, t);
    out.velocity = prev.velocity.lerp(cur.velocity, t);
    out.angles = PackedAngles(std::array::from_fn(|axis| {
        lerp_wrapping_u16(prev.angles.0[axis], cur.angles.0[axis], t)
    }));
    out.frame = if prev.sequence == cur.sequence {
        lerp_wrapping_u8(prev.frame, cur.frame, t)
    } else {
        // New sequence restarts the animation from frame 0
        (cur.frame as f32 * t).round() as u8
    };
    out
}
