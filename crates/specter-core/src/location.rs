//! World positions and view directions.

use serde::{Deserialize, Serialize};

/// A position in a named world plus a view direction.
///
/// Sessions capture their spawn pose as a `Location` and re-assert it on
/// their first simulation tick, since the host may nudge a freshly spawned
/// entity while wiring it into the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Name of the world this position belongs to.
    pub world: String,
    /// East/west coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// North/south coordinate.
    pub z: f64,
    /// Horizontal view angle in degrees.
    pub yaw: f32,
    /// Vertical view angle in degrees.
    pub pitch: f32,
}

impl Location {
    /// A position with a neutral view direction.
    #[must_use]
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Set the view direction.
    #[must_use]
    pub fn with_look(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Region (chunk) coordinates containing this position.
    ///
    /// Regions are 16x16 block columns; the host loads them before an entity
    /// may be placed inside.
    #[must_use]
    pub fn region(&self) -> (i32, i32) {
        #[allow(clippy::cast_possible_truncation)]
        let (bx, bz) = (self.x.floor() as i32, self.z.floor() as i32);
        (bx >> 4, bz >> 4)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
