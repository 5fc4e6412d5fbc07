/// Grid geometry and the rigid-body stand-in.
///
/// ## Architecture
///
/// Two distinct concepts:
///   1. FLOOR: which integer cells have ground (`CellSet`, immutable per stage)
///   2. BODY : where the player actually is (`Body`, continuous)
///
/// The player is never snapped to cells while travelling. `GridCell::containing`
/// rounds a continuous position to the cell it stands on; the mover asks the
/// `CellSet` whether that cell has floor.
///
/// ## Body integration
///
/// `Body::integrate` is a semi-implicit Euler step: velocity first (gravity,
/// when enabled), then position. Rotation integrates only when unlocked, which
/// is the case only after a fall starts.

use std::collections::HashSet;

use glam::{Quat, Vec3};

/// Grid pitch in world units. One cell is one unit wide.
pub const TILE_SIZE: f32 = 1.0;

// ══════════════════════════════════════════════════════════════
// Grid cells
// ══════════════════════════════════════════════════════════════

/// Integer (x, z) grid coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GridCell {
    pub x: i32,
    pub z: i32,
}

impl GridCell {
    pub fn new(x: i32, z: i32) -> Self {
        GridCell { x, z }
    }

    /// Cell under a continuous position: x and z rounded to nearest,
    /// halves away from zero. Y is ignored.
    #[inline]
    pub fn containing(pos: Vec3) -> Self {
        GridCell { x: pos.x.round() as i32, z: pos.z.round() as i32 }
    }

    /// Cell centre at the given height.
    pub fn center(self, y: f32) -> Vec3 {
        Vec3::new(self.x as f32, y, self.z as f32)
    }
}

/// The set of cells with floor. Built once at stage load.
#[derive(Clone, Debug, Default)]
pub struct CellSet {
    cells: HashSet<GridCell>,
}

impl CellSet {
    pub fn new() -> Self {
        CellSet { cells: HashSet::new() }
    }

    pub fn insert(&mut self, cell: GridCell) {
        self.cells.insert(cell);
    }

    #[inline]
    pub fn contains(&self, cell: GridCell) -> bool {
        self.cells.contains(&cell)
    }

    /// Is there floor under this continuous position?
    #[inline]
    pub fn has_floor_at(&self, pos: Vec3) -> bool {
        self.contains(GridCell::containing(pos))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// (min, max) corners, or None for an empty set.
    pub fn bounds(&self) -> Option<(GridCell, GridCell)> {
        let mut it = self.cells.iter();
        let first = *it.next()?;
        Some(it.fold((first, first), |(lo, hi), c| {
            (
                GridCell::new(lo.x.min(c.x), lo.z.min(c.z)),
                GridCell::new(hi.x.max(c.x), hi.z.max(c.z)),
            )
        }))
    }
}

impl FromIterator<GridCell> for CellSet {
    fn from_iter<I: IntoIterator<Item = GridCell>>(iter: I) -> Self {
        CellSet { cells: iter.into_iter().collect() }
    }
}

// ══════════════════════════════════════════════════════════════
// Trigger volumes
// ══════════════════════════════════════════════════════════════

/// Do two square trigger volumes overlap in the XZ plane?
#[inline]
pub fn triggers_overlap(a: Vec3, a_half: f32, b: Vec3, b_half: f32) -> bool {
    let reach = a_half + b_half;
    (a.x - b.x).abs() < reach && (a.z - b.z).abs() < reach
}

// ══════════════════════════════════════════════════════════════
// Body
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Body {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub use_gravity: bool,
    pub rotation_locked: bool,
}

impl Body {
    pub fn at(position: Vec3, rotation: Quat) -> Self {
        Body {
            position,
            rotation,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            use_gravity: false,
            rotation_locked: true,
        }
    }

    /// Put the body back on the ground at `position`: still, no gravity,
    /// rotation locked.
    pub fn reset_grounded(&mut self, position: Vec3, rotation: Quat) {
        self.position = position;
        self.rotation = rotation;
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.use_gravity = false;
        self.rotation_locked = true;
    }

    /// Speed in the grid plane.
    #[inline]
    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }

    /// One integration step of `dt` seconds.
    pub fn integrate(&mut self, dt: f32, gravity: f32) {
        if self.use_gravity {
            self.velocity.y -= gravity * dt;
        }
        self.position += self.velocity * dt;

        if !self.rotation_locked {
            let w = self.angular_velocity;
            let angle = w.length() * dt;
            if angle > 0.0 {
                let spin = Quat::from_axis_angle(w.normalize(), angle);
                self.rotation = (spin * self.rotation).normalize();
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
