/// Tile catalogue: the fixed set of tile kinds and their configuration.
/// Semantics are queried via methods so that every rule about what a tile
/// *is* lives here, not in the step function.
///
/// ## Kinds
///   - `Floor`      : plain walkable cell (also decoration floors)
///   - `Start`      : spawn marker, no trigger effect
///   - `Goal`       : stops the player, completes the level
///   - `Arrow`      : snaps to grid and turns the player
///   - `Variable`   : arithmetic on one register
///   - `Conditional`: compares a register, arms the skip flag on failure
///   - `Teleport`   : source jumps to its group's destination

use glam::Vec3;
use serde::Deserialize;

use super::physics::GridCell;

/// Index of a tile inside the board's catalogue.
pub type TileId = usize;

/// Number of teleport groups (ids 0..=9).
pub const TELEPORT_GROUPS: usize = 10;

// ── Direction ──

/// Arrow direction. Up is +Z, Right is +X.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    /// Unit vector in the grid plane.
    pub fn vector(self) -> Vec3 {
        match self {
            Direction::Up    => Vec3::Z,
            Direction::Right => Vec3::X,
            Direction::Down  => Vec3::NEG_Z,
            Direction::Left  => Vec3::NEG_X,
        }
    }

    /// Next direction clockwise (Up → Right → Down → Left → Up).
    pub fn clockwise(self) -> Direction {
        match self {
            Direction::Up    => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down  => Direction::Left,
            Direction::Left  => Direction::Up,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Direction::Up    => '^',
            Direction::Right => '>',
            Direction::Down  => 'v',
            Direction::Left  => '<',
        }
    }

    /// Decode an arrow map code offset (0..=3).
    pub fn from_index(i: i32) -> Option<Direction> {
        match i {
            0 => Some(Direction::Up),
            1 => Some(Direction::Right),
            2 => Some(Direction::Down),
            3 => Some(Direction::Left),
            _ => None,
        }
    }
}

// ── Registers ──

/// The three named integer registers ("gems").
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    #[default]
    Ruby,
    Sapphire,
    Emerald,
}

impl Register {
    pub const ALL: [Register; 3] = [Register::Ruby, Register::Sapphire, Register::Emerald];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Step through `ALL` with wraparound.
    pub fn cycled(self, step: i32) -> Register {
        Self::ALL[wrap_index(self.index(), step, Self::ALL.len())]
    }

    pub fn initial(self) -> char {
        match self {
            Register::Ruby     => 'R',
            Register::Sapphire => 'S',
            Register::Emerald  => 'E',
        }
    }
}

// ── Operations ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Assign,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Add, Operation::Subtract, Operation::Multiply,
        Operation::Divide, Operation::Assign,
    ];

    pub fn cycled(self, step: i32) -> Operation {
        let i = Self::ALL.iter().position(|&o| o == self).unwrap_or(0);
        Self::ALL[wrap_index(i, step, Self::ALL.len())]
    }

    pub fn symbol(self) -> char {
        match self {
            Operation::Add      => '+',
            Operation::Subtract => '-',
            Operation::Multiply => '*',
            Operation::Divide   => '/',
            Operation::Assign   => '=',
        }
    }
}

// ── Comparators ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
pub enum Comparator {
    #[default]
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">=")]
    GreaterOrEqual,
}

impl Comparator {
    pub const ALL: [Comparator; 6] = [
        Comparator::Less, Comparator::Greater, Comparator::Equal,
        Comparator::NotEqual, Comparator::LessOrEqual, Comparator::GreaterOrEqual,
    ];

    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Comparator::Less           => lhs < rhs,
            Comparator::Greater        => lhs > rhs,
            Comparator::Equal          => lhs == rhs,
            Comparator::NotEqual       => lhs != rhs,
            Comparator::LessOrEqual    => lhs <= rhs,
            Comparator::GreaterOrEqual => lhs >= rhs,
        }
    }

    pub fn cycled(self, step: i32) -> Comparator {
        let i = Self::ALL.iter().position(|&c| c == self).unwrap_or(0);
        Self::ALL[wrap_index(i, step, Self::ALL.len())]
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Less           => "<",
            Comparator::Greater        => ">",
            Comparator::Equal          => "==",
            Comparator::NotEqual       => "!=",
            Comparator::LessOrEqual    => "<=",
            Comparator::GreaterOrEqual => ">=",
        }
    }
}

// ── Teleport role ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TeleportRole {
    Source,
    Destination,
}

// ── Tile kind ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileKind {
    Floor,
    Start,
    Goal,
    Arrow { direction: Direction },
    Variable { register: Register, operation: Operation, operand: i32 },
    Conditional { register: Register, comparator: Comparator, threshold: i32 },
    Teleport { group: u8, role: TeleportRole },
}

impl TileKind {
    /// Does entering this tile run an effect? Passive tiles never raise a
    /// trigger event and so never consume the skip flag.
    pub fn has_effect(self) -> bool {
        match self {
            TileKind::Floor | TileKind::Start => false,
            TileKind::Teleport { role, .. } => role == TeleportRole::Source,
            TileKind::Goal
            | TileKind::Arrow { .. }
            | TileKind::Variable { .. }
            | TileKind::Conditional { .. } => true,
        }
    }

    /// Short label for logs and the side panel.
    pub fn label(self) -> &'static str {
        match self {
            TileKind::Floor            => "floor",
            TileKind::Start            => "start",
            TileKind::Goal             => "goal",
            TileKind::Arrow { .. }     => "arrow",
            TileKind::Variable { .. }  => "variable",
            TileKind::Conditional { .. } => "if",
            TileKind::Teleport { role: TeleportRole::Source, .. } => "teleport in",
            TileKind::Teleport { role: TeleportRole::Destination, .. } => "teleport out",
        }
    }
}

// ── Edit permissions ──

/// What the authoring interface may change on a tile.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EditRule {
    #[default]
    Locked,
    /// Arrow may point anywhere except `forbidden`.
    Arrow { forbidden: Option<Direction> },
    /// Variable or conditional tile: which fields are open.
    Fields { register: bool, operation: bool, value: bool },
}

impl EditRule {
    /// Decode an editable-map code. Codes that do not fit the tile kind
    /// leave the tile locked.
    pub fn from_code(code: i32, kind: TileKind) -> EditRule {
        match (kind, code) {
            (TileKind::Arrow { .. }, 1) => EditRule::Arrow { forbidden: None },
            (TileKind::Arrow { .. }, 2..=5) => EditRule::Arrow { forbidden: Direction::from_index(code - 2) },
            (TileKind::Variable { .. }, 10..=13) => EditRule::fields(code - 10),
            (TileKind::Conditional { .. }, 20..=23) => EditRule::fields(code - 20),
            _ => EditRule::Locked,
        }
    }

    fn fields(sel: i32) -> EditRule {
        EditRule::Fields {
            register: sel == 0 || sel == 1,
            operation: sel == 0 || sel == 2,
            value: sel == 0 || sel == 3,
        }
    }

    pub fn is_editable(self) -> bool {
        self != EditRule::Locked
    }
}

// ── Tile instance ──

#[derive(Clone, Debug)]
pub struct Tile {
    pub kind: TileKind,
    /// World position of the trigger volume centre.
    pub position: Vec3,
    pub cell: GridCell,
    pub edit: EditRule,
}

impl Tile {
    pub fn new(kind: TileKind, position: Vec3) -> Self {
        Tile {
            kind,
            position,
            cell: GridCell::containing(position),
            edit: EditRule::Locked,
        }
    }

    pub fn with_edit(mut self, edit: EditRule) -> Self {
        self.edit = edit;
        self
    }

    /// Three-column label used by the terminal map.
    pub fn glyph(&self) -> String {
        match self.kind {
            TileKind::Floor => " . ".to_string(),
            TileKind::Start => " S ".to_string(),
            TileKind::Goal  => " G ".to_string(),
            TileKind::Arrow { direction } => format!(" {} ", direction.glyph()),
            TileKind::Variable { register, operation, operand } => {
                format!("{}{}{}", register.initial(), operation.symbol(), short_value(operand))
            }
            TileKind::Conditional { register, comparator, threshold } => {
                let c = match comparator {
                    Comparator::Less => '<',
                    Comparator::Greater => '>',
                    Comparator::Equal => '=',
                    Comparator::NotEqual => '!',
                    Comparator::LessOrEqual => '{',
                    Comparator::GreaterOrEqual => '}',
                };
                format!("{}{}{}", register.initial(), c, short_value(threshold))
            }
            TileKind::Teleport { group, role: TeleportRole::Source } => format!("T{group}>"),
            TileKind::Teleport { group, role: TeleportRole::Destination } => format!(">T{group}"),
        }
    }
}

fn short_value(v: i32) -> char {
    match v {
        0..=9 => char::from(b'0' + v as u8),
        _ => '#',
    }
}

/// `(i + step) mod len`, handling negative steps.
fn wrap_index(i: usize, step: i32, len: usize) -> usize {
    (i as i64 + step as i64).rem_euclid(len as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_vectors_follow_grid_axes() {
        assert_eq!(Direction::Up.vector(), Vec3::Z);
        assert_eq!(Direction::Right.vector(), Vec3::X);
        assert_eq!(Direction::Down.vector(), Vec3::NEG_Z);
        assert_eq!(Direction::Left.vector(), Vec3::NEG_X);
    }

    #[test]
    fn clockwise_cycles_all_four() {
        let mut d = Direction::Up;
        for expected in [Direction::Right, Direction::Down, Direction::Left, Direction::Up] {
            d = d.clockwise();
            assert_eq!(d, expected);
        }
    }

    #[test]
    fn comparators_evaluate() {
        assert!(Comparator::Less.holds(1, 2));
        assert!(!Comparator::Greater.holds(2, 2));
        assert!(Comparator::Equal.holds(-3, -3));
        assert!(Comparator::NotEqual.holds(0, 1));
        assert!(Comparator::LessOrEqual.holds(2, 2));
        assert!(Comparator::GreaterOrEqual.holds(3, 2));
        assert!(!Comparator::GreaterOrEqual.holds(1, 2));
    }

    #[test]
    fn cycling_wraps_both_ways() {
        assert_eq!(Register::Ruby.cycled(-1), Register::Emerald);
        assert_eq!(Register::Emerald.cycled(1), Register::Ruby);
        assert_eq!(Operation::Assign.cycled(1), Operation::Add);
        assert_eq!(Comparator::Less.cycled(-1), Comparator::GreaterOrEqual);
    }

    #[test]
    fn passive_tiles_have_no_effect() {
        assert!(!TileKind::Floor.has_effect());
        assert!(!TileKind::Start.has_effect());
        assert!(!TileKind::Teleport { group: 1, role: TeleportRole::Destination }.has_effect());
        assert!(TileKind::Teleport { group: 1, role: TeleportRole::Source }.has_effect());
        assert!(TileKind::Goal.has_effect());
    }

    #[test]
    fn edit_rule_decoding() {
        let arrow = TileKind::Arrow { direction: Direction::Up };
        assert_eq!(EditRule::from_code(0, arrow), EditRule::Locked);
        assert_eq!(EditRule::from_code(1, arrow), EditRule::Arrow { forbidden: None });
        assert_eq!(EditRule::from_code(3, arrow), EditRule::Arrow { forbidden: Some(Direction::Right) });

        let var = TileKind::Variable { register: Register::Ruby, operation: Operation::Add, operand: 1 };
        assert_eq!(
            EditRule::from_code(12, var),
            EditRule::Fields { register: false, operation: true, value: false }
        );
        // Variable codes on an arrow are ignored.
        assert_eq!(EditRule::from_code(10, arrow), EditRule::Locked);
    }
}
