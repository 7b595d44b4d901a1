//! Cell contents and power-up kinds.

/// A collectible power-up. Wire codes follow the runtime's `PowerUpType`
/// enum (1 = cloak, 2 = scavenger, 3 = multiplier juice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    /// Makes the holder uncapturable for 20 ticks once used.
    Cloak,
    /// Sweeps every plain pellet in the surrounding 11x11 square.
    Scavenger,
    /// Triples pellet value for 5 ticks once used.
    MultiplierJuice,
}

impl PowerUpKind {
    pub fn to_wire(self) -> i32 {
        match self {
            PowerUpKind::Cloak => 1,
            PowerUpKind::Scavenger => 2,
            PowerUpKind::MultiplierJuice => 3,
        }
    }

    pub fn from_wire(value: i32) -> Option<PowerUpKind> {
        match value {
            1 => Some(PowerUpKind::Cloak),
            2 => Some(PowerUpKind::Scavenger),
            3 => Some(PowerUpKind::MultiplierJuice),
            _ => None,
        }
    }
}

/// What a grid cell holds. The runtime also transmits transient animal and
/// zookeeper markers (codes 3 and 4); those are positional, not cell state,
/// and decode to [`CellContent::Empty`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CellContent {
    #[default]
    Empty,
    Wall,
    Pellet,
    PowerPellet,
    PowerUp(PowerUpKind),
}

impl CellContent {
    /// True for plain and power pellets.
    #[inline]
    pub fn is_pellet(self) -> bool {
        matches!(self, CellContent::Pellet | CellContent::PowerPellet)
    }

    #[inline]
    pub fn is_power_up(self) -> bool {
        matches!(self, CellContent::PowerUp(_))
    }

    pub fn to_wire(self) -> i32 {
        match self {
            CellContent::Empty => 0,
            CellContent::Wall => 1,
            CellContent::Pellet => 2,
            CellContent::PowerPellet => 5,
            CellContent::PowerUp(PowerUpKind::Cloak) => 6,
            CellContent::PowerUp(PowerUpKind::Scavenger) => 7,
            CellContent::PowerUp(PowerUpKind::MultiplierJuice) => 8,
        }
    }

    /// Decode a wire cell code. Unknown codes and the transient entity
    /// markers read as empty cells.
    pub fn from_wire(value: i32) -> CellContent {
        match value {
            1 => CellContent::Wall,
            2 => CellContent::Pellet,
            5 => CellContent::PowerPellet,
            6 => CellContent::PowerUp(PowerUpKind::Cloak),
            7 => CellContent::PowerUp(PowerUpKind::Scavenger),
            8 => CellContent::PowerUp(PowerUpKind::MultiplierJuice),
            _ => CellContent::Empty,
        }
    }
}
