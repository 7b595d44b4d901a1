//! The discrete action space shared by the simulator and the engine.

/// One bot action per tick. The integer values match the wire encoding
/// expected by the game runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BotAction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
    UseItem,
}

impl BotAction {
    /// Number of distinct actions, including `None`.
    pub const COUNT: usize = 6;

    /// The four directional moves, in wire order.
    pub const MOVES: [BotAction; 4] = [
        BotAction::Up,
        BotAction::Down,
        BotAction::Left,
        BotAction::Right,
    ];

    /// Grid offset of a directional move. `None` for the non-movement
    /// actions.
    #[inline]
    pub fn offset(self) -> Option<(i32, i32)> {
        match self {
            BotAction::Up => Some((0, -1)),
            BotAction::Down => Some((0, 1)),
            BotAction::Left => Some((-1, 0)),
            BotAction::Right => Some((1, 0)),
            BotAction::None | BotAction::UseItem => None,
        }
    }

    /// True for the four directional moves.
    #[inline]
    pub fn is_move(self) -> bool {
        self.offset().is_some()
    }

    /// The opposite direction; non-movement actions map to themselves.
    pub fn reversed(self) -> BotAction {
        match self {
            BotAction::Up => BotAction::Down,
            BotAction::Down => BotAction::Up,
            BotAction::Left => BotAction::Right,
            BotAction::Right => BotAction::Left,
            other => other,
        }
    }

    /// Dense index used by per-action statistic tables.
    #[inline]
    pub fn index(self) -> usize {
        self.to_wire() as usize
    }

    pub fn to_wire(self) -> i32 {
        match self {
            BotAction::None => 0,
            BotAction::Up => 1,
            BotAction::Down => 2,
            BotAction::Left => 3,
            BotAction::Right => 4,
            BotAction::UseItem => 5,
        }
    }

    pub fn from_wire(value: i32) -> Option<BotAction> {
        match value {
            0 => Some(BotAction::None),
            1 => Some(BotAction::Up),
            2 => Some(BotAction::Down),
            3 => Some(BotAction::Left),
            4 => Some(BotAction::Right),
            5 => Some(BotAction::UseItem),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        for v in 0..6 {
            let action = BotAction::from_wire(v).unwrap();
            assert_eq!(action.to_wire(), v);
            assert_eq!(action.index(), v as usize);
        }
        assert_eq!(BotAction::from_wire(6), None);
        assert_eq!(BotAction::from_wire(-1), None);
    }

    #[test]
    fn test_offsets() {
        assert_eq!(BotAction::Up.offset(), Some((0, -1)));
        assert_eq!(BotAction::Down.offset(), Some((0, 1)));
        assert_eq!(BotAction::UseItem.offset(), None);
        assert!(!BotAction::None.is_move());
    }

    #[test]
    fn test_reversed() {
        assert_eq!(BotAction::Left.reversed(), BotAction::Right);
        assert_eq!(BotAction::Up.reversed(), BotAction::Down);
        assert_eq!(BotAction::UseItem.reversed(), BotAction::UseItem);
    }
}
