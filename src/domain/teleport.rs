/// Teleport registry: group id → the one destination tile of that group.

use thiserror::Error;

use super::tile::{TileId, TELEPORT_GROUPS};

/// A second destination was registered for a group that already has one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("teleport group {group}: destination already registered (tile {existing}), tile {rejected} ignored")]
pub struct TeleportConflict {
    pub group: u8,
    pub existing: TileId,
    pub rejected: TileId,
}

#[derive(Clone, Debug, Default)]
pub struct TeleportRegistry {
    destinations: [Option<TileId>; TELEPORT_GROUPS],
}

impl TeleportRegistry {
    pub fn new() -> Self {
        TeleportRegistry::default()
    }

    /// Register `tile` as the destination of `group`. First registration
    /// wins; later ones are rejected and leave the registry unchanged.
    /// Groups outside 0..=9 are never registered.
    pub fn register(&mut self, group: u8, tile: TileId) -> Result<(), TeleportConflict> {
        let Some(slot) = self.destinations.get_mut(group as usize) else {
            return Ok(());
        };
        match *slot {
            Some(existing) => Err(TeleportConflict { group, existing, rejected: tile }),
            None => {
                *slot = Some(tile);
                Ok(())
            }
        }
    }

    pub fn destination(&self, group: u8) -> Option<TileId> {
        self.destinations.get(group as usize).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_has_no_destinations() {
        let r = TeleportRegistry::new();
        for g in 0..TELEPORT_GROUPS as u8 {
            assert_eq!(r.destination(g), None);
        }
    }

    #[test]
    fn first_destination_wins() {
        let mut r = TeleportRegistry::new();
        assert_eq!(r.register(3, 7), Ok(()));
        assert_eq!(
            r.register(3, 9),
            Err(TeleportConflict { group: 3, existing: 7, rejected: 9 })
        );
        assert_eq!(r.destination(3), Some(7));
    }

    #[test]
    fn groups_are_independent() {
        let mut r = TeleportRegistry::new();
        r.register(0, 1).unwrap();
        r.register(9, 2).unwrap();
        assert_eq!(r.destination(0), Some(1));
        assert_eq!(r.destination(9), Some(2));
        assert_eq!(r.destination(5), None);
    }

    #[test]
    fn out_of_range_group_is_ignored() {
        let mut r = TeleportRegistry::new();
        assert_eq!(r.register(42, 1), Ok(()));
        assert_eq!(r.destination(42), None);
    }
}
