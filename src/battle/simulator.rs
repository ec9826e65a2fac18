//! Fixed-tick battle simulation
//!
//! Each tick runs in a fixed order: move every unit, then structures fire
//! (ascending id), then units fire back, then the dead and the destroyed are
//! removed, then survivors standing on their final tile are reported as
//! having reached their target. Results depend only on speeds, intervals and
//! positions, never on wall-clock timing.

use serde::{Deserialize, Serialize};

use crate::battle::constants::COOLDOWN_EPSILON;
use crate::battle::units::BattleUnit;
use crate::cards::CardCatalog;
use crate::core::types::{CardId, PlayerId, StructureId, UnitId};
use crate::hex::TileCoord;
use crate::state::{SessionState, Structure};

/// A structure shot at a unit during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerShot {
    pub structure_id: StructureId,
    pub unit_id: UnitId,
    pub from: TileCoord,
    pub to: TileCoord,
    pub damage: f32,
}

/// A unit that walked all the way to its target city
#[derive(Debug, Clone, PartialEq)]
pub struct Arrival {
    pub unit_id: UnitId,
    pub owner: PlayerId,
    pub target_city: TileCoord,
    pub city_damage: u32,
}

/// A unit killed this tick
#[derive(Debug, Clone, PartialEq)]
pub struct Casualty {
    pub unit_id: UnitId,
    pub owner: PlayerId,
}

/// Everything that happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub shots: Vec<TowerShot>,
    pub casualties: Vec<Casualty>,
    pub destroyed: Vec<Structure>,
    pub arrivals: Vec<Arrival>,
}

/// Running totals for one player's attack this turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleTally {
    pub reached: u32,
    pub lost: u32,
    pub city_damage: u32,
}

/// Spawn one unit per queued army card at the start of the player's plan
///
/// Cards missing from the catalog or without unit stats are skipped. The
/// queued army is consumed. Returns the number of units spawned.
pub fn spawn_army(state: &mut SessionState, player_id: &PlayerId, catalog: &dyn CardCatalog) -> usize {
    let Some(player) = state.players.get_mut(player_id) else {
        return 0;
    };
    let Some(plan) = player.battle_plan.clone() else {
        return 0;
    };
    let army: Vec<CardId> = std::mem::take(&mut player.queued_army);

    let mut spawned = 0;
    for card_id in army {
        let Some(card) = catalog.lookup(&card_id) else {
            tracing::warn!("Skipping unknown card {} in {}'s army", card_id, player_id);
            continue;
        };
        let Some(stats) = card.unit_stats() else {
            continue;
        };
        let id = state.allocate_unit_id();
        state.battle_units.push(BattleUnit::new(
            id,
            player_id.clone(),
            card_id,
            stats,
            plan.path.clone(),
            plan.target_city,
        ));
        spawned += 1;
    }
    spawned
}

/// Advance every unit and structure by one tick of `dt` seconds
pub fn step(units: &mut Vec<BattleUnit>, structures: &mut Vec<Structure>, dt: f32) -> StepOutcome {
    let mut outcome = StepOutcome::default();

    // 1. Movement
    for unit in units.iter_mut() {
        unit.advance(dt);
    }

    // 2. Structure fire, ascending id
    let mut order: Vec<usize> = (0..structures.len()).collect();
    order.sort_by_key(|&i| structures[i].id);
    for i in order.iter().copied() {
        let structure = &mut structures[i];
        if structure.is_destroyed() || !structure.is_armed() {
            continue;
        }
        structure.cooldown = (structure.cooldown - dt).max(0.0);
        if structure.cooldown > COOLDOWN_EPSILON {
            continue;
        }

        let target = units.iter_mut().find(|u| {
            u.is_alive()
                && u.owner != structure.owner
                && u.tile().hex_distance(&structure.tile) <= structure.range
        });
        if let Some(unit) = target {
            unit.health -= structure.damage;
            structure.cooldown = structure.attack_interval;
            outcome.shots.push(TowerShot {
                structure_id: structure.id,
                unit_id: unit.id,
                from: structure.tile,
                to: unit.tile(),
                damage: structure.damage,
            });
        }
    }

    // 3. Unit fire against structures
    for unit in units.iter_mut() {
        if !unit.is_alive() || unit.damage <= 0.0 {
            continue;
        }
        unit.cooldown = (unit.cooldown - dt).max(0.0);
        if unit.cooldown > COOLDOWN_EPSILON {
            continue;
        }
        let here = unit.tile();
        let target = order.iter().copied().find(|&i| {
            let s = &structures[i];
            !s.is_destroyed() && s.owner != unit.owner && here.hex_distance(&s.tile) <= unit.range
        });
        if let Some(i) = target {
            structures[i].health -= unit.damage;
            unit.cooldown = unit.attack_interval;
        }
    }

    // 4. Remove the dead and the destroyed
    units.retain(|u| {
        if u.is_alive() {
            return true;
        }
        outcome.casualties.push(Casualty {
            unit_id: u.id,
            owner: u.owner.clone(),
        });
        false
    });
    let (destroyed, standing): (Vec<_>, Vec<_>) =
        std::mem::take(structures).into_iter().partition(|s| s.is_destroyed());
    *structures = standing;
    outcome.destroyed = destroyed;
    outcome.destroyed.sort_by_key(|s| s.id);

    // 5. Survivors at the end of their path reach the target
    units.retain(|u| {
        if !u.is_at_end() {
            return true;
        }
        outcome.arrivals.push(Arrival {
            unit_id: u.id,
            owner: u.owner.clone(),
            target_city: u.target_city,
            city_damage: u.city_damage,
        });
        false
    });

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{StaticCatalog, UnitStats};
    use crate::core::types::SessionId;
    use crate::state::BattlePlan;

    const DT: f32 = 0.1;

    fn row(len: i32) -> Vec<TileCoord> {
        (0..len).map(|x| TileCoord::new(x, 2)).collect()
    }

    fn unit(id: u32, owner: &str, speed: f32, health: f32, path: Vec<TileCoord>) -> BattleUnit {
        let target = *path.last().unwrap();
        BattleUnit::new(
            UnitId(id),
            PlayerId::new(owner),
            CardId::new("militia"),
            &UnitStats {
                health,
                speed,
                damage: 0.0,
                range: 1,
                attack_interval: 1.0,
                city_damage: 3,
            },
            path,
            target,
        )
    }

    fn tower(id: u32, owner: &str, tile: TileCoord, damage: f32, range: u32) -> Structure {
        Structure {
            id: StructureId(id),
            owner: PlayerId::new(owner),
            tile,
            card_id: CardId::new("archer_tower"),
            health: 20.0,
            max_health: 20.0,
            damage,
            range,
            attack_interval: 1.0,
            cooldown: 0.0,
            reusable: true,
        }
    }

    fn run_until_empty(
        units: &mut Vec<BattleUnit>,
        structures: &mut Vec<Structure>,
        max_ticks: u32,
    ) -> (u32, Vec<StepOutcome>) {
        let mut outcomes = Vec::new();
        for tick in 1..=max_ticks {
            outcomes.push(step(units, structures, DT));
            if units.is_empty() {
                return (tick, outcomes);
            }
        }
        (max_ticks, outcomes)
    }

    #[test]
    fn test_unopposed_unit_arrives_in_exactly_100_ticks() {
        // 0.1 tiles per tick over ten edges
        let mut units = vec![unit(1, "a", 1.0, 10.0, row(11))];
        let mut structures = Vec::new();

        let (ticks, outcomes) = run_until_empty(&mut units, &mut structures, 500);

        assert_eq!(ticks, 100);
        let arrivals: Vec<_> = outcomes.iter().flat_map(|o| o.arrivals.iter()).collect();
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].unit_id, UnitId(1));
        assert_eq!(arrivals[0].city_damage, 3);
        assert!(outcomes[..99].iter().all(|o| o.arrivals.is_empty()));
    }

    #[test]
    fn test_unit_killed_mid_path_never_reaches() {
        let path = row(11);
        let mut units = vec![unit(1, "a", 1.0, 5.0, path.clone())];
        let mut structures = vec![tower(1, "b", TileCoord::new(4, 1), 3.0, 2)];

        let (_, outcomes) = run_until_empty(&mut units, &mut structures, 500);

        assert!(units.is_empty());
        assert!(outcomes.iter().all(|o| o.arrivals.is_empty()));
        let casualties: Vec<_> = outcomes.iter().flat_map(|o| o.casualties.iter()).collect();
        assert_eq!(casualties.len(), 1);
        assert_eq!(casualties[0].unit_id, UnitId(1));
        let shots: usize = outcomes.iter().map(|o| o.shots.len()).sum();
        assert_eq!(shots, 2);
    }

    #[test]
    fn test_structure_ignores_own_units() {
        let mut units = vec![unit(1, "a", 1.0, 5.0, row(4))];
        let mut structures = vec![tower(1, "a", TileCoord::new(1, 2), 10.0, 2)];
        let (_, outcomes) = run_until_empty(&mut units, &mut structures, 100);
        assert!(outcomes.iter().all(|o| o.shots.is_empty()));
        assert_eq!(
            outcomes.iter().map(|o| o.arrivals.len()).sum::<usize>(),
            1
        );
    }

    #[test]
    fn test_structure_cooldown_limits_fire_rate() {
        // Stand still in range for 2 seconds: fires at t=0.1 and again one interval later
        let tile = TileCoord::new(0, 0);
        let mut units = vec![unit(1, "a", 0.01, 100.0, vec![tile, TileCoord::new(1, 0)])];
        let mut structures = vec![tower(1, "b", TileCoord::new(0, 1), 1.0, 1)];
        let mut shots = 0;
        for _ in 0..20 {
            shots += step(&mut units, &mut structures, DT).shots.len();
        }
        assert_eq!(shots, 2);
    }

    #[test]
    fn test_fire_order_by_structure_id() {
        let tile = TileCoord::new(3, 3);
        let mut units = vec![unit(1, "a", 0.01, 100.0, vec![tile, TileCoord::new(4, 3)])];
        let mut structures = vec![
            tower(7, "b", TileCoord::new(3, 4), 1.0, 1),
            tower(2, "b", TileCoord::new(3, 2), 1.0, 1),
        ];
        let outcome = step(&mut units, &mut structures, DT);
        let ids: Vec<_> = outcome.shots.iter().map(|s| s.structure_id).collect();
        assert_eq!(ids, vec![StructureId(2), StructureId(7)]);
    }

    #[test]
    fn test_units_destroy_structures() {
        let mut attacker = unit(1, "a", 0.01, 100.0, vec![TileCoord::new(0, 0), TileCoord::new(1, 0)]);
        attacker.damage = 25.0;
        let mut units = vec![attacker];
        let mut structures = vec![tower(1, "b", TileCoord::new(0, 1), 0.0, 1)];

        let outcome = step(&mut units, &mut structures, DT);
        assert!(structures.is_empty());
        assert_eq!(outcome.destroyed.len(), 1);
        assert_eq!(outcome.destroyed[0].id, StructureId(1));
    }

    #[test]
    fn test_spawn_army_consumes_queue() {
        let catalog = StaticCatalog::with_defaults();
        let config = crate::core::config::GameConfig::default();
        let mut state = SessionState::new(SessionId::new("s"));
        let a = PlayerId::new("a");
        let mut player = crate::state::Player::new(
            a.clone(),
            "A".into(),
            crate::core::types::PlayerColor::Red,
            crate::cards::DeckRuntime::default(),
            &config,
        );
        player.queued_army = vec![
            CardId::new("militia"),
            CardId::new("knight"),
            CardId::new("no_such_card"),
        ];
        player.battle_plan = Some(BattlePlan {
            source_city: TileCoord::new(0, 2),
            target_city: TileCoord::new(5, 2),
            path: row(6),
        });
        state.players.insert(a.clone(), player);

        assert_eq!(spawn_army(&mut state, &a, &catalog), 2);
        assert!(state.players[&a].queued_army.is_empty());
        assert_eq!(state.battle_units.len(), 2);
        assert_ne!(state.battle_units[0].id, state.battle_units[1].id);
        assert!(state
            .battle_units
            .iter()
            .all(|u| u.tile() == TileCoord::new(0, 2) && u.target_city == TileCoord::new(5, 2)));
    }
}
