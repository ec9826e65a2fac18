//! A* pathfinding for attack routes
//!
//! Movement cost is terrain- and ownership-aware: enemy structures cost their
//! current health (the damage needed to break through).

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::core::types::PlayerId;
use crate::hex::TileCoord;
use crate::state::SessionState;

/// Cost of entering a tile owned by another player with no structure on it
pub const ENEMY_TILE_COST: f32 = 2.0;

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    coord: TileCoord,
    g_cost: f32,
    f_cost: OrderedFloat<f32>, // g_cost + heuristic
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.coord == other.coord
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; coordinate breaks f ties deterministically
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cost for `player` to enter `tile`
///
/// - out of bounds / water / mountain: infinite
/// - enemy structure: its current health
/// - friendly structure, unclaimed or own tile: 1
/// - another player's tile: 2
pub fn tile_cost(state: &SessionState, tile: TileCoord, player: &PlayerId) -> f32 {
    let Some(map) = state.map.as_ref() else {
        return f32::INFINITY;
    };
    if !map.is_valid_tile(tile) {
        return f32::INFINITY;
    }

    if let Some(structure) = state.structure_at(tile) {
        if &structure.owner == player {
            return 1.0;
        }
        return structure.health.max(1.0);
    }

    match state.owner_of(tile) {
        Some(owner) if owner != player => ENEMY_TILE_COST,
        _ => 1.0,
    }
}

/// Find the cheapest route from `source` to `target` for `player`
///
/// Returns the ordered tile list including both ends, or None if the target is
/// cut off by terrain. The caller treats None as a validation failure.
pub fn find_path(
    state: &SessionState,
    source: TileCoord,
    target: TileCoord,
    player: &PlayerId,
) -> Option<Vec<TileCoord>> {
    let map = state.map.as_ref()?;
    if !map.in_bounds(source) || !map.is_valid_tile(target) {
        return None;
    }
    if source == target {
        return Some(vec![source]);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<TileCoord, TileCoord> = HashMap::new();
    let mut g_scores: HashMap<TileCoord, f32> = HashMap::new();

    g_scores.insert(source, 0.0);
    open_set.push(PathNode {
        coord: source,
        g_cost: 0.0,
        f_cost: OrderedFloat(source.manhattan(&target) as f32),
    });

    while let Some(current) = open_set.pop() {
        if current.coord == target {
            return Some(reconstruct_path(&came_from, current.coord));
        }

        // Skip stale heap entries
        let best_g = *g_scores.get(&current.coord).unwrap_or(&f32::INFINITY);
        if current.g_cost > best_g {
            continue;
        }

        for neighbor in current.coord.neighbors() {
            let move_cost = tile_cost(state, neighbor, player);
            if move_cost.is_infinite() {
                continue;
            }

            let tentative_g = current.g_cost + move_cost;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);

                let f_cost = tentative_g + neighbor.manhattan(&target) as f32;
                open_set.push(PathNode {
                    coord: neighbor,
                    g_cost: tentative_g,
                    f_cost: OrderedFloat(f_cost),
                });
            }
        }
    }

    None // No path found
}

/// Reconstruct path from came_from map
fn reconstruct_path(
    came_from: &HashMap<TileCoord, TileCoord>,
    mut current: TileCoord,
) -> Vec<TileCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Sum of entry costs along a path (the first tile is free)
pub fn path_cost(state: &SessionState, path: &[TileCoord], player: &PlayerId) -> f32 {
    path.iter()
        .skip(1)
        .map(|tile| tile_cost(state, *tile, player))
        .sum()
}
