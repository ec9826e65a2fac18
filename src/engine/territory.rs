//! Territory expansion - ring-by-ring flood fill from newly built cities
//!
//! Each unexpanded city seeds a frontier with its own tile. Every ring grows
//! each frontier by one hex step: unowned grass is claimed, the player's own
//! tiles are walked through, and anything owned by another player is a wall
//! (first claim wins). Rings are driven one at a time by the session so
//! clients can animate growth between them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::types::PlayerId;
use crate::hex::TileCoord;
use crate::state::SessionState;

/// A single tile claimed during expansion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileClaim {
    pub player_id: PlayerId,
    pub tile: TileCoord,
}

/// Growth state of one city
#[derive(Debug, Clone)]
struct CityFrontier {
    player: PlayerId,
    /// Rings this city may grow: min(radius, max rings)
    ring_limit: u32,
    frontier: BTreeSet<TileCoord>,
    visited: BTreeSet<TileCoord>,
}

/// An expansion in progress
#[derive(Debug, Clone)]
pub struct ExpansionState {
    ring: u32,
    max_ring: u32,
    frontiers: Vec<CityFrontier>,
}

impl ExpansionState {
    /// Rings processed so far
    pub fn ring(&self) -> u32 {
        self.ring
    }

    pub fn max_ring(&self) -> u32 {
        self.max_ring
    }

    /// Stop growing every city of `player`
    pub fn forget(&mut self, player: &PlayerId) {
        self.frontiers.retain(|f| &f.player != player);
    }

    /// True when no frontier can grow any further
    pub fn is_complete(&self) -> bool {
        self.ring >= self.max_ring
            || self
                .frontiers
                .iter()
                .all(|f| f.frontier.is_empty() || self.ring >= f.ring_limit)
    }
}

/// Result of processing one ring
#[derive(Debug, Clone, PartialEq)]
pub struct RingOutcome {
    pub ring: u32,
    pub max_ring: u32,
    pub claims: Vec<TileClaim>,
    pub complete: bool,
}

/// Seed frontiers for every city not yet expanded and mark them expanded
///
/// Cities are taken in player-id order, then build order.
pub fn start_expansion(state: &mut SessionState, max_rings: u32) -> ExpansionState {
    let mut frontiers = Vec::new();
    for player in state.players.values_mut() {
        for city in player.cities.iter_mut().filter(|c| !c.expanded) {
            city.expanded = true;
            frontiers.push(CityFrontier {
                player: player.id.clone(),
                ring_limit: city.radius.min(max_rings),
                frontier: BTreeSet::from([city.tile]),
                visited: BTreeSet::from([city.tile]),
            });
        }
    }

    tracing::debug!(
        "Expansion started in session {} for {} cities",
        state.id,
        frontiers.len()
    );

    ExpansionState {
        ring: 0,
        max_ring: max_rings,
        frontiers,
    }
}

/// Grow every frontier by one ring, claiming tiles in `state`
pub fn expand_ring(state: &mut SessionState, expansion: &mut ExpansionState) -> RingOutcome {
    if expansion.is_complete() {
        return RingOutcome {
            ring: expansion.ring,
            max_ring: expansion.max_ring,
            claims: Vec::new(),
            complete: true,
        };
    }

    expansion.ring += 1;
    let ring = expansion.ring;
    let mut claims = Vec::new();

    // Taken out so claims can borrow the state mutably; restored below
    let Some(map) = state.map.take() else {
        expansion.frontiers.clear();
        return RingOutcome {
            ring,
            max_ring: expansion.max_ring,
            claims,
            complete: true,
        };
    };

    for city in expansion.frontiers.iter_mut() {
        if ring > city.ring_limit || !state.players.contains_key(&city.player) {
            city.frontier.clear();
            continue;
        }

        let mut next = BTreeSet::new();
        for tile in std::mem::take(&mut city.frontier) {
            for candidate in tile.neighbors() {
                if !city.visited.insert(candidate) {
                    continue;
                }
                if !map.is_valid_tile(candidate) {
                    continue;
                }

                match state.owner_of(candidate) {
                    None => {
                        state.claim_tile(candidate, &city.player);
                        claims.push(TileClaim {
                            player_id: city.player.clone(),
                            tile: candidate,
                        });
                        next.insert(candidate);
                    }
                    Some(owner) if *owner == city.player => {
                        next.insert(candidate);
                    }
                    Some(_) => {}
                }
            }
        }
        city.frontier = next;
    }
    state.map = Some(map);

    let complete = expansion.is_complete();
    tracing::debug!(
        "Session {} ring {}/{}: {} tiles claimed",
        state.id,
        ring,
        expansion.max_ring,
        claims.len()
    );

    RingOutcome {
        ring,
        max_ring: expansion.max_ring,
        claims,
        complete,
    }
}

/// Run every ring back to back (no pacing)
pub fn expand_all(state: &mut SessionState, max_rings: u32) -> Vec<RingOutcome> {
    let mut expansion = start_expansion(state, max_rings);
    let mut outcomes = Vec::new();
    while !expansion.is_complete() {
        outcomes.push(expand_ring(state, &mut expansion));
    }
    outcomes
}
