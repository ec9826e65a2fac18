//! Integration tests for a full match turn
//!
//! Drives a two-player session through all seven steps:
//! build city -> buy cards -> expansion -> structures -> army -> target -> battle
//! and into the next turn. Timers are fired by hand, in the order the actor
//! would fire them.

use std::collections::HashMap;
use std::sync::Arc;

use hex_dominion::cards::{DefaultDecks, StaticCatalog};
use hex_dominion::core::config::GameConfig;
use hex_dominion::core::types::{CardId, ConnectionId, PlayerId, SessionId};
use hex_dominion::hex::{TileCoord, TileType};
use hex_dominion::session::{
    ClientMessage, Connection, ServerMessage, Session, SessionCommand, TimerKey, TimerRequest,
};
use hex_dominion::state::TurnStep;
use tokio::sync::mpsc::UnboundedReceiver;

// ============================================================================
// Table: a session with hand-fired timers
// ============================================================================

struct Table {
    session: Session,
    timers: Vec<TimerKey>,
    seats: HashMap<PlayerId, (ConnectionId, UnboundedReceiver<ServerMessage>)>,
}

impl Table {
    fn new() -> Self {
        let catalog = StaticCatalog::with_defaults();
        let decks = DefaultDecks::from_catalog(&catalog);
        let config = GameConfig {
            seed: Some(11),
            ..GameConfig::default()
        };
        Self {
            session: Session::new(
                SessionId::new("table"),
                Arc::new(config),
                Arc::new(catalog),
                Arc::new(decks),
            ),
            timers: Vec::new(),
            seats: HashMap::new(),
        }
    }

    fn sync(&mut self) {
        for request in self.session.drain_timer_requests() {
            match request {
                TimerRequest::Start { key, .. } => {
                    self.timers.retain(|k| k != &key);
                    self.timers.push(key);
                }
                TimerRequest::Cancel(key) => self.timers.retain(|k| k != &key),
            }
        }
    }

    fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Join {
                player_id,
                display_name,
                connection,
            } => self.session.join(player_id, display_name, connection),
            SessionCommand::Message {
                connection_id,
                message,
            } => self.session.handle_message(connection_id, message),
            SessionCommand::Disconnected { connection_id } => {
                self.session.disconnect(connection_id)
            }
        }
        self.sync();
    }

    fn join(&mut self, name: &str) -> PlayerId {
        let player_id = PlayerId::new(name);
        let (connection, rx) = Connection::channel();
        self.seats.insert(player_id.clone(), (connection.id(), rx));
        self.apply(SessionCommand::Join {
            player_id: player_id.clone(),
            display_name: name.to_string(),
            connection,
        });
        player_id
    }

    fn send(&mut self, player_id: &PlayerId, message: ClientMessage) {
        let connection_id = self.seats[player_id].0;
        self.apply(SessionCommand::Message {
            connection_id,
            message,
        });
    }

    fn ready(&mut self, player_id: &PlayerId) {
        let step = self.session.state.turn_step;
        self.send(
            player_id,
            ClientMessage::Ready {
                session_id: SessionId::new("table"),
                player_id: player_id.clone(),
                step,
            },
        );
    }

    fn fire(&mut self, matches: impl Fn(&TimerKey) -> bool) -> bool {
        let Some(index) = self.timers.iter().position(|k| matches(k)) else {
            return false;
        };
        let key = self.timers.remove(index);
        self.session.handle_timer(key);
        self.sync();
        true
    }

    fn drain(&mut self, player_id: &PlayerId) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        if let Some((_, rx)) = self.seats.get_mut(player_id) {
            while let Ok(message) = rx.try_recv() {
                messages.push(message);
            }
        }
        messages
    }

    fn step(&self) -> TurnStep {
        self.session.state.turn_step
    }
}

fn grass(width: usize, height: usize) -> Vec<Vec<TileType>> {
    vec![vec![TileType::Grass; width]; height]
}

fn sid() -> SessionId {
    SessionId::new("table")
}

// ============================================================================
// Full turn
// ============================================================================

/// Integration test: one complete turn and the start of the next
///
/// 1. Both players found capitals
/// 2. Alice buys a card from her hand
/// 3. Expansion claims disjoint territory
/// 4. Bob raises a tower inside his territory
/// 5. Alice queues two militia and targets Bob's capital
/// 6. The battle resolves and the turn wraps with income collected
#[test]
fn test_full_turn_cycle() {
    let mut table = Table::new();
    let alice = table.join("alice");
    let bob = table.join("bob");

    table.send(
        &alice,
        ClientMessage::StartMatch {
            session_id: sid(),
            map_data: Some(grass(12, 8)),
            match_id: Some("match-1".into()),
        },
    );
    assert_eq!(table.session.state.turn_number, 1);
    assert_eq!(table.step(), TurnStep::BuildCity);

    // Step 0: capitals
    for (player, tile) in [(&alice, TileCoord::new(2, 3)), (&bob, TileCoord::new(9, 3))] {
        table.send(
            player,
            ClientMessage::BuildCity {
                session_id: sid(),
                player_id: player.clone(),
                tile,
                city_type: None,
            },
        );
    }
    let config = table.session.config().clone();
    for player in [&alice, &bob] {
        let p = &table.session.state.players[player];
        assert_eq!(p.cities.len(), 1);
        assert!(p.cities[0].is_capital());
        assert_eq!(
            p.resources.production,
            config.starting_production - config.city_cost
        );
    }
    table.ready(&alice);
    assert_eq!(table.step(), TurnStep::BuildCity);
    table.ready(&bob);
    assert_eq!(table.step(), TurnStep::BuyCards);

    // Step 1: buy the cheapest affordable card in hand
    let hand = table.session.state.players[&alice].hand.clone();
    assert_eq!(hand.len(), config.hand_size);
    let catalog = StaticCatalog::with_defaults();
    let bought = hand
        .iter()
        .min_by_key(|id| catalog.get(id).map(|c| c.cost).unwrap_or(u32::MAX))
        .cloned()
        .unwrap();
    let cost = catalog.get(&bought).unwrap().cost;
    table.send(
        &alice,
        ClientMessage::BuyCard {
            session_id: sid(),
            player_id: alice.clone(),
            card: bought.clone(),
        },
    );
    let a = &table.session.state.players[&alice];
    assert_eq!(a.inventory.count(&bought), 1);
    assert_eq!(a.resources.gold, config.starting_gold - cost);
    assert_eq!(a.hand.len(), config.hand_size - 1);

    table.ready(&alice);
    table.ready(&bob);
    assert_eq!(table.step(), TurnStep::ExpandTerritory);

    // Step 2: rings until expansion completes and the step auto-advances
    let mut rings = 0;
    while table.fire(|k| matches!(k, TimerKey::ExpansionRing { .. })) {
        rings += 1;
    }
    assert!(rings >= 1);
    assert_eq!(table.step(), TurnStep::PlaceStructures);
    let alice_land = table.session.state.territory_of(&alice).to_vec();
    let bob_land = table.session.state.territory_of(&bob).to_vec();
    assert!(alice_land.len() > 1);
    assert!(bob_land.len() > 1);
    assert!(alice_land.iter().all(|t| !bob_land.contains(t)));

    // Step 3: Bob raises a tower next to his capital
    if let Some(p) = table.session.state.players.get_mut(&bob) {
        p.inventory.add(CardId::new("archer_tower"));
    }
    let tower_tile = TileCoord::new(9, 5);
    assert!(bob_land.contains(&tower_tile));
    table.send(
        &bob,
        ClientMessage::BuildStructure {
            session_id: sid(),
            player_id: bob.clone(),
            structure: CardId::new("archer_tower"),
            tile: tower_tile,
        },
    );
    assert_eq!(table.session.state.structures.len(), 1);
    assert!(table
        .drain(&alice)
        .iter()
        .any(|m| matches!(m, ServerMessage::StructureBuilt { player_id, .. } if *player_id == bob)));
    table.ready(&alice);
    table.ready(&bob);
    assert_eq!(table.step(), TurnStep::QueueArmy);

    // Step 4: Alice queues two militia
    if let Some(p) = table.session.state.players.get_mut(&alice) {
        p.inventory.add(CardId::new("militia"));
        p.inventory.add(CardId::new("militia"));
    }
    let militia_before = table.session.state.players[&alice]
        .inventory
        .count(&CardId::new("militia"));
    table.send(
        &alice,
        ClientMessage::QueueArmy {
            session_id: sid(),
            player_id: alice.clone(),
            selected_cards: vec![CardId::new("militia"), CardId::new("militia")],
        },
    );
    let a = &table.session.state.players[&alice];
    assert_eq!(a.queued_army.len(), 2);
    assert_eq!(a.inventory.count(&CardId::new("militia")), militia_before - 2);
    table.ready(&alice);
    table.ready(&bob);
    assert_eq!(table.step(), TurnStep::SelectTarget);

    // Step 5: target Bob's capital
    table.send(
        &alice,
        ClientMessage::SelectTarget {
            session_id: sid(),
            player_id: alice.clone(),
            source_city: TileCoord::new(2, 3),
            target_city: TileCoord::new(9, 3),
        },
    );
    let plan = table.session.state.players[&alice]
        .battle_plan
        .clone()
        .unwrap();
    assert_eq!(plan.path.first(), Some(&TileCoord::new(2, 3)));
    assert_eq!(plan.path.last(), Some(&TileCoord::new(9, 3)));
    table.ready(&alice);
    table.ready(&bob);
    assert_eq!(table.step(), TurnStep::Battle);
    assert_eq!(table.session.state.battle_units.len(), 2);

    // Step 6: Bob has nothing to do; the battle runs to completion
    assert!(table.fire(|k| matches!(
        k,
        TimerKey::AutoReady {
            step: TurnStep::Battle,
            ..
        }
    )));
    let mut ticks = 0;
    while table.fire(|k| matches!(k, TimerKey::BattleTick { .. })) {
        ticks += 1;
    }
    assert!(ticks > 0);

    let messages = table.drain(&bob);
    let tally = messages
        .iter()
        .find_map(|m| match m {
            ServerMessage::BattleFinished { tally, .. } => Some(*tally),
            _ => None,
        })
        .unwrap();
    assert_eq!(tally.reached + tally.lost, 2);
    let capital = &table.session.state.players[&bob].cities[0];
    assert_eq!(capital.health, capital.max_health - tally.city_damage);

    // Next turn: income collected, fresh hands
    assert_eq!(table.session.state.turn_number, 2);
    assert_eq!(table.step(), TurnStep::BuildCity);
    assert!(table.session.state.battle_units.is_empty());
    let a = &table.session.state.players[&alice];
    assert!(a.queued_army.is_empty());
    assert!(a.battle_plan.is_none());
    assert_eq!(
        a.resources.production,
        config.starting_production - config.city_cost + config.capital_income
    );
    assert_eq!(
        a.resources.gold,
        config.starting_gold - cost + config.gold_per_turn + config.gold_per_city
    );
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::PhaseChanged { turn_number: 2, .. })));
}

/// Readiness only counts connected players: a disconnected opponent does not
/// block the step
#[test]
fn test_disconnected_player_does_not_block_advance() {
    let mut table = Table::new();
    let alice = table.join("alice");
    let bob = table.join("bob");
    table.send(
        &alice,
        ClientMessage::StartMatch {
            session_id: sid(),
            map_data: Some(grass(8, 8)),
            match_id: None,
        },
    );

    table.ready(&alice);
    assert_eq!(table.step(), TurnStep::BuildCity);

    let bob_connection = table.seats[&bob].0;
    table.apply(SessionCommand::Disconnected {
        connection_id: bob_connection,
    });
    assert_eq!(table.step(), TurnStep::BuyCards);
    assert!(table
        .timers
        .iter()
        .any(|k| matches!(k, TimerKey::DisconnectGrace(p) if *p == bob)));
}

/// A ready for a step that has already passed is ignored
#[test]
fn test_stale_ready_ignored() {
    let mut table = Table::new();
    let alice = table.join("alice");
    table.send(
        &alice,
        ClientMessage::StartMatch {
            session_id: sid(),
            map_data: Some(grass(8, 8)),
            match_id: None,
        },
    );
    table.ready(&alice);
    assert_eq!(table.step(), TurnStep::BuyCards);

    table.send(
        &alice,
        ClientMessage::Ready {
            session_id: sid(),
            player_id: alice.clone(),
            step: TurnStep::BuildCity,
        },
    );
    assert_eq!(table.step(), TurnStep::BuyCards);
    assert!(!table.session.state.players[&alice].ready);
}
