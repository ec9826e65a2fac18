//! Map engines: attack pathfinding, territory growth and placement rules

pub mod pathfinding;
pub mod placement;
pub mod territory;

pub use pathfinding::{find_path, path_cost, tile_cost};
pub use placement::{can_place_city, can_place_structure, place_city, place_structure};
pub use territory::{expand_all, expand_ring, start_expansion, ExpansionState, RingOutcome, TileClaim};
