// Fleetmap station discovery engine
// Contains code derived from the Catenary Transit Initiatives backend (AGPL-3.0)
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Station discovery and reliability engine for the fleet dashboard map.
//!
//! Turns a pannable viewport plus free-text search into the deduplicated list
//! of charging and swap stations to draw, resolves map clicks, builds the
//! coverage heatmap polygons and derives uptime from status change logs.

#[macro_use]
extern crate serde;

pub mod config;
pub mod dataset;
pub mod density;
pub mod explorer;
pub mod geo_mapper;
pub mod models;
pub mod reliability;
pub mod selection;
pub mod services;
pub mod viewport;

pub use config::EngineConfig;
pub use explorer::StationExplorer;
