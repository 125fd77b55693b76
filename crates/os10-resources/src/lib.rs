//! Configuration-domain resource tables for the OS10 reconciliation engine.
//!
//! Each module binds one configuration domain to the generic engine in
//! `os10-reconcile`: a key type implementing
//! [`Resource`](os10_reconcile::Resource), a static attribute descriptor
//! table, and the extraction glue that turns a parsed show tree into the
//! domain's current-state snapshot. The modules carry no diff or emission
//! logic of their own; the command grammar lives entirely in the
//! descriptor tables.

pub mod bgp;
pub mod bgp_af;
pub mod bgp_neighbor;
pub mod bgp_neighbor_af;
pub mod image_upgrade;
pub mod interface;
pub mod lldp;
pub mod lldp_interface;
pub mod monitor;
pub mod ntp_server;
pub mod privilege;
pub mod route;
pub mod snmp;
pub mod user;

mod validators;
