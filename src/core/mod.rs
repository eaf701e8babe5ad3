pub mod capabilities;
pub mod discovery;
pub mod fragments;
pub mod graph;
pub mod ledger;
pub mod lint;
pub mod progression;
pub mod resolution;
pub mod sessions;
pub mod store;
