//! Paradox Engine: story traversal and choice effects for branching
//! narrative games.
//!
//! Stories are graphs of nodes authored in RON. Players move through them by
//! picking choices; each choice fires an effect bundle against the player's
//! inventory, trait ledger, coin balance and fragment collection. Finishing a
//! main story advances the player's chapter, and collected fragments can be
//! combined through recipes into rarer ones.

pub mod core;
pub mod schema;

pub use crate::core::fragments::{FragmentError, FragmentRegistry};
pub use crate::core::progression::{ChoiceReport, EngineError, ParadoxEngine, ParadoxEngineBuilder};
pub use crate::core::resolution::{ChoiceOutcome, CurrencyPolicy};
pub use crate::schema::player::PlayerProgress;
