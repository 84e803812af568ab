//! Types shared between the Stage 1 scanner and downstream search stages.
//!
//! Stage 1 reduces raw spectrograms to a small list of candidate [`Hit`]
//! regions. Later stages (hit classification, cadence correlation) consume
//! the persisted [`HitList`] documents; they never see the raw data again,
//! so everything they need must be captured here.

pub mod hit;
pub mod hit_list;
pub mod writer;

pub use hit::Hit;
pub use hit_list::HitList;
pub use writer::{HitWriter, JsonHitWriter, MemoryHitWriter, WriteError};
