//! Visitor cart: line items, write-through persistence and change notices.
//!
//! A [`CartStore`] owns one cart. Every mutation builds the next cart state,
//! writes the full snapshot through a [`CartStorage`] and only then replaces
//! the in-memory state, so the durable copy always matches the last
//! committed state.

mod line;
mod notice;
mod registry;
mod storage;
mod store;

pub use line::{Cart, CartLine};
pub use notice::{CartEvent, CartUpdate, Notice, NoticeLevel};
pub use registry::{CartRegistry, CartSession, DEFAULT_IDLE_TIMEOUT, validate_key};
pub use storage::{
    CartBackend, CartStorage, FileCartStorage, MemoryCartStorage, PgCartStorage, decode_snapshot,
    encode_snapshot,
};
pub use store::{CartStore, QuantityDirection};
