pub mod wire;

pub use wire::{DeleteBody, InsertBody, UpdateBody, WireError, WireQuery, WireResponse};
