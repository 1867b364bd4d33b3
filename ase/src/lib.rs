pub mod error;

mod atlas;
mod blend;
mod cel;
mod container;
mod decoder;
mod layer;
mod nom_helpers;
mod palette;
mod slice;
mod tag;
mod types;
mod user_data;
mod utils;

#[cfg(test)]
mod fixture;

pub use atlas::{factor_power_of_two, grid_size};
pub use blend::BlendMode;
pub use types::*;
