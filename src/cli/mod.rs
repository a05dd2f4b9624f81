pub mod args;
pub mod validation;

pub use args::{Args, Commands, ConfigAction, LayerArgs};
pub use validation::{validate_layers, LayerPair};
