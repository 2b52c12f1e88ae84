pub mod inventory;
pub mod settings;

pub use inventory::{inventory_size, to_half, window_step};
pub use settings::CheckSettings;
