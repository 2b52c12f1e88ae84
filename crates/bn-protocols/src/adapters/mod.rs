pub mod recording;

pub use recording::{RecordingPeerNetwork, Sent};
