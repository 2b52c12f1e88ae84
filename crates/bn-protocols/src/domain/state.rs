//! The block-in-31800 channel state machine (§4.8: "idle, requesting,
//! receiving, draining, purging").

/// A single peer channel's download-path state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No outstanding map; waiting for work.
    Idle,
    /// `get_hashes` succeeded; waiting for the first block.
    Requesting,
    /// At least one block has been delivered; the map is not yet empty.
    Receiving,
    /// The channel's map emptied; finishing bookkeeping before idling.
    Draining,
    /// A `purge` was received; the map is being cleared unconditionally.
    Purging,
    /// A fatal fault stopped the channel permanently.
    Stopped,
}

impl ChannelState {
    /// `idle -> requesting` on a non-empty `get_hashes` result.
    #[must_use]
    pub fn on_get_hashes_success(self) -> Self {
        match self {
            Self::Idle => Self::Requesting,
            other => other,
        }
    }

    /// `requesting -> receiving` on the first delivered block.
    #[must_use]
    pub fn on_first_block(self) -> Self {
        match self {
            Self::Requesting => Self::Receiving,
            other => other,
        }
    }

    /// `receiving -> draining -> idle` once the map empties.
    #[must_use]
    pub fn on_map_emptied(self) -> Self {
        match self {
            Self::Receiving | Self::Draining => Self::Idle,
            other => other,
        }
    }

    /// Any state transitions to `purging` on a `purge` signal.
    #[must_use]
    pub fn on_purge(self) -> Self {
        if self == Self::Stopped {
            self
        } else {
            Self::Purging
        }
    }

    /// Any state transitions to `stopped` on a fatal fault.
    #[must_use]
    pub fn on_fatal(self) -> Self {
        Self::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_requests_then_receives_then_drains_to_idle() {
        let mut s = ChannelState::Idle;
        s = s.on_get_hashes_success();
        assert_eq!(s, ChannelState::Requesting);
        s = s.on_first_block();
        assert_eq!(s, ChannelState::Receiving);
        s = s.on_map_emptied();
        assert_eq!(s, ChannelState::Idle);
    }

    #[test]
    fn purge_overrides_any_state() {
        assert_eq!(ChannelState::Receiving.on_purge(), ChannelState::Purging);
        assert_eq!(ChannelState::Idle.on_purge(), ChannelState::Purging);
    }

    #[test]
    fn stopped_is_terminal() {
        assert_eq!(ChannelState::Stopped.on_purge(), ChannelState::Stopped);
        assert_eq!(ChannelState::Stopped.on_get_hashes_success(), ChannelState::Stopped);
    }

    #[test]
    fn fatal_stops_from_any_state() {
        assert_eq!(ChannelState::Requesting.on_fatal(), ChannelState::Stopped);
    }
}
