//! Get-headers/get-blocks locator construction (§6: "doubling scheme").

use shared_types::errors::ChannelError;

/// Builds a block locator from a chain tip height: heights
/// `0, 1, 2, .. 10`, then doubling the step each entry, down to genesis,
/// capped at `max_locator` entries.
#[must_use]
pub fn locator_heights(tip: u64, max_locator: usize) -> Vec<u64> {
    let mut heights = Vec::new();
    let mut step = 1u64;
    let mut height = tip;
    loop {
        heights.push(height);
        if height == 0 || heights.len() >= max_locator {
            break;
        }
        if heights.len() >= 10 {
            step = step.saturating_mul(2);
        }
        height = height.saturating_sub(step);
    }
    if *heights.last().unwrap_or(&1) != 0 && heights.len() < max_locator {
        heights.push(0);
    }
    heights
}

/// Validates an inbound `get_blocks`/`get_headers` locator before serving
/// it (§8 B2): empty or over-length locators are rejected with
/// `channel_stopped` rather than serviced.
pub fn validate_locator(locator: &[shared_types::entities::Hash], max_locator: usize) -> Result<(), ChannelError> {
    if locator.is_empty() || locator.len() > max_locator {
        return Err(ChannelError::ChannelStopped);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_chain_lists_every_height_down_to_genesis() {
        let heights = locator_heights(5, 64);
        assert_eq!(heights, vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn long_chain_doubles_after_the_first_ten_entries() {
        let heights = locator_heights(1000, 64);
        assert_eq!(heights[0], 1000);
        assert_eq!(*heights.last().unwrap(), 0);
        assert!(heights.len() < 1000);
    }

    #[test]
    fn respects_the_max_locator_cap() {
        let heights = locator_heights(100_000, 8);
        assert_eq!(heights.len(), 8);
    }

    #[test]
    fn genesis_tip_is_a_single_entry_locator() {
        assert_eq!(locator_heights(0, 64), vec![0]);
    }

    #[test]
    fn empty_locator_is_rejected() {
        assert_eq!(validate_locator(&[], 64), Err(ChannelError::ChannelStopped));
    }

    #[test]
    fn over_length_locator_is_rejected() {
        let locator = vec![[0u8; 32]; 65];
        assert_eq!(validate_locator(&locator, 64), Err(ChannelError::ChannelStopped));
    }

    #[test]
    fn in_range_locator_is_accepted() {
        let locator = vec![[0u8; 32]; 3];
        assert!(validate_locator(&locator, 64).is_ok());
    }
}
