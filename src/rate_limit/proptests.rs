//! Property-Based Tests for the Flow Engine
//!
//! # Test Strategies
//!
//! - **Quota invariant**: admitted flow never exceeds `cap% * channel_value`
//! - **Reject without mutation**: a rejected packet leaves the record untouched
//! - **Exact compensation**: reverting admitted sends restores the outflow
//! - **Reset idempotence**: a second reset changes nothing
//!
//! # Running the Tests
//!
//! ```bash
//! cargo test --lib rate_limit::proptests
//! ```

use proptest::prelude::*;

use super::admin::AddRateLimit;
use super::host::InMemoryHost;
use super::manager::{RateLimitManager, TransferPacket};
use super::quota::{Amount, Direction};

const DENOM: &str = "uatom";
const CHANNEL: &str = "channel-0";

fn setup(channel_value: u64, send: u32, recv: u32) -> (InMemoryHost, RateLimitManager) {
    let mut host = InMemoryHost::new();
    host.add_channel(CHANNEL, "cosmoshub-4");
    host.set_channel_value(DENOM, channel_value);

    let mut manager = RateLimitManager::new("gov");
    manager
        .add_rate_limit(
            &host,
            &AddRateLimit {
                authority: "gov".to_string(),
                denom: DENOM.to_string(),
                channel_id: CHANNEL.to_string(),
                max_percent_send: send,
                max_percent_recv: recv,
                duration_hours: 24,
            },
        )
        .unwrap();
    (host, manager)
}

fn packet(sequence: u64, amount: u64) -> TransferPacket {
    TransferPacket::new(DENOM, CHANNEL, sequence, amount)
}

// Helper: a caps pair where at least one side is set
fn arb_caps() -> impl Strategy<Value = (u32, u32)> {
    (0u32..=100, 0u32..=100).prop_filter("one side must be capped", |(s, r)| *s > 0 || *r > 0)
}

// Helper: a stream of directed transfers
fn arb_transfers() -> impl Strategy<Value = Vec<(bool, u64)>> {
    prop::collection::vec((any::<bool>(), 0u64..5_000), 1..40)
}

// ============================================================================
// Property 1: Quota invariant and reject-without-mutation
// ============================================================================

proptest! {
    #[test]
    fn prop_flow_never_exceeds_cap(
        channel_value in 1u64..1_000_000,
        (send, recv) in arb_caps(),
        transfers in arb_transfers(),
    ) {
        let (_host, mut manager) = setup(channel_value, send, recv);

        for (sequence, (is_send, amount)) in transfers.into_iter().enumerate() {
            let before = manager.get_rate_limit(DENOM, CHANNEL).unwrap();
            let packet = packet(sequence as u64, amount);
            let (direction, result) = if is_send {
                (Direction::Send, manager.check_and_track_send(&packet))
            } else {
                (Direction::Recv, manager.check_and_track_recv(&packet))
            };
            let after = manager.get_rate_limit(DENOM, CHANNEL).unwrap();

            match result {
                Ok(_) => {
                    let cap = after.quota.max_percent(direction);
                    if cap != 0 {
                        prop_assert!(
                            after.flow.get(direction) * 100u32 <= &after.flow.channel_value * cap
                        );
                    }
                }
                Err(err) => {
                    prop_assert!(err.is_quota_exceeded());
                    prop_assert_eq!(before, after);
                }
            }
        }
    }
}

// ============================================================================
// Property 2: Reversal and reset
// ============================================================================

proptest! {
    #[test]
    fn prop_revert_restores_outflow(
        amounts in prop::collection::vec(1u64..500, 1..30),
    ) {
        let (_host, mut manager) = setup(1_000_000, 100, 100);

        let mut admitted = Vec::new();
        for (sequence, amount) in amounts.into_iter().enumerate() {
            let packet = packet(sequence as u64, amount);
            if manager.check_and_track_send(&packet).is_ok() {
                admitted.push(packet);
            }
        }

        for packet in admitted.iter().rev() {
            prop_assert!(manager.revert_send(packet));
            prop_assert!(!manager.revert_send(packet));
        }

        let rate_limit = manager.get_rate_limit(DENOM, CHANNEL).unwrap();
        prop_assert_eq!(rate_limit.flow.outflow, Amount::from(0u32));
        prop_assert!(manager.pending().is_empty());
    }

    #[test]
    fn prop_reset_is_idempotent(
        amounts in prop::collection::vec(1u64..100, 0..20),
        new_value in 1u64..1_000_000,
    ) {
        let (mut host, mut manager) = setup(10_000, 50, 50);
        for (sequence, amount) in amounts.into_iter().enumerate() {
            let _ = manager.check_and_track_send(&packet(sequence as u64, amount));
        }
        host.set_channel_value(DENOM, new_value);

        manager.reset(&host, DENOM, CHANNEL).unwrap();
        let first = manager.get_rate_limit(DENOM, CHANNEL).unwrap();
        manager.reset(&host, DENOM, CHANNEL).unwrap();
        let second = manager.get_rate_limit(DENOM, CHANNEL).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(second.flow.outflow, Amount::from(0u32));
        prop_assert_eq!(second.flow.inflow, Amount::from(0u32));
        prop_assert_eq!(second.flow.channel_value, Amount::from(new_value));
        prop_assert!(manager.pending().channel(CHANNEL).is_empty());
    }
}
