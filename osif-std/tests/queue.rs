#![expect(missing_docs, reason = "test")]

use osif_std::StdOsInterface;

fn os() -> StdOsInterface {
    StdOsInterface::new().unwrap()
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn create_rejects_zero_capacity() {
    osif_api::queue::test_suite::test_create_rejects_zero_capacity(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn fill_and_reset() {
    osif_api::queue::test_suite::test_fill_and_reset(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn fifo_order() {
    osif_api::queue::test_suite::test_fifo_order(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn send_to_front_priority() {
    osif_api::queue::test_suite::test_send_to_front_priority(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn receive_timeout() {
    osif_api::queue::test_suite::test_receive_timeout(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn send_timeout() {
    osif_api::queue::test_suite::test_send_timeout(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn blocked_receiver_wakes() {
    osif_api::queue::test_suite::test_blocked_receiver_wakes(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn blocked_sender_wakes() {
    osif_api::queue::test_suite::test_blocked_sender_wakes(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn isr_variants_never_block() {
    osif_api::queue::test_suite::test_isr_variants_never_block(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn concurrent_producers() {
    osif_api::queue::test_suite::test_concurrent_producers(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn typed_round_trip() {
    osif_api::queue::test_suite::test_typed_round_trip(&os());
}

#[test]
#[ntest_timeout::timeout(10_000)]
fn typed_across_threads() {
    osif_api::queue::test_suite::test_typed_across_threads(&os());
}
