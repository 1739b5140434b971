#![expect(missing_docs, reason = "test")]

use osif_std::StdOsInterface;
use serial_test::serial;

fn os() -> StdOsInterface {
    StdOsInterface::new().unwrap()
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn create_rejects_zero_period() {
    osif_api::timer::test_suite::test_create_rejects_zero_period(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn created_stopped() {
    osif_api::timer::test_suite::test_created_stopped(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn one_shot() {
    osif_api::timer::test_suite::test_one_shot(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn periodic() {
    osif_api::timer::test_suite::test_periodic(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn periodic_callbacks_never_overlap() {
    osif_api::timer::test_suite::test_periodic_callbacks_never_overlap(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn restart_extends_deadline() {
    osif_api::timer::test_suite::test_restart_extends_deadline(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn stop_before_expiry() {
    osif_api::timer::test_suite::test_stop_before_expiry(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn set_period() {
    osif_api::timer::test_suite::test_set_period(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn set_period_rearms_running_timer() {
    osif_api::timer::test_suite::test_set_period_rearms_running_timer(&os());
}

#[test]
#[serial]
#[ntest_timeout::timeout(10_000)]
fn drop_stops_timer() {
    osif_api::timer::test_suite::test_drop_stops_timer(&os());
}
