//! End-to-end receive over a real UDP socket on loopback.

use std::net::UdpSocket;
use std::time::Duration;

use shooter_common::hal::types::DriveChannel;
use shooter_control_unit::cycle::{CycleRunner, PollOutcome};
use shooter_control_unit::timer::FixedStepTimer;
use shooter_control_unit::transport::UdpCommandChannel;

use super::common::{RecordingDriver, test_config};

#[test]
fn datagram_drives_one_cycle() {
    let channel = UdpCommandChannel::bind("127.0.0.1", 0).unwrap();
    let addr = channel.local_addr().unwrap();

    let mut cfg = test_config();
    cfg.control.idle_poll_ms = 20;
    let mut runner = CycleRunner::new(
        &cfg,
        channel,
        RecordingDriver::new(),
        FixedStepTimer::new(Duration::from_millis(100)),
    )
    .unwrap();

    assert!(matches!(runner.poll_once().unwrap(), PollOutcome::Idle));

    let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
    tx.send_to(b"10,1,0,0,0,0,0,0,0\0garbage", addr).unwrap();

    let mut report = None;
    for _ in 0..100 {
        if let PollOutcome::Cycle(r) = runner.poll_once().unwrap() {
            report = Some(r);
            break;
        }
    }
    let report = report.expect("datagram never arrived");
    assert_eq!(runner.targets().get(1), 10);
    assert_eq!(runner.targets().get(2), 1);
    assert!(report.decode.unwrap().is_clean());
    assert_eq!(report.frame.get(DriveChannel::Md2).duty, 0.3);
}
