//! r-axis homing through the runner: seeks, encoder reset, hold band,
//! service ticks and seek timeout.

use std::time::Duration;

use shooter_common::hal::driver::HalDriver;
use shooter_common::hal::types::{DriveChannel, OutputPair, SwitchBank};
use shooter_control_unit::cycle::{CycleRunner, PollOutcome};
use shooter_control_unit::error::FaultFlags;
use shooter_control_unit::state::r_axis::RAxisState;
use shooter_control_unit::timer::FixedStepTimer;
use shooter_hal::drivers::simulation::{SimClock, SimulationDriver, SimulationParams};

use super::common::{RecordingDriver, ScriptedChannel, recording_runner, test_config};

fn r_drive(outcome: &PollOutcome) -> OutputPair {
    match outcome {
        PollOutcome::Cycle(r) | PollOutcome::Service(r) => r.frame.get(DriveChannel::Md5),
        other => panic!("no frame for {other:?}"),
    }
}

#[test]
fn seek_resets_encoder_then_hold_uses_threshold() {
    let mut runner = recording_runner(
        ScriptedChannel::new()
            .packet("0,0,0")
            .packet("0,0,1")
            .timeouts(2)
            .packet("0,0,2")
            .packet("0,0,2")
            .packet("0,0,-2"),
    );

    runner.poll_once().unwrap();
    assert!(runner.r_axis().homing_done());

    let out = runner.poll_once().unwrap();
    assert_eq!(r_drive(&out), OutputPair::new(true, 0.5));
    assert!(runner.r_axis().is_seeking());

    let out = runner.poll_once().unwrap();
    assert!(matches!(out, PollOutcome::Service(_)));
    assert_eq!(r_drive(&out), OutputPair::new(true, 0.5));

    runner.hal_mut().switches = SwitchBank::POSITIVE_LIMIT;
    runner.hal_mut().pulses[3] = 1234;
    let out = runner.poll_once().unwrap();
    assert!(matches!(out, PollOutcome::Service(_)));
    assert_eq!(r_drive(&out).duty, 0.0);
    assert_eq!(runner.hal().resets, vec![3]);
    assert_eq!(runner.hal().pulses[3], 0);
    assert_eq!(runner.r_axis().state(), RAxisState::Idle);
    assert_eq!(runner.stats().service_ticks, 2);

    runner.hal_mut().switches = SwitchBank::empty();
    runner.hal_mut().pulses[3] = 2048;
    let out = runner.poll_once().unwrap();
    assert_eq!(r_drive(&out), OutputPair::new(false, 0.5));

    runner.hal_mut().pulses[3] = -2049;
    let out = runner.poll_once().unwrap();
    assert_eq!(r_drive(&out), OutputPair::new(false, 0.0));

    runner.hal_mut().pulses[3] = 100;
    let out = runner.poll_once().unwrap();
    assert_eq!(r_drive(&out), OutputPair::new(true, 0.5));
}

#[test]
fn service_ticks_leave_pid_state_untouched() {
    let mut runner = recording_runner(
        ScriptedChannel::new()
            .packet("0,0,0")
            .packet("20,0,1,40")
            .timeouts(3),
    );
    runner.poll_once().unwrap();
    let out = runner.poll_once().unwrap();
    let cycle_outputs = match out {
        PollOutcome::Cycle(report) => report.axis_outputs,
        other => panic!("expected a command cycle, got {other:?}"),
    };
    assert!(runner.r_axis().is_seeking());

    let snapshot = |runner: &super::common::TestRunner<RecordingDriver>| {
        let pid = runner.controllers().get(1).unwrap();
        (pid.integral(), pid.output(), pid.error())
    };
    let before = snapshot(&runner);
    assert!(before.1 > 0.0);

    for _ in 0..3 {
        match runner.poll_once().unwrap() {
            PollOutcome::Service(report) => {
                assert_eq!(report.dt, 0.0);
                assert!(report.decode.is_none());
                assert_eq!(report.axis_outputs, cycle_outputs);
            }
            other => panic!("expected service tick, got {other:?}"),
        }
    }

    assert_eq!(snapshot(&runner), before);
    assert_eq!(runner.stats().service_ticks, 3);
    assert_eq!(runner.stats().cycle_count, 2);
    assert_eq!(runner.hal().frames.len(), 5);
}

#[test]
fn active_seek_ignores_new_mode_but_pid_keeps_running() {
    let mut runner = recording_runner(
        ScriptedChannel::new()
            .packet("0,0,0")
            .packet("0,0,-1")
            .packet("20,0,2"),
    );
    runner.poll_once().unwrap();
    runner.poll_once().unwrap();

    let out = runner.poll_once().unwrap();
    assert_eq!(r_drive(&out), OutputPair::new(false, 0.5));
    assert!(matches!(runner.r_axis().state(), RAxisState::SeekNegative(_)));
    assert!(runner.theta_output().duty > 0.0);
    assert!(runner.hal().resets.is_empty());
}

#[test]
fn initial_seek_follows_first_target_sign_without_reset() {
    let mut runner = recording_runner(
        ScriptedChannel::new()
            .packet("0,0,2")
            .packet("0,0,0"),
    );
    runner.hal_mut().pulses[3] = 777;

    let out = runner.poll_once().unwrap();
    assert_eq!(r_drive(&out), OutputPair::new(true, 0.5));
    assert!(!runner.r_axis().homing_done());

    runner.hal_mut().switches = SwitchBank::POSITIVE_LIMIT;
    let out = runner.poll_once().unwrap();
    assert!(runner.r_axis().homing_done());
    assert_eq!(r_drive(&out).duty, 0.0);
    assert!(runner.hal().resets.is_empty());
    assert_eq!(runner.hal().pulses[3], 777);
}

#[test]
fn seek_timeout_stops_drive_and_flags_fault() {
    let mut cfg = test_config();
    cfg.r_axis.seek_timeout_ms = Some(200);
    let mut runner = CycleRunner::new(
        &cfg,
        ScriptedChannel::new()
            .packet("0,0,0")
            .packet("0,0,1")
            .timeouts(2),
        RecordingDriver::new(),
        FixedStepTimer::new(Duration::from_millis(100)),
    )
    .unwrap();

    runner.poll_once().unwrap();
    runner.poll_once().unwrap();
    assert!(runner.r_axis().is_seeking());

    let out = runner.poll_once().unwrap();
    assert_eq!(r_drive(&out).duty, 0.5);

    runner.timer_mut().advance(2);
    let out = runner.poll_once().unwrap();
    match out {
        PollOutcome::Service(report) => {
            assert!(report.faults.contains(FaultFlags::SEEK_TIMED_OUT));
            assert_eq!(report.frame.get(DriveChannel::Md5).duty, 0.0);
        }
        other => panic!("expected service tick, got {other:?}"),
    }
    assert!(!runner.r_axis().is_seeking());
    assert!(runner.hal().resets.is_empty());
}

#[test]
fn simulated_carriage_homes_and_holds() {
    let driver = SimulationDriver::with_params(
        SimulationParams::default(),
        SimClock::Fixed(Duration::from_millis(50)),
    );
    let mut channel = ScriptedChannel::new()
        .packet("0,0,0")
        .packet("0,0,1")
        .timeouts(40);
    for _ in 0..8 {
        channel = channel.packet("0,0,2");
    }
    let mut runner = CycleRunner::new(
        &test_config(),
        channel,
        driver,
        FixedStepTimer::new(Duration::from_millis(50)),
    )
    .unwrap();

    while runner.poll_once().is_ok() {}

    // 0.5 duty at 20000 counts/s for 50 ms: 500 counts per applied frame.
    // The seek ended on SW1 (+8000), which became the new zero; the hold
    // then walked back until |pulses| exceeded 2048.
    assert!(runner.r_axis().homing_done());
    assert!(runner.stats().service_ticks >= 15);
    assert_eq!(runner.hal_mut().read_pulses(3), -2500);
    assert!((runner.hal().r_mechanical() - 5500.0).abs() < 1e-6);
    assert_eq!(runner.last_frame().get(DriveChannel::Md5).duty, 0.0);
    assert_eq!(runner.r_axis().state(), RAxisState::HoldNearPositive);
}
