//! Command cycle behaviour: PID numbers, dead-band, output limits, decoding
//! through the runner, receive errors and shutdown.

use std::time::Duration;

use shooter_common::hal::types::{DriveChannel, OutputPair};
use shooter_control_unit::cycle::{CycleReport, CycleRunner, PollOutcome};
use shooter_control_unit::error::{CycleError, FaultFlags};
use shooter_control_unit::timer::FixedStepTimer;
use shooter_control_unit::transport::TransportError;

use super::common::{
    RecordingDriver, ScriptedChannel, TestRunner, recording_runner, test_config,
};

fn cycle(runner: &mut TestRunner<RecordingDriver>) -> CycleReport {
    match runner.poll_once().unwrap() {
        PollOutcome::Cycle(report) => report,
        other => panic!("expected a command cycle, got {other:?}"),
    }
}

#[test]
fn first_cycle_matches_hand_computed_pid_step() {
    let mut runner = recording_runner(ScriptedChannel::new().packet("10,0,0,0,0,0,0,0,0"));
    let report = cycle(&mut runner);

    assert!((report.dt - 0.1).abs() < 1e-12);
    assert!((report.theta_error - 10.0).abs() < 1e-12);
    assert!(!report.dead_band);

    let pid = runner.controllers().get(1).unwrap();
    assert!((pid.integral() - 0.5).abs() < 1e-12);
    assert!((pid.output() - 1.005).abs() < 1e-12);

    let theta = report.frame.get(DriveChannel::Md1);
    assert!(theta.direction);
    assert!((theta.duty - 1.005 / 360.0).abs() < 1e-12);
    assert_eq!(report.frame.get(DriveChannel::Md6), theta);
    assert_eq!(runner.hal().frames.len(), 1);
}

#[test]
fn repeated_command_grows_through_integral_only() {
    let mut channel = ScriptedChannel::new();
    for _ in 0..10 {
        channel = channel.packet("10");
    }
    let mut runner = recording_runner(channel);

    let mut outputs = Vec::new();
    for _ in 0..10 {
        cycle(&mut runner);
        outputs.push(runner.controllers().get(1).unwrap().output());
    }

    let increments: Vec<f64> = outputs.windows(2).map(|w| w[1] - w[0]).collect();
    for pair in increments.windows(2) {
        // Kp term constant, derivative zero: increments grow by ki * e * dt.
        let growth: f64 = pair[1] - pair[0];
        assert!((growth - 0.01).abs() < 1e-9, "growth {growth}");
    }
}

#[test]
fn dead_band_zeroes_theta_and_holds_feed() {
    let mut runner = recording_runner(
        ScriptedChannel::new()
            .packet("2,0,0")
            .packet("-3,1,0")
            .packet("50,0,0"),
    );

    let report = cycle(&mut runner);
    assert!(report.dead_band);
    assert_eq!(report.frame.get(DriveChannel::Md1).duty, 0.0);
    assert_eq!(report.frame.get(DriveChannel::Md2).duty, 0.5);
    assert_eq!(runner.controllers().get(1).unwrap().output(), 0.0);

    // Feed mode does not override the hold duty; it still sets direction.
    let report = cycle(&mut runner);
    assert!(report.dead_band);
    assert_eq!(report.frame.get(DriveChannel::Md2), OutputPair::new(true, 0.5));
    assert_eq!(report.frame.get(DriveChannel::Md8), OutputPair::new(false, 0.3));

    let report = cycle(&mut runner);
    assert!(!report.dead_band);
    assert_eq!(report.frame.get(DriveChannel::Md2).duty, 0.0);
    assert!(report.frame.get(DriveChannel::Md1).duty > 0.0);
}

#[test]
fn every_channel_stays_under_pwm_limit() {
    let mut channel = ScriptedChannel::new();
    for i in 0..40 {
        let target = if i % 2 == 0 { 100_000 } else { -100_000 };
        channel = channel.packet(&format!("{target},1,0,{target},{target},{target},-1"));
    }
    let mut runner = recording_runner(channel);

    for _ in 0..40 {
        let report = cycle(&mut runner);
        for (ch, pair) in report.frame.iter() {
            assert!(
                (0.0..=0.8).contains(&pair.duty),
                "{} duty {} out of range",
                ch.label(),
                pair.duty
            );
        }
        assert_eq!(report.frame.get(DriveChannel::Md3), OutputPair::STOPPED);
        assert_eq!(report.frame.get(DriveChannel::Md4), OutputPair::STOPPED);
        assert_eq!(report.frame.get(DriveChannel::Md7), OutputPair::new(false, 0.2));
        for (i, pair) in report.axis_outputs.iter().enumerate() {
            assert!(
                (0.0..=0.8).contains(&pair.duty),
                "axis {} duty {} out of range",
                i + 1,
                pair.duty
            );
        }
    }
    assert_eq!(runner.theta_output().duty, 0.8);
    assert_eq!(runner.axis_outputs()[3].duty, 0.8);
}

#[test]
fn every_pid_axis_goes_through_output_limits() {
    let mut runner = recording_runner(ScriptedChannel::new().packet("0,0,0,100000,0,-360"));
    let report = cycle(&mut runner);

    // 0.1 * 100000 + 0.01 * 5000 = 10050, far past deg_limit.
    let axis4 = runner.controllers().get(4).unwrap();
    assert!((axis4.output() - 10050.0).abs() < 1e-9);
    assert_eq!(report.axis_outputs[3], OutputPair::new(true, 0.8));

    // -36 - 0.18 = -36.18 over 360 stays under the ceiling.
    let axis6 = report.axis_outputs[5];
    assert!(!axis6.direction);
    assert!((axis6.duty - 36.18 / 360.0).abs() < 1e-12);

    assert_eq!(report.axis_outputs[1].duty, 0.0);
    assert_eq!(report.axis_outputs[0], report.frame.get(DriveChannel::Md1));
    assert_eq!(report.axis_outputs[0], report.frame.get(DriveChannel::Md6));
}

#[test]
fn short_packet_keeps_remaining_slots() {
    let mut runner = recording_runner(
        ScriptedChannel::new()
            .packet("1,2,3,4,5,6,7,8,9")
            .packet("5,0,0"),
    );
    let report = cycle(&mut runner);
    assert_eq!(runner.targets().as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(report.decode.unwrap().slots_written, 9);
    assert_eq!(report.frame.get(DriveChannel::Md7), OutputPair::new(true, 0.2));

    let report = cycle(&mut runner);
    assert_eq!(runner.targets().as_slice(), &[5, 0, 0, 4, 5, 6, 7, 8, 9]);
    assert!(!report.faults.contains(FaultFlags::MALFORMED_COMMAND));
}

#[test]
fn malformed_tokens_decode_to_zero_and_are_flagged() {
    let mut runner = recording_runner(ScriptedChannel::new().packet("abc,1,0,,12x"));
    let report = cycle(&mut runner);
    assert!(report.faults.contains(FaultFlags::MALFORMED_COMMAND));
    assert_eq!(&runner.targets().as_slice()[..4], &[0, 1, 0, 12]);
    assert_eq!(runner.stats().malformed_packets, 1);
}

#[test]
fn zero_elapsed_time_is_floored() {
    let mut runner = CycleRunner::new(
        &test_config(),
        ScriptedChannel::new().packet("10"),
        RecordingDriver::new(),
        FixedStepTimer::new(Duration::ZERO),
    )
    .unwrap();

    let report = match runner.poll_once().unwrap() {
        PollOutcome::Cycle(r) => r,
        other => panic!("unexpected {other:?}"),
    };
    assert!((report.dt - 0.001).abs() < 1e-12);
    assert!(report.faults.contains(FaultFlags::DT_CLAMPED));
    assert!(runner.controllers().get(1).unwrap().output().is_finite());
}

#[test]
fn receive_error_skips_cycle_and_continues() {
    let mut runner = recording_runner(ScriptedChannel::new().error().packet("10"));

    assert!(matches!(
        runner.poll_once().unwrap(),
        PollOutcome::Skipped(f) if f.contains(FaultFlags::RECEIVE_ERROR)
    ));
    assert_eq!(runner.stats().skipped, 1);
    assert!(runner.hal().frames.is_empty());

    cycle(&mut runner);
    assert_eq!(runner.stats().cycle_count, 1);
}

#[test]
fn idle_timeout_runs_nothing() {
    let mut runner = recording_runner(ScriptedChannel::new().packet("0").timeouts(1));
    cycle(&mut runner);
    assert!(matches!(runner.poll_once().unwrap(), PollOutcome::Idle));
    assert_eq!(runner.hal().frames.len(), 1);
    assert_eq!(runner.stats().service_ticks, 0);
}

#[test]
fn closed_channel_ends_run_and_stops_outputs() {
    let mut runner = recording_runner(ScriptedChannel::new().packet("100,1,0"));
    let err = runner.run().unwrap_err();
    assert!(matches!(
        err,
        CycleError::Transport(TransportError::Closed)
    ));

    let hal = runner.hal();
    assert_eq!(hal.shutdowns, 1);
    assert_eq!(hal.last_frame().unwrap().max_duty(), 0.0);
    assert_eq!(runner.stats().cycle_count, 1);
}

#[test]
fn cleared_running_flag_stops_before_receiving() {
    let mut runner = recording_runner(ScriptedChannel::new().packet("10"));
    runner
        .running_flag()
        .store(false, std::sync::atomic::Ordering::SeqCst);
    runner.run().unwrap();
    assert_eq!(runner.stats().cycle_count, 0);
    assert_eq!(runner.hal().shutdowns, 1);
}

#[test]
fn driver_init_failure_is_fatal() {
    let driver = RecordingDriver {
        fail_init: true,
        ..RecordingDriver::new()
    };
    let result = CycleRunner::new(
        &test_config(),
        ScriptedChannel::new(),
        driver,
        FixedStepTimer::new(Duration::from_millis(100)),
    );
    assert!(matches!(result, Err(CycleError::Hal(_))));
}
