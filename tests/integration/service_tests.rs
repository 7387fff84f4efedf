//! End-to-end controller flows against the simulated board.
//!
//! Drives [`AppService`] the way the binary's control loop does: tick with
//! a millisecond clock, then `finish` with whatever request won the latch.

use crate::mock_hw::{BUTTON, MockHost, PUMP, RecordingSink, sim, sim_config};

use watershed::app::commands::AppCommand;
use watershed::app::events::AppEvent;
use watershed::app::ports::HostError;
use watershed::app::service::{AppService, TickOutcome};
use watershed::config::{ControllerConfig, EdgeDetection};
use watershed::drivers::button::MonitorState;
use watershed::error::{ConfigError, Error, HardwareFault};
use watershed::shutdown::{ShutdownLatch, ShutdownRequest, ShutdownSource};

/// Tick every `step` ms over `[from, to)`, stopping at the first non-Continue.
fn run<B: watershed::app::ports::GpioBackend>(
    app: &mut AppService<B>,
    sink: &mut RecordingSink,
    from: u32,
    to: u32,
    step: usize,
) -> TickOutcome {
    for t in (from..to).step_by(step) {
        let outcome = app.tick(t, sink);
        if outcome != TickOutcome::Continue {
            return outcome;
        }
    }
    TickOutcome::Continue
}

// ── Button → shutdown → halt ──────────────────────────────────

#[test]
fn bouncy_press_shuts_down_and_halts_once() {
    for mode in [EdgeDetection::Interrupt, EdgeDetection::Poll] {
        let (board, mut backend) = sim();
        let mut sink = RecordingSink::new();
        let mut host = MockHost::new();
        let config = ControllerConfig {
            manual_on: true,
            ..sim_config(mode)
        };
        let mut app =
            AppService::start(&config, &mut backend, ShutdownLatch::new(), &mut sink).unwrap();
        assert!(app.is_pump_on());

        assert_eq!(run(&mut app, &mut sink, 0, 100, 5), TickOutcome::Continue);

        // Contact bounce, then held.
        for (t, high) in [(100, false), (102, true), (104, false), (106, true), (108, false)] {
            board.set_input(BUTTON, high, t);
            app.tick(t, &mut sink);
        }
        let outcome = run(&mut app, &mut sink, 110, 400, 2);
        let request = ShutdownRequest {
            source: ShutdownSource::Button,
        };
        assert_eq!(outcome, TickOutcome::Shutdown(request), "mode {:?}", mode);
        assert_eq!(sink.shutdown_requests(), 1);
        assert_eq!(sink.presses(), 1);

        app.finish(request, &mut host, &mut sink).unwrap();
        assert_eq!(host.halts, 1);
        assert_eq!(board.level(PUMP), Some(false));
        assert!(!board.is_claimed(PUMP));
        assert!(!board.is_claimed(BUTTON));
    }
}

#[test]
fn short_glitch_never_requests_shutdown() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let mut app = AppService::start(
        &sim_config(EdgeDetection::Interrupt),
        &mut backend,
        ShutdownLatch::new(),
        &mut sink,
    )
    .unwrap();

    board.set_input(BUTTON, false, 50);
    board.set_input(BUTTON, true, 70);
    assert_eq!(run(&mut app, &mut sink, 50, 1000, 10), TickOutcome::Continue);
    assert_eq!(sink.shutdown_requests(), 0);
    assert_eq!(app.status().button, Some(MonitorState::Idle));
}

#[test]
fn dropped_release_edges_never_request_shutdown() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let mut app = AppService::start(
        &sim_config(EdgeDetection::Interrupt),
        &mut backend,
        ShutdownLatch::new(),
        &mut sink,
    )
    .unwrap();

    // A 40-edge chatter burst ending released overruns the edge queue,
    // so the queued history ends on a press the line no longer shows.
    for i in 0..40u32 {
        board.set_input(BUTTON, i % 2 == 1, 100 + i / 10);
    }
    assert_eq!(board.level(BUTTON), Some(true));

    assert_eq!(run(&mut app, &mut sink, 110, 600, 10), TickOutcome::Continue);
    assert_eq!(sink.presses(), 0);
    assert_eq!(sink.shutdown_requests(), 0);
    assert_eq!(app.status().button, Some(MonitorState::Idle));
}

#[test]
fn halt_failure_is_reported_after_pump_is_off() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let mut host = MockHost::failing(HostError::CommandFailed(1));
    let latch = ShutdownLatch::new();
    let app = AppService::start(
        &sim_config(EdgeDetection::Poll),
        &mut backend,
        latch.clone(),
        &mut sink,
    )
    .unwrap();

    let request = latch.raise(ShutdownSource::Button).unwrap();
    assert_eq!(
        app.finish(request, &mut host, &mut sink),
        Err(HostError::CommandFailed(1))
    );
    assert_eq!(board.level(PUMP), Some(false));
}

// ── Signal and command paths ──────────────────────────────────

#[test]
fn termination_signal_emergency_stops_without_halt() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let mut host = MockHost::new();
    let latch = ShutdownLatch::new();
    let mut app = AppService::start(
        &sim_config(EdgeDetection::Poll),
        &mut backend,
        latch.clone(),
        &mut sink,
    )
    .unwrap();
    app.handle_command(AppCommand::PumpOn, &mut sink).unwrap();

    latch.raise(ShutdownSource::Signal);
    let TickOutcome::Shutdown(request) = app.tick(0, &mut sink) else {
        panic!("signal should stop the loop");
    };
    assert_eq!(request.source, ShutdownSource::Signal);

    // A later button press cannot steal the request.
    board.set_input(BUTTON, false, 1);
    run(&mut app, &mut sink, 1, 200, 10);
    assert_eq!(latch.requested(), Some(request));

    app.finish(request, &mut host, &mut sink).unwrap();
    assert_eq!(host.halts, 0);
    assert_eq!(board.level(PUMP), Some(false));
    assert!(sink.events.contains(&AppEvent::EmergencyStop {
        reason: "termination signal"
    }));
}

#[test]
fn command_shutdown_turns_pump_off_without_halt() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let mut host = MockHost::new();
    let mut app = AppService::start(
        &sim_config(EdgeDetection::Poll),
        &mut backend,
        ShutdownLatch::new(),
        &mut sink,
    )
    .unwrap();
    app.handle_command(AppCommand::PumpOn, &mut sink).unwrap();
    app.handle_command(AppCommand::Shutdown, &mut sink).unwrap();

    let TickOutcome::Shutdown(request) = app.tick(0, &mut sink) else {
        panic!("command should stop the loop");
    };
    app.finish(request, &mut host, &mut sink).unwrap();
    assert_eq!(host.halts, 0);
    assert_eq!(board.level(PUMP), Some(false));
}

// ── Startup failures ──────────────────────────────────────────

#[test]
fn invalid_pin_aborts_before_anything_is_driven() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let config = ControllerConfig {
        pin_out: 200,
        manual_on: true,
        ..sim_config(EdgeDetection::Poll)
    };
    let res = AppService::start(&config, &mut backend, ShutdownLatch::new(), &mut sink);
    assert!(matches!(
        res,
        Err(Error::Config(ConfigError::ValidationFailed(_)))
    ));
    assert_eq!(board.level(PUMP), None);
    assert!(sink.events.is_empty());
}

#[test]
fn pump_pin_already_owned_is_fatal() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let config = sim_config(EdgeDetection::Poll);
    let _first = AppService::start(&config, &mut backend, ShutdownLatch::new(), &mut sink).unwrap();

    let mut second_backend = watershed::adapters::sim::SimBackend::new(board.clone());
    let res = AppService::start(&config, &mut second_backend, ShutdownLatch::new(), &mut sink);
    assert!(matches!(
        res,
        Err(Error::Hardware(HardwareFault::PinInUse { pin: PUMP }))
    ));
}

#[test]
fn pins_are_reusable_after_teardown() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let config = sim_config(EdgeDetection::Interrupt);
    {
        let _app =
            AppService::start(&config, &mut backend, ShutdownLatch::new(), &mut sink).unwrap();
        assert!(board.is_claimed(PUMP));
    }
    assert!(!board.is_claimed(PUMP));
    assert!(AppService::start(&config, &mut backend, ShutdownLatch::new(), &mut sink).is_ok());
}

// ── Runtime faults ────────────────────────────────────────────

#[test]
fn stuck_input_escalates_and_stops_pump() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let config = ControllerConfig {
        manual_on: true,
        max_read_failures: 3,
        ..sim_config(EdgeDetection::Poll)
    };
    let mut app = AppService::start(&config, &mut backend, ShutdownLatch::new(), &mut sink).unwrap();

    board.fail_reads(BUTTON, 2);
    assert_eq!(run(&mut app, &mut sink, 0, 50, 10), TickOutcome::Continue);
    assert!(app.is_pump_on(), "two transient failures are absorbed");

    board.fail_reads(BUTTON, u32::MAX);
    let outcome = run(&mut app, &mut sink, 50, 200, 10);
    assert_eq!(
        outcome,
        TickOutcome::Fault(HardwareFault::ReadFailuresExceeded {
            pin: BUTTON,
            consecutive: 4
        })
    );
    assert!(!app.is_pump_on());
    assert_eq!(board.level(PUMP), Some(false));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Fault(_))), 1);
    assert_eq!(sink.shutdown_requests(), 0);
}

#[test]
fn write_failure_faults_pump_off() {
    let (board, mut backend) = sim();
    let mut sink = RecordingSink::new();
    let mut app = AppService::start(
        &sim_config(EdgeDetection::Poll),
        &mut backend,
        ShutdownLatch::new(),
        &mut sink,
    )
    .unwrap();

    board.fail_writes(PUMP, true);
    assert!(matches!(
        app.handle_command(AppCommand::PumpOn, &mut sink),
        Err(HardwareFault::Write { pin: PUMP, .. })
    ));
    assert!(!app.is_pump_on());
    assert!(app.status().pump_faulted);

    board.fail_writes(PUMP, false);
    app.handle_command(AppCommand::PumpOff, &mut sink).unwrap();
    assert!(!app.status().pump_faulted);
    app.handle_command(AppCommand::PumpOn, &mut sink).unwrap();
    assert!(app.is_pump_on());
}
