//! Stop/standby sequencer against the spy platform.
//!
//! Every test leaks its own `WakeupInfo` so parallel tests never share the
//! interrupt-written state.
#![allow(clippy::unwrap_used)]

use device_hal::config::{RTC_WAKEUP_CHANNEL, TOTAL_PINS, WKP_PIN};
use device_hal::error::{HalError, HardwareFault, SleepError};
use device_hal::fpu::FpuFlags;
use device_hal::gpio::{InterruptMode, PinId};
use device_hal::mocks::{Call, MockPlatform};
use device_hal::power::StandbyFlags;
use device_hal::sleep::{enter_standby_mode, enter_stop_mode, StopModeRequest};
use device_hal::wakeup::{WakeupEvent, WakeupInfo, WakeupReason};

fn wakeup_info() -> &'static WakeupInfo {
    Box::leak(Box::new(WakeupInfo::new()))
}

fn pin(n: u16) -> PinId {
    PinId::new(n).unwrap()
}

const RISING: &[InterruptMode] = &[InterruptMode::RisingEdge];

#[test]
fn end_to_end_pin_five() {
    let mut platform = MockPlatform::new();
    platform.script_event(WakeupEvent::Pin(pin(5)));
    let request = StopModeRequest {
        pins: &[5],
        edge_modes: RISING,
        timeout_seconds: 0,
    };

    let reason = enter_stop_mode(&mut platform, wakeup_info(), &request).unwrap();

    assert_eq!(reason.code(), 6);
    for (suspend, resume) in [
        (Call::UsbDetach, Call::UsbAttach),
        (Call::FlashSleep, Call::FlashWake),
        (Call::AlarmRtcSuspend, Call::AlarmRtcResume),
        (Call::GpioSuspend, Call::GpioRestore),
        (Call::SystickDisable, Call::SystickEnable),
    ] {
        assert_eq!(platform.count(suspend), 1, "{suspend:?}");
        assert_eq!(platform.count(resume), 1, "{resume:?}");
        assert!(platform.position(suspend) < platform.position(resume));
    }
    assert_eq!(platform.attach_count(), 1);
    assert_eq!(platform.detach_count(), 1);
    assert!(platform.bound_pins().is_empty());
}

#[test]
fn steps_run_in_order() {
    let mut platform = MockPlatform::new();
    platform.script_event(WakeupEvent::Pin(pin(2)));
    let request = StopModeRequest {
        pins: &[2],
        edge_modes: RISING,
        timeout_seconds: 1,
    };
    enter_stop_mode(&mut platform, wakeup_info(), &request).unwrap();

    let expected = [
        Call::SystickDisable,
        Call::UsbDetach,
        Call::AlarmRtcSuspend,
        Call::FlashSleep,
        Call::UartFlush,
        Call::HfclkRelease,
        Call::GpioSuspend,
        Call::Attach(pin(2), InterruptMode::RisingEdge),
        Call::TimerInit,
        Call::SetCompare(RTC_WAKEUP_CHANNEL, 8),
        Call::TimerEnable,
        Call::FpuPrepare,
        Call::WaitForEvent,
        Call::Detach(pin(2)),
        Call::TimerUninit,
        Call::HfclkRequest,
        Call::GpioRestore,
        Call::FlashWake,
        Call::AlarmRtcResume,
        Call::UsbAttach,
        Call::SystickEnable,
    ];
    assert_eq!(platform.calls(), expected);
}

#[test]
fn pin_beats_timer_when_both_fire() {
    let mut platform = MockPlatform::new();
    platform.script_simultaneous(&[WakeupEvent::Timer, WakeupEvent::Pin(pin(9))]);
    let request = StopModeRequest {
        pins: &[9],
        edge_modes: RISING,
        timeout_seconds: 5,
    };
    let reason = enter_stop_mode(&mut platform, wakeup_info(), &request).unwrap();
    assert_eq!(reason, WakeupReason::Pin(pin(9)));
    assert_eq!(reason.code(), 10);
    assert!(!platform.timer_running());
}

#[test]
fn first_of_two_simultaneous_pins_wins() {
    let mut platform = MockPlatform::new();
    platform.script_simultaneous(&[WakeupEvent::Pin(pin(3)), WakeupEvent::Pin(pin(7))]);
    let request = StopModeRequest {
        pins: &[3, 7],
        edge_modes: RISING,
        timeout_seconds: 0,
    };
    let reason = enter_stop_mode(&mut platform, wakeup_info(), &request).unwrap();
    assert_eq!(reason, WakeupReason::Pin(pin(3)));
    assert_eq!(reason.code(), 4);
}

#[test]
fn timer_only_returns_zero() {
    let mut platform = MockPlatform::new();
    platform.script_event(WakeupEvent::Timer);
    let request = StopModeRequest {
        pins: &[],
        edge_modes: &[],
        timeout_seconds: 3,
    };
    let reason = enter_stop_mode(&mut platform, wakeup_info(), &request).unwrap();
    assert_eq!(reason.code(), 0);
    assert_eq!(platform.count(Call::SetCompare(RTC_WAKEUP_CHANNEL, 24)), 1);
    assert_eq!(platform.attach_count(), 0);
}

#[test]
fn spurious_wakes_are_absorbed() {
    let mut platform = MockPlatform::new();
    platform
        .script_spurious_wake()
        .script_spurious_wake()
        .script_event(WakeupEvent::Pin(pin(4)));
    let request = StopModeRequest {
        pins: &[4],
        edge_modes: RISING,
        timeout_seconds: 0,
    };
    let reason = enter_stop_mode(&mut platform, wakeup_info(), &request).unwrap();
    assert_eq!(reason, WakeupReason::Pin(pin(4)));
    assert_eq!(platform.count(Call::WaitForEvent), 3);
}

#[test]
fn no_source_touches_no_hardware() {
    let mut platform = MockPlatform::new();
    let request = StopModeRequest {
        pins: &[],
        edge_modes: &[],
        timeout_seconds: 0,
    };
    let result = enter_stop_mode(&mut platform, wakeup_info(), &request);
    assert_eq!(result, Err(SleepError::Rejected(HalError::InvalidArgument)));
    assert!(platform.calls().is_empty());
}

#[test]
fn bad_pin_or_mode_is_rejected_without_side_effects() {
    let requests = [
        StopModeRequest {
            pins: &[TOTAL_PINS],
            edge_modes: RISING,
            timeout_seconds: 0,
        },
        StopModeRequest {
            pins: &[3],
            edge_modes: &[InterruptMode::HighLevel],
            timeout_seconds: 0,
        },
        StopModeRequest {
            pins: &[3, 3],
            edge_modes: RISING,
            timeout_seconds: 0,
        },
        StopModeRequest {
            pins: &[],
            edge_modes: &[],
            timeout_seconds: u32::MAX,
        },
        StopModeRequest {
            pins: &[1],
            edge_modes: &[InterruptMode::RisingEdge, InterruptMode::LowLevel],
            timeout_seconds: 0,
        },
        StopModeRequest {
            pins: &[],
            edge_modes: &[InterruptMode::HighLevel],
            timeout_seconds: 5,
        },
    ];
    for request in requests {
        let mut platform = MockPlatform::new();
        let result = enter_stop_mode(&mut platform, wakeup_info(), &request);
        assert_eq!(
            result,
            Err(SleepError::Rejected(HalError::InvalidArgument)),
            "{request:?}"
        );
        assert!(platform.calls().is_empty());
    }
}

#[test]
fn repeated_calls_are_idempotent() {
    let mut platform = MockPlatform::new();
    platform.auto_fire_first_pin();
    let info = wakeup_info();
    let request = StopModeRequest {
        pins: &[7, 12],
        edge_modes: &[InterruptMode::FallingEdge, InterruptMode::BothEdges],
        timeout_seconds: 0,
    };

    let first = enter_stop_mode(&mut platform, info, &request).unwrap();
    assert_eq!(platform.attach_count(), platform.detach_count());
    assert!(platform.bound_pins().is_empty());

    platform.clear_calls();
    let second = enter_stop_mode(&mut platform, info, &request).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.code(), 8);
    assert_eq!(platform.attach_count(), 2);
    assert_eq!(platform.attach_count(), platform.detach_count());
    assert!(platform.bound_pins().is_empty());
}

#[test]
fn hfclk_left_off_stays_off() {
    let mut platform = MockPlatform::new();
    platform.set_hfclk_running(false);
    platform.script_event(WakeupEvent::Pin(pin(1)));
    let request = StopModeRequest {
        pins: &[1],
        edge_modes: RISING,
        timeout_seconds: 0,
    };
    enter_stop_mode(&mut platform, wakeup_info(), &request).unwrap();
    assert_eq!(platform.count(Call::HfclkRelease), 0);
    assert_eq!(platform.count(Call::HfclkRequest), 0);
    assert!(!platform.hfclk_is_running());
}

#[test]
fn attach_failure_is_fatal() {
    let mut platform = MockPlatform::new();
    platform.fail_attach_on(pin(6));
    let request = StopModeRequest {
        pins: &[6],
        edge_modes: RISING,
        timeout_seconds: 0,
    };
    let result = enter_stop_mode(&mut platform, wakeup_info(), &request);
    assert_eq!(result, Err(SleepError::Fatal(HardwareFault::PinAttach(pin(6)))));
    assert!(result.unwrap_err().is_fatal());
    // Half-configured state is not unwound.
    assert_eq!(platform.count(Call::GpioRestore), 0);
}

#[test]
fn critical_fpu_exception_is_fatal() {
    let mut platform = MockPlatform::new();
    platform.set_fpu_flags(FpuFlags::DIVIDE_BY_ZERO);
    let request = StopModeRequest {
        pins: &[6],
        edge_modes: RISING,
        timeout_seconds: 0,
    };
    let result = enter_stop_mode(&mut platform, wakeup_info(), &request);
    assert_eq!(
        result,
        Err(SleepError::Fatal(HardwareFault::FpuException(FpuFlags::DIVIDE_BY_ZERO)))
    );
    assert_eq!(platform.count(Call::WaitForEvent), 0);
}

#[test]
fn inexact_fpu_flag_does_not_block_sleep() {
    let mut platform = MockPlatform::new();
    platform.set_fpu_flags(FpuFlags::INEXACT);
    platform.script_event(WakeupEvent::Pin(pin(6)));
    let request = StopModeRequest {
        pins: &[6],
        edge_modes: RISING,
        timeout_seconds: 0,
    };
    assert!(enter_stop_mode(&mut platform, wakeup_info(), &request).is_ok());
}

#[test]
fn unarmed_source_reports_not_supported() {
    let mut platform = MockPlatform::new();
    platform.script_event(WakeupEvent::Timer);
    let request = StopModeRequest {
        pins: &[8],
        edge_modes: RISING,
        timeout_seconds: 0,
    };
    let result = enter_stop_mode(&mut platform, wakeup_info(), &request);
    assert_eq!(result, Err(SleepError::Rejected(HalError::Unsupported)));
    // Sources are torn down and peripherals restored even so.
    assert!(platform.bound_pins().is_empty());
    assert_eq!(platform.count(Call::SystickEnable), 1);
}

#[test]
fn standby_arms_wkp_sense_and_powers_off() {
    let mut platform = MockPlatform::new();
    enter_standby_mode(&mut platform, 0, StandbyFlags::default()).unwrap();
    assert_eq!(
        platform.count(Call::ConfigureSense(WKP_PIN, InterruptMode::HighLevel)),
        1
    );
    assert_eq!(platform.calls().last(), Some(&Call::PowerOff));
    assert_eq!(platform.count(Call::TimerInit), 0);
}

#[test]
fn standby_rejects_timer_and_disabled_wkp() {
    let mut platform = MockPlatform::new();
    assert_eq!(
        enter_standby_mode(&mut platform, 10, StandbyFlags::default()),
        Err(SleepError::Rejected(HalError::Unsupported))
    );
    assert_eq!(
        enter_standby_mode(&mut platform, 0, StandbyFlags::from_bits(StandbyFlags::DISABLE_WKP_PIN)),
        Err(SleepError::Rejected(HalError::Unsupported))
    );
    assert!(platform.calls().is_empty());
}
