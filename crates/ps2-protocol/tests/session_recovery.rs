//! Session lifecycle: exclusive hook ownership and the best-effort recovery
//! path.

use std::cell::RefCell;
use std::rc::Rc;

use ps2_protocol::regs;
use ps2_protocol::{Controller, DeviceSession, Error, PeripheralKind, RetryPolicy};
use ps2_sim::{SimHandle, SimInterruptBus};

type SharedController = Rc<RefCell<Controller<SimHandle>>>;
type SharedBus = Rc<RefCell<SimInterruptBus>>;

fn shared(handle: &SimHandle) -> (SharedController, SharedBus) {
    let controller = Rc::new(RefCell::new(Controller::with_policy(
        handle.clone(),
        RetryPolicy::instant(),
    )));
    let bus = Rc::new(RefCell::new(SimInterruptBus::new()));
    (controller, bus)
}

#[test]
fn subscribe_takes_the_documented_line_and_bit() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);

    let session = DeviceSession::subscribe(controller, bus.clone(), PeripheralKind::Mouse).unwrap();
    let hook = session.hook().unwrap();
    assert_eq!((hook.line, hook.bit), (12, 2));
    assert!(bus.borrow().is_subscribed(12));
}

#[test]
fn refused_exclusive_grant_surfaces_an_error() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);
    bus.borrow_mut().refuse_exclusive();

    match DeviceSession::subscribe(controller, bus, PeripheralKind::Keyboard) {
        Err(Error::Subscribe { line: 1 }) => {}
        other => panic!("expected Subscribe error, got {other:?}"),
    }
}

#[test]
fn reset_reenables_scanning_it_disabled() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);

    let mut session =
        DeviceSession::subscribe(controller, bus.clone(), PeripheralKind::Keyboard).unwrap();
    session.disable_scanning().unwrap();
    assert!(!handle.sim_ref().keyboard.scanning_enabled);

    session.reset();
    assert!(handle.sim_ref().keyboard.scanning_enabled);
    assert!(!bus.borrow().is_subscribed(1));
}

#[test]
fn reset_restores_the_config_byte_with_interrupts_on() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);

    let mut session =
        DeviceSession::subscribe(controller, bus, PeripheralKind::Keyboard).unwrap();
    // Turn first-port interrupts off for polling.
    session.write_config(0x44).unwrap();

    session.reset();
    let sim = handle.sim_ref();
    let last = *sim.config_writes.last().unwrap();
    assert_ne!(
        last & regs::CONFIG_FIRST_PORT_INTERRUPT,
        0,
        "restored config byte must have the interrupt bit forced on"
    );
    assert_eq!(sim.config, last);
}

#[test]
fn reset_is_idempotent() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);

    let mut session =
        DeviceSession::subscribe(controller, bus.clone(), PeripheralKind::Mouse).unwrap();
    session.disable_scanning().unwrap();
    session.reset();

    let commands_after_first = handle.sim_ref().mouse.received.clone();
    let unsubscribes_after_first = bus.borrow().unsubscribe_calls;

    session.reset();
    assert_eq!(
        handle.sim_ref().mouse.received,
        commands_after_first,
        "second reset must not issue further device commands"
    );
    assert_eq!(
        bus.borrow().unsubscribe_calls,
        unsubscribes_after_first,
        "second reset must not touch the notification system"
    );
}

#[test]
fn reset_survives_unsubscribe_failures() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);
    bus.borrow_mut().fail_unsubscribes(2);

    let mut session =
        DeviceSession::subscribe(controller, bus.clone(), PeripheralKind::Keyboard).unwrap();
    session.reset();

    // Two failed attempts, then one that lands: the hook ends up released.
    assert_eq!(bus.borrow().unsubscribe_calls, 3);
    assert!(!bus.borrow().is_subscribed(1));
}

#[test]
fn reset_gives_up_on_unsubscribe_after_the_retry_budget() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);
    bus.borrow_mut().fail_unsubscribes(10);

    let mut session =
        DeviceSession::subscribe(controller, bus.clone(), PeripheralKind::Keyboard).unwrap();
    session.reset();

    // Three attempts (the policy budget), all failing, none after.
    assert_eq!(bus.borrow().unsubscribe_calls, 3);
}

#[test]
fn reset_flushes_leftover_output() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);
    handle.sim().push_output(&[0xFA, 0x1C]);

    let mut session =
        DeviceSession::subscribe(controller, bus, PeripheralKind::Keyboard).unwrap();
    session.reset();
    assert_eq!(
        handle.sim_ref().output_len(),
        0,
        "stale bytes must not be inherited by the next consumer"
    );
}

#[test]
fn dropping_a_session_releases_the_hook() {
    let handle = SimHandle::new();
    let (controller, bus) = shared(&handle);

    {
        let _session =
            DeviceSession::subscribe(controller, bus.clone(), PeripheralKind::Mouse).unwrap();
        assert!(bus.borrow().is_subscribed(12));
    }
    assert!(
        !bus.borrow().is_subscribed(12),
        "drop must run the recovery path"
    );
}
