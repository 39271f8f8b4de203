// tests/lever_scenarios.rs
use glam::{Quat, Vec2, Vec3};
use lever_actuator::{
    EventKind, HardwareOutputAdapter, HingeJoint, JointParams, Lever, LeverConfig, LeverError,
    LeverEvent, PointerInput, TickInput,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

const DT: f32 = 1.0 / 60.0;

fn kinds(events: &[LeverEvent]) -> Vec<EventKind> {
    events.iter().map(LeverEvent::kind).collect()
}

fn record(lever: &mut Lever, kinds: &[EventKind]) -> Rc<RefCell<Vec<LeverEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in kinds {
        let log = log.clone();
        lever.on(*kind, move |event| log.borrow_mut().push(*event));
    }
    log
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct JointLog {
    configured: Vec<JointParams>,
    angle: Option<f32>,
    impulses: Vec<f32>,
}

struct FakeHinge(Rc<RefCell<JointLog>>);

impl HingeJoint for FakeHinge {
    fn configure(&mut self, params: &JointParams) {
        self.0.borrow_mut().configured.push(*params);
    }

    fn reported_angle(&self) -> Option<f32> {
        self.0.borrow().angle
    }

    fn apply_torque_impulse(&mut self, torque: f32) {
        self.0.borrow_mut().impulses.push(torque);
    }
}

#[test]
fn test_set_angle_is_clamped() {
    let mut lever = Lever::new(LeverConfig::external().with_range(-60.0, 60.0, 0.0)).unwrap();
    let moved = record(&mut lever, &[EventKind::Moved]);

    assert_eq!(lever.set_angle(90.0).unwrap(), 60.0);
    assert_eq!(lever.angle(), 60.0);
    // External writes always publish, even when clamped to the same value.
    assert_eq!(lever.set_angle(75.0).unwrap(), 60.0);
    assert_eq!(*moved.borrow(), vec![LeverEvent::Moved(60.0), LeverEvent::Moved(60.0)]);
}

#[test]
fn test_zone_walkthrough() {
    let mut lever = Lever::new(LeverConfig::external().with_zone(40.0, 60.0)).unwrap();
    let zone_log = record(&mut lever, &[EventKind::Activated, EventKind::Deactivated]);

    let mut per_tick = Vec::new();
    for angle in [0.0, 50.0, 70.0, 20.0] {
        lever.set_angle(angle).unwrap();
        let report = lever.tick(&TickInput::new(DT));
        let edges: Vec<_> = report
            .events
            .iter()
            .filter(|e| matches!(e, LeverEvent::Activated | LeverEvent::Deactivated))
            .copied()
            .collect();
        per_tick.push(edges);
    }

    // 70 is clamped to 60, which is still inside the zone.
    assert_eq!(
        per_tick,
        vec![vec![], vec![LeverEvent::Activated], vec![], vec![LeverEvent::Deactivated]]
    );
    assert_eq!(
        *zone_log.borrow(),
        vec![LeverEvent::Activated, LeverEvent::Deactivated]
    );
}

#[test]
fn test_zone_walkthrough_wide_range() {
    let config = LeverConfig::external()
        .with_range(-90.0, 90.0, 0.0)
        .with_zone(40.0, 60.0);
    let mut lever = Lever::new(config).unwrap();

    let mut edges = Vec::new();
    for angle in [0.0, 50.0, 70.0, 20.0] {
        lever.set_angle(angle).unwrap();
        let report = lever.tick(&TickInput::new(DT));
        for event in report.events {
            if matches!(event, LeverEvent::Activated | LeverEvent::Deactivated) {
                edges.push((event, angle));
            }
        }
    }

    assert_eq!(
        edges,
        vec![(LeverEvent::Activated, 50.0), (LeverEvent::Deactivated, 70.0)]
    );
    assert!(!lever.is_activated());
}

#[test]
fn test_disabled_zone_never_latches() {
    let mut lever = Lever::new(LeverConfig::external().without_zone()).unwrap();
    let log = record(&mut lever, &[EventKind::Activated, EventKind::Deactivated]);

    for angle in [0.0, 40.0, 50.0, 60.0, 70.0, 20.0, -60.0] {
        lever.set_angle(angle).unwrap();
        let report = lever.tick(&TickInput::new(DT));
        assert!(
            !report
                .events
                .iter()
                .any(|e| matches!(e, LeverEvent::Activated | LeverEvent::Deactivated))
        );
        assert!(!lever.is_activated());
    }
    assert!(log.borrow().is_empty());
}

#[test]
fn test_toggle_twice_returns_to_start() {
    let mut lever = Lever::new(LeverConfig::toggle(-45.0, 45.0).without_proximity()).unwrap();
    let log = record(
        &mut lever,
        &[
            EventKind::Toggled,
            EventKind::Activated,
            EventKind::Deactivated,
        ],
    );
    assert_eq!(lever.angle(), 45.0);

    let first = lever.tick(&TickInput::new(DT).with_interact(true));
    assert_eq!(
        kinds(&first.events)[..2],
        [EventKind::Toggled, EventKind::Activated]
    );
    // The angle eases toward the target instead of jumping.
    assert!(first.angle < 45.0 && first.angle > -45.0);

    for _ in 0..600 {
        lever.tick(&TickInput::new(DT));
    }
    assert!((lever.angle() + 45.0).abs() <= 0.011);
    assert!(lever.is_activated());

    lever.tick(&TickInput::new(DT).with_interact(true));
    for _ in 0..600 {
        lever.tick(&TickInput::new(DT));
    }
    assert!((lever.angle() - 45.0).abs() <= 0.011);
    assert!(!lever.is_activated());

    assert_eq!(
        kinds(&log.borrow()),
        vec![
            EventKind::Toggled,
            EventKind::Activated,
            EventKind::Toggled,
            EventKind::Deactivated
        ]
    );
}

#[test]
fn test_toggle_publishes_before_settling() {
    let mut lever = Lever::new(LeverConfig::toggle(-45.0, 45.0).without_proximity()).unwrap();
    let log = record(&mut lever, &[EventKind::Activated, EventKind::Deactivated]);

    assert!(lever.toggle().unwrap());
    assert!(!lever.toggle().unwrap());
    assert_eq!(
        *log.borrow(),
        vec![LeverEvent::Activated, LeverEvent::Deactivated]
    );
    assert_eq!(lever.angle(), 45.0);
}

#[test]
fn test_set_state_only_toggles_on_change() {
    let mut lever = Lever::new(LeverConfig::toggle(-45.0, 45.0)).unwrap();
    let toggles = record(&mut lever, &[EventKind::Toggled]);

    assert!(!lever.set_state(false).unwrap());
    assert!(lever.set_state(true).unwrap());
    assert!(lever.set_state(true).unwrap());
    assert_eq!(toggles.borrow().len(), 1);
}

#[test]
fn test_toggle_respects_proximity() {
    let mut lever = Lever::new(LeverConfig::toggle(-45.0, 45.0)).unwrap();
    assert_eq!(lever.interaction_radius(), Some(3.0));

    // Actor missing: denied.
    let report = lever.tick(&TickInput::new(DT).with_interact(true));
    assert!(report.events.is_empty());
    assert!(!lever.is_in_range());

    // Just out of reach.
    let far = TickInput::new(DT)
        .with_actor(Some(Vec3::new(3.5, 0.0, 0.0)))
        .with_interact(true);
    assert!(lever.tick(&far).events.is_empty());

    // Exactly on the boundary.
    let mut actors = HashMap::new();
    actors.insert("Player".to_string(), Vec3::new(0.0, 0.0, 3.0));
    let near = TickInput::new(DT)
        .locate_actor(&actors, lever.actor_tag())
        .with_interact(true);
    let report = lever.tick(&near);
    assert!(report.proximity.in_range);
    assert_eq!(
        kinds(&report.events)[..2],
        [EventKind::Toggled, EventKind::Activated]
    );
}

#[test]
fn test_grab_drag_release_and_zone() {
    let mut lever = Lever::new(LeverConfig::interactive()).unwrap();
    let near = Some(Vec3::new(1.0, 0.0, 0.0));

    // No player in the scene: the grab never starts.
    let report = lever.tick(&TickInput::new(DT).with_pointer(PointerInput::press()));
    assert!(report.events.is_empty());
    assert!(!lever.is_grabbed());

    let report = lever.tick(
        &TickInput::new(DT)
            .with_actor(near)
            .with_pointer(PointerInput::press()),
    );
    assert_eq!(kinds(&report.events), vec![EventKind::Grabbed]);
    assert!(lever.is_grabbed());

    let report = lever.tick(&TickInput::new(DT).with_actor(near).dragging(25.0));
    assert_eq!(report.angle, 50.0);
    assert_eq!(
        report.events,
        vec![LeverEvent::Moved(50.0), LeverEvent::Activated]
    );

    let report = lever.tick(
        &TickInput::new(0.1)
            .with_actor(near)
            .with_pointer(PointerInput::release()),
    );
    assert_eq!(
        kinds(&report.events),
        vec![
            EventKind::Released,
            EventKind::Moved,
            EventKind::Deactivated
        ]
    );
    let expected = 50.0 * (-0.3f32).exp();
    assert!((report.angle - expected).abs() < 1e-3);
    assert!(!lever.is_grabbed());
}

#[test]
fn test_out_of_reach_freezes_drag() {
    let mut lever = Lever::new(LeverConfig::interactive()).unwrap();
    let near = Some(Vec3::new(1.0, 0.0, 0.0));
    let far = Some(Vec3::new(10.0, 0.0, 0.0));

    lever.tick(
        &TickInput::new(DT)
            .with_actor(near)
            .with_pointer(PointerInput::press()),
    );
    lever.tick(&TickInput::new(DT).with_actor(near).dragging(5.0));
    assert_eq!(lever.angle(), 10.0);

    let report = lever.tick(&TickInput::new(DT).with_actor(far).dragging(5.0));
    assert!(report.events.is_empty());
    assert_eq!(lever.angle(), 10.0);
    assert!(lever.is_grabbed());
}

#[test]
fn test_slow_drag_still_publishes_moves() {
    let mut lever = Lever::new(LeverConfig::default().without_return()).unwrap();
    let moved = record(&mut lever, &[EventKind::Moved]);
    lever.tick(&TickInput::new(DT).with_pointer(PointerInput::press()));

    // 0.008 degrees per tick, below the change threshold on its own.
    for _ in 0..1000 {
        lever.tick(&TickInput::new(DT).dragging(0.004));
    }
    assert!((lever.angle() - 8.0).abs() < 1e-2);

    let moved = moved.borrow();
    assert!(moved.len() >= 400, "only {} moves published", moved.len());
    let Some(LeverEvent::Moved(last)) = moved.last().copied() else {
        panic!("expected a trailing move");
    };
    assert!((lever.angle() - last).abs() <= 0.011);
}

#[test]
fn test_press_without_held_keeps_grab() {
    let mut lever = Lever::new(LeverConfig::default().without_return()).unwrap();
    let edge_only = PointerInput {
        pressed: true,
        over_lever: true,
        ..Default::default()
    };

    let report = lever.tick(&TickInput::new(DT).with_pointer(edge_only));
    assert_eq!(kinds(&report.events), vec![EventKind::Grabbed]);
    assert!(lever.is_grabbed());

    lever.tick(&TickInput::new(DT).dragging(5.0));
    assert_eq!(lever.angle(), 10.0);

    let report = lever.tick(&TickInput::new(DT).with_pointer(PointerInput::release()));
    assert_eq!(kinds(&report.events), vec![EventKind::Released]);
}

#[test]
fn test_return_to_rest_converges() {
    let mut lever = Lever::new(LeverConfig::default()).unwrap();
    lever.tick(&TickInput::new(DT).with_pointer(PointerInput::press()));
    lever.tick(&TickInput::new(DT).dragging(30.0));
    assert_eq!(lever.angle(), 60.0);

    lever.tick(&TickInput::new(DT).with_pointer(PointerInput::release()));

    let mut previous = lever.angle().abs();
    let mut settled_at = None;
    for i in 0..2000 {
        let report = lever.tick(&TickInput::new(DT));
        let distance = report.angle.abs();
        assert!(distance <= previous + 1e-6);
        previous = distance;
        if distance <= 0.1 {
            settled_at = Some(i);
            break;
        }
    }
    assert!(settled_at.is_some());

    // Once settled, the lever goes quiet.
    for _ in 0..10 {
        assert!(lever.tick(&TickInput::new(DT)).events.is_empty());
    }
}

#[test]
fn test_mouse_drag_requires_hit() {
    let mut lever = Lever::new(LeverConfig::mouse_drag()).unwrap();

    let miss = PointerInput::press().with_over_lever(false);
    lever.tick(&TickInput::new(DT).with_pointer(miss));
    assert!(!lever.is_grabbed());

    lever.tick(&TickInput::new(DT).with_pointer(PointerInput::press()));
    assert!(lever.is_grabbed());

    // Inverted vertical axis: moving the pointer up pulls the lever back.
    lever.tick(&TickInput::new(DT).with_pointer(PointerInput::hold(Vec2::new(3.0, 10.0))));
    assert_eq!(lever.angle(), -10.0);

    // No auto return: the lever stays where it was let go.
    lever.tick(&TickInput::new(DT).with_pointer(PointerInput::release()));
    for _ in 0..100 {
        lever.tick(&TickInput::new(DT));
    }
    assert_eq!(lever.angle(), -10.0);
    assert!((lever.normalized_angle() - (35.0 / 90.0)).abs() < 1e-6);
}

#[test]
fn test_dropping_grabbed_lever_flushes_release() {
    let mut lever = Lever::new(LeverConfig::default()).unwrap();
    let log = record(&mut lever, &[EventKind::Released]);
    lever.tick(&TickInput::new(DT).with_pointer(PointerInput::press()));
    assert!(lever.is_grabbed());

    drop(lever);
    assert_eq!(*log.borrow(), vec![LeverEvent::Released]);
}

#[test]
fn test_physics_lever_reads_joint() {
    let log = Rc::new(RefCell::new(JointLog::default()));
    let mut lever =
        Lever::with_joint(LeverConfig::physical(), Box::new(FakeHinge(log.clone()))).unwrap();

    let initial = log.borrow().configured[0];
    assert_eq!(initial.min_limit, -60.0);
    assert_eq!(initial.max_limit, 60.0);
    assert_eq!(initial.stiffness, 50.0);
    assert_eq!(initial.damping, 10.0);
    assert_eq!(initial.target_angle, 0.0);
    assert!(initial.spring_enabled);

    // Joint not simulated yet: nothing happens.
    assert!(lever.tick(&TickInput::new(DT)).events.is_empty());

    log.borrow_mut().angle = Some(50.0);
    let report = lever.tick(&TickInput::new(DT));
    assert_eq!(
        report.events,
        vec![LeverEvent::Moved(50.0), LeverEvent::Activated]
    );

    log.borrow_mut().angle = Some(50.005);
    assert!(lever.tick(&TickInput::new(DT)).events.is_empty());

    log.borrow_mut().angle = Some(30.0);
    let report = lever.tick(&TickInput::new(DT));
    assert_eq!(
        report.events,
        vec![LeverEvent::Moved(30.0), LeverEvent::Deactivated]
    );
}

#[test]
fn test_physics_slow_drift_publishes_moves() {
    let log = Rc::new(RefCell::new(JointLog::default()));
    let mut lever =
        Lever::with_joint(LeverConfig::physical(), Box::new(FakeHinge(log.clone()))).unwrap();
    let moved = record(&mut lever, &[EventKind::Moved]);

    for i in 1..=6000 {
        log.borrow_mut().angle = Some(i as f32 * 0.005);
        lever.tick(&TickInput::new(DT));
    }
    assert!((lever.angle() - 30.0).abs() < 1e-3);

    let moved = moved.borrow();
    assert!(moved.len() >= 1000, "only {} moves published", moved.len());
    let Some(LeverEvent::Moved(last)) = moved.last().copied() else {
        panic!("expected a trailing move");
    };
    assert!((lever.angle() - last).abs() <= 0.011);
}

#[test]
fn test_physics_setters_keep_limits() {
    let log = Rc::new(RefCell::new(JointLog::default()));
    let config = LeverConfig::physical().with_range(-30.0, 80.0, 10.0);
    let mut lever = Lever::with_joint(config, Box::new(FakeHinge(log.clone()))).unwrap();

    lever.set_spring_force(120.0).unwrap();
    lever.set_damping(4.0).unwrap();
    lever.set_spring_enabled(false).unwrap();
    lever.apply_torque_impulse(2.5).unwrap();

    let log = log.borrow();
    assert_eq!(log.configured.len(), 4);
    let last = log.configured[3];
    assert_eq!((last.min_limit, last.max_limit), (-30.0, 80.0));
    assert_eq!(last.target_angle, 10.0);
    assert_eq!(last.stiffness, 120.0);
    assert_eq!(last.damping, 4.0);
    assert!(!last.spring_enabled);
    assert_eq!(log.impulses, vec![2.5]);
}

#[test]
fn test_physics_lever_needs_joint() {
    assert!(matches!(
        Lever::new(LeverConfig::physical()),
        Err(LeverError::MissingJoint)
    ));

    let log = Rc::new(RefCell::new(JointLog::default()));
    assert!(matches!(
        Lever::with_joint(LeverConfig::default(), Box::new(FakeHinge(log))),
        Err(LeverError::DriveMismatch { .. })
    ));
}

#[test]
fn test_operations_check_drive() {
    let mut lever = Lever::new(LeverConfig::toggle(-45.0, 45.0)).unwrap();
    assert!(matches!(
        lever.set_angle(10.0),
        Err(LeverError::DriveMismatch {
            operation: "set_angle",
            ..
        })
    ));
    assert!(lever.set_spring_force(1.0).is_err());
    assert!(!lever.release());

    let mut external = Lever::new(LeverConfig::external()).unwrap();
    assert!(external.toggle().is_err());
    assert!(external.set_state(true).is_err());
}

#[test]
fn test_hardware_output_follows_angle() {
    let buffer = SharedBuffer::default();
    let mut lever = Lever::new(LeverConfig::external().with_range(-45.0, 45.0, 0.0)).unwrap();
    let stream: Box<dyn Write + Send> = Box::new(buffer.clone());
    lever.attach_output(HardwareOutputAdapter::new(stream));

    let mut sent = Vec::new();
    for angle in [-45.0, 45.0, 0.0] {
        lever.set_angle(angle).unwrap();
        sent.push(lever.tick(&TickInput::new(DT)).output);
    }
    assert_eq!(sent, vec![Some(0), Some(180), Some(90)]);
    assert_eq!(buffer.contents(), "0\n180\n90\n");

    lever.detach();
    assert!(lever.is_detached());
    assert!(lever.output().is_none());
    assert_eq!(lever.tick(&TickInput::new(DT)).output, None);
    lever.detach();
    assert_eq!(buffer.contents(), "0\n180\n90\n");
}

#[test]
fn test_failing_observer_does_not_block_others() {
    let mut lever = Lever::new(LeverConfig::external()).unwrap();
    lever.subscribe(EventKind::Moved, |_| Err("display offline".into()));
    let log = record(&mut lever, &[EventKind::Moved]);

    lever.set_angle(12.0).unwrap();
    assert_eq!(*log.borrow(), vec![LeverEvent::Moved(12.0)]);
}

#[test]
fn test_unsubscribed_observer_is_silent() {
    let mut lever = Lever::new(LeverConfig::external()).unwrap();
    let hits = Rc::new(RefCell::new(0));
    let counter = hits.clone();
    let id = lever.on(EventKind::Moved, move |_| *counter.borrow_mut() += 1);

    lever.set_angle(5.0).unwrap();
    assert!(lever.unsubscribe(id));
    lever.set_angle(6.0).unwrap();
    assert_eq!(*hits.borrow(), 1);
}

#[test]
fn test_pose_rotates_about_axis() {
    let mut lever = Lever::new(LeverConfig::external().with_range(-90.0, 90.0, 0.0)).unwrap();
    lever.set_angle(90.0).unwrap();
    let pose = lever.tick(&TickInput::new(DT)).pose;

    assert_eq!(pose.axis, Vec3::X);
    let up = pose.rotation() * Vec3::Y;
    assert!(up.abs_diff_eq(Vec3::Z, 1e-5));

    let base = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
    let composed = pose.compose(base) * Vec3::Y;
    assert!(composed.abs_diff_eq(base * Vec3::Z, 1e-5));
}
