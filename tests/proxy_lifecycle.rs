use glam::Vec3;
use kestrel_array_proxy::events::Listener;
use kestrel_array_proxy::{
    ArrayEditing, EditorOutcome, Element, ElementType, ProxyError, RecordData, RecordingAdapter,
    TubePoint, UserId, Value, WidgetKind,
};

#[test]
fn unsupported_kind_falls_back_to_the_stock_control() {
    let mut editing = ArrayEditing::<RecordingAdapter>::default();
    let owner = editing.world_mut().spawn_object("Rig");
    let array = editing.world_mut().create_array(
        owner,
        "Bindings",
        ElementType::opaque("BoneBinding"),
        vec![Element::Composite(vec![Value::Int(3)])],
    );
    let outcome = editing.open_editor(array, UserId::new(1)).expect("open editor");
    let EditorOutcome::Unsupported { widget, error, .. } = outcome else {
        panic!("expected the fallback control, got {outcome:?}");
    };
    assert_eq!(error, ProxyError::UnsupportedElementKind { type_name: "BoneBinding".to_string() });
    assert_eq!(
        editing.adapter().widget(widget),
        Some(&WidgetKind::ArrayControl { array, label: "Bindings".to_string() })
    );
    assert_eq!((editing.registry().created_count(), editing.registry().destroyed_count()), (1, 1));
    assert!(editing.world().children_of(editing.world().assets_root()).is_empty());
    assert_eq!(editing.world().list_count(), 0);
}

#[test]
fn containers_are_named_per_array_and_field() {
    let mut editing = ArrayEditing::<RecordingAdapter>::default();
    let owner = editing.world_mut().spawn_object("Tube");
    let points =
        editing.world_mut().create_typed_array(owner, "Points", [TubePoint::new(Vec3::ZERO, 1.0)]);
    let radii = editing.world_mut().create_typed_array(owner, "Radii", [1.0_f32]);
    editing.open_editor(points, UserId::new(1)).expect("points");
    editing.open_editor(radii, UserId::new(1)).expect("radii");

    let root = editing.world().assets_root();
    let mut names: Vec<String> = editing
        .world()
        .children_of(root)
        .iter()
        .filter_map(|child| editing.world().object_name(*child).map(str::to_string))
        .collect();
    names.sort();
    let expected =
        [format!("Points-{}-Proxy", points.raw()), format!("Radii-{}-Proxy", radii.raw())];
    assert_eq!(names, expected);
}

#[test]
fn tube_points_swap_roles_in_the_mirror() {
    let mut editing = ArrayEditing::<RecordingAdapter>::default();
    let owner = editing.world_mut().spawn_object("Tube");
    let point = TubePoint::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
    let array = editing.world_mut().create_typed_array(owner, "Points", [point]);
    let outcome = editing.open_editor(array, UserId::new(1)).expect("open");
    let EditorOutcome::Proxied { list, .. } = outcome else {
        panic!("tube points are proxied");
    };
    assert_eq!(
        editing.world().list(list).expect("list").data(0),
        Some(&RecordData::point(0.5, Vec3::new(1.0, 2.0, 3.0)))
    );
    editing
        .edit_list(list, |mirror| mirror.set_data(0, RecordData::point(0.75, Vec3::Y)))
        .expect("edit point");
    assert_eq!(
        editing.world().array(array).expect("array").get(0),
        Some(&Element::TubePoint(TubePoint::new(Vec3::Y, 0.75)))
    );
}

#[test]
fn destroying_the_owner_cleans_up_everything() {
    let mut editing = ArrayEditing::<RecordingAdapter>::default();
    let owner = editing.world_mut().spawn_object("Emitter");
    let child = editing.world_mut().spawn_child(owner, "Nozzle");
    let target = editing.world_mut().spawn_object("Target");
    let array = editing.world_mut().create_typed_array(child, "Targets", [target]);
    let outcome = editing.open_editor(array, UserId::new(1)).expect("open");
    let EditorOutcome::Proxied { widget, list, .. } = outcome else {
        panic!("reference arrays are proxied");
    };
    let seeded = editing.world().list(list).expect("list").data(0).cloned();
    assert_eq!(seeded, Some(RecordData::Reference(Some(target))));

    // Destroying the ancestor takes the child and its array with it.
    editing.destroy_object(owner);
    assert!(editing.world().array(array).is_none());
    assert!(editing.registry().is_empty());
    assert_eq!(editing.world().list_count(), 0);
    assert!(editing.monitor().is_empty());
    assert!(!editing.adapter().is_live(widget));
    assert!(editing.world().object_exists(target));
}

#[test]
fn viewer_disconnect_ends_the_session_and_reopen_keeps_one_resync() {
    let mut editing = ArrayEditing::<RecordingAdapter>::default();
    let owner = editing.world_mut().spawn_object("Owner");
    let array = editing.world_mut().create_typed_array(owner, "Values", [1_i32, 2]);
    let viewer = UserId::new(4);
    let outcome = editing.open_editor(array, viewer).expect("open");
    let EditorOutcome::Proxied { widget, .. } = outcome else {
        panic!("int arrays are proxied");
    };

    editing.disconnect_user(viewer);
    assert!(!editing.adapter().is_live(widget));
    assert!(editing.registry().is_empty());
    assert!(editing.monitor().is_empty());

    let reopened = editing.open_editor(array, UserId::new(5)).expect("reopen");
    assert!(matches!(reopened, EditorOutcome::Proxied { newly_created: true, .. }));
    let resync_listeners =
        editing.world().array(array).expect("array").changed().count(Listener::ArrayResync);
    assert_eq!(resync_listeners, 1);

    editing
        .edit_array(array, |values| values.set(1, Element::Value(Value::Int(7))))
        .expect("edit");
    assert_eq!(editing.stats().resyncs, 1, "one listener, one resync");
    assert!(editing.verify_mirror(array).expect("verify"));
}

#[test]
fn stale_list_events_after_teardown_are_absorbed() {
    let mut editing = ArrayEditing::<RecordingAdapter>::default();
    let owner = editing.world_mut().spawn_object("Owner");
    let array = editing.world_mut().create_typed_array(owner, "Values", [1_i32]);
    let viewer = UserId::new(1);
    let outcome = editing.open_editor(array, viewer).expect("open");
    let EditorOutcome::Proxied { list, .. } = outcome else {
        panic!("int arrays are proxied");
    };
    // The viewer leaves before an already-made list edit is dispatched.
    editing.world_mut().disconnect_user(viewer);
    editing.world_mut().list_mut(list).expect("list").add(RecordData::Field(Value::Int(2)));
    editing.update();

    assert!(editing.registry().is_empty());
    assert_eq!(editing.world().array(array).expect("array").count(), 1);
    assert_eq!(editing.stats().array_writes, 0);
    assert_eq!(editing.stats().lookup_failures, 1);
}
