use jsom::runtime::array_storage::ElementKind;
use jsom::runtime::types::PropertyDescriptor;
use jsom::{JsError, JsObject, JsString, JsValue, PropertyKey, Realm, RealmConfig};

fn key(name: &str) -> PropertyKey {
    PropertyKey::from(name)
}

fn num(n: f64) -> JsValue {
    JsValue::Number(n)
}

fn construct(realm: &mut Realm, name: &str, args: &[JsValue]) -> JsObject {
    let ctor: JsValue = realm.get_builtin(name).unwrap().into();
    realm.construct(&ctor, args).unwrap().as_object().unwrap()
}

fn invoke(realm: &mut Realm, target: JsObject, name: &str, args: &[JsValue]) -> JsValue {
    realm.invoke(&target.into(), &key(name), args).unwrap()
}

fn length(realm: &mut Realm, obj: JsObject) -> f64 {
    realm.get(obj, &key("length")).unwrap().as_number().unwrap()
}

#[test]
fn objects_built_in_the_same_order_share_a_shape() {
    let mut realm = Realm::new();
    let a = realm.create_object();
    let b = realm.create_object();
    for obj in [a, b] {
        realm.set(obj, &key("x"), num(1.0), true).unwrap();
        realm.set(obj, &key("y"), num(2.0), true).unwrap();
    }
    assert!(realm.same_shape(a, b).unwrap());

    let c = realm.create_object();
    realm.set(c, &key("y"), num(2.0), true).unwrap();
    realm.set(c, &key("x"), num(1.0), true).unwrap();
    assert!(!realm.same_shape(a, c).unwrap());

    // Writing a new value does not change the shape.
    realm.set(b, &key("x"), JsValue::str("changed"), true).unwrap();
    assert!(realm.same_shape(a, b).unwrap());
}

#[test]
fn array_storage_only_widens() {
    let mut realm = Realm::new();
    let arr = realm.create_array(vec![num(1.0), num(2.0)]).unwrap();
    assert_eq!(realm.element_kind(arr).unwrap(), Some(ElementKind::Int));

    realm.set(arr, &PropertyKey::from(2u32), num(0.5), true).unwrap();
    assert_eq!(realm.element_kind(arr).unwrap(), Some(ElementKind::Double));

    realm.set(arr, &PropertyKey::from(3u32), JsValue::str("s"), true).unwrap();
    assert_eq!(realm.element_kind(arr).unwrap(), Some(ElementKind::Object));

    // Storing integers again does not narrow it back.
    for i in 0..4u32 {
        realm.set(arr, &PropertyKey::from(i), num(7.0), true).unwrap();
    }
    assert_eq!(realm.element_kind(arr).unwrap(), Some(ElementKind::Object));
}

#[test]
fn far_writes_go_sparse() {
    let config = RealmConfig {
        sparse_gap_threshold: 16,
        ..RealmConfig::default()
    };
    let mut realm = Realm::with_config(config);
    let arr = realm.create_array(vec![num(1.0)]).unwrap();
    realm.set(arr, &PropertyKey::from(1000u32), num(2.0), true).unwrap();
    assert_eq!(realm.element_kind(arr).unwrap(), Some(ElementKind::Sparse));
    assert_eq!(length(&mut realm, arr), 1001.0);
    assert!(!realm.has_property(arr, &PropertyKey::from(500u32)).unwrap());
}

#[test]
fn shrinking_length_stops_at_a_non_configurable_element() {
    let mut realm = Realm::new();
    let arr = realm
        .create_array(vec![num(0.0), num(1.0), num(2.0), num(3.0), num(4.0)])
        .unwrap();
    realm
        .define_own_property(
            arr,
            &PropertyKey::from(2u32),
            PropertyDescriptor::data(num(2.0), true, true, false),
            true,
        )
        .unwrap();

    let ok = realm
        .define_own_property(
            arr,
            &key("length"),
            PropertyDescriptor::value_only(num(0.0)),
            false,
        )
        .unwrap();
    assert!(!ok);
    assert_eq!(length(&mut realm, arr), 3.0);
    assert!(!realm.has_property(arr, &PropertyKey::from(3u32)).unwrap());
    assert!(realm.has_property(arr, &PropertyKey::from(2u32)).unwrap());

    let strict = realm.set(arr, &key("length"), num(1.0), true);
    assert!(matches!(strict, Err(JsError::TypeError(_))));
    assert_eq!(length(&mut realm, arr), 3.0);
}

#[test]
fn subarray_aliases_while_slice_copies() {
    let mut realm = Realm::new();
    let buffer = construct(&mut realm, "ArrayBuffer", &[num(8.0)]);
    let whole = construct(&mut realm, "Uint8Array", &[buffer.into()]);
    let view = invoke(&mut realm, whole, "subarray", &[num(4.0)]).as_object().unwrap();
    let copy = invoke(&mut realm, whole, "slice", &[num(4.0)]).as_object().unwrap();

    realm.set(whole, &PropertyKey::from(4u32), num(42.0), true).unwrap();
    assert_eq!(realm.get(view, &PropertyKey::from(0u32)).unwrap().as_number(), Some(42.0));
    assert_eq!(realm.get(copy, &PropertyKey::from(0u32)).unwrap().as_number(), Some(0.0));

    let view_buffer = realm.get(view, &key("buffer")).unwrap();
    let copy_buffer = realm.get(copy, &key("buffer")).unwrap();
    assert_eq!(view_buffer.as_object(), Some(buffer));
    assert_ne!(copy_buffer.as_object(), Some(buffer));

    // Out-of-range indices read as undefined and writes to them are dropped.
    assert!(realm.get(view, &PropertyKey::from(10u32)).unwrap().is_undefined());
    realm.set(view, &PropertyKey::from(10u32), num(1.0), true).unwrap();
    assert_eq!(length(&mut realm, view), 4.0);
}

#[test]
fn map_keys_use_same_value_zero() {
    let mut realm = Realm::new();
    let map = construct(&mut realm, "Map", &[]);
    realm.map_set(map, num(-0.0), JsValue::str("zero")).unwrap();
    assert_eq!(realm.map_get(map, &num(0.0)).unwrap().to_string(), "zero");

    realm.map_set(map, num(f64::NAN), JsValue::str("nan")).unwrap();
    assert_eq!(realm.map_get(map, &num(f64::NAN)).unwrap().to_string(), "nan");

    // A concatenated string finds the entry stored under the flat one.
    realm.map_set(map, JsValue::str("ab"), num(1.0)).unwrap();
    let rope = JsString::concat(&JsString::from_str("a"), &JsString::from_str("b"));
    assert_eq!(realm.map_get(map, &JsValue::String(rope)).unwrap().as_number(), Some(1.0));

    let size = realm.get(map, &key("size")).unwrap();
    assert_eq!(size.as_number(), Some(3.0));
}

#[test]
fn map_iteration_is_live() {
    let mut realm = Realm::new();
    let map = construct(&mut realm, "Map", &[]);
    for k in ["a", "b", "c"] {
        realm.map_set(map, JsValue::str(k), num(0.0)).unwrap();
    }
    let iterator = invoke(&mut realm, map, "keys", &[]).as_object().unwrap();
    let first = realm.builtin_iterator_next(iterator).unwrap();
    assert_eq!(first.value.to_string(), "a");

    realm.map_delete(map, &JsValue::str("b")).unwrap();
    realm.map_set(map, JsValue::str("d"), num(0.0)).unwrap();

    let mut rest = Vec::new();
    loop {
        let step = realm.builtin_iterator_next(iterator).unwrap();
        if step.done {
            break;
        }
        rest.push(step.value.to_string());
    }
    assert_eq!(rest, ["c", "d"]);

    // Exhausted iterators stay exhausted.
    realm.map_set(map, JsValue::str("e"), num(0.0)).unwrap();
    assert!(realm.builtin_iterator_next(iterator).unwrap().done);
}

#[test]
fn slice_keeps_every_representation() {
    let config = RealmConfig {
        sparse_gap_threshold: 8,
        ..RealmConfig::default()
    };
    let mut realm = Realm::with_config(config);
    let sparse = realm.create_array(vec![num(1.0)]).unwrap();
    realm.set(sparse, &PropertyKey::from(100u32), num(2.0), true).unwrap();
    let cases = [
        (realm.create_array(vec![]).unwrap(), ElementKind::Empty),
        (realm.create_array(vec![num(1.0), num(2.0)]).unwrap(), ElementKind::Int),
        (realm.create_array(vec![num(1.5), num(2.0)]).unwrap(), ElementKind::Double),
        (
            realm.create_array(vec![JsValue::str("x"), JsValue::Null]).unwrap(),
            ElementKind::Object,
        ),
        (sparse, ElementKind::Sparse),
    ];
    for (arr, kind) in cases {
        assert_eq!(realm.element_kind(arr).unwrap(), Some(kind));
        let copy = invoke(&mut realm, arr, "slice", &[]).as_object().unwrap();
        assert_eq!(realm.element_kind(copy).unwrap(), Some(kind), "{}", kind.name());
        assert_eq!(length(&mut realm, copy), length(&mut realm, arr));
        let original = realm.array_to_vec(arr).unwrap();
        let copied = realm.array_to_vec(copy).unwrap();
        assert_eq!(
            original.iter().map(ToString::to_string).collect::<Vec<_>>(),
            copied.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
    }
}

#[test]
fn freeze_is_idempotent_and_writes_depend_on_strictness() {
    let mut realm = Realm::new();
    let arr = realm.create_array(vec![num(1.0), num(2.0)]).unwrap();
    let object_ctor: JsValue = realm.get_builtin("Object").unwrap().into();
    realm.invoke(&object_ctor, &key("freeze"), &[arr.into()]).unwrap();
    realm.invoke(&object_ctor, &key("freeze"), &[arr.into()]).unwrap();
    assert!(realm.is_frozen(arr).unwrap());

    assert!(!realm.set(arr, &PropertyKey::from(0u32), num(9.0), false).unwrap());
    assert!(matches!(
        realm.set(arr, &PropertyKey::from(0u32), num(9.0), true),
        Err(JsError::TypeError(_))
    ));
    assert!(matches!(
        realm.invoke(&arr.into(), &key("push"), &[num(3.0)]),
        Err(JsError::TypeError(_))
    ));
    assert_eq!(realm.get(arr, &PropertyKey::from(0u32)).unwrap().as_number(), Some(1.0));
    assert_eq!(length(&mut realm, arr), 2.0);
}

#[test]
fn builtins_materialise_on_demand() {
    let mut realm = Realm::new();
    assert!(realm.builtin_names().contains(&"Float64Array"));
    assert!(!realm.is_materialized("Float64Array"));
    let global = realm.global();
    let ctor = realm.get(global, &key("Float64Array")).unwrap();
    assert!(realm.is_constructor(&ctor));
    assert!(realm.is_materialized("Float64Array"));
    assert!(!realm.is_overridden("Float64Array"));

    realm.set(global, &key("Float64Array"), JsValue::Null, true).unwrap();
    assert!(realm.is_overridden("Float64Array"));
}

#[test]
fn host_callbacks_drive_the_iterator_protocol() {
    let mut realm = Realm::new();
    let set = construct(&mut realm, "Set", &[]);
    for n in [3.0, 1.0, 3.0, 2.0] {
        invoke(&mut realm, set, "add", &[num(n)]);
    }
    let array_ctor: JsValue = realm.get_builtin("Array").unwrap().into();
    let arr = realm
        .invoke(&array_ctor, &key("from"), &[set.into()])
        .unwrap()
        .as_object()
        .unwrap();
    let doubled = realm.create_native_function("double", 1, |realm, _, args| {
        let n = realm.to_number(args.first().unwrap_or(&JsValue::Undefined))?;
        Ok(JsValue::Number(n * 2.0))
    });
    let mapped = invoke(&mut realm, arr, "map", &[doubled.into()]).as_object().unwrap();
    let joined = invoke(&mut realm, mapped, "join", &[]);
    assert_eq!(joined.to_string(), "6,2,4");
}
