use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use arrow_orm::{InMemoryConnector, Instance, LifecycleEvent, ModelError};
use serde_json::json;

use crate::support::{capture, user_model, values, StubConnector};

fn clean_instance() -> Instance {
    Instance::stored("user", values(json!({"id": 1, "name": "ann"})))
}

fn deleted_instance(stub: &Arc<StubConnector>) -> Instance {
    let model = user_model(stub.clone());
    let instance = clean_instance();
    let (callback, rx) = capture();
    model.delete(&instance, callback);
    rx.try_recv().unwrap().unwrap();
    assert!(instance.is_deleted());
    instance
}

#[test]
fn save_on_deleted_fails_without_connector() {
    let stub = Arc::new(StubConnector::new());
    let model = user_model(stub.clone());
    let instance = deleted_instance(&stub);
    instance.set("name", "bob");
    let calls_before = stub.calls().len();
    let (callback, rx) = capture();

    model.save(&instance, callback);

    let err = rx.try_recv().unwrap().unwrap_err();
    assert!(err.is_lifecycle());
    assert_eq!(err, ModelError::AlreadyDeleted { model: "user".into() });
    assert_eq!(stub.calls().len(), calls_before);
    assert_eq!(stub.count("save"), 0);
}

#[test]
fn save_on_clean_instance_is_noop() {
    let stub = Arc::new(StubConnector::new());
    let model = user_model(stub.clone());
    let instance = clean_instance();
    let (callback, rx) = capture();

    model.save(&instance, callback);

    assert!(rx.try_recv().unwrap().unwrap().is_none());
    assert_eq!(stub.count("save"), 0);
}

#[test]
fn save_dirty_instance_clears_flag_and_publishes() {
    let stub = Arc::new(StubConnector::new());
    let model = user_model(stub.clone());
    let instance = clean_instance();
    instance.set("name", "bob");
    assert!(instance.is_dirty());

    let (tx, events) = mpsc::channel::<String>();
    instance.subscribe(LifecycleEvent::Save.as_str(), move |payload| {
        tx.send(payload).unwrap();
    });
    let (callback, rx) = capture();

    model.update(&instance, move |result| {
        // listeners have already seen the save
        callback((result, events.try_recv().ok()))
    });

    let (result, payload) = rx.try_recv().unwrap();
    let saved = result.unwrap().unwrap();
    assert!(saved.same(&instance));
    assert!(!instance.is_dirty());
    assert_eq!(stub.count("save"), 1);
    assert_eq!(payload.as_deref(), Some(r#"{"id":1,"name":"bob"}"#));
}

#[test]
fn save_listener_runs_before_callback_every_time() {
    let connector = Arc::new(InMemoryConnector::new());
    let model = user_model(connector);
    let (callback, rx) = capture();
    model.create(values(json!({"name": "ann"})), callback);
    let instance = rx.try_recv().unwrap().unwrap();

    let heard = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&heard);
    instance.subscribe(LifecycleEvent::Save.as_str(), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for round in 1..=200 {
        instance.set("name", format!("ann {}", round));
        let heard = Arc::clone(&heard);
        let (callback, rx) = capture();
        model.save(&instance, move |result| {
            callback((result.map(|saved| saved.is_some()), heard.load(Ordering::SeqCst)))
        });

        let (saved, seen) = rx.try_recv().unwrap();
        assert_eq!(saved, Ok(true));
        assert_eq!(seen, round);
    }
}

#[test]
fn save_untracked_values_always_reaches_connector() {
    let stub = Arc::new(StubConnector::new());
    let model = user_model(stub.clone());
    let (callback, rx) = capture();

    model.save(values(json!({"id": 9, "name": "raw"})), callback);

    let saved = rx.try_recv().unwrap().unwrap().unwrap();
    assert!(!saved.is_dirty());
    assert_eq!(saved.get("name"), Some(json!("raw")));
    assert_eq!(stub.count("save"), 1);
}

#[test]
fn new_instance_is_saved() {
    let stub = Arc::new(StubConnector::new());
    let model = user_model(stub.clone());
    let instance = model.instance(values(json!({"name": "new"})));
    assert_eq!(instance.get("status"), Some(json!("active")));
    let (callback, rx) = capture();

    model.save(&instance, callback);

    assert!(rx.try_recv().unwrap().unwrap().is_some());
    assert!(!instance.is_dirty());
    assert_eq!(stub.count("save"), 1);
}

#[test]
fn delete_twice_fails_second_time() {
    let stub = Arc::new(StubConnector::new());
    let model = user_model(stub.clone());
    let instance = clean_instance();
    let (tx, events) = mpsc::channel::<String>();
    instance.subscribe(LifecycleEvent::Delete.as_str(), move |payload| {
        let _ = tx.send(payload);
    });

    let (first, first_rx) = capture();
    model.remove(&instance, move |result| first((result, events.try_recv().is_ok())));
    let (result, heard) = first_rx.try_recv().unwrap();
    let deleted = result.unwrap().unwrap();
    assert!(deleted.same(&instance));
    assert!(instance.is_deleted());
    assert!(heard);

    let (second, second_rx) = capture();
    model.delete(&instance, second);
    let err = second_rx.try_recv().unwrap().unwrap_err();
    assert!(err.is_lifecycle());
    assert_eq!(stub.count("delete"), 1);
}

#[test]
fn failed_delete_leaves_instance_usable() {
    let connector = Arc::new(InMemoryConnector::new());
    let model = user_model(connector);
    let instance = clean_instance();
    let (callback, rx) = capture();

    // unknown to the in-memory store, so nothing is deleted
    model.delete(&instance, callback);

    assert!(rx.try_recv().unwrap().unwrap().is_none());
    assert!(!instance.is_deleted());
}

#[test]
fn delete_all_does_not_touch_held_instances() {
    let connector = Arc::new(InMemoryConnector::new());
    let model = user_model(connector.clone());
    let (callback, rx) = capture();
    model.create(values(json!({"name": "kept"})), callback);
    let held = rx.try_recv().unwrap().unwrap();

    let (callback, rx) = capture();
    model.remove_all(callback);

    assert_eq!(rx.try_recv().unwrap().unwrap(), 1);
    assert_eq!(connector.count("user"), 0);
    assert!(!held.is_deleted());
}

#[test]
fn full_lifecycle_against_memory_connector() {
    let connector = Arc::new(InMemoryConnector::new());
    let model = user_model(connector.clone());

    let (callback, rx) = capture();
    model.create(values(json!({"name": "ann"})), callback);
    let instance = rx.try_recv().unwrap().unwrap();
    let id = instance.id().unwrap();

    instance.set("name", "anne");
    let (callback, rx) = capture();
    model.save(&instance, callback);
    rx.try_recv().unwrap().unwrap();
    assert_eq!(connector.version("user", &id), Some(2));

    let (callback, rx) = capture();
    model.find_one(id.clone(), callback);
    let loaded = rx.try_recv().unwrap().unwrap().unwrap();
    assert_eq!(loaded.get("name"), Some(json!("anne")));

    let (callback, rx) = capture();
    model.delete(&instance, callback);
    rx.try_recv().unwrap().unwrap();
    assert!(instance.is_deleted());

    let (callback, rx) = capture();
    model.find_one(id, callback);
    assert!(rx.try_recv().unwrap().unwrap().is_none());
}
