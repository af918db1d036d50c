//! Integration test: generation-tagged handle tables

use std::sync::Arc;
use std::thread;

use wxr_core::handle_table::kind_of;
use wxr_core::{HandleTable, ObjectKind, XrError};

#[test]
fn test_register_and_resolve() {
    let table = HandleTable::new(ObjectKind::Session);
    let a = table.register("a".to_string());
    let b = table.register("b".to_string());

    assert_ne!(a, 0);
    assert_ne!(a, b);
    assert_eq!(kind_of(a), Some(ObjectKind::Session));
    assert_eq!(*table.resolve(a).unwrap(), "a");
    assert_eq!(*table.resolve(b).unwrap(), "b");
    assert_eq!(table.len(), 2);

    let mut handles = table.handles();
    handles.sort_unstable();
    let mut expected = vec![a, b];
    expected.sort_unstable();
    assert_eq!(handles, expected);
}

#[test]
fn test_null_and_foreign_handles() {
    let sessions: HandleTable<u32> = HandleTable::new(ObjectKind::Session);
    let spaces: HandleTable<u32> = HandleTable::new(ObjectKind::Space);
    let space = spaces.register(7);

    assert!(matches!(sessions.resolve(0), Err(XrError::HandleInvalid(_))));
    assert!(matches!(sessions.resolve(space), Err(XrError::HandleInvalid(_))));
    assert!(matches!(sessions.unregister(space), Err(XrError::HandleInvalid(_))));
    assert!(matches!(
        spaces.resolve(0xdead_beef),
        Err(XrError::HandleInvalid(_))
    ));
    assert_eq!(*spaces.resolve(space).unwrap(), 7);
}

#[test]
fn test_stale_handle_after_slot_reuse() {
    let table = HandleTable::new(ObjectKind::Swapchain);
    let first = table.register(1u32);
    table.unregister(first).unwrap();
    assert!(table.is_empty());

    let second = table.register(2u32);
    // Same slot, newer generation.
    assert_eq!(first as u32, second as u32);
    assert_ne!(first, second);

    assert!(matches!(table.resolve(first), Err(XrError::HandleInvalid(_))));
    assert!(matches!(table.unregister(first), Err(XrError::HandleInvalid(_))));
    assert_eq!(*table.resolve(second).unwrap(), 2);
}

#[test]
fn test_double_unregister_fails() {
    let table = HandleTable::new(ObjectKind::Instance);
    let handle = table.register(());
    assert!(table.unregister(handle).is_ok());
    assert!(matches!(table.unregister(handle), Err(XrError::HandleInvalid(_))));
    assert!(!table.contains(handle));
}

#[test]
fn test_resolved_object_outlives_unregister() {
    let table = HandleTable::new(ObjectKind::Space);
    let handle = table.register(vec![1, 2, 3]);
    let held = table.resolve(handle).unwrap();

    let removed = table.unregister(handle).unwrap();
    drop(removed);
    assert_eq!(*held, vec![1, 2, 3]);
    assert_eq!(Arc::strong_count(&held), 1);
}

#[test]
fn test_register_with_sees_own_handle() {
    let table = HandleTable::new(ObjectKind::Instance);
    let handle = table.register_with(|handle| Arc::new(handle));
    assert_eq!(*table.resolve(handle).unwrap(), handle);
}

#[test]
fn test_concurrent_register_unregister() {
    let table = Arc::new(HandleTable::new(ObjectKind::Swapchain));
    let workers: Vec<_> = (0..8)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..500u32 {
                    let handle = table.register(t * 1000 + i);
                    assert_eq!(*table.resolve(handle).unwrap(), t * 1000 + i);
                    table.unregister(handle).unwrap();
                    assert!(table.resolve(handle).is_err());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert!(table.is_empty());
}
