//! Entity directory access from a `Simulation` and from handlers.

use eventide::entity::EntityError;
use eventide::simulation::SimInit;

#[derive(Debug, Default, PartialEq)]
struct Queue {
    length: usize,
    peak: usize,
}

#[test]
fn entities_registration() {
    let mut simu = SimInit::new().init().unwrap();

    simu.add_entity("queue", Queue::default()).unwrap();
    simu.add_entity("server", "idle".to_owned()).unwrap();

    assert!(simu.has_entity("queue"));
    assert!(!simu.has_entity("missing"));
    assert_eq!(
        simu.add_entity("queue", Queue::default()),
        Err(EntityError::AlreadyRegistered("queue".into()))
    );
    assert_eq!(
        simu.entities().names().collect::<Vec<_>>(),
        ["queue", "server"]
    );

    let server = simu.remove_entity("server").unwrap();
    assert_eq!(server.downcast_ref::<String>().unwrap(), "idle");
    assert!(!simu.has_entity("server"));
    assert!(matches!(
        simu.remove_entity("server"),
        Err(EntityError::NotFound(_))
    ));
}

#[test]
fn entities_lookup_miss() {
    let mut simu = SimInit::new().init().unwrap();
    simu.add_entity("queue", Queue::default()).unwrap();

    assert_eq!(
        simu.get_entity::<Queue>("server").err(),
        Some(EntityError::NotFound("server".into()))
    );
    assert!(matches!(
        simu.get_entity::<u64>("queue"),
        Err(EntityError::TypeMismatch { .. })
    ));
}

#[test]
fn entities_updated_by_handlers() {
    let mut simu = SimInit::new().init().unwrap();
    simu.add_entity("queue", Queue::default()).unwrap();

    for time in [1.0, 1.5, 2.0] {
        simu.schedule(time, "arrival", |cx| {
            let queue = cx.get_entity_mut::<Queue>("queue").unwrap();
            queue.length += 1;
            queue.peak = queue.peak.max(queue.length);
        })
        .unwrap();
    }
    for time in [1.8, 3.0, 4.0] {
        simu.schedule(time, "departure", |cx| {
            cx.get_entity_mut::<Queue>("queue").unwrap().length -= 1;
        })
        .unwrap();
    }
    simu.schedule(5.0, "lookup", |cx| {
        assert!(cx.entities().contains("queue"));
        assert!(cx.get_entity::<Queue>("nowhere").is_err());
    })
    .unwrap();

    simu.run().unwrap();

    assert_eq!(
        simu.get_entity::<Queue>("queue").unwrap(),
        &Queue { length: 0, peak: 2 }
    );
}

#[test]
fn entities_survive_reset() {
    let mut simu = SimInit::new().init().unwrap();
    simu.add_entity("count", 0u32).unwrap();
    simu.schedule(1.0, "increment", |cx| {
        *cx.get_entity_mut::<u32>("count").unwrap() += 1;
    })
    .unwrap();
    simu.run().unwrap();

    simu.reset();

    assert_eq!(*simu.get_entity::<u32>("count").unwrap(), 1);
    *simu.get_entity_mut::<u32>("count").unwrap() = 0;
    assert_eq!(*simu.get_entity::<u32>("count").unwrap(), 0);
}
