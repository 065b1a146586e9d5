use barbershop_core::db::open_db;
use barbershop_core::{
    BarberFields, BarberService, BarberUpdate, ServiceError, SqliteBarberRepository,
};
use chrono::NaiveTime;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

fn hm(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

fn update_on(path: &Path, update: &BarberUpdate) -> Result<i64, ServiceError> {
    let conn = open_db(path).unwrap();
    let service = BarberService::new(SqliteBarberRepository::try_new(&conn).unwrap());
    service.update(update.id, update).map(|barber| barber.version)
}

#[test]
fn stale_version_from_another_connection_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");

    let conn = open_db(&path).unwrap();
    let service = BarberService::new(SqliteBarberRepository::try_new(&conn).unwrap());
    let observed = service
        .create(&BarberFields::new("Ali", "Fade", hm(9), hm(18)))
        .unwrap();

    let first = BarberUpdate::from_observed(&observed, BarberFields::new("Ali", "A", hm(8), hm(16)));
    let second =
        BarberUpdate::from_observed(&observed, BarberFields::new("Ali", "B", hm(10), hm(20)));

    assert_eq!(update_on(&path, &first).unwrap(), 2);
    assert!(matches!(
        update_on(&path, &second),
        Err(ServiceError::Conflict { expected: 1, .. })
    ));
    assert_eq!(service.get(observed.id).unwrap().specialization, "A");
}

#[test]
fn racing_writers_on_one_version_yield_exactly_one_winner() {
    const WRITERS: usize = 4;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");

    let observed = {
        let conn = open_db(&path).unwrap();
        let service = BarberService::new(SqliteBarberRepository::try_new(&conn).unwrap());
        service
            .create(&BarberFields::new("Ali", "Fade", hm(9), hm(18)))
            .unwrap()
    };

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            let update = BarberUpdate::from_observed(
                &observed,
                BarberFields::new("Ali", format!("writer-{writer}"), hm(9), hm(18)),
            );
            thread::spawn(move || {
                barrier.wait();
                update_on(&path, &update)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let winners = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(ServiceError::Conflict { .. })))
        .count();

    assert_eq!(winners, 1, "unexpected results: {results:?}");
    assert_eq!(conflicts, WRITERS - 1);

    let conn = open_db(&path).unwrap();
    let service = BarberService::new(SqliteBarberRepository::try_new(&conn).unwrap());
    assert_eq!(service.get(observed.id).unwrap().version, 2);
}

#[test]
fn update_after_concurrent_delete_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deleted.db");

    let conn = open_db(&path).unwrap();
    let service = BarberService::new(SqliteBarberRepository::try_new(&conn).unwrap());
    let observed = service
        .create(&BarberFields::new("Ali", "Fade", hm(9), hm(18)))
        .unwrap();

    {
        let other = open_db(&path).unwrap();
        let other_service = BarberService::new(SqliteBarberRepository::try_new(&other).unwrap());
        other_service.delete(observed.id).unwrap();
    }

    let update = BarberUpdate::from_observed(&observed, observed.fields());
    assert!(matches!(
        service.update(observed.id, &update),
        Err(ServiceError::NotFound(id)) if id == observed.id
    ));
}
