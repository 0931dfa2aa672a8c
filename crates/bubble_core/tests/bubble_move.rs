use bubble_core::db::{open_db, open_db_in_memory};
use bubble_core::{
    Bubble, BubbleAttributes, BubbleGeometry, BubbleRepository, BubbleService,
    BubbleServiceError, CurveRepository, NewCurve, SqliteBubbleRepository,
    SqliteCurveRepository,
};
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

fn attrs(name: &str) -> BubbleAttributes {
    BubbleAttributes {
        name: name.to_string(),
        geometry: BubbleGeometry {
            top: 1.0,
            leftmost: 2.0,
            width: 3.0,
            height: 4.0,
        },
        bubblized: false,
        visible: true,
    }
}

fn seed(service: &BubbleService<SqliteBubbleRepository<'_>>, ws: Uuid, paths: &[&str]) {
    for value in paths {
        let name = value.rsplit('/').next().unwrap();
        service.create_bubble(ws, value, attrs(name)).unwrap();
    }
}

fn all_bubbles(service: &BubbleService<SqliteBubbleRepository<'_>>, ws: Uuid) -> Vec<Bubble> {
    let mut bubbles = Vec::new();
    for root in service.repo().find_by_depth(ws, 1).unwrap() {
        bubbles.extend(service.list_bubbles(ws, root.path.as_str(), 5).unwrap());
    }
    bubbles
}

fn assert_tree_consistent(bubbles: &[Bubble]) {
    for bubble in bubbles {
        assert_eq!(bubble.path_depth, bubble.path.depth(), "{}", bubble.path);
        if let Some(parent) = bubble.path.parent() {
            assert!(
                bubbles.iter().any(|candidate| candidate.path == parent),
                "missing parent for {}",
                bubble.path
            );
        }
    }
}

#[test]
fn move_cascades_prefix_to_every_descendant() {
    let conn = open_db_in_memory().unwrap();
    let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
    let ws = Uuid::new_v4();
    seed(&service, ws, &["/A", "/A/B", "/A/B/C", "/AB", "/X"]);
    let original_ids: Vec<i64> = ["/A", "/A/B", "/A/B/C"]
        .iter()
        .map(|p| service.find_by_path(ws, p).unwrap().id)
        .collect();

    let moved = service
        .move_bubble(ws, "/A", Some("/X/A2"), &attrs("A2"))
        .unwrap();
    assert_eq!(moved.path.as_str(), "/X/A2");
    assert_eq!(moved.path_depth, 2);
    assert_eq!(moved.name, "A2");

    let expected = [("/X/A2", 2), ("/X/A2/B", 3), ("/X/A2/B/C", 4)];
    for ((path, depth), id) in expected.iter().zip(&original_ids) {
        let bubble = service.find_by_path(ws, path).unwrap();
        assert_eq!(bubble.id, *id);
        assert_eq!(bubble.path_depth, *depth);
    }

    // Sibling sharing a textual prefix is untouched.
    assert_eq!(service.find_by_path(ws, "/AB").unwrap().path_depth, 1);
    assert!(service.find_by_path(ws, "/A/B").is_err());
    assert_tree_consistent(&all_bubbles(&service, ws));
}

#[test]
fn move_up_recomputes_descendant_depths() {
    let conn = open_db_in_memory().unwrap();
    let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
    let ws = Uuid::new_v4();
    seed(&service, ws, &["/A", "/A/B", "/A/B/C", "/A/B/C/D"]);

    service
        .move_bubble(ws, "/A/B", Some("/B"), &attrs("B"))
        .unwrap();

    assert_eq!(service.find_by_path(ws, "/B").unwrap().path_depth, 1);
    assert_eq!(service.find_by_path(ws, "/B/C").unwrap().path_depth, 2);
    assert_eq!(service.find_by_path(ws, "/B/C/D").unwrap().path_depth, 3);
    assert_tree_consistent(&all_bubbles(&service, ws));
}

#[test]
fn move_without_new_path_updates_attributes_in_place() {
    let conn = open_db_in_memory().unwrap();
    let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
    let ws = Uuid::new_v4();
    seed(&service, ws, &["/A", "/A/B"]);

    let mut changed = attrs("Renamed");
    changed.bubblized = true;
    changed.geometry.width = 99.0;

    for new_path in [None, Some("")] {
        let updated = service.move_bubble(ws, "/A", new_path, &changed).unwrap();
        assert_eq!(updated.path.as_str(), "/A");
        assert_eq!(updated.path_depth, 1);
    }

    let stored = service.find_by_path(ws, "/A").unwrap();
    assert_eq!(stored.name, "Renamed");
    assert!(stored.bubblized);
    assert_eq!(stored.geometry.width, 99.0);
    assert!(service.find_by_path(ws, "/A/B").is_ok());
}

#[test]
fn move_of_missing_bubble_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
    let ws = Uuid::new_v4();

    for new_path in [None, Some("/B")] {
        let err = service
            .move_bubble(ws, "/missing", new_path, &attrs("x"))
            .unwrap_err();
        assert!(matches!(err, BubbleServiceError::BubbleNotFound { .. }));
    }
}

#[test]
fn colliding_move_rolls_back_every_rewrite() {
    let conn = open_db_in_memory().unwrap();
    let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
    let ws = Uuid::new_v4();
    seed(&service, ws, &["/A", "/A/B", "/A/B/C", "/Z", "/Z/B"]);

    let err = service
        .move_bubble(ws, "/A", Some("/Z"), &attrs("Z"))
        .unwrap_err();
    assert!(matches!(err, BubbleServiceError::Repo(_)));

    for path in ["/A", "/A/B", "/A/B/C", "/Z", "/Z/B"] {
        assert!(service.find_by_path(ws, path).is_ok(), "{path} lost");
    }
    assert!(service.find_by_path(ws, "/Z/B/C").is_err());
    assert_tree_consistent(&all_bubbles(&service, ws));
}

#[test]
fn moved_bubbles_keep_their_curves() {
    let conn = open_db_in_memory().unwrap();
    let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
    let curves = SqliteCurveRepository::try_new(&conn).unwrap();
    let ws = Uuid::new_v4();
    seed(&service, ws, &["/A", "/A/B"]);
    let child = service.find_by_path(ws, "/A/B").unwrap();
    curves
        .create_curve(&NewCurve {
            bubble_id: child.id,
            color: "#ff0000".to_string(),
            thickness: 2.0,
            control_point: String::new(),
        })
        .unwrap();

    service
        .move_bubble(ws, "/A", Some("/Q"), &attrs("Q"))
        .unwrap();

    let moved_child = service.find_by_path(ws, "/Q/B").unwrap();
    assert_eq!(moved_child.id, child.id);
    assert_eq!(curves.list_for_bubble(child.id).unwrap().len(), 1);
}

#[test]
fn concurrent_reader_never_sees_half_moved_subtree() {
    const SUBTREE: &[&str] = &["/A", "/A/B", "/A/B/C", "/A/D", "/A/D/E"];

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("move.db");
    let ws = Uuid::new_v4();
    {
        let conn = open_db(&db_path).unwrap();
        let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
        seed(&service, ws, SUBTREE);
    }

    let done = Arc::new(AtomicBool::new(false));
    let reader_done = Arc::clone(&done);
    let reader_path = db_path.clone();
    let reader = thread::spawn(move || {
        let conn = open_db(&reader_path).unwrap();
        let mut observations = 0usize;
        while !reader_done.load(Ordering::SeqCst) {
            let (under_a, under_m) = prefix_counts(&conn, ws);
            assert!(
                (under_a, under_m) == (SUBTREE.len() as i64, 0)
                    || (under_a, under_m) == (0, SUBTREE.len() as i64),
                "torn read: /A={under_a} /M={under_m}"
            );
            observations += 1;
        }
        observations
    });

    {
        let conn = open_db(&db_path).unwrap();
        let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
        for round in 0..20 {
            let (from, to) = if round % 2 == 0 { ("/A", "/M") } else { ("/M", "/A") };
            service
                .move_bubble(ws, from, Some(to), &attrs(&to[1..]))
                .unwrap();
        }
    }

    done.store(true, Ordering::SeqCst);
    let observations = reader.join().unwrap();
    assert!(observations > 0);
}

fn prefix_counts(conn: &Connection, ws: Uuid) -> (i64, i64) {
    conn.query_row(
        "SELECT
            SUM(CASE WHEN path = '/A' OR substr(path, 1, 3) = '/A/' THEN 1 ELSE 0 END),
            SUM(CASE WHEN path = '/M' OR substr(path, 1, 3) = '/M/' THEN 1 ELSE 0 END)
         FROM bubbles
         WHERE workspace_id = ?1;",
        [ws.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .unwrap()
}

#[test]
fn overlapping_moves_from_two_writers_keep_tree_consistent() {
    const ROUNDS: usize = 20;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("writers.db");
    let ws = Uuid::new_v4();
    {
        let conn = open_db(&db_path).unwrap();
        let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
        seed(&service, ws, &["/A", "/A/B", "/A/B/C", "/A/D"]);
    }

    let root_path = db_path.clone();
    let root_mover = thread::spawn(move || {
        let conn = open_db(&root_path).unwrap();
        let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
        for round in 0..ROUNDS * 2 {
            let (from, to) = if round % 2 == 0 { ("/A", "/M") } else { ("/M", "/A") };
            service
                .move_bubble(ws, from, Some(to), &attrs(&to[1..]))
                .unwrap();
        }
    });

    let leaf_path = db_path.clone();
    let leaf_mover = thread::spawn(move || {
        let conn = open_db(&leaf_path).unwrap();
        let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
        let (mut current, mut other) = ("B", "X");
        for _ in 0..ROUNDS {
            for root in ["/A", "/M"] {
                let from = format!("{root}/{current}");
                let to = format!("{root}/{other}");
                match service.move_bubble(ws, &from, Some(&to), &attrs(other)) {
                    Ok(moved) => {
                        assert_eq!(moved.path_depth, 2);
                        std::mem::swap(&mut current, &mut other);
                        break;
                    }
                    Err(BubbleServiceError::BubbleNotFound { .. }) => {}
                    Err(err) => panic!("unexpected move failure for {from}: {err}"),
                }
            }
        }
        current
    });

    root_mover.join().unwrap();
    let leaf = leaf_mover.join().unwrap();

    let conn = open_db(&db_path).unwrap();
    let service = BubbleService::new(SqliteBubbleRepository::try_new(&conn).unwrap());
    let bubbles = all_bubbles(&service, ws);
    assert_eq!(bubbles.len(), 4);
    assert_tree_consistent(&bubbles);

    let mut paths: Vec<&str> = bubbles.iter().map(|b| b.path.as_str()).collect();
    paths.sort_unstable();
    let expected_leaf = format!("/A/{leaf}");
    let expected_grandchild = format!("/A/{leaf}/C");
    let mut expected = vec![
        "/A",
        "/A/D",
        expected_leaf.as_str(),
        expected_grandchild.as_str(),
    ];
    expected.sort_unstable();
    assert_eq!(paths, expected);
}
