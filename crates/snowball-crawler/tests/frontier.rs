use std::time::Duration;

use snowball_crawler::{Frontier, FrontierStats, Outcome, Status, Tie};

fn tie(target: &str, label: &str, source: &str) -> Tie {
    Tie {
        target: target.into(),
        label: label.into(),
        source: source.into(),
        kind: "hot".into(),
    }
}

#[test]
fn enqueue_is_deduplicated() {
    let mut frontier = Frontier::open_in_memory().unwrap();

    assert!(frontier.enqueue_if_absent("rust", 0).unwrap());
    assert!(!frontier.enqueue_if_absent("rust", 3).unwrap());
    assert!(!frontier.enqueue_if_absent("rust", 0).unwrap());

    assert_eq!(1, frontier.count_pending().unwrap());
    assert_eq!(0, frontier.get("rust").unwrap().unwrap().discovery_step);
}

#[test]
fn enqueue_skips_terminal_targets() {
    let mut frontier = Frontier::open_in_memory().unwrap();
    frontier.enqueue_if_absent("rust", 0).unwrap();
    frontier.mark_failed("rust").unwrap();

    assert!(!frontier.enqueue_if_absent("rust", 1).unwrap());
    assert_eq!(Status::Failed, frontier.get("rust").unwrap().unwrap().status);
    assert_eq!(None, frontier.dequeue_next().unwrap());
}

#[test]
fn batch_enqueue_skips_per_row() {
    let mut frontier = Frontier::open_in_memory().unwrap();
    frontier.enqueue_if_absent("b", 0).unwrap();

    let inserted = frontier
        .enqueue_all([("a", 2), ("b", 2), ("c", 2), ("a", 1)])
        .unwrap();

    assert_eq!(2, inserted);
    assert_eq!(3, frontier.count_pending().unwrap());
    assert_eq!(1, frontier.get("a").unwrap().unwrap().discovery_step);
    assert_eq!(0, frontier.get("b").unwrap().unwrap().discovery_step);
}

#[test]
fn dequeue_prefers_deepest_step() {
    let mut frontier = Frontier::open_in_memory().unwrap();
    frontier.enqueue_if_absent("shallow", 0).unwrap();
    frontier.enqueue_if_absent("deep_first", 2).unwrap();
    frontier.enqueue_if_absent("middle", 1).unwrap();
    frontier.enqueue_if_absent("deep_second", 2).unwrap();

    let mut order = vec![];
    while let Some(entry) = frontier.dequeue_next().unwrap() {
        assert_eq!(Status::Pending, entry.status);
        order.push(entry.target_id.clone());
        frontier.mark_processed(&entry.target_id).unwrap();
    }

    assert_eq!(vec!["deep_first", "deep_second", "middle", "shallow"], order);
}

#[test]
fn dequeue_hands_the_claim_back_to_its_owner() {
    let mut frontier = Frontier::open_in_memory().unwrap();
    frontier.enqueue_if_absent("rust", 0).unwrap();

    let first = frontier.dequeue_next().unwrap();
    let second = frontier.dequeue_next().unwrap();

    assert_eq!(first, second);
    assert_eq!(1, frontier.count_pending().unwrap());
}

#[test]
fn two_handles_never_share_an_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frontier.sqlite");
    let mut a = Frontier::open(&path).unwrap();
    let mut b = Frontier::open(&path).unwrap();
    a.enqueue_all([("rust", 1), ("pics", 0)]).unwrap();

    assert_eq!("rust", a.dequeue_next().unwrap().unwrap().target_id);
    assert_eq!("pics", b.dequeue_next().unwrap().unwrap().target_id);

    a.mark_processed("rust").unwrap();
    assert_eq!("pics", b.dequeue_next().unwrap().unwrap().target_id);
    assert_eq!(None, a.dequeue_next().unwrap());
}

#[test]
fn expired_claims_can_be_taken_over() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frontier.sqlite");
    let mut a = Frontier::open(&path).unwrap();
    let mut b = Frontier::open(&path).unwrap().with_lease(Duration::ZERO);
    a.enqueue_if_absent("rust", 0).unwrap();

    assert_eq!("rust", a.dequeue_next().unwrap().unwrap().target_id);
    assert_eq!("rust", b.dequeue_next().unwrap().unwrap().target_id);
}

#[test]
fn released_claims_are_available_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frontier.sqlite");
    let mut a = Frontier::open(&path).unwrap();
    a.enqueue_if_absent("rust", 0).unwrap();
    a.enqueue_if_absent("pics", 0).unwrap();
    assert_eq!("rust", a.dequeue_next().unwrap().unwrap().target_id);
    a.mark_processed("pics").unwrap();
    drop(a);

    let mut b = Frontier::open(&path).unwrap();
    assert_eq!(None, b.dequeue_next().unwrap());
    assert_eq!(1, b.release_claims().unwrap());
    assert_eq!("rust", b.dequeue_next().unwrap().unwrap().target_id);
}

#[test]
fn claim_columns_are_added_to_older_databases() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frontier.sqlite");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE frontier (
                 subreddit TEXT PRIMARY KEY,
                 step INTEGER NOT NULL,
                 processed INTEGER NOT NULL DEFAULT 0 CHECK(processed IN (-1, 0, 1))
             );
             INSERT INTO frontier (subreddit, step, processed) VALUES ('rust', 0, 0);",
        )
        .unwrap();
    }

    let mut frontier = Frontier::open(&path).unwrap();
    assert_eq!("rust", frontier.dequeue_next().unwrap().unwrap().target_id);
}

#[test]
fn marks_are_idempotent_and_final() {
    let mut frontier = Frontier::open_in_memory().unwrap();
    frontier.enqueue_if_absent("a", 0).unwrap();
    frontier.enqueue_if_absent("b", 0).unwrap();

    assert!(frontier.mark_processed("a").unwrap());
    assert!(frontier.mark_processed("a").unwrap());
    assert!(frontier.mark_failed("a").unwrap());
    assert_eq!(Status::Processed, frontier.get("a").unwrap().unwrap().status);

    assert!(!frontier.mark_failed("missing").unwrap());
    assert_eq!(None, frontier.get("missing").unwrap());

    assert_eq!("b", frontier.dequeue_next().unwrap().unwrap().target_id);
    frontier.mark_failed("b").unwrap();
    assert_eq!(None, frontier.dequeue_next().unwrap());
    assert_eq!(0, frontier.count_pending().unwrap());
}

#[test]
fn complete_commits_everything_together() {
    let mut frontier = Frontier::open_in_memory().unwrap();
    frontier.enqueue_if_absent("target", 0).unwrap();
    frontier.enqueue_if_absent("known", 0).unwrap();

    let ties = vec![
        tie("target", "p1", "known"),
        tie("target", "p2", "fresh"),
        tie("target", "p3", "fresh"),
    ];
    let enqueued = frontier
        .complete(
            "target",
            Outcome::Processed,
            ["known", "fresh", "fresh"],
            1,
            &ties,
        )
        .unwrap();

    assert_eq!(1, enqueued);
    assert_eq!(
        FrontierStats {
            pending: 2,
            processed: 1,
            failed: 0,
            ties: 3,
        },
        frontier.stats().unwrap()
    );
    assert_eq!(1, frontier.get("fresh").unwrap().unwrap().discovery_step);
    assert_eq!(ties, frontier.ties().unwrap());
}

#[test]
fn ties_are_unique_by_full_tuple() {
    let mut frontier = Frontier::open_in_memory().unwrap();

    let first = frontier
        .insert_ties(&[tie("t", "p1", "s"), tie("t", "p2", "s")])
        .unwrap();
    let second = frontier
        .insert_ties(&[tie("t", "p1", "s"), tie("t", "p1", "other")])
        .unwrap();

    assert_eq!(2, first);
    assert_eq!(1, second);
    assert_eq!(3, frontier.count_ties().unwrap());
}

#[test]
fn seeds_are_normalized() {
    let mut frontier = Frontier::open_in_memory().unwrap();

    let inserted = frontier
        .seed(["r/Rust", "rust", "/r/Pics/", "r/", "r/../../etc", "a/b", "u/Someone"], 0)
        .unwrap();

    assert_eq!(3, inserted);
    assert!(frontier.get("u_someone").unwrap().is_some());
    assert!(frontier.get("rust").unwrap().is_some());
    assert!(frontier.get("pics").unwrap().is_some());
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frontier.sqlite");

    {
        let mut frontier = Frontier::open(&path).unwrap();
        frontier.enqueue_all([("a", 0), ("b", 1), ("c", 1)]).unwrap();
        frontier.mark_processed("b").unwrap();
        frontier.insert_ties(&[tie("b", "p", "c")]).unwrap();
    }

    let mut frontier = Frontier::open(&path).unwrap();
    assert_eq!(2, frontier.count_pending().unwrap());
    assert_eq!(1, frontier.count_ties().unwrap());
    assert_eq!("c", frontier.dequeue_next().unwrap().unwrap().target_id);
}
