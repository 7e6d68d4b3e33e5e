use crate::harness::{Assertion, Scenario};

#[test]
fn test_quick_fetch_takes_latest_tree_only() {
    Scenario::new("quick_fetch")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .changeset(2, "Second")
        .add_file("$/Project/Trunk/b.txt", "b\n")
        .changeset(3, "Third")
        .delete_file("$/Project/Trunk/a.txt")
        .edit_file("$/Project/Trunk/b.txt", "b2\n")
        .quick_fetch()
        .assert_fetched(1)
        .assert_commit_count(1)
        .assert_head_changeset(3)
        .assert_head_contains("Third")
        .assert_paths(&["b.txt"])
        .assert_file_content("b.txt", "b2\n")
        .assert_healthy()
        .run()
        .unwrap();
}

#[test]
fn test_quick_fetch_then_incremental() {
    Scenario::new("quick_then_incremental")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .changeset(2, "Second")
        .add_file("$/Project/Trunk/b.txt", "b\n")
        .quick_fetch()
        .changeset(3, "Third")
        .rename_file("$/Project/Trunk/a.txt", "$/Project/Trunk/c.txt")
        .fetch()
        .assert_fetched(1)
        .assert_commit_count(2)
        .assert_paths(&["b.txt", "c.txt"])
        .run()
        .unwrap();
}

#[test]
fn test_quick_fetch_on_populated_remote_fetches_normally() {
    Scenario::new("quick_fetch_populated")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .fetch()
        .changeset(2, "Second")
        .add_file("$/Project/Trunk/b.txt", "b\n")
        .changeset(3, "Third")
        .add_file("$/Project/Trunk/c.txt", "c\n")
        .quick_fetch()
        .assert_fetched(2)
        .assert_commit_count(3)
        .run()
        .unwrap();
}

#[test]
fn test_quick_fetch_stamps_newest_item_changeset() {
    // The latest changeset only adds a folder, so no copied file carries it
    Scenario::new("quick_fetch_stamp")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .changeset(2, "Edit")
        .edit_file("$/Project/Trunk/a.txt", "a2\n")
        .changeset(3, "Empty folder")
        .add_folder("$/Project/Trunk/docs")
        .quick_fetch()
        .assert_head_changeset(2)
        .assert(Assertion::HeadMessageEquals(
            "Edit\n\ngit-tfs-id: [http://tfs:8080/tfs]$/Project/Trunk;C2\n".into(),
        ))
        .run()
        .unwrap();
}

#[test]
fn test_quick_fetch_from_empty_server() {
    Scenario::new("quick_fetch_empty")
        .quick_fetch()
        .assert_fetched(0)
        .assert_commit_count(0)
        .run()
        .unwrap();
}
