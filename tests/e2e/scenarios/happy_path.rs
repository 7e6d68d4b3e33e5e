use crate::harness::{Assertion, Scenario};

#[test]
fn test_first_fetch_replays_every_changeset() {
    Scenario::new("first_fetch")
        .changeset(1, "Initial import")
        .add_folder("$/Project/Trunk")
        .add_file("$/Project/Trunk/readme.txt", "hello\n")
        .changeset(2, "Add sources")
        .add_file("$/Project/Trunk/src/main.c", "int main;\n")
        .changeset(3, "Update readme")
        .edit_file("$/Project/Trunk/readme.txt", "hello world\n")
        .fetch()
        .assert_fetched(3)
        .assert_commit_count(3)
        .assert_head_changeset(3)
        .assert_file_content("readme.txt", "hello world\n")
        .assert_file_content("src/main.c", "int main;\n")
        .assert_healthy()
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_incremental_fetch() {
    Scenario::new("incremental_fetch")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .fetch()
        .assert_fetched(1)
        .changeset(2, "Second")
        .add_file("$/Project/Trunk/b.txt", "b\n")
        .changeset(3, "Third")
        .delete_file("$/Project/Trunk/a.txt")
        .fetch()
        .assert_fetched(2)
        .assert_commit_count(3)
        .assert_paths(&["b.txt"])
        .assert_healthy()
        .run()
        .unwrap();
}

#[test]
fn test_fetch_without_new_changesets_is_noop() {
    Scenario::new("noop_fetch")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .fetch()
        .fetch()
        .assert_fetched(0)
        .assert_commit_count(1)
        .assert(Assertion::HeadTreeUnchanged)
        .run()
        .unwrap();
}

#[test]
fn test_fetch_from_empty_server() {
    Scenario::new("empty_server")
        .fetch()
        .assert_fetched(0)
        .assert_commit_count(0)
        .assert_healthy()
        .run()
        .unwrap();
}

#[test]
fn test_changesets_outside_tracked_folder_are_skipped() {
    Scenario::new("outside_folder")
        .changeset(1, "Trunk")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .changeset(2, "Branch work")
        .add_file("$/Project/Branches/Dev/b.txt", "b\n")
        .changeset(3, "Sibling with a shared prefix")
        .add_file("$/Project/TrunkOld/c.txt", "c\n")
        .fetch()
        .assert_fetched(1)
        .assert_head_changeset(1)
        .assert_paths(&["a.txt"])
        .run()
        .unwrap();
}

#[test]
fn test_tracking_subfolder() {
    Scenario::new("tracking_subfolder")
        .tracking("$/Project/Trunk/src")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/readme.txt", "hello\n")
        .add_file("$/Project/Trunk/src/lib.rs", "pub fn f() {}\n")
        .fetch()
        .assert_paths(&["lib.rs"])
        .run()
        .unwrap();
}

#[test]
fn test_ignored_paths_never_replayed() {
    Scenario::new("ignored_paths")
        .ignoring(r"\.tmp$")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .add_file("$/Project/Trunk/scratch.tmp", "junk\n")
        .changeset(2, "More scratch")
        .add_file("$/Project/Trunk/sub/more.tmp", "junk\n")
        .edit_file("$/Project/Trunk/a.txt", "a2\n")
        .fetch()
        .assert_fetched(2)
        .assert_paths(&["a.txt"])
        .assert_file_content("a.txt", "a2\n")
        .run()
        .unwrap();
}

#[test]
fn test_folder_only_changeset_keeps_tree() {
    Scenario::new("folder_only")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .fetch()
        .changeset(2, "Empty folder")
        .add_folder("$/Project/Trunk/docs")
        .fetch()
        .assert_fetched(1)
        .assert_commit_count(2)
        .assert_head_changeset(2)
        .assert(Assertion::HeadTreeUnchanged)
        .run()
        .unwrap();
}
