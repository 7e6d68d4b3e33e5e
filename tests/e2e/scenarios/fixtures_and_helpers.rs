use crate::harness::{Assertion, Scenario};
use anyhow::ensure;

#[test]
fn test_fixture_history() {
    Scenario::new("fixture_history")
        .from_fixture("default")
        .fetch()
        // Changeset 3 only touches the dev branch
        .assert_fetched(3)
        .assert_commit_count(3)
        .assert_head_changeset(4)
        .assert_paths(&["Makefile", "README.txt", "src/app.c"])
        .assert_file_content("src/app.c", "int main(void) { return 0; }\n")
        .assert_file_content("Makefile", "all:\n\tcc -o app src/app.c\n")
        .assert(Assertion::HeadAuthor {
            name: "Bob Smith".into(),
            email: "bob@example.com".into(),
        })
        .assert_healthy()
        .run()
        .expect("fixture should replay");
}

#[test]
fn test_fixture_extended_by_scenario() {
    Scenario::new("fixture_extended")
        .from_fixture("default")
        .fetch()
        .changeset_by(5, "Drop the readme", "DOMAIN\\alice")
        .delete_file("$/Project/Trunk/README.txt")
        .fetch()
        .assert_fetched(1)
        .assert_no_file("README.txt")
        .assert_file("src/app.c")
        .assert_head_contains("Drop the readme")
        .run()
        .unwrap();
}

#[test]
fn test_fixture_tracking_branch() {
    Scenario::new("fixture_branch")
        .from_fixture("default")
        .tracking("$/Project/Branches/Dev")
        .fetch()
        .assert_fetched(2)
        .assert_head_changeset(3)
        .assert_file_content("notes.txt", "still branch only\n")
        .run()
        .unwrap();
}

#[test]
fn test_custom_assertion_reads_log() {
    Scenario::new("custom_log")
        .from_fixture("default")
        .fetch()
        .assert(Assertion::Custom(Box::new(|repo| {
            let ids: Vec<i64> = repo
                .log("default", None)?
                .iter()
                .map(|(_, entry)| entry.changeset_id)
                .collect();
            ensure!(ids == vec![4, 2, 1], "unexpected history {:?}", ids);
            Ok(())
        })))
        .run()
        .unwrap();
}
