use crate::harness::{Assertion, Scenario};
use anyhow::ensure;
use tfsync_core::{UNKNOWN_USER_EMAIL, UNKNOWN_USER_NAME};

#[test]
fn test_commit_message_carries_trailer() {
    Scenario::new("trailer")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .fetch()
        .assert(Assertion::HeadMessageEquals(
            "Initial import\n\ngit-tfs-id: [http://tfs:8080/tfs]$/Project/Trunk;C1\n".into(),
        ))
        .run()
        .unwrap();
}

#[test]
fn test_no_meta_data_omits_trailer() {
    Scenario::new("no_meta_data")
        .without_meta_data()
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .changeset(2, "Second")
        .edit_file("$/Project/Trunk/a.txt", "b\n")
        .fetch()
        .assert(Assertion::HeadMessageEquals("Second\n".into()))
        .run()
        .unwrap();
}

#[test]
fn test_author_from_directory() {
    Scenario::new("author_from_directory")
        .identity("DOMAIN\\alice", "Alice Jones", "alice@example.com")
        .changeset_by(1, "Initial import", "DOMAIN\\alice")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .fetch()
        .assert(Assertion::HeadAuthor {
            name: "Alice Jones".into(),
            email: "alice@example.com".into(),
        })
        .run()
        .unwrap();
}

#[test]
fn test_unknown_committer_falls_back_to_account_name() {
    Scenario::new("unknown_committer")
        .changeset_by(1, "Initial import", "DOMAIN\\carol")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .fetch()
        .assert(Assertion::HeadAuthor {
            name: UNKNOWN_USER_NAME.into(),
            email: "DOMAIN\\carol".into(),
        })
        .run()
        .unwrap();
}

#[test]
fn test_missing_committer_gets_placeholders() {
    Scenario::new("missing_committer")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .fetch()
        .assert(Assertion::HeadAuthor {
            name: UNKNOWN_USER_NAME.into(),
            email: UNKNOWN_USER_EMAIL.into(),
        })
        .run()
        .unwrap();
}

#[test]
fn test_commit_fields_follow_changeset() {
    Scenario::new("commit_fields")
        .identity("DOMAIN\\bob", "Bob Smith", "bob@example.com")
        .changeset(1, "Initial import")
        .add_file("$/Project/Trunk/a.txt", "a\n")
        .changeset_by(2, "Second", "DOMAIN\\bob")
        .edit_file("$/Project/Trunk/a.txt", "b\n")
        .fetch()
        .assert(Assertion::Custom(Box::new(|repo| {
            let log = repo.log("default", None)?;
            ensure!(log.len() == 2, "expected 2 commits, found {}", log.len());

            let (first_id, first) = &log[1];
            let (_, second) = &log[0];
            ensure!(first.parents.is_empty(), "first commit has parents");
            ensure!(second.parents == vec![*first_id], "second commit not on first");
            ensure!(second.date == 1_262_304_000 + 2 * 3600, "wrong date {}", second.date);
            ensure!(second.committer_name == "Bob Smith", "wrong committer");
            ensure!(second.committer_email == second.author_email, "committer differs");
            Ok(())
        })))
        .run()
        .unwrap();
}
