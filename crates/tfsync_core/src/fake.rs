//! A scripted, in-memory changeset source.
//!
//! Histories are written either fluently with [`ScriptBuilder`] or as a text
//! script:
//!
//! ```text
//! [identity DOMAIN\bob = Bob Smith <bob@example.com>]
//!
//! [changeset 1 - 2010-01-01T00:00:00Z - DOMAIN\bob]
//! Initial import
//!
//! [Add Folder $/Project/Trunk]
//! [Add File $/Project/Trunk/readme.txt]
//! hello
//! [changeset 2 - 2010-01-02T00:00:00Z]
//! Rename it
//!
//! [Rename File $/Project/Trunk/README.txt <- $/Project/Trunk/readme.txt]
//! ```
//!
//! Every content line is kept with its newline; trailing blank lines before
//! the next header are dropped. A file change without content lines keeps
//! the item's previous content.

use crate::error::{Result, SyncError};
use crate::source::{ChangesetIter, ChangesetSource, IdentityLookup, ItemIter};
use crate::types::{Change, ChangeKind, ChangeType, Changeset, Identity, Item, ItemType};
use chrono::{DateTime, SecondsFormat};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::io::Read;

/// Items by folded server path, tombstones included.
type Snapshot = BTreeMap<String, Item>;

#[derive(Debug, Clone)]
struct Op {
    change_type: ChangeType,
    item_type: ItemType,
    path: String,
    from: Option<String>,
    content: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct Draft {
    line: usize,
    id: i64,
    comment: String,
    date: i64,
    committer: String,
    ops: Vec<Op>,
}

/// Fluent builder for a [`ScriptedSource`].
///
/// # Examples
///
/// ```
/// use tfsync_core::{ChangesetSource, ScriptBuilder};
///
/// let source = ScriptBuilder::new()
///     .changeset(1, "Initial import", 1_262_304_000)
///     .by("DOMAIN\\bob")
///     .add_file("$/P/readme.txt", b"hello")
///     .changeset(2, "Rename", 1_262_390_400)
///     .rename_file("$/P/readme.txt", "$/P/README.txt")
///     .build()
///     .unwrap();
///
/// assert_eq!(source.latest_changeset().unwrap().unwrap().id, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    drafts: Vec<Draft>,
    identities: Vec<(String, Identity)>,
    error: Option<(usize, String)>,
    line: usize,
}

impl ScriptBuilder {
    /// Starts an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a text script into a builder that later calls can extend.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScript` with the 1-based line of the first problem.
    pub fn parse(script: &str) -> Result<Self> {
        parse_script(script)
    }

    /// Starts a new changeset; later operations belong to it.
    pub fn changeset(mut self, id: i64, comment: &str, date: i64) -> Self {
        self.drafts.push(Draft {
            line: self.line,
            id,
            comment: comment.to_string(),
            date,
            committer: String::new(),
            ops: Vec::new(),
        });
        self
    }

    /// Sets the committer of the current changeset.
    pub fn by(mut self, committer: &str) -> Self {
        if self.drafts.is_empty() {
            self.fail("committer given before any changeset");
        }
        if let Some(draft) = self.drafts.last_mut() {
            draft.committer = committer.to_string();
        }
        self
    }

    /// Registers a directory entry for `user`.
    pub fn identity(mut self, user: &str, display_name: &str, mail_address: &str) -> Self {
        self.identities.push((
            user.to_string(),
            Identity {
                display_name: display_name.to_string(),
                mail_address: mail_address.to_string(),
            },
        ));
        self
    }

    /// Adds a file.
    pub fn add_file(self, path: &str, content: &[u8]) -> Self {
        self.change(ChangeKind::Add.into(), ItemType::File, path, content)
    }

    /// Edits an existing file.
    pub fn edit_file(self, path: &str, content: &[u8]) -> Self {
        self.change(ChangeKind::Edit.into(), ItemType::File, path, content)
    }

    /// Deletes a file.
    pub fn delete_file(self, path: &str) -> Self {
        self.push(ChangeKind::Delete.into(), ItemType::File, path, None, None)
    }

    /// Moves a file, keeping its content.
    pub fn rename_file(self, from: &str, to: &str) -> Self {
        self.push(ChangeKind::Rename.into(), ItemType::File, to, Some(from), None)
    }

    /// Moves a file and changes its content.
    pub fn rename_edit_file(self, from: &str, to: &str, content: &[u8]) -> Self {
        self.push(
            ChangeType::new([ChangeKind::Rename, ChangeKind::Edit]),
            ItemType::File,
            to,
            Some(from),
            Some(content.to_vec()),
        )
    }

    /// Moves a file and deletes it in the same changeset.
    pub fn rename_delete_file(self, from: &str, to: &str) -> Self {
        self.push(
            ChangeType::new([ChangeKind::Rename, ChangeKind::Delete]),
            ItemType::File,
            to,
            Some(from),
            None,
        )
    }

    /// Adds a folder.
    pub fn add_folder(self, path: &str) -> Self {
        self.push(ChangeKind::Add.into(), ItemType::Folder, path, None, None)
    }

    /// Records an arbitrary change. A rename recorded this way has no known
    /// origin unless followed by [`renamed_from`](Self::renamed_from).
    pub fn change(
        self,
        change_type: ChangeType,
        item_type: ItemType,
        path: &str,
        content: &[u8],
    ) -> Self {
        let content = (item_type == ItemType::File).then(|| content.to_vec());
        self.push(change_type, item_type, path, None, content)
    }

    /// Sets the origin path of the last recorded change.
    pub fn renamed_from(mut self, from: &str) -> Self {
        if self.drafts.last().map_or(true, |d| d.ops.is_empty()) {
            self.fail("renamed_from given before any change");
        }
        if let Some(op) = self.drafts.last_mut().and_then(|d| d.ops.last_mut()) {
            op.from = Some(from.to_string());
        }
        self
    }

    fn push(
        mut self,
        change_type: ChangeType,
        item_type: ItemType,
        path: &str,
        from: Option<&str>,
        content: Option<Vec<u8>>,
    ) -> Self {
        let op = Op {
            change_type,
            item_type,
            path: path.to_string(),
            from: from.map(str::to_string),
            content,
        };
        if self.drafts.is_empty() {
            self.fail("change given before any changeset");
        }
        if let Some(draft) = self.drafts.last_mut() {
            draft.ops.push(op);
        }
        self
    }

    fn fail(&mut self, reason: &str) {
        if self.error.is_none() {
            self.error = Some((self.line, reason.to_string()));
        }
    }

    /// Simulates the history and produces the source.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScript` for operations outside a changeset and for
    /// changeset ids that do not strictly increase.
    pub fn build(self) -> Result<ScriptedSource> {
        if let Some((line, reason)) = self.error {
            return Err(SyncError::InvalidScript { line, reason });
        }

        let mut current = Snapshot::new();
        let mut next_item_id = 1;
        let mut changesets = BTreeMap::new();
        let mut snapshots = BTreeMap::new();
        let mut last_id = 0;

        for draft in &self.drafts {
            if draft.id <= last_id {
                return Err(SyncError::InvalidScript {
                    line: draft.line,
                    reason: format!(
                        "changeset {} does not follow changeset {}",
                        draft.id, last_id
                    ),
                });
            }
            last_id = draft.id;

            let mut changes = Vec::with_capacity(draft.ops.len());
            for op in &draft.ops {
                let item = simulate(&mut current, &mut next_item_id, draft.id, op);
                changes.push(Change {
                    change_type: op.change_type.clone(),
                    item,
                });
            }

            changesets.insert(
                draft.id,
                Changeset {
                    id: draft.id,
                    changes,
                    committer: draft.committer.clone(),
                    creation_date: draft.date,
                    comment: draft.comment.clone(),
                },
            );
            snapshots.insert(draft.id, current.clone());
        }

        let identities = self
            .identities
            .iter()
            .map(|(user, identity)| (user.to_lowercase(), identity.clone()))
            .collect();

        Ok(ScriptedSource {
            changesets,
            snapshots,
            identities,
            drafts: self.drafts,
            identity_list: self.identities,
        })
    }
}

/// Applies one scripted operation to the running snapshot and returns the
/// item version the change reports.
fn simulate(current: &mut Snapshot, next_item_id: &mut i64, changeset_id: i64, op: &Op) -> Item {
    let key = op.path.to_lowercase();
    let existing = current.get(&key).filter(|item| item.is_live()).cloned();

    let origin = if op.change_type.is_rename() {
        op.from
            .as_ref()
            .and_then(|from| current.remove(&from.to_lowercase()))
            .filter(|item| item.is_live())
    } else {
        None
    };

    let item_id = match (&origin, &existing) {
        (Some(origin), _) => origin.item_id,
        (None, Some(existing)) if !op.change_type.is_add() => existing.item_id,
        _ => {
            let id = *next_item_id;
            *next_item_id += 1;
            id
        }
    };

    let mut item = match op.item_type {
        ItemType::Folder => Item::folder(item_id, &op.path, changeset_id),
        ItemType::File => {
            let content = op
                .content
                .clone()
                .or_else(|| origin.as_ref().and_then(item_bytes))
                .or_else(|| existing.as_ref().and_then(item_bytes))
                .unwrap_or_default();
            Item::file(item_id, &op.path, changeset_id, &content)
        }
    };
    if op.change_type.is_delete() {
        item = item.deleted(changeset_id);
    }

    current.insert(key, item.clone());
    item
}

fn item_bytes(item: &Item) -> Option<Vec<u8>> {
    let mut reader = item.download().ok()?;
    let mut out = Vec::new();
    reader.read_to_end(&mut out).ok()?;
    Some(out)
}

/// In-memory [`ChangesetSource`] and [`IdentityLookup`] backed by a script.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    changesets: BTreeMap<i64, Changeset>,
    snapshots: BTreeMap<i64, Snapshot>,
    identities: HashMap<String, Identity>,
    drafts: Vec<Draft>,
    identity_list: Vec<(String, Identity)>,
}

impl ScriptedSource {
    /// Parses a text script.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScript` with the 1-based line of the first problem.
    pub fn parse(script: &str) -> Result<Self> {
        ScriptBuilder::parse(script)?.build()
    }

    /// Every changeset, ascending.
    pub fn changesets(&self) -> impl Iterator<Item = &Changeset> {
        self.changesets.values()
    }

    /// Renders the history back into the text script format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (user, identity) in &self.identity_list {
            let _ = writeln!(
                out,
                "[identity {} = {} <{}>]",
                user, identity.display_name, identity.mail_address
            );
        }
        if !self.identity_list.is_empty() {
            out.push('\n');
        }

        for draft in &self.drafts {
            let date = DateTime::from_timestamp(draft.date, 0)
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| draft.date.to_string());
            if draft.committer.is_empty() {
                let _ = writeln!(out, "[changeset {} - {}]", draft.id, date);
            } else {
                let _ = writeln!(out, "[changeset {} - {} - {}]", draft.id, date, draft.committer);
            }
            if !draft.comment.is_empty() {
                let _ = writeln!(out, "{}", draft.comment);
            }
            out.push('\n');

            for op in &draft.ops {
                match &op.from {
                    Some(from) => {
                        let _ = writeln!(
                            out,
                            "[{} {} {} <- {}]",
                            op.change_type, op.item_type, op.path, from
                        );
                    }
                    None => {
                        let _ = writeln!(out, "[{} {} {}]", op.change_type, op.item_type, op.path);
                    }
                }
                if let Some(content) = op.content.as_ref().filter(|c| !c.is_empty()) {
                    out.push_str(&String::from_utf8_lossy(content));
                    if !content.ends_with(b"\n") {
                        out.push('\n');
                    }
                }
            }
        }
        out
    }

    /// True if any change of `changeset` lands in `root` or moves an item
    /// out of it.
    fn touches(&self, changeset: &Changeset, root: &str) -> bool {
        let origins = self
            .drafts
            .iter()
            .filter(|draft| draft.id == changeset.id)
            .flat_map(|draft| &draft.ops)
            .filter_map(|op| op.from.as_deref());
        changeset
            .changes
            .iter()
            .map(|change| change.item.server_path.as_str())
            .chain(origins)
            .any(|path| is_under(path, root))
    }

    fn snapshot_at(&self, changeset_id: i64) -> Option<&Snapshot> {
        self.snapshots
            .range(..=changeset_id)
            .next_back()
            .map(|(_, snapshot)| snapshot)
    }
}

impl ChangesetSource for ScriptedSource {
    fn latest_changeset(&self) -> Result<Option<Changeset>> {
        Ok(self.changesets.values().next_back().cloned())
    }

    fn changesets_after<'s>(&'s self, path: &str, start: i64) -> Result<ChangesetIter<'s>> {
        let root = path.to_string();
        Ok(Box::new(
            self.changesets
                .range(start.saturating_add(1)..)
                .map(|(_, changeset)| changeset)
                .filter(move |changeset| self.touches(changeset, &root))
                .map(|changeset| Ok(changeset.clone())),
        ))
    }

    fn full_tree_at<'s>(&'s self, path: &str, changeset_id: i64) -> Result<ItemIter<'s>> {
        let root = path.to_string();
        let items: Vec<Item> = self
            .snapshot_at(changeset_id)
            .map(|snapshot| {
                snapshot
                    .values()
                    .filter(|item| item.is_live() && is_under(&item.server_path, &root))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(Box::new(items.into_iter().map(Ok)))
    }

    fn history_of(&self, item: &Item, at_or_before: i64, depth: usize) -> Result<Vec<Changeset>> {
        Ok(self
            .changesets
            .range(..=at_or_before)
            .rev()
            .filter_map(|(_, changeset)| {
                let changes: Vec<Change> = changeset
                    .changes
                    .iter()
                    .filter(|change| change.item.item_id == item.item_id)
                    .cloned()
                    .collect();
                (!changes.is_empty()).then(|| Changeset {
                    changes,
                    ..changeset.clone()
                })
            })
            .take(depth)
            .collect())
    }

    fn item_at(&self, item_id: i64, changeset_id: i64) -> Result<Option<Item>> {
        Ok(self.snapshot_at(changeset_id).and_then(|snapshot| {
            snapshot
                .values()
                .find(|item| item.item_id == item_id && item.is_live())
                .cloned()
        }))
    }

    fn changeset(&self, id: i64) -> Result<Changeset> {
        self.changesets
            .get(&id)
            .cloned()
            .ok_or(SyncError::ChangesetNotFound(id))
    }
}

impl IdentityLookup for ScriptedSource {
    fn lookup(&self, username: &str) -> Result<Option<Identity>> {
        Ok(self.identities.get(&username.to_lowercase()).cloned())
    }
}

/// Case-insensitive "is `path` at or below `root`" on a component boundary.
fn is_under(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    match path.get(..root.len()) {
        Some(head) if head.eq_ignore_ascii_case(root) => {
            let rest = &path[root.len()..];
            rest.is_empty() || rest.starts_with('/')
        }
        _ => false,
    }
}

// === Text script ===

fn parse_script(script: &str) -> Result<ScriptBuilder> {
    let mut builder = ScriptBuilder::new();
    let mut comment: Option<Vec<&str>> = None;
    let mut content: Option<Vec<&str>> = None;

    for (index, line) in script.lines().enumerate() {
        let line_no = index + 1;
        builder.line = line_no;

        if let Some(inner) = header(line) {
            if let Some(rest) = inner.strip_prefix("changeset ") {
                flush(&mut builder, &mut comment, &mut content);
                let (id, date, committer) = parse_changeset_header(rest).ok_or_else(|| {
                    SyncError::InvalidScript {
                        line: line_no,
                        reason: format!("malformed changeset header: {}", line),
                    }
                })?;
                builder = builder.changeset(id, "", date);
                if let Some(committer) = committer {
                    builder = builder.by(committer);
                }
                comment = Some(Vec::new());
                continue;
            }
            if let Some(rest) = inner.strip_prefix("identity ") {
                flush(&mut builder, &mut comment, &mut content);
                let (user, name, mail) =
                    parse_identity(rest).ok_or_else(|| SyncError::InvalidScript {
                        line: line_no,
                        reason: format!("malformed identity: {}", line),
                    })?;
                builder = builder.identity(user, name, mail);
                continue;
            }
            if let Some((change_type, item_type, path, from)) = parse_op_header(inner) {
                if builder.drafts.is_empty() {
                    return Err(SyncError::InvalidScript {
                        line: line_no,
                        reason: "change given before any changeset".to_string(),
                    });
                }
                flush(&mut builder, &mut comment, &mut content);
                builder = builder.push(change_type, item_type, path, from, None);
                content = (item_type == ItemType::File).then(Vec::new);
                continue;
            }
        }

        if let Some(lines) = content.as_mut() {
            lines.push(line);
        } else if let Some(lines) = comment.as_mut() {
            lines.push(line);
        } else if !line.trim().is_empty() {
            return Err(SyncError::InvalidScript {
                line: line_no,
                reason: format!("unexpected text: {}", line),
            });
        }
    }
    flush(&mut builder, &mut comment, &mut content);
    Ok(builder)
}

/// Moves pending comment or content lines into the current draft.
fn flush(builder: &mut ScriptBuilder, comment: &mut Option<Vec<&str>>, content: &mut Option<Vec<&str>>) {
    if let Some(mut lines) = comment.take() {
        trim_trailing_blank(&mut lines);
        if let Some(draft) = builder.drafts.last_mut() {
            draft.comment = lines.join("\n");
        }
    }
    if let Some(mut lines) = content.take() {
        trim_trailing_blank(&mut lines);
        if lines.is_empty() {
            return;
        }
        let bytes: Vec<u8> = lines
            .iter()
            .flat_map(|line| line.bytes().chain(std::iter::once(b'\n')))
            .collect();
        if let Some(op) = builder.drafts.last_mut().and_then(|d| d.ops.last_mut()) {
            op.content = Some(bytes);
        }
    }
}

fn trim_trailing_blank(lines: &mut Vec<&str>) {
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
}

fn header(line: &str) -> Option<&str> {
    line.trim_end().strip_prefix('[')?.strip_suffix(']')
}

/// `1 - 2010-01-01T00:00:00Z - DOMAIN\bob`
fn parse_changeset_header(rest: &str) -> Option<(i64, i64, Option<&str>)> {
    let mut parts = rest.splitn(3, " - ");
    let id = parts.next()?.trim().parse().ok()?;
    let date = parse_date(parts.next()?.trim())?;
    let committer = parts.next().map(str::trim).filter(|c| !c.is_empty());
    Some((id, date, committer))
}

fn parse_date(text: &str) -> Option<i64> {
    if let Ok(seconds) = text.parse::<i64>() {
        return Some(seconds);
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|date| date.timestamp())
}

/// `DOMAIN\bob = Bob Smith <bob@example.com>`
fn parse_identity(rest: &str) -> Option<(&str, &str, &str)> {
    let (user, identity) = rest.split_once(" = ")?;
    let (name, mail) = identity.split_once('<')?;
    let mail = mail.strip_suffix('>')?;
    Some((user.trim(), name.trim(), mail.trim()))
}

/// `Rename, Edit File $/new <- $/old`
fn parse_op_header(inner: &str) -> Option<(ChangeType, ItemType, &str, Option<&str>)> {
    for (index, _) in inner.match_indices(' ') {
        let rest = &inner[index + 1..];
        let Some((token, target)) = rest.split_once(' ') else {
            continue;
        };
        let Ok(item_type) = token.parse::<ItemType>() else {
            continue;
        };
        let change_type = inner[..index].parse::<ChangeType>().ok()?;
        let (path, from) = match target.split_once(" <- ") {
            Some((path, from)) => (path.trim(), Some(from.trim())),
            None => (target.trim(), None),
        };
        if path.is_empty() {
            return None;
        }
        return Some((change_type, item_type, path, from));
    }
    None
}
