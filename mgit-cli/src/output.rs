//! Human-readable rendering of command results

use chrono::{DateTime, FixedOffset};
use mgit_core::{Change, ChangeKind, Commit, Object, ObjectId, Patch, Signature, StatusReport};
use std::fmt::Write;

/// Date as shown in `log`, in the signature's own timezone
pub fn format_date(sig: &Signature) -> String {
    match sig.datetime() {
        Some(dt) => format_datetime(&dt),
        None => format!("{} {}", sig.timestamp, sig.tz_string()),
    }
}

fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%a %b %-d %H:%M:%S %Y %z").to_string()
}

pub fn render_status(report: &StatusReport) -> String {
    let mut out = String::new();
    match &report.branch {
        Some(branch) => {
            let _ = writeln!(out, "On branch {}", branch);
        }
        None => {
            let head = report.head.map(|id| id.short()).unwrap_or_default();
            let _ = writeln!(out, "HEAD detached at {}", head);
        }
    }
    if report.head.is_none() {
        let _ = writeln!(out, "\nNo commits yet");
    }

    let status = &report.status;
    if !status.staged.is_empty() {
        let _ = writeln!(out, "\nChanges to be committed:");
        for change in &status.staged {
            let _ = writeln!(out, "\t{:<10}{}", format!("{}:", change.kind), change.path);
        }
    }
    if !status.unstaged.is_empty() {
        let _ = writeln!(out, "\nChanges not staged for commit:");
        for change in &status.unstaged {
            let _ = writeln!(out, "\t{:<10}{}", format!("{}:", change.kind), change.path);
        }
    }
    if !status.untracked.is_empty() {
        let _ = writeln!(out, "\nUntracked files:");
        for path in &status.untracked {
            let _ = writeln!(out, "\t{}", path);
        }
    }
    if status.is_clean() {
        let _ = writeln!(out, "\nnothing to commit, working tree clean");
    }
    out
}

pub fn render_log_entry(id: &ObjectId, commit: &Commit, oneline: bool) -> String {
    if oneline {
        return format!("{} {}\n", id.short(), commit.summary());
    }

    let mut out = String::new();
    let _ = writeln!(out, "commit {}", id);
    if commit.parents.len() > 1 {
        let parents: Vec<String> = commit.parents.iter().map(ObjectId::short).collect();
        let _ = writeln!(out, "Merge: {}", parents.join(" "));
    }
    let _ = writeln!(out, "Author: {}", commit.author);
    let _ = writeln!(out, "Date:   {}", format_date(&commit.author));
    let _ = writeln!(out);
    for line in commit.message.lines() {
        let _ = writeln!(out, "    {}", line);
    }
    out
}

/// `<code>\t<path>` line used by `diff --name-only`
pub fn render_change_name(change: &Change) -> String {
    format!("{}\t{}", change.kind.code(), change.path)
}

pub fn render_patch(change: &Change, patch: &Patch) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "diff --mgit a/{0} b/{0}", change.path);
    match change.kind {
        ChangeKind::Added => {
            if let Some(new) = &change.new {
                let _ = writeln!(out, "new file mode {}", new.mode);
            }
        }
        ChangeKind::Deleted => {
            if let Some(old) = &change.old {
                let _ = writeln!(out, "deleted file mode {}", old.mode);
            }
        }
        ChangeKind::Modified => {
            if let (Some(old), Some(new)) = (&change.old, &change.new) {
                if old.mode != new.mode {
                    let _ = writeln!(out, "old mode {}\nnew mode {}", old.mode, new.mode);
                }
            }
        }
    }

    match patch {
        Patch::Text(text) => out.push_str(text),
        Patch::Binary => {
            let _ = writeln!(out, "Binary files a/{0} and b/{0} differ", change.path);
        }
    }
    out
}

/// Textual form of an object for `cat-file`. Blob content is returned as-is.
pub fn render_object(object: &Object) -> Vec<u8> {
    match object {
        Object::Blob(blob) => blob.data.clone(),
        Object::Tree(tree) => {
            let mut out = String::new();
            for entry in tree.iter() {
                let _ = writeln!(
                    out,
                    "{} {} {}\t{}",
                    entry.mode,
                    entry.mode.object_kind(),
                    entry.id,
                    entry.name
                );
            }
            out.into_bytes()
        }
        other => other.serialize(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgit_core::diff::Side;
    use mgit_core::{FileMode, Status, Tree, TreeEntry};

    fn sig() -> Signature {
        Signature::new("Alice", "alice@example.com", 1_700_000_000, 60)
    }

    #[test]
    fn test_format_date_uses_signature_offset() {
        assert_eq!(format_date(&sig()), "Tue Nov 14 23:13:20 2023 +0100");
    }

    #[test]
    fn test_log_entry() {
        let id = ObjectId::new([0xab; 32]);
        let commit = Commit::new(ObjectId::new([1; 32]), vec![], sig(), sig(), "Subject\n\nBody");
        assert_eq!(
            render_log_entry(&id, &commit, true),
            format!("{} Subject\n", id.short())
        );
        let full = render_log_entry(&id, &commit, false);
        assert!(full.starts_with(&format!("commit {}\n", id)));
        assert!(full.contains("Author: Alice <alice@example.com>"));
        assert!(full.contains("    Body"));
    }

    #[test]
    fn test_status_sections() {
        let side = Side {
            mode: FileMode::Regular,
            id: ObjectId::new([2; 32]),
        };
        let report = StatusReport {
            branch: Some("main".into()),
            head: None,
            status: Status {
                staged: vec![Change::added("new.txt", side)],
                unstaged: vec![],
                untracked: vec!["junk.txt".into()],
            },
        };
        let text = render_status(&report);
        assert!(text.starts_with("On branch main\n"));
        assert!(text.contains("No commits yet"));
        assert!(text.contains("Changes to be committed:\n\tadded:    new.txt"));
        assert!(text.contains("Untracked files:\n\tjunk.txt"));
        assert!(!text.contains("not staged"));
    }

    #[test]
    fn test_clean_status() {
        let report = StatusReport {
            branch: Some("main".into()),
            head: Some(ObjectId::new([3; 32])),
            status: Status::default(),
        };
        assert!(render_status(&report).ends_with("nothing to commit, working tree clean\n"));
    }

    #[test]
    fn test_binary_patch() {
        let side = Side {
            mode: FileMode::Regular,
            id: ObjectId::new([4; 32]),
        };
        let change = Change::modified("img.png", side, side);
        let text = render_patch(&change, &Patch::Binary);
        assert!(text.contains("Binary files a/img.png and b/img.png differ"));
        assert_eq!(render_change_name(&change), "M\timg.png");
    }

    #[test]
    fn test_tree_listing() {
        let mut tree = Tree::new();
        tree.insert(TreeEntry::new(FileMode::Directory, "src", ObjectId::new([5; 32])));
        let text = String::from_utf8(render_object(&Object::Tree(tree))).unwrap();
        assert_eq!(text, format!("40000 tree {}\tsrc\n", ObjectId::new([5; 32])));
    }
}
