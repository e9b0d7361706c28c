//! Command line integration tests
//!
//! Each test runs the `mgit` binary inside its own temporary repository with
//! `HOME` pointed at an empty directory so no user config leaks in.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

struct Sandbox {
    home: TempDir,
    work: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            work: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.work.path()
    }

    fn mgit(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mgit"))
            .args(args)
            .current_dir(self.work.path())
            .env("HOME", self.home.path())
            .env("MGIT_AUTHOR_NAME", "Test User")
            .env("MGIT_AUTHOR_EMAIL", "test@example.com")
            .env_remove("MGIT_LOG")
            .output()
            .unwrap()
    }

    fn ok(&self, args: &[&str]) -> String {
        let out = self.mgit(args);
        assert!(
            out.status.success(),
            "mgit {:?} failed: {}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).unwrap()
    }

    fn write(&self, path: &str, content: &str) {
        let abs = self.root().join(path);
        fs::create_dir_all(abs.parent().unwrap()).unwrap();
        fs::write(abs, content).unwrap();
    }
}

#[test]
fn test_full_workflow() {
    let sb = Sandbox::new();
    assert!(sb.ok(&["init"]).starts_with("Initialized empty MGit repository"));

    sb.write("a.txt", "A\n");
    sb.ok(&["add", "a.txt"]);
    let first = sb.ok(&["commit", "-m", "add a"]);
    assert!(first.starts_with("[main "));

    sb.write("a.txt", "B\n");
    let diff = sb.ok(&["diff"]);
    assert!(diff.contains("-A"));
    assert!(diff.contains("+B"));

    sb.ok(&["add", "a.txt"]);
    assert_eq!(sb.ok(&["diff", "--cached", "--name-only"]), "M\ta.txt\n");
    sb.ok(&["commit", "-m", "change a"]);

    let log = sb.ok(&["log", "--oneline"]);
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("change a"));
    assert!(lines[1].ends_with("add a"));

    let full = sb.ok(&["log", "-n", "1"]);
    assert!(full.contains("Author: Test User <test@example.com>"));
    assert!(!full.contains("add a"));
}

#[test]
fn test_exit_codes() {
    let sb = Sandbox::new();
    let out = sb.mgit(&["status"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("not an mgit repository"));

    sb.ok(&["init"]);
    assert_eq!(sb.mgit(&["init"]).status.code(), Some(1));
    assert_eq!(sb.mgit(&["commit", "-m", "empty"]).status.code(), Some(1));
    assert_eq!(sb.mgit(&["add", "missing.txt"]).status.code(), Some(1));
    assert_eq!(sb.mgit(&["log"]).status.code(), Some(1));
    assert_eq!(sb.mgit(&["bogus-command"]).status.code(), Some(1));
}

#[test]
fn test_corruption_exits_with_two() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    sb.write("a.txt", "A");
    sb.ok(&["add", "a.txt"]);
    sb.ok(&["commit", "-m", "first"]);
    assert!(sb.ok(&["fsck"]).contains("checked 3 objects"));

    let objects = sb.root().join(".mgit/objects");
    for fanout in fs::read_dir(&objects).unwrap() {
        for object in fs::read_dir(fanout.unwrap().path()).unwrap() {
            let path = object.unwrap().path();
            let mut raw = fs::read(&path).unwrap();
            raw.push(b'!');
            fs::write(&path, raw).unwrap();
        }
    }

    let out = sb.mgit(&["fsck"]);
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(sb.mgit(&["log"]).status.code(), Some(2));
}

#[test]
fn test_status_output() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    sb.write("staged.txt", "s");
    sb.write("loose.txt", "l");
    sb.ok(&["add", "staged.txt"]);

    let status = sb.ok(&["status"]);
    assert!(status.starts_with("On branch main"));
    assert!(status.contains("No commits yet"));
    assert!(status.contains("added:    staged.txt"));
    assert!(status.contains("Untracked files:\n\tloose.txt"));

    let json = sb.ok(&["status", "--json"]);
    assert!(json.contains("\"branch\": \"main\""));
    assert!(json.contains("\"untracked\""));
}

#[test]
fn test_tags_and_cat_file() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    sb.write("a.txt", "hello");
    sb.ok(&["add", "."]);
    sb.ok(&["commit", "-m", "first"]);

    sb.ok(&["tag", "light"]);
    sb.ok(&["tag", "-m", "release notes", "v1.0"]);
    assert_eq!(sb.ok(&["tag"]), "light\nv1.0\n");
    assert_eq!(sb.mgit(&["tag", "v1.0"]).status.code(), Some(1));

    assert_eq!(sb.ok(&["cat-file", "-t", "v1.0"]), "tag\n");
    assert!(sb.ok(&["cat-file", "v1.0"]).contains("tag v1.0\ntagger Test User"));
    assert_eq!(sb.ok(&["cat-file", "-t", "light"]), "commit\n");

    let commit = sb.ok(&["cat-file", "HEAD"]);
    let tree = commit.lines().next().unwrap().strip_prefix("tree ").unwrap().to_string();
    assert!(sb.ok(&["cat-file", &tree]).contains("100644 blob"));
}

#[test]
fn test_config_commands() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    sb.ok(&["config", "core.editor", "vi"]);
    assert_eq!(sb.ok(&["config", "core.editor"]), "vi\n");

    let listed = sb.ok(&["config", "--list"]);
    assert!(listed.contains("core.bare=false\n"));
    assert!(listed.contains("user.name=Test User\n"));

    sb.ok(&["config", "--unset", "core.editor"]);
    assert_eq!(sb.mgit(&["config", "core.editor"]).status.code(), Some(1));
    assert_eq!(sb.mgit(&["config", "badkey", "x"]).status.code(), Some(1));
}

#[test]
fn test_default_branch_from_global_config() {
    let sb = Sandbox::new();
    fs::write(
        sb.home.path().join(".mgitconfig"),
        r#"{ "init.defaultBranch": "trunk" }"#,
    )
    .unwrap();
    sb.ok(&["init"]);
    assert!(sb.ok(&["status"]).starts_with("On branch trunk"));
}

#[test]
fn test_rm_cached() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    sb.write("a.txt", "A");
    sb.ok(&["add", "a.txt"]);
    assert_eq!(sb.ok(&["rm", "--cached", "a.txt"]), "rm 'a.txt'\n");
    assert!(sb.root().join("a.txt").exists());
    assert!(sb.ok(&["status"]).contains("Untracked files:\n\ta.txt"));
}

#[test]
fn test_tag_annotate_without_message_and_delete() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    sb.write("a.txt", "A");
    sb.ok(&["add", "a.txt"]);
    sb.ok(&["commit", "-m", "first"]);

    sb.ok(&["tag", "-a", "v1"]);
    assert_eq!(sb.ok(&["cat-file", "-t", "v1"]), "tag\n");
    assert!(sb.ok(&["cat-file", "v1"]).ends_with("\n\nTag v1"));
    assert_eq!(sb.ok(&["tag", "-l"]), "v1\n");

    assert!(sb.ok(&["tag", "-d", "v1"]).starts_with("Deleted tag 'v1'"));
    assert_eq!(sb.ok(&["tag"]), "");
    assert_eq!(sb.mgit(&["tag", "-d", "v1"]).status.code(), Some(1));
    assert_eq!(sb.mgit(&["cat-file", "v1"]).status.code(), Some(1));
}

#[test]
fn test_commit_allow_empty_and_add_all() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    assert!(sb.ok(&["commit", "--allow-empty", "-m", "root"]).starts_with("[main "));

    sb.write("a.txt", "A");
    sb.write("src/b.rs", "B");
    sb.ok(&["add", "-A"]);
    assert_eq!(sb.ok(&["diff", "--cached", "--name-only"]), "A\ta.txt\nA\tsrc/b.rs\n");
    sb.ok(&["commit", "-m", "files"]);

    fs::remove_file(sb.root().join("a.txt")).unwrap();
    sb.ok(&["add", "--all"]);
    assert_eq!(sb.ok(&["diff", "--cached", "--name-only"]), "D\ta.txt\n");
    assert_eq!(sb.mgit(&["add"]).status.code(), Some(1));

    assert_eq!(sb.ok(&["log", "--oneline"]).lines().count(), 2);
    sb.ok(&["commit", "-m", "drop a"]);
    sb.ok(&["commit", "--allow-empty", "-m", "marker"]);
    assert_eq!(sb.ok(&["log", "--oneline"]).lines().count(), 4);
}

#[test]
fn test_cat_file_path_in_revision() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    sb.write("src/main.rs", "fn main() {}\n");
    sb.ok(&["add", "src"]);
    sb.ok(&["commit", "-m", "first"]);

    assert_eq!(sb.ok(&["cat-file", "HEAD:src/main.rs"]), "fn main() {}\n");
    assert_eq!(sb.ok(&["cat-file", "-t", "HEAD:src"]), "tree\n");
    assert_eq!(sb.mgit(&["cat-file", "HEAD:nope"]).status.code(), Some(1));
}

#[cfg(unix)]
#[test]
fn test_unrepresentable_and_symlinked_paths_are_user_errors() {
    let sb = Sandbox::new();
    sb.ok(&["init"]);
    sb.write("a\nb", "x");
    sb.write("target.txt", "t");
    std::os::unix::fs::symlink(sb.root().join("target.txt"), sb.root().join("link")).unwrap();

    assert_eq!(sb.mgit(&["add", "a\nb"]).status.code(), Some(1));
    assert_eq!(sb.mgit(&["add", "link"]).status.code(), Some(1));
    sb.ok(&["add", "."]);
    assert_eq!(sb.ok(&["diff", "--cached", "--name-only"]), "A\ttarget.txt\n");
    sb.ok(&["commit", "-m", "first"]);
    assert!(sb.ok(&["status"]).contains("nothing to commit"));
}
