//! Integration tests driving the library directly, in-process, without sockets
//! (§8 "End-to-end scenarios"). Each test below names the scenario it implements.

use std::sync::Arc;
use std::thread;

use tecnicofs::dispatcher::{apply, parse};
use tecnicofs::inode::NewInodeKind;
use tecnicofs::path::PathName;
use tecnicofs::tree::Tree;

const MAX_NAME: usize = 40;
const MAX_PATH: usize = 100;

fn p(s: &str) -> PathName {
    PathName::parse(s, MAX_NAME, MAX_PATH).unwrap()
}

fn run(tree: &Tree, line: &str) -> i32 {
    let command = parse(line, MAX_NAME, MAX_PATH).unwrap();
    apply(tree, &command)
}

/// Scenario 1: create a directory and a file inside it, confirm lookup, reject
/// deleting the non-empty directory, then delete child then parent.
#[test]
fn scenario_1_create_delete_sequencing() {
    let tree = Tree::new(50, 20, 2);
    assert_eq!(run(&tree, "c /a d"), 0);
    assert_eq!(run(&tree, "c /a/b f"), 0);
    assert!(run(&tree, "l /a/b") >= 1);
    assert_eq!(run(&tree, "d /a"), -1);
    assert_eq!(run(&tree, "d /a/b"), 0);
    assert_eq!(run(&tree, "d /a"), 0);
}

/// Scenario 2: move a file across two unrelated directories; old path is gone, new
/// path resolves to a valid inumber.
#[test]
fn scenario_2_move_across_directories() {
    let tree = Tree::new(50, 20, 2);
    assert_eq!(run(&tree, "c /x d"), 0);
    assert_eq!(run(&tree, "c /y d"), 0);
    assert_eq!(run(&tree, "c /x/f f"), 0);
    assert_eq!(run(&tree, "m /x/f /y/f"), 0);
    assert_eq!(run(&tree, "l /x/f"), -1);
    assert!(run(&tree, "l /y/f") >= 1);
}

/// Scenario 3: a directory cannot be moved into its own subtree.
#[test]
fn scenario_3_move_self_nesting_rejected() {
    let tree = Tree::new(50, 20, 2);
    assert_eq!(run(&tree, "c /a d"), 0);
    assert_eq!(run(&tree, "m /a /a/b"), -1);
}

/// Scenario 4: moving onto an existing name is rejected, both sides otherwise valid.
#[test]
fn scenario_4_move_name_collision_rejected() {
    let tree = Tree::new(50, 20, 2);
    assert_eq!(run(&tree, "c /a d"), 0);
    assert_eq!(run(&tree, "c /b d"), 0);
    assert_eq!(run(&tree, "c /a/k f"), 0);
    assert_eq!(run(&tree, "c /b/k f"), 0);
    assert_eq!(run(&tree, "m /a/k /b/k"), -1);
}

/// Scenario 5: two threads concurrently populate a shared directory with disjoint
/// children. The directory ends up with exactly all of them, no duplicates, no
/// crashes/panics.
#[test]
fn scenario_5_concurrent_disjoint_creates() {
    let tree = Arc::new(Tree::new(200, 120, 2));
    assert_eq!(run(&tree, "c /p d"), 0);

    let mut handles = Vec::new();
    for t in 0..2 {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let path = p(&format!("/p/c{t}_{i}"));
                tree.create(&path, NewInodeKind::File).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let root_inumber = tree.lookup(&p("/p")).unwrap();
    let guard = tree.table().lock(root_inumber).read().unwrap();
    let entries = guard.entries();
    assert_eq!(entries.len(), 100);
    let mut names: Vec<&str> = entries.iter().map(|(_, n)| *n).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 100);
}

/// Scenario 6: two threads swap nodes between two directories in a loop
/// (`m /a/x /b/x` racing `m /b/y /a/y`). After many iterations the tree is still
/// well-formed: every name appears once, every referenced inumber is in use.
#[test]
fn scenario_6_concurrent_cross_moves_stay_well_formed() {
    let tree = Arc::new(Tree::new(50, 20, 2));
    tree.create(&p("/a"), NewInodeKind::Directory).unwrap();
    tree.create(&p("/b"), NewInodeKind::Directory).unwrap();
    tree.create(&p("/a/x"), NewInodeKind::File).unwrap();
    tree.create(&p("/b/y"), NewInodeKind::File).unwrap();

    const ITERATIONS: usize = 200;

    let mover_a = {
        let tree = Arc::clone(&tree);
        thread::spawn(move || {
            for _ in 0..ITERATIONS {
                let _ = tree.move_node(&p("/a/x"), &p("/b/x"));
                let _ = tree.move_node(&p("/b/x"), &p("/a/x"));
            }
        })
    };
    let mover_b = {
        let tree = Arc::clone(&tree);
        thread::spawn(move || {
            for _ in 0..ITERATIONS {
                let _ = tree.move_node(&p("/b/y"), &p("/a/y"));
                let _ = tree.move_node(&p("/a/y"), &p("/b/y"));
            }
        })
    };
    mover_a.join().unwrap();
    mover_b.join().unwrap();

    // Regardless of which thread's moves landed last, x and y each resolve to
    // exactly one live location and nowhere else.
    let x_in_a = tree.lookup(&p("/a/x")).is_ok();
    let x_in_b = tree.lookup(&p("/b/x")).is_ok();
    assert_ne!(x_in_a, x_in_b, "x must live in exactly one of /a or /b");

    let y_in_a = tree.lookup(&p("/a/y")).is_ok();
    let y_in_b = tree.lookup(&p("/b/y")).is_ok();
    assert_ne!(y_in_a, y_in_b, "y must live in exactly one of /a or /b");

    for dir in ["/a", "/b"] {
        let inumber = tree.lookup(&p(dir)).unwrap();
        let guard = tree.table().lock(inumber).read().unwrap();
        let entries = guard.entries();
        let mut names: Vec<&str> = entries.iter().map(|(_, n)| *n).collect();
        let before_dedup = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before_dedup, "no directory may list the same name twice");
    }
}

/// Boundary: table-full then delete-then-create succeeds again.
#[test]
fn boundary_table_full_then_recovers() {
    let tree = Tree::new(3, 20, 2);
    // root occupies slot 0; two more inodes fill the table.
    tree.create(&p("/a"), NewInodeKind::File).unwrap();
    tree.create(&p("/b"), NewInodeKind::File).unwrap();
    assert!(tree.create(&p("/c"), NewInodeKind::File).is_err());
    tree.delete(&p("/a")).unwrap();
    assert!(tree.create(&p("/c"), NewInodeKind::File).is_ok());
}

/// Boundary: deleting a non-empty directory fails until its children are gone.
#[test]
fn boundary_nonempty_directory_then_recovers() {
    let tree = Tree::new(50, 20, 2);
    tree.create(&p("/d"), NewInodeKind::Directory).unwrap();
    tree.create(&p("/d/f"), NewInodeKind::File).unwrap();
    assert!(tree.delete(&p("/d")).is_err());
    tree.delete(&p("/d/f")).unwrap();
    assert!(tree.delete(&p("/d")).is_ok());
}

/// Boundary: root is immovable and undeletable no matter what else exists.
#[test]
fn boundary_root_is_immutable() {
    let tree = Tree::new(50, 20, 2);
    tree.create(&p("/a"), NewInodeKind::Directory).unwrap();
    assert!(tree.delete(&p("/")).is_err());
    assert!(tree.move_node(&p("/"), &p("/a/r")).is_err());
}

/// Law: repeating a failing operation does not mutate the tree.
#[test]
fn idempotent_failure_does_not_mutate() {
    let tree = Tree::new(50, 20, 2);
    tree.create(&p("/a"), NewInodeKind::File).unwrap();
    let before = tree.lookup(&p("/a")).unwrap();
    assert!(tree.create(&p("/a"), NewInodeKind::File).is_err());
    assert!(tree.create(&p("/a"), NewInodeKind::File).is_err());
    assert_eq!(tree.lookup(&p("/a")).unwrap(), before);
}

/// Law: moving a directory preserves the inumbers of its descendants.
#[test]
fn move_preserves_descendant_identity() {
    let tree = Tree::new(50, 20, 2);
    tree.create(&p("/src"), NewInodeKind::Directory).unwrap();
    tree.create(&p("/src/inner"), NewInodeKind::Directory).unwrap();
    let leaf = tree.create(&p("/src/inner/leaf"), NewInodeKind::File).unwrap();
    let inner = tree.lookup(&p("/src/inner")).unwrap();

    tree.move_node(&p("/src"), &p("/dst")).unwrap();

    assert_eq!(tree.lookup(&p("/dst/inner")).unwrap(), inner);
    assert_eq!(tree.lookup(&p("/dst/inner/leaf")).unwrap(), leaf);
}
