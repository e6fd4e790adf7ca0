//! Depth-first tree dump: writes an indented `f`/`d` listing of the whole tree to a file.

use std::fs::File;
use std::io::{self, Write};

use crate::inode::{InodeTable, Inumber, ROOT};
use crate::tree::Tree;

/// Writes a human-readable, depth-first listing of the tree to `path`: one line per
/// entry, `f <name>` for files and `d <name>` for directories, with each directory's
/// contents indented one level further than the directory itself. Root itself has no
/// name and is never printed; its direct children start at indent level zero.
pub fn dump_to_file(tree: &Tree, path: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    dump_dir(tree.table(), ROOT, 0, &mut file)?;
    Ok(())
}

fn dump_dir(table: &InodeTable, dir: Inumber, depth: usize, out: &mut impl Write) -> io::Result<()> {
    let mut entries: Vec<(Inumber, String)> = {
        let guard = table.lock(dir).read().unwrap();
        guard.entries().into_iter().map(|(i, n)| (i, n.to_string())).collect()
    };
    entries.sort_by(|a, b| a.1.cmp(&b.1));

    let indent = "  ".repeat(depth);
    for (child, name) in entries {
        let is_dir = table.lock(child).read().unwrap().is_directory();
        if is_dir {
            writeln!(out, "{}d {}", indent, name)?;
            dump_dir(table, child, depth + 1, out)?;
        } else {
            writeln!(out, "{}f {}", indent, name)?;
        }
    }
    Ok(())
}
