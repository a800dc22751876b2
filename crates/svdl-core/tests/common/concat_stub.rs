//! Stand-in for the external concat tool, used where the test environment
//! has no ffmpeg. Accepts the exact argument shape the merger emits
//! (`-f concat -safe 0 -i <list> -c copy <output>`) and byte-concatenates
//! the listed files, which is what stream-copy concatenation amounts to for
//! these tests.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    exit 0
fi
list="$6"
out="$9"
: > "$out"
while IFS= read -r line; do
    p=${line#file \'}
    p=${p%\'}
    cat "$p" >> "$out" || exit 1
done < "$list"
"#;

/// Writes the stub tool into `dir` and returns its path.
pub fn install(dir: &Path) -> PathBuf {
    let path = dir.join("concat-stub");
    std::fs::write(&path, SCRIPT).expect("write stub");
    let mut perms = std::fs::metadata(&path).expect("stat stub").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod stub");
    path
}
