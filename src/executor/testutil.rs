//! Shell-script testlets for executor tests

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::testlet::Invocation;

/// Install an executable `/bin/sh` testlet under `<opt_dir>/assets/testlets`
pub fn write_testlet(opt_dir: &Path, name: &str, body: &str) -> Invocation {
    let dir = opt_dir.join("assets").join("testlets");
    std::fs::create_dir_all(&dir).unwrap();

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    Invocation::External { path }
}
