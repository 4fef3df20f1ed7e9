//! Discovery of systems under test and test cases by naming convention.
//!
//! Systems come in `setup-<name>` / `teardown-<name>` pairs; test cases are
//! `<name>.out` executables next to a `<name>.c` source. Discovery is all or
//! nothing: one unpaired artifact fails the whole scan.

use crate::error::{FsdiffError, FsdiffResult};
use crate::system::FileSystemUnderTest;
use crate::test_case::TestCase;
use std::fs;
use std::path::Path;

const SETUP_PREFIX: &str = "setup-";
const TEARDOWN_PREFIX: &str = "teardown-";
const EXECUTABLE_SUFFIX: &str = ".out";
const SOURCE_SUFFIX: &str = ".c";

/// Systems under test found in a run root, sorted by name.
#[derive(Debug)]
pub struct SystemRegistry {
    systems: Vec<FileSystemUnderTest>,
}

impl SystemRegistry {
    pub fn discover(root: &Path) -> FsdiffResult<Self> {
        let mut systems = Vec::new();
        for file_name in file_names(root)? {
            let Some(name) = file_name.strip_prefix(SETUP_PREFIX) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let setup = root.join(&file_name);
            let teardown = root.join(format!("{TEARDOWN_PREFIX}{name}"));
            if !teardown.is_file() {
                return Err(FsdiffError::TeardownScriptNotFound(name.to_string()));
            }

            make_executable(&setup)?;
            make_executable(&teardown)?;
            systems.push(FileSystemUnderTest::new(name, setup, teardown));
        }

        systems.sort_by(|a, b| a.name().cmp(b.name()));
        tracing::debug!(count = systems.len(), "discovered systems");
        Ok(Self { systems })
    }

    pub fn names(&self) -> Vec<String> {
        self.systems.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn into_systems(self) -> Vec<FileSystemUnderTest> {
        self.systems
    }
}

/// Test-case executables found in a run root.
#[derive(Debug)]
pub struct TestCaseRegistry {
    test_cases: Vec<TestCase>,
}

impl TestCaseRegistry {
    pub fn discover(root: &Path) -> FsdiffResult<Self> {
        let mut test_cases = Vec::new();
        for file_name in file_names(root)? {
            let Some(name) = file_name.strip_suffix(EXECUTABLE_SUFFIX) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let executable = root.join(&file_name);
            let source = root.join(format!("{name}{SOURCE_SUFFIX}"));
            if !source.is_file() {
                return Err(FsdiffError::TestCaseSourceNotFound(name.to_string()));
            }

            make_executable(&executable)?;
            test_cases.push(TestCase::new(name, executable, source));
        }

        // Callers impose their own order; sorting here only pins down ties.
        test_cases.sort_by(|a, b| a.name().cmp(b.name()));
        tracing::debug!(count = test_cases.len(), "discovered test cases");
        Ok(Self { test_cases })
    }

    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }

    pub fn into_test_cases(self) -> Vec<TestCase> {
        self.test_cases
    }
}

/// Names of the regular files directly inside `dir`.
fn file_names(dir: &Path) -> FsdiffResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> FsdiffResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    if mode & 0o111 != 0o111 {
        perms.set_mode(mode | 0o111);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> FsdiffResult<()> {
    Ok(())
}
