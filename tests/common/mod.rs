//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = ProjectFixture::new()
//!     .with_requirements("name>=1.0\n");
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::lists;
    pub use super::ProjectFixture;
}

/// Common requirements-file snippets for testing.
#[allow(dead_code)]
pub mod lists {
    /// A small global list with ranges, exclusions and a marker split.
    pub const GLOBAL: &str = "\
pbr>=2.0.0,!=2.1.0
requests>=2.14.2
six>=1.10.0
futures>=3.0;python_version=='2.7'
";

    /// Exact pins matching [`GLOBAL`].
    pub const CONSTRAINTS: &str = "\
pbr===2.0.0
requests===2.18.0
six===1.10.0
futures===3.0;python_version=='2.7'
";

    /// A project file consistent with [`GLOBAL`].
    pub const PROJECT_OK: &str = "\
pbr>=2.0.0,!=2.1.0
six>=1.10.0
";

    /// A project file with an exclusion the global list does not carry.
    pub const PROJECT_EXTRA_EXCLUSION: &str = "\
pbr>=2.0.0,!=2.1.0,!=2.2.0
";
}

/// A temporary project checkout with requirements files.
pub struct ProjectFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl ProjectFixture {
    /// Create a new fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `requirements.txt` with the given content.
    pub fn with_requirements(self, content: &str) -> Self {
        self.with_file("requirements.txt", content)
    }

    /// Add a `setup.cfg` with the given content.
    pub fn with_setup_cfg(self, content: &str) -> Self {
        self.with_file("setup.cfg", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Read back a file under the fixture root.
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join(path)).expect("Failed to read file")
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}
