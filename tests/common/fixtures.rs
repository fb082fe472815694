//! Test fixtures - deployment documents reused across tests.

/// Local stages with a database section of an unknown type
pub const UNKNOWN_DB_CONFIG: &str = "db:
  type: oracle
  name: app
";

/// A share that is synced from the source stage
pub const SYNC_UPLOADS_CONFIG: &str = "root: srv
sync:
  - uploads
";

/// Project deployed from a local repository (`{repo}` is replaced by the test)
pub const GIT_PROJECT_CONFIG: &str = "root: srv
vcs:
  path: {repo}
options:
  branch: main
share:
  - storage/logs
";
