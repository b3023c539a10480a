//! Constants used throughout the rowtree library.

/// Number of rows a result set pulls from its cursor per fetch, unless the
/// collection configures another batch size.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Name shown for children or paths that are not bound yet.
pub const UNBOUND: &str = "<unbound>";
