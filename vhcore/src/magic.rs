/// Name of the environment variable containing the path to the harness configuration file.
pub const ENV_CONFIG_PATH: &str = "VH_CONFIG_PATH";

/// Environment override for [`crate::utils::conf::ProcessConfig::do_prove`].
pub const ENV_DO_PROVE: &str = "VH_DO_PROVE";

/// Environment override for [`crate::utils::conf::ProcessConfig::debug`].
pub const ENV_DEBUG: &str = "VH_DEBUG";

/// Number of trials used by the `test` entry points.
pub const DEFAULT_SAMPLING_TRIALS: u32 = 100;

/// Seed of the reference engine sampler when none is supplied.
pub const DEFAULT_SAMPLING_SEED: u64 = 0x5eed_cafe_f00d_0001;

/// Largest number of input bits the reference engine enumerates exhaustively.
pub const EXHAUSTIVE_BIT_LIMIT: u64 = 20;

/// Draws the sampler makes for one trial before giving up on finding an input
/// that satisfies the preconditions.
pub const SAMPLING_REDRAW_LIMIT: u32 = 1000;

/// Maximum call depth of reference models before the run is aborted.
pub const MAX_CALL_DEPTH: usize = 64;

/// Journal tags. Each verdict has its own tag so an assumed obligation can
/// never be read as a proved one.
pub const TAG_PROVED: &str = "PROVED";
pub const TAG_ASSUMED: &str = "ASSUMED";
pub const TAG_SAMPLED: &str = "SAMPLED";
pub const TAG_FAILED: &str = "FAILED";
