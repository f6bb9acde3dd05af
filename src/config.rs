use crate::error::ConfigError;

/// Smallest number of bytes the region grows by, amortizing the cost of the
/// growth system call.
pub const DEFAULT_MIN_GROWTH: usize = 1000;

/// Environment variable read by [`ArenaConfig::from_env`].
pub const MIN_GROWTH_ENV: &str = "BRKALLOC_MIN_GROWTH";

/// Tunables of an [`Arena`](crate::Arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
  pub min_growth: usize,
}

impl Default for ArenaConfig {
  fn default() -> Self {
    Self {
      min_growth: DEFAULT_MIN_GROWTH,
    }
  }
}

impl ArenaConfig {
  pub fn with_min_growth(
    mut self,
    min_growth: usize,
  ) -> Self {
    self.min_growth = min_growth;
    self
  }

  /// Checks that every growth request can be handed to the OS primitive.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let max = isize::MAX as usize;
    if self.min_growth == 0 || self.min_growth > max {
      return Err(ConfigError::InvalidMinGrowth {
        value: self.min_growth,
        max,
      });
    }
    Ok(())
  }

  /// Defaults overridden by [`MIN_GROWTH_ENV`] when it is set.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Same as [`from_env`](Self::from_env) with a custom variable source.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(raw) = lookup(MIN_GROWTH_ENV) {
      config.min_growth = raw.trim().parse().map_err(|_| ConfigError::Parse {
        key: MIN_GROWTH_ENV,
        value: raw.clone(),
      })?;
    }

    config.validate()?;
    Ok(config)
  }
}
