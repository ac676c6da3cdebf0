//! User settings - defaults applied before a timer is configured

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::timer::SideStrategy;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Rest between phases when an exercise has none of its own
    pub default_rest_secs: u32,
    pub default_side_strategy: SideStrategy,
    /// Time budget per rep for exercises without a hold or duration
    pub secs_per_rep: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_rest_secs: 30,
            default_side_strategy: SideStrategy::Alternate,
            secs_per_rep: 3,
        }
    }
}

impl Settings {
    pub const KEYS: &'static [&'static str] =
        &["default_rest_secs", "default_side_strategy", "secs_per_rep"];

    /// Apply one key/value pair (as stored in the settings table or typed on the CLI)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "default_rest_secs" => self.default_rest_secs = value.trim().parse()?,
            "default_side_strategy" => {
                self.default_side_strategy = match SideStrategy::parse(value) {
                    Some(strategy) => strategy,
                    None => bail!("unknown side strategy: {}", value),
                };
            }
            "secs_per_rep" => {
                let secs: u32 = value.trim().parse()?;
                if secs == 0 {
                    bail!("secs_per_rep must be positive");
                }
                self.secs_per_rep = secs;
            }
            _ => bail!("unknown setting: {} (one of {})", key, Self::KEYS.join(", ")),
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("default_rest_secs", self.default_rest_secs.to_string()),
            (
                "default_side_strategy",
                self.default_side_strategy.as_str().to_string(),
            ),
            ("secs_per_rep", self.secs_per_rep.to_string()),
        ]
    }
}
