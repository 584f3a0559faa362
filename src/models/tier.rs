// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! League tier table.

use serde::{Deserialize, Serialize};

/// A named subscriber bracket with an optional leaderboard channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    /// Inclusive lower bound
    pub min_subs: u64,
    /// Discord channel that carries this tier's leaderboard
    #[serde(default)]
    pub channel_id: Option<String>,
}

impl Tier {
    pub fn new(name: impl Into<String>, min_subs: u64, channel_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            min_subs,
            channel_id,
        }
    }
}

/// Ordered, validated tier table.
///
/// Thresholds are strictly increasing and start at 0, so every subscriber
/// count falls in exactly one tier. The top tier is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, TierTableError> {
        let first = tiers.first().ok_or(TierTableError::Empty)?;
        if first.min_subs != 0 {
            return Err(TierTableError::LowestNotZero(first.min_subs));
        }

        for pair in tiers.windows(2) {
            if pair[1].min_subs <= pair[0].min_subs {
                return Err(TierTableError::NotIncreasing {
                    tier: pair[1].name.clone(),
                });
            }
        }

        for (i, tier) in tiers.iter().enumerate() {
            if tier.name.trim().is_empty() {
                return Err(TierTableError::EmptyName);
            }
            if tiers[..i]
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(&tier.name))
            {
                return Err(TierTableError::DuplicateName(tier.name.clone()));
            }
        }

        Ok(Self { tiers })
    }

    /// The built-in Bronze / Silver / Gold / Platinum table.
    pub fn standard(
        bronze: Option<String>,
        silver: Option<String>,
        gold: Option<String>,
        platinum: Option<String>,
    ) -> Self {
        Self {
            tiers: vec![
                Tier::new("Bronze", 0, bronze),
                Tier::new("Silver", 1_000, silver),
                Tier::new("Gold", 10_000, gold),
                Tier::new("Platinum", 100_000, platinum),
            ],
        }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn lowest(&self) -> &Tier {
        &self.tiers[0]
    }

    /// Exact lookup by name.
    pub fn get(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// Case-insensitive lookup, for names typed by users.
    pub fn find(&self, name: &str) -> Option<&Tier> {
        self.tiers
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Position of a tier in the table (0 = lowest).
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.name == name)
    }
}

/// Tier table validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TierTableError {
    #[error("tier table is empty")]
    Empty,

    #[error("lowest tier must start at 0 subscribers, got {0}")]
    LowestNotZero(u64),

    #[error("tier {tier} does not raise the threshold")]
    NotIncreasing { tier: String },

    #[error("tier name must not be empty")]
    EmptyName,

    #[error("duplicate tier name: {0}")]
    DuplicateName(String),
}
