use crate::errors::ParseHeroError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The hero a drafter has picked. Wire names are lower-case.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hero {
    #[default]
    NoHero,
    Druid,
    Hunter,
    Mage,
    Priest,
    Shaman,
    Thief,
    Paladin,
    Warlock,
    Warrior,
}

impl Hero {
    pub const ALL: [Hero; 10] = [
        Hero::NoHero,
        Hero::Druid,
        Hero::Hunter,
        Hero::Mage,
        Hero::Priest,
        Hero::Shaman,
        Hero::Thief,
        Hero::Paladin,
        Hero::Warlock,
        Hero::Warrior,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Hero::NoHero => "no_hero",
            Hero::Druid => "druid",
            Hero::Hunter => "hunter",
            Hero::Mage => "mage",
            Hero::Priest => "priest",
            Hero::Shaman => "shaman",
            Hero::Thief => "thief",
            Hero::Paladin => "paladin",
            Hero::Warlock => "warlock",
            Hero::Warrior => "warrior",
        }
    }
}

impl fmt::Display for Hero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hero {
    type Err = ParseHeroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Hero::ALL
            .into_iter()
            .find(|hero| hero.as_str() == lowered)
            .ok_or_else(|| ParseHeroError(s.to_string()))
    }
}
