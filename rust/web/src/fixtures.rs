use draftwatch_core::cards::{CardCatalog, CardInfo};

const SAMPLE_CARDS: &[(&str, u8, &str)] = &[
    ("CS2_231", 0, "Wisp"),
    ("EX1_277", 1, "Arcane Missiles"),
    ("CS2_024", 2, "Frostbolt"),
    ("EX1_066", 2, "Acidic Swamp Ooze"),
    ("CS2_025", 2, "Arcane Explosion"),
    ("EX1_012", 2, "Bloodmage Thalnos"),
    ("CS2_023", 3, "Arcane Intellect"),
    ("CS2_029", 4, "Fireball"),
    ("CS2_182", 4, "Chillwind Yeti"),
    ("CS2_200", 6, "Boulderfist Ogre"),
    ("CS2_032", 7, "Flamestrike"),
    ("GVG_110", 7, "Dr. Boom"),
    ("EX1_562", 9, "Onyxia"),
    ("NEW1_030", 10, "Deathwing"),
    ("EX1_279", 10, "Pyroblast"),
    ("EX1_620", 25, "Molten Giant"),
];

/// Small built-in catalog used when no catalog file is configured and by tests.
pub fn sample_catalog() -> CardCatalog {
    let entries = SAMPLE_CARDS.iter().map(|(id, mana, name)| {
        (
            *id,
            CardInfo {
                mana: *mana,
                name: (*name).to_string(),
            },
        )
    });
    CardCatalog::from_entries(entries).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_catalog_loads_every_card() {
        assert_eq!(sample_catalog().len(), SAMPLE_CARDS.len());
    }
}
