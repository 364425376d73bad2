use crate::tables::{column_count, header, TableStore};

/// System instruction sent with every generation request. The model acts as
/// a data designer for the game and must answer with bare payloads.
pub const SYSTEM_PROMPT: &str = "\
You are a data designer for a hardcore tactical mercenary RPG in a grounded \
low-fantasy setting. The player runs a small mercenary company: managing \
equipment, recruiting characters, and fighting turn-based battles on a hex \
map. Actions cost action points and build fatigue, armor absorbs damage \
through durability, and heavier gear raises the maximum fatigue penalty.

Data tables use '|' as the column separator (never commas). Follow the \
header and the value ranges of the existing rows exactly. Output only raw \
data rows or raw JSON as requested; never explanations, comments, or \
markdown fences.";

/// Region keys of the world document's quest containers.
pub const QUEST_REGIONS: [&str; 4] = [
    "CENTRAL_PLAINS",
    "NORTH_MARCHES",
    "RIVERLANDS",
    "WESTERN_HILLS",
];

/// Quest kinds each region may hold.
pub const QUEST_KINDS: [&str; 3] = ["HUNT", "PATROL", "ESCORT"];

/// A prompt for one table category, together with the table it extends and
/// the column count every generated row must match.
pub struct TablePrompt {
    pub prompt: String,
    pub table: &'static str,
    pub expected_cols: usize,
}

fn table_prompt(store: &TableStore, table: &'static str, body: &str) -> TablePrompt {
    let content = store.read(table);
    let header_line = header(&content).to_string();
    let expected_cols = column_count(&header_line);

    let prompt = format!(
        "Generate more rows for one of my game's data tables.\n\n\
         Header:\n{header}\n\n\
         {body}\n\n\
         Existing rows (match their value ranges and tone; do not repeat them):\n\
         {content}\n\n\
         Output only data rows, no header row and no other text. \
         Each row uses '|' as separator and has exactly {cols} columns.",
        header = header_line,
        body = body,
        content = content,
        cols = expected_cols,
    );

    TablePrompt {
        prompt,
        table,
        expected_cols,
    }
}

pub fn weapons(store: &TableStore) -> TablePrompt {
    table_prompt(
        store,
        "weapons.csv",
        "Field notes:\n\
         - id: w_{type}_{number}, e.g. w_dagger_1, w_cleaver_2\n\
         - value: coin price (40-3000, better is dearer)\n\
         - weight: 3-20; durability: 20-100\n\
         - dmgMin/dmgMax: damage range\n\
         - armorPen: 0.0-0.6 (daggers high ~0.3-0.5, heavy weapons low ~0.1-0.3)\n\
         - armorDmg: 0.3-1.8 (maces and axes highest, daggers lowest)\n\
         - fatigueCost: 8-22 per swing; range: melee 1, polearm 2, thrown 3-4, bow or crossbow 6\n\
         - hitChanceMod: -10 to +20 (spears and daggers high, axes and hammers low)\n\
         - description: one short line of in-world flavor\n\n\
         Cover the missing weapon families at two or three quality tiers each: \
         daggers (light, high armorPen, low fatigueCost), cleavers (bleed), \
         flails (ignore shields), hammers (heavy, high armorDmg), and thrown \
         weapons (range 3-4, weight 2-5). Then add three or four higher or \
         lower tier variants of existing families. About 18-22 new rows.",
    )
}

pub fn armor(store: &TableStore) -> TablePrompt {
    table_prompt(
        store,
        "armor.csv",
        "Field notes:\n\
         - id: a_{type}; value 20-5000; weight 2-40\n\
         - durability: 30-350, the damage the armor can soak\n\
         - maxFatiguePenalty: 0-35, heavier armor costs more\n\
         - description: one short line of in-world flavor\n\n\
         The current rows step durability 30, 50, 90, 140, 210, 300. Fill the \
         gaps: 60-80 (reinforced leathers), 100-130, 160-200, 240-280, plus \
         one or two exceptional suits at 330-400. About 6-8 new rows.",
    )
}

pub fn helmets(store: &TableStore) -> TablePrompt {
    table_prompt(
        store,
        "helmets.csv",
        "Field notes:\n\
         - id: h_{type}; value 15-2000; weight 1-15\n\
         - durability: 20-250; maxFatiguePenalty: 0-12\n\
         - description: one short line of in-world flavor\n\n\
         The current rows step durability 20, 50, 120, 200. Fill the gaps at \
         30-40, 70-100, 150-180, and add a top tier at 230-280. About 5-6 new \
         rows.",
    )
}

pub fn shields(store: &TableStore) -> TablePrompt {
    table_prompt(
        store,
        "shields.csv",
        "Field notes:\n\
         - id: s_{type}; value 50-800; weight 3-25; durability 15-100\n\
         - defenseBonus: melee defense 5-30; rangedBonus: 3-35\n\
         - fatigueCost: 3-20 per block\n\
         - description: one short line of in-world flavor\n\n\
         Add one crude plank shield below the current light tier, one shield \
         between each existing tier, and one special heavy shield with high \
         defense at a steep weight. About 4-5 new rows.",
    )
}

pub fn backgrounds(store: &TableStore) -> TablePrompt {
    table_prompt(
        store,
        "backgrounds.csv",
        "Field notes:\n\
         - id: an UPPERCASE identifier, e.g. BLACKSMITH\n\
         - name: short display name; icon: one emoji\n\
         - salaryMult: 0.5-3.5, rarer or better-born costs more\n\
         - gearQuality: 0 none, 1 leather tier, 2 bronze tier\n\
         - every *Mod column is a \"min,max\" pair, e.g. 5,15 or -10,0\n\
         - desc: a few words\n\n\
         Generate about ten new backgrounds spanning cheap labourers, skilled \
         tradesmen, and one or two rare expensive origins. Keep the stat \
         ranges believable for each walk of life, and keep every *Mod column \
         strictly in \"min,max\" form.",
    )
}

pub fn events(store: &TableStore) -> TablePrompt {
    table_prompt(
        store,
        "events.csv",
        "Field notes:\n\
         - id: e{number}, continuing after the existing rows\n\
         - title: 3-6 words; description: 40-80 words of scene setting\n\
         - per choice: text (button label), consequence (outcome line), \
           gold -200 to 500, food -30 to 30, morale -20 to 20\n\n\
         Generate 20 new road events across moral dilemmas, risk-and-reward \
         gambles, trouble inside the company, trade encounters, grim \
         wartime vignettes, weather and sickness, and the odd stroke of \
         fortune. Both choices must trade something for something; no free \
         wins.",
    )
}

/// Prompt of the dependent second pass: origin stories for freshly stored
/// background rows, keyed by their IDs.
pub fn background_stories(new_ids: &[String]) -> String {
    format!(
        "For each of these character backgrounds, write 2-3 origin stories \
         used as random flavor when a recruit is generated. Each story is a \
         single sentence (20-40 words) telling why this person left their old \
         life to join a mercenary company.\n\n\
         Background IDs: {ids}\n\n\
         Answer with exactly this JSON shape and nothing else:\n\
         {{\n    \"SOME_ID\": [\"story one\", \"story two\"],\n    ...\n}}\n\n\
         Output only the JSON object, no markdown fences.",
        ids = new_ids.join(", "),
    )
}

/// Prompt of the quests category: narrative templates per region and quest
/// kind, as strict JSON.
pub fn quests() -> String {
    format!(
        "Generate narrative quest templates for my game's world regions.\n\n\
         Regions: {regions}\n\
         Quest kinds: {kinds}\n\n\
         Answer with exactly this JSON shape and nothing else:\n\
         {{\n\
         \x20   \"REGION_KEY\": {{\n\
         \x20       \"HUNT\": [\n\
         \x20           {{\n\
         \x20               \"targets\": [\"a named warband or beast\", \"...\"],\n\
         \x20               \"titles\": {{\"1\": \"easy title\", \"2\": \"medium title\", \"3\": \"hard title\"}},\n\
         \x20               \"descriptions\": [\"one flavor line\", \"...\"]\n\
         \x20           }}\n\
         \x20       ],\n\
         \x20       ...\n\
         \x20   }},\n\
         \x20   ...\n\
         }}\n\n\
         Rules:\n\
         - one or two templates per region and kind, every region covered\n\
         - titles: three difficulty steps of the same job, harder reads darker\n\
         - descriptions may use the placeholders {{target}}, {{place}} and \
           {{npc}}, and no others\n\
         - 'targets' is optional; include it for HUNT templates\n\
         - never use braces or square brackets inside title, target, or \
           description text\n\
         - output only the JSON object, no markdown fences",
        regions = QUEST_REGIONS.join(", "),
        kinds = QUEST_KINDS.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::{background_stories, quests, weapons};
    use crate::tables::TableStore;
    use std::fs;

    #[test]
    fn table_prompt_embeds_header_content_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        fs::write(
            dir.path().join("weapons.csv"),
            "id|name|value\nw_sword_1|Arming Sword|120\n",
        )
        .unwrap();

        let p = weapons(&store);
        assert_eq!(p.table, "weapons.csv");
        assert_eq!(p.expected_cols, 3);
        assert!(p.prompt.contains("id|name|value"));
        assert!(p.prompt.contains("w_sword_1|Arming Sword|120"));
        assert!(p.prompt.contains("exactly 3 columns"));
    }

    #[test]
    fn stories_prompt_lists_the_new_ids() {
        let prompt = background_stories(&["BLACKSMITH".to_string(), "BEGGAR".to_string()]);
        assert!(prompt.contains("BLACKSMITH, BEGGAR"));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn quest_prompt_names_every_region_and_kind() {
        let prompt = quests();
        for region in super::QUEST_REGIONS {
            assert!(prompt.contains(region));
        }
        for kind in super::QUEST_KINDS {
            assert!(prompt.contains(kind));
        }
    }
}
