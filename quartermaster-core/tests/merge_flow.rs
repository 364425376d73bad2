//! End-to-end exercises of the pipeline pieces over real files: a generated
//! response flows through sanitize -> validate -> append on the table path,
//! and through decode -> project -> locate -> splice on the document path.

use std::fs;

use quartermaster_core::locate::{find_container, resolve_nested, BracketKind, NestedContainer};
use quartermaster_core::projection::project_template;
use quartermaster_core::sanitize::sanitize_response;
use quartermaster_core::splice::{bracket_balance, create_container, splice_entries};
use quartermaster_core::tables::{column_count, header, validate_rows, TableStore};
use quartermaster_core::template::{decode_quest_batch, QuestTemplate};
use quartermaster_core::{backup_path, backup_file};

const DOCUMENT: &str = r#"export const REGION_QUESTS = {
    CENTRAL_PLAINS: {
        HUNT: [],
        ESCORT: [
            {
                title: () => 'Guard the salt wagons',
                desc: [
                    (_target: string, place: string, _npc: string) => `A convoy is bound for ${place}.`,
                ],
            },
        ],
    },
    NORTH_MARCHES: {
        HUNT: [],
    },
};
"#;

#[test]
fn generated_rows_flow_into_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = TableStore::new(dir.path());
    let path = store.path("weapons.csv");
    fs::write(&path, "id|value\nw_1|10\n").unwrap();

    // The model echoed the header, produced one good row, and one row with
    // a stray extra column. Only the good row survives.
    let raw = "```csv\nid|value\nw_2|20\nw_2|20|extra\n```";
    let cleaned = sanitize_response(raw);

    let content = store.read("weapons.csv");
    let expected_cols = column_count(header(&content));
    let rows = validate_rows(cleaned.lines(), expected_cols, header(&content));
    assert_eq!(rows, vec!["w_2|20"]);

    let before = fs::read_to_string(&path).unwrap();
    store.append("weapons.csv", &rows).unwrap();

    let backup = fs::read_to_string(backup_path(&path)).unwrap();
    assert_eq!(backup, before, "backup must hold the pre-append content");

    let after = fs::read_to_string(&path).unwrap();
    assert_eq!(after, "id|value\nw_1|10\nw_2|20\n");
}

#[test]
fn duplicates_of_existing_body_rows_pass_through() {
    // The header-skip rule is the only duplicate suppression on the table
    // path; a row repeating existing body content is accepted as-is.
    let rows = validate_rows(["w_1|10", "w_2|20"], 2, "id|value");
    assert_eq!(rows, vec!["w_1|10", "w_2|20"]);
}

#[test]
fn quest_entry_splices_into_an_empty_container() {
    let json = r#"{
        "CENTRAL_PLAINS": {
            "HUNT": [{
                "targets": ["Black Fen Dogs"],
                "titles": {"1": "Cull the bandits", "2": "Clear the camp", "3": "Break the warband"},
                "descriptions": ["Word is a band called {target} preys on travellers near {place}."]
            }]
        }
    }"#;
    let batch = decode_quest_batch(json).unwrap();
    let (region, kinds) = &batch.regions[0];
    let (kind, templates) = &kinds[0];

    let entries: Vec<String> = templates
        .iter()
        .map(|t| project_template(t).text)
        .collect();

    let span = match resolve_nested(DOCUMENT, region, kind).unwrap() {
        NestedContainer::Existing(span) => span,
        other => panic!("expected existing container, got {:?}", other),
    };
    let merged = splice_entries(DOCUMENT, &span, &entries);

    assert_eq!(bracket_balance(&merged), bracket_balance(DOCUMENT));
    assert!(merged.contains("targets: ['Black Fen Dogs'],"));
    assert!(merged.contains(
        "(target: string, place: string, _npc: string) => `Word is a band called ${target} preys on travellers near ${place}.`,"
    ));

    // The other keys are untouched.
    assert!(merged.contains("Guard the salt wagons"));
    assert!(merged.contains("NORTH_MARCHES: {\n        HUNT: [],\n    },"));

    // The filled container closes with a trailing separator after the last
    // entry.
    let hunt = match resolve_nested(&merged, "CENTRAL_PLAINS", "HUNT").unwrap() {
        NestedContainer::Existing(span) => span,
        other => panic!("expected existing container, got {:?}", other),
    };
    assert!(hunt.interior(&merged).trim_end().ends_with("},"));
}

#[test]
fn missing_kind_creates_a_fresh_container_before_the_anchor_close() {
    let template = QuestTemplate {
        targets: Vec::new(),
        titles: [
            "Walk the border".to_string(),
            "Walk the border".to_string(),
            "Walk the border".to_string(),
        ],
        descriptions: vec!["The reeve of {place} wants the road shown a banner.".to_string()],
    };
    let entries = vec![project_template(&template).text];

    let anchor = match resolve_nested(DOCUMENT, "CENTRAL_PLAINS", "PATROL").unwrap() {
        NestedContainer::Absent { anchor } => anchor,
        other => panic!("expected absent container, got {:?}", other),
    };
    let merged = create_container(DOCUMENT, &anchor, "PATROL", BracketKind::Square, &entries);

    assert_eq!(bracket_balance(&merged), bracket_balance(DOCUMENT));
    assert!(merged.contains("PATROL: ["));
    assert!(merged.contains("title: () => 'Walk the border',"));

    // The fresh container lands inside CENTRAL_PLAINS, after the existing
    // siblings and before NORTH_MARCHES.
    let escort = merged.find("ESCORT").unwrap();
    let patrol = merged.find("PATROL").unwrap();
    let north = merged.find("NORTH_MARCHES").unwrap();
    assert!(escort < patrol && patrol < north);

    // Sibling containers resolve exactly as before.
    let span = match resolve_nested(&merged, "CENTRAL_PLAINS", "ESCORT").unwrap() {
        NestedContainer::Existing(span) => span,
        other => panic!("expected existing container, got {:?}", other),
    };
    assert!(span.interior(&merged).contains("Guard the salt wagons"));
}

#[test]
fn document_backup_holds_pre_splice_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("constants.ts");
    fs::write(&path, DOCUMENT).unwrap();

    let doc = fs::read_to_string(&path).unwrap();
    let span = match resolve_nested(&doc, "NORTH_MARCHES", "HUNT").unwrap() {
        NestedContainer::Existing(span) => span,
        other => panic!("expected existing container, got {:?}", other),
    };
    let merged = splice_entries(&doc, &span, &["{ title: () => 'T' }".to_string()]);

    backup_file(&path).unwrap();
    fs::write(&path, &merged).unwrap();

    assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), DOCUMENT);
    assert_eq!(fs::read_to_string(&path).unwrap(), merged);
}

#[test]
fn repeated_splices_keep_the_document_balanced() {
    let mut doc = DOCUMENT.to_string();

    for title in ["'A'", "'B'", "'C'"] {
        let span = match resolve_nested(&doc, "CENTRAL_PLAINS", "HUNT").unwrap() {
            NestedContainer::Existing(span) => span,
            other => panic!("expected existing container, got {:?}", other),
        };
        doc = splice_entries(&doc, &span, &[format!("{{ title: () => {} }}", title)]);
    }

    assert_eq!(bracket_balance(&doc), bracket_balance(DOCUMENT));
    let ordered_a = doc.find("'A'").unwrap();
    let ordered_b = doc.find("'B'").unwrap();
    let ordered_c = doc.find("'C'").unwrap();
    assert!(ordered_a < ordered_b && ordered_b < ordered_c);

    // The whole-document container still resolves and closes correctly.
    let world = find_container(&doc, "REGION_QUESTS", 0).unwrap();
    assert_eq!(&doc[world.close..=world.close], "}");
}
