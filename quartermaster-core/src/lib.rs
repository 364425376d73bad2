use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod gemini;
pub mod locate;
pub mod projection;
pub mod prompts;
pub mod sanitize;
pub mod splice;
pub mod tables;
pub mod template;

use gemini::GeminiClient;
use locate::{BracketKind, NestedContainer};
use prompts::{TablePrompt, QUEST_KINDS, QUEST_REGIONS, SYSTEM_PROMPT};
use sanitize::sanitize_response;
use tables::{preview, TableStore};

/// Everything one expansion run needs, assembled by the CLI and handed to
/// [`run`]. There is no other configuration channel.
#[derive(Debug, Clone)]
pub struct ExpansionSettings {
    pub categories: Vec<Category>,
    /// Directory holding the pipe-delimited data tables.
    pub data_dir: PathBuf,
    /// The structured source document carrying the stories object and the
    /// per-region quest containers.
    pub document_path: PathBuf,
    /// Fallback credential file; the GEMINI_API_KEY environment variable
    /// takes precedence.
    pub key_file: PathBuf,
    pub model: String,
    pub temperature: f32,
    /// Print the prompts instead of calling the model; no file is touched.
    pub dry_run: bool,
}

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("generation transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation error: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, ExpandError>;

/// One expandable slice of game content. Table categories extend their flat
/// file; backgrounds additionally feed a dependent story pass into the
/// document, and quests merge into the document's region containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Weapons,
    Armor,
    Helmets,
    Shields,
    Backgrounds,
    Events,
    Quests,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Weapons,
        Category::Armor,
        Category::Helmets,
        Category::Shields,
        Category::Backgrounds,
        Category::Events,
        Category::Quests,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Weapons => "weapons",
            Category::Armor => "armor",
            Category::Helmets => "helmets",
            Category::Shields => "shields",
            Category::Backgrounds => "backgrounds",
            Category::Events => "events",
            Category::Quests => "quests",
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Sibling backup path: the original file name with `.bak` appended.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("backup"));
    name.push(".bak");
    path.with_file_name(name)
}

/// Copy a file to its `.bak` sibling, overwriting any previous backup. Every
/// store or splice calls this before touching the original.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let bak = backup_path(path);
    fs::copy(path, &bak)?;
    log::info!("backed up {} -> {}", path.display(), bak.display());
    Ok(bak)
}

/// Run one expansion batch: each requested category is taken through
/// generation, sanitizing, validation and storage in sequence before the
/// next begins. A category that produces nothing usable is reported and
/// skipped; only configuration and transport problems abort the run.
pub fn run(settings: ExpansionSettings) -> Result<()> {
    let client = if settings.dry_run {
        None
    } else {
        let api_key = gemini::load_api_key(&settings.key_file).ok_or_else(|| {
            ExpandError::Config(format!(
                "no API key: set GEMINI_API_KEY or put the key in {}",
                settings.key_file.display(),
            ))
        })?;
        Some(GeminiClient::new(api_key, settings.model.clone())?)
    };

    let store = TableStore::new(&settings.data_dir);
    let mut summary = format!(
        "Quartermaster run (model: {}, dry run: {})\n",
        settings.model, settings.dry_run,
    );

    for category in &settings.categories {
        log::info!("=== {} ===", category.name());
        match category {
            Category::Quests => {
                expand_quests(client.as_ref(), &settings, &mut summary)?;
            }
            _ => {
                let stored = expand_table(*category, &store, client.as_ref(), &settings, &mut summary)?;
                if *category == Category::Backgrounds {
                    if let (Some(rows), Some(client)) = (stored, client.as_ref()) {
                        expand_background_stories(&rows, client, &settings, &mut summary)?;
                    }
                }
            }
        }
    }

    println!("\n{}", summary.trim_end());
    Ok(())
}

fn build_table_prompt(category: Category, store: &TableStore) -> TablePrompt {
    match category {
        Category::Weapons => prompts::weapons(store),
        Category::Armor => prompts::armor(store),
        Category::Helmets => prompts::helmets(store),
        Category::Shields => prompts::shields(store),
        Category::Backgrounds => prompts::backgrounds(store),
        Category::Events => prompts::events(store),
        // Quests never reaches this path.
        Category::Quests => unreachable!("quests is not a table category"),
    }
}

fn print_dry_run(category: Category, prompt: &str) {
    println!("{}", "=".repeat(60));
    println!("[dry run] {} prompt:", category.name());
    println!("{}", "=".repeat(60));
    println!("{}", preview(prompt, 2000));
}

/// Table path: generate rows, sanitize, validate against the table's own
/// header, and append the survivors. Returns the stored rows so the
/// backgrounds category can drive its dependent story pass.
fn expand_table(
    category: Category,
    store: &TableStore,
    client: Option<&GeminiClient>,
    settings: &ExpansionSettings,
    summary: &mut String,
) -> Result<Option<Vec<String>>> {
    let table_prompt = build_table_prompt(category, store);
    log::info!(
        "{}: prompt built for {} ({} columns expected)",
        category.name(),
        table_prompt.table,
        table_prompt.expected_cols,
    );

    let client = match client {
        Some(client) => client,
        None => {
            print_dry_run(category, &table_prompt.prompt);
            summary.push_str(&format!("{}: dry run, prompt printed\n", category.name()));
            return Ok(None);
        }
    };

    let response = client.generate(SYSTEM_PROMPT, &table_prompt.prompt, settings.temperature)?;
    log::info!("{}: response received ({} bytes)", category.name(), response.len());

    let cleaned = sanitize_response(&response);
    let candidate_count = cleaned.lines().filter(|l| !l.trim().is_empty()).count();

    let table_header = tables::header(&store.read(table_prompt.table)).to_string();
    let rows = tables::validate_rows(cleaned.lines(), table_prompt.expected_cols, &table_header);

    if rows.is_empty() {
        log::warn!(
            "{}: no valid rows in response, nothing stored (raw: {})",
            category.name(),
            preview(&response, 500),
        );
        summary.push_str(&format!("{}: skipped, no valid rows\n", category.name()));
        return Ok(None);
    }

    log::info!(
        "{}: {}/{} rows accepted",
        category.name(),
        rows.len(),
        candidate_count,
    );

    store.append(table_prompt.table, &rows)?;
    summary.push_str(&format!(
        "{}: +{} rows in {}\n",
        category.name(),
        rows.len(),
        table_prompt.table,
    ));

    Ok(Some(rows))
}

/// Dependent pass of the backgrounds category: ask for origin stories keyed
/// by the freshly stored background IDs and merge them into the document's
/// stories object. A malformed story payload is reported and dropped; the
/// rows stored by the first pass stay.
fn expand_background_stories(
    rows: &[String],
    client: &GeminiClient,
    settings: &ExpansionSettings,
    summary: &mut String,
) -> Result<()> {
    let ids: Vec<String> = rows
        .iter()
        .filter_map(|row| row.split(tables::FIELD_SEPARATOR).next())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    if ids.is_empty() {
        return Ok(());
    }

    log::info!("stories: generating for {} new backgrounds", ids.len());
    let prompt = prompts::background_stories(&ids);
    let response = client.generate(SYSTEM_PROMPT, &prompt, settings.temperature)?;
    let cleaned = sanitize_response(&response);

    let batch = match template::decode_story_batch(&cleaned) {
        Ok(batch) => batch,
        Err(err) => {
            log::warn!(
                "stories: response rejected ({}), raw: {}",
                err,
                preview(&cleaned, 500),
            );
            summary.push_str("stories: skipped, malformed response\n");
            return Ok(());
        }
    };

    merge_stories(&settings.document_path, &batch, summary)
}

fn merge_stories(
    document_path: &Path,
    batch: &template::StoryBatch,
    summary: &mut String,
) -> Result<()> {
    let doc = match fs::read_to_string(document_path) {
        Ok(doc) => doc,
        Err(_) => {
            log::warn!(
                "stories: document not found at {}, merge skipped",
                document_path.display(),
            );
            summary.push_str("stories: skipped, document missing\n");
            return Ok(());
        }
    };

    let span = match locate::find_container(&doc, "STORIES", 0) {
        Ok(span) => span,
        Err(err) => {
            log::warn!("stories: merge skipped ({})", err);
            summary.push_str("stories: skipped, container not found\n");
            return Ok(());
        }
    };

    let interior = span.interior(&doc);
    let mut entries = Vec::new();
    for (id, stories) in &batch.entries {
        // Keyed entries are never duplicated; an ID that already exists in
        // the container is left exactly as it is.
        if interior.contains(&format!("'{}'", id)) {
            log::info!("stories: '{}' already present, skipped", id);
            continue;
        }
        entries.push(projection::project_story_entry(id, stories));
    }

    if entries.is_empty() {
        log::info!("stories: nothing new to merge");
        summary.push_str("stories: nothing new to merge\n");
        return Ok(());
    }

    backup_file(document_path)?;
    let new_doc = splice::splice_entries(&doc, &span, &entries);
    fs::write(document_path, new_doc)?;

    log::info!("stories: merged {} entries", entries.len());
    summary.push_str(&format!("stories: +{} entries\n", entries.len()));
    Ok(())
}

/// Document path: generate quest templates as JSON, project each into the
/// document's function-text form, and splice them into the matching region
/// containers. Unresolvable containers skip their own merge only.
fn expand_quests(
    client: Option<&GeminiClient>,
    settings: &ExpansionSettings,
    summary: &mut String,
) -> Result<()> {
    let prompt = prompts::quests();
    log::info!("quests: prompt built");

    let client = match client {
        Some(client) => client,
        None => {
            print_dry_run(Category::Quests, &prompt);
            summary.push_str("quests: dry run, prompt printed\n");
            return Ok(());
        }
    };

    let response = client.generate(SYSTEM_PROMPT, &prompt, settings.temperature)?;
    log::info!("quests: response received ({} bytes)", response.len());
    let cleaned = sanitize_response(&response);

    let batch = match template::decode_quest_batch(&cleaned) {
        Ok(batch) => batch,
        Err(err) => {
            log::warn!(
                "quests: response rejected ({}), raw: {}",
                err,
                preview(&cleaned, 500),
            );
            summary.push_str("quests: skipped, malformed response\n");
            return Ok(());
        }
    };

    let mut doc = match fs::read_to_string(&settings.document_path) {
        Ok(doc) => doc,
        Err(_) => {
            log::warn!(
                "quests: document not found at {}, merge skipped",
                settings.document_path.display(),
            );
            summary.push_str("quests: skipped, document missing\n");
            return Ok(());
        }
    };

    let mut merged = 0usize;
    let mut collapsed_titles = 0usize;
    let mut changed = false;

    for (region, kinds) in &batch.regions {
        if !QUEST_REGIONS.contains(&region.as_str()) {
            log::warn!("quests: unknown region '{}' in response, skipped", region);
            continue;
        }

        for (kind, templates) in kinds {
            if !QUEST_KINDS.contains(&kind.as_str()) {
                log::warn!(
                    "quests: unknown kind '{}' under {}, skipped",
                    kind,
                    region,
                );
                continue;
            }
            if templates.is_empty() {
                continue;
            }

            let projections: Vec<projection::Projection> =
                templates.iter().map(projection::project_template).collect();
            collapsed_titles += projections.iter().filter(|p| p.title_arms < 3).count();
            let entries: Vec<String> = projections.into_iter().map(|p| p.text).collect();

            match locate::resolve_nested(&doc, region, kind) {
                Ok(NestedContainer::Existing(span)) => {
                    doc = splice::splice_entries(&doc, &span, &entries);
                }
                Ok(NestedContainer::Absent { anchor }) => {
                    log::info!("quests: creating {} container under {}", kind, region);
                    doc = splice::create_container(&doc, &anchor, kind, BracketKind::Square, &entries);
                }
                Err(err) => {
                    log::warn!("quests: {} under {} skipped ({})", kind, region, err);
                    continue;
                }
            }

            changed = true;
            merged += entries.len();
        }
    }

    if !changed {
        log::info!("quests: nothing merged");
        summary.push_str("quests: nothing merged\n");
        return Ok(());
    }

    backup_file(&settings.document_path)?;
    fs::write(&settings.document_path, doc)?;

    log::info!(
        "quests: merged {} templates ({} with collapsed titles)",
        merged,
        collapsed_titles,
    );
    summary.push_str(&format!("quests: +{} templates\n", merged));
    Ok(())
}
