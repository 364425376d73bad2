use serde_json::Value;
use thiserror::Error;

/// Placeholder names a quest description may interpolate, in the parameter
/// order the projected functions use.
pub const QUEST_PARAMS: [&str; 3] = ["target", "place", "npc"];

/// Errors raised while decoding a structured model response. Decoding is a
/// hard filter in the same spirit as row validation: a payload that does not
/// match the expected shape exactly is rejected, never coerced.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("value under '{key}' is not an array of strings")]
    NotAStringArray { key: String },

    #[error("story for '{key}' contains unbalanced brackets")]
    UnbalancedStory { key: String },

    #[error("region '{region}' is not an object of quest-kind arrays")]
    RegionNotObject { region: String },

    #[error("quest kind '{kind}' under '{region}' is not an array")]
    KindNotArray { region: String, kind: String },

    #[error("template {index} under {region}.{kind}: {problem}")]
    BadTemplate {
        region: String,
        kind: String,
        index: usize,
        problem: String,
    },
}

/// One narrative quest template as decoded from the model's JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestTemplate {
    /// Proper names the quest can be aimed at; empty when the model omitted
    /// the field.
    pub targets: Vec<String>,
    /// Title per difficulty level, indexed by difficulty minus one.
    pub titles: [String; 3],
    /// Flavor lines with `{target}`/`{place}`/`{npc}` placeholders.
    pub descriptions: Vec<String>,
}

/// Quest templates grouped by region and quest kind, in response order.
#[derive(Debug, Default)]
pub struct QuestBatch {
    pub regions: Vec<(String, Vec<(String, Vec<QuestTemplate>)>)>,
}

/// Background stories keyed by background ID, in response order.
#[derive(Debug, Default)]
pub struct StoryBatch {
    pub entries: Vec<(String, Vec<String>)>,
}

/// True when every `{`/`}` and `[`/`]` pair in the text is properly nested.
/// Accepted content is later scanned by a purely lexical bracket counter, so
/// strings carrying unbalanced brackets must never reach the document.
pub fn brackets_balanced(text: &str) -> bool {
    let mut braces = 0i64;
    let mut squares = 0i64;
    for c in text.chars() {
        match c {
            '{' => braces += 1,
            '}' => braces -= 1,
            '[' => squares += 1,
            ']' => squares -= 1,
            _ => {}
        }
        if braces < 0 || squares < 0 {
            return false;
        }
    }
    braces == 0 && squares == 0
}

/// Check one description string: brackets balanced, every `{...}` reference
/// closed, and every referenced name one of [`QUEST_PARAMS`]. Returns the
/// offending detail on failure.
fn check_description(text: &str) -> Result<(), String> {
    if !brackets_balanced(text) {
        return Err(format!("unbalanced brackets in description '{}'", text));
    }

    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = match after.find('}') {
            Some(end) => end,
            None => return Err(format!("unclosed placeholder in '{}'", text)),
        };
        let name = &after[..end];
        if !QUEST_PARAMS.contains(&name) {
            return Err(format!("unknown placeholder '{{{}}}'", name));
        }
        rest = &after[end + 1..];
    }

    Ok(())
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    let array = value.as_array()?;
    let mut out = Vec::with_capacity(array.len());
    for item in array {
        out.push(item.as_str()?.to_string());
    }
    Some(out)
}

/// Decode the story payload of the backgrounds second pass: a single JSON
/// object mapping background IDs to arrays of story strings. Any other
/// shape, and any story carrying unbalanced brackets, rejects the whole
/// payload.
pub fn decode_story_batch(json: &str) -> Result<StoryBatch, DecodeError> {
    let value: Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let mut batch = StoryBatch::default();
    for (key, entry) in object {
        let stories = string_array(entry).ok_or_else(|| DecodeError::NotAStringArray {
            key: key.clone(),
        })?;
        if stories.iter().any(|s| !brackets_balanced(s)) {
            return Err(DecodeError::UnbalancedStory { key: key.clone() });
        }
        batch.entries.push((key.clone(), stories));
    }

    Ok(batch)
}

fn decode_template(
    region: &str,
    kind: &str,
    index: usize,
    value: &Value,
) -> Result<QuestTemplate, DecodeError> {
    let bad = |problem: String| DecodeError::BadTemplate {
        region: region.to_string(),
        kind: kind.to_string(),
        index,
        problem,
    };

    let object = value
        .as_object()
        .ok_or_else(|| bad("not an object".to_string()))?;

    let targets = match object.get("targets") {
        None => Vec::new(),
        Some(v) => string_array(v).ok_or_else(|| bad("'targets' is not an array of strings".to_string()))?,
    };
    if targets.iter().any(|t| !brackets_balanced(t)) {
        return Err(bad("unbalanced brackets in a target name".to_string()));
    }

    let titles_value = object
        .get("titles")
        .ok_or_else(|| bad("missing 'titles'".to_string()))?;
    let titles_map = titles_value
        .as_object()
        .ok_or_else(|| bad("'titles' is not an object".to_string()))?;

    let mut titles: [String; 3] = Default::default();
    for (slot, level) in titles.iter_mut().zip(["1", "2", "3"]) {
        let title = titles_map
            .get(level)
            .and_then(Value::as_str)
            .ok_or_else(|| bad(format!("missing or non-string title for difficulty {}", level)))?;
        if !brackets_balanced(title) {
            return Err(bad(format!("unbalanced brackets in title for difficulty {}", level)));
        }
        *slot = title.to_string();
    }
    if titles_map.len() != 3 {
        return Err(bad("'titles' must hold exactly the keys \"1\", \"2\", \"3\"".to_string()));
    }

    let descriptions = object
        .get("descriptions")
        .and_then(string_array)
        .ok_or_else(|| bad("missing or malformed 'descriptions'".to_string()))?;
    if descriptions.is_empty() {
        return Err(bad("'descriptions' is empty".to_string()));
    }
    for description in &descriptions {
        check_description(description).map_err(bad)?;
    }

    for (field, _) in object {
        if !matches!(field.as_str(), "targets" | "titles" | "descriptions") {
            return Err(bad(format!("unexpected field '{}'", field)));
        }
    }

    Ok(QuestTemplate {
        targets,
        titles,
        descriptions,
    })
}

/// Decode the quest payload: an object of region keys, each an object of
/// quest-kind keys, each an array of template objects. Shape violations
/// reject the payload; filtering against the known region and kind lists is
/// the caller's concern.
pub fn decode_quest_batch(json: &str) -> Result<QuestBatch, DecodeError> {
    let value: Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let mut batch = QuestBatch::default();
    for (region, kinds_value) in object {
        let kinds_map = kinds_value
            .as_object()
            .ok_or_else(|| DecodeError::RegionNotObject {
                region: region.clone(),
            })?;

        let mut kinds = Vec::new();
        for (kind, templates_value) in kinds_map {
            let array = templates_value
                .as_array()
                .ok_or_else(|| DecodeError::KindNotArray {
                    region: region.clone(),
                    kind: kind.clone(),
                })?;

            let mut templates = Vec::with_capacity(array.len());
            for (index, template_value) in array.iter().enumerate() {
                templates.push(decode_template(region, kind, index, template_value)?);
            }
            kinds.push((kind.clone(), templates));
        }
        batch.regions.push((region.clone(), kinds));
    }

    Ok(batch)
}
