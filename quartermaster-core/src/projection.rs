use crate::template::{QuestTemplate, QUEST_PARAMS};

/// A projected quest entry: the object-literal text plus how far the title
/// collapsed (1 arm means all three difficulty levels share a value, 2 means
/// levels two and three do, 3 means every level differs). The arm count is
/// reported in the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub text: String,
    pub title_arms: u8,
}

/// Escape a value for a single-quoted string literal.
fn quote_single(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Rewrite a description into a template literal: `{target}` placeholders
/// become `${target}` interpolations, everything else is escaped for the
/// backtick quoting. Returns the literal plus the set of parameters the
/// description actually referenced.
fn render_description(description: &str) -> (String, [bool; 3]) {
    let mut used = [false; 3];
    let mut out = String::with_capacity(description.len() + 2);
    out.push('`');

    let mut rest = description;
    while let Some(start) = rest.find('{') {
        let (head, tail) = rest.split_at(start);
        push_escaped(&mut out, head);

        // Decoding guarantees the placeholder is closed and recognized.
        let end = tail.find('}').unwrap_or(tail.len() - 1);
        let name = &tail[1..end];
        if let Some(idx) = QUEST_PARAMS.iter().position(|p| *p == name) {
            used[idx] = true;
        }
        out.push_str("${");
        out.push_str(name);
        out.push('}');

        rest = &tail[end + 1..];
    }
    push_escaped(&mut out, rest);

    out.push('`');
    (out, used)
}

fn push_escaped(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
}

/// Parameter list for a description function. Parameters the body never
/// references get a leading underscore so the destination compiles without
/// unused-parameter warnings.
fn parameter_list(used: [bool; 3]) -> String {
    QUEST_PARAMS
        .iter()
        .zip(used)
        .map(|(name, is_used)| {
            if is_used {
                format!("{}: string", name)
            } else {
                format!("_{}: string", name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Project the three difficulty titles into the smallest equivalent arrow
/// function. Equal values collapse: one shared value projects a constant,
/// levels two and three sharing projects a two-way conditional, and the
/// general case projects the full three-way conditional ordered 1, 2, 3.
/// Whatever the shape, calling the projection with difficulty 1, 2 or 3
/// yields exactly the corresponding input title.
fn render_title(titles: &[String; 3]) -> (String, u8) {
    let [one, two, three] = titles;

    if one == two && two == three {
        return (format!("() => {}", quote_single(one)), 1);
    }
    if two == three {
        return (
            format!(
                "(diff: number) => diff === 1 ? {} : {}",
                quote_single(one),
                quote_single(two),
            ),
            2,
        );
    }
    (
        format!(
            "(diff: number) => diff === 1 ? {} : diff === 2 ? {} : {}",
            quote_single(one),
            quote_single(two),
            quote_single(three),
        ),
        3,
    )
}

/// Convert one quest template into the object-literal text the document
/// stores. The result is unindented; the splice engine shifts it to its
/// final depth.
pub fn project_template(template: &QuestTemplate) -> Projection {
    let (title, title_arms) = render_title(&template.titles);

    let mut text = String::from("{\n");

    if !template.targets.is_empty() {
        let targets = template
            .targets
            .iter()
            .map(|t| quote_single(t))
            .collect::<Vec<_>>()
            .join(", ");
        text.push_str(&format!("    targets: [{}],\n", targets));
    }

    text.push_str(&format!("    title: {},\n", title));

    text.push_str("    desc: [\n");
    for description in &template.descriptions {
        let (literal, used) = render_description(description);
        text.push_str(&format!(
            "        ({}) => {},\n",
            parameter_list(used),
            literal,
        ));
    }
    text.push_str("    ],\n");
    text.push('}');

    Projection { text, title_arms }
}

/// Render one entry of the stories object: a single-quoted key bound to a
/// JSON array of story strings.
pub fn project_story_entry(id: &str, stories: &[String]) -> String {
    let array = serde_json::to_string(stories).unwrap_or_else(|_| "[]".to_string());
    format!("{}: {}", quote_single(id), array)
}
