/// Strip markdown code-fence artifacts from a raw model response.
///
/// Models are instructed to return bare payloads, but they still wrap the
/// data in ``` fences often enough that every response goes through this
/// before validation. Removes one leading fence (with an optional language
/// tag such as ```csv or ```json) and one trailing fence, then trims
/// surrounding whitespace. Content between the fences is left untouched, and
/// a response without fences passes through unchanged, so applying this
/// twice yields the same result as applying it once.
pub fn sanitize_response(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Everything up to the first newline is the fence plus language tag.
        text = match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => "",
        };
    }

    let trimmed = text.trim_end();
    let text = trimmed.strip_suffix("```").unwrap_or(trimmed);

    text.trim().to_string()
}
