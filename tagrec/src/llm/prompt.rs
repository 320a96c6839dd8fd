//! Re-ranking prompt construction and response parsing

/// Number of tags the model is asked to return
pub const PROMPT_SELECT_COUNT: usize = 8;

/// Build the re-ranking prompt
pub fn build_rerank_prompt<S: AsRef<str>, T: AsRef<str>>(input_tags: &[S], candidates: &[T]) -> String {
    let input = join(input_tags);
    let candidates = join(candidates);
    format!(
        "You are helping complete the tags of an OpenStreetMap feature.\n\
         \n\
         Current input tags: {input}\n\
         \n\
         From the following list of candidate tag keys:\n\
         {candidates}\n\
         \n\
         Select the {n} most relevant tags that are most likely to co-occur with the input, \
         based on OpenStreetMap tagging conventions and real-world attributes of such features.\n\
         \n\
         Return only the {n} tag keys, in order of relevance, one per line. \
         Do not include explanations or any other text.",
        n = PROMPT_SELECT_COUNT,
    )
}

fn join<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extract candidate tag strings from free-text model output
///
/// Each non-empty line yields one tag with list markers, numbering,
/// surrounding whitespace and wrapping quotes removed.
pub fn parse_tag_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(clean_line)
        .filter(|t| !t.is_empty())
        .collect()
}

fn clean_line(line: &str) -> String {
    let stripped = line
        .trim()
        .trim_start_matches(|c: char| {
            c.is_ascii_digit() || matches!(c, '-' | '*' | '+' | '•' | '.' | ')' | ' ' | '\t')
        })
        .trim();
    stripped
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
        .trim_end_matches(',')
        .trim()
        .to_string()
}
