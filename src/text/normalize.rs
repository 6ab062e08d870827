use regex::Regex;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

/// Delimiter wrapped around each emoji token during normalization
pub const EMOJI_DELIMITER: char = ':';

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?://|www\.)\S+").expect("valid regex"));

/// Normalizes free text into the canonical form that gets embedded
///
/// # Normalization Steps
///
/// 1. Absent input becomes the empty string
/// 2. Each emoji grapheme becomes ` :name_words: ` using its English CLDR name
/// 3. Lowercase
/// 4. Remove URLs (`http://…`, `https://…`, `www.…`)
/// 5. Drop every character that is not a letter, `_`, whitespace or the
///    emoji delimiter
/// 6. Drop the emoji delimiter itself, leaving the bare token
/// 7. Collapse whitespace runs to single spaces and trim
///
/// The result is a fixpoint: normalizing it again returns it unchanged.
///
/// # Examples
///
/// ```
/// use social_sync::text::normalize;
///
/// let text = normalize(Some("Hello, World! 👋 https://example.com"));
/// assert_eq!(text, "hello world waving_hand");
/// ```
pub fn normalize(raw: Option<&str>) -> String {
    // Step 1: Absent text
    let Some(raw) = raw else {
        return String::new();
    };

    // Step 2: Emoji to tokens
    let tokenized = replace_emoji(raw);

    // Step 3: Lowercase
    let lowered = tokenized.to_lowercase();

    // Step 4: URLs
    let without_urls = URL_RE.replace_all(&lowered, " ");

    // Steps 5 and 6: Character class, then the delimiter
    let kept: String = without_urls
        .chars()
        .filter(|c| is_allowed(*c))
        .map(|c| if c == EMOJI_DELIMITER { ' ' } else { c })
        .collect();

    // Step 7: Whitespace
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replaces every emoji grapheme with a delimited textual token
fn replace_emoji(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for grapheme in text.graphemes(true) {
        match lookup_emoji(grapheme) {
            Some(emoji) => {
                out.push(' ');
                out.push(EMOJI_DELIMITER);
                out.push_str(&emoji_token(emoji.name()));
                out.push(EMOJI_DELIMITER);
                out.push(' ');
            }
            None => out.push_str(grapheme),
        }
    }

    out
}

fn lookup_emoji(grapheme: &str) -> Option<&'static emojis::Emoji> {
    // Plain ASCII (digits, '#', '*') only forms emoji as keycap sequences.
    // Letter-only graphemes (such as a bare `ℹ`) survive the character-class
    // step as text, so they must stay text here too.
    if grapheme.is_ascii() || grapheme.chars().all(char::is_alphabetic) {
        return None;
    }

    emojis::get(grapheme).or_else(|| emojis::get(grapheme.trim_end_matches('\u{fe0f}')))
}

/// Builds the token for an emoji name: alphabetic words joined by `_`
///
/// `"waving hand"` → `"waving_hand"`, `"keycap: 1"` → `"keycap"`,
/// `"piñata"` → `"piñata"`.
fn emoji_token(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .map(|word| word.chars().filter(|c| c.is_alphabetic()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn is_allowed(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == EMOJI_DELIMITER || c.is_whitespace()
}
