use std::path::PathBuf;

/// Substitution values for a directory-rule template.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext<'a> {
    pub album_id: &'a str,
    pub album_title: &'a str,
    pub chapter_id: &'a str,
    pub chapter_title: &'a str,
}

/// Renders a directory rule such as
/// `{album_id}-{album_title}/{chapter_id}-{chapter_title}` into a relative
/// path, sanitizing every component for the filesystem.
pub fn render_rule(rule: &str, ctx: &RuleContext) -> PathBuf {
    let substituted = rule
        .replace("{album_id}", ctx.album_id)
        .replace("{album_title}", ctx.album_title)
        .replace("{chapter_id}", ctx.chapter_id)
        .replace("{chapter_title}", ctx.chapter_title);

    substituted
        .split('/')
        .filter(|segment| !segment.trim().is_empty())
        .map(sanitize_component)
        .collect()
}

/// Windows-safe path component: forbidden characters replaced, edges
/// trimmed, reserved device names defused. Never returns an empty string.
pub fn sanitize_component(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        if is_forbidden(c) {
            // Collapse runs of replacements into one underscore.
            if !prev_underscore {
                cleaned.push('_');
            }
            prev_underscore = true;
        } else {
            cleaned.push(c);
            prev_underscore = false;
        }
    }

    let mut cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    if cleaned.len() > 100 {
        let mut end = 100;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.push('_');
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
