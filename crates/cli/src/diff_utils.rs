//! Line diffs between a stored revision and the working copy

use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};

/// Check if content is binary (contains null bytes in first 8KB)
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}

/// Render a colored unified diff
///
/// `old_label`/`new_label` name the two sides in the `---`/`+++` header. An
/// empty string means the contents are identical.
pub fn render_unified_diff(
    old_content: &[u8],
    new_content: &[u8],
    old_label: &str,
    new_label: &str,
    context_lines: usize,
) -> String {
    if is_binary(old_content) || is_binary(new_content) {
        return if old_content == new_content {
            String::new()
        } else {
            format!("Binary files {} and {} differ\n", old_label, new_label)
        };
    }

    let old_text = String::from_utf8_lossy(old_content);
    let new_text = String::from_utf8_lossy(new_content);
    let diff = TextDiff::from_lines(&old_text, &new_text);

    let mut output = String::new();
    for (hunk_idx, hunk) in diff
        .unified_diff()
        .context_radius(context_lines)
        .iter_hunks()
        .enumerate()
    {
        if hunk_idx == 0 {
            output.push_str(&format!("{}\n", format!("--- {}", old_label).bold()));
            output.push_str(&format!("{}\n", format!("+++ {}", new_label).bold()));
        }

        output.push_str(&format!("{}\n", hunk.header().to_string().cyan()));

        for change in hunk.iter_changes() {
            let line: &str = change.value();
            let rendered = match change.tag() {
                ChangeTag::Delete => format!("-{}", line).red().to_string(),
                ChangeTag::Insert => format!("+{}", line).green().to_string(),
                ChangeTag::Equal => format!(" {}", line).dimmed().to_string(),
            };
            output.push_str(&rendered);
            if !line.ends_with('\n') {
                output.push('\n');
            }
        }
    }

    output
}
