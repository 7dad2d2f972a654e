//! Prompt text sent to the model.

use crate::domain::{GroupColor, TabRecord, sanitize_url};

/// Largest group the model is asked to produce.
pub const MAX_GROUP_SIZE: usize = 7;

/// Grouping policy given to the model as the system message.
pub fn system_prompt() -> String {
    let palette: Vec<&str> = GroupColor::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "You organize browser tabs into groups.\n\
         Rules:\n\
         - Prefer many small, task-specific groups over a few broad ones.\n\
         - A group holds at most {MAX_GROUP_SIZE} tabs; split bigger topics by task.\n\
         - Every tab belongs to exactly one group. Do not skip tabs.\n\
         - Group names are short (1 to 3 words).\n\
         - color must be one of: {}.\n\
         Tabs are given as `index: \"title\" | url`. Refer to tabs by index only.\n\
         Answer with JSON only, no prose:\n\
         {{\"groups\": [{{\"name\": \"...\", \"color\": \"...\", \"tabIds\": [0, 1]}}]}}",
        palette.join(", ")
    )
}

/// One line per tab: `{ordinal}: "{title}" | {sanitized url}`.
pub fn tab_listing(tabs: &[TabRecord]) -> String {
    tabs.iter()
        .enumerate()
        .map(|(ordinal, tab)| {
            format!(
                "{ordinal}: \"{}\" | {}",
                single_line(&tab.title),
                sanitize_url(&tab.url)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn single_line(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            '"' => '\'',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_uses_ordinals_and_sanitized_urls() {
        let tabs = vec![
            TabRecord::new(1, "Gmail", "https://mail.google.com/mail/u/0/#inbox"),
            TabRecord::new(2, "Repo", "https://github.com/org/repo/pull/5"),
        ];

        assert_eq!(
            tab_listing(&tabs),
            "0: \"Gmail\" | https://mail.google.com/mail\n1: \"Repo\" | https://github.com/org"
        );
    }

    #[test]
    fn titles_are_kept_on_one_line() {
        let tabs = vec![TabRecord::new(9, "a \"quoted\"\ntitle", "https://example.com/x?y=1")];
        assert_eq!(tab_listing(&tabs), "0: \"a 'quoted' title\" | https://example.com/x");
    }

    #[test]
    fn system_prompt_lists_the_palette() {
        let prompt = system_prompt();
        for color in GroupColor::ALL {
            assert!(prompt.contains(color.as_str()));
        }
        assert!(prompt.contains("\"tabIds\""));
    }
}
