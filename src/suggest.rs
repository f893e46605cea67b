//! Completion candidates for the expression editor.
//!
//! Input starting with `#` completes tags, `@` aliases and `!` previously
//! used expressions; the rest of the input is matched as a substring.

use std::collections::HashSet;

use crate::api::SearchHistory;

pub const MAX_CANDIDATES_PER_SOURCE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Tag,
    Alias,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source: Source,
    pub value: String,
}

/// Sort ignoring ASCII case, keeping the original spelling.
pub fn sort_ignore_case(mut items: Vec<String>) -> Vec<String> {
    items.sort_by_key(|it| it.to_uppercase());
    items
}

#[derive(Debug, Clone, Default)]
pub struct Suggester {
    tags: Vec<String>,
    aliases: Vec<String>,
    history: Vec<SearchHistory>,
}

impl Suggester {
    pub fn new(tags: Vec<String>, aliases: Vec<String>, history: Vec<SearchHistory>) -> Self {
        Self {
            tags: sort_ignore_case(tags),
            aliases: sort_ignore_case(aliases),
            history,
        }
    }

    pub fn suggest(&self, input: &str) -> Vec<Candidate> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let tags = self.tags.iter().map(|t| (t.as_str(), format!("#{t}")));
        collect(input, '#', Source::Tag, tags, &mut seen, &mut out);
        let aliases = self.aliases.iter().map(|a| (a.as_str(), a.clone()));
        collect(input, '@', Source::Alias, aliases, &mut seen, &mut out);
        let history = self
            .history
            .iter()
            .map(|h| (h.expression.as_str(), h.expression.clone()));
        collect(input, '!', Source::History, history, &mut seen, &mut out);
        out
    }
}

fn collect<'a>(
    input: &str,
    prefix: char,
    source: Source,
    items: impl Iterator<Item = (&'a str, String)>,
    seen: &mut HashSet<String>,
    out: &mut Vec<Candidate>,
) {
    let Some(query) = input.strip_prefix(prefix) else {
        return;
    };
    let mut n = 0;
    for (key, value) in items {
        if n >= MAX_CANDIDATES_PER_SOURCE {
            break;
        }
        if !key.contains(query) || !seen.insert(value.clone()) {
            continue;
        }
        out.push(Candidate { source, value });
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggester() -> Suggester {
        let history = vec![
            SearchHistory {
                expression: "#cat and #dog".into(),
                uses: 3,
            },
            SearchHistory {
                expression: "path like '%cat%'".into(),
                uses: 1,
            },
        ];
        Suggester::new(
            vec!["dog".into(), "Cat".into(), "catalog".into()],
            vec!["wallpaper".into(), "cats".into()],
            history,
        )
    }

    fn values(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.value.as_str()).collect()
    }

    #[test]
    fn tag_prefix_completes_tags_only() {
        let found = suggester().suggest("#cat");
        assert_eq!(values(&found), ["#catalog"]);
        assert!(found.iter().all(|c| c.source == Source::Tag));

        let all = suggester().suggest("#");
        assert_eq!(values(&all), ["#Cat", "#catalog", "#dog"]);
    }

    #[test]
    fn alias_and_history_prefixes() {
        assert_eq!(values(&suggester().suggest("@ca")), ["cats"]);
        assert_eq!(
            values(&suggester().suggest("!cat")),
            ["#cat and #dog", "path like '%cat%'"]
        );
    }

    #[test]
    fn plain_input_has_no_candidates() {
        assert!(suggester().suggest("cat").is_empty());
    }

    #[test]
    fn candidates_are_capped_per_source() {
        let tags = (0..50).map(|i| format!("t{i}")).collect();
        let s = Suggester::new(tags, Vec::new(), Vec::new());
        assert_eq!(s.suggest("#t").len(), MAX_CANDIDATES_PER_SOURCE);
    }
}
