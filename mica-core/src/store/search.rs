//! Ranked search over the store.

use crate::language::Language;
use crate::store::VirtualFileStore;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Content sub-query: matched line-by-line against loaded file content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentQuery {
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
    /// When false the pattern is matched literally.
    #[serde(default)]
    pub is_regex: bool,
}

/// Search filters. Empty language/extension lists mean "no filter"; when
/// both are given a candidate must satisfy both categories (union within a
/// category, intersection across categories).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub path_prefix: Option<String>,
    #[serde(default)]
    pub exclude_prefix: Option<String>,
    /// Case-insensitive glob over the full path or the file name:
    /// `*` = any run without `/`, `**` = any run, `?` = one non-`/` char.
    #[serde(default)]
    pub name_glob: Option<String>,
    #[serde(default)]
    pub content: Option<ContentQuery>,
    /// Defaults to the engine config's cap.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentMatch {
    /// 1-based.
    pub line: usize,
    /// 1-based column of the first match in the line.
    pub column: usize,
    pub line_text: String,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    /// Total pattern occurrences across all lines when content search is
    /// active (a line with two hits counts twice), else 1.
    pub score: usize,
    pub matches: Vec<ContentMatch>,
}

impl VirtualFileStore {
    /// Run a search query. Results are ranked by score descending with
    /// path as the stable tiebreaker, capped at the query's (or config's)
    /// limit. A malformed content regex degrades to zero results.
    pub fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        let glob = match &query.name_glob {
            Some(pattern) => match compile_glob(pattern) {
                Some(re) => Some(re),
                None => {
                    tracing::warn!(pattern = %pattern, "malformed glob, no matches");
                    return Vec::new();
                }
            },
            None => None,
        };
        let content_regex = match &query.content {
            Some(content) => match compile_content_pattern(content) {
                Some(re) => Some(re),
                None => {
                    tracing::warn!(pattern = %content.pattern, "malformed search regex, no matches");
                    return Vec::new();
                }
            },
            None => None,
        };

        let mut results: Vec<SearchResult> = Vec::new();
        for entity in self.index.entities().filter(|e| e.is_file()) {
            if !query.languages.is_empty()
                && !entity
                    .language
                    .is_some_and(|l| query.languages.contains(&l))
            {
                continue;
            }
            if !query.extensions.is_empty()
                && !entity
                    .extension
                    .as_ref()
                    .is_some_and(|e| query.extensions.iter().any(|q| q.eq_ignore_ascii_case(e)))
            {
                continue;
            }
            if let Some(prefix) = &query.path_prefix {
                if !entity.path.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if let Some(prefix) = &query.exclude_prefix {
                if entity.path.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if let Some(glob) = &glob {
                // Globs address either the full path (minus the leading
                // slash) or just the file name.
                let path = entity.path.trim_start_matches('/');
                if !glob.is_match(path) && !glob.is_match(&entity.name) {
                    continue;
                }
            }

            match &content_regex {
                None => results.push(SearchResult {
                    path: entity.path.clone(),
                    score: 1,
                    matches: Vec::new(),
                }),
                Some(re) => {
                    if entity.is_binary || !entity.content_loaded {
                        continue;
                    }
                    let Some(content) = &entity.content else {
                        continue;
                    };
                    let (matches, occurrences) =
                        scan_content(content, re, self.config.search_context_lines);
                    if !matches.is_empty() {
                        results.push(SearchResult {
                            path: entity.path.clone(),
                            score: occurrences,
                            matches,
                        });
                    }
                }
            }
        }

        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
        results.truncate(query.limit.unwrap_or(self.config.search_result_limit));
        results
    }
}

/// One `ContentMatch` per matching line (at the first hit's column), plus
/// the total occurrence count across all lines for scoring.
fn scan_content(content: &str, re: &Regex, context_lines: usize) -> (Vec<ContentMatch>, usize) {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut matches = Vec::new();
    let mut occurrences = 0usize;
    for (i, line) in lines.iter().enumerate() {
        let mut found = re.find_iter(line);
        let Some(first) = found.next() else {
            continue;
        };
        occurrences += 1 + found.count();
        let before_start = i.saturating_sub(context_lines);
        let after_end = (i + 1 + context_lines).min(lines.len());
        matches.push(ContentMatch {
            line: i + 1,
            column: first.start() + 1,
            line_text: line.to_string(),
            context_before: lines[before_start..i].iter().map(|s| s.to_string()).collect(),
            context_after: lines[i + 1..after_end].iter().map(|s| s.to_string()).collect(),
        });
    }
    (matches, occurrences)
}

fn compile_content_pattern(content: &ContentQuery) -> Option<Regex> {
    let body = if content.is_regex {
        content.pattern.clone()
    } else {
        regex::escape(&content.pattern)
    };
    let pattern = if content.case_sensitive {
        body
    } else {
        format!("(?i){body}")
    };
    Regex::new(&pattern).ok()
}

/// Compile a glob to an anchored case-insensitive regex. `**` must be
/// translated before `*`, so this walks characters instead of doing blind
/// replacement.
fn compile_glob(pattern: &str) -> Option<Regex> {
    let mut translated = String::from("(?i)^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    translated.push_str(".*");
                } else {
                    translated.push_str("[^/]*");
                }
            }
            '?' => translated.push_str("[^/]"),
            other => translated.push_str(&regex::escape(&other.to_string())),
        }
    }
    translated.push('$');
    Regex::new(&translated).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::id::SequentialIdGenerator;
    use rstest::rstest;

    fn store_with_files(files: &[(&str, &str)]) -> VirtualFileStore {
        let mut store = VirtualFileStore::with_ids(
            Box::new(SequentialIdGenerator::new("e")),
            EngineConfig::default(),
        );
        for (path, content) in files {
            store.create(path, content).unwrap();
        }
        store
    }

    #[rstest]
    #[case("*.ts", "app.ts", true)]
    #[case("*.ts", "app/util.ts", false)]
    #[case("**/util.ts", "app/util.ts", true)]
    #[case("**/util.ts", "util.ts", false)]
    #[case("app?.ts", "app1.ts", true)]
    #[case("app?.ts", "app/x.ts", false)]
    #[case("*.TS", "app.ts", true)]
    fn glob_semantics(#[case] pattern: &str, #[case] path: &str, #[case] matched: bool) {
        let re = compile_glob(pattern).unwrap();
        assert_eq!(re.is_match(path), matched, "{pattern} vs {path}");
    }

    #[test]
    fn language_and_extension_filters_intersect() {
        let store = store_with_files(&[
            ("/src/a.ts", "x"),
            ("/src/b.js", "x"),
            ("/src/c.rs", "x"),
        ]);

        let by_language = store.search(&SearchQuery {
            languages: vec![Language::TypeScript, Language::Rust],
            ..Default::default()
        });
        let paths: Vec<&str> = by_language.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/src/a.ts", "/src/c.rs"]);

        // Both categories given: candidate must satisfy both.
        let both = store.search(&SearchQuery {
            languages: vec![Language::TypeScript, Language::Rust],
            extensions: vec!["rs".to_string()],
            ..Default::default()
        });
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].path, "/src/c.rs");
    }

    #[test]
    fn path_prefix_include_and_exclude() {
        let store = store_with_files(&[("/src/a.ts", "x"), ("/test/b.ts", "x")]);
        let results = store.search(&SearchQuery {
            path_prefix: Some("/src".to_string()),
            ..Default::default()
        });
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "/src/a.ts");

        let excluded = store.search(&SearchQuery {
            exclude_prefix: Some("/test".to_string()),
            ..Default::default()
        });
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].path, "/src/a.ts");
    }

    #[test]
    fn glob_filters_by_name_or_path() {
        let store = store_with_files(&[("/app.ts", "x"), ("/app/util.ts", "x")]);
        let results = store.search(&SearchQuery {
            name_glob: Some("*.ts".to_string()),
            ..Default::default()
        });
        // "*.ts" matches "app.ts" (name and path) and "util.ts" by name.
        let paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/app.ts", "/app/util.ts"]);

        let rooted = store.search(&SearchQuery {
            name_glob: Some("**/util.ts".to_string()),
            ..Default::default()
        });
        assert_eq!(rooted.len(), 1);
        assert_eq!(rooted[0].path, "/app/util.ts");
    }

    #[test]
    fn content_search_scores_and_captures_context() {
        let store = store_with_files(&[
            ("/one.txt", "alpha\nbeta\ngamma\nbeta beta\ndelta"),
            ("/two.txt", "beta\nother"),
            ("/three.txt", "nothing here"),
        ]);
        let results = store.search(&SearchQuery {
            content: Some(ContentQuery {
                pattern: "beta".to_string(),
                case_sensitive: true,
                is_regex: false,
            }),
            ..Default::default()
        });

        assert_eq!(results.len(), 2);
        // Three occurrences in /one.txt ("beta" plus "beta beta") beat one
        // in /two.txt; one ContentMatch per matching line.
        assert_eq!(results[0].path, "/one.txt");
        assert_eq!(results[0].score, 3);
        assert_eq!(results[0].matches.len(), 2);
        assert_eq!(results[1].score, 1);
        let first = &results[0].matches[0];
        assert_eq!(first.line, 2);
        assert_eq!(first.column, 1);
        assert_eq!(first.context_before, vec!["alpha"]);
        assert_eq!(first.context_after, vec!["gamma", "beta beta"]);
    }

    #[test]
    fn case_insensitive_content_search() {
        let store = store_with_files(&[("/a.txt", "Beta")]);
        let insensitive = store.search(&SearchQuery {
            content: Some(ContentQuery {
                pattern: "beta".to_string(),
                case_sensitive: false,
                is_regex: false,
            }),
            ..Default::default()
        });
        assert_eq!(insensitive.len(), 1);

        let sensitive = store.search(&SearchQuery {
            content: Some(ContentQuery {
                pattern: "beta".to_string(),
                case_sensitive: true,
                is_regex: false,
            }),
            ..Default::default()
        });
        assert!(sensitive.is_empty());
    }

    #[test]
    fn malformed_regex_degrades_to_no_matches() {
        let store = store_with_files(&[("/a.txt", "anything")]);
        let results = store.search(&SearchQuery {
            content: Some(ContentQuery {
                pattern: "[unclosed".to_string(),
                case_sensitive: false,
                is_regex: true,
            }),
            ..Default::default()
        });
        assert!(results.is_empty());
    }

    #[test]
    fn literal_mode_escapes_metacharacters() {
        let store = store_with_files(&[("/a.txt", "price is $5.00"), ("/b.txt", "price is X5Y00")]);
        let results = store.search(&SearchQuery {
            content: Some(ContentQuery {
                pattern: "$5.00".to_string(),
                case_sensitive: true,
                is_regex: false,
            }),
            ..Default::default()
        });
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "/a.txt");
    }

    #[test]
    fn result_cap_is_enforced() {
        let mut store = store_with_files(&[]);
        for i in 0..10 {
            store.create(&format!("/f{i}.txt"), "hit").unwrap();
        }
        let results = store.search(&SearchQuery {
            limit: Some(3),
            ..Default::default()
        });
        assert_eq!(results.len(), 3);
    }
}
