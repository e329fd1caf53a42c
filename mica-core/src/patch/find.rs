//! Locating recorded text inside live file content.
//!
//! Two searches back conflict resolution: an exact scan that finds every
//! line offset where an operation's old text still occurs (a unique hit
//! becomes a relocate resolution, multiple hits are flagged as ambiguous),
//! and a closest-match scan that slides a window over the file scoring
//! line-level similarity, so a content-changed conflict can say where the
//! text probably went instead of only that it is gone.

/// Closest window found for a block of lines that no longer matches
/// anywhere exactly.
#[derive(Debug, Clone)]
pub struct ClosestMatch {
    pub lines: Vec<String>,
    /// 0-based index of the window's first line.
    pub start_index: usize,
    /// 0.0 = nothing in common, 1.0 = exact.
    pub similarity: f64,
}

impl ClosestMatch {
    /// Human-readable hint for conflict reports. None for exact matches.
    pub fn describe(&self) -> Option<String> {
        if self.similarity >= 1.0 {
            return None;
        }

        let mut hint = format!(
            "Closest match: {:.1}% similar at line {}\n",
            self.similarity * 100.0,
            self.start_index + 1
        );
        for line in &self.lines {
            hint.push_str(line);
            hint.push('\n');
        }
        Some(hint)
    }
}

/// Every 0-based line index where `needle` occurs as a contiguous run.
pub fn find_exact(haystack: &[String], needle: &[String]) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    (0..=haystack.len() - needle.len())
        .filter(|&start| {
            needle
                .iter()
                .enumerate()
                .all(|(offset, line)| haystack[start + offset] == *line)
        })
        .collect()
}

/// Best-scoring window of `needle.len()` lines in `haystack`.
pub fn find_closest(haystack: &[String], needle: &[String]) -> Option<ClosestMatch> {
    if needle.is_empty() || haystack.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    let mut best: Option<ClosestMatch> = None;
    for start_index in 0..=haystack.len() - needle.len() {
        let window = &haystack[start_index..start_index + needle.len()];
        let similarity = window_similarity(window, needle);
        if best.as_ref().map_or(true, |b| similarity > b.similarity) {
            best = Some(ClosestMatch {
                lines: window.to_vec(),
                start_index,
                similarity,
            });
        }
    }
    best
}

fn window_similarity(window: &[String], needle: &[String]) -> f64 {
    let total: f64 = window
        .iter()
        .zip(needle.iter())
        .map(|(a, b)| line_similarity(a, b))
        .sum();
    total / needle.len() as f64
}

fn line_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let b_len = b.chars().count();
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
