//! Title resolution: maps a free-text query onto a corpus position.
//!
//! Both modes try an exact (case-insensitive, trimmed) title match first. `Strict`
//! then falls back to substring containment, `Fuzzy` to a matching-blocks ratio with
//! a minimum cutoff.

use crate::catalog::Corpus;

pub const DEFAULT_FUZZY_CUTOFF: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    #[default]
    Strict,
    Fuzzy,
}

impl std::str::FromStr for ResolveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ResolveMode::Strict),
            "fuzzy" => Ok(ResolveMode::Fuzzy),
            other => Err(format!("unknown resolve mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub position: usize,
    pub matched_title: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolver {
    pub mode: ResolveMode,
    pub cutoff: f64,
}

impl Default for Resolver {
    fn default() -> Self {
        Self { mode: ResolveMode::Strict, cutoff: DEFAULT_FUZZY_CUTOFF }
    }
}

impl Resolver {
    pub fn new(mode: ResolveMode, cutoff: f64) -> Self {
        Self { mode, cutoff }
    }

    pub fn resolve(&self, corpus: &Corpus, query: &str) -> Option<Resolution> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        let lowered: Vec<String> = corpus.items().iter().map(|it| it.title().trim().to_lowercase()).collect();

        let position = lowered
            .iter()
            .position(|t| *t == query)
            .or_else(|| match self.mode {
                ResolveMode::Strict => lowered.iter().position(|t| t.contains(&query)),
                ResolveMode::Fuzzy => best_fuzzy(&lowered, &query, self.cutoff),
            })?;
        let matched_title = corpus.get(position)?.title().to_string();
        Some(Resolution { position, matched_title })
    }
}

/// Highest-ratio title at or above `cutoff`; equal ratios go to the lowest position.
fn best_fuzzy(titles: &[String], query: &str, cutoff: f64) -> Option<usize> {
    let q: Vec<char> = query.chars().collect();
    let mut best: Option<(usize, f64)> = None;
    for (pos, title) in titles.iter().enumerate() {
        if title.is_empty() { continue; }
        let t: Vec<char> = title.chars().collect();
        // candidate first, query second; the ratio is order-sensitive
        let r = ratio(&t, &q);
        if r < cutoff { continue; }
        if best.map_or(true, |(_, b)| r > b) {
            best = Some((pos, r));
        }
    }
    best.map(|(pos, _)| pos)
}

/// Ratcliff/Obershelp similarity: 2 * matched / total length, in [0, 1].
pub fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a, b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut stack = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 { continue; }
        matched += k;
        if alo < i && blo < j {
            stack.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            stack.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a` on ties.
fn longest_match(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let k = prev[col - 1] + 1;
                cur[col] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            } else {
                cur[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (best_i, best_j, best_k)
}
