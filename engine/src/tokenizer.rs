use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","also","am","among","an","and","any","are","as","at",
            "be","became","because","become","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","don","down","during",
            "each","either","else","etc","even","ever","every",
            "few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "if","in","into","is","it","its","itself",
            "just","let","ll","me","more","most","much","must","my","myself",
            "neither","no","nor","not","now","of","off","often","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "re","same","she","should","since","so","some","still","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","though","through","thus","to","too",
            "under","until","up","upon","us","ve","very",
            "was","we","well","were","what","when","where","whether","which","while","who","whom","whose","why","will","with","within","without","would",
            "yet","you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// N-gram and stemming options applied on top of [`tokenize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Inclusive (min, max) n-gram lengths.
    pub ngram_range: (usize, usize),
    pub stem: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { ngram_range: (1, 2), stem: false }
    }
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text using NFKC normalization, lowercase, a two-or-more word character
/// pattern and stopword removal.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|t| !is_stopword(t))
        .map(str::to_string)
        .collect()
}

/// Produce the feature terms of `text`: tokens, optionally stemmed, expanded into
/// every n-gram length in the configured range. N-grams are space-joined.
pub fn analyze(text: &str, config: &AnalyzerConfig) -> Vec<String> {
    let mut tokens = tokenize(text);
    if config.stem {
        for t in tokens.iter_mut() {
            let stem = STEMMER.stem(t.as_str()).into_owned();
            *t = stem;
        }
    }
    let (min_n, max_n) = config.ngram_range;
    let min_n = min_n.max(1);
    if min_n > max_n {
        return Vec::new();
    }
    if min_n == 1 && max_n == 1 {
        return tokens;
    }
    let mut terms = Vec::with_capacity(tokens.len() * (max_n - min_n + 1));
    for n in min_n..=max_n {
        if n == 1 {
            terms.extend(tokens.iter().cloned());
            continue;
        }
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}
