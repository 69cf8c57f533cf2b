//! Rule-based lexicon scorer in the VADER family.
//!
//! Each token is looked up in a valence lexicon (roughly -4..=4), then adjusted by:
//! - booster/dampener words up to three tokens back,
//! - negation in the same three-token window (`N_SCALAR`),
//! - ALL-CAPS emphasis when the text mixes cased and shouted words,
//! - "but" contrast (before ×0.5, after ×1.5) and "least" negation,
//! - `!` / `?` amplification of the summed score.
//!
//! The sum is squashed into `compound = s / sqrt(s² + ALPHA)`; pos/neu/neg are the
//! proportional shares of positive, neutral and negative token mass.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;

use super::{Scores, SentimentScorer};

const B_INCR: f64 = 0.293;
const B_DECR: f64 = -0.293;
const C_INCR: f64 = 0.733;
const N_SCALAR: f64 = -0.74;
const ALPHA: f64 = 15.0;

static DEFAULT_LEXICON: Lazy<Arc<HashMap<String, f64>>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    let map = parse_json_lexicon(raw).expect("valid sentiment lexicon");
    Arc::new(map)
});

#[derive(Debug, Clone)]
pub struct VaderScorer {
    lexicon: Arc<HashMap<String, f64>>,
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl VaderScorer {
    /// Scorer backed by the embedded lexicon.
    pub fn new() -> Self {
        Self {
            lexicon: DEFAULT_LEXICON.clone(),
        }
    }

    pub fn with_lexicon(lexicon: HashMap<String, f64>) -> Self {
        let lexicon = lexicon
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self {
            lexicon: Arc::new(lexicon),
        }
    }

    /// Load a lexicon from disk. `.json` is a `{word: valence}` object; any other
    /// extension is read as the tab-separated `word<TAB>mean<TAB>...` format.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading lexicon from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let map = if ext == "json" {
            parse_json_lexicon(&content)?
        } else {
            parse_tsv_lexicon(&content)?
        };
        if map.is_empty() {
            return Err(anyhow!("lexicon at {} is empty", path.display()));
        }
        Ok(Self::with_lexicon(map))
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    fn in_lexicon(&self, lower: &str) -> bool {
        self.lexicon.contains_key(lower)
    }

    fn valence(&self, i: usize, words: &[String], lower: &[String], cap_diff: bool) -> f64 {
        let Some(&base) = self.lexicon.get(&lower[i]) else {
            return 0.0;
        };
        let mut v = base;

        // "no" directly modifying another lexicon word carries no weight itself.
        if lower[i] == "no" && lower.get(i + 1).is_some_and(|n| self.in_lexicon(n)) {
            v = 0.0;
        }
        if (i > 0 && lower[i - 1] == "no")
            || (i > 1 && lower[i - 2] == "no")
            || (i > 2 && lower[i - 3] == "no" && matches!(lower[i - 1].as_str(), "or" | "nor"))
        {
            v = base * N_SCALAR;
        }

        if cap_diff && is_upper(&words[i]) {
            v += if v > 0.0 { C_INCR } else { -C_INCR };
        }

        for start_i in 0..3 {
            if i <= start_i {
                break;
            }
            let j = i - (start_i + 1);
            if self.in_lexicon(&lower[j]) {
                continue;
            }
            let mut s = scalar_inc_dec(&words[j], &lower[j], v, cap_diff);
            if start_i == 1 && s != 0.0 {
                s *= 0.95;
            }
            if start_i == 2 && s != 0.0 {
                s *= 0.9;
            }
            v += s;
            v = negation_check(v, lower, start_i, i);
        }

        self.least_check(v, lower, i)
    }

    fn least_check(&self, v: f64, lower: &[String], i: usize) -> f64 {
        if i > 1 && !self.in_lexicon(&lower[i - 1]) && lower[i - 1] == "least" {
            if lower[i - 2] != "at" && lower[i - 2] != "very" {
                return v * N_SCALAR;
            }
        } else if i > 0 && !self.in_lexicon(&lower[i - 1]) && lower[i - 1] == "least" {
            return v * N_SCALAR;
        }
        v
    }
}

impl SentimentScorer for VaderScorer {
    fn score(&self, text: &str) -> Scores {
        let words: Vec<String> = text.split_whitespace().map(strip_punct_if_word).collect();
        let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let cap_diff = is_cap_diff(&words);

        let mut sentiments = Vec::with_capacity(words.len());
        for i in 0..words.len() {
            let lw = lower[i].as_str();
            let kind_of = lw == "kind" && lower.get(i + 1).is_some_and(|n| n == "of");
            if booster(lw).is_some() || kind_of {
                sentiments.push(0.0);
                continue;
            }
            sentiments.push(self.valence(i, &words, &lower, cap_diff));
        }

        but_check(&lower, &mut sentiments);
        polarity(&sentiments, text)
    }
}

fn polarity(sentiments: &[f64], text: &str) -> Scores {
    if sentiments.is_empty() {
        return Scores {
            neu: 1.0,
            ..Scores::default()
        };
    }

    let amp = punctuation_emphasis(text);
    let mut sum: f64 = sentiments.iter().sum();
    if sum > 0.0 {
        sum += amp;
    } else if sum < 0.0 {
        sum -= amp;
    }
    let compound = (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0);

    let mut pos_sum = 0.0;
    let mut neg_sum = 0.0;
    let mut neu_count = 0.0;
    for &s in sentiments {
        if s > 0.0 {
            pos_sum += s + 1.0;
        } else if s < 0.0 {
            neg_sum += s - 1.0;
        } else {
            neu_count += 1.0;
        }
    }
    if pos_sum > f64::abs(neg_sum) {
        pos_sum += amp;
    } else if pos_sum < f64::abs(neg_sum) {
        neg_sum -= amp;
    }

    let total = pos_sum + f64::abs(neg_sum) + neu_count;
    Scores {
        neg: round_to(f64::abs(neg_sum / total), 3),
        neu: round_to(f64::abs(neu_count / total), 3),
        pos: round_to(f64::abs(pos_sum / total), 3),
        compound: round_to(compound, 4),
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let ep = text.matches('!').count().min(4) as f64 * 0.292;
    let qm = text.matches('?').count();
    let qm_amp = match qm {
        0 | 1 => 0.0,
        2..=3 => qm as f64 * 0.18,
        _ => 0.96,
    };
    ep + qm_amp
}

fn but_check(lower: &[String], sentiments: &mut [f64]) {
    let Some(bi) = lower.iter().position(|w| w == "but") else {
        return;
    };
    for (si, s) in sentiments.iter_mut().enumerate() {
        if si < bi {
            *s *= 0.5;
        } else if si > bi {
            *s *= 1.5;
        }
    }
}

fn negation_check(v: f64, lower: &[String], start_i: usize, i: usize) -> f64 {
    let w = |k: usize| lower[i - k].as_str();
    match start_i {
        0 if is_negated(w(1)) => v * N_SCALAR,
        1 => {
            if w(2) == "never" && matches!(w(1), "so" | "this") {
                v * 1.25
            } else if w(2) == "without" && w(1) == "doubt" {
                v
            } else if is_negated(w(2)) {
                v * N_SCALAR
            } else {
                v
            }
        }
        2 => {
            if w(3) == "never"
                && (matches!(w(2), "so" | "this") || matches!(w(1), "so" | "this"))
            {
                v * 1.25
            } else if w(3) == "without" && (w(2) == "doubt" || w(1) == "doubt") {
                v
            } else if is_negated(w(3)) {
                v * N_SCALAR
            } else {
                v
            }
        }
        _ => v,
    }
}

fn scalar_inc_dec(word: &str, lower: &str, valence: f64, cap_diff: bool) -> f64 {
    let Some(mut scalar) = booster(lower) else {
        return 0.0;
    };
    if valence < 0.0 {
        scalar = -scalar;
    }
    if cap_diff && is_upper(word) {
        scalar += if valence > 0.0 { C_INCR } else { -C_INCR };
    }
    scalar
}

fn booster(lower: &str) -> Option<f64> {
    match lower {
        "absolutely" | "amazingly" | "awfully" | "completely" | "considerably" | "decidedly"
        | "deeply" | "effing" | "enormously" | "entirely" | "especially" | "exceptionally"
        | "extremely" | "fabulously" | "flipping" | "flippin" | "fricking" | "frickin"
        | "frigging" | "friggin" | "fully" | "greatly" | "hella" | "highly" | "hugely"
        | "incredibly" | "intensely" | "majorly" | "more" | "most" | "particularly"
        | "purely" | "quite" | "really" | "remarkably" | "so" | "substantially"
        | "thoroughly" | "totally" | "tremendously" | "uber" | "unbelievably" | "unusually"
        | "utterly" | "very" => Some(B_INCR),
        "almost" | "barely" | "hardly" | "kinda" | "kindof" | "kind-of" | "less" | "little"
        | "marginally" | "occasionally" | "partly" | "scarcely" | "slightly" | "somewhat"
        | "sorta" | "sortof" | "sort-of" => Some(B_DECR),
        _ => None,
    }
}

fn is_negated(lower: &str) -> bool {
    matches!(
        lower,
        "aint" | "arent" | "cannot" | "cant" | "couldnt" | "darent" | "didnt" | "doesnt"
            | "dont" | "hadnt" | "hasnt" | "havent" | "isnt" | "mightnt" | "mustnt"
            | "neither" | "neednt" | "never" | "none" | "nope" | "nor" | "not" | "nothing"
            | "nowhere" | "oughtnt" | "shant" | "shouldnt" | "uhuh" | "uh-uh" | "wasnt"
            | "werent" | "without" | "wont" | "wouldnt" | "rarely" | "seldom" | "despite"
    ) || lower.contains("n't")
}

/// Python-style `isupper`: at least one uppercase letter and no lowercase ones.
fn is_upper(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// True when some, but not all, words are shouted.
fn is_cap_diff(words: &[String]) -> bool {
    let caps = words.iter().filter(|w| is_upper(w)).count();
    caps > 0 && caps < words.len()
}

/// Strip surrounding punctuation unless that leaves two chars or fewer (keeps emoticons).
fn strip_punct_if_word(token: &str) -> String {
    let stripped = token.trim_matches(|c: char| c.is_ascii_punctuation());
    if stripped.chars().count() <= 2 {
        token.to_string()
    } else {
        stripped.to_string()
    }
}

fn round_to(x: f64, places: i32) -> f64 {
    let p = 10f64.powi(places);
    (x * p).round() / p
}

fn parse_json_lexicon(raw: &str) -> Result<HashMap<String, f64>> {
    let map: HashMap<String, f64> =
        serde_json::from_str(raw).context("parsing json sentiment lexicon")?;
    Ok(map.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect())
}

fn parse_tsv_lexicon(raw: &str) -> Result<HashMap<String, f64>> {
    let mut out = HashMap::new();
    for (n, line) in raw.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut cols = line.split('\t');
        let (Some(word), Some(val)) = (cols.next(), cols.next()) else {
            return Err(anyhow!("lexicon line {} has fewer than two columns", n + 1));
        };
        let val: f64 = val
            .trim()
            .parse()
            .with_context(|| format!("lexicon line {}: bad valence", n + 1))?;
        out.insert(word.trim().to_lowercase(), val);
    }
    Ok(out)
}
