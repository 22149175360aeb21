//! Label and fingerprint similarity.
//!
//! [`SimilarityScorer`] turns two label strings into a score in `[0.0, 1.0]`.
//! The default scorer is a normalised Levenshtein ratio over Unicode scalar
//! values after NFC normalisation; it is case sensitive, so `"Homo sapiens"`
//! and `"Homo Sapiens"` score just below 1.0.

use unicode_normalization::UnicodeNormalization;

/// Scores the similarity of two labels.
pub trait SimilarityScorer: Send + Sync {
    /// Score in `[0.0, 1.0]`; `1.0` means identical. An empty label is not
    /// evidence of anything and scores `0.0`.
    fn score(&self, a: &str, b: &str) -> f64;
}

/// `1 - levenshtein(a, b) / max(len(a), len(b))`.
#[derive(Debug, Clone, Copy)]
pub struct LevenshteinRatio {
    /// Compare case-sensitively (default `true`).
    pub case_sensitive: bool,
}

impl Default for LevenshteinRatio {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

impl LevenshteinRatio {
    pub fn case_insensitive() -> Self {
        Self {
            case_sensitive: false,
        }
    }

    fn normalize(&self, s: &str) -> Vec<char> {
        if self.case_sensitive {
            s.nfc().collect()
        } else {
            s.nfc().flat_map(char::to_lowercase).collect()
        }
    }
}

impl SimilarityScorer for LevenshteinRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a = self.normalize(a);
        let b = self.normalize(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let longest = a.len().max(b.len());
        let distance = levenshtein(&a, &b);
        1.0 - distance as f64 / longest as f64
    }
}

/// Levenshtein edit distance over two character slices (two-row DP).
pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1) // deletion
                .min(curr[j] + 1) // insertion
                .min(prev[j] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Best score over every pair drawn from two label sets.
///
/// Returns `0.0` when either set is empty.
pub fn best_label_score<S, A, B>(scorer: &S, labels1: &[A], labels2: &[B]) -> f64
where
    S: SimilarityScorer + ?Sized,
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut best = 0.0_f64;
    for l1 in labels1 {
        for l2 in labels2 {
            let s = scorer.score(l1.as_ref(), l2.as_ref());
            if s > best {
                best = s;
                if best >= 1.0 {
                    return 1.0;
                }
            }
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Chemical fingerprints
// ---------------------------------------------------------------------------

/// A binary chemical fingerprint (e.g. the PubChem substructure fingerprint).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hexadecimal fingerprint. Returns `None` on non-hex input.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;
        let mut bytes = Vec::with_capacity(digits.len().div_ceil(2));
        for pair in digits.chunks(2) {
            let hi = pair[0];
            let lo = pair.get(1).copied().unwrap_or(0);
            bytes.push((hi << 4) | lo);
        }
        Some(Self(bytes))
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|b| b.count_ones()).sum()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Tanimoto (Jaccard) similarity of two fingerprints.
///
/// Fingerprints of different lengths are compared over the shorter prefix for
/// the intersection. Two empty fingerprints score `0.0`.
pub fn tanimoto(fp1: &Fingerprint, fp2: &Fingerprint) -> f64 {
    let both: u32 = fp1
        .0
        .iter()
        .zip(fp2.0.iter())
        .map(|(a, b)| (a & b).count_ones())
        .sum();
    let union = fp1.count_ones() + fp2.count_ones() - both;
    if union == 0 {
        return 0.0;
    }
    f64::from(both) / f64::from(union)
}
