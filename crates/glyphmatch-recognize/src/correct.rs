//! Post-recognition text correction.
//!
//! Runs line by line in a fixed order: dictionary correction, line casing,
//! digit runs, numeric gaps, noise-line merging, punctuation-heavy lines,
//! `I]` repair and finally spacing before closing punctuation.

use std::sync::Arc;

use glyphmatch_core::Lexicon;

use crate::charset::{confusables_for, digit_for, is_horizontal_noise, is_vertical_noise};

/// Largest edit distance accepted for a dictionary suggestion.
pub const MAX_EDIT_DISTANCE: usize = 2;
/// Minimum letters before a mostly-uppercase line is forced to uppercase.
pub const MIN_UPPERCASE_LINE_LETTERS: usize = 3;
pub const UPPERCASE_LINE_RATIO: f32 = 0.9;
pub const LOWERCASE_LINE_RATIO: f32 = 0.9;
/// Longest line, in non-space characters, treated as a stray mark.
pub const NOISE_LINE_MAX_CHARS: usize = 2;
/// Alphanumeric share below which a line loses its whitespace.
pub const PUNCTUATION_HEAVY_RATIO: f32 = 0.3;

const CLOSING_PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '?', ')', ']', '}'];

#[derive(Clone)]
pub struct Corrector {
    lexicon: Option<Arc<dyn Lexicon>>,
}

impl Corrector {
    /// Dictionary correction is skipped when `lexicon` is `None` or empty.
    pub fn new(lexicon: Option<Arc<dyn Lexicon>>) -> Self {
        let lexicon = lexicon.filter(|l| !l.is_empty());
        Self { lexicon }
    }

    pub fn has_dictionary(&self) -> bool {
        self.lexicon.is_some()
    }

    /// Correct a block of recognized text. The result is trimmed.
    pub fn correct(&self, text: &str) -> String {
        let lines: Vec<String> = text
            .lines()
            .map(|line| {
                let line = match &self.lexicon {
                    Some(lexicon) => correct_words(lexicon.as_ref(), line),
                    None => line.to_string(),
                };
                let line = normalize_line_case(&line);
                let line = normalize_digit_runs(&line);
                close_numeric_gaps(&line)
            })
            .collect();

        merge_noise_lines(lines)
            .iter()
            .map(|line| {
                let line = collapse_punctuation_heavy(line);
                let line = repair_bracketed_h(&line);
                tighten_punctuation(&line)
            })
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Dictionary-correct a single whitespace-free token. Tokens without a
    /// dictionary, or without letters, come back unchanged.
    pub fn correct_word(&self, token: &str) -> String {
        match &self.lexicon {
            Some(lexicon) => correct_word(lexicon.as_ref(), token),
            None => token.to_string(),
        }
    }
}

fn correct_words(lexicon: &dyn Lexicon, line: &str) -> String {
    line.split(' ')
        .map(|token| correct_word(lexicon, token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn correct_word(lexicon: &dyn Lexicon, token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let start = chars
        .iter()
        .position(|c| c.is_alphanumeric())
        .unwrap_or(chars.len());
    let end = chars
        .iter()
        .rposition(|c| c.is_alphanumeric())
        .map_or(start, |i| i + 1);
    let core: String = chars[start..end].iter().collect();
    if !core.chars().any(char::is_alphabetic) {
        return token.to_string();
    }

    let lower = core.to_lowercase();
    if lexicon.contains(&lower) {
        return token.to_string();
    }

    let found = suggest(lexicon, &core).or_else(|| {
        let stem = core.strip_suffix(['s', 'S'])?;
        if stem.is_empty() {
            return None;
        }
        suggest(lexicon, stem).map(|s| s + "s")
    });

    match found {
        Some(word) => {
            let leading: String = chars[..start].iter().collect();
            let trailing: String = chars[end..].iter().collect();
            format!("{leading}{}{trailing}", apply_casing(&core, &word))
        }
        None => token.to_string(),
    }
}

/// Confusable substitution first, then the closest word by edit distance.
fn suggest(lexicon: &dyn Lexicon, word: &str) -> Option<String> {
    substitute_confusable(lexicon, word).or_else(|| closest(lexicon, &word.to_lowercase()))
}

/// Try each look-alike at each position, one substitution at a time.
fn substitute_confusable(lexicon: &dyn Lexicon, word: &str) -> Option<String> {
    let chars: Vec<char> = word.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        for &alt in confusables_for(c) {
            let mut candidate = chars.clone();
            candidate[i] = alt;
            let candidate: String = candidate.into_iter().collect::<String>().to_lowercase();
            if lexicon.contains(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Closest dictionary word within one character of `word`'s length. Ties
/// prefer the longer word, then the lexicographically smaller one.
fn closest(lexicon: &dyn Lexicon, word: &str) -> Option<String> {
    let n = word.chars().count();
    let mut best: Option<(usize, &String)> = None;
    for len in n.saturating_sub(1)..=n + 1 {
        for candidate in lexicon.words_with_len(len) {
            let d = levenshtein(word, candidate);
            if d > MAX_EDIT_DISTANCE || d >= n {
                continue;
            }
            let better = match best {
                None => true,
                Some((bd, bw)) => {
                    let (cl, bl) = (candidate.chars().count(), bw.chars().count());
                    d < bd || (d == bd && (cl > bl || (cl == bl && candidate < bw)))
                }
            };
            if better {
                best = Some((d, candidate));
            }
        }
    }
    best.map(|(_, w)| w.clone())
}

/// Edit distance with unit-cost insertions, deletions and substitutions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Carry the casing of `original` over to `corrected`.
///
/// The first letter follows the original first letter. A middle letter at
/// `i` follows original `i + 1`, the last follows original `i - 1`, both
/// clamped to the original's length. The offsets keep casing aligned across
/// a single insertion or deletion.
pub fn apply_casing(original: &str, corrected: &str) -> String {
    let orig: Vec<char> = original.chars().collect();
    if orig.is_empty() {
        return corrected.to_string();
    }
    let n = corrected.chars().count();
    let last = orig.len() - 1;
    corrected
        .chars()
        .enumerate()
        .flat_map(|(i, c)| {
            let source = if i == 0 {
                0
            } else if i == n - 1 {
                (i - 1).min(last)
            } else {
                (i + 1).min(last)
            };
            let upper = orig[source].is_uppercase();
            let mapped: Vec<char> = if upper {
                c.to_uppercase().collect()
            } else {
                c.to_lowercase().collect()
            };
            mapped
        })
        .collect()
}

fn normalize_line_case(line: &str) -> String {
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return line.to_string();
    }
    let total = letters.len() as f32;
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    let lower = letters.iter().filter(|c| c.is_lowercase()).count();

    if letters.len() >= MIN_UPPERCASE_LINE_LETTERS && upper as f32 / total >= UPPERCASE_LINE_RATIO {
        return line.to_uppercase();
    }
    if lower as f32 / total >= LOWERCASE_LINE_RATIO && letters[0].is_lowercase() {
        let mut out = String::with_capacity(line.len());
        let mut seen_letter = false;
        for c in line.chars() {
            if c.is_alphabetic() && !seen_letter {
                seen_letter = true;
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
        }
        return out;
    }
    line.to_string()
}

/// Inside alphanumeric runs that are mostly digits, letters become the
/// digit they most likely stand for.
fn normalize_digit_runs(line: &str) -> String {
    fn flush(run: &mut Vec<char>, out: &mut String) {
        let digits = run.iter().filter(|c| c.is_ascii_digit()).count();
        if digits * 2 > run.len() {
            out.extend(run.iter().map(|&c| {
                if c.is_ascii_digit() {
                    c
                } else {
                    digit_for(c).unwrap_or(c)
                }
            }));
        } else {
            out.extend(run.iter());
        }
        run.clear();
    }

    let mut out = String::with_capacity(line.len());
    let mut run = Vec::new();
    for c in line.chars() {
        if c.is_alphanumeric() {
            run.push(c);
        } else {
            flush(&mut run, &mut out);
            out.push(c);
        }
    }
    flush(&mut run, &mut out);
    out
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// `12 34` becomes `1234` on digit-only lines; elsewhere a lone mark
/// between two digit groups is read as a decimal point (`12 o 50`).
fn close_numeric_gaps(line: &str) -> String {
    let digit_only = line.chars().any(|c| c.is_ascii_digit())
        && line.chars().all(|c| c.is_ascii_digit() || c.is_whitespace());
    if digit_only {
        return line.split_whitespace().collect();
    }

    let tokens: Vec<&str> = line.split(' ').collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let gap = i + 2 < tokens.len()
            && is_digits(tokens[i])
            && tokens[i + 1].chars().count() == 1
            && tokens[i + 1].chars().all(char::is_alphanumeric)
            && is_digits(tokens[i + 2]);
        if gap {
            out.push(format!("{}.{}", tokens[i], tokens[i + 2]));
            i += 3;
        } else {
            out.push(tokens[i].to_string());
            i += 1;
        }
    }
    out.join(" ")
}

/// A line of one or two stray strokes followed by a line starting in
/// lowercase is most likely a broken capital: `T` when both stroke
/// directions are present, `I` otherwise.
fn merge_noise_lines(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut pending: Option<char> = None;

    for (i, line) in lines.iter().enumerate() {
        if let Some(prefix) = pending.take() {
            out.push(format!("{prefix}{}", line.trim_start()));
            continue;
        }
        let marks: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
        let is_noise = !marks.is_empty()
            && marks.len() <= NOISE_LINE_MAX_CHARS
            && marks
                .iter()
                .all(|&c| is_vertical_noise(c) || is_horizontal_noise(c));
        let next_is_lower = lines
            .get(i + 1)
            .and_then(|next| next.trim_start().chars().next())
            .is_some_and(char::is_lowercase);

        if is_noise && next_is_lower {
            let vertical = marks.iter().any(|&c| is_vertical_noise(c));
            let horizontal = marks.iter().any(|&c| is_horizontal_noise(c));
            pending = Some(if vertical && horizontal { 'T' } else { 'I' });
        } else {
            out.push(line.clone());
        }
    }
    out
}

fn collapse_punctuation_heavy(line: &str) -> String {
    let visible = line.chars().filter(|c| !c.is_whitespace()).count();
    if visible == 0 {
        return line.to_string();
    }
    let alnum = line.chars().filter(|c| c.is_alphanumeric()).count();
    if (alnum as f32 / visible as f32) < PUNCTUATION_HEAVY_RATIO {
        line.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        line.to_string()
    }
}

/// `I]` between two letters, each optionally one space away, is a broken `H`.
fn repair_bracketed_h(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let letter_before = |i: usize| {
        let j = if i > 0 && chars[i - 1] == ' ' { i - 1 } else { i };
        j > 0 && chars[j - 1].is_alphabetic()
    };
    let letter_after = |i: usize| {
        let j = if chars.get(i) == Some(&' ') { i + 1 } else { i };
        chars.get(j).is_some_and(|c| c.is_alphabetic())
    };

    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == 'I'
            && chars.get(i + 1) == Some(&']')
            && letter_before(i)
            && letter_after(i + 2)
        {
            out.push('H');
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn tighten_punctuation(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        if CLOSING_PUNCTUATION.contains(&c) {
            while out.ends_with(char::is_whitespace) {
                out.pop();
            }
        }
        out.push(c);
    }
    out
}
