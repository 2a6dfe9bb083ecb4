//! Character tables used by the corrector.
//!
//! Template matching confuses a small, predictable set of shapes. These
//! tables list the alternatives tried during dictionary correction and the
//! digit substitutions applied inside numbers.

/// Look-alike characters tried, one position at a time, when a word is not
/// in the dictionary. Order within a row is the order of attempts.
pub static CONFUSABLES: &[(char, &[char])] = &[
    ('0', &['O', 'o', 'B', '8']),
    ('O', &['0', 'Q', 'D']),
    ('o', &['0', 'c', 'e', 'a']),
    ('B', &['8', '0']),
    ('8', &['B', '0']),
    ('1', &['l', 'I', 'i']),
    ('l', &['1', 'I', 'i', 't']),
    ('I', &['l', '1']),
    ('i', &['l', 'j', '1']),
    ('j', &['i']),
    ('5', &['S', 's']),
    ('S', &['5']),
    ('s', &['5']),
    ('2', &['Z', 'z']),
    ('Z', &['2']),
    ('z', &['2']),
    ('6', &['b', 'G']),
    ('b', &['h', '6']),
    ('h', &['b', 'n']),
    ('n', &['h', 'u', 'r']),
    ('u', &['n', 'v']),
    ('v', &['u', 'y']),
    ('y', &['v']),
    ('9', &['g', 'q']),
    ('g', &['q', '9']),
    ('q', &['g']),
    ('c', &['e', 'o']),
    ('e', &['c', 'o']),
    ('a', &['o', 'e']),
    ('f', &['t']),
    ('t', &['f', 'l']),
    ('r', &['n']),
    ('m', &['n']),
];

/// Shapes that, alone on a line, are most likely stray marks from a
/// vertical stroke.
pub static VERTICAL_NOISE: &[char] = &['|', '!', 'l', 'I', '1', '\'', ':', ';'];

/// Shapes that, alone on a line, are most likely stray marks from a
/// horizontal stroke.
pub static HORIZONTAL_NOISE: &[char] = &['-', '_', '~', '='];

/// Alternatives for `c` from [`CONFUSABLES`], empty if there are none.
pub fn confusables_for(c: char) -> &'static [char] {
    CONFUSABLES
        .iter()
        .find(|(k, _)| *k == c)
        .map(|(_, alts)| *alts)
        .unwrap_or(&[])
}

/// Digit a letter most likely stands for inside a number.
pub fn digit_for(c: char) -> Option<char> {
    match c {
        'O' | 'o' => Some('0'),
        'I' | 'l' | 'L' | 't' | 'T' => Some('1'),
        'Z' | 'z' => Some('2'),
        'A' | 'a' => Some('8'),
        'S' | 's' => Some('5'),
        _ => None,
    }
}

pub fn is_vertical_noise(c: char) -> bool {
    VERTICAL_NOISE.contains(&c)
}

pub fn is_horizontal_noise(c: char) -> bool {
    HORIZONTAL_NOISE.contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_confusables() {
        assert_eq!(confusables_for('0'), &['O', 'o', 'B', '8']);
        assert!(confusables_for('#').is_empty());
    }

    #[test]
    fn test_confusable_keys_are_unique() {
        for (i, (k, _)) in CONFUSABLES.iter().enumerate() {
            assert!(
                CONFUSABLES[i + 1..].iter().all(|(other, _)| other != k),
                "duplicate confusable row for '{k}'"
            );
        }
    }

    #[test]
    fn test_digit_for() {
        assert_eq!(digit_for('O'), Some('0'));
        assert_eq!(digit_for('T'), Some('1'));
        assert_eq!(digit_for('a'), Some('8'));
        assert_eq!(digit_for('x'), None);
    }

    #[test]
    fn test_noise_sets_are_disjoint() {
        for c in VERTICAL_NOISE {
            assert!(!is_horizontal_noise(*c));
        }
        assert!(is_vertical_noise('|'));
        assert!(is_horizontal_noise('~'));
    }
}
