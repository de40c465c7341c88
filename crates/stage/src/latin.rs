//! Latin-script checks for level names.
//!
//! Mobile clients only ship fonts for the Latin ranges, so names outside them
//! are flagged at upload and transliterated when shown on mobile.

use pinyin::ToPinyin;
use regex::Regex;
use std::sync::LazyLock;

/// Anything outside Basic Latin, Latin-1, Latin Extended-A/B and Latin
/// Extended Additional.
static NON_LATIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\x00-\x{024F}\x{1E00}-\x{1EFF}]").unwrap());

/// Full-width and CJK punctuation with an ASCII equivalent.
const PUNCTUATION: [(char, char); 26] = [
    ('，', ','),
    ('。', '.'),
    ('！', '!'),
    ('？', '?'),
    ('【', '['),
    ('】', ']'),
    ('（', '('),
    ('）', ')'),
    ('％', '%'),
    ('＃', '#'),
    ('＠', '@'),
    ('＆', '&'),
    ('－', '-'),
    ('—', '-'),
    ('〔', '('),
    ('〕', ')'),
    ('：', ':'),
    ('；', ';'),
    ('〇', '0'),
    ('﹒', '.'),
    ('﹙', '('),
    ('﹚', ')'),
    ('、', ','),
    ('“', '"'),
    ('”', '"'),
    ('　', ' '),
];

pub fn is_non_latin(name: &str) -> bool {
    NON_LATIN.is_match(name)
}

/// Replace punctuation with its ASCII form and spell Han characters in
/// toneless pinyin, one syllable per word. Whatever is still outside the
/// Latin ranges afterwards (kana, symbols) is dropped.
pub fn latinify(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut in_run = false;
    for c in name.chars() {
        let c = PUNCTUATION.iter().find(|(from, _)| *from == c).map_or(c, |(_, to)| *to);
        if let Some(syllable) = c.to_pinyin() {
            words.push(syllable.plain().to_string());
            in_run = false;
        } else if in_run && let Some(word) = words.last_mut() {
            word.push(c);
        } else {
            words.push(c.to_string());
            in_run = true;
        }
    }
    let spelled = words.join(" ");
    NON_LATIN.replace_all(&spelled, "").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Castle of Doom", false)]
    #[case("Señor Ñandú", false)]
    #[case("Ærøskøbing", false)]
    #[case("Tiếng Việt", false)]
    #[case("城堡", true)]
    #[case("Castle 城堡", true)]
    #[case("Castle，Doom", true)]
    fn test_is_non_latin(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_non_latin(name), expected);
    }

    #[rstest]
    #[case("Castle of Doom", "Castle of Doom")]
    #[case("【Boss】城堡！", "[Boss] cheng bao !")]
    #[case("城堡（一）", "cheng bao ( yi )")]
    #[case("Castle　of　Doom", "Castle of Doom")]
    #[case("“Hola”，amigo", "\"Hola\",amigo")]
    fn test_latinify(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(latinify(name), expected);
    }

    #[test]
    fn test_han_only_name_is_spelled_out() {
        assert_eq!(latinify("城堡"), "cheng bao");
    }

    #[test]
    fn test_latinify_output_is_latin() {
        let spelled = latinify("混合 Mixed 名前 ★");
        assert!(!is_non_latin(&spelled));
        assert!(spelled.contains("Mixed"));
        assert!(!latinify("ゲーム").contains(char::is_whitespace));
    }
}
