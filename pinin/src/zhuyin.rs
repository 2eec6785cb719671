//! Pinyin to Zhuyin (Bopomofo) conversion and the Daqian keyboard layout.

use phf::phf_map;

static INITIALS: phf::Map<&'static str, &'static str> = phf_map! {
    "b" => "ㄅ", "p" => "ㄆ", "m" => "ㄇ", "f" => "ㄈ",
    "d" => "ㄉ", "t" => "ㄊ", "n" => "ㄋ", "l" => "ㄌ",
    "g" => "ㄍ", "k" => "ㄎ", "h" => "ㄏ",
    "j" => "ㄐ", "q" => "ㄑ", "x" => "ㄒ",
    "zh" => "ㄓ", "ch" => "ㄔ", "sh" => "ㄕ", "r" => "ㄖ",
    "z" => "ㄗ", "c" => "ㄘ", "s" => "ㄙ",
};

/// Finals after y/w and ü spellings have been undone.
static FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "a" => "ㄚ", "o" => "ㄛ", "e" => "ㄜ", "ai" => "ㄞ", "ei" => "ㄟ",
    "ao" => "ㄠ", "ou" => "ㄡ", "an" => "ㄢ", "en" => "ㄣ", "ang" => "ㄤ",
    "eng" => "ㄥ", "er" => "ㄦ", "ong" => "ㄨㄥ",
    "i" => "ㄧ", "ia" => "ㄧㄚ", "io" => "ㄧㄛ", "ie" => "ㄧㄝ", "iai" => "ㄧㄞ",
    "iao" => "ㄧㄠ", "iou" => "ㄧㄡ", "ian" => "ㄧㄢ", "in" => "ㄧㄣ",
    "iang" => "ㄧㄤ", "ing" => "ㄧㄥ", "iong" => "ㄩㄥ",
    "u" => "ㄨ", "ua" => "ㄨㄚ", "uo" => "ㄨㄛ", "uai" => "ㄨㄞ", "uei" => "ㄨㄟ",
    "uan" => "ㄨㄢ", "uen" => "ㄨㄣ", "uang" => "ㄨㄤ", "ueng" => "ㄨㄥ",
    "v" => "ㄩ", "ve" => "ㄩㄝ", "van" => "ㄩㄢ", "vn" => "ㄩㄣ",
    "m" => "ㄇ", "n" => "ㄣ", "ng" => "ㄥ",
};

static DAQIAN_KEYS: phf::Map<char, char> = phf_map! {
    'ㄅ' => '1', 'ㄆ' => 'q', 'ㄇ' => 'a', 'ㄈ' => 'z',
    'ㄉ' => '2', 'ㄊ' => 'w', 'ㄋ' => 's', 'ㄌ' => 'x',
    'ㄍ' => 'e', 'ㄎ' => 'd', 'ㄏ' => 'c',
    'ㄐ' => 'r', 'ㄑ' => 'f', 'ㄒ' => 'v',
    'ㄓ' => '5', 'ㄔ' => 't', 'ㄕ' => 'g', 'ㄖ' => 'b',
    'ㄗ' => 'y', 'ㄘ' => 'h', 'ㄙ' => 'n',
    'ㄧ' => 'u', 'ㄨ' => 'j', 'ㄩ' => 'm',
    'ㄚ' => '8', 'ㄛ' => 'i', 'ㄜ' => 'k', 'ㄝ' => ',',
    'ㄞ' => '9', 'ㄟ' => 'o', 'ㄠ' => 'l', 'ㄡ' => '.',
    'ㄢ' => '0', 'ㄣ' => 'p', 'ㄤ' => ';', 'ㄥ' => '/', 'ㄦ' => '-',
};

/// Convert a pinyin initial/final pair to Zhuyin initial and final symbols.
/// Returns `None` for spellings with no Zhuyin counterpart.
pub fn to_zhuyin(initial: &str, finale: &str) -> Option<(String, String)> {
    let (initial, finale) = undo_spelling_rules(initial, finale);
    let initial_symbols = if initial.is_empty() {
        ""
    } else {
        *INITIALS.get(initial)?
    };
    let final_symbols = if finale.is_empty() {
        ""
    } else {
        *FINALS.get(finale.as_str())?
    };
    if initial_symbols.is_empty() && final_symbols.is_empty() {
        return None;
    }
    Some((initial_symbols.to_string(), final_symbols.to_string()))
}

/// Restore the underlying final hidden by y/w spellings, ü elision after
/// j/q/x and the shortened iu/ui/un forms.
fn undo_spelling_rules<'a>(initial: &'a str, finale: &str) -> (&'a str, String) {
    let mut initial = initial;
    let mut finale = match initial {
        "y" => {
            initial = "";
            match finale {
                "u" => "v".to_string(),
                "ue" => "ve".to_string(),
                "uan" => "van".to_string(),
                "un" => "vn".to_string(),
                "ong" => "iong".to_string(),
                f if f.starts_with('i') => f.to_string(),
                f => format!("i{f}"),
            }
        }
        "w" => {
            initial = "";
            if finale.starts_with('u') {
                finale.to_string()
            } else {
                format!("u{finale}")
            }
        }
        "j" | "q" | "x" if finale.starts_with('u') => format!("v{}", &finale[1..]),
        "l" | "n" if finale == "ue" => "ve".to_string(),
        _ => finale.to_string(),
    };

    if finale == "i" && matches!(initial, "zh" | "ch" | "sh" | "r" | "z" | "c" | "s") {
        finale.clear();
    }
    let full = match finale.as_str() {
        "iu" => Some("iou"),
        "ui" => Some("uei"),
        "un" => Some("uen"),
        _ => None,
    };
    if let Some(full) = full {
        finale = full.to_string();
    }
    (initial, finale)
}

/// Tone mark written after the syllable; first tone is unmarked.
pub fn tone_mark(tone: u8) -> &'static str {
    match tone {
        2 => "ˊ",
        3 => "ˇ",
        4 => "ˋ",
        0 => "˙",
        _ => "",
    }
}

/// Daqian keystrokes for a run of Zhuyin symbols.
pub fn daqian_keys(symbols: &str) -> Option<String> {
    symbols.chars().map(|c| DAQIAN_KEYS.get(&c).copied()).collect()
}

/// Daqian tone key; the first tone is typed with a space.
pub fn daqian_tone_key(tone: u8) -> char {
    match tone {
        2 => '6',
        3 => '3',
        4 => '4',
        0 => '7',
        _ => ' ',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zy(initial: &str, finale: &str) -> String {
        let (i, f) = to_zhuyin(initial, finale).unwrap();
        format!("{i}{f}")
    }

    #[test]
    fn plain_syllables() {
        assert_eq!(zy("zh", "ong"), "ㄓㄨㄥ");
        assert_eq!(zy("x", "ian"), "ㄒㄧㄢ");
        assert_eq!(zy("", "an"), "ㄢ");
        assert_eq!(zy("b", "o"), "ㄅㄛ");
    }

    #[test]
    fn spelling_rules_are_undone() {
        assert_eq!(zy("y", "u"), "ㄩ");
        assert_eq!(zy("y", "ou"), "ㄧㄡ");
        assert_eq!(zy("y", "in"), "ㄧㄣ");
        assert_eq!(zy("y", "ong"), "ㄩㄥ");
        assert_eq!(zy("w", "u"), "ㄨ");
        assert_eq!(zy("w", "ei"), "ㄨㄟ");
        assert_eq!(zy("x", "ue"), "ㄒㄩㄝ");
        assert_eq!(zy("j", "un"), "ㄐㄩㄣ");
        assert_eq!(zy("l", "iu"), "ㄌㄧㄡ");
        assert_eq!(zy("g", "ui"), "ㄍㄨㄟ");
        assert_eq!(zy("l", "un"), "ㄌㄨㄣ");
        assert_eq!(zy("n", "v"), "ㄋㄩ");
    }

    #[test]
    fn retroflex_i_is_empty_final() {
        assert_eq!(to_zhuyin("sh", "i"), Some(("ㄕ".to_string(), String::new())));
        assert_eq!(zy("z", "i"), "ㄗ");
        assert_eq!(zy("x", "i"), "ㄒㄧ");
    }

    #[test]
    fn daqian_layout() {
        assert_eq!(daqian_keys("ㄓㄨㄥ").as_deref(), Some("5j/"));
        assert_eq!(daqian_keys("ㄒㄧㄢ").as_deref(), Some("vu0"));
        assert_eq!(daqian_keys("ㄫ"), None);
        assert_eq!(daqian_tone_key(1), ' ');
        assert_eq!(daqian_tone_key(3), '3');
    }

    #[test]
    fn unknown_finals_fail() {
        assert_eq!(to_zhuyin("b", "xyz"), None);
        assert_eq!(to_zhuyin("", ""), None);
    }
}
