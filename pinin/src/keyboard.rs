//! Keyboard schemes: how a pinyin syllable is typed.
//!
//! Full pinyin (Quanpin) types the spelling itself. Double pinyin (Shuangpin
//! 双拼) schemes type every syllable with two keys, one for the initial and
//! one for the final; they differ in their key tables and in how syllables
//! without an initial are typed. Daqian types the Zhuyin symbols of the
//! syllable on the standard Taiwanese layout.
//!
//! Example (Microsoft scheme):
//! - "zh" + "ang" = "zhang" → typed as "vh" (v=zh, h=ang)
//! - "sh" + "i" = "shi" → typed as "ui" (u=sh, i=i)

use std::fmt;
use std::str::FromStr;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::zhuyin;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyboard {
    /// No scheme. Committing it keeps the current scheme; as a
    /// deserialization override it keeps the stored one.
    Null,
    /// Full pinyin.
    #[default]
    Quanpin,
    /// Zhuyin on the Daqian (大千) layout.
    Daqian,
    /// XiaoHe (小鹤)
    Xiaohe,
    /// ZiRanMa (自然码)
    Ziranma,
    /// Sougou (搜狗)
    Sougou,
    /// Zhineng ABC (智能ABC)
    ZhinengAbc,
    /// Guobiao (国标)
    Guobiao,
    /// Microsoft Shuangpin (微软双拼)
    Microsoft,
    /// PinYin++ (拼音加加)
    Pinyinpp,
    /// ZiGuang (紫光)
    Ziguang,
}

impl Keyboard {
    /// Every concrete scheme, excluding `Null`.
    pub const ALL: [Keyboard; 10] = [
        Keyboard::Quanpin,
        Keyboard::Daqian,
        Keyboard::Xiaohe,
        Keyboard::Ziranma,
        Keyboard::Sougou,
        Keyboard::ZhinengAbc,
        Keyboard::Guobiao,
        Keyboard::Microsoft,
        Keyboard::Pinyinpp,
        Keyboard::Ziguang,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Keyboard::Null => "null",
            Keyboard::Quanpin => "quanpin",
            Keyboard::Daqian => "daqian",
            Keyboard::Xiaohe => "xiaohe",
            Keyboard::Ziranma => "ziranma",
            Keyboard::Sougou => "sougou",
            Keyboard::ZhinengAbc => "zhineng_abc",
            Keyboard::Guobiao => "guobiao",
            Keyboard::Microsoft => "microsoft",
            Keyboard::Pinyinpp => "pinyinpp",
            Keyboard::Ziguang => "ziguang",
        }
    }

    pub fn is_double_pinyin(&self) -> bool {
        self.double_scheme().is_some()
    }

    fn double_scheme(&self) -> Option<&'static DoubleScheme> {
        match self {
            Keyboard::Xiaohe => Some(&XIAOHE),
            Keyboard::Ziranma => Some(&ZIRANMA),
            Keyboard::Sougou => Some(&SOUGOU),
            Keyboard::ZhinengAbc => Some(&ZHINENG_ABC),
            Keyboard::Guobiao => Some(&GUOBIAO),
            Keyboard::Microsoft => Some(&MICROSOFT),
            Keyboard::Pinyinpp => Some(&PINYINPP),
            Keyboard::Ziguang => Some(&ZIGUANG),
            Keyboard::Null | Keyboard::Quanpin | Keyboard::Daqian => None,
        }
    }

    /// Keystrokes for the initial and the final of a syllable. The initial
    /// keystrokes are empty when the syllable is typed without one. Returns
    /// `None` if the scheme cannot type the pair.
    pub fn keys(&self, initial: &str, finale: &str) -> Option<(String, String)> {
        if let Some(scheme) = self.double_scheme() {
            return scheme.keys(initial, finale);
        }
        match self {
            Keyboard::Daqian => {
                let (i, f) = zhuyin::to_zhuyin(initial, finale)?;
                Some((zhuyin::daqian_keys(&i)?, zhuyin::daqian_keys(&f)?))
            }
            _ => Some((initial.to_string(), finale.to_string())),
        }
    }

    pub fn tone_key(&self, tone: u8) -> char {
        match self {
            Keyboard::Daqian => zhuyin::daqian_tone_key(tone),
            _ => match tone {
                1..=4 => (b'0' + tone) as char,
                _ => '5',
            },
        }
    }
}

impl fmt::Display for Keyboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Keyboard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace(['-', ' '], "_");
        match wanted.as_str() {
            "null" => Ok(Keyboard::Null),
            "abc" => Ok(Keyboard::ZhinengAbc),
            "pinyin++" => Ok(Keyboard::Pinyinpp),
            name => Keyboard::ALL
                .into_iter()
                .find(|k| k.name() == name)
                .ok_or_else(|| format!("unknown keyboard '{s}'")),
        }
    }
}

/// How a double pinyin scheme types syllables that have no initial.
#[derive(Debug, Clone, Copy)]
enum ZeroInitial {
    /// A fixed lead key, then the final's key: `an` → `oj`.
    Lead(char),
    /// The final's first letter, then the second letter for two-letter
    /// finals, the letter again for one-letter finals, or the final's key
    /// for longer finals: `a` → `aa`, `an` → `an`, `ang` → `ah`.
    Spelled,
    /// The final's first letter, then the final's key: `an` → `aj`.
    Keyed,
}

struct DoubleScheme {
    initials: &'static phf::Map<&'static str, &'static str>,
    finals: &'static phf::Map<&'static str, &'static str>,
    zero: ZeroInitial,
}

impl DoubleScheme {
    fn final_key(&self, finale: &str) -> String {
        self.finals
            .get(finale)
            .map(|k| k.to_string())
            .unwrap_or_else(|| finale.to_string())
    }

    fn keys(&self, initial: &str, finale: &str) -> Option<(String, String)> {
        if finale.is_empty() {
            return None;
        }
        if !initial.is_empty() {
            let lead = self.initials.get(initial).copied().unwrap_or(initial);
            return Some((lead.to_string(), self.final_key(finale)));
        }
        let first = &finale[..1];
        let keys = match self.zero {
            ZeroInitial::Lead(lead) => (lead.to_string(), self.final_key(finale)),
            ZeroInitial::Keyed => (first.to_string(), self.final_key(finale)),
            ZeroInitial::Spelled => match finale.len() {
                1 => (first.to_string(), first.to_string()),
                2 => (first.to_string(), finale[1..].to_string()),
                _ => (first.to_string(), self.final_key(finale)),
            },
        };
        Some(keys)
    }
}

static RETROFLEX_VIU: phf::Map<&'static str, &'static str> = phf_map! {
    "zh" => "v", "ch" => "i", "sh" => "u",
};

static MICROSOFT_FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "iu" => "q", "ia" => "w", "ua" => "w", "er" => "r", "uan" => "r",
    "ue" => "t", "uai" => "y", "v" => "y", "uo" => "o", "un" => "p",
    "iong" => "s", "ong" => "s", "iang" => "d", "uang" => "d", "en" => "f",
    "eng" => "g", "ang" => "h", "an" => "j", "ao" => "k", "ai" => "l",
    "ing" => ";", "ei" => "z", "ie" => "x", "iao" => "c", "ui" => "v",
    "ve" => "v", "ou" => "b", "in" => "n", "ian" => "m",
};

static SOUGOU_FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "iu" => "q", "ia" => "w", "ua" => "w", "er" => "r", "uan" => "r",
    "ue" => "t", "ve" => "t", "uai" => "y", "v" => "y", "uo" => "o",
    "un" => "p", "iong" => "s", "ong" => "s", "iang" => "d", "uang" => "d",
    "en" => "f", "eng" => "g", "ang" => "h", "an" => "j", "ao" => "k",
    "ai" => "l", "ing" => ";", "ei" => "z", "ie" => "x", "iao" => "c",
    "ui" => "v", "ou" => "b", "in" => "n", "ian" => "m",
};

static XIAOHE_FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "iu" => "q", "ei" => "w", "uan" => "r", "ue" => "t", "ve" => "t",
    "un" => "y", "uo" => "o", "ie" => "p", "iong" => "s", "ong" => "s",
    "ai" => "d", "en" => "f", "eng" => "g", "ang" => "h", "an" => "j",
    "uai" => "k", "ing" => "k", "iang" => "l", "uang" => "l", "ou" => "z",
    "ia" => "x", "ua" => "x", "ao" => "c", "ui" => "v", "v" => "v",
    "in" => "b", "iao" => "n", "ian" => "m",
};

static ZIRANMA_FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "iu" => "q", "ia" => "w", "ua" => "w", "uan" => "r", "er" => "r",
    "ue" => "t", "ve" => "t", "uai" => "y", "ing" => "y", "uo" => "o",
    "un" => "p", "iong" => "s", "ong" => "s", "iang" => "d", "uang" => "d",
    "en" => "f", "eng" => "g", "ang" => "h", "an" => "j", "ao" => "k",
    "ai" => "l", "ei" => "z", "ie" => "x", "iao" => "c", "ui" => "v",
    "v" => "v", "ou" => "b", "in" => "n", "ian" => "m",
};

static GUOBIAO_FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "in" => "b", "ao" => "c", "ai" => "d", "en" => "f", "eng" => "g",
    "ang" => "h", "an" => "j", "ing" => "k", "uai" => "k", "iang" => "l",
    "uang" => "l", "ian" => "m", "iao" => "n", "ie" => "p", "iu" => "q",
    "uan" => "r", "er" => "r", "ong" => "s", "iong" => "s", "ue" => "t",
    "ve" => "t", "ei" => "w", "ia" => "x", "ua" => "x", "un" => "y",
    "ou" => "z", "ui" => "v", "v" => "v", "uo" => "o",
};

static ABC_INITIALS: phf::Map<&'static str, &'static str> = phf_map! {
    "zh" => "a", "ch" => "e", "sh" => "v",
};

static ABC_FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "ei" => "q", "ian" => "w", "iu" => "r", "er" => "r", "iang" => "t",
    "uang" => "t", "ing" => "y", "uan" => "p", "ong" => "s", "iong" => "s",
    "ia" => "d", "ua" => "d", "en" => "f", "eng" => "g", "ang" => "h",
    "an" => "j", "ao" => "k", "ai" => "l", "iao" => "z", "ie" => "x",
    "in" => "c", "uai" => "c", "ou" => "b", "un" => "n", "ue" => "m",
    "ui" => "m", "ve" => "m", "uo" => "o", "v" => "v",
};

static PINYINPP_INITIALS: phf::Map<&'static str, &'static str> = phf_map! {
    "zh" => "v", "ch" => "u", "sh" => "i",
};

static PINYINPP_FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "er" => "q", "ing" => "q", "ei" => "w", "en" => "r", "eng" => "t",
    "iong" => "y", "ong" => "y", "ou" => "p", "ai" => "s", "ao" => "d",
    "an" => "f", "ang" => "g", "iang" => "h", "uang" => "h", "ian" => "j",
    "iao" => "k", "in" => "l", "un" => "z", "uai" => "x", "ue" => "x",
    "ve" => "x", "uan" => "c", "ia" => "b", "ua" => "b", "iu" => "n",
    "ie" => "m", "ui" => "v", "v" => "v", "uo" => "o",
};

static ZIGUANG_INITIALS: phf::Map<&'static str, &'static str> = phf_map! {
    "zh" => "u", "ch" => "a", "sh" => "i",
};

static ZIGUANG_FINALS: phf::Map<&'static str, &'static str> = phf_map! {
    "ao" => "q", "en" => "w", "an" => "r", "eng" => "t", "in" => "y",
    "uai" => "y", "uo" => "o", "ai" => "p", "ang" => "s", "ie" => "d",
    "ian" => "f", "iang" => "g", "uang" => "g", "ong" => "h", "iong" => "h",
    "er" => "j", "iu" => "j", "ei" => "k", "uan" => "l", "ing" => ";",
    "ia" => "x", "ua" => "x", "iao" => "b", "ue" => "n", "ui" => "n",
    "ve" => "n", "un" => "m", "ou" => "z", "v" => "v",
};

static MICROSOFT: DoubleScheme = DoubleScheme {
    initials: &RETROFLEX_VIU,
    finals: &MICROSOFT_FINALS,
    zero: ZeroInitial::Lead('o'),
};

static SOUGOU: DoubleScheme = DoubleScheme {
    initials: &RETROFLEX_VIU,
    finals: &SOUGOU_FINALS,
    zero: ZeroInitial::Lead('o'),
};

static XIAOHE: DoubleScheme = DoubleScheme {
    initials: &RETROFLEX_VIU,
    finals: &XIAOHE_FINALS,
    zero: ZeroInitial::Spelled,
};

static ZIRANMA: DoubleScheme = DoubleScheme {
    initials: &RETROFLEX_VIU,
    finals: &ZIRANMA_FINALS,
    zero: ZeroInitial::Keyed,
};

static GUOBIAO: DoubleScheme = DoubleScheme {
    initials: &RETROFLEX_VIU,
    finals: &GUOBIAO_FINALS,
    zero: ZeroInitial::Spelled,
};

static ZHINENG_ABC: DoubleScheme = DoubleScheme {
    initials: &ABC_INITIALS,
    finals: &ABC_FINALS,
    zero: ZeroInitial::Lead('o'),
};

static PINYINPP: DoubleScheme = DoubleScheme {
    initials: &PINYINPP_INITIALS,
    finals: &PINYINPP_FINALS,
    zero: ZeroInitial::Spelled,
};

static ZIGUANG: DoubleScheme = DoubleScheme {
    initials: &ZIGUANG_INITIALS,
    finals: &ZIGUANG_FINALS,
    zero: ZeroInitial::Lead('o'),
};
