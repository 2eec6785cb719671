//! Normalization rules merging commonly confused pinyin spellings.
//!
//! Rules are derived from the boolean toggles of a [`PinInConfig`] and expand
//! an initial or final into the set of spellings that should all match it.
//! Expansion runs in a fixed order (ch/sh/zh initials, then u→v, then
//! ang/eng/ing ↔ an/en/in) and every result keeps the original spelling
//! first.

use crate::config::PinInConfig;

/// Retroflex initials and their flat counterparts.
const RETROFLEX_PAIRS: [(&str, &str); 3] = [("ch", "c"), ("sh", "s"), ("zh", "z")];

/// Back nasal finals and their front counterparts.
const NASAL_PAIRS: [(&str, &str); 3] = [("ang", "an"), ("eng", "en"), ("ing", "in")];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuzzyRules {
    retroflex: Vec<(&'static str, &'static str)>,
    nasal: Vec<(&'static str, &'static str)>,
    u2v: bool,
}

impl FuzzyRules {
    pub fn from_config(config: &PinInConfig) -> Self {
        let retroflex_enabled = [config.ch2c, config.sh2s, config.zh2z];
        let nasal_enabled = [config.ang2an, config.eng2en, config.ing2in];
        Self {
            retroflex: RETROFLEX_PAIRS
                .into_iter()
                .zip(retroflex_enabled)
                .filter_map(|(pair, on)| on.then_some(pair))
                .collect(),
            nasal: NASAL_PAIRS
                .into_iter()
                .zip(nasal_enabled)
                .filter_map(|(pair, on)| on.then_some(pair))
                .collect(),
            u2v: config.u2v,
        }
    }

    /// Active rules as textual pairs such as `"zh=z"`.
    pub fn describe(&self) -> Vec<String> {
        let mut rules: Vec<String> = self
            .retroflex
            .iter()
            .chain(self.nasal.iter())
            .map(|(a, b)| format!("{a}={b}"))
            .collect();
        if self.u2v {
            rules.push("v=u".to_string());
        }
        rules
    }

    pub fn is_empty(&self) -> bool {
        self.retroflex.is_empty() && self.nasal.is_empty() && !self.u2v
    }

    /// Spellings an initial may be typed as.
    pub fn initials(&self, initial: &str) -> Vec<String> {
        let mut out = vec![initial.to_string()];
        for &(retroflex, flat) in &self.retroflex {
            if initial == retroflex || initial == flat {
                push_unique(&mut out, retroflex);
                push_unique(&mut out, flat);
            }
        }
        out
    }

    /// Spellings a final may be typed as.
    pub fn finals(&self, finale: &str) -> Vec<String> {
        let mut out = vec![finale.to_string()];
        if self.u2v {
            if let Some(rest) = finale.strip_prefix('v') {
                push_unique(&mut out, &format!("u{rest}"));
            }
        }
        for &(back, front) in &self.nasal {
            let current = out.clone();
            for spelling in current {
                if let Some(stem) = spelling.strip_suffix(back) {
                    push_unique(&mut out, &format!("{stem}{front}"));
                } else if let Some(stem) = spelling.strip_suffix(front) {
                    push_unique(&mut out, &format!("{stem}{back}"));
                }
            }
        }
        out
    }
}

fn push_unique(out: &mut Vec<String>, spelling: &str) {
    if !out.iter().any(|s| s == spelling) {
        out.push(spelling.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_toggles_means_identity() {
        let rules = FuzzyRules::from_config(&PinInConfig::default());
        assert!(rules.is_empty());
        assert_eq!(rules.initials("zh"), vec!["zh"]);
        assert_eq!(rules.finals("ang"), vec!["ang"]);
    }

    #[test]
    fn retroflex_pairs_work_both_ways() {
        let rules = FuzzyRules::from_config(&PinInConfig::default().with_zh2z(true));
        assert_eq!(rules.initials("zh"), vec!["zh", "z"]);
        assert_eq!(rules.initials("z"), vec!["z", "zh"]);
        assert_eq!(rules.initials("sh"), vec!["sh"]);
        assert_eq!(rules.describe(), vec!["zh=z"]);
    }

    #[test]
    fn nasal_pairs_cover_compound_finals() {
        let rules = FuzzyRules::from_config(&PinInConfig::default().with_ang2an(true));
        assert_eq!(rules.finals("ang"), vec!["ang", "an"]);
        assert_eq!(rules.finals("ian"), vec!["ian", "iang"]);
        assert_eq!(rules.finals("ong"), vec!["ong"]);
    }

    #[test]
    fn u2v_runs_before_nasal_rules() {
        let rules = FuzzyRules::from_config(
            &PinInConfig::default().with_u2v(true).with_eng2en(true),
        );
        assert_eq!(rules.finals("v"), vec!["v", "u"]);
        assert_eq!(rules.finals("ve"), vec!["ve", "ue"]);
        assert_eq!(rules.finals("en"), vec!["en", "eng"]);
        assert_eq!(rules.describe(), vec!["eng=en", "v=u"]);
    }
}
