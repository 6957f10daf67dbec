//! Keystroke plans for text entry.

use serde::{Deserialize, Serialize};

use crate::config::TypingConfig;
use crate::random::{bounded, RandomSource};

/// One step of a typing plan. Every delay is waited before the step runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypingEvent {
    /// Type one character. `typo` marks a wrong key that a backspace follows.
    Key { ch: char, delay_ms: u32, typo: bool },
    /// Delete the previous character.
    Backspace { delay_ms: u32 },
    /// Idle between words or while thinking.
    Pause { delay_ms: u32 },
}

impl TypingEvent {
    pub fn delay_ms(&self) -> u32 {
        match self {
            Self::Key { delay_ms, .. } | Self::Backspace { delay_ms } | Self::Pause { delay_ms } => {
                *delay_ms
            }
        }
    }
}

/// Ordered keystrokes that produce a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingPlan {
    pub events: Vec<TypingEvent>,
    pub total_ms: u64,
    pub typo_count: u32,
}

impl TypingPlan {
    /// Text left in the field after replaying every event.
    pub fn final_text(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            match event {
                TypingEvent::Key { ch, .. } => out.push(*ch),
                TypingEvent::Backspace { .. } => {
                    out.pop();
                }
                TypingEvent::Pause { .. } => {}
            }
        }
        out
    }
}

fn adjacent_keys(ch: char) -> Option<&'static str> {
    let keys = match ch.to_ascii_lowercase() {
        'a' => "sqwz",
        'b' => "vghn",
        'c' => "xdfv",
        'd' => "erfcxs",
        'e' => "rdsw",
        'f' => "rtgvcd",
        'g' => "tyhbvf",
        'h' => "yujnbg",
        'i' => "uojk",
        'j' => "uiknmh",
        'k' => "iojlm",
        'l' => "opk",
        'm' => "njk",
        'n' => "bhjm",
        'o' => "iplk",
        'p' => "ol",
        'q' => "wa",
        'r' => "etdf",
        's' => "wedxza",
        't' => "ryfg",
        'u' => "yihj",
        'v' => "cfgb",
        'w' => "qeas",
        'x' => "zsdc",
        'y' => "tugh",
        'z' => "asx",
        _ => return None,
    };
    Some(keys)
}

fn typo_for<S: RandomSource>(rng: &mut S, ch: char) -> Option<char> {
    let keys: Vec<char> = adjacent_keys(ch)?.chars().collect();
    let typo = *rng.pick(&keys)?;
    Some(if ch.is_ascii_uppercase() {
        typo.to_ascii_uppercase()
    } else {
        typo
    })
}

fn char_delay<S: RandomSource>(rng: &mut S, config: &TypingConfig) -> u32 {
    let delay = rng.gaussian(config.char_delay_mean_ms, config.char_delay_std_ms);
    bounded(delay, config.char_delay_min_ms, config.char_delay_max_ms) as u32
}

fn range<S: RandomSource>(rng: &mut S, min: u32, max: u32) -> u32 {
    rng.int_inclusive(min as i64, max as i64) as u32
}

/// Plan the keystrokes for `text`. Words are re-joined with single spaces.
pub fn plan<S: RandomSource>(rng: &mut S, config: &TypingConfig, text: &str) -> TypingPlan {
    let mut events = Vec::new();
    let mut typo_count = 0;
    let words: Vec<&str> = text.split_whitespace().collect();

    for (idx, word) in words.iter().enumerate() {
        if idx > 0 {
            let pause = range(rng, config.word_pause_min_ms, config.word_pause_max_ms);
            events.push(TypingEvent::Pause { delay_ms: pause });
        }
        if rng.chance(config.think_probability) {
            let pause = range(rng, config.think_pause_min_ms, config.think_pause_max_ms);
            events.push(TypingEvent::Pause { delay_ms: pause });
        }

        for ch in word.chars() {
            if rng.chance(config.typo_probability) {
                if let Some(wrong) = typo_for(rng, ch) {
                    events.push(TypingEvent::Key {
                        ch: wrong,
                        delay_ms: char_delay(rng, config),
                        typo: true,
                    });
                    events.push(TypingEvent::Backspace {
                        delay_ms: range(rng, config.typo_fix_delay_min_ms, config.typo_fix_delay_max_ms),
                    });
                    typo_count += 1;
                }
            }
            events.push(TypingEvent::Key {
                ch,
                delay_ms: char_delay(rng, config),
                typo: false,
            });
        }

        if idx + 1 < words.len() {
            events.push(TypingEvent::Key {
                ch: ' ',
                delay_ms: char_delay(rng, config),
                typo: false,
            });
        }
    }

    let total_ms = events.iter().map(|e| e.delay_ms() as u64).sum();
    TypingPlan {
        events,
        total_ms,
        typo_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RandomModel;

    #[test]
    fn test_plan_reproduces_text() {
        let mut rng = RandomModel::seeded(51);
        let config = TypingConfig {
            typo_probability: 0.2,
            ..Default::default()
        };
        for text in ["rust async runtime", "Hello World", "단어 검색", ""] {
            let plan = plan(&mut rng, &config, text);
            assert_eq!(plan.final_text(), text);
        }
    }

    #[test]
    fn test_collapses_whitespace() {
        let mut rng = RandomModel::seeded(52);
        let plan = plan(&mut rng, &TypingConfig::default(), "  lofi   beats ");
        assert_eq!(plan.final_text(), "lofi beats");
    }

    #[test]
    fn test_delays_within_bounds_and_summed() {
        let mut rng = RandomModel::seeded(53);
        let config = TypingConfig::default();
        let plan = plan(&mut rng, &config, "the quick brown fox jumps over the lazy dog");
        let mut sum = 0u64;
        for event in &plan.events {
            if let TypingEvent::Key { delay_ms, .. } = event {
                assert!((80..=200).contains(delay_ms));
            }
            sum += event.delay_ms() as u64;
        }
        assert_eq!(plan.total_ms, sum);
    }

    #[test]
    fn test_typo_is_adjacent_key_then_backspace() {
        let mut rng = RandomModel::seeded(54);
        let config = TypingConfig {
            typo_probability: 1.0,
            think_probability: 0.0,
            ..Default::default()
        };
        let plan = plan(&mut rng, &config, "Go");
        assert_eq!(plan.typo_count, 2);
        match &plan.events[..3] {
            [TypingEvent::Key { ch, typo: true, .. }, TypingEvent::Backspace { .. }, TypingEvent::Key { ch: 'G', typo: false, .. }] =>
            {
                assert!("TYHBVF".contains(*ch));
            }
            other => panic!("unexpected events {other:?}"),
        }
    }
}
