use std::fmt;

use serde::Serialize;

/// Letter grades, best to worst. The derived `Ord` follows declaration order,
/// so `Letter::A < Letter::E` and a `BTreeMap<Letter, _>` iterates A first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Letter {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "E")]
    E,
}

impl Letter {
    pub fn as_str(self) -> &'static str {
        match self {
            Letter::A => "A",
            Letter::AMinus => "A-",
            Letter::BPlus => "B+",
            Letter::B => "B",
            Letter::BMinus => "B-",
            Letter::CPlus => "C+",
            Letter::C => "C",
            Letter::CMinus => "C-",
            Letter::DPlus => "D+",
            Letter::D => "D",
            Letter::DMinus => "D-",
            Letter::E => "E",
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grades a single subject score on the 0-100 scale. The D-/E cutoff is 30.
pub fn subject_grade(score: f64) -> Letter {
    match score {
        s if s >= 80.0 => Letter::A,
        s if s >= 75.0 => Letter::AMinus,
        s if s >= 70.0 => Letter::BPlus,
        s if s >= 65.0 => Letter::B,
        s if s >= 60.0 => Letter::BMinus,
        s if s >= 55.0 => Letter::CPlus,
        s if s >= 50.0 => Letter::C,
        s if s >= 45.0 => Letter::CMinus,
        s if s >= 40.0 => Letter::DPlus,
        s if s >= 35.0 => Letter::D,
        s if s >= 30.0 => Letter::DMinus,
        _ => Letter::E,
    }
}

/// Full curriculum marks a raw total is graded against.
pub const TOTAL_MARKS: f64 = 1100.0;

/// Grades a raw total against the fixed [`TOTAL_MARKS`] denominator. Only
/// meaningful for whole-curriculum totals; single scores and averages use
/// [`subject_grade`].
pub fn total_grade(total: f64) -> Letter {
    let percentage = total / TOTAL_MARKS * 100.0;
    match percentage {
        p if p >= 78.0 => Letter::A,
        p if p >= 73.0 => Letter::AMinus,
        p if p >= 68.0 => Letter::BPlus,
        p if p >= 63.0 => Letter::B,
        p if p >= 58.0 => Letter::BMinus,
        p if p >= 53.0 => Letter::CPlus,
        p if p >= 48.0 => Letter::C,
        p if p >= 43.0 => Letter::CMinus,
        p if p >= 38.0 => Letter::DPlus,
        p if p >= 33.0 => Letter::D,
        p if p >= 25.0 => Letter::DMinus,
        _ => Letter::E,
    }
}

pub fn remark(letter: Letter) -> &'static str {
    match letter {
        Letter::A | Letter::AMinus => "Excellent performance!",
        Letter::BPlus | Letter::B | Letter::BMinus => "Very good, keep it up!",
        Letter::CPlus | Letter::C | Letter::CMinus => "Fair, needs improvement.",
        Letter::DPlus | Letter::D | Letter::DMinus => "Weak, more effort required.",
        Letter::E => "Very poor, urgent improvement needed.",
    }
}
