//! Time signatures and the emphasis of each beat position within a bar.

use crate::error::MeterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_NUMERATOR: u32 = 1;
pub const MAX_NUMERATOR: u32 = 32;
pub const VALID_DENOMINATORS: [u32; 4] = [2, 4, 8, 16];

/// Musical weight of a beat position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emphasis {
    Strong,
    Medium,
    Weak,
}

impl Emphasis {
    pub fn is_accent(self) -> bool {
        matches!(self, Emphasis::Strong | Emphasis::Medium)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeterSpec {
    numerator: u32,
    denominator: u32,
}

impl MeterSpec {
    pub const TWO_FOUR: MeterSpec = MeterSpec::unchecked(2, 4);
    pub const THREE_FOUR: MeterSpec = MeterSpec::unchecked(3, 4);
    pub const FOUR_FOUR: MeterSpec = MeterSpec::unchecked(4, 4);
    pub const FIVE_FOUR: MeterSpec = MeterSpec::unchecked(5, 4);
    pub const SIX_EIGHT: MeterSpec = MeterSpec::unchecked(6, 8);
    pub const SEVEN_EIGHT: MeterSpec = MeterSpec::unchecked(7, 8);
    pub const NINE_EIGHT: MeterSpec = MeterSpec::unchecked(9, 8);
    pub const TWELVE_EIGHT: MeterSpec = MeterSpec::unchecked(12, 8);

    const fn unchecked(numerator: u32, denominator: u32) -> Self {
        MeterSpec {
            numerator,
            denominator,
        }
    }

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, MeterError> {
        if !(MIN_NUMERATOR..=MAX_NUMERATOR).contains(&numerator) {
            return Err(MeterError::Numerator {
                value: numerator,
                min: MIN_NUMERATOR,
                max: MAX_NUMERATOR,
            });
        }
        if !VALID_DENOMINATORS.contains(&denominator) {
            return Err(MeterError::Denominator(denominator));
        }
        Ok(Self::unchecked(numerator, denominator))
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// 6/8, 9/8, 12/8 and friends: beats felt in groups of three.
    pub fn is_compound(&self) -> bool {
        self.denominator >= 8 && self.numerator >= 6 && self.numerator % 3 == 0
    }

    /// Sizes of the beat groups that make up one bar, in order.
    pub fn groups(&self) -> Vec<u32> {
        let n = self.numerator;
        if n <= 3 {
            return vec![n];
        }
        if self.is_compound() {
            return vec![3; (n / 3) as usize];
        }
        if n % 2 == 0 {
            return vec![2; (n / 2) as usize];
        }
        let mut groups = vec![2; ((n - 3) / 2) as usize];
        groups.push(3);
        groups
    }

    fn group_starts(&self) -> Vec<u32> {
        self.groups()
            .iter()
            .scan(1, |position, size| {
                let start = *position;
                *position += size;
                Some(start)
            })
            .collect()
    }

    pub fn strong_beats(&self) -> Vec<u32> {
        if self.is_compound() {
            return self.group_starts();
        }
        let n = self.numerator;
        if n >= 4 && n % 4 == 0 {
            vec![1, n / 2 + 1]
        } else {
            vec![1]
        }
    }

    pub fn medium_beats(&self) -> Vec<u32> {
        let strong = self.strong_beats();
        self.group_starts()
            .into_iter()
            .filter(|position| !strong.contains(position))
            .collect()
    }

    pub fn weak_beats(&self) -> Vec<u32> {
        let strong = self.strong_beats();
        let medium = self.medium_beats();
        (1..=self.numerator)
            .filter(|position| !strong.contains(position) && !medium.contains(position))
            .collect()
    }

    /// Emphasis of a 1-indexed position. Positions past the bar are weak.
    pub fn emphasis(&self, position: u32) -> Emphasis {
        if self.strong_beats().contains(&position) {
            Emphasis::Strong
        } else if self.medium_beats().contains(&position) {
            Emphasis::Medium
        } else {
            Emphasis::Weak
        }
    }

    /// Emphasis with a user accent list taking precedence over the derived
    /// pattern. An empty list means no override. Beat 1 is always strong.
    pub fn emphasis_with_accents(&self, position: u32, accents: &[u32]) -> Emphasis {
        if accents.is_empty() {
            self.emphasis(position)
        } else if position == 1 || accents.contains(&position) {
            Emphasis::Strong
        } else {
            Emphasis::Weak
        }
    }
}

impl Default for MeterSpec {
    fn default() -> Self {
        MeterSpec::FOUR_FOUR
    }
}

pub const COMMON_METERS: [MeterSpec; 8] = [
    MeterSpec::TWO_FOUR,
    MeterSpec::THREE_FOUR,
    MeterSpec::FOUR_FOUR,
    MeterSpec::FIVE_FOUR,
    MeterSpec::SIX_EIGHT,
    MeterSpec::SEVEN_EIGHT,
    MeterSpec::NINE_EIGHT,
    MeterSpec::TWELVE_EIGHT,
];

impl fmt::Display for MeterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for MeterSpec {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = || MeterError::Parse(s.to_string());
        let (numerator, denominator) = s.trim().split_once('/').ok_or_else(parse_error)?;
        let numerator = numerator.trim().parse().map_err(|_| parse_error())?;
        let denominator = denominator.trim().parse().map_err(|_| parse_error())?;
        MeterSpec::new(numerator, denominator)
    }
}

impl TryFrom<String> for MeterSpec {
    type Error = MeterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MeterSpec> for String {
    fn from(meter: MeterSpec) -> Self {
        meter.to_string()
    }
}
