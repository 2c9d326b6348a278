//! Day-of-week combinations used by timetable calendars.
//!
//! Every non-empty subset of the week has a weight: the sum of `2^(7-i)` over
//! the day indices it contains (Monday = 0). Earlier days weigh more, so
//! sorting by weight puts "Monday to Friday" before "Saturday" before
//! "Sunday". The weight is also the bit pattern of [`DaySet`].
//!
//! Day codes are built from the tokens `M T W TH F S SU`. A run of three or
//! more consecutive days has two codes (`M-W` and `MTW`); both resolve to the
//! same weight, which is the identity of the set.

use std::collections::HashMap;
use std::sync::LazyLock;

use bitflags::bitflags;

/// Short codes in week order.
pub const DAY_CODES: [&str; 7] = ["M", "T", "W", "TH", "F", "S", "SU"];

/// Display names in week order.
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct DaySet: u8 {
        const MONDAY =    0b1 << 7;
        const TUESDAY =   0b1 << 6;
        const WEDNESDAY = 0b1 << 5;
        const THURSDAY =  0b1 << 4;
        const FRIDAY =    0b1 << 3;
        const SATURDAY =  0b1 << 2;
        const SUNDAY =    0b1 << 1;

        const WEEKDAYS = 0b11111 << 3;
        const WEEKEND = 0b11 << 1;
    }
}

impl DaySet {
    /// The single-day set for `index` (Monday = 0).
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a weekday index.
    pub fn day(index: usize) -> Self {
        assert!(index < 7, "weekday index out of range: {index}");
        Self::from_bits_retain(1 << (7 - index))
    }

    /// Rebuilds a set from its weight; `None` for zero or stray bits.
    pub fn from_weight(weight: u8) -> Option<Self> {
        Self::from_bits(weight).filter(|days| !days.is_empty())
    }

    pub fn weight(self) -> u8 {
        self.bits()
    }

    /// Iterates the contained days as `(index, code)`, Monday first.
    pub fn atomic_days(self) -> AtomicDays {
        AtomicDays {
            days: self,
            next: 0,
        }
    }

    /// Concatenated code, e.g. `MTWTHF`.
    pub fn code(self) -> String {
        self.atomic_days().map(|(_, code)| code).collect()
    }

    pub fn display_name(self) -> String {
        let names: Vec<&str> = self.atomic_days().map(|(i, _)| DAY_NAMES[i]).collect();
        match names.as_slice() {
            [] => String::new(),
            [single] => single.to_string(),
            [first, .., last] if names.len() > 2 && self.is_contiguous() => {
                format!("{first} to {last}")
            }
            [init @ .., penultimate, last] => {
                let mut parts: Vec<String> = init.iter().map(|name| name.to_string()).collect();
                parts.push(format!("{penultimate} and {last}"));
                parts.join(", ")
            }
        }
    }

    /// True when the days form one unbroken run within Monday..Sunday.
    pub fn is_contiguous(self) -> bool {
        let indices: Vec<usize> = self.atomic_days().map(|(i, _)| i).collect();
        indices.windows(2).all(|pair| pair[1] == pair[0] + 1)
    }
}

/// Lazy, restartable walk over the days of a [`DaySet`].
#[derive(Debug, Clone)]
pub struct AtomicDays {
    days: DaySet,
    next: usize,
}

impl Iterator for AtomicDays {
    type Item = (usize, &'static str);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < DAY_CODES.len() {
            let index = self.next;
            self.next += 1;
            if self.days.contains(DaySet::day(index)) {
                return Some((index, DAY_CODES[index]));
            }
        }
        None
    }
}

/// A resolved day code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCombination {
    pub days: DaySet,
    pub name: String,
}

impl DayCombination {
    pub fn weight(&self) -> u8 {
        self.days.weight()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown day set {code:?}")]
pub struct UnknownDaySet {
    pub code: String,
}

static COMBINATIONS: LazyLock<HashMap<String, DayCombination>> = LazyLock::new(build_combinations);

fn build_combinations() -> HashMap<String, DayCombination> {
    let mut table = HashMap::new();
    for mask in 1u8..(1 << 7) {
        let days = (0..7)
            .filter(|i| mask & (1 << i) != 0)
            .fold(DaySet::empty(), |acc, i| acc | DaySet::day(i));
        let combination = DayCombination {
            days,
            name: days.display_name(),
        };
        let indices: Vec<usize> = days.atomic_days().map(|(i, _)| i).collect();
        if indices.len() > 2 && days.is_contiguous() {
            let range = format!(
                "{}-{}",
                DAY_CODES[indices[0]],
                DAY_CODES[indices[indices.len() - 1]]
            );
            table.insert(range, combination.clone());
        }
        table.insert(days.code(), combination);
    }
    table
}

fn normalize(code: &str) -> String {
    let mut text = format!(" {} ", code.to_uppercase()).replace(" AND ", " ");
    for (name, short) in DAY_NAMES.iter().zip(DAY_CODES) {
        text = text.replace(&name.to_uppercase(), short);
    }
    let mut normalized = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            c if c.is_whitespace() || c == ',' => {}
            '-' | '\u{2013}' | '\u{2014}' => {
                if !normalized.ends_with('-') {
                    normalized.push('-');
                }
            }
            c => normalized.push(c),
        }
    }
    normalized
}

/// Resolves a day code such as `M-F`, `MTWTHF` or `Monday - Friday`.
pub fn lookup(code: &str) -> Result<&'static DayCombination, UnknownDaySet> {
    COMBINATIONS
        .get(&normalize(code))
        .ok_or_else(|| UnknownDaySet {
            code: code.to_string(),
        })
}

/// Display name and weight of a day code.
pub fn name_and_weight(code: &str) -> Result<(&'static str, u8), UnknownDaySet> {
    let combination = lookup(code)?;
    Ok((combination.name.as_str(), combination.weight()))
}

/// Decomposes a day code into its single days, Monday first.
pub fn split_into_atomic_days(code: &str) -> Result<AtomicDays, UnknownDaySet> {
    Ok(lookup(code)?.days.atomic_days())
}
