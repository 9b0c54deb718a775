//! Semester determination.
//!
//! Semester `A` runs from 2 February to 1 August and `B` from 2 August to
//! 1 February of the following year, labelled with the year it started.
//! A handful of semesters were stretched or shortened at individual
//! telescopes; those are listed in [`OVERRIDES`] and take precedence.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{OmpError, OmpResult};
use crate::models::Telescope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SemesterHalf {
    A,
    B,
}

/// A semester such as `03B`. `year` is the full calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Semester {
    pub year: i32,
    pub half: SemesterHalf,
}

impl Semester {
    pub fn new(year: i32, half: SemesterHalf) -> Self {
        Self { year, half }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let half = match self.half {
            SemesterHalf::A => 'A',
            SemesterHalf::B => 'B',
        };
        write!(f, "{:02}{}", self.year.rem_euclid(100), half)
    }
}

impl FromStr for Semester {
    type Err = OmpError;

    /// Accepts `03B`, `2003B` and lower-case halves. Two-digit years from 90
    /// upwards are taken to be in the 1900s.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bad = || OmpError::bad_args(format!("Unrecognised semester '{}'", s));
        if !trimmed.is_ascii() {
            return Err(bad());
        }

        let (digits, half) = trimmed.split_at(trimmed.len().saturating_sub(1));
        let half = match half {
            "A" | "a" => SemesterHalf::A,
            "B" | "b" => SemesterHalf::B,
            _ => return Err(bad()),
        };
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let year = match digits.len() {
            2 => {
                let yy: i32 = digits.parse().map_err(|_| bad())?;
                if yy >= 90 {
                    1900 + yy
                } else {
                    2000 + yy
                }
            }
            4 => digits.parse().map_err(|_| bad())?,
            _ => return Err(bad()),
        };
        Ok(Semester { year, half })
    }
}

impl TryFrom<String> for Semester {
    type Error = OmpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Semester> for String {
    fn from(semester: Semester) -> Self {
        semester.to_string()
    }
}

struct SemesterOverride {
    telescope: Telescope,
    semester: (i32, SemesterHalf),
    first: (i32, u32, u32),
    last: (i32, u32, u32),
}

/// Telescope-specific semesters whose boundaries differ from the standard rule.
/// UKIRT 03B ran on until WFCAM commissioning.
const OVERRIDES: &[SemesterOverride] = &[
    SemesterOverride {
        telescope: Telescope::Ukirt,
        semester: (2003, SemesterHalf::B),
        first: (2003, 8, 2),
        last: (2004, 2, 16),
    },
    SemesterOverride {
        telescope: Telescope::Ukirt,
        semester: (2004, SemesterHalf::A),
        first: (2004, 2, 17),
        last: (2004, 8, 1),
    },
];

fn ymd((y, m, d): (i32, u32, u32)) -> OmpResult<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| OmpError::Fatal(format!("invalid calendar date {}-{}-{}", y, m, d)))
}

fn override_bounds(o: &SemesterOverride) -> OmpResult<(NaiveDate, NaiveDate)> {
    Ok((ymd(o.first)?, ymd(o.last)?))
}

/// Semester a UT date belongs to at `telescope`.
pub fn determine_semester(date: NaiveDate, telescope: Telescope) -> Semester {
    for o in OVERRIDES.iter().filter(|o| o.telescope == telescope) {
        if let Ok((first, last)) = override_bounds(o) {
            if first <= date && date <= last {
                return Semester::new(o.semester.0, o.semester.1);
            }
        }
    }

    let md = (date.month(), date.day());
    if md < (2, 2) {
        Semester::new(date.year() - 1, SemesterHalf::B)
    } else if md < (8, 2) {
        Semester::new(date.year(), SemesterHalf::A)
    } else {
        Semester::new(date.year(), SemesterHalf::B)
    }
}

/// First and last UT date (both inclusive) of `semester` at `telescope`.
pub fn semester_boundary(semester: Semester, telescope: Telescope) -> OmpResult<(NaiveDate, NaiveDate)> {
    if let Some(o) = OVERRIDES
        .iter()
        .find(|o| o.telescope == telescope && o.semester == (semester.year, semester.half))
    {
        return override_bounds(o);
    }

    match semester.half {
        SemesterHalf::A => Ok((ymd((semester.year, 2, 2))?, ymd((semester.year, 8, 1))?)),
        SemesterHalf::B => Ok((ymd((semester.year, 8, 2))?, ymd((semester.year + 1, 2, 1))?)),
    }
}
