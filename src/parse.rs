//! Field kinds, per-kind descriptors, and the expression grammar.
//!
//! A [`FieldSpec`] describes the valid value range of one crontab column,
//! its optional display names, and whether the `#` occurrence suffix is
//! permitted. [`FieldSpec::parse`] drives the grammar over an expression
//! string, folding each comma-delimited clause into a
//! [`Field`](crate::Field).

use core::fmt::{self, Display, Formatter};
use core::num::ParseIntError;

use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{map_res, opt},
    error::{ErrorKind as NomErrorKind, FromExternalError, ParseError as NomParseError},
    Err, IResult,
};
use thiserror::Error;

use crate::Field;

/// Identifies one column of a crontab schedule expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    DayOfWeek,
}

impl FieldKind {
    /// All six kinds, in crontab column order.
    pub const ALL: [FieldKind; 6] = [
        FieldKind::Second,
        FieldKind::Minute,
        FieldKind::Hour,
        FieldKind::Day,
        FieldKind::Month,
        FieldKind::DayOfWeek,
    ];

    /// Returns the shared descriptor for this kind.
    #[inline]
    pub fn spec(self) -> &'static FieldSpec {
        match self {
            FieldKind::Second => &SECONDS,
            FieldKind::Minute => &MINUTES,
            FieldKind::Hour => &HOURS,
            FieldKind::Day => &DAYS,
            FieldKind::Month => &MONTHS,
            FieldKind::DayOfWeek => &DAYS_OF_WEEK,
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            FieldKind::Second => "seconds",
            FieldKind::Minute => "minutes",
            FieldKind::Hour => "hours",
            FieldKind::Day => "days of the month",
            FieldKind::Month => "months",
            FieldKind::DayOfWeek => "days of the week",
        };
        name.fmt(f)
    }
}

/// An error returned when a numeric tag doesn't map to a field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is not a valid field kind index")]
pub struct InvalidKindError(pub u8);

impl TryFrom<u8> for FieldKind {
    type Error = InvalidKindError;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => FieldKind::Second,
            1 => FieldKind::Minute,
            2 => FieldKind::Hour,
            3 => FieldKind::Day,
            4 => FieldKind::Month,
            5 => FieldKind::DayOfWeek,
            _ => return Err(InvalidKindError(value)),
        })
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_OF_WEEK_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// A per-kind field descriptor: the inclusive value range, the optional
/// display-name table, and whether `#` occurrence syntax is permitted.
///
/// Exactly six instances exist, one per [`FieldKind`], all `'static`.
/// Obtain one with [`FieldKind::spec`].
#[derive(Debug, PartialEq, Eq)]
pub struct FieldSpec {
    kind: FieldKind,
    min: u32,
    max: u32,
    names: Option<&'static [&'static str]>,
    occurrence_allowed: bool,
}

static SECONDS: FieldSpec = FieldSpec {
    kind: FieldKind::Second,
    min: 0,
    max: 59,
    names: None,
    occurrence_allowed: false,
};

static MINUTES: FieldSpec = FieldSpec {
    kind: FieldKind::Minute,
    min: 0,
    max: 59,
    names: None,
    occurrence_allowed: false,
};

static HOURS: FieldSpec = FieldSpec {
    kind: FieldKind::Hour,
    min: 0,
    max: 23,
    names: None,
    occurrence_allowed: false,
};

static DAYS: FieldSpec = FieldSpec {
    kind: FieldKind::Day,
    min: 1,
    max: 31,
    names: None,
    occurrence_allowed: false,
};

static MONTHS: FieldSpec = FieldSpec {
    kind: FieldKind::Month,
    min: 1,
    max: 12,
    names: Some(&MONTH_NAMES),
    occurrence_allowed: false,
};

static DAYS_OF_WEEK: FieldSpec = FieldSpec {
    kind: FieldKind::DayOfWeek,
    min: 0,
    max: 6,
    names: Some(&DAY_OF_WEEK_NAMES),
    occurrence_allowed: true,
};

impl FieldSpec {
    /// The kind this descriptor belongs to.
    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The smallest valid value for the field.
    #[inline]
    pub fn min(&self) -> u32 {
        self.min
    }

    /// The largest valid value for the field.
    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    /// The display-name table, aligned so `names[i]` denotes value
    /// `min + i`. Present for months and days of the week only.
    #[inline]
    pub fn names(&self) -> Option<&'static [&'static str]> {
        self.names
    }

    /// Whether the `#` occurrence suffix is permitted for this field.
    #[inline]
    pub fn occurrence_allowed(&self) -> bool {
        self.occurrence_allowed
    }

    /// Parses an expression against this descriptor into a [`Field`].
    ///
    /// An empty expression is a documented success case and yields a field
    /// with no values selected. Any clause failure fails the whole parse;
    /// a partially-accumulated field is never returned.
    pub fn parse(&'static self, expr: &str) -> Result<Field, ParseError> {
        let mut field = Field::empty(self);
        if expr.is_empty() {
            return Ok(field);
        }
        parse_into(self, expr, &mut field).map_err(|source| ParseError {
            kind: self.kind,
            expr: expr.to_owned(),
            source,
        })?;
        Ok(field)
    }
}

/// The reason a field expression failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The expression, or one comma-delimited token inside it, was empty.
    #[error("the value is empty")]
    Empty,
    /// A token was neither a representable number nor a name.
    #[error("\"{0}\" is not a valid field value")]
    InvalidValue(String),
    /// A name token matched no entry in the field's name table, or the
    /// field has no name table.
    #[error("\"{0}\" is not a known name for this field")]
    UnknownName(String),
    /// An explicit numeric endpoint below the field minimum.
    #[error("{value} is below the field minimum of {min}")]
    BelowMinimum { value: u32, min: u32 },
    /// An explicit numeric endpoint above the field maximum.
    #[error("{value} is above the field maximum of {max}")]
    AboveMaximum { value: u32, max: u32 },
    /// A `#` suffix on a field kind that forbids it.
    #[error("the '#' occurrence suffix is not allowed in the {0} field")]
    OccurrenceNotAllowed(FieldKind),
}

/// An error produced when a field expression can't be parsed, carrying the
/// offending expression and the field kind it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} field \"{expr}\": {source}")]
pub struct ParseError {
    kind: FieldKind,
    expr: String,
    source: ParseErrorKind,
}

impl ParseError {
    /// The kind of the field being parsed.
    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The expression that failed to parse.
    #[inline]
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// The underlying reason.
    #[inline]
    pub fn reason(&self) -> &ParseErrorKind {
        &self.source
    }
}

/// The leading characters of `input` up to the next list separator, used
/// to quote the offending token in error messages.
fn clause_token(input: &str) -> &str {
    input.split(',').next().unwrap_or(input)
}

impl<'a> NomParseError<&'a str> for ParseErrorKind {
    fn from_error_kind(input: &'a str, _kind: NomErrorKind) -> Self {
        if input.is_empty() {
            ParseErrorKind::Empty
        } else {
            ParseErrorKind::InvalidValue(clause_token(input).to_owned())
        }
    }

    fn append(_input: &'a str, _kind: NomErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> FromExternalError<&'a str, ParseIntError> for ParseErrorKind {
    fn from_external_error(input: &'a str, _kind: NomErrorKind, _e: ParseIntError) -> Self {
        ParseErrorKind::InvalidValue(clause_token(input).to_owned())
    }
}

type ClauseResult<'a, T> = IResult<&'a str, T, ParseErrorKind>;

/// One comma-delimited clause reduced to the accumulator's argument shape.
/// `None` endpoints are the full-range sentinel produced by `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Clause {
    pub(crate) start: Option<u32>,
    pub(crate) end: Option<u32>,
    pub(crate) step: u32,
    pub(crate) nth: u32,
}

fn number(input: &str) -> ClauseResult<u32> {
    map_res(digit1, |s: &str| s.parse::<u32>())(input)
}

/// Parses a single endpoint value: a base-10 integer if the token starts
/// with a digit, otherwise a case-insensitive prefix of one of the field's
/// display names (first match wins).
fn value<'a>(spec: &'static FieldSpec, input: &'a str) -> ClauseResult<'a, u32> {
    match input.chars().next() {
        Some(c) if c.is_ascii_digit() => number(input),
        Some(c) if c.is_ascii_alphabetic() => {
            let len = input
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(input.len());
            let (word, rest) = input.split_at(len);
            let names = match spec.names {
                Some(names) => names,
                None => return Err(Err::Failure(ParseErrorKind::UnknownName(word.to_owned()))),
            };
            let found = names.iter().position(|name| {
                name.len() >= word.len() && name[..word.len()].eq_ignore_ascii_case(word)
            });
            match found {
                Some(index) => Ok((rest, spec.min + index as u32)),
                None => Err(Err::Failure(ParseErrorKind::UnknownName(word.to_owned()))),
            }
        }
        Some(',') | None => Err(Err::Failure(ParseErrorKind::Empty)),
        Some(_) => Err(Err::Failure(ParseErrorKind::InvalidValue(
            clause_token(input).to_owned(),
        ))),
    }
}

enum Suffix {
    Step(u32),
    Nth(u32),
}

/// Parses one optional `/step` or `#occurrence` suffix.
fn suffix(input: &str) -> ClauseResult<Option<Suffix>> {
    let (input, sep) = opt(alt((char('/'), char('#'))))(input)?;
    match sep {
        Some('/') => {
            let (input, n) = number(input)?;
            Ok((input, Some(Suffix::Step(n))))
        }
        Some('#') => {
            let (input, n) = number(input)?;
            Ok((input, Some(Suffix::Nth(n))))
        }
        _ => Ok((input, None)),
    }
}

/// Parses one clause: a base (`*`, value, or range) followed by step and
/// occurrence suffixes, each at most once, in either order.
fn clause<'a>(spec: &'static FieldSpec, input: &'a str) -> ClauseResult<'a, Clause> {
    let whole = input;

    let (input, star) = opt(char('*'))(input)?;
    let (mut input, start, end) = if star.is_some() {
        (input, None, None)
    } else {
        let (input, start) = value(spec, input)?;
        let (input, dash) = opt(char('-'))(input)?;
        if dash.is_some() {
            let (input, end) = value(spec, input)?;
            (input, Some(start), Some(end))
        } else {
            (input, Some(start), None)
        }
    };

    let mut step = None;
    let mut nth = None;
    loop {
        let (rest, sfx) = suffix(input)?;
        input = rest;
        match sfx {
            Some(Suffix::Step(n)) if step.is_none() => step = Some(n),
            Some(Suffix::Nth(n)) if nth.is_none() => nth = Some(n),
            Some(_) => {
                return Err(Err::Failure(ParseErrorKind::InvalidValue(
                    clause_token(whole).to_owned(),
                )))
            }
            None => break,
        }
    }

    let nth = nth.unwrap_or(0);
    if nth > 0 && !spec.occurrence_allowed {
        return Err(Err::Failure(ParseErrorKind::OccurrenceNotAllowed(spec.kind)));
    }

    let step = step.unwrap_or(1);
    // A bare `V/N` means every Nth value from V through the field maximum.
    let end = match (start, end) {
        (Some(_), None) if step > 1 => Some(spec.max),
        (Some(s), None) => Some(s),
        (_, end) => end,
    };

    Ok((input, Clause { start, end, step, nth }))
}

/// Drives the list grammar over `expr`, folding each clause into `field`
/// through its accumulator. Fails on the first bad clause.
pub(crate) fn parse_into(
    spec: &'static FieldSpec,
    expr: &str,
    field: &mut Field,
) -> Result<(), ParseErrorKind> {
    let mut input = expr;
    loop {
        let (rest, parsed) = clause(spec, input).map_err(unwrap_nom)?;
        field.accumulate(parsed)?;
        match rest.strip_prefix(',') {
            Some(tail) => input = tail,
            None if rest.is_empty() => return Ok(()),
            None => return Err(ParseErrorKind::InvalidValue(clause_token(rest).to_owned())),
        }
    }
}

fn unwrap_nom(err: Err<ParseErrorKind>) -> ParseErrorKind {
    match err {
        Err::Error(e) | Err::Failure(e) => e,
        Err::Incomplete(_) => ParseErrorKind::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(start: u32, end: u32) -> Clause {
        Clause {
            start: Some(start),
            end: Some(end),
            step: 1,
            nth: 0,
        }
    }

    fn parsed<'a>(spec: &'static FieldSpec, input: &'a str) -> (&'a str, Clause) {
        clause(spec, input).expect("clause should parse")
    }

    fn failed(spec: &'static FieldSpec, input: &str) -> ParseErrorKind {
        unwrap_nom(clause(spec, input).expect_err("clause should fail"))
    }

    #[test]
    fn wildcard() {
        assert_eq!(
            parsed(FieldKind::Minute.spec(), "*"),
            (
                "",
                Clause {
                    start: None,
                    end: None,
                    step: 1,
                    nth: 0
                }
            )
        );
    }

    #[test]
    fn wildcard_step() {
        assert_eq!(
            parsed(FieldKind::Minute.spec(), "*/15"),
            (
                "",
                Clause {
                    start: None,
                    end: None,
                    step: 15,
                    nth: 0
                }
            )
        );
    }

    #[test]
    fn single_value() {
        assert_eq!(parsed(FieldKind::Hour.spec(), "7"), ("", c(7, 7)));
    }

    #[test]
    fn range() {
        assert_eq!(parsed(FieldKind::Hour.spec(), "9-17"), ("", c(9, 17)));
    }

    #[test]
    fn value_with_step_runs_to_max() {
        assert_eq!(
            parsed(FieldKind::Hour.spec(), "5/10"),
            (
                "",
                Clause {
                    start: Some(5),
                    end: Some(23),
                    step: 10,
                    nth: 0
                }
            )
        );
    }

    #[test]
    fn value_with_unit_step_stays_single() {
        assert_eq!(
            parsed(FieldKind::Hour.spec(), "5/1"),
            (
                "",
                Clause {
                    start: Some(5),
                    end: Some(5),
                    step: 1,
                    nth: 0
                }
            )
        );
    }

    #[test]
    fn range_with_step() {
        assert_eq!(
            parsed(FieldKind::Minute.spec(), "10-40/5"),
            (
                "",
                Clause {
                    start: Some(10),
                    end: Some(40),
                    step: 5,
                    nth: 0
                }
            )
        );
    }

    #[test]
    fn clause_stops_at_comma() {
        assert_eq!(parsed(FieldKind::Hour.spec(), "3,4"), (",4", c(3, 3)));
    }

    #[test]
    fn month_name_prefixes() {
        let spec = FieldKind::Month.spec();
        assert_eq!(parsed(spec, "Jan"), ("", c(1, 1)));
        assert_eq!(parsed(spec, "january"), ("", c(1, 1)));
        assert_eq!(parsed(spec, "SEP-nov"), ("", c(9, 11)));
        // "Ma" matches March before May; the first prefix match wins.
        assert_eq!(parsed(spec, "Ma"), ("", c(3, 3)));
    }

    #[test]
    fn day_of_week_occurrence_either_suffix_order() {
        let spec = FieldKind::DayOfWeek.spec();
        let expected = Clause {
            start: Some(5),
            end: Some(6),
            step: 2,
            nth: 3,
        };
        assert_eq!(parsed(spec, "FRI#3/2"), ("", expected));
        assert_eq!(parsed(spec, "FRI/2#3"), ("", expected));
    }

    #[test]
    fn occurrence_rejected_outside_day_of_week() {
        assert_eq!(
            failed(FieldKind::Hour.spec(), "1#2"),
            ParseErrorKind::OccurrenceNotAllowed(FieldKind::Hour)
        );
    }

    #[test]
    fn duplicate_suffix_rejected() {
        assert_eq!(
            failed(FieldKind::Minute.spec(), "1/2/3"),
            ParseErrorKind::InvalidValue("1/2/3".to_owned())
        );
        assert_eq!(
            failed(FieldKind::DayOfWeek.spec(), "1#2#3"),
            ParseErrorKind::InvalidValue("1#2#3".to_owned())
        );
    }

    #[test]
    fn unknown_name() {
        assert_eq!(
            failed(FieldKind::Month.spec(), "Zz"),
            ParseErrorKind::UnknownName("Zz".to_owned())
        );
    }

    #[test]
    fn name_on_numeric_field() {
        assert_eq!(
            failed(FieldKind::Minute.spec(), "Jan"),
            ParseErrorKind::UnknownName("Jan".to_owned())
        );
    }

    #[test]
    fn negative_literal_is_not_a_sentinel() {
        assert_eq!(
            failed(FieldKind::Minute.spec(), "-1"),
            ParseErrorKind::InvalidValue("-1".to_owned())
        );
    }

    #[test]
    fn empty_token() {
        assert_eq!(failed(FieldKind::Minute.spec(), ""), ParseErrorKind::Empty);
        assert_eq!(failed(FieldKind::Minute.spec(), ",5"), ParseErrorKind::Empty);
    }

    #[test]
    fn unparseable_number() {
        assert_eq!(
            failed(FieldKind::Minute.spec(), "99999999999999"),
            ParseErrorKind::InvalidValue("99999999999999".to_owned())
        );
    }

    #[test]
    fn kind_from_index() {
        assert_eq!(FieldKind::try_from(0), Ok(FieldKind::Second));
        assert_eq!(FieldKind::try_from(5), Ok(FieldKind::DayOfWeek));
        assert_eq!(FieldKind::try_from(6), Err(InvalidKindError(6)));
    }

    #[test]
    fn specs_are_well_formed() {
        for kind in FieldKind::ALL {
            let spec = kind.spec();
            assert_eq!(spec.kind(), kind);
            assert!(spec.min() <= spec.max());
            if let Some(names) = spec.names() {
                assert_eq!(names.len() as u32, spec.max() - spec.min() + 1);
            }
            assert_eq!(spec.occurrence_allowed(), kind == FieldKind::DayOfWeek);
        }
    }
}
