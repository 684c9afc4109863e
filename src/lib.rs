//! Single-field crontab expression parsing, matching, and formatting.
//!
//! Each [`Field`] is the compiled form of one crontab column (seconds,
//! minutes, hours, day of month, month, or day of week): a bit mask over
//! the column's valid value range, plus the occurrence (`#`) and step
//! metadata needed for calendar matching. Parsed fields are immutable and
//! can be shared freely across threads.
//!
//! # Example
//! ```
//! use cronfield::{Field, FieldKind};
//!
//! let minutes = Field::parse(FieldKind::Minute, "0/15").expect("valid expression");
//!
//! assert!(minutes.contains(30));
//! assert!(!minutes.contains(20));
//! assert_eq!(minutes.next(16), Some(30));
//! assert_eq!(minutes.to_string(), "0,15,30,45");
//! ```
//!
//! Named fields parse case-insensitive name prefixes and format back to
//! names; the alternate format flag renders them numerically:
//! ```
//! use cronfield::{Field, FieldKind};
//!
//! let months = Field::parse(FieldKind::Month, "jan-MAR").unwrap();
//! assert_eq!(months.to_string(), "January-March");
//! assert_eq!(format!("{:#}", months), "1-3");
//! ```

pub mod parse;

pub use crate::parse::{FieldKind, FieldSpec, InvalidKindError, ParseError, ParseErrorKind};

use chrono::{DateTime, Datelike, Duration, Months, Timelike, Utc};

use core::fmt::{self, Display, Formatter, Write};
use core::iter::FusedIterator;

use crate::parse::Clause;

/// A membership set for one crontab field, built by parsing an expression
/// against the field kind's [`FieldSpec`].
///
/// Construction via [`Field::parse`] is the only writer; afterwards the
/// set is read-only, so a parsed field may be shared between threads for
/// concurrent [`contains`](Field::contains) / [`next`](Field::next) /
/// [`matches`](Field::matches) calls without locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    spec: &'static FieldSpec,
    bits: u64,
    min_set: Option<u32>,
    max_set: Option<u32>,
    nth: u32,
    every: Option<u32>,
}

impl Field {
    /// A field with no values selected. Parsing an empty expression
    /// returns this.
    pub(crate) fn empty(spec: &'static FieldSpec) -> Self {
        Field {
            spec,
            bits: 0,
            min_set: None,
            max_set: None,
            nth: 0,
            every: None,
        }
    }

    /// Parses `expr` for the given field kind.
    ///
    /// # Example
    /// ```
    /// use cronfield::{Field, FieldKind};
    ///
    /// let field = Field::parse(FieldKind::Day, "1,3,5-7").unwrap();
    /// assert_eq!(field.iter().collect::<Vec<_>>(), vec![1, 3, 5, 6, 7]);
    ///
    /// let err = Field::parse(FieldKind::Minute, "60").unwrap_err();
    /// assert_eq!(
    ///     err.to_string(),
    ///     "invalid minutes field \"60\": 60 is above the field maximum of 59"
    /// );
    /// ```
    #[inline]
    pub fn parse(kind: FieldKind, expr: &str) -> Result<Self, ParseError> {
        kind.spec().parse(expr)
    }

    /// Parses `expr`, discarding the failure reason. The same diagnostic
    /// content is produced by the [`Field::parse`] error path; this
    /// wrapper only changes how failure is surfaced.
    #[inline]
    pub fn parse_opt(kind: FieldKind, expr: &str) -> Option<Self> {
        kind.spec().parse(expr).ok()
    }

    /// The kind of field this expression was parsed for.
    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.spec.kind()
    }

    /// The descriptor this field was parsed against.
    #[inline]
    pub fn spec(&self) -> &'static FieldSpec {
        self.spec
    }

    /// The 1-based "Nth weekday of the month" ordinal, if the expression
    /// carried a `#` suffix.
    #[inline]
    pub fn occurrence(&self) -> Option<u32> {
        (self.nth > 0).then_some(self.nth)
    }

    /// The step interval used by windowed matching, if the expression
    /// carried a step greater than one.
    #[inline]
    pub fn every(&self) -> Option<u32> {
        self.every
    }

    /// Folds one parsed clause into the membership set. This is the only
    /// mutator; it OR-combines across clauses of a list and keeps the
    /// extent cache consistent with the bits it sets.
    pub(crate) fn accumulate(&mut self, clause: Clause) -> Result<(), ParseErrorKind> {
        let spec = self.spec;
        if clause.nth > 0 && !spec.occurrence_allowed() {
            return Err(ParseErrorKind::OccurrenceNotAllowed(spec.kind()));
        }
        self.nth = clause.nth;
        self.every = if clause.step > 1 { Some(clause.step) } else { None };

        let step = clause.step.max(1);
        let (start, end) = match (clause.start, clause.end) {
            (None, None) if step <= 1 => {
                // A bare `*` selects everything at once.
                self.bits = Self::domain_bits(spec);
                self.min_set = Some(spec.min());
                self.max_set = Some(spec.max());
                return Ok(());
            }
            // A stepped wildcard walks the whole domain below.
            (None, None) => (spec.min(), spec.max()),
            (Some(start), Some(end)) => {
                // A reversed range reads ascending: 7-5 means 5-7.
                let (start, end) = if start > end { (end, start) } else { (start, end) };
                if start < spec.min() {
                    return Err(ParseErrorKind::BelowMinimum {
                        value: start,
                        min: spec.min(),
                    });
                }
                if end > spec.max() {
                    return Err(ParseErrorKind::AboveMaximum {
                        value: end,
                        max: spec.max(),
                    });
                }
                (start, end)
            }
            // The grammar always supplies both endpoints or neither.
            (Some(start), None) | (None, Some(start)) => (start, start),
        };

        let mut i = start;
        let mut last = start;
        while i <= end {
            self.bits |= 1u64 << (i - spec.min());
            last = i;
            i += step;
        }
        self.min_set = Some(self.min_set.map_or(start, |m| m.min(start)));
        // Stepping may overshoot `end`, so the extent tracks the last bit
        // actually set rather than the clause endpoint.
        self.max_set = Some(self.max_set.map_or(last, |m| m.max(last)));
        Ok(())
    }

    /// A mask with one bit set for every value in the spec's domain. The
    /// widest domain is 60 values, so a single word always fits.
    #[inline]
    fn domain_bits(spec: &FieldSpec) -> u64 {
        (1u64 << (spec.max() - spec.min() + 1)) - 1
    }

    /// Returns whether `value` is selected.
    ///
    /// `value` must lie within the field's `[min, max]` domain; this is an
    /// internal fast path shared with [`Field::matches`] and the bound is
    /// a caller contract, not a checked error.
    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        debug_assert!(
            value >= self.spec.min() && value <= self.spec.max(),
            "value {} out of range for the {} field",
            value,
            self.spec.kind(),
        );
        self.bits & (1u64 << (value - self.spec.min())) != 0
    }

    /// The smallest selected value, or `None` for an empty field.
    #[inline]
    pub fn first(&self) -> Option<u32> {
        self.min_set
    }

    /// The smallest selected value greater than or equal to `start`.
    ///
    /// Monotonic: repeatedly feeding back `last + 1` visits the selected
    /// values in strictly ascending order and ends with `None`, which is
    /// how [`Field::iter`] enumerates the set.
    pub fn next(&self, start: u32) -> Option<u32> {
        let min_set = self.min_set?;
        if start <= min_set {
            return Some(min_set);
        }
        let max_set = self.max_set?;
        if start > max_set {
            return None;
        }
        // Clear the bits below `start`, then count up to the first survivor.
        let index = start - self.spec.min();
        let cleared = (self.bits >> index) << index;
        let trailing = cleared.trailing_zeros();
        debug_assert!(trailing < u64::BITS, "extent cache out of sync with bits");
        Some(self.spec.min() + trailing)
    }

    /// Iterates over the selected values in ascending order.
    #[inline]
    pub fn iter(&self) -> Values<'_> {
        Values {
            field: self,
            next: Some(self.spec.min()),
        }
    }

    /// Extracts this field's component from `dt`. Day of week is 0
    /// (Sunday) through 6 (Saturday).
    fn component(&self, dt: DateTime<Utc>) -> u32 {
        match self.spec.kind() {
            FieldKind::Second => dt.second(),
            FieldKind::Minute => dt.minute(),
            FieldKind::Hour => dt.hour(),
            FieldKind::Day => dt.day(),
            FieldKind::Month => dt.month(),
            FieldKind::DayOfWeek => dt.weekday().num_days_from_sunday(),
        }
    }

    /// Returns whether `dt`'s component for this field is selected,
    /// honoring an `#` occurrence constraint when one was parsed.
    ///
    /// # Example
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use cronfield::{Field, FieldKind};
    ///
    /// // The second Friday of the month.
    /// let dow = Field::parse(FieldKind::DayOfWeek, "Fri#2").unwrap();
    /// assert!(dow.matches(Utc.with_ymd_and_hms(2021, 1, 8, 0, 0, 0).unwrap()));
    /// assert!(!dow.matches(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()));
    /// ```
    pub fn matches(&self, dt: DateTime<Utc>) -> bool {
        if !self.contains(self.component(dt)) {
            return false;
        }
        // day0 / 7 is the zero-based ordinal of the weekday within its month
        self.nth == 0 || dt.day0() / 7 + 1 == self.nth
    }

    /// Matches `dt` against the stepped window anchored at `window_start`.
    ///
    /// Walks the step lattice `window_start + k * every` field units
    /// (seconds, minutes, hours, days, months, or weeks for day-of-week)
    /// to the latest anchor at or before `dt`, and reports whether that
    /// anchor's field component equals `dt`'s. Falls back to
    /// [`Field::matches`] when the field has no step interval. The `#`
    /// occurrence constraint is not consulted on this path.
    pub fn matches_in_window(&self, window_start: DateTime<Utc>, dt: DateTime<Utc>) -> bool {
        let every = match self.every {
            Some(every) => every,
            None => return self.matches(dt),
        };
        let mut anchor = window_start;
        while anchor <= dt {
            anchor = match self.advance(anchor, every) {
                Some(next) => next,
                None => return false,
            };
        }
        match self.retreat(anchor, every) {
            Some(anchor) => self.component(anchor) == self.component(dt),
            None => false,
        }
    }

    /// Moves `dt` forward by `count` of this field's calendar units.
    fn advance(&self, dt: DateTime<Utc>, count: u32) -> Option<DateTime<Utc>> {
        match self.spec.kind() {
            FieldKind::Second => dt.checked_add_signed(Duration::seconds(count as i64)),
            FieldKind::Minute => dt.checked_add_signed(Duration::minutes(count as i64)),
            FieldKind::Hour => dt.checked_add_signed(Duration::hours(count as i64)),
            FieldKind::Day => dt.checked_add_signed(Duration::days(count as i64)),
            FieldKind::Month => dt.checked_add_months(Months::new(count)),
            FieldKind::DayOfWeek => dt.checked_add_signed(Duration::days(7 * count as i64)),
        }
    }

    /// Moves `dt` backward by `count` of this field's calendar units.
    fn retreat(&self, dt: DateTime<Utc>, count: u32) -> Option<DateTime<Utc>> {
        match self.spec.kind() {
            FieldKind::Second => dt.checked_sub_signed(Duration::seconds(count as i64)),
            FieldKind::Minute => dt.checked_sub_signed(Duration::minutes(count as i64)),
            FieldKind::Hour => dt.checked_sub_signed(Duration::hours(count as i64)),
            FieldKind::Day => dt.checked_sub_signed(Duration::days(count as i64)),
            FieldKind::Month => dt.checked_sub_months(Months::new(count)),
            FieldKind::DayOfWeek => dt.checked_sub_signed(Duration::days(7 * count as i64)),
        }
    }

    /// Writes the canonical text for this field: `*` for full coverage,
    /// otherwise comma-joined values and ranges of consecutive values.
    /// Names are used for named fields unless `suppress_names` is set.
    /// An empty field writes nothing.
    pub fn format_into<W: Write>(&self, w: &mut W, suppress_names: bool) -> fmt::Result {
        let mut values = self.iter();
        let first = match values.next() {
            Some(first) => first,
            None => return Ok(()),
        };

        let mut run_start = first;
        let mut run_end = first;
        let mut first_run = true;

        for value in values {
            if value == run_end + 1 {
                run_end = value;
                continue;
            }
            self.write_run(w, run_start, run_end, first_run, suppress_names)?;
            first_run = false;
            run_start = value;
            run_end = value;
        }

        // A single run covering the whole domain collapses to a bare `*`.
        if first_run && run_start == self.spec.min() && run_end == self.spec.max() {
            return w.write_char('*');
        }
        self.write_run(w, run_start, run_end, first_run, suppress_names)
    }

    fn write_run<W: Write>(
        &self,
        w: &mut W,
        start: u32,
        end: u32,
        first: bool,
        suppress_names: bool,
    ) -> fmt::Result {
        if !first {
            w.write_char(',')?;
        }
        self.write_value(w, start, suppress_names)?;
        if end != start {
            w.write_char('-')?;
            self.write_value(w, end, suppress_names)?;
        }
        Ok(())
    }

    fn write_value<W: Write>(&self, w: &mut W, value: u32, suppress_names: bool) -> fmt::Result {
        match self.spec.names().filter(|_| !suppress_names) {
            Some(names) => w.write_str(names[(value - self.spec.min()) as usize]),
            None => write!(w, "{}", value),
        }
    }
}

/// Formats the canonical expression text. The alternate flag (`{:#}`)
/// suppresses names and renders every value numerically.
impl Display for Field {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.format_into(f, f.alternate())
    }
}

/// An ascending iterator over the values selected in a [`Field`], created
/// with [`Field::iter`].
#[derive(Debug, Clone)]
pub struct Values<'a> {
    field: &'a Field,
    next: Option<u32>,
}

impl Iterator for Values<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let start = self.next?;
        match self.field.next(start) {
            Some(value) => {
                self.next = Some(value + 1);
                Some(value)
            }
            None => {
                self.next = None;
                None
            }
        }
    }
}

impl FusedIterator for Values<'_> {}
