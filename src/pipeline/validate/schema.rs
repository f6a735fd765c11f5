use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Letter grades used by the rankings, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    S,
    SMinus,
    APlus,
    A,
    AMinus,
    BPlus,
    B,
    BMinus,
    CPlus,
    C,
    CMinus,
    DPlus,
    D,
    DMinus,
    E,
    F,
}

impl Grade {
    pub const ALL: [Grade; 16] = [
        Grade::S,
        Grade::SMinus,
        Grade::APlus,
        Grade::A,
        Grade::AMinus,
        Grade::BPlus,
        Grade::B,
        Grade::BMinus,
        Grade::CPlus,
        Grade::C,
        Grade::CMinus,
        Grade::DPlus,
        Grade::D,
        Grade::DMinus,
        Grade::E,
        Grade::F,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::SMinus => "S-",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::DMinus => "D-",
            Grade::E => "E",
            Grade::F => "F",
        }
    }
}

impl FromStr for Grade {
    type Err = ViolationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or(ViolationKind::UnknownGrade)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed, constraint-checked field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Grade(Grade),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_grade(&self) -> Option<Grade> {
        match self {
            FieldValue::Grade(g) => Some(*g),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Grade(g) => write!(f, "{g}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(t) => f.write_str(t),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            other => serializer.collect_str(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    UnknownGrade,
    GlyphRating,
    NotANumber,
    Negative,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ViolationKind::UnknownGrade => "not one of the known grades",
            ViolationKind::GlyphRating => "glyph ratings are not accepted, use a number",
            ViolationKind::NotANumber => "not a number",
            ViolationKind::Negative => "must not be negative",
        };
        f.write_str(msg)
    }
}

pub type Parser = fn(&str) -> Result<FieldValue, ViolationKind>;
pub type Constraint = fn(&FieldValue) -> Result<(), ViolationKind>;

/// One row of the declarative schema table.
#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Display headers the source page uses for this field.
    pub aliases: &'static [&'static str],
    pub parse: Parser,
    pub constraint: Constraint,
}

impl FieldSpec {
    pub fn check(&self, raw: &str) -> Result<FieldValue, ViolationKind> {
        let value = (self.parse)(raw)?;
        (self.constraint)(&value)?;
        Ok(value)
    }

    fn matches(&self, column: &str) -> bool {
        let column = column.trim();
        self.name.eq_ignore_ascii_case(column)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(column))
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish()
    }
}

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("number regex should compile")
});

pub fn parse_text(raw: &str) -> Result<FieldValue, ViolationKind> {
    Ok(FieldValue::Text(raw.to_string()))
}

pub fn parse_grade(raw: &str) -> Result<FieldValue, ViolationKind> {
    raw.parse().map(FieldValue::Grade)
}

pub fn parse_number(raw: &str) -> Result<FieldValue, ViolationKind> {
    if !NUMBER_RE.is_match(raw) {
        return Err(ViolationKind::NotANumber);
    }
    match raw.parse::<f64>() {
        // overflowing exponents parse to infinity
        Ok(n) if n.is_finite() => Ok(FieldValue::Number(n)),
        _ => Err(ViolationKind::NotANumber),
    }
}

/// Accepts `$1,299.00` style prices as well as plain numbers.
pub fn parse_money(raw: &str) -> Result<FieldValue, ViolationKind> {
    let cleaned: String = raw
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    parse_number(&cleaned)
}

pub fn parse_rating(raw: &str) -> Result<FieldValue, ViolationKind> {
    if is_glyph_run(raw) {
        return Err(ViolationKind::GlyphRating);
    }
    parse_number(raw)
}

/// True for a run of one repeated symbol, like `★★★★`.
pub fn is_glyph_run(raw: &str) -> bool {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) if !first.is_alphanumeric() && !first.is_whitespace() => {
            chars.all(|c| c == first)
        }
        _ => false,
    }
}

pub fn unconstrained(_: &FieldValue) -> Result<(), ViolationKind> {
    Ok(())
}

pub fn non_negative(value: &FieldValue) -> Result<(), ViolationKind> {
    match value.as_number() {
        Some(n) if n < 0.0 => Err(ViolationKind::Negative),
        _ => Ok(()),
    }
}

const fn text(name: &'static str, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        name,
        aliases,
        parse: parse_text,
        constraint: unconstrained,
    }
}

const fn number(name: &'static str, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        name,
        aliases,
        parse: parse_number,
        constraint: unconstrained,
    }
}

/// The audio-equipment ranking record, in output column order.
pub static RANKING_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "rank",
        aliases: &["Rank"],
        parse: parse_grade,
        constraint: unconstrained,
    },
    FieldSpec {
        name: "value_rating",
        aliases: &["Value Rating"],
        parse: parse_rating,
        constraint: unconstrained,
    },
    text("model", &["Model"]),
    FieldSpec {
        name: "price_msrp",
        aliases: &["Price (MSRP)", "Price"],
        parse: parse_money,
        constraint: non_negative,
    },
    text("signature", &["Signature"]),
    text("comments", &["Comments"]),
    text("tone_grade", &["Tone Grade"]),
    text("technical_grade", &["Technical Grade"]),
    text("setup", &["Setup"]),
    text("status", &["Status"]),
    number("ranksort", &["Ranksort"]),
    number("tonesort", &["Tonesort"]),
    number("techsort", &["Techsort"]),
    number("pricesort", &["Pricesort"]),
];

/// Ordered set of fields a record is mapped onto.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn rankings() -> Self {
        Self::new(RANKING_FIELDS.to_vec())
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Maps a display column to its field, if any.
    pub fn resolve(&self, column: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.matches(column))
    }
}
