//! Conditions: typed predicates over a single file attribute.

use crate::error::{Result, SortError};
use crate::record::FileRecord;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The file attribute a condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionAttribute {
    Name,
    Extension,
    Size,
    DateCreated,
    DateModified,
}

impl ConditionAttribute {
    /// Returns the persisted key for this attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Extension => "extension",
            Self::Size => "size",
            Self::DateCreated => "dateCreated",
            Self::DateModified => "dateModified",
        }
    }

    /// Returns the attribute as it reads in a sentence.
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Extension => "extension",
            Self::Size => "size",
            Self::DateCreated => "date created",
            Self::DateModified => "date modified",
        }
    }

    /// Returns true for attributes compared as text.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Name | Self::Extension)
    }

    fn expected_type(&self) -> &'static str {
        match self {
            Self::Name | Self::Extension => "string",
            Self::Size => "number",
            Self::DateCreated | Self::DateModified => "timestamp",
        }
    }
}

impl FromStr for ConditionAttribute {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(Self::Name),
            "extension" => Ok(Self::Extension),
            "size" => Ok(Self::Size),
            "dateCreated" => Ok(Self::DateCreated),
            "dateModified" => Ok(Self::DateModified),
            other => Err(SortError::InvalidAttribute(other.to_string())),
        }
    }
}

impl fmt::Display for ConditionAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison and containment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConditionOperator {
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Equals,
    NotEquals,
    /// Case-insensitive substring test.
    Includes,
    /// Negated [`ConditionOperator::Includes`].
    Excludes,
}

impl ConditionOperator {
    /// Returns the operator's symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::Includes => "includes",
            Self::Excludes => "excludes",
        }
    }

    /// Returns the operator as it reads in a sentence.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::GreaterThan => "is greater than",
            Self::LessThan => "is less than",
            Self::GreaterOrEqual => "is greater or equal to",
            Self::LessOrEqual => "is less or equal to",
            Self::Equals => "is equal to",
            Self::NotEquals => "is not equal to",
            Self::Includes => "contains",
            Self::Excludes => "does not contain",
        }
    }

    /// Returns true for the substring operators.
    pub fn is_containment(&self) -> bool {
        matches!(self, Self::Includes | Self::Excludes)
    }

    fn compare<T: PartialOrd + ?Sized>(&self, left: &T, right: &T) -> Result<bool> {
        match self {
            Self::GreaterThan => Ok(left > right),
            Self::LessThan => Ok(left < right),
            Self::GreaterOrEqual => Ok(left >= right),
            Self::LessOrEqual => Ok(left <= right),
            Self::Equals => Ok(left == right),
            Self::NotEquals => Ok(left != right),
            Self::Includes | Self::Excludes => {
                Err(SortError::InvalidOperator(self.symbol().to_string()))
            }
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ">" => Ok(Self::GreaterThan),
            "<" => Ok(Self::LessThan),
            ">=" => Ok(Self::GreaterOrEqual),
            "<=" => Ok(Self::LessOrEqual),
            "==" => Ok(Self::Equals),
            "!=" => Ok(Self::NotEquals),
            "includes" => Ok(Self::Includes),
            "excludes" => Ok(Self::Excludes),
            other => Err(SortError::InvalidOperator(other.to_string())),
        }
    }
}

impl TryFrom<String> for ConditionOperator {
    type Error = SortError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ConditionOperator> for String {
    fn from(op: ConditionOperator) -> Self {
        op.symbol().to_string()
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The right-hand side of a condition.
///
/// Timestamps are written as RFC 3339 strings. When a condition is decoded,
/// a string only becomes a timestamp for the date attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Timestamp(DateTime<Local>),
    Text(String),
}

impl ConditionValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Timestamp(_) => "timestamp",
            Self::Text(_) => "string",
        }
    }

    fn fits(&self, attribute: ConditionAttribute) -> bool {
        matches!(
            (attribute, self),
            (ConditionAttribute::Name | ConditionAttribute::Extension, Self::Text(_))
                | (ConditionAttribute::Size, Self::Number(_))
                | (
                    ConditionAttribute::DateCreated | ConditionAttribute::DateModified,
                    Self::Timestamp(_)
                )
        )
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for ConditionValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u64> for ConditionValue {
    fn from(n: u64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<DateTime<Local>> for ConditionValue {
    fn from(t: DateTime<Local>) -> Self {
        Self::Timestamp(t)
    }
}

/// A predicate over one attribute of a [`FileRecord`].
///
/// The value's type is checked against the attribute when the condition is
/// built, so a mistyped rule is rejected before it ever runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConditionSpec", into = "ConditionSpec")]
pub struct Condition {
    attribute: ConditionAttribute,
    operator: ConditionOperator,
    value: ConditionValue,
}

impl Condition {
    /// Creates a condition, validating the value type and operator.
    pub fn new(
        attribute: ConditionAttribute,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Result<Self> {
        let value = value.into();
        if !value.fits(attribute) {
            return Err(type_mismatch(attribute, &value));
        }
        if operator.is_containment() && !attribute.is_text() {
            return Err(SortError::InvalidOperator(format!(
                "{} is not defined for {}",
                operator, attribute
            )));
        }
        Ok(Self {
            attribute,
            operator,
            value,
        })
    }

    /// Condition on the file name (without extension).
    pub fn name(operator: ConditionOperator, value: impl Into<String>) -> Self {
        Self {
            attribute: ConditionAttribute::Name,
            operator,
            value: ConditionValue::Text(value.into()),
        }
    }

    /// Condition on the dotted extension, e.g. `".png"`.
    pub fn extension(operator: ConditionOperator, value: impl Into<String>) -> Self {
        Self {
            attribute: ConditionAttribute::Extension,
            operator,
            value: ConditionValue::Text(value.into()),
        }
    }

    /// Condition on the file size in bytes.
    pub fn size(operator: ConditionOperator, bytes: u64) -> Result<Self> {
        Self::new(ConditionAttribute::Size, operator, bytes)
    }

    /// Condition on the creation timestamp.
    pub fn created(operator: ConditionOperator, at: DateTime<Local>) -> Result<Self> {
        Self::new(ConditionAttribute::DateCreated, operator, at)
    }

    /// Condition on the modification timestamp.
    pub fn modified(operator: ConditionOperator, at: DateTime<Local>) -> Result<Self> {
        Self::new(ConditionAttribute::DateModified, operator, at)
    }

    pub fn attribute(&self) -> ConditionAttribute {
        self.attribute
    }

    pub fn operator(&self) -> ConditionOperator {
        self.operator
    }

    pub fn value(&self) -> &ConditionValue {
        &self.value
    }

    /// Tests the condition against a file.
    ///
    /// Text comparisons lower-case both sides first.
    pub fn evaluate(&self, file: &FileRecord) -> Result<bool> {
        let result = match (self.attribute, &self.value) {
            (ConditionAttribute::Name, ConditionValue::Text(v)) => self.compare_text(&file.name, v),
            (ConditionAttribute::Extension, ConditionValue::Text(v)) => {
                self.compare_text(&file.extension, v)
            }
            (ConditionAttribute::Size, ConditionValue::Number(v)) => {
                self.operator.compare(&(file.size as f64), v)
            }
            (ConditionAttribute::DateCreated, ConditionValue::Timestamp(t)) => {
                self.operator.compare(&file.created_at, t)
            }
            (ConditionAttribute::DateModified, ConditionValue::Timestamp(t)) => {
                self.operator.compare(&file.modified_at, t)
            }
            (attribute, value) => Err(type_mismatch(attribute, value)),
        }?;

        tracing::debug!(
            file = %file.path.display(),
            "{} {} {} -> {}",
            self.attribute,
            self.operator,
            self.value,
            result
        );
        Ok(result)
    }

    fn compare_text(&self, actual: &str, expected: &str) -> Result<bool> {
        let actual = actual.to_lowercase();
        let expected = expected.to_lowercase();
        match self.operator {
            ConditionOperator::Includes => Ok(actual.contains(&expected)),
            ConditionOperator::Excludes => Ok(!actual.contains(&expected)),
            op => op.compare(actual.as_str(), expected.as_str()),
        }
    }

    /// Returns the operator as it reads in a sentence.
    pub fn describe_operator(&self) -> &'static str {
        self.operator.describe()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.attribute.phrase(),
            self.operator.describe(),
            self.value
        )
    }
}

fn type_mismatch(attribute: ConditionAttribute, value: &ConditionValue) -> SortError {
    SortError::TypeMismatch {
        attribute: attribute.as_str().to_string(),
        expected: attribute.expected_type(),
        found: value.type_name(),
    }
}

/// Persisted form of a [`Condition`].
#[derive(Debug, Clone, Serialize)]
struct ConditionSpec {
    #[serde(rename = "type")]
    attribute: ConditionAttribute,
    operation: ConditionOperator,
    value: ConditionValue,
}

impl From<Condition> for ConditionSpec {
    fn from(condition: Condition) -> Self {
        Self {
            attribute: condition.attribute,
            operation: condition.operator,
            value: condition.value,
        }
    }
}

/// Decoded form of a [`Condition`], before the value is typed by attribute.
#[derive(Debug, Deserialize)]
struct RawConditionSpec {
    #[serde(rename = "type")]
    attribute: ConditionAttribute,
    operation: ConditionOperator,
    value: RawValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    fn into_value(self, attribute: ConditionAttribute) -> ConditionValue {
        match (attribute, self) {
            (_, Self::Number(n)) => ConditionValue::Number(n),
            (ConditionAttribute::DateCreated | ConditionAttribute::DateModified, Self::Text(s)) => {
                // Unparseable text is left for the type check to reject.
                match DateTime::parse_from_rfc3339(&s) {
                    Ok(at) => ConditionValue::Timestamp(at.with_timezone(&Local)),
                    Err(_) => ConditionValue::Text(s),
                }
            }
            (_, Self::Text(s)) => ConditionValue::Text(s),
        }
    }
}

impl TryFrom<RawConditionSpec> for Condition {
    type Error = SortError;

    fn try_from(spec: RawConditionSpec) -> Result<Self> {
        let value = spec.value.into_value(spec.attribute);
        Self::new(spec.attribute, spec.operation, value)
    }
}
