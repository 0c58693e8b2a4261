use std::fmt;
use std::str::FromStr;

use crate::domain::PVError;
use crate::planet::{Column, Planet};

/// Columns a numeric filter may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericColumn {
    #[default]
    Population,
    OrbitalPeriod,
    Diameter,
    RotationPeriod,
    SurfaceWater,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 5] = [
        NumericColumn::Population,
        NumericColumn::OrbitalPeriod,
        NumericColumn::Diameter,
        NumericColumn::RotationPeriod,
        NumericColumn::SurfaceWater,
    ];

    pub fn column(&self) -> Column {
        match self {
            NumericColumn::Population => Column::Population,
            NumericColumn::OrbitalPeriod => Column::OrbitalPeriod,
            NumericColumn::Diameter => Column::Diameter,
            NumericColumn::RotationPeriod => Column::RotationPeriod,
            NumericColumn::SurfaceWater => Column::SurfaceWater,
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column().as_str())
    }
}

impl FromStr for NumericColumn {
    type Err = PVError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.column().as_str() == wanted)
            .ok_or_else(|| PVError::UnknownColumn(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    #[default]
    GreaterThan,
    EqualTo,
    LessThan,
}

impl Comparison {
    pub const ALL: [Comparison; 3] = [
        Comparison::GreaterThan,
        Comparison::EqualTo,
        Comparison::LessThan,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => "greater than",
            Comparison::EqualTo => "equal to",
            Comparison::LessThan => "less than",
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::EqualTo => value == threshold,
            Comparison::LessThan => value < threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Comparison {
    type Err = PVError;

    // Accepts the english labels, the portuguese labels of the catalog's
    // original front end and the plain operator symbols.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "greater than" | "maior que" | ">" => Ok(Comparison::GreaterThan),
            "equal to" | "igual a" | "=" | "==" => Ok(Comparison::EqualTo),
            "less than" | "menor que" | "<" => Ok(Comparison::LessThan),
            _ => Err(PVError::UnknownComparison(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericFilter {
    pub column: NumericColumn,
    pub comparison: Comparison,
    pub threshold: f64,
}

impl NumericFilter {
    pub fn matches(&self, record: &Planet) -> bool {
        matches_numeric(record, self.column, self.comparison, self.threshold)
    }
}

impl fmt::Display for NumericFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.comparison, self.threshold)
    }
}

pub fn matches_name(record: &Planet, query: &str) -> bool {
    record.name.contains(query)
}

/// Numeric reading of a field, `None` for "unknown" and other non numbers.
pub fn numeric_value(record: &Planet, column: NumericColumn) -> Option<f64> {
    record
        .cell(column.column())
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Fields without a numeric value never match.
pub fn matches_numeric(
    record: &Planet,
    column: NumericColumn,
    comparison: Comparison,
    threshold: f64,
) -> bool {
    numeric_value(record, column).is_some_and(|value| comparison.holds(value, threshold))
}

pub fn parse_threshold(text: &str) -> Result<f64, PVError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PVError::InvalidThreshold(text.to_string()))
}
