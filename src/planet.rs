use std::borrow::Cow;
use std::fmt;

use serde::Deserialize;

/// One planet as delivered by the catalog.
///
/// Every key of the payload is required, a record missing one of them fails
/// deserialization. Numeric attributes stay text because the catalog uses
/// `"unknown"` for missing measurements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Planet {
    pub name: String,
    pub rotation_period: String,
    pub orbital_period: String,
    pub diameter: String,
    pub climate: String,
    pub gravity: String,
    pub terrain: String,
    pub surface_water: String,
    pub population: String,
    pub residents: Vec<String>,
    pub films: Vec<String>,
    pub created: String,
    pub edited: String,
    pub url: String,
}

/// Listing page returned by the planets endpoint.
#[derive(Debug, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<Planet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    RotationPeriod,
    OrbitalPeriod,
    Diameter,
    Climate,
    Gravity,
    Terrain,
    SurfaceWater,
    Population,
    Residents,
    Films,
    Created,
    Edited,
    Url,
}

impl Column {
    /// Catalog key order.
    pub const ALL: [Column; 14] = [
        Column::Name,
        Column::RotationPeriod,
        Column::OrbitalPeriod,
        Column::Diameter,
        Column::Climate,
        Column::Gravity,
        Column::Terrain,
        Column::SurfaceWater,
        Column::Population,
        Column::Residents,
        Column::Films,
        Column::Created,
        Column::Edited,
        Column::Url,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::RotationPeriod => "rotation_period",
            Column::OrbitalPeriod => "orbital_period",
            Column::Diameter => "diameter",
            Column::Climate => "climate",
            Column::Gravity => "gravity",
            Column::Terrain => "terrain",
            Column::SurfaceWater => "surface_water",
            Column::Population => "population",
            Column::Residents => "residents",
            Column::Films => "films",
            Column::Created => "created",
            Column::Edited => "edited",
            Column::Url => "url",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Planet {
    /// Keys of the record in their natural order.
    pub fn keys(&self) -> impl Iterator<Item = Column> {
        Column::ALL.into_iter()
    }

    /// Display text of a field. Lists are joined with ", ".
    pub fn cell(&self, column: Column) -> Cow<'_, str> {
        match column {
            Column::Name => Cow::Borrowed(&self.name),
            Column::RotationPeriod => Cow::Borrowed(&self.rotation_period),
            Column::OrbitalPeriod => Cow::Borrowed(&self.orbital_period),
            Column::Diameter => Cow::Borrowed(&self.diameter),
            Column::Climate => Cow::Borrowed(&self.climate),
            Column::Gravity => Cow::Borrowed(&self.gravity),
            Column::Terrain => Cow::Borrowed(&self.terrain),
            Column::SurfaceWater => Cow::Borrowed(&self.surface_water),
            Column::Population => Cow::Borrowed(&self.population),
            Column::Residents => Cow::Owned(self.residents.join(", ")),
            Column::Films => Cow::Owned(self.films.join(", ")),
            Column::Created => Cow::Borrowed(&self.created),
            Column::Edited => Cow::Borrowed(&self.edited),
            Column::Url => Cow::Borrowed(&self.url),
        }
    }
}

pub const EXCLUDED_COLUMN: Column = Column::Residents;

/// Columns shown for a record: every key except `residents`, in key order.
pub fn visible_columns(sample: &Planet) -> Vec<Column> {
    sample.keys().filter(|c| *c != EXCLUDED_COLUMN).collect()
}
