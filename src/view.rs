use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::domain::PVError;
use crate::filter::{
    Comparison, NumericColumn, NumericFilter, matches_name, parse_threshold,
};
use crate::planet::{Column, EXCLUDED_COLUMN, Planet, visible_columns};

/// Indices of the records passing the name filter and, when given, the
/// numeric filter. Dataset order is preserved.
pub fn filtered_indices(
    dataset: &[Planet],
    name_query: &str,
    numeric: Option<&NumericFilter>,
) -> Vec<usize> {
    dataset
        .iter()
        .enumerate()
        .filter(|(_, planet)| matches_name(planet, name_query))
        .filter(|(_, planet)| numeric.is_none_or(|f| f.matches(planet)))
        .map(|(idx, _)| idx)
        .collect()
}

/// Record form of `filtered_indices` for callers holding no `PlanetView`.
#[allow(dead_code)]
pub fn compute_rows<'a>(
    dataset: &'a [Planet],
    name_query: &str,
    numeric: Option<&NumericFilter>,
) -> Vec<&'a Planet> {
    filtered_indices(dataset, name_query, numeric)
        .into_iter()
        .map(|idx| &dataset[idx])
        .collect()
}

/// Values currently selected in the numeric filter controls.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericControls {
    pub column: NumericColumn,
    pub comparison: Comparison,
    pub value: String,
}

impl Default for NumericControls {
    fn default() -> Self {
        Self {
            column: NumericColumn::default(),
            comparison: Comparison::default(),
            value: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumericFilterState {
    Unset,
    /// Controls were edited since the last apply. `previous` stays active.
    Pending { previous: Option<NumericFilter> },
    Applied(NumericFilter),
}

impl NumericFilterState {
    pub fn active(&self) -> Option<&NumericFilter> {
        match self {
            NumericFilterState::Unset => None,
            NumericFilterState::Pending { previous } => previous.as_ref(),
            NumericFilterState::Applied(filter) => Some(filter),
        }
    }
}

/// Dataset plus filter state, with the visible rows kept up to date.
pub struct PlanetView {
    dataset: Vec<Planet>,
    name_query: String,
    controls: NumericControls,
    numeric: NumericFilterState,
    rows: Vec<usize>,
}

impl PlanetView {
    pub fn new(dataset: Vec<Planet>) -> Self {
        let rows = (0..dataset.len()).collect();
        Self {
            dataset,
            name_query: String::new(),
            controls: NumericControls::default(),
            numeric: NumericFilterState::Unset,
            rows,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Swap in a freshly fetched dataset, filters are kept.
    pub fn replace_dataset(&mut self, dataset: Vec<Planet>) {
        debug!("Replacing dataset with {} planets", dataset.len());
        self.dataset = dataset;
        self.recompute();
    }

    pub fn dataset(&self) -> &[Planet] {
        &self.dataset
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn planet(&self, row: usize) -> Option<&Planet> {
        self.rows.get(row).map(|&idx| &self.dataset[idx])
    }

    pub fn columns(&self) -> Vec<Column> {
        match self.dataset.first() {
            Some(sample) => visible_columns(sample),
            None => Column::ALL
                .into_iter()
                .filter(|c| *c != EXCLUDED_COLUMN)
                .collect(),
        }
    }

    pub fn name_query(&self) -> &str {
        &self.name_query
    }

    /// Live filter, every call recomputes the rows.
    pub fn set_name_query(&mut self, query: &str) {
        self.name_query = query.to_string();
        self.recompute();
    }

    pub fn controls(&self) -> &NumericControls {
        &self.controls
    }

    pub fn numeric_state(&self) -> &NumericFilterState {
        &self.numeric
    }

    pub fn active_numeric_filter(&self) -> Option<&NumericFilter> {
        self.numeric.active()
    }

    pub fn set_column(&mut self, column: NumericColumn) {
        self.controls.column = column;
        self.mark_pending();
    }

    pub fn set_comparison(&mut self, comparison: Comparison) {
        self.controls.comparison = comparison;
        self.mark_pending();
    }

    pub fn set_value_text(&mut self, value: &str) {
        self.controls.value = value.to_string();
        self.mark_pending();
    }

    pub fn next_column(&mut self) {
        self.set_column(self.controls.column.next());
    }

    pub fn previous_column(&mut self) {
        self.set_column(self.controls.column.previous());
    }

    pub fn next_comparison(&mut self) {
        self.set_comparison(self.controls.comparison.next());
    }

    /// Turns the controls into the active numeric filter. An unparsable value
    /// leaves the state and the rows untouched.
    pub fn apply_numeric_filter(&mut self) -> Result<NumericFilter, PVError> {
        let threshold = match parse_threshold(&self.controls.value) {
            Ok(t) => t,
            Err(e) => {
                warn!("Ignoring apply: {e}");
                return Err(e);
            }
        };
        let filter = NumericFilter {
            column: self.controls.column,
            comparison: self.controls.comparison,
            threshold,
        };
        self.numeric = NumericFilterState::Applied(filter);
        self.recompute();
        Ok(filter)
    }

    fn mark_pending(&mut self) {
        let previous = self.numeric.active().copied();
        self.numeric = NumericFilterState::Pending { previous };
    }

    fn recompute(&mut self) {
        let start_time = Instant::now();
        self.rows = filtered_indices(&self.dataset, &self.name_query, self.numeric.active());
        trace!(
            "Filter name='{}' numeric={:?} kept {}/{} rows in {}us",
            self.name_query,
            self.numeric.active(),
            self.rows.len(),
            self.dataset.len(),
            start_time.elapsed().as_micros()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::tests::reference_planets;

    fn names(view: &PlanetView) -> Vec<&str> {
        view.rows()
            .iter()
            .map(|&idx| view.dataset()[idx].name.as_str())
            .collect()
    }

    fn apply(view: &mut PlanetView, column: &str, comparison: &str, value: &str) {
        view.set_column(column.parse().unwrap());
        view.set_comparison(comparison.parse().unwrap());
        view.set_value_text(value);
        view.apply_numeric_filter().unwrap();
    }

    #[test]
    fn name_filter_reference_counts() {
        let planets = reference_planets();
        assert_eq!(compute_rows(&planets, "", None).len(), 10);
        let o: Vec<&str> = compute_rows(&planets, "o", None)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(
            o,
            ["Tatooine", "Hoth", "Dagobah", "Endor", "Naboo", "Coruscant", "Kamino"]
        );
        let oo: Vec<&str> = compute_rows(&planets, "oo", None)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(oo, ["Tatooine", "Naboo"]);
    }

    #[test]
    fn longer_queries_never_grow_the_result() {
        let planets = reference_planets();
        let mut previous = planets.len();
        let mut query = String::new();
        for chr in "Tatooine".chars() {
            query.push(chr);
            let rows = compute_rows(&planets, &query, None);
            assert!(rows.len() <= previous);
            assert!(rows.iter().all(|p| p.name.contains(&query)));
            previous = rows.len();
        }
        assert_eq!(previous, 1);
    }

    #[test]
    fn sequential_name_filters_track_the_latest_query() {
        let mut view = PlanetView::new(reference_planets());
        view.set_name_query("o");
        assert_eq!(view.rows().len(), 7);
        view.set_name_query("oo");
        assert_eq!(view.rows().len(), 2);
        view.set_name_query("");
        assert_eq!(view.rows().len(), 10);
    }

    #[test]
    fn reference_numeric_filters_through_the_view() {
        let mut view = PlanetView::new(reference_planets());
        apply(&mut view, "surface_water", "menor que", "40");
        assert_eq!(view.rows().len(), 6);
        apply(&mut view, "diameter", "maior que", "8900");
        assert_eq!(view.rows().len(), 7);
        apply(&mut view, "population", "igual a", "200000");
        assert_eq!(names(&view), ["Tatooine"]);
    }

    #[test]
    fn numeric_filter_waits_for_apply() {
        let mut view = PlanetView::new(reference_planets());
        assert_eq!(view.numeric_state(), &NumericFilterState::Unset);

        view.set_column(NumericColumn::Diameter);
        view.set_value_text("8900");
        assert_eq!(
            view.numeric_state(),
            &NumericFilterState::Pending { previous: None }
        );
        assert_eq!(view.rows().len(), 10);

        let filter = view.apply_numeric_filter().unwrap();
        assert_eq!(view.numeric_state(), &NumericFilterState::Applied(filter));
        assert_eq!(view.rows().len(), 7);

        // Editing keeps the applied filter in place until the next apply.
        view.next_comparison();
        assert_eq!(view.active_numeric_filter(), Some(&filter));
        assert_eq!(view.rows().len(), 7);
        view.apply_numeric_filter().unwrap();
        assert_eq!(names(&view), ["Dagobah"]);
    }

    #[test]
    fn invalid_threshold_keeps_previous_filter() {
        let mut view = PlanetView::new(reference_planets());
        apply(&mut view, "surface_water", "<", "40");
        let applied = *view.active_numeric_filter().unwrap();

        view.set_value_text("a lot");
        assert!(matches!(
            view.apply_numeric_filter(),
            Err(PVError::InvalidThreshold(_))
        ));
        assert_eq!(view.active_numeric_filter(), Some(&applied));
        assert_eq!(view.rows().len(), 6);

        view.set_value_text("");
        assert!(view.apply_numeric_filter().is_err());
        assert_eq!(view.rows().len(), 6);
    }

    #[test]
    fn apply_from_unset_uses_default_controls() {
        let mut view = PlanetView::new(reference_planets());
        let filter = view.apply_numeric_filter().unwrap();
        assert_eq!(filter.column, NumericColumn::Population);
        assert_eq!(filter.comparison, Comparison::GreaterThan);
        assert_eq!(filter.threshold, 0.0);
        // Hoth and Dagobah have an unknown population.
        assert_eq!(view.rows().len(), 8);
    }

    #[test]
    fn filters_compose_and_clear_independently() {
        let mut view = PlanetView::new(reference_planets());
        view.set_name_query("o");
        apply(&mut view, "diameter", ">", "8900");
        assert_eq!(
            names(&view),
            ["Tatooine", "Naboo", "Coruscant", "Kamino"]
        );

        view.set_name_query("");
        let planets = reference_planets();
        let numeric_only = compute_rows(&planets, "", view.active_numeric_filter());
        assert_eq!(view.rows().len(), numeric_only.len());
        assert_eq!(view.rows().len(), 7);
        assert!(view.active_numeric_filter().is_some());
    }

    #[test]
    fn filter_order_does_not_matter() {
        let mut first = PlanetView::new(reference_planets());
        first.set_name_query("a");
        apply(&mut first, "surface_water", "<", "40");

        let mut second = PlanetView::new(reference_planets());
        apply(&mut second, "surface_water", "<", "40");
        second.set_name_query("a");

        assert_eq!(first.rows(), second.rows());
        assert_eq!(names(&first), ["Tatooine", "Yavin IV", "Dagobah", "Naboo"]);
    }

    #[test]
    fn replacing_the_dataset_keeps_filters() {
        let mut view = PlanetView::empty();
        view.set_name_query("oo");
        assert!(view.rows().is_empty());
        assert_eq!(view.columns().len(), 13);

        view.replace_dataset(reference_planets());
        assert_eq!(names(&view), ["Tatooine", "Naboo"]);
        assert_eq!(view.planet(1).map(|p| p.name.as_str()), Some("Naboo"));
        assert!(view.planet(2).is_none());
    }
}
