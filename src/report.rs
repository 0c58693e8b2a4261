use crate::view::PlanetView;

const COLUMN_SEPARATOR: &str = "  ";

/// Plain text rendering of the visible rows: a header line followed by one
/// line per planet.
pub fn render_table(view: &PlanetView, max_column_width: usize) -> String {
    let columns = view.columns();
    let dataset = view.dataset();
    let cells: Vec<Vec<String>> = view
        .rows()
        .iter()
        .map(|&idx| {
            columns
                .iter()
                .map(|&c| dataset[idx].cell(c).into_owned())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(cidx, column)| {
            let widest = cells
                .iter()
                .map(|row| row[cidx].chars().count())
                .max()
                .unwrap_or(0);
            widest.max(column.as_str().len()).min(max_column_width)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
    push_line(&mut out, &header, &widths);
    for row in &cells {
        let row: Vec<&str> = row.iter().map(String::as_str).collect();
        push_line(&mut out, &row, &widths);
    }
    out
}

fn push_line(out: &mut String, values: &[&str], widths: &[usize]) {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, &width)| pad(value, width))
        .collect::<Vec<String>>()
        .join(COLUMN_SEPARATOR);
    out.push_str(line.trim_end());
    out.push('\n');
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len > width {
        let keep = width.saturating_sub(3);
        let mut cut: String = value.chars().take(keep).collect();
        cut.push_str(&".".repeat(width - keep));
        cut
    } else {
        format!("{value}{}", " ".repeat(width - len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::tests::reference_planets;

    #[test]
    fn one_header_line_plus_one_line_per_row() {
        let mut view = PlanetView::new(reference_planets());
        let report = render_table(&view, 40);
        assert_eq!(report.lines().count(), 11);
        let header = report.lines().next().unwrap();
        assert!(header.starts_with("name "));
        assert!(header.ends_with("url"));
        assert!(!header.contains("residents"));

        view.set_name_query("o");
        assert_eq!(render_table(&view, 40).lines().count(), 8);
        view.set_name_query("oo");
        assert_eq!(render_table(&view, 40).lines().count(), 3);
    }

    #[test]
    fn numeric_filter_reference_line_counts() {
        let mut view = PlanetView::new(reference_planets());
        view.set_column("surface_water".parse().unwrap());
        view.set_comparison("<".parse().unwrap());
        view.set_value_text("40");
        view.apply_numeric_filter().unwrap();
        assert_eq!(render_table(&view, 40).lines().count(), 7);

        view.set_column("population".parse().unwrap());
        view.set_comparison("=".parse().unwrap());
        view.set_value_text("200000");
        view.apply_numeric_filter().unwrap();
        let report = render_table(&view, 40);
        assert_eq!(report.lines().count(), 2);
        assert!(report.lines().nth(1).unwrap().starts_with("Tatooine"));
    }

    #[test]
    fn empty_view_still_has_a_header() {
        let report = render_table(&PlanetView::empty(), 20);
        assert_eq!(report.lines().count(), 1);
    }

    #[test]
    fn long_cells_are_cut() {
        assert_eq!(pad("temperate, tropical", 10), "tempera...");
        assert_eq!(pad("arid", 6), "arid  ");
        assert_eq!(pad("abcdef", 2), "..");
    }
}
