// ABOUTME: Declarative row extraction turning one fetched document into raw positional rows.
// ABOUTME: RowRule carries the row/cell selectors, the minimum cell count, and link-text cells.

//! Row extraction.
//!
//! Each source defines a `RowRule`: a row selector, a cell selector
//! relative to each row, a minimum cell count separating data rows from
//! header/spacer rows, and the explicit set of cells whose value comes
//! from a nested link element. Rule evaluation is tolerant: short rows are
//! skipped, missing nested links resolve to empty strings, and an invalid
//! selector degrades to an empty row set rather than an error.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use berthline_schedule::RawRow;

/// Thread-safe cache of compiled CSS selectors.
///
/// Selector parsing is expensive relative to matching, and the same rule
/// selectors run on every row of every cycle. Invalid selectors are cached
/// as None.
static SELECTOR_CACHE: Lazy<RwLock<HashMap<String, Option<Selector>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn get_or_compile(css: &str) -> Option<Selector> {
    {
        let cache = SELECTOR_CACHE.read().unwrap();
        if let Some(cached) = cache.get(css) {
            return cached.clone();
        }
    }

    let compiled = Selector::parse(css).ok();
    let mut cache = SELECTOR_CACHE.write().unwrap();
    if let Some(cached) = cache.get(css) {
        return cached.clone();
    }
    cache.insert(css.to_string(), compiled.clone());
    compiled
}

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("link selector"));

/// Declarative extraction rule for one source's document shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRule {
    /// CSS selector matching each data row container.
    pub rows: String,
    /// CSS selector for cells, relative to a row.
    #[serde(default = "default_cells")]
    pub cells: String,
    /// Rows with fewer cells than this are header/spacer rows and skipped.
    #[serde(default)]
    pub min_cells: usize,
    /// Cell indices whose value is the text of a nested `<a>` element
    /// rather than the cell's full text. Explicit per source, never
    /// inferred; a cell without a link resolves to the empty string.
    #[serde(default)]
    pub link_text: Vec<usize>,
}

fn default_cells() -> String {
    "td".to_string()
}

/// Collapses runs of whitespace into single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell_value(cell: ElementRef<'_>, index: usize, rule: &RowRule) -> String {
    if rule.link_text.contains(&index) {
        cell.select(&LINK_SELECTOR)
            .next()
            .map(|a| normalize_whitespace(&a.text().collect::<String>()))
            .unwrap_or_default()
    } else {
        normalize_whitespace(&cell.text().collect::<String>())
    }
}

/// Extracts the raw positional rows a rule matches in a document.
///
/// Rows shorter than `min_cells` are skipped. An invalid row or cell
/// selector yields an empty row set; structural surprises degrade, they
/// do not abort the source.
pub fn extract_rows(html: &str, rule: &RowRule) -> Vec<RawRow> {
    let row_selector = match get_or_compile(&rule.rows) {
        Some(sel) => sel,
        None => {
            tracing::warn!(selector = %rule.rows, "invalid row selector, extracting nothing");
            return Vec::new();
        }
    };
    let cell_selector = match get_or_compile(&rule.cells) {
        Some(sel) => sel,
        None => {
            tracing::warn!(selector = %rule.cells, "invalid cell selector, extracting nothing");
            return Vec::new();
        }
    };

    let doc = Html::parse_document(html);
    let mut rows = Vec::new();
    for row_el in doc.select(&row_selector) {
        let cells: Vec<ElementRef<'_>> = row_el.select(&cell_selector).collect();
        if cells.len() < rule.min_cells {
            continue;
        }
        rows.push(
            cells
                .into_iter()
                .enumerate()
                .map(|(i, cell)| cell_value(cell, i, rule))
                .collect(),
        );
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE_HTML: &str = r#"
        <html><body>
        <table>
            <tr><th>Vessel</th><th>Carrier</th><th>ETA</th></tr>
            <tr><td> MSC  CAMEROON </td><td>MSC</td><td>2025-05-09 22:00</td></tr>
            <tr><td>HANNE</td><td><a href="/svc">KCS</a> extra</td><td>2025-05-10 04:00</td></tr>
            <tr><td>spacer</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn header_and_short_rows_are_skipped() {
        let rule = RowRule {
            rows: "table tr".into(),
            cells: "td".into(),
            min_cells: 3,
            link_text: vec![],
        };
        let rows = extract_rows(TABLE_HTML, &rule);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["MSC CAMEROON", "MSC", "2025-05-09 22:00"]);
    }

    #[test]
    fn link_text_cells_take_the_nested_anchor_only() {
        let rule = RowRule {
            rows: "table tr".into(),
            cells: "td".into(),
            min_cells: 3,
            link_text: vec![1],
        };
        let rows = extract_rows(TABLE_HTML, &rule);
        // Cell 1 of the first data row has no link, so it is empty; the
        // second row's cell yields only the anchor text.
        assert_eq!(rows[0][1], "");
        assert_eq!(rows[1][1], "KCS");
    }

    #[test]
    fn attribute_selectors_pick_marked_rows() {
        let html = r#"
            <table>
                <tr><td>header-ish</td><td>x</td></tr>
                <tr align="center"><td>MARSHAL ISLANDS</td><td>KCS</td></tr>
                <tr class="color_even"><td>EVER GIVEN</td><td>EMC</td></tr>
                <tr class="color_odd"><td>EVER GLORY</td><td>EMC</td></tr>
            </table>
        "#;

        let aligned = RowRule {
            rows: r#"tr[align="center"]"#.into(),
            cells: "td".into(),
            min_cells: 2,
            link_text: vec![],
        };
        assert_eq!(extract_rows(html, &aligned).len(), 1);

        let class_prefixed = RowRule {
            rows: r#"tr[class^="color_"]"#.into(),
            cells: "td".into(),
            min_cells: 2,
            link_text: vec![],
        };
        let rows = extract_rows(html, &class_prefixed);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "EVER GIVEN");
    }

    #[test]
    fn id_pattern_selectors_match_rendered_grid_rows() {
        // The shape a Nexacro-style grid renders into after the click.
        let html = r#"
            <div id="grid_body_gridrow_0">
                <div id="cell_0_0GridCellTextContainerElement"><div>1</div></div>
                <div id="cell_0_1GridCellTextContainerElement"><div>1(S)</div></div>
                <div id="cell_0_2GridCellTextContainerElement"><div>MSC</div></div>
            </div>
            <div id="grid_body_gridrow_1">
                <div id="cell_1_0GridCellTextContainerElement"><div>2</div></div>
                <div id="cell_1_1GridCellTextContainerElement"><div>2(N)</div></div>
                <div id="cell_1_2GridCellTextContainerElement"><div>MAE</div></div>
            </div>
            <div id="not_a_row"><div>noise</div></div>
        "#;
        let rule = RowRule {
            rows: r#"div[id^="grid_body_gridrow_"]"#.into(),
            cells: r#"div[id$="GridCellTextContainerElement"] div"#.into(),
            min_cells: 3,
            link_text: vec![],
        };
        let rows = extract_rows(html, &rule);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["1", "1(S)", "MSC"]);
        assert_eq!(rows[1], vec!["2", "2(N)", "MAE"]);
    }

    #[test]
    fn invalid_selector_degrades_to_empty() {
        let rule = RowRule {
            rows: "[[[invalid".into(),
            cells: "td".into(),
            min_cells: 0,
            link_text: vec![],
        };
        assert!(extract_rows(TABLE_HTML, &rule).is_empty());
    }

    #[test]
    fn rule_deserializes_with_defaults() {
        let rule: RowRule = serde_json::from_str(r#"{"rows": "tbody tr"}"#).unwrap();
        assert_eq!(rule.cells, "td");
        assert_eq!(rule.min_cells, 0);
        assert!(rule.link_text.is_empty());
    }
}
