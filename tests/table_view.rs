use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crkn_tv::columns::CRKN_COLUMN_NAMES;
use crkn_tv::domain::TVError;
use crkn_tv::filter::highlight_segments;
use crkn_tv::record::{Record, ResultSet, Value};
use crkn_tv::sort::{SortOrder, SortState};
use crkn_tv::view::{TableView, display_sink};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> TableView {
    TableView::new(ResultSet::load(fixture(name)).unwrap(), 100)
}

fn texts(rows: &[&Record], key: &str) -> Vec<String> {
    rows.iter().map(|r| r.text(key)).collect()
}

#[test]
fn alpha_beta_end_to_end() {
    let result = ResultSet {
        name: "inline".into(),
        records: vec![
            Record::from_pairs(0, [("title", Value::from("Alpha")), ("year", Value::from(2001i64))]),
            Record::from_pairs(1, [("title", Value::from("beta")), ("year", Value::from(1999i64))]),
        ],
    };
    let mut view = TableView::new(result, 100);

    view.set_draft("title", "alp");
    view.search("title");
    let rows = view.visible_rows();
    assert_eq!(texts(&rows, "title"), vec!["Alpha"]);
    let term = view.filters().highlight_for("title").unwrap();
    let marked: Vec<&str> = highlight_segments("Alpha", term)
        .into_iter()
        .filter(|s| s.highlighted)
        .map(|s| s.text)
        .collect();
    assert_eq!(marked, vec!["Alp"]);

    view.reset_filter("title");
    view.set_sort(Some(SortState {
        column: "year".into(),
        order: SortOrder::Ascending,
    }));
    assert_eq!(texts(&view.visible_rows(), "year"), vec!["1999", "2001"]);
}

#[test]
fn loads_result_object() {
    let view = load("crkn_results.json");
    assert_eq!(view.records().len(), 4);
    assert_eq!(view.columns().len(), CRKN_COLUMN_NAMES.len());
    assert_eq!(view.columns()[1].title, "Package Name");
    assert_eq!(view.records()[2].key, 2);
}

#[test]
fn filters_and_sorts_fixture() {
    let mut view = load("crkn_results.json");

    view.set_draft("package_name", "canadian science");
    view.search("package_name");
    assert_eq!(view.total(), 2);

    view.set_draft("title", "CHEM");
    view.search("title");
    assert_eq!(texts(&view.visible_rows(), "title_id"), vec!["CJC-021"]);

    view.reset_filter("title");
    assert_eq!(view.total(), 2);
    view.reset_filter("package_name");
    assert_eq!(view.total(), 4);

    // Missing year sorts last, equal years keep their order
    view.toggle_sort("year");
    assert_eq!(
        texts(&view.visible_rows(), "title_id"),
        vec!["CJP-114", "CJC-021", "JCS-001", "ARC-007"]
    );
    view.toggle_sort("year");
    assert_eq!(
        texts(&view.visible_rows(), "title_id"),
        vec!["JCS-001", "CJP-114", "CJC-021", "ARC-007"]
    );

    // Empty print issn counts as missing
    view.toggle_sort("print_issn");
    assert_eq!(texts(&view.visible_rows(), "title_id").last().unwrap(), "ARC-007");
}

#[test]
fn loads_csv_with_display_headers() {
    let mut view = load("crkn_titles.csv");
    assert_eq!(view.records().len(), 3);
    assert_eq!(view.records()[0].get("year"), Some(&Value::Number(2001.0)));
    assert_eq!(view.records()[2].get("year"), None);

    view.toggle_sort("title");
    assert_eq!(texts(&view.visible_rows(), "title"), vec!["Alpha", "beta", "Gamma"]);
}

#[test]
fn result_without_records_is_empty() {
    let view = load("no_results.json");
    assert!(view.visible_rows().is_empty());
    assert!(view.columns().is_empty());
}

#[test]
fn missing_file_is_reported() {
    assert!(matches!(
        ResultSet::load(fixture("does_not_exist.json")),
        Err(TVError::FileNotFound)
    ));
}

#[test]
fn sink_follows_the_view() {
    let mut view = load("crkn_results.json");
    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink_seen = Rc::clone(&seen);
    view.set_display_sink(display_sink(move |data| {
        sink_seen
            .borrow_mut()
            .push(data.rows.iter().map(|r| r.text("title_id")).collect());
    }));

    view.set_draft("collection_name", "sciences");
    view.search("collection_name");
    view.toggle_sort("title");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].len(), 4);
    assert_eq!(seen[1], vec!["CJP-114", "ARC-007", "CJC-021"]);
    assert_eq!(seen[2], vec!["ARC-007", "CJC-021", "CJP-114"]);
}
