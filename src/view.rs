use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::columns::{ColumnDef, build_columns};
use crate::domain::{DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};
use crate::filter::FilterMap;
use crate::record::{Record, ResultSet};
use crate::sort::{SortOrder, SortState};

/// What the user currently sees.
#[derive(Debug)]
pub struct DisplayedData<'a> {
    /// Rows of the current page, filtered and sorted.
    pub rows: Vec<&'a Record>,
    /// All rows passing the filters, in sort order.
    pub data_source: Vec<&'a Record>,
}

/// Receives the visible rows whenever they change.
pub trait DisplaySink {
    fn displayed(&mut self, data: &DisplayedData<'_>);
}

impl<F> DisplaySink for F
where
    F: FnMut(&DisplayedData<'_>),
{
    fn displayed(&mut self, data: &DisplayedData<'_>) {
        self(data)
    }
}

/// Boxes a closure as a [`DisplaySink`].
pub fn display_sink<F>(f: F) -> Box<dyn DisplaySink>
where
    F: FnMut(&DisplayedData<'_>) + 'static,
{
    Box::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1 based page number.
    pub current: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    pub fn range(&self, total: usize) -> Range<usize> {
        let begin = std::cmp::min((self.current - 1) * self.page_size, total);
        let end = std::cmp::min(begin + self.page_size, total);
        begin..end
    }

    fn clamp(&mut self, total: usize) {
        self.current = self.current.clamp(1, self.page_count(total));
    }

    fn next_page_size(&self) -> usize {
        let idx = PAGE_SIZE_OPTIONS
            .iter()
            .position(|&s| s == self.page_size)
            .map(|i| (i + 1) % PAGE_SIZE_OPTIONS.len())
            .unwrap_or(0);
        PAGE_SIZE_OPTIONS[idx]
    }
}

pub struct TableView {
    name: String,
    records: Arc<Vec<Record>>,
    columns: Vec<ColumnDef>,
    filters: FilterMap,
    sort: Option<SortState>,
    rows: Arc<Vec<usize>>, // Indices into records after filtering and sorting
    pagination: Pagination,
    sink: Option<Box<dyn DisplaySink>>,
}

impl TableView {
    pub fn new(result: ResultSet, page_size: usize) -> Self {
        // Without records there is nothing to describe, so no columns either.
        let columns = if result.is_empty() {
            Vec::new()
        } else {
            build_columns()
        };
        let rows = Arc::new((0..result.records.len()).collect());
        TableView {
            name: result.name,
            records: Arc::new(result.records),
            columns,
            filters: FilterMap::default(),
            sort: None,
            rows,
            pagination: Pagination {
                current: 1,
                page_size: page_size.max(1),
            },
            sink: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(ResultSet::default(), DEFAULT_PAGE_SIZE)
    }

    /// Installs the output callback and hands it the current view.
    pub fn set_display_sink(&mut self, sink: Box<dyn DisplaySink>) {
        self.sink = Some(sink);
        self.emit();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn filters(&self) -> &FilterMap {
        &self.filters
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Number of rows passing the filters.
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn page_count(&self) -> usize {
        self.pagination.page_count(self.rows.len())
    }

    pub fn data_source(&self) -> Vec<&Record> {
        self.rows.iter().map(|&idx| &self.records[idx]).collect()
    }

    pub fn visible_rows(&self) -> Vec<&Record> {
        self.rows[self.pagination.range(self.rows.len())]
            .iter()
            .map(|&idx| &self.records[idx])
            .collect()
    }

    pub fn sort_order(&self, key: &str) -> Option<SortOrder> {
        self.sort.as_ref().filter(|s| s.column == key).map(|s| s.order)
    }

    pub fn set_draft(&mut self, key: &str, text: &str) {
        self.filters.set_draft(key, text);
    }

    pub fn search(&mut self, key: &str) {
        self.filters.search(key);
        self.pagination.current = 1;
        self.refresh();
    }

    pub fn reset_filter(&mut self, key: &str) {
        self.filters.reset(key);
        self.pagination.current = 1;
        self.refresh();
    }

    pub fn reset_all_filters(&mut self) {
        self.filters.reset_all();
        self.pagination.current = 1;
        self.refresh();
    }

    /// Cycles the sort of `key`: ascending, descending, unsorted.
    pub fn toggle_sort(&mut self, key: &str) {
        let sort = SortState::cycle(self.sort.as_ref(), key);
        self.set_sort(sort);
    }

    pub fn set_sort(&mut self, sort: Option<SortState>) {
        self.sort = sort;
        self.pagination.current = 1;
        self.refresh();
    }

    pub fn set_page(&mut self, page: usize) {
        let page = page.clamp(1, self.page_count());
        if page != self.pagination.current {
            self.pagination.current = page;
            self.emit();
        }
    }

    pub fn next_page(&mut self) {
        self.set_page(self.pagination.current + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.pagination.current.saturating_sub(1));
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == 0 {
            warn!("Ignoring page size 0");
            return;
        }
        // Keep the first row of the current page in view.
        let first = (self.pagination.current - 1) * self.pagination.page_size;
        self.pagination.page_size = page_size;
        self.pagination.current = first / page_size + 1;
        self.pagination.clamp(self.rows.len());
        self.emit();
    }

    pub fn cycle_page_size(&mut self) {
        self.set_page_size(self.pagination.next_page_size());
    }

    fn refresh(&mut self) {
        let records = Arc::clone(&self.records);
        let filters = &self.filters;

        let mut rows: Vec<usize> = if filters.is_empty() {
            (0..records.len()).collect()
        } else {
            (0..records.len())
                .into_par_iter()
                .filter(|&idx| filters.retains(&records[idx]))
                .collect()
        };

        if let Some(sort) = &self.sort
            && let Some(column) = self.columns.iter().find(|c| c.key == sort.column)
        {
            column.sorter.sort_rows(&records, &mut rows, sort.order);
        }

        trace!(
            "Refreshed {}: {} of {} rows, sort {:?}",
            self.name,
            rows.len(),
            records.len(),
            self.sort
        );
        self.rows = Arc::new(rows);
        self.pagination.clamp(self.rows.len());
        self.emit();
    }

    fn emit(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            let data = DisplayedData {
                rows: self.visible_rows(),
                data_source: self.data_source(),
            };
            debug!(
                "Display {} rows of {} (page {}/{})",
                data.rows.len(),
                data.data_source.len(),
                self.pagination.current,
                self.page_count()
            );
            sink.displayed(&data);
            self.sink = Some(sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;
    use std::sync::Mutex;

    fn result_set(records: Vec<Record>) -> ResultSet {
        ResultSet {
            name: "test".into(),
            records,
        }
    }

    fn sample() -> TableView {
        TableView::new(
            result_set(vec![
                Record::from_pairs(0, [("title", Value::from("Alpha")), ("year", Value::from(2001i64))]),
                Record::from_pairs(1, [("title", Value::from("beta")), ("year", Value::from(1999i64))]),
            ]),
            DEFAULT_PAGE_SIZE,
        )
    }

    fn numbered(n: usize) -> TableView {
        let records = (0..n)
            .map(|i| Record::from_pairs(i, [("title_id", Value::from(i as i64 + 1))]))
            .collect();
        TableView::new(result_set(records), 100)
    }

    fn keys(rows: &[&Record]) -> Vec<usize> {
        rows.iter().map(|r| r.key).collect()
    }

    /// Sink that keeps the keys of every emitted page.
    fn recording_sink(view: &mut TableView) -> Arc<Mutex<Vec<Vec<usize>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        view.set_display_sink(display_sink(move |data| {
            sink_seen.lock().unwrap().push(keys(&data.rows));
        }));
        seen
    }

    #[test]
    fn empty_result_has_no_rows_or_columns() {
        let view = TableView::empty();
        assert_eq!(view.visible_rows().len(), 0);
        assert!(view.columns().is_empty());
        assert_eq!(view.page_count(), 1);
    }

    #[test]
    fn filter_then_sort() {
        let mut view = sample();
        view.set_draft("title", "alp");
        view.search("title");
        assert_eq!(keys(&view.visible_rows()), vec![0]);
        assert_eq!(view.filters().highlight_for("title"), Some("alp"));

        view.reset_filter("title");
        view.toggle_sort("year");
        assert_eq!(keys(&view.visible_rows()), vec![1, 0]);
        view.toggle_sort("year");
        assert_eq!(keys(&view.visible_rows()), vec![0, 1]);
        view.toggle_sort("year");
        assert_eq!(view.sort(), None);
        assert_eq!(keys(&view.visible_rows()), vec![0, 1]);
    }

    #[test]
    fn filters_combine_and_reset_independently() {
        let mut view = sample();
        view.set_draft("title", "a");
        view.search("title");
        view.set_draft("year", "19");
        view.search("year");
        assert_eq!(keys(&view.visible_rows()), vec![1]);

        view.reset_filter("year");
        assert_eq!(keys(&view.visible_rows()), vec![0, 1]);
        assert_eq!(view.filters().term("title"), Some("a"));
    }

    #[test]
    fn pagination_splits_rows() {
        let mut view = numbered(250);
        assert_eq!(view.page_count(), 3);
        assert_eq!(view.visible_rows().len(), 100);
        view.set_page(3);
        assert_eq!(view.visible_rows().len(), 50);
        assert_eq!(view.visible_rows()[0].key, 200);
        view.next_page();
        assert_eq!(view.pagination().current, 3);
    }

    #[test]
    fn page_size_cycles_through_options() {
        let mut view = numbered(600);
        view.set_page(3);
        view.cycle_page_size();
        assert_eq!(view.pagination().page_size, 250);
        assert_eq!(view.pagination().current, 1);
        assert_eq!(view.visible_rows()[0].key, 0);
        view.cycle_page_size();
        assert_eq!(view.pagination().page_size, 500);
        view.cycle_page_size();
        assert_eq!(view.pagination().page_size, 100);
    }

    #[test]
    fn filtering_clamps_to_remaining_pages() {
        let mut view = numbered(300);
        view.set_page(3);
        view.set_draft("title_id", "7");
        view.search("title_id");
        assert_eq!(view.pagination().current, 1);
        assert!(view.visible_rows().iter().all(|r| r.text("title_id").contains('7')));
    }

    #[test]
    fn sink_sees_every_change() {
        let mut view = numbered(150);
        let seen = recording_sink(&mut view);
        view.next_page();
        view.set_draft("title_id", "15");
        view.search("title_id");
        view.toggle_sort("title_id");
        view.reset_filter("title_id");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0].len(), 100);
        assert_eq!(seen[1].len(), 50);
        assert_eq!(seen[1][0], 100);
        assert_eq!(seen[2], vec![14, 114, 149]);
        assert_eq!(seen[3], seen[2]);
        assert_eq!(seen[4].len(), 100);
    }

    #[test]
    fn sink_gets_page_and_whole_data_source() {
        let mut view = numbered(150);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        view.set_display_sink(display_sink(move |data| {
            sink_seen
                .lock()
                .unwrap()
                .push((keys(&data.rows), keys(&data.data_source)));
        }));

        view.toggle_sort("title_id");
        view.toggle_sort("title_id");
        view.next_page();
        view.cycle_page_size();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        let (rows, data_source) = &seen[3];
        assert_eq!(rows.len(), 50);
        assert_eq!(data_source.len(), 150);
        assert_eq!(data_source[0], 149);
        assert_eq!(data_source[149], 0);
        assert_eq!(rows[..], data_source[100..]);

        let (rows, data_source) = &seen[4];
        assert_eq!(view.pagination().page_size, 250);
        assert_eq!(rows, data_source);
        assert_eq!(rows.len(), 150);
    }

    #[test]
    fn zero_page_size_is_ignored() {
        let mut view = numbered(150);
        view.set_page_size(0);
        assert_eq!(view.pagination().page_size, 100);
        assert_eq!(view.visible_rows().len(), 100);

        let mut empty = TableView::empty();
        empty.set_page_size(0);
        assert_eq!(empty.page_count(), 1);
    }

    #[test]
    fn unchanged_page_is_not_emitted() {
        let mut view = sample();
        let seen = recording_sink(&mut view);
        view.next_page();
        view.prev_page();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
