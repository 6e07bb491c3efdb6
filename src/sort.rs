use feruca::{Collator, Locale, Tailoring};
use std::cell::RefCell;
use std::cmp::Ordering;

use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn symbol(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "▲",
            SortOrder::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub column: String,
    pub order: SortOrder,
}

impl SortState {
    /// Next sort for a click on `column`: ascending, descending, unsorted.
    pub fn cycle(current: Option<&SortState>, column: &str) -> Option<SortState> {
        match current {
            Some(s) if s.column == column => match s.order {
                SortOrder::Ascending => Some(SortState {
                    column: column.to_string(),
                    order: SortOrder::Descending,
                }),
                SortOrder::Descending => None,
            },
            _ => Some(SortState {
                column: column.to_string(),
                order: SortOrder::Ascending,
            }),
        }
    }
}

/// Compares records on a single field. Records without a value in the field
/// always end up behind those that have one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortComparator {
    key: String,
}

impl SortComparator {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn compare(&self, a: &Record, b: &Record, order: SortOrder) -> Ordering {
        match (a.present(&self.key), b.present(&self.key)) {
            (Some(va), Some(vb)) => {
                let ord = compare_values(va, vb);
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Stable sort of row indices into `records`.
    pub fn sort_rows(&self, records: &[Record], rows: &mut [usize], order: SortOrder) {
        rows.sort_by(|&a, &b| self.compare(&records[a], &records[b], order));
    }
}

// Mixed numbers and text compare as text.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => locale_compare(&a.as_text(), &b.as_text()),
    }
}

thread_local! {
    // CLDR root collation, punctuation not ignorable, lowercase before uppercase on ties
    static COLLATOR: RefCell<Collator> =
        RefCell::new(Collator::new(Tailoring::Cldr(Locale::Root), false, true));
}

/// Unicode collation of `a` and `b` with the root locale.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    COLLATOR.with(|collator| collator.borrow_mut().collate(&a, &b))
}
