use crate::sort::SortComparator;

// Order of this list is the order of the table columns.
pub const CRKN_COLUMN_NAMES: [&str; 11] = [
    "Title",
    "Package_Name",
    "Collection_Name",
    "Year",
    "Title_ID",
    "Print_ISSN",
    "Online_ISSN",
    "Has_Former_Title",
    "Has_Succeeding_Title",
    "Agreement_Code",
    "Has_Rights",
];

const TITLE_DELIMITERS: [char; 2] = ['_', '-'];

/// Record field key of a column name.
pub fn field_key(column_name: &str) -> String {
    column_name.to_lowercase()
}

/// Human readable column title, delimiters become spaces.
pub fn display_title(column_name: &str) -> String {
    column_name.replace(TITLE_DELIMITERS, " ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub placeholder_prefix: &'static str,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            placeholder_prefix: "Search",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub title: String,
    pub key: String,
    pub filter: FilterConfig,
    pub sorter: SortComparator,
}

impl ColumnDef {
    pub fn new(column_name: &str) -> Self {
        let key = field_key(column_name);
        ColumnDef {
            title: display_title(column_name),
            sorter: SortComparator::new(&key),
            key,
            filter: FilterConfig::default(),
        }
    }

    pub fn placeholder(&self) -> String {
        format!("{} {}", self.filter.placeholder_prefix, self.key)
    }
}

pub fn build_columns() -> Vec<ColumnDef> {
    CRKN_COLUMN_NAMES.iter().map(|name| ColumnDef::new(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_key_lowercases() {
        assert_eq!(field_key("Package_Name"), "package_name");
        assert_eq!(field_key("Print_ISSN"), "print_issn");
        assert_eq!(field_key("year"), "year");
    }

    #[test]
    fn display_title_replaces_delimiters() {
        assert_eq!(display_title("Has_Former_Title"), "Has Former Title");
        assert_eq!(display_title("Title-ID"), "Title ID");
        assert_eq!(display_title("Year"), "Year");
    }

    #[test]
    fn columns_follow_name_list() {
        let columns = build_columns();
        assert_eq!(columns.len(), CRKN_COLUMN_NAMES.len());
        for (column, name) in columns.iter().zip(CRKN_COLUMN_NAMES) {
            assert_eq!(column.key, name.to_lowercase());
            assert_eq!(column.sorter.key(), column.key);
        }
        assert_eq!(columns[0].title, "Title");
        assert_eq!(columns[10].title, "Has Rights");
    }

    #[test]
    fn placeholder_names_the_key() {
        assert_eq!(ColumnDef::new("Online_ISSN").placeholder(), "Search online_issn");
    }
}
