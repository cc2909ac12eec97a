//! Sort, filter and paginate for entity tables.
//!
//! A [`TableView`] keeps the rows in fetch order as a snapshot and derives the
//! visible page from it on demand: sort first, then the text query and any
//! extra predicate, then the page window.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use survey_model::{AssessmentResult, Dataset, Question, QuestionSet, Record, Strand};

/// Sort key that restores (or reverses) fetch order.
pub const INDEX_KEY: &str = "index";

/// Default rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// A cell value as seen by the sorter.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
    Empty,
}

impl SortValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    fn from_option<T: Into<SortValue>>(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }

    fn string_form(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.to_lowercase(),
            Self::Empty => String::new(),
        }
    }

    /// Numeric order when both sides are numbers, otherwise case-insensitive
    /// order of the string forms.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            _ => self.string_form().cmp(&other.string_form()),
        }
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for SortValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<usize> for SortValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A row that can be shown in a [`TableView`].
pub trait TableRow {
    /// Value of the column named `key`; unknown keys are empty.
    fn sort_value(&self, key: &str) -> SortValue;

    /// Searchable fields, in any order.
    fn search_fields(&self) -> Vec<String>;

    /// Lowercased concatenation of the searchable fields.
    fn search_text(&self) -> String {
        self.search_fields().join(" ").to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Sorted, filtered, paginated view over a row snapshot.
pub struct TableView<T> {
    snapshot: Vec<T>,
    sort: Option<SortState>,
    query: String,
    predicate: Option<Predicate<T>>,
    page: usize,
    page_size: usize,
}

impl<T> fmt::Debug for TableView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableView")
            .field("rows", &self.snapshot.len())
            .field("sort", &self.sort)
            .field("query", &self.query)
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl<T: TableRow> TableView<T> {
    /// A view over `rows` in fetch order. A zero page size is treated as one.
    pub fn new(rows: Vec<T>, page_size: usize) -> Self {
        Self {
            snapshot: rows,
            sort: None,
            query: String::new(),
            predicate: None,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Replaces the snapshot with a freshly fetched collection. Sort, query
    /// and page are kept; the page is clamped.
    pub fn replace_rows(&mut self, rows: Vec<T>) {
        self.snapshot = rows;
        self.page = self.clamp_page(self.page);
    }

    pub fn snapshot(&self) -> &[T] {
        &self.snapshot
    }

    // === Sorting ===

    /// Sorts by `key`: a new key sorts ascending, the same key again toggles.
    pub fn sort_by(&mut self, key: &str) {
        self.sort = Some(match self.sort.take() {
            Some(state) if state.key == key => SortState {
                key: state.key,
                direction: state.direction.toggled(),
            },
            _ => SortState {
                key: key.to_string(),
                direction: SortDirection::Ascending,
            },
        });
    }

    pub fn sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    // === Filtering ===

    /// Sets the text query and returns to page 1.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
        self.page = 1;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Sets an extra row filter and returns to page 1.
    pub fn set_predicate(&mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) {
        self.predicate = Some(Arc::new(predicate));
        self.page = 1;
    }

    pub fn clear_predicate(&mut self) {
        self.predicate = None;
        self.page = 1;
    }

    // === Pagination ===

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current page, 1-based and always within range.
    pub fn page(&self) -> usize {
        self.clamp_page(self.page)
    }

    /// Number of pages; at least 1.
    pub fn page_count(&self) -> usize {
        self.filtered_len().div_ceil(self.page_size).max(1)
    }

    /// Moves to `page`, clamped to `1..=page_count()`.
    pub fn set_page(&mut self, page: usize) {
        self.page = self.clamp_page(page);
    }

    fn clamp_page(&self, page: usize) -> usize {
        page.clamp(1, self.page_count())
    }

    // === Derived rows ===

    fn sorted(&self) -> Vec<&T> {
        let mut rows: Vec<&T> = self.snapshot.iter().collect();
        let Some(sort) = &self.sort else {
            return rows;
        };
        if sort.key == INDEX_KEY {
            if sort.direction == SortDirection::Descending {
                rows.reverse();
            }
            return rows;
        }
        rows.sort_by(|a, b| {
            let ordering = a.sort_value(&sort.key).compare(&b.sort_value(&sort.key));
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        rows
    }

    fn matches(&self, row: &T) -> bool {
        (self.query.is_empty() || row.search_text().contains(&self.query))
            && self.predicate.as_ref().is_none_or(|keep| keep(row))
    }

    /// Every row that passes the filters, in display order.
    pub fn rows(&self) -> Vec<&T> {
        self.sorted()
            .into_iter()
            .filter(|row| self.matches(row))
            .collect()
    }

    pub fn filtered_len(&self) -> usize {
        self.snapshot.iter().filter(|row| self.matches(row)).count()
    }

    /// Rows on the current page.
    pub fn page_rows(&self) -> Vec<&T> {
        let start = (self.page() - 1) * self.page_size;
        self.rows()
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Entity rows
// ---------------------------------------------------------------------------

fn timestamp_value(value: Option<chrono::NaiveDateTime>) -> SortValue {
    SortValue::from_option(value.map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string()))
}

impl TableRow for QuestionSet {
    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "question_set_id" | "id" => self.id.get().into(),
            "question_set_name" | "name" => self.name.as_str().into(),
            "description" => self.description_text().into(),
            "created_at" => timestamp_value(self.created_at),
            "question_count" => self.question_count.into(),
            _ => SortValue::Empty,
        }
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.description_text().to_string(),
        ]
    }
}

impl TableRow for Dataset {
    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "data_set_id" | "id" => self.id.get().into(),
            "data_set_name" | "name" => self.name.as_str().into(),
            "data_set_description" | "description" => self.description_text().into(),
            "question_set_id" => self.question_set_id.get().into(),
            "status" => self.status.as_str().into(),
            "created_at" => timestamp_value(self.created_at),
            "rows" => self.row_count.into(),
            "best_k" => SortValue::from_option(self.best_k.map(f64::from)),
            "accuracy" => SortValue::from_option(self.accuracy),
            _ => SortValue::Empty,
        }
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.description_text().to_string(),
            self.status.to_string(),
        ]
    }
}

impl TableRow for Question {
    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "question_id" | "id" => self.id.get().into(),
            "question_text" | "text" => self.text.as_str().into(),
            "strand" => self.strand.as_str().into(),
            _ => SortValue::Empty,
        }
    }

    fn search_fields(&self) -> Vec<String> {
        vec![self.id.to_string(), self.text.clone(), self.strand.clone()]
    }
}

impl TableRow for Record {
    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "data_id" | "id" => self.id.get().into(),
            "strand" => self.strand.as_str().into(),
            "stem_score" => self.stem_score.into(),
            "abm_score" => self.abm_score.into(),
            "humss_score" => self.humss_score.into(),
            _ => SortValue::Empty,
        }
    }

    fn search_fields(&self) -> Vec<String> {
        vec![self.id.to_string(), self.strand.clone()]
    }
}

impl TableRow for AssessmentResult {
    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "results_id" | "id" => self.id.get().into(),
            "name" => SortValue::from_option(self.user_data.name.as_deref()),
            "email" => SortValue::from_option(self.user_data.email.as_deref()),
            "recommended_strand" => self.recommended_strand.as_str().into(),
            "tie" => SortValue::text(if self.tie { "tie" } else { "" }),
            "dataset" => SortValue::from_option(self.dataset_name()),
            "stem_score" => self.stem_score.into(),
            "abm_score" => self.abm_score.into(),
            "humss_score" => self.humss_score.into(),
            _ => SortValue::Empty,
        }
    }

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.id.to_string(),
            self.user_data.name.clone().unwrap_or_default(),
            self.user_data.email.clone().unwrap_or_default(),
            self.recommended_strand.clone(),
        ];
        if self.tie {
            fields.push("tie".to_string());
        }
        fields.push(self.dataset_name().unwrap_or_default().to_string());
        fields
    }
}

/// Extra filters of the results table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    /// Only results recommending this strand.
    pub strand: Option<Strand>,
    /// Only results of the dataset with this name.
    pub dataset: Option<String>,
}

impl ResultFilter {
    pub fn is_empty(&self) -> bool {
        self.strand.is_none() && self.dataset.is_none()
    }

    pub fn matches(&self, result: &AssessmentResult) -> bool {
        let strand_ok = self
            .strand
            .is_none_or(|strand| result.strand_label() == Some(strand));
        let dataset_ok = self.dataset.as_deref().is_none_or(|name| {
            result
                .dataset_name()
                .is_some_and(|d| d.trim().eq_ignore_ascii_case(name.trim()))
        });
        strand_ok && dataset_ok
    }

    /// Applies the filter to a results view.
    pub fn apply(self, view: &mut TableView<AssessmentResult>) {
        if self.is_empty() {
            view.clear_predicate();
        } else {
            view.set_predicate(move |result| self.matches(result));
        }
    }
}
