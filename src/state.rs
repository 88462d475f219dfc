use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use natality_weeks::analysis::{WeeklyTable, tabulate};
use natality_weeks::data::filter::{Interval, RecordFilter};
use natality_weeks::data::layout::Layout;
use natality_weeks::data::loader;
use natality_weeks::data::model::{BMI_CODES, EDUCATION_CODES, NatalityDataset};

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// Which coded field a checkbox group controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeField {
    Bmi,
    Education,
}

impl CodeField {
    pub fn codes(self) -> &'static [u8] {
        match self {
            CodeField::Bmi => &BMI_CODES,
            CodeField::Education => &EDUCATION_CODES,
        }
    }
}

/// The full viewer state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a file is opened).
    pub dataset: Option<NatalityDataset>,

    /// File the dataset came from.
    pub source: Option<PathBuf>,

    /// Column layout used for fixed-width files.
    pub layout: Layout,

    /// Current population predicates.
    pub filter: RecordFilter,

    /// Tabulation of the current filter (cached).
    pub table: Option<WeeklyTable>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            source: None,
            layout: Layout::default(),
            filter: RecordFilter::default(),
            table: None,
            status_message: None,
        }
    }
}

impl AppState {
    pub fn new(layout: Layout, filter: RecordFilter) -> Self {
        Self {
            layout,
            filter,
            ..Self::default()
        }
    }

    /// Load a file, replacing the current dataset. Errors end up in the status line.
    pub fn open(&mut self, path: &Path) {
        match loader::load_file(path, &self.layout) {
            Ok(dataset) => {
                self.source = Some(path.to_path_buf());
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded dataset and tabulate it under the current filter.
    pub fn set_dataset(&mut self, dataset: NatalityDataset) {
        self.dataset = Some(dataset);
        self.refilter();
    }

    /// Recompute the table after a filter change.
    pub fn refilter(&mut self) {
        if let Err(e) = self.filter.validate() {
            self.status_message = Some(e.to_string());
            self.table = None;
            return;
        }
        self.status_message = None;
        if let Some(ds) = &self.dataset {
            self.table = Some(tabulate(ds, &self.filter));
        }
    }

    fn codes_mut(&mut self, field: CodeField) -> &mut Option<BTreeSet<u8>> {
        match field {
            CodeField::Bmi => &mut self.filter.bmi,
            CodeField::Education => &mut self.filter.education,
        }
    }

    pub fn codes(&self, field: CodeField) -> Option<&BTreeSet<u8>> {
        match field {
            CodeField::Bmi => self.filter.bmi.as_ref(),
            CodeField::Education => self.filter.education.as_ref(),
        }
    }

    pub fn is_selected(&self, field: CodeField, code: u8) -> bool {
        self.codes(field).map_or(true, |set| set.contains(&code))
    }

    /// Toggle a single code. An unconstrained field first becomes
    /// "everything selected" so the toggle has something to remove from.
    pub fn toggle_code(&mut self, field: CodeField, code: u8) {
        let selected = self
            .codes_mut(field)
            .get_or_insert_with(|| field.codes().iter().copied().collect());
        if !selected.remove(&code) {
            selected.insert(code);
        }
        self.refilter();
    }

    /// Remove the constraint on a field.
    pub fn select_all(&mut self, field: CodeField) {
        *self.codes_mut(field) = None;
        self.refilter();
    }

    /// Select no code at all (the population becomes empty).
    pub fn select_none(&mut self, field: CodeField) {
        *self.codes_mut(field) = Some(BTreeSet::new());
        self.refilter();
    }

    pub fn set_age(&mut self, age: Option<Interval>) {
        self.filter.age = age;
        self.refilter();
    }

    pub fn set_weeks(&mut self, weeks: Interval) {
        self.filter.weeks = weeks;
        self.refilter();
    }
}
