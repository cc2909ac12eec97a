//! Terminal tables for ingestion outcomes and server collections.

use std::collections::HashMap;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use survey_ingest::{
    DiscrepancyReport, IngestionOutcome, ReadyUpload, RecordDraft, Rejection, SheetRow,
};
use survey_model::{AssessmentResult, Dataset, Question, QuestionSet, Strand};
use survey_state::{DistributionMode, StrandDistribution, TableView};

// =============================================================================
// INGESTION
// =============================================================================

/// Prints the outcome of a check or import.
pub fn print_outcome(outcome: &IngestionOutcome, preview: usize) {
    match outcome {
        IngestionOutcome::Ready(upload) => {
            println!(
                "Accepted: {} row(s), {} skipped",
                upload.accepted_count(),
                upload.rejected_rows().count()
            );
            if preview > 0 {
                println!("{}", preview_table(upload, preview));
            }
        }
        IngestionOutcome::Rejected(rejection) => {
            eprintln!("Rejected: {rejection}");
            if let Some(table) = rejection_table(rejection) {
                eprintln!("{table}");
            }
        }
    }
}

/// The first `limit` rows of an accepted upload, rejected rows included.
pub fn preview_table(upload: &ReadyUpload, limit: usize) -> Table {
    let drafts: HashMap<usize, &RecordDraft> =
        upload.records.iter().map(|r| (r.row_number, r)).collect();
    let is_dataset = upload.dataset_rows().next().is_some();

    let mut table = Table::new();
    if is_dataset {
        table.set_header(vec![
            header_cell("Row"),
            header_cell("Strand"),
            header_cell("Answers"),
            header_cell("STEM"),
            header_cell("ABM"),
            header_cell("HUMSS"),
        ]);
    } else {
        table.set_header(vec![
            header_cell("Row"),
            header_cell("Question"),
            header_cell("Strand"),
        ]);
    }
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);

    for row in upload.rows.iter().take(limit) {
        let cells = match row {
            SheetRow::Question(question) => vec![
                Cell::new(question.row_number),
                Cell::new(&question.question_text),
                strand_cell(&question.strand, question.strand_label()),
            ],
            SheetRow::Dataset(respondent) => {
                let draft = drafts.get(&respondent.row_number);
                let mut cells = vec![
                    Cell::new(respondent.row_number),
                    strand_cell(&respondent.strand, respondent.strand_label()),
                    Cell::new(respondent.answers.len()),
                ];
                cells.extend(Strand::ALL.into_iter().map(|strand| match draft {
                    Some(draft) => Cell::new(draft.score(strand)),
                    None => dim_cell("-"),
                }));
                cells
            }
            SheetRow::Rejected(rejected) => {
                let mut cells = vec![
                    Cell::new(rejected.row_number),
                    Cell::new(format!("skipped: {}", rejected.reason)).fg(Color::Yellow),
                ];
                let width = if is_dataset { 6 } else { 3 };
                cells.resize_with(width, || dim_cell("-"));
                cells
            }
        };
        table.add_row(cells);
    }
    table
}

/// Detail table for rejections that carry lists.
pub fn rejection_table(rejection: &Rejection) -> Option<Table> {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Problem"), header_cell("Detail")]);
    apply_table_style(&mut table);
    match rejection {
        Rejection::MissingFields { fields } => {
            for field in fields {
                table.add_row(vec![problem_cell("missing field"), Cell::new(field)]);
            }
        }
        Rejection::MissingColumns { columns } => {
            for column in columns {
                table.add_row(vec![problem_cell("missing column"), Cell::new(column)]);
            }
        }
        Rejection::NoValidRows { rejected } => {
            for row in rejected {
                table.add_row(vec![
                    problem_cell(format!("row {}", row.row_number)),
                    Cell::new(row.reason),
                ]);
            }
        }
        Rejection::ReconciliationMismatch(report) => return Some(discrepancy_table(report)),
        Rejection::InvalidScore(invalid) => {
            table.add_row(vec![
                problem_cell(format!("row {}", invalid.row)),
                Cell::new(format!("{}: '{}'", invalid.question, invalid.value)),
            ]);
        }
        Rejection::ParseError { .. }
        | Rejection::EmptyFile
        | Rejection::NameConflict { .. }
        | Rejection::SubmissionError { .. } => return None,
    }
    Some(table)
}

/// One row per discrepancy, grouped by kind.
pub fn discrepancy_table(report: &DiscrepancyReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Problem"), header_cell("Detail")]);
    apply_table_style(&mut table);
    for question in &report.missing_questions {
        table.add_row(vec![problem_cell("missing question"), Cell::new(question)]);
    }
    for question in &report.extra_questions {
        table.add_row(vec![problem_cell("unknown question"), Cell::new(question)]);
    }
    for row in &report.missing_strand_rows {
        table.add_row(vec![
            problem_cell("missing strand"),
            Cell::new(format!("row {row}")),
        ]);
    }
    table
}

// =============================================================================
// COLLECTIONS
// =============================================================================

pub fn question_sets_table(sets: &[QuestionSet]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Name"),
        header_cell("Description"),
        header_cell("Questions"),
        header_cell("Created"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for set in sets {
        table.add_row(vec![
            Cell::new(set.id),
            Cell::new(&set.name).add_attribute(Attribute::Bold),
            Cell::new(set.description_text()),
            Cell::new(set.question_count),
            created_cell(set.created_at),
        ]);
    }
    table
}

pub fn questions_table(questions: &[Question]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Question"),
        header_cell("Strand"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for question in questions {
        table.add_row(vec![
            Cell::new(question.id),
            Cell::new(&question.text),
            strand_cell(&question.strand, question.strand_label()),
        ]);
    }
    table
}

pub fn datasets_table(datasets: &[&Dataset]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Name"),
        header_cell("Question set"),
        header_cell("Rows"),
        header_cell("Status"),
        header_cell("Created"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for dataset in datasets {
        let status = if dataset.is_active() {
            Cell::new(dataset.status.as_str())
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            dim_cell(dataset.status.as_str())
        };
        table.add_row(vec![
            Cell::new(dataset.id),
            Cell::new(&dataset.name).add_attribute(Attribute::Bold),
            Cell::new(dataset.question_set_id),
            Cell::new(dataset.row_count),
            status,
            created_cell(dataset.created_at),
        ]);
    }
    table
}

/// Current page of a results view.
pub fn results_table(view: &TableView<AssessmentResult>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("ID"),
        header_cell("Name"),
        header_cell("Email"),
        header_cell("Strand"),
        header_cell("STEM"),
        header_cell("ABM"),
        header_cell("HUMSS"),
        header_cell("Dataset"),
    ]);
    apply_table_style(&mut table);
    for index in [0, 4, 5, 6] {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for result in view.page_rows() {
        let strand = if result.tie {
            Cell::new(format!("{} (tie)", result.recommended_strand)).fg(Color::Yellow)
        } else {
            strand_cell(&result.recommended_strand, result.strand_label())
        };
        table.add_row(vec![
            Cell::new(result.id),
            Cell::new(result.user_data.name.as_deref().unwrap_or("-")),
            Cell::new(result.user_data.email.as_deref().unwrap_or("-")),
            strand,
            Cell::new(result.stem_score),
            Cell::new(result.abm_score),
            Cell::new(result.humss_score),
            Cell::new(result.dataset_name().unwrap_or("-")),
        ]);
    }
    table
}

/// "Page 2 of 4 (17 results)".
pub fn page_footer(page: usize, page_count: usize, total: usize) -> String {
    format!("Page {page} of {page_count} ({total} result(s))")
}

pub fn distribution_table(distribution: &StrandDistribution, mode: DistributionMode) -> Table {
    let mut table = Table::new();
    let label = match mode {
        DistributionMode::Count => "Count",
        DistributionMode::Score => "Score",
    };
    table.set_header(vec![
        header_cell("Strand"),
        header_cell(label),
        header_cell("Share"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    let total = distribution.total();
    for (strand, value) in distribution.entries() {
        let share = if total > 0.0 {
            format!("{:.1}%", value / total * 100.0)
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            Cell::new(strand.code()),
            Cell::new(value),
            Cell::new(share),
        ]);
    }
    table
}

// =============================================================================
// STYLE
// =============================================================================

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn problem_cell<T: ToString>(label: T) -> Cell {
    Cell::new(label).fg(Color::Red)
}

fn strand_cell(raw: &str, strand: Option<Strand>) -> Cell {
    match strand {
        Some(strand) => Cell::new(strand.code()).fg(Color::Blue),
        None => Cell::new(raw).fg(Color::Yellow),
    }
}

fn created_cell(created_at: Option<chrono::NaiveDateTime>) -> Cell {
    match created_at {
        Some(at) => Cell::new(at.format("%Y-%m-%d %H:%M")),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
