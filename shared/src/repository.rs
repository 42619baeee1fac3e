//! Form repository.
//!
//! Forms live one per row in the `Forms` table; each form's answers live in
//! its own `Responses_<id>` table. Rows are found by linear scan, and every
//! data-row position is translated to a store row through `sheet_row_index`.

use crate::error::{FormsError, Result};
use crate::sheets::{Row, TabularStore};
use crate::types::{FieldDefinition, FormSubmission, ResponseSheet, SurveyForm};
use std::sync::Arc;

pub const FORMS_TABLE: &str = "Forms";
const FORMS_HEADER: [&str; 6] = ["ID", "Title", "Description", "Fields", "CreatedAt", "UpdatedAt"];
const HEADER_ROWS: usize = 1;

pub fn response_table_name(form_id: &str) -> String {
    format!("Responses_{}", form_id)
}

/// Store row holding the data row at `data_index` (0-based, header excluded).
/// Update and delete both go through here.
pub fn sheet_row_index(data_index: usize) -> usize {
    data_index + HEADER_ROWS
}

/// Data rows of a table, header excluded. Inverse of `sheet_row_index`.
fn data_rows(rows: &[Row]) -> &[Row] {
    rows.get(HEADER_ROWS..).unwrap_or(&[])
}

fn response_header(form: &SurveyForm) -> Vec<String> {
    ["ID".to_string(), "SubmittedAt".to_string()]
        .into_iter()
        .chain(form.fields.iter().map(|f| f.label.clone()))
        .collect()
}

fn form_to_row(form: &SurveyForm) -> Result<Row> {
    let fields = serde_json::to_string(&form.fields)
        .map_err(|e| FormsError::Upstream(format!("failed to encode fields: {}", e)))?;
    Ok(vec![
        form.id.clone(),
        form.title.clone(),
        form.description.clone(),
        fields,
        form.created_at.clone(),
        form.updated_at.clone(),
    ])
}

fn row_to_form(row: &Row) -> SurveyForm {
    let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
    let fields: Vec<FieldDefinition> = match row.get(3).filter(|c| !c.is_empty()) {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!("Unreadable fields cell for form {}: {}", cell(0), e);
            Vec::new()
        }),
        None => Vec::new(),
    };
    SurveyForm {
        id: cell(0),
        title: cell(1),
        description: cell(2),
        fields,
        created_at: cell(4),
        updated_at: cell(5),
    }
}

/// Answers projected onto the form's field order; lists joined, absent → "".
fn submission_to_row(submission: &FormSubmission, form: &SurveyForm) -> Row {
    [submission.id.clone(), submission.submitted_at.clone()]
        .into_iter()
        .chain(
            form.fields
                .iter()
                .map(|f| submission.data.get(&f.id).map(|v| v.to_cell()).unwrap_or_default()),
        )
        .collect()
}

#[derive(Clone)]
pub struct FormRepository {
    store: Arc<dyn TabularStore>,
}

impl FormRepository {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    async fn ensure_forms_table(&self) -> Result<()> {
        if !self.store.table_exists(FORMS_TABLE).await? {
            let header: Vec<String> = FORMS_HEADER.iter().map(|h| h.to_string()).collect();
            self.store.create_table(FORMS_TABLE, &header).await?;
        }
        Ok(())
    }

    /// Provisions the response table before writing the form row, so a failed
    /// provisioning leaves no form behind.
    pub async fn create(&self, form: &SurveyForm) -> Result<()> {
        self.ensure_forms_table().await?;

        let responses = response_table_name(&form.id);
        self.store.create_table(&responses, &response_header(form)).await?;

        let row = form_to_row(form)?;
        if let Err(e) = self.store.append_row(FORMS_TABLE, row).await {
            tracing::error!("Form row append failed for {}: {}", form.id, e);
            if let Err(cleanup) = self.store.drop_table(&responses).await {
                tracing::warn!("Could not remove {} after failed create: {}", responses, cleanup);
            }
            return Err(e.into());
        }
        tracing::info!("Created form {} with {} fields", form.id, form.fields.len());
        Ok(())
    }

    /// Read failures degrade to an empty list.
    pub async fn get_all(&self) -> Vec<SurveyForm> {
        match self.store.read_rows(FORMS_TABLE).await {
            Ok(rows) => data_rows(&rows).iter().map(row_to_form).collect(),
            Err(e) => {
                tracing::error!("Error fetching forms: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_by_id(&self, id: &str) -> Option<SurveyForm> {
        self.get_all().await.into_iter().find(|f| f.id == id)
    }

    /// Position of the form among data rows, by a fresh scan.
    async fn find_data_index(&self, id: &str) -> Option<usize> {
        self.get_all().await.iter().position(|f| f.id == id)
    }

    /// Overwrites the form's row in place. No write happens when the id is absent.
    pub async fn update(&self, form: &SurveyForm) -> Result<()> {
        let index = self.find_data_index(&form.id).await.ok_or(FormsError::NotFound)?;
        let row = form_to_row(form)?;
        self.store.write_row(FORMS_TABLE, sheet_row_index(index), row).await?;
        tracing::info!("Updated form {}", form.id);
        Ok(())
    }

    /// Removes the form row, then its response table.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let index = self.find_data_index(id).await.ok_or(FormsError::NotFound)?;
        self.store.delete_row(FORMS_TABLE, sheet_row_index(index)).await?;

        let responses = response_table_name(id);
        if let Err(e) = self.store.drop_table(&responses).await {
            tracing::warn!("Form {} deleted but {} remains: {}", id, responses, e);
        }
        tracing::info!("Deleted form {}", id);
        Ok(())
    }

    /// Appends one answer row. Columns follow `form.fields` as given, which
    /// only lines up with the header if the fields were not reordered or
    /// extended since creation.
    pub async fn submit_response(&self, submission: &FormSubmission, form: &SurveyForm) -> Result<()> {
        let responses = response_table_name(&form.id);
        self.store
            .append_row(&responses, submission_to_row(submission, form))
            .await?;
        tracing::info!("Stored submission {} for form {}", submission.id, form.id);
        Ok(())
    }

    pub async fn responses(&self, form_id: &str) -> Result<ResponseSheet> {
        let rows = self.store.read_rows(&response_table_name(form_id)).await?;
        Ok(ResponseSheet {
            headers: rows.first().cloned().unwrap_or_default(),
            rows: data_rows(&rows).to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::MemoryStore;
    use crate::types::{AnswerMap, AnswerValue, FieldType, ValidationKind};

    fn field(id: &str, label: &str, field_type: FieldType) -> FieldDefinition {
        FieldDefinition {
            id: id.into(),
            field_type,
            label: label.into(),
            description: None,
            placeholder: None,
            required: false,
            validation: ValidationKind::String,
            options: field_type.needs_options().then(|| vec!["A".into(), "B".into()]),
        }
    }

    fn form(id: &str) -> SurveyForm {
        SurveyForm {
            id: id.into(),
            title: format!("Title {}", id),
            description: "D".into(),
            fields: vec![
                field("q1", "Name", FieldType::Text),
                field("q2", "Colours", FieldType::Checkbox),
                field("q3", "Notes", FieldType::Textarea),
            ],
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn repo() -> (Arc<MemoryStore>, FormRepository) {
        let store = Arc::new(MemoryStore::new());
        let repository = FormRepository::new(store.clone());
        (store, repository)
    }

    fn ids(forms: &[SurveyForm]) -> Vec<&str> {
        forms.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_header_offset_is_one_row() {
        assert_eq!(sheet_row_index(0), 1);
        assert_eq!(sheet_row_index(2), 3);
        let rows: Vec<Row> = vec![vec!["H".into()], vec!["a".into()], vec!["b".into()]];
        assert_eq!(data_rows(&rows)[1], rows[sheet_row_index(1)]);
        assert!(data_rows(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips_fields() {
        let (store, repo) = repo();
        let original = form("f1");
        repo.create(&original).await.unwrap();

        let loaded = repo.get_by_id("f1").await.unwrap();
        assert_eq!(loaded, original);

        let header = store.read_rows("Responses_f1").await.unwrap();
        assert_eq!(header, vec![vec!["ID", "SubmittedAt", "Name", "Colours", "Notes"]]);
        let forms_header = store.read_rows(FORMS_TABLE).await.unwrap();
        assert_eq!(forms_header[0], FORMS_HEADER.to_vec());
    }

    #[tokio::test]
    async fn test_delete_middle_row_removes_exactly_that_form() {
        let (store, repo) = repo();
        for id in ["a", "b", "c"] {
            repo.create(&form(id)).await.unwrap();
        }

        repo.delete("b").await.unwrap();

        let remaining = repo.get_all().await;
        assert_eq!(ids(&remaining), vec!["a", "c"]);
        assert!(repo.get_by_id("b").await.is_none());
        assert_eq!(store.row_count(FORMS_TABLE).await, Some(3));
        assert!(!store.table_exists("Responses_b").await.unwrap());
        assert!(store.table_exists("Responses_a").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_first_and_last_rows() {
        let (_store, repo) = repo();
        for id in ["a", "b", "c"] {
            repo.create(&form(id)).await.unwrap();
        }
        repo.delete("a").await.unwrap();
        assert_eq!(ids(&repo.get_all().await), vec!["b", "c"]);
        repo.delete("c").await.unwrap();
        assert_eq!(ids(&repo.get_all().await), vec!["b"]);
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_response_table_is_gone() {
        let (store, repo) = repo();
        for id in ["a", "b"] {
            repo.create(&form(id)).await.unwrap();
        }
        store.drop_table("Responses_a").await.unwrap();

        repo.delete("a").await.unwrap();

        assert!(repo.get_by_id("a").await.is_none());
        assert_eq!(ids(&repo.get_all().await), vec!["b"]);
        assert!(store.table_exists("Responses_b").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_overwrites_matching_row_only() {
        let (_store, repo) = repo();
        for id in ["a", "b", "c"] {
            repo.create(&form(id)).await.unwrap();
        }

        let mut edited = form("b");
        edited.title = "Edited".into();
        edited.fields.truncate(1);
        edited.updated_at = "2026-02-01T00:00:00Z".into();
        repo.update(&edited).await.unwrap();

        let all = repo.get_all().await;
        assert_eq!(ids(&all), vec!["a", "b", "c"]);
        assert_eq!(all[1], edited);
        assert_eq!(all[0], form("a"));
        assert_eq!(all[2], form("c"));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found_and_writes_nothing() {
        let (_store, repo) = repo();
        repo.create(&form("a")).await.unwrap();
        let before = repo.get_all().await;

        let err = repo.update(&form("missing")).await.unwrap_err();
        assert!(matches!(err, FormsError::NotFound));
        assert_eq!(repo.get_all().await, before);

        assert!(matches!(repo.delete("missing").await, Err(FormsError::NotFound)));
    }

    #[tokio::test]
    async fn test_malformed_fields_cell_reads_as_empty() {
        let (store, repo) = repo();
        repo.create(&form("a")).await.unwrap();
        store
            .append_row(FORMS_TABLE, vec!["broken".into(), "T".into(), "D".into(), "{not json".into()])
            .await
            .unwrap();

        let all = repo.get_all().await;
        assert_eq!(all.len(), 2);
        assert!(all[1].fields.is_empty());
        assert_eq!(all[1].created_at, "");
        assert_eq!(all[0].fields.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_forms_table_reads_empty() {
        let (_store, repo) = repo();
        assert!(repo.get_all().await.is_empty());
        assert!(repo.get_by_id("x").await.is_none());
    }

    #[tokio::test]
    async fn test_submission_row_follows_field_order() {
        let (store, repo) = repo();
        let f = form("a");
        repo.create(&f).await.unwrap();

        let mut data = AnswerMap::new();
        data.insert("q2".into(), AnswerValue::List(vec!["B".into(), "A".into()]));
        data.insert("q1".into(), "Ada".into());
        let submission = FormSubmission {
            id: "s1".into(),
            form_id: "a".into(),
            data,
            submitted_at: "2026-03-01T00:00:00Z".into(),
        };
        repo.submit_response(&submission, &f).await.unwrap();

        let rows = store.read_rows("Responses_a").await.unwrap();
        assert_eq!(rows[1], vec!["s1", "2026-03-01T00:00:00Z", "Ada", "B, A", ""]);

        let sheet = repo.responses("a").await.unwrap();
        assert_eq!(sheet.headers.len(), 5);
        assert_eq!(sheet.rows, vec![rows[1].clone()]);
    }

    #[tokio::test]
    async fn test_failed_provisioning_leaves_no_form_row() {
        let (store, repo) = repo();
        // Response table already exists, so provisioning fails.
        store.create_table("Responses_dup", &["X".to_string()]).await.unwrap();

        assert!(matches!(repo.create(&form("dup")).await, Err(FormsError::Upstream(_))));
        assert!(repo.get_by_id("dup").await.is_none());
    }
}
