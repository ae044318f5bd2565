//! Integration tests for `SqliteStore` against an in-memory database.

use std::{
  pin::pin,
  task::{Context, Waker},
};

use carebase_core::{
  Classify, ErrorKind,
  hospice::{self, DISEASE, MEDICAL_HISTORY, MEDICATION_RECORD, PATIENT, SURGICAL_HISTORY},
  intake::IntakeForm,
  operation::Operation,
  store::{RecordStore, SqlResult},
  value::{FieldValues, PrimaryKey, ResultSet, Row, Value, fields},
};

use crate::{SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn patient(number: &str, name: &str) -> FieldValues {
  fields([("patient_number", number), ("patient_name", name)])
}

/// A complete patient snapshot in stored form.
fn patient_row(number: &str, name: &str) -> Row {
  Row {
    table:  PATIENT.into(),
    key:    number.into(),
    values: fields([
      ("patient_number", Value::from(number)),
      ("patient_name", Value::from(name)),
      ("birth_date", Value::Null),
      ("civil_status", Value::from("S")),
      ("occupation", Value::Null),
      ("religion", Value::Null),
      ("education", Value::from("N")),
      ("contact", Value::Null),
      ("emergency_phone", Value::Null),
      ("relationship", Value::Null),
    ]),
  }
}

fn history(number: &str, code: &str) -> FieldValues {
  fields([
    ("patient_number", number),
    ("illness_code", code),
    ("detection_date", "2020-01-15"),
  ])
}

fn surgery(number: &str, name: &str) -> FieldValues {
  fields([("patient_number", number), ("surgery", name)])
}

fn medication(number: &str, medicine: &str, surgery_id: Option<i64>) -> FieldValues {
  fields([
    ("patient_number", Value::from(number)),
    ("medicine", Value::from(medicine)),
    ("surgery_id", Value::from(surgery_id)),
  ])
}

/// Every row of every table, for whole-store comparisons.
async fn snapshot(s: &SqliteStore) -> Vec<ResultSet> {
  let mut out = Vec::new();
  for table in s.registry().tables() {
    out.push(s.list_rows(&table.name).await.unwrap());
  }
  out
}

async fn count(s: &SqliteStore, table: &str) -> usize {
  s.list_rows(table).await.unwrap().len()
}

// ─── Open & seed ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn open_seeds_masterlist_only() {
  let s = store().await;
  assert_eq!(count(&s, DISEASE).await, 10);
  assert_eq!(count(&s, PATIENT).await, 0);

  let status = s.history_status().await.unwrap();
  assert_eq!((status.undo_depth, status.redo_depth), (0, 0));
}

#[tokio::test]
async fn demo_data_is_seeded_outside_history() {
  let options = StoreOptions { seed_demo_data: true, ..StoreOptions::default() };
  let s = SqliteStore::open_in_memory_with(hospice::catalog().unwrap(), options)
    .await
    .unwrap();

  assert_eq!(count(&s, PATIENT).await, 4);
  assert_eq!(count(&s, MEDICAL_HISTORY).await, 11);
  assert_eq!(count(&s, SURGICAL_HISTORY).await, 4);
  assert_eq!(s.history_status().await.unwrap().undo_depth, 0);

  let credential = s.get_admin_view("patient_credential").await.unwrap();
  assert_eq!(credential.len(), 4);
  assert_eq!(credential.get(0, "illness_codes"), Some(&Value::from("TB, SH, BD")));
  assert_eq!(
    credential.get(0, "surgeries"),
    Some(&Value::from("Laparoscopic, Spinal Fusion"))
  );
  assert_eq!(credential.get(1, "surgeries"), Some(&Value::Null));
}

// ─── Structured writes ───────────────────────────────────────────────────────

#[tokio::test]
async fn insert_returns_key_and_validates() {
  let s = store().await;
  let key = s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  assert_eq!(key, PrimaryKey::from("1"));

  let row = s.get_row(PATIENT, key).await.unwrap().unwrap();
  assert_eq!(row.get("civil_status"), Some(&Value::from("S")));
  assert_eq!(row.get("education"), Some(&Value::from("N")));

  let err = s.submit_insert(PATIENT, patient("123456", "Too Long")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Constraint);

  let err = s.submit_insert(PATIENT, patient("1", "Duplicate")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Constraint);

  let err = s
    .submit_insert(PATIENT, fields([("patient_number", "2"), ("nickname", "x")]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Schema);

  let err = s.submit_insert("ward", patient("3", "x")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Schema);

  assert_eq!(s.history_status().await.unwrap().undo_depth, 1);
}

#[tokio::test]
async fn auto_keys_are_assigned() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  let first = s.submit_insert(SURGICAL_HISTORY, surgery("1", "Appendectomy")).await.unwrap();
  let second = s.submit_insert(SURGICAL_HISTORY, surgery("1", "Bypass")).await.unwrap();
  assert_eq!(first, PrimaryKey::from(1_i64));
  assert_eq!(second, PrimaryKey::from(2_i64));
}

#[tokio::test]
async fn foreign_keys_are_enforced_on_insert() {
  let s = store().await;
  let err = s.submit_insert(MEDICAL_HISTORY, history("9", "TB")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Constraint);
  assert_eq!(s.history_status().await.unwrap().undo_depth, 0);
}

#[tokio::test]
async fn update_changes_row_and_undoes() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  s.submit_update(PATIENT, "1".into(), fields([("patient_name", "Ana Cruz"), ("civil_status", "M")]))
    .await
    .unwrap();

  let row = s.get_row(PATIENT, "1".into()).await.unwrap().unwrap();
  assert_eq!(row.get("patient_name"), Some(&Value::from("Ana Cruz")));

  s.undo().await.unwrap();
  let row = s.get_row(PATIENT, "1".into()).await.unwrap().unwrap();
  assert_eq!(row.get("patient_name"), Some(&Value::from("Ana")));
  assert_eq!(row.get("civil_status"), Some(&Value::from("S")));
}

#[tokio::test]
async fn update_rejects_key_change_and_missing_rows() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();

  let err = s
    .submit_update(PATIENT, "1".into(), fields([("patient_number", "2")]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Schema);

  let err = s
    .submit_update(PATIENT, "7".into(), fields([("patient_name", "Nobody")]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let err = s
    .submit_update(PATIENT, "1".into(), fields([("civil_status", "X")]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Constraint);
}

// ─── Undo / redo ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn undoing_every_commit_restores_initial_state() {
  let s = store().await;
  let initial = snapshot(&s).await;

  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  s.submit_insert(MEDICAL_HISTORY, history("1", "TB")).await.unwrap();
  s.submit_insert(SURGICAL_HISTORY, surgery("1", "Appendectomy")).await.unwrap();
  s.submit_update(PATIENT, "1".into(), fields([("religion", "None")])).await.unwrap();
  s.submit_delete(DISEASE, "FL".into()).await.unwrap();

  for _ in 0..5 {
    s.undo().await.unwrap();
  }
  assert_eq!(snapshot(&s).await, initial);

  let err = s.undo().await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::EmptyHistory);
}

#[tokio::test]
async fn undo_then_redo_reproduces_state() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  s.submit_insert(PATIENT, patient("2", "Ben")).await.unwrap();
  s.submit_insert(SURGICAL_HISTORY, surgery("2", "Bypass")).await.unwrap();
  s.submit_delete(PATIENT, "1".into()).await.unwrap();
  let after = snapshot(&s).await;

  for k in 1..=4 {
    for _ in 0..k {
      s.undo().await.unwrap();
    }
    for _ in 0..k {
      s.redo().await.unwrap();
    }
    assert_eq!(snapshot(&s).await, after, "after {k} undos and redos");
  }

  let err = s.redo().await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::EmptyHistory);
}

#[tokio::test]
async fn new_commit_discards_redo() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  s.undo().await.unwrap();
  s.submit_insert(PATIENT, patient("2", "Ben")).await.unwrap();

  let err = s.redo().await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::EmptyHistory);
  assert!(s.get_row(PATIENT, "1".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_commit_leaves_history_alone() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();

  let ghost = Row {
    table:  PATIENT.into(),
    key:    "9".into(),
    values: patient("9", "Ghost"),
  };
  let err = s.commit(Operation::Delete { row: ghost }).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let status = s.history_status().await.unwrap();
  assert_eq!(status.undo_depth, 1);
  assert_eq!(status.next_undo.as_deref(), Some("insert patient 1"));
}

#[tokio::test]
async fn committed_operation_can_be_undone() {
  let s = store().await;
  let row = patient_row("5", "Eve");
  s.commit(Operation::Insert { row: row.clone() }).await.unwrap();
  assert_eq!(s.get_row(PATIENT, "5".into()).await.unwrap(), Some(row));

  s.undo().await.unwrap();
  assert!(s.get_row(PATIENT, "5".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn commit_rejects_snapshot_whose_key_disagrees_with_its_columns() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  let before = snapshot(&s).await;

  let mut row = patient_row("5", "Eve");
  row.key = "1".into();
  let err = s.commit(Operation::Insert { row }).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Constraint);
  assert_eq!(snapshot(&s).await, before);
  assert_eq!(s.history_status().await.unwrap().undo_depth, 1);

  // Undo still targets the row the recorded insert created.
  s.undo().await.unwrap();
  assert_eq!(count(&s, PATIENT).await, 0);
}

#[tokio::test]
async fn commit_rejects_values_not_in_stored_form() {
  let s = store().await;
  for (column, value) in [("birth_date", "03/14/1950"), ("civil_status", "Q")] {
    let mut row = patient_row("5", "Eve");
    row.values.insert(column.into(), value.into());
    let err = s.commit(Operation::Insert { row }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint, "{column}");
  }

  let mut partial = patient_row("5", "Eve");
  partial.values.remove("religion");
  let err = s.commit(Operation::Insert { row: partial }).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Constraint);

  assert_eq!(count(&s, PATIENT).await, 0);
  assert_eq!(s.history_status().await.unwrap().undo_depth, 0);
}

#[tokio::test]
async fn commit_rejects_stale_snapshots() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("5", "Eve")).await.unwrap();
  let current = s.get_row(PATIENT, "5".into()).await.unwrap().unwrap();

  let mut stale = current.clone();
  stale.values.insert("patient_name".into(), "Old Eve".into());
  let mut renamed = current.clone();
  renamed.values.insert("patient_name".into(), "New Eve".into());

  let update = Operation::Update { before: stale.clone(), after: renamed };
  assert_eq!(s.commit(update).await.unwrap_err().kind(), ErrorKind::Constraint);
  let delete = Operation::Delete { row: stale };
  assert_eq!(s.commit(delete).await.unwrap_err().kind(), ErrorKind::Constraint);

  let rekey = Operation::Update { before: current.clone(), after: patient_row("6", "Eve") };
  assert_eq!(s.commit(rekey).await.unwrap_err().kind(), ErrorKind::Constraint);

  let missing = Operation::Delete { row: patient_row("6", "Finn") };
  assert_eq!(s.commit(missing).await.unwrap_err().kind(), ErrorKind::NotFound);

  assert_eq!(s.get_row(PATIENT, "5".into()).await.unwrap(), Some(current.clone()));
  assert_eq!(s.history_status().await.unwrap().undo_depth, 1);

  s.commit(Operation::Delete { row: current }).await.unwrap();
  assert_eq!(count(&s, PATIENT).await, 0);
  s.undo().await.unwrap();
  assert_eq!(count(&s, PATIENT).await, 1);
}

#[tokio::test]
async fn abandoned_calls_still_reach_history() {
  let s = store().await;
  {
    let mut write = pin!(s.submit_insert(PATIENT, patient("1", "Ana")));
    let _ = write.as_mut().poll(&mut Context::from_waker(Waker::noop()));
  }
  // Queued behind the abandoned call on the connection thread.
  assert_eq!(count(&s, PATIENT).await, 1);
  assert_eq!(s.history_status().await.unwrap().undo_depth, 1);

  {
    let mut undo = pin!(s.undo());
    let _ = undo.as_mut().poll(&mut Context::from_waker(Waker::noop()));
  }
  assert_eq!(count(&s, PATIENT).await, 0);
  let status = s.history_status().await.unwrap();
  assert_eq!((status.undo_depth, status.redo_depth), (0, 1));

  s.redo().await.unwrap();
  assert_eq!(count(&s, PATIENT).await, 1);
}

// ─── Cascading deletes ───────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_patient_cascades_and_undo_restores() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  s.submit_insert(PATIENT, patient("2", "Ben")).await.unwrap();
  s.submit_insert(MEDICAL_HISTORY, history("1", "TB")).await.unwrap();
  s.submit_insert(MEDICAL_HISTORY, history("1", "DI")).await.unwrap();
  s.submit_insert(MEDICAL_HISTORY, history("2", "TB")).await.unwrap();
  s.submit_insert(SURGICAL_HISTORY, surgery("1", "Appendectomy")).await.unwrap();
  s.submit_insert(MEDICATION_RECORD, medication("1", "Insulin", None)).await.unwrap();
  let before = snapshot(&s).await;

  let removed = s.submit_delete(PATIENT, "1".into()).await.unwrap();
  assert_eq!(removed, 5);
  assert_eq!(count(&s, MEDICAL_HISTORY).await, 1);
  assert_eq!(count(&s, SURGICAL_HISTORY).await, 0);
  assert_eq!(count(&s, MEDICATION_RECORD).await, 0);
  assert_eq!(count(&s, DISEASE).await, 10);

  s.undo().await.unwrap();
  assert_eq!(snapshot(&s).await, before);
}

#[tokio::test]
async fn diamond_dependent_is_deleted_once() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  let surgery_key = s
    .submit_insert(SURGICAL_HISTORY, surgery("1", "Appendectomy"))
    .await
    .unwrap();
  let surgery_id = surgery_key.values()[0].as_integer();
  s.submit_insert(MEDICATION_RECORD, medication("1", "Morphine", surgery_id)).await.unwrap();

  let plan = s.preview_delete(PATIENT, "1".into()).await.unwrap();
  assert_eq!(plan.affected_count(), 3);
  assert_eq!(plan.counts_by_table().get(MEDICATION_RECORD), Some(&1));
  // Nothing was applied by the preview.
  assert_eq!(count(&s, MEDICATION_RECORD).await, 1);

  assert_eq!(s.submit_delete(PATIENT, "1".into()).await.unwrap(), 3);
  s.undo().await.unwrap();
  let restored = s.list_rows(MEDICATION_RECORD).await.unwrap();
  assert_eq!(restored.get(0, "surgery_id"), Some(&Value::Integer(1)));
}

#[tokio::test]
async fn referenced_disease_cannot_be_deleted() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  s.submit_insert(MEDICAL_HISTORY, history("1", "TB")).await.unwrap();

  let err = s.submit_delete(DISEASE, "TB".into()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Constraint);
  assert_eq!(count(&s, DISEASE).await, 10);

  assert_eq!(s.submit_delete(DISEASE, "FL".into()).await.unwrap(), 1);
}

#[tokio::test]
async fn deleting_missing_row_is_not_found() {
  let s = store().await;
  let err = s.submit_delete(PATIENT, "42".into()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_many_is_one_undo_unit() {
  let s = store().await;
  for (n, name) in [("1", "Ana"), ("2", "Ben"), ("3", "Cy")] {
    s.submit_insert(PATIENT, patient(n, name)).await.unwrap();
  }
  s.submit_insert(MEDICAL_HISTORY, history("2", "AS")).await.unwrap();

  let removed = s
    .submit_delete_many(PATIENT, vec!["1".into(), "2".into()])
    .await
    .unwrap();
  assert_eq!(removed, 3);
  assert_eq!(count(&s, PATIENT).await, 1);

  s.undo().await.unwrap();
  assert_eq!(count(&s, PATIENT).await, 3);
  assert_eq!(count(&s, MEDICAL_HISTORY).await, 1);
}

#[tokio::test]
async fn example_scenario_with_overview() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  s.submit_insert(MEDICAL_HISTORY, history("1", "DI")).await.unwrap();

  let overview = s.get_admin_view("patient_overview").await.unwrap();
  assert_eq!(overview.len(), 1);
  assert_eq!(overview.get(0, "disease_name"), Some(&Value::from("Diabetes")));

  let plan = s.preview_delete(PATIENT, "1".into()).await.unwrap();
  assert_eq!(plan.affected_count(), 2);
  assert!(plan.deletion_order().all(|r| r.table != DISEASE));

  s.submit_delete(PATIENT, "1".into()).await.unwrap();
  assert!(s.get_admin_view("patient_overview").await.unwrap().is_empty());

  s.undo().await.unwrap();
  let overview = s.get_admin_view("patient_overview").await.unwrap();
  assert_eq!(overview.get(0, "patient_name"), Some(&Value::from("Ana")));
  assert_eq!(overview.get(0, "illness_code"), Some(&Value::from("DI")));
  assert_eq!(overview.get(0, "detection_date"), Some(&Value::from("2020-01-15")));
}

// ─── Intake ──────────────────────────────────────────────────────────────────

fn intake() -> IntakeForm {
  IntakeForm {
    patient_number: "7".into(),
    patient_name: "Dana Reyes".into(),
    birth_date: "03/14/1950".into(),
    illness_codes: "TB, XQ".into(),
    disease_names: "Tuberculosis, Xeroderma".into(),
    detection_dates: "2020-01-01, 2021-06-30".into(),
    medicines_taken: "Rifampin, N/A".into(),
    surgeries: "Biopsy".into(),
    surgery_dates: "2021-07-01".into(),
    ..IntakeForm::default()
  }
}

#[tokio::test]
async fn intake_commits_one_undoable_unit() {
  let s = store().await;
  let before = snapshot(&s).await;

  let key = s.submit_intake(intake()).await.unwrap();
  assert_eq!(key, PrimaryKey::from("7"));
  assert_eq!(count(&s, DISEASE).await, 11);
  assert_eq!(count(&s, MEDICAL_HISTORY).await, 2);
  assert_eq!(count(&s, SURGICAL_HISTORY).await, 1);
  assert_eq!(count(&s, MEDICATION_RECORD).await, 1);

  let row = s.get_row(PATIENT, key).await.unwrap().unwrap();
  assert_eq!(row.get("birth_date"), Some(&Value::from("1950-03-14")));

  let status = s.history_status().await.unwrap();
  assert_eq!(status.undo_depth, 1);

  s.undo().await.unwrap();
  assert_eq!(snapshot(&s).await, before);
}

#[tokio::test]
async fn intake_update_replaces_details_as_one_unit() {
  let s = store().await;
  s.submit_intake(intake()).await.unwrap();
  let before = snapshot(&s).await;

  let form = IntakeForm {
    patient_name: "Dana R. Cruz".into(),
    illness_codes: "DI".into(),
    disease_names: "".into(),
    detection_dates: "2022-02-02".into(),
    medicines_taken: "Metformin".into(),
    surgeries: "".into(),
    surgery_dates: "".into(),
    ..intake()
  };
  s.submit_intake_update(form).await.unwrap();

  let row = s.get_row(PATIENT, "7".into()).await.unwrap().unwrap();
  assert_eq!(row.get("patient_name"), Some(&Value::from("Dana R. Cruz")));
  assert_eq!(row.get("birth_date"), Some(&Value::from("1950-03-14")));
  let histories = s.list_rows(MEDICAL_HISTORY).await.unwrap();
  assert_eq!(histories.len(), 1);
  assert_eq!(histories.get(0, "illness_code"), Some(&Value::from("DI")));
  assert_eq!(count(&s, SURGICAL_HISTORY).await, 0);
  assert_eq!(count(&s, MEDICATION_RECORD).await, 1);
  assert_eq!(count(&s, DISEASE).await, 11);

  let status = s.history_status().await.unwrap();
  assert_eq!(status.undo_depth, 2);
  let next = status.next_undo.unwrap_or_default();
  assert!(next.starts_with("update intake patient 7"), "{next}");

  s.undo().await.unwrap();
  assert_eq!(snapshot(&s).await, before);
  s.redo().await.unwrap();
  assert_eq!(count(&s, MEDICAL_HISTORY).await, 1);
  assert_eq!(count(&s, SURGICAL_HISTORY).await, 0);
}

#[tokio::test]
async fn intake_update_of_unknown_patient_is_not_found() {
  let s = store().await;
  let err = s.submit_intake_update(intake()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert_eq!(count(&s, PATIENT).await, 0);
  assert_eq!(s.history_status().await.unwrap().undo_depth, 0);
}

#[tokio::test]
async fn invalid_intake_writes_nothing() {
  let s = store().await;
  let form = IntakeForm { illness_codes: "TB, ZZ".into(), disease_names: "".into(), ..intake() };
  let err = s.submit_intake(form).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Constraint);
  assert_eq!(count(&s, PATIENT).await, 0);
  assert_eq!(s.history_status().await.unwrap().undo_depth, 0);
}

// ─── Raw SQL ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn read_only_sql_keeps_history() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();

  let report = s.run_sql("SELECT illness_code FROM disease ORDER BY illness_code;").await.unwrap();
  assert!(!report.history_invalidated);
  assert!(report.warning.is_none());
  let SqlResult::Rows(rows) = report.result else { panic!("expected rows") };
  assert_eq!(rows.len(), 10);
  assert_eq!(rows.columns, vec!["illness_code"]);

  s.undo().await.unwrap();
}

#[tokio::test]
async fn mutating_sql_invalidates_history() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();

  let report = s
    .run_sql("UPDATE patient SET religion = 'None' WHERE patient_number = '1'")
    .await
    .unwrap();
  assert!(report.history_invalidated);
  assert!(report.warning.is_some());
  assert_eq!(report.result, SqlResult::Affected(1));

  let err = s.undo().await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::EmptyHistory);
  assert_eq!(s.history_status().await.unwrap().invalidations, 1);
}

#[tokio::test]
async fn bad_sql_is_rejected_without_side_effects() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();

  for sql in [
    "",
    "   ;",
    "SELECT 1; DELETE FROM patient",
    "SELEC nonsense",
    "BEGIN",
    "INSERT INTO patient (patient_number) VALUES ('2')",
  ] {
    let err = s.run_sql(sql).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sql, "{sql:?}");
  }

  assert_eq!(count(&s, PATIENT).await, 1);
  assert_eq!(s.history_status().await.unwrap().undo_depth, 1);
}

#[tokio::test]
async fn view_reports_dropped_table() {
  let s = store().await;
  s.run_sql("DROP TABLE medication_record").await.unwrap();

  let err = s.get_admin_view("medication_overview").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::View);

  let err = s.get_admin_view("no_such_view").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::View);

  s.reset_all().await.unwrap();
  assert!(s.get_admin_view("medication_overview").await.unwrap().is_empty());
}

// ─── Reset ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_clears_rows_sequences_and_history() {
  let s = store().await;
  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  s.submit_insert(SURGICAL_HISTORY, surgery("1", "Appendectomy")).await.unwrap();
  s.submit_insert(SURGICAL_HISTORY, surgery("1", "Bypass")).await.unwrap();
  s.submit_delete(DISEASE, "FL".into()).await.unwrap();

  s.reset_all().await.unwrap();
  assert_eq!(count(&s, PATIENT).await, 0);
  assert_eq!(count(&s, SURGICAL_HISTORY).await, 0);
  assert_eq!(count(&s, DISEASE).await, 10);

  let err = s.undo().await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::EmptyHistory);

  s.submit_insert(PATIENT, patient("1", "Ana")).await.unwrap();
  let key = s.submit_insert(SURGICAL_HISTORY, surgery("1", "Bypass")).await.unwrap();
  assert_eq!(key, PrimaryKey::from(1_i64));
}

#[tokio::test]
async fn reset_without_reseed_leaves_masterlist_empty() {
  let options = StoreOptions { seed_masterlist: false, ..StoreOptions::default() };
  let s = SqliteStore::open_in_memory_with(hospice::catalog().unwrap(), options)
    .await
    .unwrap();
  assert_eq!(count(&s, DISEASE).await, 0);

  s.submit_insert(DISEASE, fields([("illness_code", "TB"), ("disease_name", "Tuberculosis")]))
    .await
    .unwrap();
  s.reset_all().await.unwrap();
  assert_eq!(count(&s, DISEASE).await, 0);
}
