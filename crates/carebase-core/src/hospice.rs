//! The hospice record schema: patients, their medical, surgical and medication
//! records, and the disease masterlist.
//!
//! ```text
//!   disease ◄──restrict── medical_history ──cascade──► patient
//!      ▲                                                 ▲  ▲
//!      └──restrict── medication_record ──cascade─────────┘  │
//!                           │                               │
//!                           └─cascade─► surgical_history ───┘
//! ```
//!
//! Deleting a patient reaches a medication record both directly and through
//! its surgery; it is planned once.

use crate::{
  Result,
  catalog::Catalog,
  intake::IntakeForm,
  schema::{Check, ColumnDef, ForeignKey, SchemaRegistry, TableDef},
  value::{FieldValues, fields},
  view::{JoinKind, ViewDefinition},
};

pub const DISEASE: &str = "disease";
pub const PATIENT: &str = "patient";
pub const MEDICAL_HISTORY: &str = "medical_history";
pub const SURGICAL_HISTORY: &str = "surgical_history";
pub const MEDICATION_RECORD: &str = "medication_record";

pub const CIVIL_STATUS_CODES: &[&str] = &["S", "M", "E", "CU", "W", "LA", "SP"];
pub const EDUCATION_CODES: &[&str] = &["N", "P", "GS", "JHS", "SHS", "UG", "MA", "DR"];

/// The complete hospice catalog: schema, admin views, and seed data.
pub fn catalog() -> Result<Catalog> {
  Catalog::new(registry()?, views())?
    .with_masterlist_seed(disease_seed())
    .map(|c| c.with_demo_intakes(demo_intakes()))
}

pub fn registry() -> Result<SchemaRegistry> {
  let mut reg = SchemaRegistry::new();

  reg.register(
    TableDef::new(DISEASE)
      .column(ColumnDef::text("illness_code").not_null().check(Check::MaxLen(3)))
      .column(ColumnDef::text("disease_name").not_null().check(Check::MaxLen(50)))
      .primary_key(["illness_code"])
      .masterlist(),
  )?;

  reg.register(
    TableDef::new(PATIENT)
      .column(ColumnDef::text("patient_number").not_null().check(Check::Digits(5)))
      .column(ColumnDef::text("patient_name").not_null().check(Check::MaxLen(100)))
      .column(ColumnDef::date("birth_date"))
      .column(
        ColumnDef::text("civil_status")
          .not_null()
          .default_value("S")
          .check(Check::one_of(CIVIL_STATUS_CODES)),
      )
      .column(ColumnDef::text("occupation").check(Check::MaxLen(20)))
      .column(ColumnDef::text("religion").check(Check::MaxLen(30)))
      .column(
        ColumnDef::text("education")
          .not_null()
          .default_value("N")
          .check(Check::one_of(EDUCATION_CODES)),
      )
      .column(ColumnDef::text("contact").check(Check::MaxLen(30)))
      .column(ColumnDef::text("emergency_phone").check(Check::MaxLen(14)))
      .column(ColumnDef::text("relationship").check(Check::MaxLen(30)))
      .primary_key(["patient_number"]),
  )?;

  reg.register(
    TableDef::new(MEDICAL_HISTORY)
      .column(ColumnDef::text("patient_number").not_null())
      .column(ColumnDef::text("illness_code").not_null())
      .column(ColumnDef::date("detection_date"))
      .primary_key(["patient_number", "illness_code"])
      .foreign_key(ForeignKey::cascade("patient_number", PATIENT, "patient_number"))
      .foreign_key(ForeignKey::restrict("illness_code", DISEASE, "illness_code")),
  )?;

  reg.register(
    TableDef::new(SURGICAL_HISTORY)
      .column(ColumnDef::integer("surgery_id"))
      .column(ColumnDef::text("patient_number").not_null())
      .column(ColumnDef::text("surgery").not_null().check(Check::MaxLen(30)))
      .column(ColumnDef::date("surgery_date"))
      .primary_key(["surgery_id"])
      .foreign_key(ForeignKey::cascade("patient_number", PATIENT, "patient_number")),
  )?;

  reg.register(
    TableDef::new(MEDICATION_RECORD)
      .column(ColumnDef::integer("record_id"))
      .column(ColumnDef::text("patient_number").not_null())
      .column(ColumnDef::text("medicine").not_null().check(Check::MaxLen(60)))
      .column(ColumnDef::text("illness_code"))
      .column(ColumnDef::integer("surgery_id"))
      .column(ColumnDef::date("prescribed_on"))
      .primary_key(["record_id"])
      .foreign_key(ForeignKey::cascade("patient_number", PATIENT, "patient_number"))
      .foreign_key(ForeignKey::restrict("illness_code", DISEASE, "illness_code"))
      .foreign_key(ForeignKey::cascade("surgery_id", SURGICAL_HISTORY, "surgery_id")),
  )?;

  Ok(reg)
}

pub fn views() -> Vec<ViewDefinition> {
  let patient_overview = ViewDefinition::new("patient_overview", PATIENT)
    .join(
      JoinKind::Left,
      MEDICAL_HISTORY,
      (MEDICAL_HISTORY, "patient_number"),
      (PATIENT, "patient_number"),
    )
    .join(
      JoinKind::Left,
      DISEASE,
      (MEDICAL_HISTORY, "illness_code"),
      (DISEASE, "illness_code"),
    )
    .column((PATIENT, "patient_number"), "patient_number")
    .column((PATIENT, "patient_name"), "patient_name")
    .column((PATIENT, "birth_date"), "birth_date")
    .column((PATIENT, "civil_status"), "civil_status")
    .column((PATIENT, "education"), "education")
    .column((MEDICAL_HISTORY, "illness_code"), "illness_code")
    .column((DISEASE, "disease_name"), "disease_name")
    .column((MEDICAL_HISTORY, "detection_date"), "detection_date")
    .order_by((PATIENT, "patient_number"))
    .order_by((MEDICAL_HISTORY, "illness_code"));

  let surgery_overview = ViewDefinition::new("surgery_overview", PATIENT)
    .join(
      JoinKind::Inner,
      SURGICAL_HISTORY,
      (SURGICAL_HISTORY, "patient_number"),
      (PATIENT, "patient_number"),
    )
    .column((PATIENT, "patient_number"), "patient_number")
    .column((PATIENT, "patient_name"), "patient_name")
    .column((SURGICAL_HISTORY, "surgery_id"), "surgery_id")
    .column((SURGICAL_HISTORY, "surgery"), "surgery")
    .column((SURGICAL_HISTORY, "surgery_date"), "surgery_date")
    .order_by((PATIENT, "patient_number"))
    .order_by((SURGICAL_HISTORY, "surgery_id"));

  let medication_overview = ViewDefinition::new("medication_overview", MEDICATION_RECORD)
    .join(
      JoinKind::Inner,
      PATIENT,
      (MEDICATION_RECORD, "patient_number"),
      (PATIENT, "patient_number"),
    )
    .join(
      JoinKind::Left,
      DISEASE,
      (MEDICATION_RECORD, "illness_code"),
      (DISEASE, "illness_code"),
    )
    .join(
      JoinKind::Left,
      SURGICAL_HISTORY,
      (MEDICATION_RECORD, "surgery_id"),
      (SURGICAL_HISTORY, "surgery_id"),
    )
    .column((MEDICATION_RECORD, "record_id"), "record_id")
    .column((PATIENT, "patient_number"), "patient_number")
    .column((PATIENT, "patient_name"), "patient_name")
    .column((MEDICATION_RECORD, "medicine"), "medicine")
    .column((MEDICATION_RECORD, "illness_code"), "illness_code")
    .column((DISEASE, "disease_name"), "disease_name")
    .column((SURGICAL_HISTORY, "surgery"), "surgery")
    .column((MEDICATION_RECORD, "prescribed_on"), "prescribed_on")
    .order_by((MEDICATION_RECORD, "record_id"));

  let patient_credential = ViewDefinition::new("patient_credential", PATIENT)
    .column((PATIENT, "patient_number"), "patient_number")
    .column((PATIENT, "patient_name"), "patient_name")
    .column((PATIENT, "birth_date"), "birth_date")
    .column((PATIENT, "civil_status"), "civil_status")
    .column((PATIENT, "occupation"), "occupation")
    .column((PATIENT, "religion"), "religion")
    .column((PATIENT, "education"), "education")
    .collect((MEDICAL_HISTORY, "illness_code"), "illness_codes")
    .collect((MEDICAL_HISTORY, "detection_date"), "detection_dates")
    .collect((MEDICATION_RECORD, "medicine"), "medicines_taken")
    .collect((SURGICAL_HISTORY, "surgery"), "surgeries")
    .collect((SURGICAL_HISTORY, "surgery_date"), "surgery_dates")
    .column((PATIENT, "contact"), "contact")
    .column((PATIENT, "emergency_phone"), "emergency_phone")
    .column((PATIENT, "relationship"), "relationship")
    .order_by((PATIENT, "patient_number"));

  vec![patient_overview, surgery_overview, medication_overview, patient_credential]
}

pub fn disease_seed() -> Vec<(String, FieldValues)> {
  [
    ("TB", "Tuberculosis"),
    ("SH", "Shingles"),
    ("BD", "Brain Damage"),
    ("CC", "Cancer"),
    ("GNR", "Gonorrhea"),
    ("DI", "Diabetes"),
    ("PN", "Pneumonia"),
    ("AS", "Asthma"),
    ("FL", "Flu"),
    ("BR", "Bronchitis"),
  ]
  .into_iter()
  .map(|(code, name)| {
    (DISEASE.to_owned(), fields([("illness_code", code), ("disease_name", name)]))
  })
  .collect()
}

pub fn demo_intakes() -> Vec<IntakeForm> {
  vec![
    IntakeForm {
      patient_number:  "1".into(),
      patient_name:    "Carl Jayvin Lee".into(),
      birth_date:      "2004-08-16".into(),
      civil_status:    "S".into(),
      occupation:      "Student".into(),
      religion:        "Buddhism".into(),
      education:       "P".into(),
      contact:         "Chrysler Lee".into(),
      emergency_phone: "+234912345678".into(),
      relationship:    "Brother".into(),
      illness_codes:   "TB, SH, BD".into(),
      disease_names:   "Tuberculosis, Shingles, Brain Damage".into(),
      detection_dates: "2012-12-02, 2018-04-27, 2022-09-02".into(),
      medicines_taken: "Rifampin, Acyclovir, Aspirin".into(),
      surgeries:       "Laparoscopic, Spinal Fusion, N/A".into(),
      surgery_dates:   "2022-02-22, 2022-02-23, N/A".into(),
    },
    IntakeForm {
      patient_number:  "2".into(),
      patient_name:    "Vinjireh Caasi".into(),
      birth_date:      "2005-09-06".into(),
      civil_status:    "S".into(),
      occupation:      "Student".into(),
      religion:        "Christianity".into(),
      education:       "JHS".into(),
      contact:         "Anna Lynn Caasi".into(),
      emergency_phone: "+639150533867".into(),
      relationship:    "Mother".into(),
      illness_codes:   "CC, GNR".into(),
      disease_names:   "Cancer, Gonorrhea".into(),
      detection_dates: "2010-08-16, 2012-09-06".into(),
      medicines_taken: "Niacinamide, Salycilic Acid".into(),
      surgeries:       "N/A, N/A".into(),
      surgery_dates:   "N/A, N/A".into(),
    },
    IntakeForm {
      patient_number:  "3".into(),
      patient_name:    "Bouie Martinez".into(),
      birth_date:      "2005-02-10".into(),
      civil_status:    "S".into(),
      occupation:      "Student".into(),
      religion:        "Muslim".into(),
      education:       "SHS".into(),
      contact:         "Abegail Martinez".into(),
      emergency_phone: "+639219733059".into(),
      relationship:    "Mother".into(),
      illness_codes:   "BD, DI".into(),
      disease_names:   "Brain Damage, Diabetes".into(),
      detection_dates: "2022-03-12, 2024-08-13".into(),
      medicines_taken: "Aspirin, Insulin".into(),
      surgeries:       "Toe Amputation, N/A".into(),
      surgery_dates:   "2025-03-25, N/A".into(),
    },
    IntakeForm {
      patient_number:  "4".into(),
      patient_name:    "Hans Naperi".into(),
      birth_date:      "2005-07-28".into(),
      civil_status:    "M".into(),
      occupation:      "Student".into(),
      religion:        "Jehovah's Witness".into(),
      education:       "UG".into(),
      contact:         "Mary Ann Naperi".into(),
      emergency_phone: "+639157909485".into(),
      relationship:    "Mother".into(),
      illness_codes:   "PN, AS, FL, BR".into(),
      disease_names:   "Pneumonia, Asthma, Flu, Bronchitis".into(),
      detection_dates: "2021-12-25, 2022-08-06, 2023-11-15, 2025-01-03".into(),
      medicines_taken: "Medicol, Ascorbic Acid, Salbutamol, Paracetamol".into(),
      surgeries:       "N/A, N/A, Tonsillectomy, N/A".into(),
      surgery_dates:   "N/A, N/A, 2023-10-10, N/A".into(),
    },
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalog_builds_and_views_validate() {
    let catalog = catalog().unwrap();
    assert_eq!(catalog.registry.tables().len(), 5);
    assert_eq!(
      catalog.view_names(),
      vec!["patient_overview", "surgery_overview", "medication_overview", "patient_credential"]
    );
    assert!(catalog.view("nope").is_err());
    assert_eq!(catalog.masterlist_seed.len(), 10);
  }

  #[test]
  fn patient_delete_order_covers_the_diamond() {
    let reg = registry().unwrap();
    let order = reg.topological_delete_order(PATIENT).unwrap();
    let pos = |t: &str| order.iter().position(|o| *o == t).unwrap();
    assert_eq!(order.len(), 4);
    assert!(pos(MEDICATION_RECORD) < pos(SURGICAL_HISTORY));
    assert_eq!(*order.last().unwrap(), PATIENT);
    assert!(!order.contains(&DISEASE));
  }

  #[test]
  fn full_delete_order_ends_with_roots() {
    let reg = registry().unwrap();
    let order = reg.delete_order();
    let pos = |t: &str| order.iter().position(|o| *o == t).unwrap();
    assert_eq!(order.len(), 5);
    assert!(pos(MEDICAL_HISTORY) < pos(DISEASE));
    assert!(pos(MEDICATION_RECORD) < pos(PATIENT));
  }

  #[test]
  fn demo_intakes_pass_row_validation() {
    let reg = registry().unwrap();
    for form in demo_intakes() {
      let plan = form.plan().unwrap();
      reg.table(PATIENT).unwrap().prepare_insert(plan.patient).unwrap();
      for row in plan.surgeries {
        reg.table(SURGICAL_HISTORY).unwrap().prepare_insert(row).unwrap();
      }
    }
  }
}
