//! Patient intake: one denormalized form, split into normalized rows.
//!
//! Multi-valued fields are comma separated and aligned by position, so the
//! third illness code goes with the third detection date and the third
//! medicine. Short lists are padded with [`NOT_APPLICABLE`].

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  value::{FieldValues, Value},
};

pub const NOT_APPLICABLE: &str = "N/A";

/// A patient intake form as entered in the front-end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeForm {
  pub patient_number:  String,
  pub patient_name:    String,
  pub birth_date:      String,
  pub civil_status:    String,
  pub occupation:      String,
  pub religion:        String,
  pub education:       String,
  pub contact:         String,
  pub emergency_phone: String,
  pub relationship:    String,

  /// Comma separated, aligned with `disease_names`, `detection_dates` and
  /// `medicines_taken`.
  pub illness_codes:   String,
  pub disease_names:   String,
  pub detection_dates: String,
  pub medicines_taken: String,
  /// Comma separated, aligned with `surgery_dates`.
  pub surgeries:       String,
  pub surgery_dates:   String,
}

/// Split aligned comma-separated fields into records of equal width.
///
/// Each returned record has one entry per input field. The record count is the
/// longest list; shorter lists are padded with [`NOT_APPLICABLE`]. An empty
/// field contributes an empty list.
pub fn normalize_multi_values(fields: &[&str]) -> Vec<Vec<String>> {
  let lists: Vec<Vec<String>> = fields
    .iter()
    .map(|f| {
      if f.trim().is_empty() {
        Vec::new()
      } else {
        f.split(',').map(|v| v.trim().to_owned()).collect()
      }
    })
    .collect();
  let width = lists.iter().map(Vec::len).max().unwrap_or(0);

  (0..width)
    .map(|i| {
      lists
        .iter()
        .map(|l| l.get(i).cloned().unwrap_or_else(|| NOT_APPLICABLE.to_owned()))
        .collect()
    })
    .collect()
}

fn is_applicable(value: &str) -> bool {
  !value.is_empty() && !value.eq_ignore_ascii_case(NOT_APPLICABLE)
}

/// Blank and `N/A` entries become `Null`.
fn optional(value: &str) -> Value {
  let value = value.trim();
  if is_applicable(value) { Value::from(value) } else { Value::Null }
}

/// The normalized rows an intake form produces, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakePlan {
  pub patient:           FieldValues,
  /// `(illness_code, disease_name)` pairs to insert into the masterlist if
  /// missing.
  pub diseases:          Vec<(String, Option<String>)>,
  pub medical_histories: Vec<FieldValues>,
  pub surgeries:         Vec<FieldValues>,
  pub medications:       Vec<FieldValues>,
}

impl IntakeForm {
  /// Normalize the form. Column-level validation happens later, when each row
  /// is prepared against its table.
  pub fn plan(&self) -> Result<IntakePlan> {
    let number = self.patient_number.trim();
    if number.is_empty() {
      return Err(Error::Constraint("patient number is required".into()));
    }
    if self.patient_name.trim().is_empty() {
      return Err(Error::Constraint("patient name is required".into()));
    }

    let mut patient = FieldValues::new();
    for (column, value) in [
      ("patient_number", number),
      ("patient_name", self.patient_name.trim()),
      ("birth_date", self.birth_date.as_str()),
      ("occupation", self.occupation.as_str()),
      ("religion", self.religion.as_str()),
      ("contact", self.contact.as_str()),
      ("emergency_phone", self.emergency_phone.as_str()),
      ("relationship", self.relationship.as_str()),
    ] {
      patient.insert(column.to_owned(), optional(value));
    }
    // Left out when blank so the column defaults apply.
    for (column, value) in [("civil_status", &self.civil_status), ("education", &self.education)] {
      if is_applicable(value.trim()) {
        patient.insert(column.to_owned(), value.trim().into());
      }
    }

    let mut plan = IntakePlan { patient, ..IntakePlan::default() };

    let illnesses = normalize_multi_values(&[
      self.illness_codes.as_str(),
      self.disease_names.as_str(),
      self.detection_dates.as_str(),
      self.medicines_taken.as_str(),
    ]);
    for record in illnesses {
      let [code, name, detected, medicine] = <[String; 4]>::try_from(record)
        .map_err(|_| Error::Schema("malformed illness record".into()))?;
      if !is_applicable(&code) {
        continue;
      }
      if !plan.diseases.iter().any(|(c, _)| *c == code) {
        plan
          .diseases
          .push((code.clone(), is_applicable(&name).then(|| name.clone())));
      }
      plan.medical_histories.push(FieldValues::from([
        ("patient_number".to_owned(), number.into()),
        ("illness_code".to_owned(), code.as_str().into()),
        ("detection_date".to_owned(), optional(&detected)),
      ]));
      if is_applicable(&medicine) {
        plan.medications.push(FieldValues::from([
          ("patient_number".to_owned(), number.into()),
          ("medicine".to_owned(), medicine.into()),
          ("illness_code".to_owned(), code.into()),
          ("prescribed_on".to_owned(), optional(&detected)),
        ]));
      }
    }

    for record in normalize_multi_values(&[self.surgeries.as_str(), self.surgery_dates.as_str()]) {
      let [surgery, date] = <[String; 2]>::try_from(record)
        .map_err(|_| Error::Schema("malformed surgery record".into()))?;
      if !is_applicable(&surgery) {
        continue;
      }
      plan.surgeries.push(FieldValues::from([
        ("patient_number".to_owned(), number.into()),
        ("surgery".to_owned(), surgery.into()),
        ("surgery_date".to_owned(), optional(&date)),
      ]));
    }

    Ok(plan)
  }
}
