//! Writing a normalized intake plan.

use carebase_core::{
  cascade::{self, RowLookup as _},
  hospice::{DISEASE, MEDICAL_HISTORY, MEDICATION_RECORD, PATIENT, SURGICAL_HISTORY},
  intake::IntakePlan,
  operation::Operation,
  schema::SchemaRegistry,
  value::{FieldValues, PrimaryKey, fields},
};
use rusqlite::Connection;

use crate::{
  Result,
  apply::{apply_steps, insert_new},
  lookup::ConnLookup,
};

/// Insert every row of `plan` and return the patient key with the batch
/// operation that undoes it. Diseases already in the masterlist are left
/// alone.
pub fn apply_intake(
  conn: &Connection,
  registry: &SchemaRegistry,
  mut plan: IntakePlan,
) -> Result<(PrimaryKey, Operation)> {
  let mut operations = Vec::new();
  let def = registry.table(PATIENT)?;
  let row = insert_new(conn, def, def.prepare_insert(std::mem::take(&mut plan.patient))?)?;
  let patient = row.key.clone();
  operations.push(Operation::Insert { row });

  insert_details(conn, registry, plan, &mut operations)?;

  let label = format!("intake patient {patient}");
  Ok((patient, Operation::Batch { label, operations }))
}

/// Rewrite an existing patient from `plan`: update the profile, delete the
/// rows that depend on the patient, then insert the plan's rows in their
/// place.
pub fn apply_intake_update(
  conn: &Connection,
  registry: &SchemaRegistry,
  mut plan: IntakePlan,
) -> Result<Operation> {
  let def = registry.table(PATIENT)?;
  let key = def.key_of(&plan.patient).ok_or_else(|| {
    carebase_core::Error::Constraint(format!("{PATIENT} row is missing its primary key"))
  })?;
  let lookup = ConnLookup::new(conn);
  let before = lookup.fetch(def, &key)?.ok_or_else(|| carebase_core::Error::NotFound {
    table: PATIENT.to_owned(),
    key:   key.clone(),
  })?;

  let mut operations = Vec::new();
  let after = def.prepare_update(&before, std::mem::take(&mut plan.patient))?;
  if after != before {
    let update = Operation::Update { before, after };
    apply_steps(conn, registry, &update.forward_steps())?;
    operations.push(update);
  }

  let old = cascade::plan_delete(registry, &lookup, PATIENT, &key)?;
  let deletes: Vec<Operation> =
    old.dependents.into_iter().map(|row| Operation::Delete { row }).collect();
  for delete in &deletes {
    apply_steps(conn, registry, &delete.forward_steps())?;
  }
  operations.extend(deletes);

  insert_details(conn, registry, plan, &mut operations)?;

  let label = format!("update intake patient {key}");
  Ok(Operation::Batch { label, operations })
}

/// Insert the plan's missing diseases and its medical, surgical and
/// medication rows. `plan.patient` is ignored.
fn insert_details(
  conn: &Connection,
  registry: &SchemaRegistry,
  plan: IntakePlan,
  operations: &mut Vec<Operation>,
) -> Result<()> {
  let mut insert = |table: &str, values: FieldValues| -> Result<()> {
    let def = registry.table(table)?;
    let row = insert_new(conn, def, def.prepare_insert(values)?)?;
    operations.push(Operation::Insert { row });
    Ok(())
  };

  let disease = registry.table(DISEASE)?;
  for (code, name) in plan.diseases {
    if ConnLookup::new(conn).fetch(disease, &PrimaryKey::from(code.as_str()))?.is_some() {
      continue;
    }
    let Some(name) = name else {
      return Err(
        carebase_core::Error::Constraint(format!(
          "illness code {code} is not in the masterlist and has no disease name"
        ))
        .into(),
      );
    };
    insert(DISEASE, fields([("illness_code", code), ("disease_name", name)]))?;
  }

  for values in plan.medical_histories {
    insert(MEDICAL_HISTORY, values)?;
  }
  for values in plan.surgeries {
    insert(SURGICAL_HISTORY, values)?;
  }
  for values in plan.medications {
    insert(MEDICATION_RECORD, values)?;
  }
  Ok(())
}
