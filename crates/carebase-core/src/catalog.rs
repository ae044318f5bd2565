//! A registry bundled with its views and seed data.

use crate::{
  Error, Result,
  intake::IntakeForm,
  schema::SchemaRegistry,
  value::FieldValues,
  view::ViewDefinition,
};

/// Everything a store needs to know about one application's data.
#[derive(Debug, Clone)]
pub struct Catalog {
  pub registry:        SchemaRegistry,
  views:               Vec<ViewDefinition>,
  /// `(table, row)` pairs loaded into masterlist tables on reset.
  pub masterlist_seed: Vec<(String, FieldValues)>,
  /// Patients loaded into an empty store when demo data is enabled.
  pub demo_intakes:    Vec<IntakeForm>,
}

impl Catalog {
  /// Bundle `registry` with `views`, validating each view against it.
  pub fn new(registry: SchemaRegistry, views: Vec<ViewDefinition>) -> Result<Self> {
    for (i, view) in views.iter().enumerate() {
      view.validate(&registry)?;
      if views[..i].iter().any(|v| v.name == view.name) {
        return Err(Error::View(format!("view {} is defined twice", view.name)));
      }
    }
    Ok(Self {
      registry,
      views,
      masterlist_seed: Vec::new(),
      demo_intakes: Vec::new(),
    })
  }

  pub fn with_masterlist_seed(mut self, seed: Vec<(String, FieldValues)>) -> Result<Self> {
    for (table, _) in &seed {
      if !self.registry.table(table)?.masterlist {
        return Err(Error::Schema(format!("{table} is not a masterlist table")));
      }
    }
    self.masterlist_seed = seed;
    Ok(self)
  }

  pub fn with_demo_intakes(mut self, intakes: Vec<IntakeForm>) -> Self {
    self.demo_intakes = intakes;
    self
  }

  pub fn views(&self) -> &[ViewDefinition] { &self.views }

  pub fn view_names(&self) -> Vec<&str> {
    self.views.iter().map(|v| v.name.as_str()).collect()
  }

  pub fn view(&self, name: &str) -> Result<&ViewDefinition> {
    self
      .views
      .iter()
      .find(|v| v.name == name)
      .ok_or_else(|| Error::View(format!("unknown view {name}")))
  }
}
