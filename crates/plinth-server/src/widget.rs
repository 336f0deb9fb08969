//! `Widget`, the model served out of the box.
//!
//! Widgets are deliberately small: a unique name and a free-form description.
//! New applications add their own models next to this one and mount them in
//! [`crate::router`].

use plinth_core::{CreateSchema, Model, Record, ResponseSchema, Schemas, UpdateSchema};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

impl Model for Widget {
  const TABLE: &'static str = "widgets";
  const UNIQUE_FIELDS: &'static [&'static str] = &["name"];
}

fn check_name(name: &str) -> Result<(), String> {
  if name.trim().is_empty() {
    return Err("name must not be empty".to_owned());
  }
  Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateWidget {
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

impl CreateSchema<Widget> for CreateWidget {
  fn validate(&self) -> Result<(), String> { check_name(&self.name) }

  fn into_model(self) -> Widget { Widget { name: self.name, description: self.description } }
}

/// Partial update: absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct PutWidget {
  pub name:        Option<String>,
  pub description: Option<String>,
}

impl UpdateSchema<Widget> for PutWidget {
  fn validate(&self) -> Result<(), String> {
    match &self.name {
      Some(name) => check_name(name),
      None => Ok(()),
    }
  }

  fn apply(self, model: &mut Widget) {
    if let Some(name) = self.name {
      model.name = name;
    }
    if let Some(description) = self.description {
      model.description = description;
    }
  }
}

#[derive(Debug, Serialize)]
pub struct WidgetResponse {
  pub id:          Uuid,
  pub name:        String,
  pub description: String,
}

impl ResponseSchema<Widget> for WidgetResponse {
  fn from_record(record: &Record<Widget>) -> Self {
    Self {
      id:          record.id,
      name:        record.data.name.clone(),
      description: record.data.description.clone(),
    }
  }
}

impl Schemas for Widget {
  type Create = CreateWidget;
  type Put = PutWidget;
  type Response = WidgetResponse;
}
