//! Typed product options and custom fields.

use std::collections::BTreeMap;

use crate::error::CatalogError;
use crate::ids::{OptionId, ProductId};
use serde::{Deserialize, Serialize};

/// How an option is presented and what its values carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    #[default]
    Text,
    Color,
    Image,
    Button,
}

/// Who owns an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "owner", content = "product_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionScope {
    /// Declared on a single product.
    Product(ProductId),
    /// Shared across the store.
    Store,
}

/// One selectable value of an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    /// Display value (e.g., "Red").
    pub value: String,
    /// Hex swatch, required for `COLOR` options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
    /// Image URL, required for `IMAGE` options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Display order.
    #[serde(default)]
    pub position: i32,
}

impl OptionValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            color_hex: None,
            image_url: None,
            position: 0,
        }
    }

    pub fn color(value: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            color_hex: Some(hex.into()),
            ..Self::text(value)
        }
    }
}

/// A named option axis (e.g., "Color") with an ordered set of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: OptionId,
    pub name: String,
    #[serde(default)]
    pub kind: OptionKind,
    pub scope: OptionScope,
    pub values: Vec<OptionValue>,
}

impl ProductOption {
    /// Create an option with values in the given order.
    pub fn new(
        id: impl Into<OptionId>,
        name: impl Into<String>,
        kind: OptionKind,
        scope: OptionScope,
        values: Vec<OptionValue>,
    ) -> Self {
        let mut values = values;
        for (i, v) in values.iter_mut().enumerate() {
            v.position = i as i32;
        }
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            scope,
            values,
        }
    }

    /// Check the option's values carry what its kind requires.
    pub fn validate_definition(&self) -> Result<(), CatalogError> {
        for v in &self.values {
            let ok = match self.kind {
                OptionKind::Color => v.color_hex.as_deref().is_some_and(is_hex_color),
                OptionKind::Image => v.image_url.as_deref().is_some_and(|u| !u.is_empty()),
                OptionKind::Text | OptionKind::Button => true,
            };
            if !ok {
                return Err(CatalogError::UndeclaredValue {
                    option: self.name.clone(),
                    value: v.value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Check a value is one of the declared values.
    pub fn declares(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.value == value)
    }
}

/// Validate a variant's option selection against the declared options.
///
/// Every declared option must be selected exactly once, with a declared value.
pub fn validate_selection<'a>(
    declared: impl IntoIterator<Item = &'a ProductOption>,
    selection: &BTreeMap<String, String>,
) -> Result<(), CatalogError> {
    let declared: Vec<&ProductOption> = declared.into_iter().collect();

    for name in selection.keys() {
        if !declared.iter().any(|o| &o.name == name) {
            return Err(CatalogError::UnknownOption(name.clone()));
        }
    }

    for option in declared {
        let value = selection
            .get(&option.name)
            .ok_or_else(|| CatalogError::MissingOption(option.name.clone()))?;
        if !option.declares(value) {
            return Err(CatalogError::UndeclaredValue {
                option: option.name.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// Declared type of a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    Text,
    Number,
    Checkbox,
    Dropdown { choices: Vec<String> },
    Color,
    Url,
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Number => "NUMBER",
            FieldKind::Checkbox => "CHECKBOX",
            FieldKind::Dropdown { .. } => "DROPDOWN",
            FieldKind::Color => "COLOR",
            FieldKind::Url => "URL",
        }
    }
}

/// Store-level definition of a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    pub key: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// A typed custom field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

/// Typed key-value store of a product's custom fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFields(BTreeMap<String, FieldValue>);

impl CustomFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate every value against the store's field definitions.
    pub fn validate(&self, definitions: &[CustomFieldDefinition]) -> Result<(), CatalogError> {
        for (key, value) in &self.0 {
            let def = definitions
                .iter()
                .find(|d| &d.key == key)
                .ok_or_else(|| CatalogError::UnknownField(key.clone()))?;
            check_field(def, value)?;
        }

        if let Some(missing) = definitions
            .iter()
            .find(|d| d.required && !self.0.contains_key(&d.key))
        {
            return Err(CatalogError::MissingField(missing.key.clone()));
        }
        Ok(())
    }
}

fn check_field(def: &CustomFieldDefinition, value: &FieldValue) -> Result<(), CatalogError> {
    let mismatch = || CatalogError::FieldKindMismatch {
        key: def.key.clone(),
        expected: def.kind.name().to_string(),
    };
    let invalid = |v: &str| CatalogError::InvalidFieldValue {
        key: def.key.clone(),
        value: v.to_string(),
    };

    match (&def.kind, value) {
        (FieldKind::Text, FieldValue::Text(_)) => Ok(()),
        (FieldKind::Number, FieldValue::Number(_)) => Ok(()),
        (FieldKind::Checkbox, FieldValue::Bool(_)) => Ok(()),
        (FieldKind::Dropdown { choices }, FieldValue::Text(v)) => {
            if choices.contains(v) {
                Ok(())
            } else {
                Err(invalid(v))
            }
        }
        (FieldKind::Color, FieldValue::Text(v)) => {
            if is_hex_color(v) {
                Ok(())
            } else {
                Err(invalid(v))
            }
        }
        (FieldKind::Url, FieldValue::Text(v)) => {
            if v.starts_with("https://") || v.starts_with("http://") {
                Ok(())
            } else {
                Err(invalid(v))
            }
        }
        _ => Err(mismatch()),
    }
}

fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#')
        .is_some_and(|hex| (hex.len() == 6 || hex.len() == 3) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
