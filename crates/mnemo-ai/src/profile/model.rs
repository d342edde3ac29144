//! User profile record and validated updates.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AiError, Result};

/// Identifier given to the profile row when the first update creates it.
pub const DEFAULT_PROFILE_ID: i64 = 1;

/// The fields a profile update may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileField {
    Name,
    LastName,
    Age,
    Gender,
    Location,
    Occupation,
    Interests,
}

impl ProfileField {
    pub const ALL: [ProfileField; 7] = [
        Self::Name,
        Self::LastName,
        Self::Age,
        Self::Gender,
        Self::Location,
        Self::Occupation,
        Self::Interests,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::LastName => "last_name",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Location => "location",
            Self::Occupation => "occupation",
            Self::Interests => "interests",
        }
    }

    /// Type hint shown to the model in the system prompt.
    pub fn type_hint(self) -> &'static str {
        match self {
            Self::Age => "int",
            Self::Interests => "list[str]",
            _ => "str",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == key)
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single user profile row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    /// Sorted, deduplicated, joined with `", "`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
}

impl UserProfile {
    pub fn with_id(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Apply a validated update. Interests are unioned, everything else is
    /// overwritten.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        for (field, value) in &update.fields {
            match (field, value) {
                (ProfileField::Age, FieldValue::Age(age)) => self.age = Some(*age),
                (ProfileField::Interests, FieldValue::Interests(incoming)) => {
                    let mut merged = split_interests(self.interests.as_deref().unwrap_or(""));
                    merged.extend(incoming.iter().cloned());
                    self.interests = (!merged.is_empty())
                        .then(|| merged.into_iter().collect::<Vec<_>>().join(", "));
                }
                (field, FieldValue::Text(text)) => {
                    if let Some(slot) = self.text_slot(*field) {
                        *slot = Some(text.clone());
                    }
                }
                _ => {}
            }
        }
    }

    /// Populated fields only, keyed by field name.
    pub fn visible_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for field in ProfileField::ALL {
            let value = match field {
                ProfileField::Age => self.age.map(Value::from),
                _ => self
                    .text_value(field)
                    .filter(|text| !text.trim().is_empty())
                    .map(|text| Value::String(text.to_string())),
            };
            if let Some(value) = value {
                map.insert(field.as_str().to_string(), value);
            }
        }
        map
    }

    fn text_value(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::Name => self.name.as_deref(),
            ProfileField::LastName => self.last_name.as_deref(),
            ProfileField::Gender => self.gender.as_deref(),
            ProfileField::Location => self.location.as_deref(),
            ProfileField::Occupation => self.occupation.as_deref(),
            ProfileField::Interests => self.interests.as_deref(),
            ProfileField::Age => None,
        }
    }

    fn text_slot(&mut self, field: ProfileField) -> Option<&mut Option<String>> {
        match field {
            ProfileField::Name => Some(&mut self.name),
            ProfileField::LastName => Some(&mut self.last_name),
            ProfileField::Gender => Some(&mut self.gender),
            ProfileField::Location => Some(&mut self.location),
            ProfileField::Occupation => Some(&mut self.occupation),
            ProfileField::Age | ProfileField::Interests => None,
        }
    }
}

fn split_interests(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Age(u32),
    Interests(BTreeSet<String>),
}

/// A validated profile update.
///
/// Construction fails as a whole when any key is outside the allow-list or any
/// value has the wrong shape, so a rejected update never writes anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    fields: Vec<(ProfileField, FieldValue)>,
}

impl ProfileUpdate {
    pub fn from_json(arguments: &Value) -> Result<Self> {
        let Value::Object(map) = arguments else {
            return Err(AiError::Validation(
                "Profile update must be a JSON object".to_string(),
            ));
        };
        Self::from_map(map)
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        if let Some(key) = map.keys().find(|key| ProfileField::from_key(key).is_none()) {
            tracing::debug!(key = %key, "Rejected profile key");
            return Err(AiError::Validation(format!(
                "Please provide a valid key from the following list: {}",
                ProfileField::ALL.map(ProfileField::as_str).join(", ")
            )));
        }

        let mut fields = Vec::with_capacity(map.len());
        for (key, value) in map {
            let Some(field) = ProfileField::from_key(key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            fields.push((field, parse_value(field, value)?));
        }

        if fields.is_empty() {
            return Err(AiError::Validation("No valid fields to update.".to_string()));
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> impl Iterator<Item = ProfileField> + '_ {
        self.fields.iter().map(|(field, _)| *field)
    }
}

fn parse_value(field: ProfileField, value: &Value) -> Result<FieldValue> {
    let invalid = |expected: &str| {
        AiError::Validation(format!("Field '{}' expects {}, got {}", field, expected, value))
    };

    match field {
        ProfileField::Age => {
            let age = match value {
                Value::Number(number) => number.as_u64(),
                Value::String(text) => text.trim().parse::<u64>().ok(),
                _ => None,
            };
            age.and_then(|age| u32::try_from(age).ok())
                .map(FieldValue::Age)
                .ok_or_else(|| invalid("a non-negative integer"))
        }
        ProfileField::Interests => {
            let items = match value {
                Value::String(text) => split_interests(text),
                Value::Array(items) => {
                    let mut set = BTreeSet::new();
                    for item in items {
                        let text = item.as_str().ok_or_else(|| invalid("a list of strings"))?;
                        set.extend(split_interests(text));
                    }
                    set
                }
                _ => return Err(invalid("a list of strings or a comma-separated string")),
            };
            Ok(FieldValue::Interests(items))
        }
        _ => match value {
            Value::String(text) if !text.trim().is_empty() => {
                Ok(FieldValue::Text(text.trim().to_string()))
            }
            Value::Number(number) => Ok(FieldValue::Text(number.to_string())),
            _ => Err(invalid("a non-empty string")),
        },
    }
}
