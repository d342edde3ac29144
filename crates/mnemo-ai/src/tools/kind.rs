use serde_json::{Map, Value, json};

use super::ToolSchema;
use crate::profile::ProfileField;

/// The closed set of tools offered to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Merge user details into the stored profile.
    ProfileUpdate,
    /// Look up earlier exchanges in the retrieval index.
    RetrievalSearch,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [Self::ProfileUpdate, Self::RetrievalSearch];

    pub fn name(self) -> &'static str {
        match self {
            Self::ProfileUpdate => "add_user_info_to_database",
            Self::RetrievalSearch => "search_vector_db",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ProfileUpdate => {
                "Updates the user's profile record with details the user shared in the conversation"
            }
            Self::RetrievalSearch => {
                "Searches the vector database of previous conversations for information relevant to the query"
            }
        }
    }

    pub fn schema(self) -> ToolSchema {
        let parameters = match self {
            Self::ProfileUpdate => {
                let properties: Map<String, Value> = ProfileField::ALL
                    .into_iter()
                    .map(|field| {
                        let schema = match field {
                            ProfileField::Age => json!({"type": "integer"}),
                            ProfileField::Interests => {
                                json!({"type": "array", "items": {"type": "string"}})
                            }
                            _ => json!({"type": "string"}),
                        };
                        (field.as_str().to_string(), schema)
                    })
                    .collect();
                json!({
                    "type": "object",
                    "properties": {
                        "user_info": {
                            "type": "object",
                            "description": "User information to update",
                            "properties": properties,
                            "additionalProperties": false
                        }
                    },
                    "required": ["user_info"]
                })
            }
            Self::RetrievalSearch => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }),
        };

        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters,
        }
    }

    /// Schemas for every tool, in a stable order.
    pub fn catalog() -> Vec<ToolSchema> {
        Self::ALL.into_iter().map(Self::schema).collect()
    }
}

/// A tool call whose name has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub kind: ToolKind,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(kind: ToolKind, arguments: Value) -> Self {
        Self { kind, arguments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("delete_everything"), None);
    }

    #[test]
    fn test_profile_schema_lists_every_field() {
        let schema = ToolKind::ProfileUpdate.schema();
        let properties = &schema.parameters["properties"]["user_info"]["properties"];
        for field in ProfileField::ALL {
            assert!(properties.get(field.as_str()).is_some(), "missing {field}");
        }
    }
}
