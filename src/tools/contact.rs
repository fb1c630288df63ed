//! Mock contact directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::tool::{Tool, parse_params, to_observation};

pub const LOOKUP_CONTACT: &str = "lookup_contact";

const NOT_FOUND_MESSAGE: &str = "No contact found in mock contacts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    pub fn new(name: &str, email: &str, phone: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }
}

/// Observation returned by `lookup_contact`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactResult {
    pub tool: String,
    pub query: String,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Ordered key → contact directory.
///
/// Lookup tries an exact (case-insensitive) key first, then the first entry
/// whose key, name or email contains the query.
#[derive(Debug, Clone)]
pub struct ContactDirectory {
    entries: Vec<(String, Contact)>,
}

impl Default for ContactDirectory {
    fn default() -> Self {
        Self::mock()
    }
}

impl ContactDirectory {
    pub fn new(entries: Vec<(String, Contact)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, contact)| (key.to_lowercase(), contact))
                .collect(),
        }
    }

    /// The bundled demo directory.
    pub fn mock() -> Self {
        Self::new(vec![
            (
                "alice".into(),
                Contact::new("Alice Rao", "alice@company.com", "+91-90000-11111"),
            ),
            (
                "bob".into(),
                Contact::new("Bob Singh", "bob@company.com", "+91-90000-22222"),
            ),
            (
                "manager@company.com".into(),
                Contact::new("Team Manager", "manager@company.com", "+91-90000-99999"),
            ),
        ])
    }

    pub fn lookup(&self, query: &str) -> ContactResult {
        let q = query.trim().to_lowercase();

        let found = if q.is_empty() {
            None
        } else {
            self.entries
                .iter()
                .find(|(key, _)| *key == q)
                .or_else(|| {
                    self.entries.iter().find(|(key, contact)| {
                        key.contains(&q)
                            || contact.name.to_lowercase().contains(&q)
                            || contact.email.to_lowercase().contains(&q)
                    })
                })
                .map(|(_, contact)| contact.clone())
        };

        match found {
            Some(contact) => ContactResult {
                tool: LOOKUP_CONTACT.to_string(),
                query: query.to_string(),
                found: true,
                contact: Some(contact),
                message: None,
            },
            None => ContactResult {
                tool: LOOKUP_CONTACT.to_string(),
                query: query.to_string(),
                found: false,
                contact: None,
                message: Some(NOT_FOUND_MESSAGE.to_string()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupContactArgs {
    query: String,
}

/// `lookup_contact` tool over a [`ContactDirectory`].
#[derive(Debug, Clone, Default)]
pub struct LookupContactTool {
    directory: ContactDirectory,
}

impl LookupContactTool {
    pub fn new(directory: ContactDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for LookupContactTool {
    fn name(&self) -> &str {
        LOOKUP_CONTACT
    }

    fn description(&self) -> &str {
        "Look up a contact by name or email address."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Name or email to search for"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: LookupContactArgs = parse_params(LOOKUP_CONTACT, params)?;
        to_observation(LOOKUP_CONTACT, &self.directory.lookup(&args.query))
    }
}
