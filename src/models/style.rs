use serde::{Deserialize, Serialize};

/// A named visual transformation preset applied to the uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDefinition {
    pub id: String,
    pub display_name: String,
    pub instruction: String,
}

impl StyleDefinition {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            instruction: instruction.into(),
        }
    }
}
