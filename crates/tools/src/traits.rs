use async_trait::async_trait;
use tars_core::{ActionError, ActionInput, ActionSpec};

#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> serde_json::Value;

    /// Run the action. The returned text is fed back to the model verbatim.
    async fn execute(&self, input: &ActionInput) -> Result<String, ActionError>;

    fn spec(&self) -> ActionSpec {
        ActionSpec::new(self.name(), self.description(), self.schema())
    }
}

pub fn required_str<'a>(input: &'a ActionInput, key: &str) -> Result<&'a str, ActionError> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ActionError::Validation(format!("Missing '{}' field", key)))
}
