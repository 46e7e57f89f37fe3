use serde::Deserialize;
use serde_json::Number;

#[derive(Debug, Deserialize)]
pub struct SortInput {
    pub input: Vec<Number>,
}
