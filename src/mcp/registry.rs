//! Tool definitions and the name -> handler registry.
//!
//! Each tool is registered with a typed argument struct. The stored handler
//! is type-erased: it takes the bound argument object, deserializes it into
//! the struct and runs the integration call. A shape mismatch surfaces as
//! [`ToolError::InvalidArguments`], never as a runtime cast failure.

use crate::error::{Result, ToolgateError};
use crate::files::FileArtifact;
use crate::integrations::{IntegrationError, IntegrationType};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Parameter type as the handler declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    String,
    Integer,
    Long,
    Double,
    Float,
    Boolean,
    StringArray,
    Array,
    Object,
    Any,
}

/// JSON Schema type advertised in `tools/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl DeclaredType {
    pub fn schema_type(self) -> SchemaType {
        match self {
            DeclaredType::String => SchemaType::String,
            DeclaredType::Integer
            | DeclaredType::Long
            | DeclaredType::Double
            | DeclaredType::Float => SchemaType::Number,
            DeclaredType::Boolean => SchemaType::Boolean,
            DeclaredType::StringArray | DeclaredType::Array => SchemaType::Array,
            DeclaredType::Object | DeclaredType::Any => SchemaType::Object,
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, DeclaredType::StringArray | DeclaredType::Array)
    }

    /// Short name used in coercion error messages.
    pub fn label(self) -> &'static str {
        match self {
            DeclaredType::String => "a string",
            DeclaredType::Integer => "an integer",
            DeclaredType::Long => "a long integer",
            DeclaredType::Double | DeclaredType::Float => "a number",
            DeclaredType::Boolean => "a boolean",
            DeclaredType::StringArray => "an array of strings",
            DeclaredType::Array => "an array",
            DeclaredType::Object => "an object",
            DeclaredType::Any => "any value",
        }
    }
}

/// A declared tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub example: Option<String>,
    pub declared_type: DeclaredType,
    pub schema_type: SchemaType,
    /// Position in declaration order, assigned when added to a tool.
    pub positional_index: usize,
    /// Alternative argument names, consulted in order after `name`.
    pub aliases: Vec<String>,
}

impl ParameterDefinition {
    fn new(name: &str, declared_type: DeclaredType, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required,
            example: None,
            declared_type,
            schema_type: declared_type.schema_type(),
            positional_index: 0,
            aliases: Vec::new(),
        }
    }

    pub fn required(name: &str, declared_type: DeclaredType, description: &str) -> Self {
        Self::new(name, declared_type, description, true)
    }

    pub fn optional(name: &str, declared_type: DeclaredType, description: &str) -> Self {
        Self::new(name, declared_type, description, false)
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    /// Names this parameter answers to, primary first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    fn property_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.schema_type));
        property.insert("description".to_string(), json!(self.description));
        if self.declared_type == DeclaredType::StringArray {
            property.insert("items".to_string(), json!({ "type": "string" }));
        }
        if let Some(example) = &self.example {
            property.insert("example".to_string(), json!(example));
        }
        Value::Object(property)
    }
}

/// Static description of a callable tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub integration: IntegrationType,
    pub parameters: Vec<ParameterDefinition>,
}

impl ToolDefinition {
    pub fn new(name: &str, integration: IntegrationType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            integration,
            parameters: Vec::new(),
        }
    }

    /// Append a parameter; declaration order is preserved.
    pub fn param(mut self, mut parameter: ParameterDefinition) -> Self {
        parameter.positional_index = self.parameters.len();
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON Schema for the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.property_schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl Serialize for ToolDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ToolDefinition", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("inputSchema", &self.input_schema())?;
        state.end()
    }
}

/// What a tool handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
    File(FileArtifact),
    Empty,
}

/// Failure of an erased handler.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Bound arguments did not fit the handler's argument struct.
    #[error("{0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

pub type ToolFuture = BoxFuture<'static, std::result::Result<ToolOutput, ToolError>>;
type ErasedHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A definition paired with its handler.
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    handler: ErasedHandler,
}

impl RegisteredTool {
    /// Run the handler with an already bound argument object.
    pub fn invoke(&self, arguments: Value) -> ToolFuture {
        (self.handler)(arguments)
    }
}

/// Registry of tools, keyed by name, iterated in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool whose handler takes a typed argument struct `A`.
    pub fn register<A, F, Fut>(&mut self, definition: ToolDefinition, handler: F) -> Result<()>
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<ToolOutput, IntegrationError>> + Send + 'static,
    {
        if self.index.contains_key(&definition.name) {
            return Err(ToolgateError::Registry(format!(
                "Tool '{}' is already registered",
                definition.name
            )));
        }

        let handler = Arc::new(handler);
        let erased: ErasedHandler = Arc::new(move |arguments: Value| {
            let handler = Arc::clone(&handler);
            async move {
                let typed: A = serde_json::from_value(arguments)
                    .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
                handler(typed).await.map_err(ToolError::Integration)
            }
            .boxed()
        });

        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            handler: erased,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.get(name).map(|t| &t.definition)
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|t| &t.definition)
    }

    /// Tools whose name or description contains `text`, ignoring case.
    pub fn filter(&self, text: &str) -> Vec<&ToolDefinition> {
        let needle = text.to_lowercase();
        self.tools()
            .filter(|t| {
                t.name.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct EchoArgs {
        message: String,
    }

    fn echo_definition() -> ToolDefinition {
        ToolDefinition::new("echo", IntegrationType::OpenAi, "Echo a message back")
            .param(ParameterDefinition::required("message", DeclaredType::String, "Text to echo"))
            .param(
                ParameterDefinition::optional("tags", DeclaredType::StringArray, "Labels")
                    .example("[\"a\"]"),
            )
    }

    async fn echo(args: EchoArgs) -> std::result::Result<ToolOutput, IntegrationError> {
        Ok(ToolOutput::Text(args.message))
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(echo_definition(), echo).unwrap();
        registry
    }

    #[test]
    fn test_schema_types_inferred() {
        assert_eq!(DeclaredType::Integer.schema_type(), SchemaType::Number);
        assert_eq!(DeclaredType::Float.schema_type(), SchemaType::Number);
        assert_eq!(DeclaredType::StringArray.schema_type(), SchemaType::Array);
        assert_eq!(DeclaredType::Any.schema_type(), SchemaType::Object);
        assert_eq!(
            ParameterDefinition::optional("v", DeclaredType::Any, "").schema_type,
            SchemaType::Object
        );
    }

    #[test]
    fn test_positional_indexes_follow_declaration() {
        let def = echo_definition();
        assert_eq!(def.parameters[0].positional_index, 0);
        assert_eq!(def.parameters[1].positional_index, 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry();
        let err = registry.register(echo_definition(), echo).unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_is_stable() {
        let registry = registry();
        let first = registry.definition("echo").unwrap().clone();
        let second = registry.definition("echo").unwrap();
        assert_eq!(&first, second);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let registry = registry();
        assert_eq!(registry.filter("ECHO").len(), 1);
        assert_eq!(registry.filter("message back").len(), 1);
        assert!(registry.filter("jira").is_empty());
    }

    #[test]
    fn test_serialized_input_schema() {
        let value = serde_json::to_value(echo_definition()).unwrap();
        assert_eq!(value["name"], "echo");
        assert_eq!(value["inputSchema"]["type"], "object");
        assert_eq!(value["inputSchema"]["required"], json!(["message"]));

        let properties = value["inputSchema"]["properties"].as_object().unwrap();
        let keys: Vec<&String> = properties.keys().collect();
        assert_eq!(keys, vec!["message", "tags"]);
        assert_eq!(properties["tags"]["items"]["type"], "string");
        assert_eq!(properties["tags"]["example"], "[\"a\"]");
    }

    #[tokio::test]
    async fn test_handler_rejects_mismatched_arguments() {
        let registry = registry();
        let tool = registry.get("echo").unwrap();

        let output = tool.invoke(json!({"message": "hi"})).await.unwrap();
        assert_eq!(output, ToolOutput::Text("hi".to_string()));

        let err = tool.invoke(json!({"message": 5})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
