use serde_json::{Map, Value, json};
use toolbridge_model::ModelTool;

const KNOWN_TYPES: &[&str] =
    &["string", "integer", "number", "boolean", "array", "object"];
const COMBINATORS: &[&str] = &["anyOf", "oneOf", "allOf", "$ref", "enum"];

/// Describes a tool offered to the model, regardless of who executes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Name of the tool, unique within one turn.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// The tool's parameters.
    pub parameters: ParameterSchema,
}

impl ToolDescriptor {
    /// Creates a descriptor.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(
        name: S1,
        description: S2,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Converts the descriptor into the provider-neutral tool definition.
    pub fn to_model_tool(&self) -> ModelTool {
        ModelTool {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.to_value(),
        }
    }
}

/// The parameters of a tool: an object schema mapping parameter names to
/// their `{type, description, ...}` schemas, plus the required names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterSchema {
    /// Creates a schema without parameters.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn with_parameter<S1, S2, S3>(
        mut self,
        name: S1,
        r#type: S2,
        description: S3,
        required: bool,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            json!({ "type": r#type.into(), "description": description.into() }),
        );
        if required && !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Builds a schema from a JSON-schema-shaped object.
    ///
    /// Only `properties` and `required` are read. Each property is
    /// normalized so the model always sees a usable type and description:
    ///
    /// - a missing or unknown `type` becomes `"string"`, unless the
    ///   property is described by a combinator such as `anyOf` or `$ref`;
    /// - a union type such as `["integer", "null"]` keeps its first
    ///   non-null member;
    /// - a missing `description` becomes `"Parameter <name>"`.
    ///
    /// Required names that are not declared as properties are dropped.
    pub fn from_json(schema: &Value) -> Self {
        let mut properties = Map::new();
        if let Some(declared) = schema.get("properties").and_then(Value::as_object)
        {
            for (name, property) in declared {
                properties.insert(name.clone(), normalize_property(name, property));
            }
        }

        let mut required: Vec<String> = Vec::new();
        for name in schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            if properties.contains_key(name) && !required.iter().any(|r| r == name)
            {
                required.push(name.to_owned());
            }
        }

        Self {
            properties,
            required,
        }
    }

    /// Returns the parameter schemas by name.
    #[inline]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Returns the names of the required parameters.
    #[inline]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Serializes into the object schema expected by completion APIs.
    pub fn to_value(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

fn normalize_property(name: &str, property: &Value) -> Value {
    let mut property = match property {
        Value::Object(property) => property.clone(),
        _ => Map::new(),
    };

    let r#type = match property.get("type") {
        Some(Value::String(ty)) if KNOWN_TYPES.contains(&ty.as_str()) => None,
        Some(Value::Array(types)) => Some(
            types
                .iter()
                .filter_map(Value::as_str)
                .find(|ty| *ty != "null" && KNOWN_TYPES.contains(ty))
                .unwrap_or("string")
                .to_owned(),
        ),
        Some(_) => Some("string".to_owned()),
        None if COMBINATORS.iter().any(|key| property.contains_key(*key)) => None,
        None => Some("string".to_owned()),
    };
    if let Some(r#type) = r#type {
        property.insert("type".to_owned(), Value::from(r#type));
    }

    if !matches!(property.get("description"), Some(Value::String(_))) {
        property.insert(
            "description".to_owned(),
            Value::from(format!("Parameter {name}")),
        );
    }
    Value::Object(property)
}
