//! Output formatters.
//!
//! The processor hands structured output to a [`Formatter`] selected by name
//! from a [`FormatterManager`]. Built-in formatters:
//!
//! | Name | Output |
//! |------|--------|
//! | `string` | scalars as text, one line per list item |
//! | `list` | one line per value of an array or object |
//! | `json` | pretty JSON |
//! | `yaml` | YAML |
//! | `xml` | XML under a `<document>` root |
//! | `csv` | comma separated with a header row |
//! | `tsv` | tab separated, no header row |
//!
//! All formatters honor a `fields` option (comma separated) that keeps only
//! the named keys of an object, or of each object in an array.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

use crate::annotation::AnnotationData;
use crate::input::{value_to_string, Options};
use crate::output::OutputSink;

/// Errors that can occur while formatting output.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    #[error("the '{format}' format cannot render {shape} data")]
    Incompatible { format: String, shape: &'static str },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML serialization failed: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("CSV serialization failed: {0}")]
    Csv(String),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Options visible to a formatter.
#[derive(Debug, Clone, Default)]
pub struct FormatterOptions {
    /// The resolved format name
    pub format: String,
    /// The command's effective options
    pub options: Options,
    /// The command's annotations
    pub annotations: AnnotationData,
}

impl FormatterOptions {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..Self::default()
        }
    }

    /// Field names requested through the `fields` option, falling back to the
    /// `default-fields` annotation.
    pub fn fields(&self) -> Vec<String> {
        let raw = match self.options.get("fields") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => self.annotations.get("default-fields", ""),
        };
        raw.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect()
    }

    /// Applies the field selection to `data`.
    pub fn select_fields(&self, data: &Value) -> Value {
        let fields = self.fields();
        if fields.is_empty() {
            return data.clone();
        }
        let pick = |obj: &Map<String, Value>| -> Value {
            let mut picked = Map::new();
            for field in &fields {
                if let Some(v) = obj.get(field) {
                    picked.insert(field.clone(), v.clone());
                }
            }
            Value::Object(picked)
        };
        match data {
            Value::Object(obj) => pick(obj),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(obj) => pick(obj),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Renders structured data into an output sink.
pub trait Formatter {
    fn write(
        &self,
        output: &mut dyn OutputSink,
        data: &Value,
        options: &FormatterOptions,
    ) -> Result<(), FormatError>;
}

impl<F> Formatter for F
where
    F: Fn(&mut dyn OutputSink, &Value, &FormatterOptions) -> Result<(), FormatError>,
{
    fn write(
        &self,
        output: &mut dyn OutputSink,
        data: &Value,
        options: &FormatterOptions,
    ) -> Result<(), FormatError> {
        self(output, data, options)
    }
}

/// Registry of formatters keyed by format name.
#[derive(Clone)]
pub struct FormatterManager {
    formatters: HashMap<String, Rc<dyn Formatter>>,
}

impl FormatterManager {
    /// A manager with every built-in formatter registered.
    pub fn new() -> Self {
        let mut manager = Self::empty();
        manager.add_formatter("string", string_formatter);
        manager.add_formatter("list", list_formatter);
        manager.add_formatter("json", json_formatter);
        manager.add_formatter("yaml", yaml_formatter);
        manager.add_formatter("xml", xml_formatter);
        manager.add_formatter("csv", |out: &mut dyn OutputSink, data: &Value, _: &FormatterOptions| {
            write_delimited(out, data, b',', true)
        });
        manager.add_formatter("tsv", |out: &mut dyn OutputSink, data: &Value, _: &FormatterOptions| {
            write_delimited(out, data, b'\t', false)
        });
        manager
    }

    /// A manager with no formatters.
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    pub fn add_formatter(&mut self, name: impl Into<String>, formatter: impl Formatter + 'static) {
        self.formatters.insert(name.into(), Rc::new(formatter));
    }

    pub fn has_formatter(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    pub fn formatter(&self, name: &str) -> Option<Rc<dyn Formatter>> {
        self.formatters.get(name).cloned()
    }

    /// Formats `data` with the formatter named by `options.format`.
    pub fn write(
        &self,
        output: &mut dyn OutputSink,
        data: &Value,
        options: &FormatterOptions,
    ) -> Result<(), FormatError> {
        let formatter = self
            .formatters
            .get(&options.format)
            .ok_or_else(|| FormatError::UnknownFormat(options.format.clone()))?;
        let selected = options.select_fields(data);
        formatter.write(output, &selected, options)
    }
}

impl Default for FormatterManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatterManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.formatters.keys().collect();
        names.sort();
        f.debug_struct("FormatterManager")
            .field("formatters", &names)
            .finish()
    }
}

fn string_formatter(
    out: &mut dyn OutputSink,
    data: &Value,
    options: &FormatterOptions,
) -> Result<(), FormatError> {
    match data {
        Value::Null => Ok(()),
        Value::Array(items) if items.iter().all(is_scalar) => {
            for item in items {
                out.write_line(&value_to_string(item))?;
            }
            Ok(())
        }
        Value::Array(_) | Value::Object(_) => Err(FormatError::Incompatible {
            format: options.format.clone(),
            shape: shape_of(data),
        }),
        scalar => Ok(out.write_line(&value_to_string(scalar))?),
    }
}

fn list_formatter(
    out: &mut dyn OutputSink,
    data: &Value,
    _options: &FormatterOptions,
) -> Result<(), FormatError> {
    let values: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => obj.values().collect(),
        Value::Null => Vec::new(),
        scalar => vec![scalar],
    };
    for value in values {
        out.write_line(&value_to_string(value))?;
    }
    Ok(())
}

fn json_formatter(
    out: &mut dyn OutputSink,
    data: &Value,
    _options: &FormatterOptions,
) -> Result<(), FormatError> {
    Ok(out.write_line(&serde_json::to_string_pretty(data)?)?)
}

fn yaml_formatter(
    out: &mut dyn OutputSink,
    data: &Value,
    _options: &FormatterOptions,
) -> Result<(), FormatError> {
    Ok(out.write(&serde_yaml::to_string(data)?)?)
}

fn xml_formatter(
    out: &mut dyn OutputSink,
    data: &Value,
    _options: &FormatterOptions,
) -> Result<(), FormatError> {
    Ok(out.write_line(&quick_xml::se::to_string_with_root("document", data)?)?)
}

/// Flattens JSON data into delimited rows.
fn write_delimited(
    out: &mut dyn OutputSink,
    data: &Value,
    delimiter: u8,
    headers: bool,
) -> Result<(), FormatError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(vec![]);
    let csv_err = |e: csv::Error| FormatError::Csv(e.to_string());

    match data {
        Value::Array(arr) if !arr.is_empty() => {
            if let Some(Value::Object(first)) = arr.first() {
                let keys: Vec<&str> = first.keys().map(|s| s.as_str()).collect();
                if headers {
                    wtr.write_record(&keys).map_err(csv_err)?;
                }
                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = keys
                            .iter()
                            .map(|k| obj.get(*k).map(value_to_string).unwrap_or_default())
                            .collect();
                        wtr.write_record(&row).map_err(csv_err)?;
                    }
                }
            } else {
                for item in arr {
                    wtr.write_record([value_to_string(item)]).map_err(csv_err)?;
                }
            }
        }
        Value::Object(obj) => {
            if headers {
                wtr.write_record(["key", "value"]).map_err(csv_err)?;
            }
            for (k, v) in obj {
                wtr.write_record([k.as_str(), &value_to_string(v)])
                    .map_err(csv_err)?;
            }
        }
        Value::Array(_) | Value::Null => {}
        scalar => {
            wtr.write_record([value_to_string(scalar)]).map_err(csv_err)?;
        }
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| FormatError::Csv(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| FormatError::Csv(e.to_string()))?;
    Ok(out.write(&text)?)
}

fn is_scalar(v: &Value) -> bool {
    !matches!(v, Value::Array(_) | Value::Object(_))
}

fn shape_of(v: &Value) -> &'static str {
    match v {
        Value::Array(_) => "list",
        Value::Object(_) => "object",
        _ => "scalar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::BufferedOutput;
    use serde_json::json;

    fn render(format: &str, data: Value) -> Result<String, FormatError> {
        let manager = FormatterManager::new();
        let mut out = BufferedOutput::new();
        manager.write(&mut out, &data, &FormatterOptions::new(format))?;
        Ok(out.contents().to_string())
    }

    #[test]
    fn test_string_formatter() {
        assert_eq!(render("string", json!("hi")).unwrap(), "hi\n");
        assert_eq!(render("string", json!(42)).unwrap(), "42\n");
        assert_eq!(render("string", json!(["a", "b"])).unwrap(), "a\nb\n");
        assert!(matches!(
            render("string", json!({"a": 1})),
            Err(FormatError::Incompatible { shape: "object", .. })
        ));
    }

    #[test]
    fn test_json_formatter() {
        let out = render("json", json!({"name": "test"})).unwrap();
        assert!(out.contains("\"name\": \"test\""));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_yaml_formatter() {
        let out = render("yaml", json!({"name": "test", "value": 42})).unwrap();
        assert!(out.contains("name: test"));
        assert!(out.contains("value: 42"));
    }

    #[test]
    fn test_xml_formatter() {
        let out = render("xml", json!({"name": "test"})).unwrap();
        assert!(out.contains("<document>"));
        assert!(out.contains("<name>test</name>"));
    }

    #[test]
    fn test_csv_array_of_objects() {
        let out = render(
            "csv",
            json!([
                {"name": "Alice", "age": 30},
                {"name": "Bob", "age": 25}
            ]),
        )
        .unwrap();
        assert!(out.contains("name"));
        assert!(out.contains("age"));
        assert!(out.contains("Alice"));
        assert!(out.contains("25"));
    }

    #[test]
    fn test_tsv_has_no_header() {
        let out = render("tsv", json!({"a": "1", "b": "2"})).unwrap();
        assert_eq!(out, "a\t1\nb\t2\n");
    }

    #[test]
    fn test_list_formatter() {
        let out = render("list", json!({"x": "one", "y": 2})).unwrap();
        assert_eq!(out, "one\n2\n");
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!(
            render("nope", json!(1)),
            Err(FormatError::UnknownFormat(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_fields_option_selects_keys() {
        let manager = FormatterManager::new();
        let mut out = BufferedOutput::new();
        let mut options = FormatterOptions::new("tsv");
        options.options.insert("fields".into(), json!("b"));
        manager
            .write(&mut out, &json!({"a": "1", "b": "2"}), &options)
            .unwrap();
        assert_eq!(out.contents(), "b\t2\n");
    }

    #[test]
    fn test_custom_formatter() {
        let mut manager = FormatterManager::empty();
        manager.add_formatter(
            "shout",
            |out: &mut dyn OutputSink, data: &Value, _: &FormatterOptions| {
                Ok(out.write_line(&data.to_string().to_uppercase())?)
            },
        );
        let mut out = BufferedOutput::new();
        manager
            .write(&mut out, &json!("quiet"), &FormatterOptions::new("shout"))
            .unwrap();
        assert_eq!(out.contents(), "\"QUIET\"\n");
    }
}
