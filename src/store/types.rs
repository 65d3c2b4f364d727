use std::{collections::BTreeMap, fmt};

use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};

use crate::errors::GraphLifeError;

/// Declared value type of a property key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Float,
    GeoPoint,
    /// Plain `[lat, lon]` encoding used when the store lacks native geo points.
    FloatPair,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::GeoPoint => "geo_point",
            DataType::FloatPair => "float_pair",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, GraphLifeError> {
        match raw {
            "string" => Ok(DataType::String),
            "integer" => Ok(DataType::Integer),
            "float" => Ok(DataType::Float),
            "geo_point" => Ok(DataType::GeoPoint),
            "float_pair" => Ok(DataType::FloatPair),
            other => Err(GraphLifeError::query(format!("unknown data type {other}"))),
        }
    }

    /// Integers widen into float keys; every other pairing must match exactly.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (DataType::String, PropertyValue::String(_))
                | (DataType::Integer, PropertyValue::Integer(_))
                | (DataType::Float, PropertyValue::Float(_))
                | (DataType::Float, PropertyValue::Integer(_))
                | (DataType::GeoPoint, PropertyValue::GeoPoint(_))
                | (DataType::FloatPair, PropertyValue::FloatPair(_))
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Single,
    List,
    Set,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::List => "list",
            Cardinality::Set => "set",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, GraphLifeError> {
        match raw {
            "single" => Ok(Cardinality::Single),
            "list" => Ok(Cardinality::List),
            "set" => Ok(Cardinality::Set),
            other => Err(GraphLifeError::query(format!("unknown cardinality {other}"))),
        }
    }
}

/// How many edges of one label may connect a vertex to others.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    #[default]
    Multi,
    Simple,
    Many2One,
    One2Many,
    One2One,
}

impl Multiplicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Multiplicity::Multi => "multi",
            Multiplicity::Simple => "simple",
            Multiplicity::Many2One => "many2one",
            Multiplicity::One2Many => "one2many",
            Multiplicity::One2One => "one2one",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, GraphLifeError> {
        match raw {
            "multi" => Ok(Multiplicity::Multi),
            "simple" => Ok(Multiplicity::Simple),
            "many2one" => Ok(Multiplicity::Many2One),
            "one2many" => Ok(Multiplicity::One2Many),
            "one2one" => Ok(Multiplicity::One2One),
            other => Err(GraphLifeError::query(format!("unknown multiplicity {other}"))),
        }
    }

    pub(crate) fn limits_outgoing(&self) -> bool {
        matches!(self, Multiplicity::Many2One | Multiplicity::One2One)
    }

    pub(crate) fn limits_incoming(&self) -> bool {
        matches!(self, Multiplicity::One2Many | Multiplicity::One2One)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, GraphLifeError> {
        match raw {
            "vertex" => Ok(ElementKind::Vertex),
            "edge" => Ok(ElementKind::Edge),
            other => Err(GraphLifeError::query(format!("unknown element kind {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Out,
    In,
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn to_float_pair(&self) -> [f32; 2] {
        [self.lat as f32, self.lon as f32]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    GeoPoint(GeoPoint),
    FloatPair([f32; 2]),
}

impl PropertyValue {
    pub fn data_type(&self) -> DataType {
        match self {
            PropertyValue::String(_) => DataType::String,
            PropertyValue::Integer(_) => DataType::Integer,
            PropertyValue::Float(_) => DataType::Float,
            PropertyValue::GeoPoint(_) => DataType::GeoPoint,
            PropertyValue::FloatPair(_) => DataType::FloatPair,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Replaces a native geo point with its plain pair encoding.
    pub fn without_geoshape(self) -> Self {
        match self {
            PropertyValue::GeoPoint(point) => PropertyValue::FloatPair(point.to_float_pair()),
            other => other,
        }
    }

    /// Splits the value into the `(value_type, value)` column pair used by the
    /// property tables.
    pub(crate) fn to_sql(&self) -> Result<(&'static str, SqlValue), GraphLifeError> {
        let column = match self {
            PropertyValue::String(s) => SqlValue::Text(s.clone()),
            PropertyValue::Integer(v) => SqlValue::Integer(*v),
            PropertyValue::Float(v) => SqlValue::Real(*v),
            PropertyValue::GeoPoint(point) => SqlValue::Text(
                serde_json::to_string(point)
                    .map_err(|e| GraphLifeError::invalid_input(e.to_string()))?,
            ),
            PropertyValue::FloatPair(pair) => SqlValue::Text(
                serde_json::to_string(pair)
                    .map_err(|e| GraphLifeError::invalid_input(e.to_string()))?,
            ),
        };
        Ok((self.data_type().as_str(), column))
    }

    pub(crate) fn from_sql(value_type: &str, column: SqlValue) -> Result<Self, GraphLifeError> {
        let data_type = DataType::parse(value_type)?;
        let mismatch = || GraphLifeError::query(format!("stored value is not a {value_type}"));
        match (data_type, column) {
            (DataType::String, SqlValue::Text(s)) => Ok(PropertyValue::String(s)),
            (DataType::Integer, SqlValue::Integer(v)) => Ok(PropertyValue::Integer(v)),
            (DataType::Float, SqlValue::Real(v)) => Ok(PropertyValue::Float(v)),
            (DataType::Float, SqlValue::Integer(v)) => Ok(PropertyValue::Float(v as f64)),
            (DataType::GeoPoint, SqlValue::Text(raw)) => serde_json::from_str(&raw)
                .map(PropertyValue::GeoPoint)
                .map_err(|e| GraphLifeError::query(e.to_string())),
            (DataType::FloatPair, SqlValue::Text(raw)) => serde_json::from_str(&raw)
                .map(PropertyValue::FloatPair)
                .map_err(|e| GraphLifeError::query(e.to_string())),
            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{s}"),
            PropertyValue::Integer(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::GeoPoint(p) => write!(f, "point[{},{}]", p.lat, p.lon),
            PropertyValue::FloatPair(pair) => write!(f, "[{}, {}]", pair[0], pair[1]),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Integer(value as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<GeoPoint> for PropertyValue {
    fn from(value: GeoPoint) -> Self {
        PropertyValue::GeoPoint(value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyKey {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl PropertyKey {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            cardinality: Cardinality::Single,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub name: String,
    #[serde(default)]
    pub multiplicity: Multiplicity,
    /// Ordered property keys; each must be declared before the label.
    #[serde(default)]
    pub signature: Vec<String>,
}

impl EdgeLabel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            multiplicity: Multiplicity::Multi,
            signature: Vec::new(),
        }
    }

    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn with_signature(mut self, keys: &[&str]) -> Self {
        self.signature = keys.iter().map(|k| k.to_string()).collect();
        self
    }
}

/// Exact-match index over one or more declared keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeIndex {
    pub name: String,
    pub element: ElementKind,
    pub keys: Vec<String>,
}

impl CompositeIndex {
    pub fn new(name: &str, element: ElementKind, keys: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            element,
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RelationType {
    PropertyKey(PropertyKey),
    VertexLabel(String),
    EdgeLabel(EdgeLabel),
}

impl RelationType {
    pub fn name(&self) -> &str {
        match self {
            RelationType::PropertyKey(key) => &key.name,
            RelationType::VertexLabel(name) => name,
            RelationType::EdgeLabel(label) => &label.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Vertex {
    pub id: i64,
    pub label: String,
    pub properties: BTreeMap<String, Vec<PropertyValue>>,
}

impl Vertex {
    /// First value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key).and_then(|values| values.first())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Edge {
    pub id: i64,
    pub label: String,
    pub from_id: i64,
    pub to_id: i64,
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// Vertex selection used by traversals, updates and deletes.
#[derive(Clone, Debug, PartialEq)]
pub enum Criterion {
    Label(String),
    Has { key: String, value: PropertyValue },
    Compare {
        key: String,
        op: CompareOp,
        bound: PropertyValue,
    },
    And(Vec<Criterion>),
}

impl Criterion {
    pub fn has(key: &str, value: impl Into<PropertyValue>) -> Self {
        Criterion::Has {
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn label(label: &str) -> Self {
        Criterion::Label(label.to_string())
    }

    pub fn gte(key: &str, bound: impl Into<PropertyValue>) -> Self {
        Criterion::Compare {
            key: key.to_string(),
            op: CompareOp::Gte,
            bound: bound.into(),
        }
    }

    pub fn compare(key: &str, op: CompareOp, bound: impl Into<PropertyValue>) -> Self {
        Criterion::Compare {
            key: key.to_string(),
            op,
            bound: bound.into(),
        }
    }

    pub fn and(self, other: Criterion) -> Self {
        match self {
            Criterion::And(mut parts) => {
                parts.push(other);
                Criterion::And(parts)
            }
            first => Criterion::And(vec![first, other]),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Label(label) => write!(f, "label={label}"),
            Criterion::Has { key, value } => write!(f, "{key}={value}"),
            Criterion::Compare { key, op, bound } => write!(f, "{key}{}{bound}", op.as_sql()),
            Criterion::And(parts) => {
                let joined: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", joined.join(" and "))
            }
        }
    }
}
