//! Key condition, filter/condition, update and projection expressions.
//!
//! Attribute names are always substituted with `#N` placeholders and values with `:N`
//! placeholders, so reserved words never reach the store verbatim. Parts are rendered in
//! a fixed order (key condition, filter, condition, projection, update) which makes the
//! output deterministic for a given input.
//!
//! ```rust
//! use dynamo_entity::expression::{Condition, ExpressionBuilder, Update};
//!
//! let expression = ExpressionBuilder::new()
//!     .with_condition(Condition::equal("PK", "UID#1").and(Condition::greater_than_equal("version", 3)))
//!     .with_update(Update::set("status", "done"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(expression.condition.as_deref(), Some("(#0 = :0) AND (#1 >= :1)"));
//! assert_eq!(expression.update.as_deref(), Some("SET #2 = :2"));
//! ```

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::entity::{PARTITION_KEY_ATTRIBUTE, SORT_KEY_ATTRIBUTE, Value};
use crate::error::Error;
use crate::reflect::AttributeMap;

/// A condition over item attributes
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// `name = value`
    Equal {
        /// Attribute name
        name: String,
        /// Expected value
        value: Value,
    },
    /// `name >= value`
    GreaterThanEqual {
        /// Attribute name
        name: String,
        /// Lower bound
        value: Value,
    },
    /// Every operand holds
    And(Vec<Condition>),
}

impl Condition {
    /// `name = value`
    pub fn equal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Equal {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `name >= value`
    pub fn greater_than_equal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::GreaterThanEqual {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Conjunction of `self` and `other`, nested conjunctions are flattened
    pub fn and(self, other: Condition) -> Self {
        let mut operands = match self {
            Condition::And(operands) => operands,
            single => vec![single],
        };
        match other {
            Condition::And(more) => operands.extend(more),
            single => operands.push(single),
        }
        Condition::And(operands)
    }

    fn render(&self, placeholders: &mut Placeholders) -> Result<String, Error> {
        match self {
            Condition::Equal { name, value } => Ok(format!(
                "{} = {}",
                placeholders.name(name),
                placeholders.value(value)
            )),
            Condition::GreaterThanEqual { name, value } => Ok(format!(
                "{} >= {}",
                placeholders.name(name),
                placeholders.value(value)
            )),
            Condition::And(operands) => match operands.as_slice() {
                [] => Err(Error::InvalidExpression(
                    "AND condition needs at least one operand".to_string(),
                )),
                [single] => single.render(placeholders),
                operands => Ok(operands
                    .iter()
                    .map(|operand| operand.render(placeholders).map(|s| format!("({s})")))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(" AND ")),
            },
        }
    }
}

/// Conjunction of key equality predicates
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyCondition {
    predicates: Vec<(String, Value)>,
}

impl KeyCondition {
    /// `name = value`
    pub fn equal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            predicates: vec![(name.into(), value.into())],
        }
    }

    /// Add another equality predicate
    pub fn and(mut self, other: KeyCondition) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    /// `true` when no predicate is set
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    fn render(&self, placeholders: &mut Placeholders) -> Result<String, Error> {
        let rendered: Vec<String> = self
            .predicates
            .iter()
            .map(|(name, value)| {
                format!("{} = {}", placeholders.name(name), placeholders.value(value))
            })
            .collect();

        match rendered.as_slice() {
            [] => Err(Error::InvalidExpression(
                "key condition needs at least one predicate".to_string(),
            )),
            [single] => Ok(single.clone()),
            many => Ok(many
                .iter()
                .map(|s| format!("({s})"))
                .collect::<Vec<_>>()
                .join(" AND ")),
        }
    }
}

/// `SET` assignments
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    assignments: Vec<(String, Value)>,
}

impl Update {
    /// `SET name = value`
    pub fn set(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_set(name, value)
    }

    /// Add another assignment
    pub fn and_set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((name.into(), value.into()));
        self
    }

    /// `true` when no assignment is set
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    fn render(&self, placeholders: &mut Placeholders) -> Result<String, Error> {
        if self.assignments.is_empty() {
            return Err(Error::InvalidExpression(
                "update needs at least one assignment".to_string(),
            ));
        }
        let assignments: Vec<String> = self
            .assignments
            .iter()
            .map(|(name, value)| {
                format!("{} = {}", placeholders.name(name), placeholders.value(value))
            })
            .collect();
        Ok(format!("SET {}", assignments.join(", ")))
    }
}

/// Attributes to return
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    names: Vec<String>,
}

impl Projection {
    /// Project the given attribute names
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    fn render(&self, placeholders: &mut Placeholders) -> Result<String, Error> {
        if self.names.is_empty() {
            return Err(Error::InvalidExpression(
                "projection needs at least one attribute".to_string(),
            ));
        }
        Ok(self
            .names
            .iter()
            .map(|name| placeholders.name(name))
            .collect::<Vec<_>>()
            .join(", "))
    }
}

/// Attribute name to `#N`, plus `:N` to value
#[derive(Debug, Default)]
struct Placeholders {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Placeholders {
    fn name(&mut self, name: &str) -> String {
        let next = self.names.len();
        self.names
            .entry(name.to_string())
            .or_insert_with(|| format!("#{next}"))
            .clone()
    }

    fn value(&mut self, value: &Value) -> String {
        let placeholder = format!(":{}", self.values.len());
        let _ = self
            .values
            .insert(placeholder.clone(), value.to_attribute_value());
        placeholder
    }
}

/// Rendered expression strings plus their placeholder tables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expression {
    /// Key condition expression
    pub key_condition: Option<String>,
    /// Filter expression
    pub filter: Option<String>,
    /// Condition expression
    pub condition: Option<String>,
    /// Update expression
    pub update: Option<String>,
    /// Projection expression
    pub projection: Option<String>,
    /// `#N` placeholder to attribute name
    pub names: HashMap<String, String>,
    /// `:N` placeholder to attribute value
    pub values: HashMap<String, AttributeValue>,
}

impl Expression {
    /// Placeholder names, `None` when empty
    pub fn attribute_names(&self) -> Option<HashMap<String, String>> {
        Some(self.names.clone()).filter(|names| !names.is_empty())
    }

    /// Placeholder values, `None` when empty
    pub fn attribute_values(&self) -> Option<HashMap<String, AttributeValue>> {
        Some(self.values.clone()).filter(|values| !values.is_empty())
    }
}

/// Assembles an [`Expression`] from any subset of its parts
#[derive(Clone, Debug, Default)]
pub struct ExpressionBuilder {
    key_condition: Option<KeyCondition>,
    filter: Option<Condition>,
    condition: Option<Condition>,
    projection: Option<Projection>,
    update: Option<Update>,
}

impl ExpressionBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key condition
    pub fn with_key_condition(mut self, key_condition: KeyCondition) -> Self {
        self.key_condition = Some(key_condition);
        self
    }

    /// Set the filter
    pub fn with_filter(mut self, filter: Condition) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the projection
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Set the update
    pub fn with_update(mut self, update: Update) -> Self {
        self.update = Some(update);
        self
    }

    /// Render every part that was set
    ///
    /// Fails with [`Error::InvalidExpression`] when no part is set or a set part is empty.
    pub fn build(self) -> Result<Expression, Error> {
        if self.key_condition.is_none()
            && self.filter.is_none()
            && self.condition.is_none()
            && self.projection.is_none()
            && self.update.is_none()
        {
            return Err(Error::InvalidExpression(
                "expression builder has no parts set".to_string(),
            ));
        }

        let mut placeholders = Placeholders::default();
        let key_condition = self
            .key_condition
            .map(|part| part.render(&mut placeholders))
            .transpose()?;
        let filter = self
            .filter
            .map(|part| part.render(&mut placeholders))
            .transpose()?;
        let condition = self
            .condition
            .map(|part| part.render(&mut placeholders))
            .transpose()?;
        let projection = self
            .projection
            .map(|part| part.render(&mut placeholders))
            .transpose()?;
        let update = self
            .update
            .map(|part| part.render(&mut placeholders))
            .transpose()?;

        Ok(Expression {
            key_condition,
            filter,
            condition,
            update,
            projection,
            names: placeholders
                .names
                .into_iter()
                .map(|(name, placeholder)| (placeholder, name))
                .collect(),
            values: placeholders.values,
        })
    }
}

/// Equality key condition over every entry of `criteria`, `None` when empty
pub fn key_condition_from_map(criteria: &AttributeMap) -> Option<KeyCondition> {
    criteria
        .iter()
        .map(|(name, value)| KeyCondition::equal(name.as_str(), value.clone()))
        .reduce(KeyCondition::and)
}

/// Equality conjunction over every entry of `criteria`, `None` when empty
pub fn condition_from_map(criteria: &AttributeMap) -> Option<Condition> {
    criteria
        .iter()
        .map(|(name, value)| Condition::equal(name.as_str(), value.clone()))
        .reduce(Condition::and)
}

/// `SET` of every entry of `fields`, `None` when empty
pub fn update_from_map(fields: &AttributeMap) -> Option<Update> {
    fields
        .iter()
        .map(|(name, value)| Update::set(name.as_str(), value.clone()))
        .reduce(|update, next| Update {
            assignments: update.assignments.into_iter().chain(next.assignments).collect(),
        })
}

/// Split query-by-example criteria into the `PK`/`SK` key part and the remaining attributes
pub fn split_key_criteria(criteria: &AttributeMap) -> (AttributeMap, AttributeMap) {
    criteria
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .partition(|(name, _)| name == PARTITION_KEY_ATTRIBUTE || name == SORT_KEY_ATTRIBUTE)
}

/// Build a read expression from optional criteria, filter and projection
///
/// Criteria `PK`/`SK` become the key condition; any other criterion is an equality
/// filter evaluated before `filter`.
pub fn generate_expression(
    criteria: Option<&AttributeMap>,
    filter: Option<Condition>,
    projection: Option<Projection>,
) -> Result<Expression, Error> {
    let mut builder = ExpressionBuilder::new();
    let mut filter = filter;

    if let Some(criteria) = criteria {
        let (keys, attributes) = split_key_criteria(criteria);
        if let Some(key_condition) = key_condition_from_map(&keys) {
            builder = builder.with_key_condition(key_condition);
        }
        filter = match (condition_from_map(&attributes), filter) {
            (Some(attributes), Some(filter)) => Some(attributes.and(filter)),
            (attributes, filter) => attributes.or(filter),
        };
    }

    if let Some(filter) = filter {
        builder = builder.with_filter(filter);
    }
    if let Some(projection) = projection {
        builder = builder.with_projection(projection);
    }

    builder.build()
}
