use std::collections::BTreeMap;

use crate::collection::model::{FieldValue, ItemValues};

/// Item counts of resolved collection layers, keyed by original layer id.
pub type CollectionCounts = BTreeMap<String, usize>;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Boolean expression: groups are OR-ed, conditions inside a group are AND-ed.
pub struct ConditionSet {
    /// Alternative groups.
    #[serde(default)]
    pub groups: Vec<ConditionGroup>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Conditions that must all hold.
pub struct ConditionGroup {
    /// Conjuncts.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// One comparison.
pub struct Condition {
    /// Left-hand side.
    pub source: ConditionSource,
    /// Comparator.
    pub operator: Operator,
    /// Right-hand side, for comparators that take one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// What a condition inspects.
pub enum ConditionSource {
    /// A value of the current item.
    Field {
        /// Field id.
        field_id: String,
        /// Reference fields to follow.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        relationships: Vec<String>,
    },
    /// Item count of another collection layer.
    CollectionCount {
        /// Original collection layer id.
        layer_id: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Comparator.
pub enum Operator {
    /// Equal (numeric when both sides are numbers).
    Is,
    /// Not equal.
    IsNot,
    /// Substring, or membership for reference lists.
    Contains,
    /// Negation of `contains`.
    DoesNotContain,
    /// Non-empty.
    IsPresent,
    /// Empty or missing.
    IsEmpty,
    /// Numeric greater-than.
    Gt,
    /// Numeric greater-or-equal.
    Gte,
    /// Numeric less-than.
    Lt,
    /// Numeric less-or-equal.
    Lte,
    /// At least one item / reference.
    HasItems,
    /// No items / references.
    HasNoItems,
}

/// Inputs a condition may read.
#[derive(Clone, Copy, Debug)]
pub struct VisibilityContext<'a> {
    /// Effective item values, if the node sits inside a binding context.
    pub item_values: Option<&'a ItemValues>,
    /// Aggregated collection counts.
    pub counts: &'a CollectionCounts,
}

/// Evaluate `set` against `ctx`. Empty sets and empty groups are true.
pub fn evaluate_visibility(set: &ConditionSet, ctx: &VisibilityContext<'_>) -> bool {
    if set.groups.is_empty() {
        return true;
    }
    set.groups
        .iter()
        .any(|g| g.conditions.iter().all(|c| evaluate_condition(c, ctx)))
}

fn evaluate_condition(c: &Condition, ctx: &VisibilityContext<'_>) -> bool {
    match &c.source {
        ConditionSource::CollectionCount { layer_id } => {
            let count = ctx.counts.get(layer_id).copied().unwrap_or(0);
            compare_count(count, c.operator, c.value.as_deref())
        }
        ConditionSource::Field {
            field_id,
            relationships,
        } => {
            let key = if relationships.is_empty() {
                field_id.clone()
            } else {
                format!("{field_id}.{}", relationships.join("."))
            };
            let value = ctx.item_values.and_then(|v| v.get(&key));
            compare_field(value, c.operator, c.value.as_deref())
        }
    }
}

fn compare_count(count: usize, op: Operator, rhs: Option<&str>) -> bool {
    let lhs = count as f64;
    let rhs_num = rhs.and_then(parse_number);
    match op {
        Operator::HasItems | Operator::IsPresent => count > 0,
        Operator::HasNoItems | Operator::IsEmpty => count == 0,
        Operator::Is => rhs_num.is_some_and(|r| lhs == r),
        Operator::IsNot => rhs_num.is_none_or(|r| lhs != r),
        Operator::Gt => rhs_num.is_some_and(|r| lhs > r),
        Operator::Gte => rhs_num.is_some_and(|r| lhs >= r),
        Operator::Lt => rhs_num.is_some_and(|r| lhs < r),
        Operator::Lte => rhs_num.is_some_and(|r| lhs <= r),
        Operator::Contains | Operator::DoesNotContain => false,
    }
}

fn compare_field(value: Option<&FieldValue>, op: Operator, rhs: Option<&str>) -> bool {
    let empty = value.is_none_or(FieldValue::is_empty);
    match op {
        Operator::IsPresent | Operator::HasItems => !empty,
        Operator::IsEmpty | Operator::HasNoItems => empty,
        Operator::Is => field_equals(value, rhs),
        Operator::IsNot => !field_equals(value, rhs),
        Operator::Contains => field_contains(value, rhs),
        Operator::DoesNotContain => !field_contains(value, rhs),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let lhs = value.and_then(|v| parse_number(&v.as_text()));
            let rhs = rhs.and_then(parse_number);
            let (Some(l), Some(r)) = (lhs, rhs) else {
                return false;
            };
            match op {
                Operator::Gt => l > r,
                Operator::Gte => l >= r,
                Operator::Lt => l < r,
                _ => l <= r,
            }
        }
    }
}

fn field_equals(value: Option<&FieldValue>, rhs: Option<&str>) -> bool {
    let rhs = rhs.unwrap_or("");
    let lhs = value.map(|v| v.as_text()).unwrap_or_default();
    match (parse_number(&lhs), parse_number(rhs)) {
        (Some(l), Some(r)) => l == r,
        _ => lhs == rhs,
    }
}

fn field_contains(value: Option<&FieldValue>, rhs: Option<&str>) -> bool {
    let Some(rhs) = rhs else {
        return false;
    };
    match value {
        None => false,
        Some(FieldValue::References(ids)) => ids.iter().any(|id| id == rhs),
        Some(FieldValue::Text(s)) => s.to_lowercase().contains(&rhs.to_lowercase()),
    }
}

pub(crate) fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
#[path = "../../tests/unit/visibility/condition.rs"]
mod tests;
