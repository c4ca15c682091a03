//! Request-URI interpretation shared by checks and the verification
//! context.
//!
//! The harness understands a fixed URI shape:
//! `/<set>[(<key literals>)][/<navigation>][?<query>]` with an optional
//! `$skiptoken` query option. Anything else is a structural error, not a
//! verification failure.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::model::{ResourceSet, Workspace};

/// Parsed request target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetUri {
    pub entity_set: String,
    /// Key literal values, present when the URI addresses a single entity.
    pub key: Option<Vec<Value>>,
    /// Trailing navigation segment, if any.
    pub navigation: Option<String>,
    pub skiptoken: Option<String>,
}

impl TargetUri {
    /// True when the URI addresses a collection rather than one entity.
    pub fn is_collection(&self, workspace: &Workspace) -> bool {
        match (&self.key, &self.navigation) {
            (None, None) => true,
            (Some(_), Some(nav)) => workspace
                .type_of_set(&self.entity_set)
                .and_then(|rtype| rtype.navigation_named(nav))
                .is_some_and(|nav| nav.collection),
            _ => false,
        }
    }

    /// Entity set the request ultimately targets, following a navigation
    /// segment when present.
    pub fn target_set<'a>(&self, workspace: &'a Workspace) -> Result<&'a ResourceSet> {
        let base = workspace
            .set(&self.entity_set)
            .with_context(|| format!("unknown entity set {}", self.entity_set))?;
        let Some(nav_name) = &self.navigation else {
            return Ok(base);
        };
        let rtype = workspace
            .resource_type(&base.resource_type)
            .with_context(|| format!("unknown resource type {}", base.resource_type))?;
        let nav = rtype
            .navigation_named(nav_name)
            .with_context(|| format!("{} has no navigation {}", rtype.name, nav_name))?;
        workspace
            .set(&nav.target_set)
            .with_context(|| format!("navigation {} targets unknown set {}", nav_name, nav.target_set))
    }
}

/// Parse a request URI into its target.
pub fn parse(uri: &str) -> Result<TargetUri> {
    let (path, query) = match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    };

    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    let Some(first) = segments.next() else {
        bail!("uri {uri} has no path segments");
    };
    let (entity_set, key) = parse_set_segment(first)
        .with_context(|| format!("uri {uri} has a malformed first segment"))?;

    let navigation = segments.next().map(str::to_string);
    if let Some(nav) = &navigation {
        if nav.contains('(') {
            bail!("uri {uri}: key predicates on navigation segments are unsupported");
        }
        if key.is_none() {
            bail!("uri {uri}: navigation requires a key on the first segment");
        }
    }
    if segments.next().is_some() {
        bail!("uri {uri} has more segments than the harness supports");
    }

    let skiptoken = query.and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix("$skiptoken=").map(str::to_string)
        })
    });

    Ok(TargetUri {
        entity_set,
        key,
        navigation,
        skiptoken,
    })
}

/// Request path without its query string.
pub fn without_query(uri: &str) -> &str {
    uri.split_once('?').map_or(uri, |(path, _)| path)
}

/// Canonical URI for a single entity, e.g. `/Customers('ALFKI')`.
pub fn entity_uri(set: &str, key_values: &[Value]) -> String {
    let literals: Vec<String> = key_values.iter().map(key_literal).collect();
    format!("/{}({})", set, literals.join(","))
}

/// Render a key value the way it appears in a URI key predicate.
pub fn key_literal(value: &Value) -> String {
    match value {
        Value::String(text) => format!("'{text}'"),
        other => other.to_string(),
    }
}

fn parse_set_segment(segment: &str) -> Result<(String, Option<Vec<Value>>)> {
    let Some(open) = segment.find('(') else {
        return Ok((segment.to_string(), None));
    };
    let Some(stripped) = segment.strip_suffix(')') else {
        bail!("unbalanced key predicate in {segment}");
    };
    let name = &stripped[..open];
    let raw = &stripped[open + 1..];
    if name.is_empty() || raw.is_empty() {
        bail!("empty set name or key predicate in {segment}");
    }
    let key = raw
        .split(',')
        .map(parse_key_literal)
        .collect::<Result<Vec<Value>>>()?;
    Ok((name.to_string(), Some(key)))
}

fn parse_key_literal(raw: &str) -> Result<Value> {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('\'') {
        let Some(text) = inner.strip_suffix('\'') else {
            bail!("unterminated string literal {raw}");
        };
        return Ok(Value::String(text.to_string()));
    }
    let number: i64 = raw
        .parse()
        .with_context(|| format!("key literal {raw} is neither quoted nor an integer"))?;
    Ok(Value::Number(number.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample;
    use serde_json::json;

    #[test]
    fn parses_bare_collection() {
        let target = parse("/Customers").expect("parse");
        assert_eq!(target.entity_set, "Customers");
        assert_eq!(target.key, None);
        assert_eq!(target.navigation, None);
    }

    #[test]
    fn parses_string_key() {
        let target = parse("/Customers('ALFKI')").expect("parse");
        assert_eq!(target.key, Some(vec![json!("ALFKI")]));
    }

    #[test]
    fn parses_integer_key_and_navigation() {
        let target = parse("/Orders(7)/Customer").expect("parse");
        assert_eq!(target.entity_set, "Orders");
        assert_eq!(target.key, Some(vec![json!(7)]));
        assert_eq!(target.navigation.as_deref(), Some("Customer"));
    }

    #[test]
    fn parses_skiptoken() {
        let target = parse("/Orders?$skiptoken=7").expect("parse");
        assert_eq!(target.skiptoken.as_deref(), Some("7"));
    }

    #[test]
    fn rejects_navigation_without_key() {
        let err = parse("/Customers/Orders").expect_err("no key");
        assert!(err.to_string().contains("requires a key"));
    }

    #[test]
    fn rejects_malformed_key_predicates() {
        parse("/Customers('ALFKI'").expect_err("unbalanced");
        parse("/Customers(alfki)").expect_err("unquoted string");
    }

    #[test]
    fn target_set_follows_navigation() {
        let workspace = sample::customers_orders();
        let target = parse("/Customers('ALFKI')/Orders").expect("parse");
        let set = target.target_set(&workspace).expect("target set");
        assert_eq!(set.name, "Orders");
        assert!(target.is_collection(&workspace));
    }

    #[test]
    fn single_entity_is_not_collection() {
        let workspace = sample::customers_orders();
        let target = parse("/Customers('ALFKI')").expect("parse");
        assert!(!target.is_collection(&workspace));
        let target = parse("/Orders(7)/Customer").expect("parse");
        assert!(!target.is_collection(&workspace));
    }

    #[test]
    fn entity_uri_round_trips_literals() {
        assert_eq!(entity_uri("Customers", &[json!("ALFKI")]), "/Customers('ALFKI')");
        assert_eq!(entity_uri("Orders", &[json!(7)]), "/Orders(7)");
    }
}
