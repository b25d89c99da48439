//! Hashed streaming group-by.

use crate::aggregate::Aggregator;
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::registry::{instantiate, StatModule, StatRegistry};
use crate::table::Table;
use hashbrown::HashMap;
use regex::Regex;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;
use tabula_core::{Error, NamedRow, Result, Value};

/// `name(source[, arg...])[ as output]`
static AGGREGATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([a-z_][a-z0-9_]*)\s*\((.*)\)\s*(?:as\s+(\S+))?\s*$")
        .expect("aggregate pattern compiles")
});

/// Creates a fresh aggregator for each group.
pub trait AggregatorFactory {
    fn create(&self) -> Result<Box<dyn Aggregator>>;
}

impl<F> AggregatorFactory for F
where
    F: Fn() -> Box<dyn Aggregator>,
{
    fn create(&self) -> Result<Box<dyn Aggregator>> {
        Ok(self())
    }
}

/// A registry module bound to its call arguments.
struct ModuleCall {
    module: Rc<dyn StatModule>,
    args: Vec<Value>,
}

impl AggregatorFactory for ModuleCall {
    fn create(&self) -> Result<Box<dyn Aggregator>> {
        instantiate(self.module.as_ref(), &self.args)
    }
}

/// `output = aggregate(source)` for one group-by output column.
#[derive(Clone)]
pub struct AggregateExpr {
    source: String,
    factory: Rc<dyn AggregatorFactory>,
    output: String,
}

impl AggregateExpr {
    pub fn new(
        source: impl Into<String>,
        factory: impl AggregatorFactory + 'static,
        output: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            factory: Rc::new(factory),
            output: output.into(),
        }
    }

    /// Uses a registry module, checked against its capabilities when the
    /// first group is seen.
    pub fn module(
        source: impl Into<String>,
        module: Rc<dyn StatModule>,
        args: Vec<Value>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            factory: Rc::new(ModuleCall { module, args }),
            output: output.into(),
        }
    }

    /// Parses `name(source[, arg...])[ as output]`, e.g. `sum(b) as total` or
    /// `percentile(price, 90) as p90`. Without `as`, the output is named after
    /// the source column. Arguments are integers, floats, `true`/`false`/`null`
    /// or quoted strings.
    pub fn parse(text: &str, registry: &StatRegistry) -> Result<Self> {
        let malformed = || Error::invalid_argument(format!("malformed aggregate: {}", text));
        let captures = AGGREGATE_SHAPE.captures(text).ok_or_else(malformed)?;
        let name = &captures[1];
        let mut parts = captures[2].split(',').map(str::trim);
        let source = match parts.next() {
            Some(source) if !source.is_empty() => source.to_string(),
            _ => return Err(malformed()),
        };
        let args = parts.map(parse_arg).collect::<Result<Vec<_>>>()?;
        let output = captures
            .get(3)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| source.clone());
        let module = registry.get(name)?;
        Ok(Self::module(source, module, args, output))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

impl fmt::Debug for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateExpr")
            .field("source", &self.source)
            .field("output", &self.output)
            .finish()
    }
}

fn parse_arg(text: &str) -> Result<Value> {
    if text.is_empty() {
        return Err(Error::invalid_argument("empty aggregate argument"));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Int64(i));
    }
    if let Ok(f) = text.parse::<f64>() {
        return Ok(Value::Float64(f));
    }
    match text {
        "true" => return Ok(Value::Boolean(true)),
        "false" => return Ok(Value::Boolean(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Ok(Value::String(text[1..text.len() - 1].to_string()));
        }
    }
    Err(Error::invalid_argument(format!(
        "cannot read aggregate argument: {}",
        text
    )))
}

struct Group {
    keys: Vec<Value>,
    aggregators: Vec<Box<dyn Aggregator>>,
}

/// Running state of one group-by: a fingerprint index over the groups seen so
/// far. Rows are folded as they are fed, so memory grows with the number of
/// groups, not rows.
pub(crate) struct Grouper<'a> {
    keys: &'a [&'a str],
    aggregates: &'a [AggregateExpr],
    index: HashMap<Fingerprint, usize>,
    groups: Vec<Group>,
    rows: usize,
}

impl<'a> Grouper<'a> {
    /// Rejects output names that collide with a key or with each other.
    /// Columns are validated by the caller.
    pub(crate) fn new(keys: &'a [&'a str], aggregates: &'a [AggregateExpr]) -> Result<Self> {
        for (i, expr) in aggregates.iter().enumerate() {
            let output = expr.output.as_str();
            if keys.contains(&output) || aggregates[..i].iter().any(|e| e.output == output) {
                return Err(Error::invalid_argument(format!(
                    "duplicate group-by output column: {}",
                    output
                )));
            }
        }
        Ok(Self {
            keys,
            aggregates,
            index: HashMap::new(),
            groups: Vec::new(),
            rows: 0,
        })
    }

    fn new_group(&self, keys: Vec<Value>) -> Result<Group> {
        Ok(Group {
            keys,
            aggregators: self
                .aggregates
                .iter()
                .map(|a| a.factory.create())
                .collect::<Result<Vec<_>>>()?,
        })
    }

    /// Folds one full record into its group.
    pub(crate) fn feed(&mut self, row: &NamedRow) -> Result<()> {
        self.rows += 1;
        let key_values: Vec<Value> = self
            .keys
            .iter()
            .map(|k| row.get(*k).cloned().unwrap_or(Value::Null))
            .collect();
        let fp = fingerprint(&key_values);
        let slot = match self.index.get(&fp) {
            Some(slot) => *slot,
            None => {
                let group = self.new_group(key_values)?;
                self.groups.push(group);
                self.index.insert(fp, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[slot];
        for (expr, aggregator) in self.aggregates.iter().zip(group.aggregators.iter_mut()) {
            aggregator.add_value(row.get(expr.source.as_str()).unwrap_or(&Value::Null));
        }
        Ok(())
    }

    /// One output row per group, in first-seen order, in a new table sharing
    /// `source`'s registry. An empty key list always yields one row.
    pub(crate) fn finish(mut self, source: &Table) -> Result<Table> {
        if self.keys.is_empty() && self.groups.is_empty() {
            let group = self.new_group(Vec::new())?;
            self.groups.push(group);
        }

        let mut out = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let mut named = NamedRow::default();
            for (name, value) in self.keys.iter().zip(group.keys.iter()) {
                named.insert(name.to_string(), value.clone());
            }
            for (expr, aggregator) in self.aggregates.iter().zip(group.aggregators.iter()) {
                named.insert(expr.output.clone(), aggregator.result()?);
            }
            out.push(named);
        }
        tracing::debug!(rows = self.rows, groups = out.len(), "group-by finished");

        let mut builder = Table::builder().registry(source.registry());
        for name in self.keys {
            builder = builder.column(*name);
        }
        for expr in self.aggregates {
            builder = builder.column(expr.output.clone());
        }
        builder.rows(out).build()
    }
}
