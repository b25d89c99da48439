//! Stat module registry.
//!
//! A stat module is a named capability that produces aggregators. It can be
//! usable as a zero-argument derived property (`table.select_all()?.stat("sum", "b")`),
//! as a callable method with arguments (`call_module("percentile", "b", &[90.into()])`),
//! or both. Group-by aggregate expressions resolve their functions here too.

use crate::aggregate::{
    Aggregator, Count, CountDistinctValues, First, Max, Mean, Min, Percentile, Sum,
};
use hashbrown::HashMap;
use std::fmt;
use std::rc::Rc;
use tabula_core::{Error, Result, Value};

/// Ways a module may be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Usable without arguments.
    pub property: bool,
    /// Usable with arguments.
    pub method: bool,
}

impl Capabilities {
    pub const PROPERTY: Capabilities = Capabilities {
        property: true,
        method: false,
    };

    pub const METHOD: Capabilities = Capabilities {
        property: false,
        method: true,
    };

    pub const BOTH: Capabilities = Capabilities {
        property: true,
        method: true,
    };
}

/// A named aggregator factory.
pub trait StatModule {
    /// Registry name.
    fn name(&self) -> &str;

    /// How the module may be used.
    fn capabilities(&self) -> Capabilities;

    /// Creates a fresh aggregator. `args` is empty for property use.
    fn aggregator(&self, args: &[Value]) -> Result<Box<dyn Aggregator>>;
}

/// Creates an aggregator for `module`, checking the module supports being used
/// with (or without) arguments.
pub fn instantiate(module: &dyn StatModule, args: &[Value]) -> Result<Box<dyn Aggregator>> {
    let caps = module.capabilities();
    if args.is_empty() && !caps.property {
        return Err(Error::unsupported(module.name(), "property use"));
    }
    if !args.is_empty() && !caps.method {
        return Err(Error::unsupported(module.name(), "method call"));
    }
    module.aggregator(args)
}

/// Property-style module backed by a constructor.
pub struct AggregateModule {
    name: String,
    make: fn() -> Box<dyn Aggregator>,
}

impl AggregateModule {
    pub fn new(name: impl Into<String>, make: fn() -> Box<dyn Aggregator>) -> Self {
        Self {
            name: name.into(),
            make,
        }
    }
}

impl StatModule for AggregateModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::PROPERTY
    }

    fn aggregator(&self, _args: &[Value]) -> Result<Box<dyn Aggregator>> {
        Ok((self.make)())
    }
}

/// `count_distinct_values`, optionally called with a bit threshold for long strings.
struct CountDistinctModule;

impl StatModule for CountDistinctModule {
    fn name(&self) -> &str {
        "count_distinct_values"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::BOTH
    }

    fn aggregator(&self, args: &[Value]) -> Result<Box<dyn Aggregator>> {
        match args {
            [] => Ok(Box::new(CountDistinctValues::new())),
            [Value::Int64(bits)] if *bits >= 0 => {
                Ok(Box::new(CountDistinctValues::with_threshold(*bits as usize)))
            }
            _ => Err(Error::invalid_argument(
                "count_distinct_values takes one non-negative integer threshold",
            )),
        }
    }
}

/// `percentile(p)`: method only.
struct PercentileModule;

impl StatModule for PercentileModule {
    fn name(&self) -> &str {
        "percentile"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::METHOD
    }

    fn aggregator(&self, args: &[Value]) -> Result<Box<dyn Aggregator>> {
        let percent = match args {
            [Value::Int64(p)] => *p as f64,
            [Value::Float64(p)] => *p,
            _ => {
                return Err(Error::invalid_argument(
                    "percentile takes exactly one numeric argument",
                ))
            }
        };
        Ok(Box::new(Percentile::new(percent)?))
    }
}

/// Name-keyed set of stat modules.
#[derive(Clone, Default)]
pub struct StatRegistry {
    modules: HashMap<String, Rc<dyn StatModule>>,
}

impl StatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in module.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: Vec<Rc<dyn StatModule>> = vec![
            Rc::new(AggregateModule::new("sum", || Box::new(Sum::new()))),
            Rc::new(AggregateModule::new("mean", || Box::new(Mean::new()))),
            Rc::new(AggregateModule::new("average", || Box::new(Mean::new()))),
            Rc::new(AggregateModule::new("min", || Box::new(Min::new()))),
            Rc::new(AggregateModule::new("max", || Box::new(Max::new()))),
            Rc::new(AggregateModule::new("first", || Box::new(First::new()))),
            Rc::new(AggregateModule::new("count", || Box::new(Count::new()))),
            Rc::new(CountDistinctModule),
            Rc::new(PercentileModule),
        ];
        for module in builtins {
            registry
                .modules
                .insert(module.name().to_string(), module);
        }
        registry
    }

    /// Adds `module`, failing if its name is taken.
    pub fn register(&mut self, module: Rc<dyn StatModule>) -> Result<()> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(Error::duplicate_module(name));
        }
        tracing::debug!(module = %name, "stat module registered");
        self.modules.insert(name, module);
        Ok(())
    }

    /// Looks up a module by name, failing with "no such stat".
    pub fn get(&self, name: &str) -> Result<Rc<dyn StatModule>> {
        self.modules
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unknown_module(name))
    }

    /// Returns true if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for StatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
