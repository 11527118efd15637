//! Pass/drop rules applied to the points emitted by an input.
//!
//! A [`Filter`] is compiled once, when the configuration is loaded, from the
//! `pass`, `drop`, `tagpass` and `tagdrop` settings of an input (see [`FilterSpec`]).
//! It is then evaluated on the hot path, for every point, with [`Filter::should_pass`].
//!
//! ## Semantics
//!
//! A point survives the filter if and only if **all** the following conditions hold:
//! - `pass` is empty, or the measurement name matches at least one `pass` pattern;
//! - the measurement name matches no `drop` pattern;
//! - for every tag filter of `tagpass`, the point has the tag and its value matches
//!   at least one of the filter's patterns;
//! - for every tag filter of `tagdrop`, the point does not have the tag, or its value
//!   matches none of the filter's patterns.
//!
//! Patterns are [`StringPattern`]s. A filter without any rule is inactive
//! and accepts every point without looking at it.
use std::collections::BTreeMap;

use crate::metric::Metric;

pub use pattern::{PatternParseError, StringPattern};

pub mod pattern;

/// Uncompiled filter settings, as declared in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub pass: Vec<String>,
    pub drop: Vec<String>,
    /// Tag key and accepted values, in declaration order.
    pub tag_pass: Vec<(String, Vec<String>)>,
    /// Tag key and rejected values, in declaration order.
    pub tag_drop: Vec<(String, Vec<String>)>,
}

/// A set of patterns scoped to one tag key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    name: String,
    filter: Vec<String>,
    patterns: Vec<StringPattern>,
}

/// Compiled pass/drop rules.
///
/// The filter is immutable: evaluating it never modifies it, therefore it can be shared
/// between threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pass: Vec<String>,
    drop: Vec<String>,
    tag_pass: Vec<TagFilter>,
    tag_drop: Vec<TagFilter>,
    pass_patterns: Vec<StringPattern>,
    drop_patterns: Vec<StringPattern>,
    is_active: bool,
}

impl TagFilter {
    /// Creates a filter on the tag `name`.
    ///
    /// The values are trimmed and parsed as patterns.
    pub fn new(name: impl Into<String>, filter: Vec<String>) -> Result<Self, PatternParseError> {
        let (filter, patterns) = compile_patterns(filter)?;
        Ok(Self {
            name: name.into(),
            filter,
            patterns,
        })
    }

    /// The tag key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared values.
    pub fn filter(&self) -> &[String] {
        &self.filter
    }

    /// Returns true if the point has the tag and its value matches one of the patterns.
    fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        tags.get(&self.name)
            .is_some_and(|value| self.patterns.iter().any(|p| p.matches(value)))
    }
}

impl Filter {
    /// Compiles the filter settings of an input.
    ///
    /// Duplicate patterns are kept, in declaration order.
    pub fn compile(spec: FilterSpec) -> Result<Self, PatternParseError> {
        let (pass, pass_patterns) = compile_patterns(spec.pass)?;
        let (drop, drop_patterns) = compile_patterns(spec.drop)?;
        let tag_pass = compile_tag_filters(spec.tag_pass)?;
        let tag_drop = compile_tag_filters(spec.tag_drop)?;
        let is_active = !(pass.is_empty() && drop.is_empty() && tag_pass.is_empty() && tag_drop.is_empty());
        Ok(Self {
            pass,
            drop,
            tag_pass,
            tag_drop,
            pass_patterns,
            drop_patterns,
            is_active,
        })
    }

    /// Creates a filter that accepts everything.
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn pass(&self) -> &[String] {
        &self.pass
    }

    pub fn drop(&self) -> &[String] {
        &self.drop
    }

    pub fn tag_pass(&self) -> &[TagFilter] {
        &self.tag_pass
    }

    pub fn tag_drop(&self) -> &[TagFilter] {
        &self.tag_drop
    }

    /// Decides whether a point with the given measurement name and tags should be kept.
    pub fn should_pass(&self, name: &str, tags: &BTreeMap<String, String>) -> bool {
        if !self.is_active {
            return true;
        }
        if !self.pass_patterns.is_empty() && !self.pass_patterns.iter().any(|p| p.matches(name)) {
            return false;
        }
        if self.drop_patterns.iter().any(|p| p.matches(name)) {
            return false;
        }
        if !self.tag_pass.iter().all(|f| f.matches(tags)) {
            return false;
        }
        !self.tag_drop.iter().any(|f| f.matches(tags))
    }

    /// Decides whether a metric should be kept.
    pub fn should_pass_metric(&self, metric: &Metric) -> bool {
        self.should_pass(&metric.name, &metric.tags)
    }
}

fn compile_patterns(patterns: Vec<String>) -> Result<(Vec<String>, Vec<StringPattern>), PatternParseError> {
    let mut sources = Vec::with_capacity(patterns.len());
    let mut compiled = Vec::with_capacity(patterns.len());
    for p in patterns {
        compiled.push(p.parse::<StringPattern>()?);
        sources.push(p.trim().to_owned());
    }
    Ok((sources, compiled))
}

fn compile_tag_filters(filters: Vec<(String, Vec<String>)>) -> Result<Vec<TagFilter>, PatternParseError> {
    filters
        .into_iter()
        .map(|(name, values)| TagFilter::new(name.trim(), values))
        .collect()
}
