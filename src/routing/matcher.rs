//! Path matching.
//!
//! # Responsibilities
//! - Store route patterns in a segment trie keyed by method at the leaves
//! - Resolve (method, path) to a route id plus extracted parameters
//! - Report which methods a path would accept
//!
//! # Pattern Syntax
//! - `/users` static segment, matched exactly (case-sensitive) against
//!   the percent-decoded request segment, so `/my files` matches
//!   `/my%20files`
//! - `/users/:id` named parameter, matches one non-empty segment
//! - `/assets/*filepath` catch-all, final segment only, captures the rest
//!   of the path including its leading `/`
//!
//! # Design Decisions
//! - Lookup cost is proportional to the number of path segments
//! - Priority at each level: static, then parameter, then catch-all
//! - Two parameters at the same position must share a name
//! - Parameter values are percent-decoded

use std::collections::HashMap;

use axum::http::Method;
use percent_encoding::percent_decode_str;

use crate::context::Params;
use crate::routing::RouteError;

/// Index of a route inside the router's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(pub usize);

/// Method + path → route resolution used by the router.
pub trait PathMatcher: Send + Sync {
    fn insert(&mut self, method: &Method, pattern: &str, route: RouteId) -> Result<(), RouteError>;

    fn lookup(&self, method: &Method, path: &str) -> Option<(RouteId, Params)>;

    /// Methods registered for patterns matching `path`, sorted.
    fn allowed_methods(&self, path: &str) -> Vec<Method>;
}

enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    CatchAll(&'a str),
}

fn invalid(pattern: &str, reason: &'static str) -> RouteError {
    RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    }
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    let rest = pattern
        .strip_prefix('/')
        .ok_or_else(|| invalid(pattern, "must begin with '/'"))?;
    let raw: Vec<&str> = rest.split('/').collect();
    let last = raw.len() - 1;

    let mut names: Vec<&str> = Vec::new();
    let mut segments = Vec::with_capacity(raw.len());
    for (i, seg) in raw.into_iter().enumerate() {
        let segment = if let Some(name) = seg.strip_prefix(':') {
            Segment::Param(name)
        } else if let Some(name) = seg.strip_prefix('*') {
            if i != last {
                return Err(invalid(pattern, "catch-all must be the final segment"));
            }
            Segment::CatchAll(name)
        } else if seg.contains([':', '*']) {
            return Err(invalid(pattern, "wildcards must span a whole segment"));
        } else {
            Segment::Static(seg)
        };

        if let Segment::Param(name) | Segment::CatchAll(name) = segment {
            if name.is_empty() || name.contains([':', '*']) {
                return Err(invalid(pattern, "wildcard needs a plain name"));
            }
            if names.contains(&name) {
                return Err(invalid(pattern, "duplicate wildcard name"));
            }
            names.push(name);
        }
        segments.push(segment);
    }
    Ok(segments)
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

#[derive(Debug, Default)]
struct Node {
    routes: HashMap<Method, RouteId>,
    statics: HashMap<String, Node>,
    param: Option<(String, Box<Node>)>,
    catch_all: Option<(String, HashMap<Method, RouteId>)>,
}

impl Node {
    fn search(&self, segments: &[&str], method: &Method, params: &mut Vec<(String, String)>) -> Option<RouteId> {
        let Some((first, rest)) = segments.split_first() else {
            return self.routes.get(method).copied();
        };

        if let Some(child) = self.statics.get(decode(first).as_str()) {
            if let Some(id) = child.search(rest, method, params) {
                return Some(id);
            }
        }

        if let Some((name, child)) = &self.param {
            if !first.is_empty() {
                params.push((name.clone(), decode(first)));
                if let Some(id) = child.search(rest, method, params) {
                    return Some(id);
                }
                // Backtrack
                params.pop();
            }
        }

        if let Some((name, routes)) = &self.catch_all {
            if let Some(id) = routes.get(method) {
                params.push((name.clone(), decode(&format!("/{}", segments.join("/")))));
                return Some(*id);
            }
        }

        None
    }

    fn collect_methods(&self, segments: &[&str], out: &mut Vec<Method>) {
        let Some((first, rest)) = segments.split_first() else {
            out.extend(self.routes.keys().cloned());
            return;
        };

        if let Some(child) = self.statics.get(decode(first).as_str()) {
            child.collect_methods(rest, out);
        }
        if let Some((_, child)) = &self.param {
            if !first.is_empty() {
                child.collect_methods(rest, out);
            }
        }
        if let Some((_, routes)) = &self.catch_all {
            out.extend(routes.keys().cloned());
        }
    }
}

/// Segment trie implementation of [`PathMatcher`].
#[derive(Debug, Default)]
pub struct SegmentTrie {
    root: Node,
}

impl SegmentTrie {
    pub fn new() -> Self {
        Self::default()
    }
}

fn split_path(path: &str) -> Option<Vec<&str>> {
    path.strip_prefix('/').map(|rest| rest.split('/').collect())
}

impl PathMatcher for SegmentTrie {
    fn insert(&mut self, method: &Method, pattern: &str, route: RouteId) -> Result<(), RouteError> {
        let segments = parse_pattern(pattern)?;
        let duplicate = || RouteError::Duplicate {
            method: method.clone(),
            path: pattern.to_string(),
        };

        let mut node = &mut self.root;
        for segment in segments {
            match segment {
                Segment::Static(s) => {
                    node = node.statics.entry(s.to_string()).or_default();
                }
                Segment::Param(name) => {
                    if let Some((existing, _)) = &node.param {
                        if existing != name {
                            return Err(invalid(pattern, "conflicts with a parameter of another name"));
                        }
                    }
                    node = node
                        .param
                        .get_or_insert_with(|| (name.to_string(), Box::default()))
                        .1
                        .as_mut();
                }
                Segment::CatchAll(name) => {
                    let (existing, routes) = node
                        .catch_all
                        .get_or_insert_with(|| (name.to_string(), HashMap::new()));
                    if existing != name {
                        return Err(invalid(pattern, "conflicts with a catch-all of another name"));
                    }
                    if routes.contains_key(method) {
                        return Err(duplicate());
                    }
                    routes.insert(method.clone(), route);
                    return Ok(());
                }
            }
        }

        if node.routes.contains_key(method) {
            return Err(duplicate());
        }
        node.routes.insert(method.clone(), route);
        Ok(())
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(RouteId, Params)> {
        let segments = split_path(path)?;
        let mut params = Vec::new();
        let id = self.root.search(&segments, method, &mut params)?;
        Some((id, params.into_iter().collect()))
    }

    fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let Some(segments) = split_path(path) else {
            return Vec::new();
        };
        let mut methods = Vec::new();
        self.root.collect_methods(&segments, &mut methods);
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods.dedup();
        methods
    }
}
