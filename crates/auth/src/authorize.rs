//! Route/method → role permission matrix.
//!
//! Rules are evaluated in declaration order and the first match wins; the
//! matrix does not infer specificity, so narrower rules must be declared
//! before broader ones. Requests that match no rule fall back to
//! "authenticated, any role".

use std::collections::BTreeSet;

use http::Method;
use serde::Serialize;

use crate::{Principal, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    /// At least one of the listed roles.
    AnyRole(BTreeSet<Role>),
}

/// Externally observable result of authentication + authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthDecision {
    Allow,
    /// No valid principal where one was required.
    Unauthenticated,
    /// Valid principal without any of the required roles.
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*` or `{name}`: exactly one segment.
    Single,
    /// `**`: zero or more segments.
    Rest,
}

/// Ant-style path pattern (`/api/students/{id}`, `/api/auth/**`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|s| match s {
                "**" => Segment::Rest,
                "*" => Segment::Single,
                s if s.starts_with('{') && s.ends_with('}') => Segment::Single,
                s => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split(path).collect();
        match_segments(&self.segments, &path)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Rest, rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((segment, rest)) => match path.split_first() {
            None => false,
            Some((head, tail)) => {
                let hit = match segment {
                    Segment::Literal(lit) => lit == head,
                    _ => true,
                };
                hit && match_segments(rest, tail)
            }
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRule {
    /// Empty means any method.
    methods: Vec<Method>,
    patterns: Vec<PathPattern>,
    requirement: Requirement,
}

impl PermissionRule {
    pub fn new(requirement: Requirement) -> Self {
        Self {
            methods: Vec::new(),
            patterns: Vec::new(),
            requirement,
        }
    }

    pub fn public() -> Self {
        Self::new(Requirement::Public)
    }

    pub fn authenticated() -> Self {
        Self::new(Requirement::Authenticated)
    }

    pub fn any_role(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::new(Requirement::AnyRole(roles.into_iter().collect()))
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods.extend(methods);
        self
    }

    pub fn paths<'a>(mut self, patterns: impl IntoIterator<Item = &'a str>) -> Self {
        self.patterns.extend(patterns.into_iter().map(PathPattern::parse));
        self
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        let method_ok = self.methods.is_empty() || self.methods.contains(method);
        method_ok && self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Result of evaluating one request, with the matched rule for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: AuthDecision,
    /// Index of the matching rule; `None` when the fallback applied.
    pub rule: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    rules: Vec<PermissionRule>,
    fallback: Requirement,
}

impl PermissionMatrix {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self {
            rules,
            fallback: Requirement::Authenticated,
        }
    }

    /// The service's policy: auth endpoints and read-only student listing are
    /// public, student mutations need ADMIN or MODERATOR, the rest needs a
    /// principal.
    pub fn standard() -> Self {
        Self::new(vec![
            PermissionRule::public().paths(["/health"]),
            PermissionRule::public()
                .methods([Method::POST])
                .paths(["/api/auth/signin", "/api/auth/signup"]),
            PermissionRule::public()
                .methods([Method::GET])
                .paths(["/api/students", "/api/students/{id}"]),
            PermissionRule::any_role([Role::Admin, Role::Moderator])
                .methods([Method::POST, Method::PUT, Method::DELETE])
                .paths(["/api/students/**"]),
        ])
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }

    pub fn evaluate(&self, method: &Method, path: &str, principal: Option<&Principal>) -> Evaluation {
        let (rule, requirement) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, r)| r.matches(method, path))
            .map(|(i, r)| (Some(i), &r.requirement))
            .unwrap_or((None, &self.fallback));

        Evaluation {
            decision: decide(requirement, principal),
            rule,
        }
    }

    pub fn authorize(&self, method: &Method, path: &str, principal: Option<&Principal>) -> AuthDecision {
        self.evaluate(method, path, principal).decision
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::standard()
    }
}

fn decide(requirement: &Requirement, principal: Option<&Principal>) -> AuthDecision {
    match (requirement, principal) {
        (Requirement::Public, _) => AuthDecision::Allow,
        (_, None) => AuthDecision::Unauthenticated,
        (Requirement::Authenticated, Some(_)) => AuthDecision::Allow,
        (Requirement::AnyRole(required), Some(p)) if p.has_any_role(required) => AuthDecision::Allow,
        (Requirement::AnyRole(_), Some(_)) => AuthDecision::Forbidden,
    }
}
