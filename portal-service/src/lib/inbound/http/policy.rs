//! Declarative access rules evaluated once per request.
//!
//! Rules are checked in the order they were declared and the first rule whose
//! matcher accepts the request decides. `OPTIONS` requests are always allowed,
//! ahead of every rule.
//!
//! # Path patterns
//! A pattern is a `/`-separated list of segments:
//! - a literal segment matches the same text (case-sensitive)
//! - `*` or `{name}` matches exactly one non-empty segment
//! - a final `**` matches zero or more remaining segments
//!
//! Empty segments are ignored on both sides, so `/courses/` and `/courses`
//! are the same path.

use std::fmt;

use http::Method;
use thiserror::Error;

use crate::domain::user::models::Principal;
use crate::domain::user::models::Role;

/// What a request must carry to pass a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Always allowed, with or without a principal
    Public,
    /// Any principal, whatever its roles
    Authenticated,
    /// A principal holding the given role
    Role(Role),
}

impl Requirement {
    pub fn check(&self, principal: Option<&Principal>) -> Result<(), AccessDenied> {
        match (self, principal) {
            (Requirement::Public, _) => Ok(()),
            (_, None) => Err(AccessDenied::Unauthenticated),
            (Requirement::Authenticated, Some(_)) => Ok(()),
            (Requirement::Role(role), Some(principal)) => {
                if principal.has_role(*role) {
                    Ok(())
                } else {
                    Err(AccessDenied::Forbidden { required: *role })
                }
            }
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Role {required} required")]
    Forbidden { required: Role },
}

/// Error raised while building a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Invalid path pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Single,
    Rest,
}

/// Compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern.
    ///
    /// # Errors
    /// * `InvalidPattern` - Pattern does not start with `/`, uses `**`
    ///   anywhere but last, or has an unterminated `{name}` segment
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        let invalid = |reason: &str| PolicyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            let segment = match *part {
                "**" if index + 1 == parts.len() => Segment::Rest,
                "**" => return Err(invalid("'**' is only allowed as the last segment")),
                "*" => Segment::Single,
                p if p.starts_with('{') => {
                    if p.len() < 3 || !p.ends_with('}') {
                        return Err(invalid("unterminated or empty '{name}' segment"));
                    }
                    Segment::Single
                }
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut index = 0;
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Single => {
                    if index >= parts.len() {
                        return false;
                    }
                }
                Segment::Literal(literal) => {
                    if parts.get(index) != Some(&literal.as_str()) {
                        return false;
                    }
                }
            }
            index += 1;
        }

        index == parts.len()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Method (or any method) plus path pattern.
#[derive(Debug, Clone)]
pub struct RequestMatcher {
    method: Option<Method>,
    pattern: PathPattern,
}

impl RequestMatcher {
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().map_or(true, |m| m == method) && self.pattern.matches(path)
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{} {}", method, self.pattern),
            None => write!(f, "* {}", self.pattern),
        }
    }
}

/// One declared access rule.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    pub matcher: RequestMatcher,
    pub requirement: Requirement,
}

/// Ordered, immutable rule list.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<PolicyRule>,
}

impl AccessPolicy {
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder::default()
    }

    /// Rules for the course portal API.
    pub fn portal() -> Result<Self, PolicyError> {
        Self::builder()
            .permit_all(&[
                "/",
                "/api/auth/signup",
                "/api/auth/signin",
                "/api/auth/request-otp",
                "/api/auth/verify-otp",
                "/api/auth/forgot-password",
                "/api/auth/reset-password",
                "/users/all",
            ])
            .has_role(None, "/admin/**", Role::Admin)
            .has_role(Some(Method::POST), "/courses", Role::Admin)
            .has_role(Some(Method::PUT), "/courses/{id}", Role::Admin)
            .has_role(Some(Method::DELETE), "/courses/{id}", Role::Admin)
            .any_request(Requirement::Authenticated)
            .build()
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// The rule that decides a request, if any.
    pub fn rule_for(&self, method: &Method, path: &str) -> Option<&PolicyRule> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(method, path))
    }

    pub fn requirement_for(&self, method: &Method, path: &str) -> Requirement {
        if *method == Method::OPTIONS {
            return Requirement::Public;
        }

        self.rule_for(method, path)
            .map(|rule| rule.requirement)
            .unwrap_or(Requirement::Authenticated)
    }

    /// Decide whether `principal` may make this request.
    pub fn authorize(
        &self,
        method: &Method,
        path: &str,
        principal: Option<&Principal>,
    ) -> Result<(), AccessDenied> {
        self.requirement_for(method, path).check(principal)
    }
}

/// Collects rules in declaration order.
///
/// A catch-all rule is appended by [`build`](Self::build), so every request
/// path is covered; it defaults to [`Requirement::Authenticated`].
#[derive(Debug, Default)]
pub struct AccessPolicyBuilder {
    rules: Vec<PolicyRule>,
    fallback: Option<Requirement>,
    error: Option<PolicyError>,
}

impl AccessPolicyBuilder {
    pub fn rule(mut self, method: Option<Method>, pattern: &str, requirement: Requirement) -> Self {
        match PathPattern::parse(pattern) {
            Ok(pattern) => self.rules.push(PolicyRule {
                matcher: RequestMatcher { method, pattern },
                requirement,
            }),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Allow every method on each pattern without authentication.
    pub fn permit_all(self, patterns: &[&str]) -> Self {
        patterns.iter().fold(self, |builder, pattern| {
            builder.rule(None, pattern, Requirement::Public)
        })
    }

    pub fn permit(self, method: Method, pattern: &str) -> Self {
        self.rule(Some(method), pattern, Requirement::Public)
    }

    pub fn authenticated(self, method: Option<Method>, pattern: &str) -> Self {
        self.rule(method, pattern, Requirement::Authenticated)
    }

    pub fn has_role(self, method: Option<Method>, pattern: &str, role: Role) -> Self {
        self.rule(method, pattern, Requirement::Role(role))
    }

    /// Requirement for requests no declared rule matches.
    pub fn any_request(mut self, requirement: Requirement) -> Self {
        self.fallback = Some(requirement);
        self
    }

    /// # Errors
    /// * `InvalidPattern` - The first pattern that failed to compile
    pub fn build(self) -> Result<AccessPolicy, PolicyError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut rules = self.rules;
        rules.push(PolicyRule {
            matcher: RequestMatcher {
                method: None,
                pattern: PathPattern::parse("/**")?,
            },
            requirement: self.fallback.unwrap_or(Requirement::Authenticated),
        });

        Ok(AccessPolicy { rules })
    }
}
