//! Predicate algebra.
//!
//! A [`Predicate`] is a tree of combinators over opaque leaf expressions. The
//! only operation on it is [`Predicate::expand`], which yields one boolean
//! expression with every placeholder resolved. Leaf text is never parsed or
//! evaluated.

use crate::error::{OdsError, OdsResult};
use crate::template::{Ambient, CodeTemplate, TemplateArgs};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Atomic check written against the `$_self` subject.
    Leaf(CodeTemplate),
    /// Conjunction; vacuously true when empty.
    And(Vec<Predicate>),
    /// Disjunction; vacuously false when empty.
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Rewrites the text of every leaf below `child` before substitution.
    SubstLeaves {
        pattern: String,
        replacement: String,
        child: Box<Predicate>,
    },
}

/// Combinator kind for [`Predicate::combine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CombinerKind {
    And,
    Or,
    Not,
    SubstLeaves {
        pattern: String,
        replacement: String,
    },
}

impl Predicate {
    pub fn leaf(expr: impl Into<String>) -> Self {
        Predicate::Leaf(CodeTemplate::parse(expr))
    }

    pub fn all_of(children: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(children.into_iter().collect())
    }

    pub fn any_of(children: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(children.into_iter().collect())
    }

    pub fn neg(child: Predicate) -> Self {
        Predicate::Not(Box::new(child))
    }

    pub fn subst_leaves(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        child: Predicate,
    ) -> Self {
        Predicate::SubstLeaves {
            pattern: pattern.into(),
            replacement: replacement.into(),
            child: Box::new(child),
        }
    }

    /// The always-true predicate.
    pub fn truth() -> Self {
        Predicate::And(Vec::new())
    }

    /// Build a combinator from a child list, checking its arity.
    ///
    /// `Not` and `SubstLeaves` take exactly one child.
    pub fn combine(kind: CombinerKind, mut children: Vec<Predicate>) -> OdsResult<Self> {
        match kind {
            CombinerKind::And => Ok(Predicate::And(children)),
            CombinerKind::Or => Ok(Predicate::Or(children)),
            CombinerKind::Not => {
                let child = single_child("negation", &mut children)?;
                Ok(Predicate::neg(child))
            }
            CombinerKind::SubstLeaves {
                pattern,
                replacement,
            } => {
                let child = single_child("leaf substitution", &mut children)?;
                Ok(Predicate::subst_leaves(pattern, replacement, child))
            }
        }
    }

    /// Whether this predicate is vacuously true.
    pub fn is_trivially_true(&self) -> bool {
        matches!(self, Predicate::And(children) if children.is_empty())
    }

    /// Expand into a boolean expression with `subject` bound to `$_self`.
    pub fn expand(&self, subject: &str, ambient: &Ambient) -> String {
        let mut substitutions = Vec::new();
        self.expand_in(subject, ambient, &mut substitutions)
    }

    fn expand_in<'p>(
        &'p self,
        subject: &str,
        ambient: &Ambient,
        substitutions: &mut Vec<(&'p str, &'p str)>,
    ) -> String {
        match self {
            Predicate::Leaf(template) => {
                // Innermost scope first.
                let mut template = template.clone();
                for (pattern, replacement) in substitutions.iter().rev() {
                    template = template.replace_text(pattern, replacement);
                }
                template.instantiate(&TemplateArgs::new(ambient).with_subject(subject))
            }
            Predicate::And(children) if children.is_empty() => "true".to_owned(),
            Predicate::Or(children) if children.is_empty() => "false".to_owned(),
            Predicate::And(children) => join(children, " && ", subject, ambient, substitutions),
            Predicate::Or(children) => join(children, " || ", subject, ambient, substitutions),
            Predicate::Not(child) => {
                format!("!({})", child.expand_in(subject, ambient, substitutions))
            }
            Predicate::SubstLeaves {
                pattern,
                replacement,
                child,
            } => {
                substitutions.push((pattern, replacement));
                let expanded = child.expand_in(subject, ambient, substitutions);
                substitutions.pop();
                expanded
            }
        }
    }
}

fn single_child(what: &str, children: &mut Vec<Predicate>) -> OdsResult<Predicate> {
    if children.len() != 1 {
        return Err(OdsError::invalid_predicate_shape(format!(
            "{what} takes exactly one child, got {}",
            children.len()
        )));
    }
    Ok(children.remove(0))
}

fn join<'p>(
    children: &'p [Predicate],
    op: &str,
    subject: &str,
    ambient: &Ambient,
    substitutions: &mut Vec<(&'p str, &'p str)>,
) -> String {
    let parts: Vec<String> = children
        .iter()
        .map(|child| child.expand_in(subject, ambient, substitutions))
        .collect();
    format!("({})", parts.join(op))
}
