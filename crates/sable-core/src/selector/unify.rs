//! Selector unification.
//!
//! Unifying two compounds produces a compound matching only elements matched
//! by both, or nothing when no element can match both (two different ids,
//! two different element names, incompatible namespaces).

use super::{Simple, SimpleSequence};

impl SimpleSequence {
    /// Unify this compound with a list of simples.
    ///
    /// Returns `None` when the result could never match anything.
    pub fn unify(&self, others: &[Simple]) -> Option<SimpleSequence> {
        let unified = self
            .members()
            .iter()
            .try_fold(others.to_vec(), |acc, simple| simple.unify(&acc))?;
        Some(SimpleSequence::new(unified))
    }
}

impl Simple {
    /// Add this simple to `others`, keeping base selectors first and pseudo
    /// selectors last.
    pub fn unify(&self, others: &[Simple]) -> Option<Vec<Simple>> {
        match self {
            Self::Universal { namespace } => unify_universal(namespace.as_ref(), others),
            Self::Element { name, namespace } => unify_element(name, namespace.as_ref(), others),
            Self::Id(name) => {
                let conflicting = others
                    .iter()
                    .any(|other| matches!(other, Self::Id(other_name) if other_name != name));
                if conflicting {
                    return None;
                }
                Some(self.insert_into(others))
            }
            _ => Some(self.insert_into(others)),
        }
    }

    fn insert_into(&self, others: &[Simple]) -> Vec<Simple> {
        if others.contains(self) {
            return others.to_vec();
        }
        let position = if self.is_pseudo() {
            others.iter().position(Simple::is_pseudo_element)
        } else {
            others.iter().position(Simple::is_pseudo)
        };
        let mut result = others.to_vec();
        match position {
            Some(index) => result.insert(index, self.clone()),
            None => result.push(self.clone()),
        }
        result
    }
}

fn unify_universal(namespace: Option<&String>, others: &[Simple]) -> Option<Vec<Simple>> {
    let (element_name, other_namespace) = match others.first() {
        Some(Simple::Universal { namespace }) => (None, namespace.as_ref()),
        Some(Simple::Element { name, namespace }) => (Some(name), namespace.as_ref()),
        _ => {
            if namespace.is_some_and(|ns| ns != "*") {
                let mut result = vec![Simple::Universal {
                    namespace: namespace.cloned(),
                }];
                result.extend_from_slice(others);
                return Some(result);
            }
            if !others.is_empty() {
                return Some(others.to_vec());
            }
            return Some(vec![Simple::Universal {
                namespace: namespace.cloned(),
            }]);
        }
    };
    let namespace = unify_namespaces(namespace, other_namespace)?;
    let head = match element_name {
        Some(name) => Simple::Element {
            name: name.clone(),
            namespace,
        },
        None => Simple::Universal { namespace },
    };
    let mut result = vec![head];
    result.extend_from_slice(&others[1..]);
    Some(result)
}

fn unify_element(
    name: &str,
    namespace: Option<&String>,
    others: &[Simple],
) -> Option<Vec<Simple>> {
    let other_namespace = match others.first() {
        Some(Simple::Universal { namespace }) => namespace.as_ref(),
        Some(Simple::Element {
            name: other_name,
            namespace,
        }) => {
            if other_name != name {
                return None;
            }
            namespace.as_ref()
        }
        _ => {
            let mut result = vec![Simple::Element {
                name: name.to_string(),
                namespace: namespace.cloned(),
            }];
            result.extend_from_slice(others);
            return Some(result);
        }
    };
    let namespace = unify_namespaces(namespace, other_namespace)?;
    let mut result = vec![Simple::Element {
        name: name.to_string(),
        namespace,
    }];
    result.extend_from_slice(&others[1..]);
    Some(result)
}

/// The namespace matching both, or `None` (outer) when they conflict.
fn unify_namespaces(ns1: Option<&String>, ns2: Option<&String>) -> Option<Option<String>> {
    let is_any = |ns: Option<&String>| ns.is_some_and(|ns| ns == "*");
    if !(ns1 == ns2 || ns1.is_none() || ns2.is_none() || is_any(ns1) || is_any(ns2)) {
        return None;
    }
    if is_any(ns1) {
        return Some(ns2.cloned());
    }
    if is_any(ns2) {
        return Some(ns1.cloned());
    }
    Some(ns1.or(ns2).cloned())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_unify_appends_class() {
        let compound = SimpleSequence::new(vec![class("b")]);
        let unified = compound.unify(&[class("a")]).unwrap();
        assert_eq!(unified.to_string(), ".a.b");
    }

    #[test]
    fn test_unify_conflicting_ids() {
        let compound = SimpleSequence::new(vec![Simple::Id("a".to_string())]);
        assert!(compound.unify(&[Simple::Id("b".to_string())]).is_none());
        assert!(compound.unify(&[Simple::Id("a".to_string())]).is_some());
    }

    #[test]
    fn test_unify_elements() {
        let compound = SimpleSequence::new(vec![element("a")]);
        assert!(compound.unify(&[element("p")]).is_none());
        let unified = compound.unify(&[class("x")]).unwrap();
        assert_eq!(unified.to_string(), "a.x");
    }

    #[test]
    fn test_unify_universal_with_element() {
        let compound = SimpleSequence::new(vec![Simple::Universal { namespace: None }]);
        let unified = compound.unify(&[element("p"), class("x")]).unwrap();
        assert_eq!(unified.to_string(), "p.x");
    }

    #[test]
    fn test_pseudo_stays_last() {
        let hover = Simple::Pseudo {
            kind: super::super::PseudoKind::Class,
            name: "hover".to_string(),
            arg: None,
        };
        let compound = SimpleSequence::new(vec![class("b")]);
        let unified = compound.unify(&[class("a"), hover]).unwrap();
        assert_eq!(unified.to_string(), ".a.b:hover");
    }
}
