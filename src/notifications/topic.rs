use std::fmt;

use crate::auth::{Principal, PrincipalType};

/// A named channel sessions subscribe to. Rendered as `buyer:<id>` or
/// `seller:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Buyer(String),
    Seller(String),
}

impl Topic {
    /// The topic a principal listens on for its own notifications.
    pub fn for_principal(principal: &Principal) -> Self {
        match principal.principal_type {
            PrincipalType::Buyer => Topic::Buyer(principal.principal_id.clone()),
            PrincipalType::Seller => Topic::Seller(principal.principal_id.clone()),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Buyer(id) => write!(f, "buyer:{id}"),
            Topic::Seller(id) => write!(f, "seller:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(Topic::Buyer("b1".into()).to_string(), "buyer:b1");
        assert_eq!(Topic::Seller("s1".into()).to_string(), "seller:s1");
        assert_ne!(Topic::Buyer("x".into()), Topic::Seller("x".into()));
    }

    #[test]
    fn test_topic_for_principal() {
        let seller = Principal::new("s9", PrincipalType::Seller);
        assert_eq!(Topic::for_principal(&seller), Topic::Seller("s9".into()));
    }
}
