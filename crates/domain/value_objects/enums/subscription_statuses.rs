use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a store subscription. The stored text values are the
/// ones the admin pages filter on (`?status=ativa`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionStatus {
    #[serde(rename = "trial")]
    Trial,
    #[serde(rename = "ativa")]
    Active,
    #[serde(rename = "inadimplente")]
    PastDue,
    #[serde(rename = "cancelada")]
    Canceled,
    #[serde(rename = "suspensa")]
    Suspended,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 5] = [
        SubscriptionStatus::Trial,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Canceled,
        SubscriptionStatus::Suspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "ativa",
            SubscriptionStatus::PastDue => "inadimplente",
            SubscriptionStatus::Canceled => "cancelada",
            SubscriptionStatus::Suspended => "suspensa",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "trial" => Some(SubscriptionStatus::Trial),
            "ativa" => Some(SubscriptionStatus::Active),
            "inadimplente" => Some(SubscriptionStatus::PastDue),
            "cancelada" => Some(SubscriptionStatus::Canceled),
            "suspensa" => Some(SubscriptionStatus::Suspended),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled)
    }

    /// Transition table for the subscription lifecycle.
    ///
    /// | From         | To                                    |
    /// |--------------|---------------------------------------|
    /// | trial        | ativa, inadimplente, suspensa, cancelada |
    /// | ativa        | trial, inadimplente, suspensa, cancelada |
    /// | inadimplente | trial, ativa, suspensa, cancelada     |
    /// | suspensa     | trial, ativa, cancelada               |
    /// | cancelada    | nothing                               |
    ///
    /// Staying in the same non-terminal status is always allowed.
    pub fn can_transition_to(&self, to: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;

        if self.is_terminal() {
            return false;
        }
        if *self == to {
            return true;
        }

        match self {
            Trial => matches!(to, Active | PastDue | Suspended | Canceled),
            Active => matches!(to, Trial | PastDue | Suspended | Canceled),
            PastDue => matches!(to, Trial | Active | Suspended | Canceled),
            Suspended => matches!(to, Trial | Active | Canceled),
            Canceled => false,
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_known_values() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SubscriptionStatus::from_str("Ativa"), None);
        assert_eq!(SubscriptionStatus::from_str("active"), None);
        assert_eq!(SubscriptionStatus::from_str(""), None);
    }

    #[test]
    fn canceled_never_transitions() {
        for to in SubscriptionStatus::ALL {
            assert!(!SubscriptionStatus::Canceled.can_transition_to(to));
        }
    }

    #[test]
    fn suspended_can_be_reactivated() {
        assert!(SubscriptionStatus::Suspended.can_transition_to(SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Suspended.can_transition_to(SubscriptionStatus::Trial));
        assert!(!SubscriptionStatus::Suspended.can_transition_to(SubscriptionStatus::PastDue));
    }

    #[test]
    fn past_due_is_only_reachable_from_billing_statuses() {
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::PastDue));
        assert!(SubscriptionStatus::Trial.can_transition_to(SubscriptionStatus::PastDue));
        assert!(!SubscriptionStatus::Suspended.can_transition_to(SubscriptionStatus::PastDue));
    }
}
