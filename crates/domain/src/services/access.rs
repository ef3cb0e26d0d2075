//! Ticket-gated access policy for premium prompts.

use chrono::{DateTime, Utc};

use crate::models::commerce::{AccessDecision, AccessReason, UserSubscription};

/// Everything the policy needs to decide, gathered by the caller.
#[derive(Debug, Clone, Copy)]
pub struct AccessInput<'a> {
    pub is_premium: bool,
    pub ticket_cost: i32,
    pub is_owner: bool,
    pub already_purchased: bool,
    pub subscription: Option<&'a UserSubscription>,
    pub now: DateTime<Utc>,
}

/// Decides whether a reader may see a prompt's content.
///
/// Non-premium prompts are open. Premium prompts need ownership, a prior
/// purchase, or a current subscription that covers premium content with a
/// ticket balance of at least the prompt's cost.
pub fn evaluate_access(input: AccessInput<'_>) -> AccessDecision {
    let decision = |granted, reason, tickets_available| AccessDecision {
        granted,
        reason,
        ticket_cost: input.ticket_cost,
        tickets_available,
    };

    if !input.is_premium {
        return decision(true, AccessReason::Free, None);
    }
    if input.is_owner {
        return decision(true, AccessReason::Owner, None);
    }
    if input.already_purchased {
        return decision(true, AccessReason::AlreadyPurchased, None);
    }

    let Some(sub) = input.subscription.filter(|s| s.is_current(input.now)) else {
        return decision(false, AccessReason::NoSubscription, None);
    };
    let balance = Some(sub.ticket_balance);

    if !sub.can_access_premium {
        return decision(false, AccessReason::PlanExcludesPremium, balance);
    }
    if sub.ticket_balance < input.ticket_cost {
        return decision(false, AccessReason::InsufficientTickets, balance);
    }

    decision(true, AccessReason::Subscription, balance)
}
