use crate::models::{Entitlements, SubscriptionPlan, SubscriptionTier};

/// Resolves the effective feature limits for a subscription tier.
///
/// Pure function of the tier and (for pro) the active plan row; no clock or
/// database dependence. A missing or unrecognized tier gets the free policy.
pub fn resolve(tier: Option<SubscriptionTier>, plan: Option<&SubscriptionPlan>) -> Entitlements {
    match tier {
        Some(SubscriptionTier::Pro) => Entitlements {
            max_sessions: plan.map(|p| p.max_sessions).unwrap_or(50),
            max_resources: plan.map(|p| p.max_resources).unwrap_or(100),
            can_access_cohorts: true,
            can_access_premium_content: false,
            has_ai_tutor: true,
            support_level: "email".to_string(),
        },
        Some(SubscriptionTier::Premium) => Entitlements {
            max_sessions: -1,
            max_resources: -1,
            can_access_cohorts: true,
            can_access_premium_content: true,
            has_ai_tutor: true,
            support_level: "priority".to_string(),
        },
        Some(SubscriptionTier::Free) | None => Entitlements {
            max_sessions: 3,
            max_resources: 10,
            can_access_cohorts: false,
            can_access_premium_content: false,
            has_ai_tutor: false,
            support_level: "community".to_string(),
        },
    }
}

/// Content gating: whether `user_tier` satisfies a `required` minimum tier.
pub fn meets_tier_requirement(user_tier: SubscriptionTier, required: SubscriptionTier) -> bool {
    user_tier.rank() >= required.rank()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn plan(max_sessions: i64, max_resources: i64) -> SubscriptionPlan {
        SubscriptionPlan {
            id: 2,
            name: "Pro".to_string(),
            description: None,
            price: 1900,
            currency: "USD".to_string(),
            interval_type: crate::models::IntervalType::Month,
            interval_count: 1,
            features: Some(Json(vec![])),
            max_sessions,
            max_resources,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn free_policy() {
        let limits = resolve(Some(SubscriptionTier::Free), None);
        assert_eq!(limits.max_sessions, 3);
        assert_eq!(limits.max_resources, 10);
        assert!(!limits.can_access_cohorts);
        assert!(!limits.can_access_premium_content);
        assert!(!limits.has_ai_tutor);
        assert_eq!(limits.support_level, "community");
    }

    #[test]
    fn missing_tier_defaults_to_free() {
        assert_eq!(resolve(None, None), resolve(Some(SubscriptionTier::Free), None));
    }

    #[test]
    fn pro_policy_uses_plan_caps() {
        let p = plan(75, 200);
        let limits = resolve(Some(SubscriptionTier::Pro), Some(&p));
        assert_eq!(limits.max_sessions, 75);
        assert_eq!(limits.max_resources, 200);
        assert!(limits.can_access_cohorts);
        assert!(!limits.can_access_premium_content);
        assert!(limits.has_ai_tutor);
        assert_eq!(limits.support_level, "email");
    }

    #[test]
    fn pro_policy_without_plan_row_falls_back() {
        let limits = resolve(Some(SubscriptionTier::Pro), None);
        assert_eq!(limits.max_sessions, 50);
        assert_eq!(limits.max_resources, 100);
    }

    #[test]
    fn premium_policy_is_unlimited() {
        let limits = resolve(Some(SubscriptionTier::Premium), None);
        assert_eq!(limits.max_sessions, -1);
        assert_eq!(limits.max_resources, -1);
        assert!(limits.can_access_premium_content);
        assert_eq!(limits.support_level, "priority");
    }

    #[test]
    fn resolution_is_deterministic() {
        assert_eq!(
            resolve(Some(SubscriptionTier::Premium), None),
            resolve(Some(SubscriptionTier::Premium), None)
        );
    }

    #[test]
    fn tier_requirement_ordering() {
        use SubscriptionTier::*;
        assert!(meets_tier_requirement(Premium, Free));
        assert!(meets_tier_requirement(Premium, Pro));
        assert!(meets_tier_requirement(Pro, Pro));
        assert!(!meets_tier_requirement(Free, Pro));
        assert!(!meets_tier_requirement(Pro, Premium));
    }
}
