//! Exception rule matching.
//!
//! Pure predicate engine over the admin-configured rule set: a rule matches
//! when its `status_match` pattern appears as a substring of the raw carrier
//! status. The first match in the supplied order wins, so callers must fetch
//! rules in a fixed order for reproducible results.

use crate::entity::exception_rule;

/// Case handling for substring matching. The carrier feed upper-cases its
/// statuses, so the reference behaviour is case-sensitive; insensitive mode
/// exists for carriers with less disciplined feeds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl MatchMode {
    pub fn from_config(case_insensitive: bool) -> Self {
        if case_insensitive {
            MatchMode::CaseInsensitive
        } else {
            MatchMode::CaseSensitive
        }
    }
}

/// Find the first rule matching `raw_status`.
///
/// Rules with `notify = false` never participate. An empty status matches
/// nothing. No side effects.
pub fn match_rule<'a>(
    raw_status: &str,
    rules: &'a [exception_rule::Model],
    mode: MatchMode,
) -> Option<&'a exception_rule::Model> {
    if raw_status.is_empty() {
        return None;
    }
    let folded_status = match mode {
        MatchMode::CaseSensitive => None,
        MatchMode::CaseInsensitive => Some(raw_status.to_lowercase()),
    };
    rules.iter().filter(|rule| rule.notify).find(|rule| {
        match (&folded_status, mode) {
            (Some(status), MatchMode::CaseInsensitive) => {
                status.contains(&rule.status_match.to_lowercase())
            }
            _ => raw_status.contains(&rule.status_match),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn rule(status_match: &str, notify: bool) -> exception_rule::Model {
        exception_rule::Model {
            id: Uuid::new_v4(),
            name: status_match.to_lowercase(),
            status_match: status_match.into(),
            severity: "medium".into(),
            notify,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![rule("ATRASO", true), rule("RETIRADA", true)];
        let matched = match_rule("AGUARDANDO RETIRADA", &rules, MatchMode::CaseSensitive);
        assert_eq!(matched.unwrap().status_match, "RETIRADA");
    }

    #[test]
    fn order_decides_ties() {
        let rules = vec![rule("AGUARDANDO", true), rule("RETIRADA", true)];
        let matched = match_rule("AGUARDANDO RETIRADA", &rules, MatchMode::CaseSensitive);
        assert_eq!(matched.unwrap().status_match, "AGUARDANDO");
    }

    #[test]
    fn muted_rules_never_match() {
        let rules = vec![rule("RETIRADA", false)];
        assert!(match_rule("AGUARDANDO RETIRADA", &rules, MatchMode::CaseSensitive).is_none());
    }

    #[test]
    fn empty_status_matches_nothing() {
        let rules = vec![rule("", true)];
        assert!(match_rule("", &rules, MatchMode::CaseSensitive).is_none());
    }

    #[test]
    fn case_sensitive_by_default() {
        let rules = vec![rule("RETIRADA", true)];
        assert!(match_rule("aguardando retirada", &rules, MatchMode::CaseSensitive).is_none());
    }

    #[test]
    fn case_insensitive_mode_folds_both_sides() {
        let rules = vec![rule("Retirada", true)];
        let matched = match_rule("AGUARDANDO RETIRADA", &rules, MatchMode::CaseInsensitive);
        assert!(matched.is_some());
    }

    #[test]
    fn no_match_returns_none() {
        let rules = vec![rule("ATRASO", true), rule("EXTRAVIO", true)];
        assert!(match_rule("OBJETO EM TRANSITO", &rules, MatchMode::CaseSensitive).is_none());
    }
}
