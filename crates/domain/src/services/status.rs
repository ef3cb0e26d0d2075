//! Prompt publication state machine.
//!
//! Forward path: draft -> pending -> published -> archived. Any other move
//! between draft, published and archived is an override. Moves into or out of
//! pending other than the forward step are never allowed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::prompt::PromptStatus;
use crate::models::rbac::{codes, Actor, CrudAction};
use crate::services::authorization;

/// How a transition is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Forward,
    Override,
}

impl PromptStatus {
    /// Classifies `self -> to`, rejecting moves the state machine does not allow.
    pub fn transition_check(self, to: PromptStatus) -> DomainResult<TransitionKind> {
        use PromptStatus::*;

        match (self, to) {
            (from, to) if from == to => Err(DomainError::InvalidTransition(format!(
                "Prompt is already {}",
                to
            ))),
            (Draft, Pending) | (Pending, Published) | (Published, Archived) => {
                Ok(TransitionKind::Forward)
            }
            (Draft | Published | Archived, Draft | Published | Archived) => {
                Ok(TransitionKind::Override)
            }
            (from, to) => Err(DomainError::InvalidTransition(format!(
                "Cannot move a prompt from {} to {}",
                from, to
            ))),
        }
    }

    /// Permission code gating `self -> to`.
    pub fn required_permission(self, to: PromptStatus) -> DomainResult<&'static str> {
        let kind = self.transition_check(to)?;
        Ok(match (kind, to) {
            (TransitionKind::Override, _) => codes::PROMPT_STATUS_OVERRIDE,
            (TransitionKind::Forward, PromptStatus::Pending) => codes::PROMPT_EDIT,
            (TransitionKind::Forward, PromptStatus::Published) => codes::PROMPT_PUBLISH,
            (TransitionKind::Forward, _) => codes::PROMPT_ARCHIVE,
        })
    }
}

/// Checks that `actor` may move a prompt owned by `owner` from `from` to `to`.
///
/// Submitting for review is open to the owner. Publishing, archiving and
/// overrides need their own grants.
pub fn authorize_transition(
    actor: &Actor,
    owner: Uuid,
    from: PromptStatus,
    to: PromptStatus,
) -> DomainResult<TransitionKind> {
    let kind = from.transition_check(to);
    let code = match kind {
        Ok(_) => from.required_permission(to)?,
        // Unknown moves still require the override grant before the state error surfaces.
        Err(_) => codes::PROMPT_STATUS_OVERRIDE,
    };

    let owner = (code == codes::PROMPT_EDIT).then_some(owner);
    authorization::ensure(actor, code, CrudAction::Update, owner)?;
    kind
}

/// Value of `published_at` after entering `to`.
pub fn published_at_after(
    to: PromptStatus,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (to, current) {
        (PromptStatus::Published, None) => Some(now),
        (_, current) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rbac::{CrudFlags, GrantSet, RoleRef};
    use PromptStatus::*;

    fn actor(codes: &[&str]) -> Actor {
        let grants = codes
            .iter()
            .map(|c| (c.to_string(), CrudFlags::ALL))
            .collect();
        Actor {
            user_id: Uuid::new_v4(),
            username: "tester".into(),
            roles: vec![RoleRef {
                code: "MEMBER".into(),
                level: 2,
            }],
            grants,
        }
    }

    #[test]
    fn test_forward_path() {
        assert_eq!(Draft.transition_check(Pending), Ok(TransitionKind::Forward));
        assert_eq!(Pending.transition_check(Published), Ok(TransitionKind::Forward));
        assert_eq!(Published.transition_check(Archived), Ok(TransitionKind::Forward));
    }

    #[test]
    fn test_overrides_and_rejections() {
        assert_eq!(Draft.transition_check(Published), Ok(TransitionKind::Override));
        assert_eq!(Published.transition_check(Draft), Ok(TransitionKind::Override));
        assert_eq!(Archived.transition_check(Draft), Ok(TransitionKind::Override));
        assert!(Pending.transition_check(Draft).is_err());
        assert!(Archived.transition_check(Pending).is_err());
        assert!(Draft.transition_check(Draft).is_err());
    }

    #[test]
    fn test_required_permission() {
        assert_eq!(Draft.required_permission(Pending), Ok(codes::PROMPT_EDIT));
        assert_eq!(Pending.required_permission(Published), Ok(codes::PROMPT_PUBLISH));
        assert_eq!(Published.required_permission(Archived), Ok(codes::PROMPT_ARCHIVE));
        assert_eq!(
            Published.required_permission(Draft),
            Ok(codes::PROMPT_STATUS_OVERRIDE)
        );
    }

    #[test]
    fn test_owner_can_submit_for_review_with_read_grant() {
        let mut member = actor(&[]);
        member
            .grants
            .merge(codes::PROMPT_EDIT, CrudFlags::READ_ONLY);
        let owner = member.user_id;

        assert!(authorize_transition(&member, owner, Draft, Pending).is_ok());
        assert!(matches!(
            authorize_transition(&member, Uuid::new_v4(), Draft, Pending),
            Err(DomainError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_draft_to_published_needs_override() {
        let member = actor(&[codes::PROMPT_EDIT, codes::PROMPT_PUBLISH]);
        let err = authorize_transition(&member, member.user_id, Draft, Published).unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied(_)));

        let admin = actor(&[codes::PROMPT_STATUS_OVERRIDE]);
        assert_eq!(
            authorize_transition(&admin, Uuid::new_v4(), Draft, Published),
            Ok(TransitionKind::Override)
        );
    }

    #[test]
    fn test_published_to_draft_only_with_override() {
        let editor = actor(&[codes::PROMPT_PUBLISH, codes::PROMPT_ARCHIVE]);
        assert!(authorize_transition(&editor, Uuid::new_v4(), Published, Draft).is_err());

        let admin = actor(&[codes::PROMPT_STATUS_OVERRIDE]);
        assert!(authorize_transition(&admin, Uuid::new_v4(), Published, Draft).is_ok());
    }

    #[test]
    fn test_permission_checked_before_state() {
        let nobody = actor(&[]);
        assert!(matches!(
            authorize_transition(&nobody, nobody.user_id, Pending, Draft),
            Err(DomainError::PermissionDenied(_))
        ));

        let admin = actor(&[codes::PROMPT_STATUS_OVERRIDE]);
        assert!(matches!(
            authorize_transition(&admin, admin.user_id, Pending, Draft),
            Err(DomainError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_published_at_set_once() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(3);
        assert_eq!(published_at_after(Published, None, now), Some(now));
        assert_eq!(published_at_after(Published, Some(earlier), now), Some(earlier));
        assert_eq!(published_at_after(Archived, Some(earlier), now), Some(earlier));
        assert_eq!(published_at_after(Pending, None, now), None);
    }
}
