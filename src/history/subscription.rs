use crate::auth::{Action, Authorizer};
use crate::errors::{AuthError, InvalidResourceError, SubscriptionError};
use crate::project::MingleDb;
use crate::project::models::{HistorySubscription, Project, ProjectRole, User};

use super::filter::HistoryFilterParams;

/// History subscription lifecycle for one project store.
pub struct SubscriptionService<'a> {
    db: &'a MingleDb,
    authorizer: &'a dyn Authorizer,
}

impl<'a> SubscriptionService<'a> {
    pub fn new(db: &'a MingleDb, authorizer: &'a dyn Authorizer) -> Self {
        Self { db, authorizer }
    }

    /// Subscribe `user` to `filter`. Subscribing again with an equal filter
    /// returns the existing subscription.
    pub fn subscribe(
        &self,
        user: &User,
        project: &Project,
        filter: &HistoryFilterParams,
    ) -> Result<HistorySubscription, SubscriptionError> {
        self.authorizer.authorize(user, Action::Subscribe, project)?;
        if let Some(reason) = self.missing_target(project, filter)? {
            return Err(reason.into());
        }

        let (subscription, created) = self
            .db
            .find_or_create_subscription(project.id, user.id, &filter.to_query())
            .map_err(SubscriptionError::Store)?;
        if created {
            tracing::info!(
                project = %project.identifier,
                login = %user.login,
                id = subscription.id,
                "Created history subscription"
            );
        } else {
            tracing::debug!(id = subscription.id, "History subscription already exists");
        }
        Ok(subscription)
    }

    /// Remove a subscription. A subscription whose card or page has since
    /// been deleted, or whose filter no longer parses, is deleted and
    /// reported as gone.
    pub fn unsubscribe(
        &self,
        user: &User,
        project: &Project,
        id: i64,
    ) -> Result<HistorySubscription, SubscriptionError> {
        let subscription = self
            .db
            .get_subscription(id)
            .map_err(SubscriptionError::Store)?
            .filter(|s| s.project_id == project.id)
            .ok_or(InvalidResourceError::SubscriptionGone { id })?;

        if subscription.user_id != user.id && user.role != ProjectRole::Admin {
            return Err(AuthError::AccessDenied {
                login: user.login.clone(),
                action: "unsubscribe".to_string(),
            }
            .into());
        }

        let orphaned = match HistoryFilterParams::from_query(project, &subscription.filter_params) {
            Ok(filter) => self.missing_target(project, &filter)?.is_some(),
            Err(e) => {
                tracing::debug!(error = %e, "Subscription filter no longer valid");
                true
            }
        };

        self.db
            .delete_subscription(subscription.id)
            .map_err(SubscriptionError::Store)?;
        if orphaned {
            tracing::warn!(
                project = %project.identifier,
                id,
                "Deleted orphaned history subscription"
            );
            return Err(InvalidResourceError::SubscriptionGone { id }.into());
        }
        tracing::info!(project = %project.identifier, login = %user.login, id, "Unsubscribed");
        Ok(subscription)
    }

    pub fn list(
        &self,
        user: &User,
        project: &Project,
    ) -> Result<Vec<HistorySubscription>, SubscriptionError> {
        self.db
            .list_subscriptions(project.id, user.id)
            .map_err(SubscriptionError::Store)
    }

    /// The card or page a scoped filter follows, if it no longer exists.
    fn missing_target(
        &self,
        project: &Project,
        filter: &HistoryFilterParams,
    ) -> Result<Option<InvalidResourceError>, SubscriptionError> {
        if let Some(number) = filter.card_number {
            let card = self
                .db
                .get_card(project.id, number)
                .map_err(SubscriptionError::Store)?;
            if card.is_none() {
                return Ok(Some(InvalidResourceError::CardNotFound { number }));
            }
        }
        if let Some(identifier) = &filter.page_identifier {
            let page = self
                .db
                .find_page(project.id, identifier)
                .map_err(SubscriptionError::Store)?;
            if page.is_none() {
                return Ok(Some(InvalidResourceError::PageNotFound {
                    identifier: identifier.clone(),
                }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RoleAuthorizer;
    use crate::errors::Fallback;
    use crate::project::models::{Card, PropertyDefinition, ProjectSchema};
    use anyhow::Result;

    struct Fixture {
        db: MingleDb,
        project: Project,
        bob: User,
    }

    fn fixture() -> Result<Fixture> {
        let db = MingleDb::new_in_memory()?;
        let schema = ProjectSchema {
            properties: vec![PropertyDefinition::enumerated("Status", &["Open", "Closed"])],
            card_types: vec!["Story".into()],
            trees: vec![],
        };
        let project = db.create_project("p", "P", &schema)?;
        let bob = db.upsert_user("bob", "Bob", ProjectRole::TeamMember)?;
        db.upsert_card(&Card {
            project_id: project.id,
            number: 4,
            name: "Login".into(),
            card_type: "Story".into(),
            properties: Default::default(),
            tags: vec![],
            trees: vec![],
        })?;
        db.create_page(project.id, "Road Map", "")?;
        Ok(Fixture { db, project, bob })
    }

    fn filter(f: &Fixture, query: &str) -> HistoryFilterParams {
        HistoryFilterParams::from_query(&f.project, query).unwrap()
    }

    #[test]
    fn subscribe_twice_stores_one_subscription() -> Result<()> {
        let f = fixture()?;
        let service = SubscriptionService::new(&f.db, &RoleAuthorizer);
        let a = service.subscribe(&f.bob, &f.project, &filter(&f, "involved_filter_tags=b,a"))?;
        let b = service.subscribe(&f.bob, &f.project, &filter(&f, "involved_filter_tags=a,b"))?;
        assert_eq!(a.id, b.id);
        assert_eq!(service.list(&f.bob, &f.project)?.len(), 1);
        Ok(())
    }

    #[test]
    fn scoped_subscription_requires_existing_target() -> Result<()> {
        let f = fixture()?;
        let service = SubscriptionService::new(&f.db, &RoleAuthorizer);
        service.subscribe(&f.bob, &f.project, &filter(&f, "card_number=4"))?;
        service.subscribe(&f.bob, &f.project, &filter(&f, "page_identifier=Road_Map"))?;

        let err = service
            .subscribe(&f.bob, &f.project, &filter(&f, "card_number=99"))
            .unwrap_err();
        assert!(matches!(
            err,
            SubscriptionError::Invalid(InvalidResourceError::CardNotFound { number: 99 })
        ));
        Ok(())
    }

    #[test]
    fn unsubscribe_removes_subscription() -> Result<()> {
        let f = fixture()?;
        let service = SubscriptionService::new(&f.db, &RoleAuthorizer);
        let sub = service.subscribe(&f.bob, &f.project, &filter(&f, "period=today"))?;
        service.unsubscribe(&f.bob, &f.project, sub.id)?;
        assert!(service.list(&f.bob, &f.project)?.is_empty());

        let err = service.unsubscribe(&f.bob, &f.project, sub.id).unwrap_err();
        assert!(matches!(
            err,
            SubscriptionError::Invalid(InvalidResourceError::SubscriptionGone { .. })
        ));
        Ok(())
    }

    #[test]
    fn unsubscribe_from_deleted_card_reports_gone_and_cleans_up() -> Result<()> {
        let f = fixture()?;
        let service = SubscriptionService::new(&f.db, &RoleAuthorizer);
        let sub = service.subscribe(&f.bob, &f.project, &filter(&f, "card_number=4"))?;
        f.db.delete_card(f.project.id, 4)?;

        let err = service.unsubscribe(&f.bob, &f.project, sub.id).unwrap_err();
        match err {
            SubscriptionError::Invalid(invalid) => {
                assert_eq!(invalid.fallback(), Fallback::ProjectOverview);
                assert_eq!(
                    invalid.to_string(),
                    "The Mingle history notification from which you are trying to unsubscribe is no longer valid or no longer exists."
                );
            }
            other => panic!("Expected SubscriptionError::Invalid, got {other:?}"),
        }
        assert!(f.db.get_subscription(sub.id)?.is_none());
        Ok(())
    }

    #[test]
    fn unsubscribe_from_deleted_page_reports_gone() -> Result<()> {
        let f = fixture()?;
        let service = SubscriptionService::new(&f.db, &RoleAuthorizer);
        let sub = service.subscribe(&f.bob, &f.project, &filter(&f, "page_identifier=Road_Map"))?;
        let page = f.db.find_page(f.project.id, "Road_Map")?.expect("page exists");
        f.db.delete_page(page.id)?;

        assert!(matches!(
            service.unsubscribe(&f.bob, &f.project, sub.id),
            Err(SubscriptionError::Invalid(InvalidResourceError::SubscriptionGone { .. }))
        ));
        Ok(())
    }

    #[test]
    fn other_users_cannot_unsubscribe() -> Result<()> {
        let f = fixture()?;
        let alice = f.db.upsert_user("alice", "Alice", ProjectRole::TeamMember)?;
        let service = SubscriptionService::new(&f.db, &RoleAuthorizer);
        let sub = service.subscribe(&f.bob, &f.project, &filter(&f, "period=today"))?;
        assert!(matches!(
            service.unsubscribe(&alice, &f.project, sub.id),
            Err(SubscriptionError::Access(_))
        ));
        assert!(f.db.get_subscription(sub.id)?.is_some());
        Ok(())
    }

    #[test]
    fn anonymous_users_cannot_subscribe() -> Result<()> {
        let f = fixture()?;
        let anon = f.db.upsert_user("guest", "Guest", ProjectRole::Anonymous)?;
        let service = SubscriptionService::new(&f.db, &RoleAuthorizer);
        assert!(matches!(
            service.subscribe(&anon, &f.project, &filter(&f, "period=today")),
            Err(SubscriptionError::Access(_))
        ));
        Ok(())
    }
}
