use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Condition, Directory, SelectQuery, Store};
use crate::models::message::{CreateMessage, Mailbox};
use crate::models::Message;
use crate::services::entity::{Entity, EntityService};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::pagination::{PageRequest, Paginated};
use crate::tenant::TenantScope;

/// Direct messages. Only the two parties of a message can see it.
pub struct MessageService {
    messages: EntityService<Message>,
    directory: Arc<dyn Directory>,
}

impl MessageService {
    pub fn new(store: Arc<dyn Store>, directory: Arc<dyn Directory>) -> Self {
        Self { messages: EntityService::new(store), directory }
    }

    pub async fn send(&self, scope: &TenantScope, sender: Uuid, input: CreateMessage) -> ServiceResult<Message> {
        if input.recipient_id == sender {
            return Err(ServiceError::validation("recipientId", "You cannot send a message to yourself"));
        }
        if self.directory.membership_in(scope, input.recipient_id).await?.is_none() {
            return Err(ServiceError::validation(
                "recipientId",
                "Recipient is not a member of this school",
            ));
        }
        self.messages.create(scope, sender, input).await
    }

    pub async fn list(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        mailbox: Mailbox,
        page: PageRequest,
    ) -> ServiceResult<Paginated<Message>> {
        let party = match mailbox {
            Mailbox::Inbox => "recipientId",
            Mailbox::Sent => "senderId",
        };
        let conditions = vec![Condition::eq(party, user_id)];
        let total = self.messages.count(scope, &conditions).await?;
        let items = self
            .messages
            .select(
                scope,
                &SelectQuery {
                    conditions,
                    order: Message::default_order(),
                    limit: Some(page.limit),
                    offset: page.offset(),
                },
            )
            .await?;
        Ok(Paginated::new(items, page, total))
    }

    pub async fn get(&self, scope: &TenantScope, user_id: Uuid, id: Uuid) -> ServiceResult<Message> {
        let message = self.messages.get_by_id(scope, id).await?;
        if !message.involves(user_id) {
            return Err(ServiceError::forbidden("You are not a party to this message"));
        }
        Ok(message)
    }

    /// Idempotent: an already read message keeps its first read time.
    pub async fn mark_read(&self, scope: &TenantScope, user_id: Uuid, id: Uuid) -> ServiceResult<Message> {
        let mut message = self.get(scope, user_id, id).await?;
        if message.recipient_id != user_id {
            return Err(ServiceError::forbidden("Only the recipient can mark a message as read"));
        }
        if message.read_at.is_some() {
            return Ok(message);
        }
        let now = Utc::now();
        message.read_at = Some(now);
        message.updated_at = now;
        self.messages.replace(scope, message).await
    }

    pub async fn delete(&self, scope: &TenantScope, user_id: Uuid, id: Uuid) -> ServiceResult<()> {
        self.get(scope, user_id, id).await?;
        self.messages.delete(scope, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{system_roles, NewUser};
    use crate::database::MemoryStore;

    struct Fixture {
        service: MessageService,
        scope: TenantScope,
        alice: Uuid,
        bob: Uuid,
        eve: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let school = Uuid::new_v4();
        let mut ids = Vec::new();
        for name in ["alice", "bob", "eve"] {
            let user = store
                .create_user(NewUser { email: format!("{}@s.test", name), full_name: name.into() })
                .await
                .unwrap();
            ids.push(user.id);
        }
        store.grant_membership(ids[0], school, system_roles::TEACHER, true).await;
        store.grant_membership(ids[1], school, system_roles::STAFF, true).await;
        store.grant_membership(ids[2], school, system_roles::STAFF, true).await;
        Fixture {
            service: MessageService::new(store.clone(), store),
            scope: TenantScope::assume(school),
            alice: ids[0],
            bob: ids[1],
            eve: ids[2],
        }
    }

    fn message_to(recipient: Uuid) -> CreateMessage {
        CreateMessage { recipient_id: recipient, subject: "Hi".into(), body: "Hello".into() }
    }

    #[tokio::test]
    async fn only_parties_can_read() {
        let f = fixture().await;
        let sent = f.service.send(&f.scope, f.alice, message_to(f.bob)).await.unwrap();

        assert!(f.service.get(&f.scope, f.bob, sent.id).await.is_ok());
        assert!(matches!(f.service.get(&f.scope, f.eve, sent.id).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(f.service.mark_read(&f.scope, f.alice, sent.id).await, Err(ServiceError::Forbidden(_))));

        let read = f.service.mark_read(&f.scope, f.bob, sent.id).await.unwrap();
        assert!(read.read_at.is_some());
    }

    #[tokio::test]
    async fn mailboxes_split_by_party() {
        let f = fixture().await;
        f.service.send(&f.scope, f.alice, message_to(f.bob)).await.unwrap();
        f.service.send(&f.scope, f.bob, message_to(f.alice)).await.unwrap();
        f.service.send(&f.scope, f.eve, message_to(f.alice)).await.unwrap();

        let inbox = f.service.list(&f.scope, f.alice, Mailbox::Inbox, PageRequest::default()).await.unwrap();
        let sent = f.service.list(&f.scope, f.alice, Mailbox::Sent, PageRequest::default()).await.unwrap();
        assert_eq!(inbox.pagination.total, 2);
        assert_eq!(sent.pagination.total, 1);
    }

    #[tokio::test]
    async fn recipients_must_belong_to_the_school() {
        let f = fixture().await;
        let stranger = Uuid::new_v4();
        assert!(matches!(
            f.service.send(&f.scope, f.alice, message_to(stranger)).await,
            Err(ServiceError::Validation { .. })
        ));
    }
}
