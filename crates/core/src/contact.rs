use clubhouse_api::{ContactRequest, NewContactMessage, ServiceError, service};
use clubhouse_backend::Backend;

pub const STATUS_SENT: &str = "message transmitted.";

/// Store a message from the public contact form.
pub async fn submit_contact(
    backend: &dyn Backend,
    req: &ContactRequest,
) -> Result<(), ServiceError> {
    let message = NewContactMessage {
        name: service::require("name", &req.name)?,
        email: service::validate_email(&req.email)?,
        content: service::require("message", &req.content)?,
    };
    backend.insert_contact_message(&message).await?;
    tracing::info!("contact message received");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubhouse_backend::MemoryBackend;

    fn request(name: &str, email: &str, content: &str) -> ContactRequest {
        ContactRequest {
            name: name.into(),
            email: email.into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn stores_trimmed_message() {
        let backend = MemoryBackend::new();
        let admin = backend.add_member("admin@x.edu", "pw123456", None, true);
        submit_contact(&backend, &request(" Sam ", "Sam@X.edu", "hello club"))
            .await
            .unwrap();

        let auth = backend
            .sign_in_with_password(&admin.email, "pw123456")
            .await
            .unwrap();
        let messages = backend.list_contact_messages(&auth.access_token).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name, "Sam");
        assert_eq!(messages[0].email, "sam@x.edu");
    }

    #[tokio::test]
    async fn blank_fields_never_reach_the_backend() {
        let backend = MemoryBackend::new();
        let err = submit_contact(&backend, &request("Sam", "sam@x.edu", "  "))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "message is required");
        assert_eq!(backend.call_count(), 0);
    }
}
