use clubroster_core::access::{Action, ResourceType};
use clubroster_core::model::User;
use clubroster_core::principal::Principal;

pub fn login_success(user: &User) {
    tracing::info!(
        target: "audit",
        event = "login_success",
        user_id = user.id,
        role = user.role.as_str(),
        "login succeeded"
    );
}

pub fn login_failure(email: &str, reason: &str) {
    tracing::warn!(
        target: "audit",
        event = "login_failure",
        email = email,
        reason = reason,
        "login failed"
    );
}

pub fn user_registered(user: &User) {
    tracing::info!(
        target: "audit",
        event = "user_registered",
        user_id = user.id,
        role = user.role.as_str(),
        "user registered"
    );
}

pub fn access_denied(
    principal: &Principal,
    action: Action,
    resource: ResourceType,
    resource_id: Option<i64>,
) {
    tracing::warn!(
        target: "audit",
        event = "access_denied",
        user_id = principal.id,
        role = principal.role.as_str(),
        action = ?action,
        resource = resource.as_str(),
        resource_id = resource_id.unwrap_or(-1),
        "access denied"
    );
}

pub fn resource_written(
    principal: &Principal,
    action: Action,
    resource: ResourceType,
    resource_id: i64,
) {
    tracing::info!(
        target: "audit",
        event = "resource_written",
        user_id = principal.id,
        action = ?action,
        resource = resource.as_str(),
        resource_id = resource_id,
        "resource written"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubroster_core::principal::{AccountStatus, Role};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Debug)]
    struct CapturedEvent {
        target: String,
        fields: Vec<(String, String)>,
    }

    struct TestLayer {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TestLayer {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut fields = Vec::new();
            let mut visitor = FieldVisitor(&mut fields);
            event.record(&mut visitor);
            self.events.lock().unwrap().push(CapturedEvent {
                target: event.metadata().target().to_string(),
                fields,
            });
        }
    }

    struct FieldVisitor<'a>(&'a mut Vec<(String, String)>);

    impl tracing::field::Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{value:?}")));
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.0.push((field.name().to_string(), value.to_string()));
        }

        fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
            self.0.push((field.name().to_string(), value.to_string()));
        }
    }

    fn with_test_subscriber<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let layer = TestLayer {
            events: Arc::clone(&events),
        };
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        Arc::try_unwrap(events).unwrap().into_inner().unwrap()
    }

    fn has_field(event: &CapturedEvent, key: &str, value: &str) -> bool {
        event.fields.iter().any(|(k, v)| k == key && v == value)
    }

    fn test_principal() -> Principal {
        Principal {
            id: 7,
            role: Role::Coach,
            status: AccountStatus::Active,
        }
    }

    #[test]
    fn login_failure_carries_reason_but_no_password() {
        let events = with_test_subscriber(|| {
            login_failure("a@club.test", "invalid credentials");
        });

        assert_eq!(events.len(), 1);
        assert!(has_field(&events[0], "event", "login_failure"));
        assert!(has_field(&events[0], "reason", "invalid credentials"));
        assert!(!events[0].fields.iter().any(|(k, _)| k == "password"));
    }

    #[test]
    fn access_denied_names_principal_and_resource() {
        let events = with_test_subscriber(|| {
            access_denied(
                &test_principal(),
                Action::Update,
                ResourceType::Batch,
                Some(3),
            );
        });

        assert_eq!(events.len(), 1);
        assert!(has_field(&events[0], "event", "access_denied"));
        assert!(has_field(&events[0], "user_id", "7"));
        assert!(has_field(&events[0], "resource", "batch"));
        assert!(has_field(&events[0], "resource_id", "3"));
    }

    #[test]
    fn audit_events_use_target_audit() {
        let events = with_test_subscriber(|| {
            login_failure("x@club.test", "bad");
            access_denied(&test_principal(), Action::Read, ResourceType::Payment, None);
            resource_written(&test_principal(), Action::Create, ResourceType::Session, 9);
        });

        assert_eq!(events.len(), 3);
        for event in &events {
            assert_eq!(event.target, "audit");
        }
    }
}
