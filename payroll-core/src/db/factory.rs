use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::repository::{PayrollRepository, RepositoryError};

/// Which backend to open and how to reach it.
///
/// `backend` selects a registered [`RepositoryFactory`] by name; the
/// `connection_string` is handed to that factory untouched.
///
/// | backend  | connection_string examples             |
/// |----------|----------------------------------------|
/// | `sqlite` | `payroll.db`, `sqlite:payroll.db?mode=rwc`, `:memory:` |
/// | `memory` | ignored                                |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens a [`PayrollRepository`] for one backend.
///
/// Backend crates export a unit struct implementing this and register it
/// with a [`RepositoryRegistry`] at startup.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase, unique backend identifier.
    fn backend_name(&self) -> &'static str;

    /// Connects and returns a repository ready for use. Migrations may run here.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError>;
}

/// Backend factories keyed by [`RepositoryFactory::backend_name`].
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Adds `factory`, replacing any earlier one with the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Registered backend names in alphabetical order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens a repository with the factory named by `config.backend`.
    ///
    /// # Errors
    /// [`RepositoryError::Configuration`] when no such backend is
    /// registered; otherwise whatever the factory returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown backend '{}'; available: {:?}",
                config.backend,
                self.available_backends()
            )));
        };

        debug!(backend = %config.backend, "Opening payroll repository");
        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::{DbConfig, PayrollRepository, RepositoryError, RepositoryFactory, RepositoryRegistry};
    use crate::db::memory::MemoryRepositoryFactory;
    use crate::db::repository::EntryBatch;
    use crate::models::{EntryFilter, PayEntry};

    // Only routing is under test; the repository is never queried.
    struct StubRepository;

    #[async_trait]
    impl PayrollRepository for StubRepository {
        async fn entries_for_year(
            &self,
            _year: i32,
        ) -> Result<Vec<PayEntry>, RepositoryError> {
            unimplemented!()
        }
        async fn get_entry(
            &self,
            _id: i64,
        ) -> Result<PayEntry, RepositoryError> {
            unimplemented!()
        }
        async fn list_entries(
            &self,
            _filter: &EntryFilter,
        ) -> Result<Vec<PayEntry>, RepositoryError> {
            unimplemented!()
        }
        async fn overlapping_entries(
            &self,
            _week_start: NaiveDate,
            _week_end: NaiveDate,
            _exclude_id: Option<i64>,
        ) -> Result<Vec<PayEntry>, RepositoryError> {
            unimplemented!()
        }
        async fn commit(
            &self,
            _batch: EntryBatch,
        ) -> Result<Vec<PayEntry>, RepositoryError> {
            unimplemented!()
        }
    }

    struct StubFactory {
        name: &'static str,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RepositoryFactory for StubFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }
        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Box::new(StubRepository))
        }
    }

    struct FailingFactory;

    #[async_trait]
    impl RepositoryFactory for FailingFactory {
        fn backend_name(&self) -> &'static str {
            "failing"
        }
        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
            Err(RepositoryError::Connection("refused".to_string()))
        }
    }

    fn stub_factory(name: &'static str) -> (Box<dyn RepositoryFactory>, Arc<AtomicBool>) {
        let called = Arc::new(AtomicBool::new(false));
        let factory = StubFactory {
            name,
            called: Arc::clone(&called),
        };
        (Box::new(factory), called)
    }

    fn config(backend: &str) -> DbConfig {
        DbConfig {
            backend: backend.to_string(),
            connection_string: "payroll.db".to_string(),
        }
    }

    #[test]
    fn default_config_is_in_memory_sqlite() {
        let cfg = DbConfig::default();

        assert_eq!(cfg.backend, "sqlite");
        assert_eq!(cfg.connection_string, ":memory:");
    }

    #[test]
    fn empty_registry_lists_nothing() {
        assert!(RepositoryRegistry::default().available_backends().is_empty());
    }

    #[test]
    fn backends_are_listed_alphabetically() {
        let mut registry = RepositoryRegistry::new();
        registry.register(stub_factory("sqlite").0);
        registry.register(Box::new(MemoryRepositoryFactory));

        assert_eq!(registry.available_backends(), vec!["memory", "sqlite"]);
    }

    #[test]
    fn registering_same_name_twice_keeps_one() {
        let mut registry = RepositoryRegistry::new();
        registry.register(stub_factory("sqlite").0);
        registry.register(stub_factory("sqlite").0);

        assert_eq!(registry.available_backends(), vec!["sqlite"]);
    }

    #[tokio::test]
    async fn create_routes_to_named_factory_only() {
        let mut registry = RepositoryRegistry::new();
        let (sqlite, sqlite_called) = stub_factory("sqlite");
        let (other, other_called) = stub_factory("other");
        registry.register(sqlite);
        registry.register(other);

        let result = registry.create(&config("sqlite")).await;

        assert!(result.is_ok(), "expected Ok, got {:?}", result.err());
        assert!(sqlite_called.load(Ordering::SeqCst));
        assert!(!other_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_backend_names_requested_and_available() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(MemoryRepositoryFactory));

        match registry.create(&config("postgres")).await {
            Err(RepositoryError::Configuration(msg)) => {
                assert!(msg.contains("postgres"), "{msg}");
                assert!(msg.contains("memory"), "{msg}");
            }
            Err(other) => panic!("expected Configuration error, got {other:?}"),
            Ok(_) => panic!("expected Configuration error, got a repository"),
        }
    }

    #[tokio::test]
    async fn factory_errors_are_passed_through() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(FailingFactory));

        let err = registry.create(&config("failing")).await.err();

        assert_eq!(err, Some(RepositoryError::Connection("refused".to_string())));
    }

    #[tokio::test]
    async fn memory_backend_opens_an_empty_repository() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(MemoryRepositoryFactory));

        let repo = registry.create(&config("memory")).await.unwrap();

        assert!(repo.entries_for_year(2024).await.unwrap().is_empty());
    }
}
