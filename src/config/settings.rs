use std::{path::PathBuf, sync::Arc};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{
    engine::{AofEventStore, EventStore, InMemoryEventStore, SyncPolicy},
    error::{ensure, GenericError, ResultExt, StackError, StatusCode, TopicbusResult},
    logging::LoggingConfig,
};

/// Префикс переменных окружения: `TOPICBUS_STORE__KIND=aof`.
pub const ENV_PREFIX: &str = "TOPICBUS";

/// Какое хранилище событий подключить к шине.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Без хранилища: события только доставляются.
    #[default]
    None,
    Memory,
    Aof,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub kind: StoreKind,
    /// Путь к журналу, обязателен для `aof`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub sync: SyncPolicy,
}

impl StoreSettings {
    /// Открывает настроенное хранилище.
    pub fn open(&self) -> TopicbusResult<Option<Arc<dyn EventStore>>> {
        match self.kind {
            StoreKind::None => Ok(None),
            StoreKind::Memory => {
                let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
                Ok(Some(store))
            }
            StoreKind::Aof => {
                let Some(path) = self.path.as_deref() else {
                    return Err(StackError::new(GenericError::new(
                        StatusCode::InvalidArgs,
                        "store.kind = aof requires store.path",
                    )));
                };
                let store = AofEventStore::open(path, self.sync)
                    .with_context(|| format!("failed to open event log {}", path.display()))?;
                let store: Arc<dyn EventStore> = Arc::new(store);
                Ok(Some(store))
            }
        }
    }
}

/// Конфигурация шины.
///
/// Источники по возрастанию приоритета: значения по умолчанию, TOML-файл
/// (если указан), переменные окружения `TOPICBUS_*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Сохранять и `...:read` события.
    #[serde(default)]
    pub persist_all_events: bool,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки из окружения.
    pub fn load() -> TopicbusResult<Self> {
        Self::load_from(None)
    }

    /// Загружает настройки из файла и окружения.
    pub fn load_from(file: Option<&std::path::Path>) -> TopicbusResult<Self> {
        let mut builder = Config::builder()
            .set_default("persist_all_events", false)
            .map_err(config_error)?
            .set_default("store.kind", "none")
            .map_err(config_error)?
            .set_default("store.sync", "everysec")
            .map_err(config_error)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?;

        let settings: Settings = cfg.try_deserialize().map_err(config_error)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> TopicbusResult<()> {
        ensure!(
            self.store.kind != StoreKind::Aof || self.store.path.is_some(),
            StatusCode::InvalidArgs,
            "store.kind = aof requires store.path"
        );
        self.logging.validate().context("invalid logging settings")?;
        Ok(())
    }
}

fn config_error(err: config::ConfigError) -> StackError {
    StackError::new(GenericError::new(StatusCode::InvalidArgs, err.to_string()))
}
