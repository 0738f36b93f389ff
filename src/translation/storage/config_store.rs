//! 配置存储
//!
//! 运行期配置的读写与变更通知。

use std::cell::RefCell;
use std::rc::Rc;

use crate::translation::config::{ConfigPatch, TranslatorConfig};
use crate::translation::error::TranslatorResult;

/// 配置变更回调
pub type ConfigListener = Box<dyn Fn(&TranslatorConfig)>;

/// 外部配置存储契约
pub trait ConfigStore {
    fn get(&self) -> TranslatorConfig;
    /// 合并部分更新，验证失败时保持原配置
    fn set(&self, patch: ConfigPatch) -> TranslatorResult<TranslatorConfig>;
    fn on_change(&self, listener: ConfigListener);
}

/// 进程内配置存储
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    inner: Rc<RefCell<TranslatorConfig>>,
    listeners: Rc<RefCell<Vec<ConfigListener>>>,
}

impl MemoryConfigStore {
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(config)),
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self) -> TranslatorConfig {
        self.inner.borrow().clone()
    }

    fn set(&self, patch: ConfigPatch) -> TranslatorResult<TranslatorConfig> {
        let mut updated = self.inner.borrow().clone();
        updated.apply_patch(&patch);
        updated.validate()?;

        *self.inner.borrow_mut() = updated.clone();
        tracing::debug!("配置已更新: {:?}", patch);

        for listener in self.listeners.borrow().iter() {
            listener(&updated);
        }

        Ok(updated)
    }

    fn on_change(&self, listener: ConfigListener) {
        self.listeners.borrow_mut().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_set_notifies_listeners() {
        let store = MemoryConfigStore::new(TranslatorConfig::default());
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        store.on_change(Box::new(move |config| {
            *sink.borrow_mut() = config.target_lang.clone();
        }));

        store
            .set(ConfigPatch {
                target_lang: Some("fr".to_string()),
                ..ConfigPatch::default()
            })
            .expect("valid patch");

        assert_eq!(*seen.borrow(), "fr");
        assert_eq!(store.get().target_lang, "fr");
    }

    #[test]
    fn test_invalid_patch_is_rejected() {
        let store = MemoryConfigStore::new(TranslatorConfig::default());
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        store.on_change(Box::new(move |_| counter.set(counter.get() + 1)));

        let result = store.set(ConfigPatch {
            max_processed: Some(0),
            ..ConfigPatch::default()
        });

        assert!(result.is_err());
        assert_eq!(calls.get(), 0);
        assert_eq!(store.get().max_processed, 1000);
    }
}
