use std::sync::Arc;

use dashmap::DashMap;

/// Пул `Arc<str>` для повторно публикуемых топиков одной шины.
///
/// Каждое событие несёт свой топик; горячие топики публикуются тысячи раз,
/// поэтому все события одного топика делят одну аллокацию. В пул попадают
/// только топики, прошедшие проверку существования в дереве, и он живёт
/// ровно столько, сколько шина.
#[derive(Debug, Default)]
pub(crate) struct TopicInterner {
    map: DashMap<Box<str>, Arc<str>>,
}

impl TopicInterner {
    /// Возвращает interned `Arc<str>` для данного топика.
    #[inline]
    pub(crate) fn intern<S: AsRef<str>>(
        &self,
        topic: S,
    ) -> Arc<str> {
        let key = topic.as_ref();
        if let Some(existing) = self.map.get(key) {
            return existing.clone();
        }
        self.map
            .entry(Box::from(key))
            .or_insert_with(|| Arc::from(key))
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Проверяет, что повторный вызов возвращает тот же самый `Arc`.
    #[test]
    fn intern_new_and_repeats() {
        let pool = TopicInterner::default();
        let a1 = pool.intern("orders:create");
        assert_eq!(&*a1, "orders:create");

        let a2 = pool.intern(String::from("orders:create"));
        assert!(Arc::ptr_eq(&a1, &a2), "Должен вернуть тот же Arc по указателю");
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn intern_different_keys() {
        let pool = TopicInterner::default();
        let a1 = pool.intern("users:read");
        let a2 = pool.intern("users:update");
        assert!(!Arc::ptr_eq(&a1, &a2), "Разные ключи - разные Arc");
    }

    #[test]
    fn intern_pools_are_independent_and_released() {
        let first = TopicInterner::default();
        let second = TopicInterner::default();
        let a = first.intern("orders:create");
        let b = second.intern("orders:create");
        assert!(!Arc::ptr_eq(&a, &b));

        assert_eq!(Arc::strong_count(&a), 2);
        drop(first);
        assert_eq!(Arc::strong_count(&a), 1);
    }

    /// Конкурентные вызовы для одного топика из разных потоков получают один
    /// и тот же `Arc<str>`.
    #[test]
    fn intern_concurrent() {
        let pool = Arc::new(TopicInterner::default());
        let keys = ["c:a", "c:b", "c:a", "c:c", "c:b", "c:a"];
        let handles: Vec<_> = keys
            .iter()
            .map(|&k| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || pool.intern(k))
            })
            .collect();

        let arcs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let first = pool.intern("c:a");
        for arc in arcs.iter().filter(|arc| arc.as_ref() == "c:a") {
            assert!(Arc::ptr_eq(&first, arc));
        }
        assert_eq!(pool.len(), 3);
    }
}
