//! Keyed store of shared texture handles.
//!
//! Keys are resolved file paths (or `<model>#<image>` for images embedded
//! in a model file), values are `Rc` handles so every mesh binding the
//! same image points at the same GPU texture.

use std::{collections::HashMap, rc::Rc};

#[derive(Debug)]
pub struct TextureCache<T> {
    entries: HashMap<String, Rc<T>>,
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Rc<T>> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores `texture` under `key` and returns the shared handle. An
    /// existing entry is replaced; meshes holding the old handle keep it.
    pub fn insert(&mut self, key: impl Into<String>, texture: T) -> Rc<T> {
        let texture = Rc::new(texture);
        self.entries.insert(key.into(), Rc::clone(&texture));
        texture
    }

    /// Returns the cached handle for `key` or creates it with `create`.
    ///
    /// `create` only runs on a miss. Failures are returned as is and leave
    /// the cache untouched, so the next call tries again.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        create: impl FnOnce() -> Result<T, E>,
    ) -> Result<Rc<T>, E> {
        if let Some(texture) = self.entries.get(key) {
            log::debug!("Texture cache hit for '{}'", key);
            return Ok(Rc::clone(texture));
        }
        let texture = create()?;
        Ok(self.insert(key, texture))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TextureCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_returns_the_same_handle() {
        let mut cache = TextureCache::new();
        let first = cache
            .get_or_try_insert_with("a.png", || Ok::<_, ()>(1))
            .unwrap();
        let second = cache
            .get_or_try_insert_with("a.png", || -> Result<i32, ()> {
                panic!("must not run on a hit")
            })
            .unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache: TextureCache<i32> = TextureCache::new();
        assert_eq!(cache.get_or_try_insert_with("b.png", || Err("boom")), Err("boom"));
        assert!(!cache.contains("b.png"));

        let texture = cache.get_or_try_insert_with("b.png", || Ok::<_, &str>(2)).unwrap();
        assert_eq!(*texture, 2);
        assert!(cache.contains("b.png"));
    }

    #[test]
    fn clones_share_handles_until_cleared() {
        let mut cache = TextureCache::new();
        let handle = cache.insert("c.png", 3);
        let copy = cache.clone();
        assert!(Rc::ptr_eq(&copy.get("c.png").unwrap(), &handle));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(copy.len(), 1);
        assert_eq!(Rc::strong_count(&handle), 2);
    }
}
